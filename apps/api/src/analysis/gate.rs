//! Auto-report gate: decides whether a full analysis is persisted or withheld.
//!
//! Disclosure is a pure function of `(score, auto_report_enabled, auto_report_threshold)`.
//! A withheld run overwrites previously disclosed fields with placeholders, so a
//! re-screen that now fails the gate never leaves older report content visible.

use chrono::{DateTime, Utc};

use crate::analysis::engine::MatchAnalysis;
use crate::models::candidate::CandidateAnalysis;
use crate::models::organization::OrgSettings;

pub const WITHHELD_SUMMARY: &str =
    "Full report withheld: score is below this organization's auto-report threshold.";
pub const WITHHELD_MATCH_REASON: &str = "Report withheld by auto-report policy.";

/// Absent settings mean the defaults: enabled, threshold 80.
pub fn should_disclose(score: i32, settings: Option<&OrgSettings>) -> bool {
    let defaults = OrgSettings::default();
    let settings = settings.unwrap_or(&defaults);
    settings.auto_report_enabled && score >= settings.auto_report_threshold
}

/// The gated fields of an evaluation, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Disclosure {
    pub disclosed: bool,
    pub summary: String,
    pub match_reason: String,
    pub analysis: Option<CandidateAnalysis>,
}

pub fn apply_gate(
    analysis: &MatchAnalysis,
    settings: Option<&OrgSettings>,
    analyzed_at: DateTime<Utc>,
) -> Disclosure {
    if !should_disclose(analysis.effective_score(), settings) {
        return Disclosure {
            disclosed: false,
            summary: WITHHELD_SUMMARY.to_string(),
            match_reason: WITHHELD_MATCH_REASON.to_string(),
            analysis: None,
        };
    }

    let intel = &analysis.intelligence;
    Disclosure {
        disclosed: true,
        summary: analysis.summary.clone().unwrap_or_default(),
        match_reason: analysis.match_reason.clone().unwrap_or_default(),
        analysis: Some(CandidateAnalysis {
            verdict: analysis.effective_verdict(),
            technical_score: intel.technical_score,
            cultural_score: intel.cultural_score,
            communication_score: intel.communication_score,
            strengths: intel.strengths.clone(),
            weaknesses: intel.weaknesses.clone(),
            missing_skills: intel.missing_skills.clone(),
            skills_matrix: analysis.skills_matrix.clone(),
            analyzed_at,
        }),
    }
}
