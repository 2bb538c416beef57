use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::interview::InterviewSession;
use crate::models::offer::Offer;

/// Stored in `resume_text` when an upload was parsed but yielded no usable text.
pub const UNREADABLE_RESUME_SENTINEL: &str = "[unreadable resume]";

/// Categorical hiring recommendation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Proceed,
    #[default]
    Review,
    Reject,
}

impl Verdict {
    /// Lenient parse of a model-supplied verdict. Unknown values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "proceed" => Some(Verdict::Proceed),
            "review" => Some(Verdict::Review),
            "reject" => Some(Verdict::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub id: String,
    pub name: String,
    pub level: Option<String>,
    pub years: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub id: String,
    pub institution: String,
    pub degree: Option<String>,
    pub field: Option<String>,
    pub year: Option<String>,
}

/// One row of the requirement-by-requirement comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillMatrixEntry {
    pub skill: String,
    pub required: bool,
    pub candidate_has: bool,
    pub proficiency: Option<String>,
}

/// The disclosed part of an evaluation. Only persisted when the auto-report gate opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAnalysis {
    pub verdict: Verdict,
    pub technical_score: Option<i32>,
    pub cultural_score: Option<i32>,
    pub communication_score: Option<i32>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub missing_skills: Vec<String>,
    pub skills_matrix: Vec<SkillMatrixEntry>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: Uuid,
    pub org_id: Uuid,
    pub job_id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub links: Json<Vec<String>>,
    pub resume_url: Option<String>,
    pub resume_text: Option<String>,
    pub resume_parsed_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub vector_match_score: Option<i32>,
    pub summary: Option<String>,
    pub match_reason: Option<String>,
    pub skills: Json<Vec<SkillRecord>>,
    pub experience: Json<Vec<ExperienceRecord>>,
    pub education: Json<Vec<EducationRecord>>,
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    pub analysis: Option<Json<CandidateAnalysis>>,
    pub offer: Option<Json<Offer>>,
    pub interviews: Json<Vec<InterviewSession>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    pub fn offer(&self) -> Option<&Offer> {
        self.offer.as_ref().map(|o| &o.0)
    }

    /// True once a real extraction result (not the unreadable sentinel) is stored.
    pub fn has_usable_resume_text(&self) -> bool {
        self.resume_text
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty() && t != UNREADABLE_RESUME_SENTINEL)
    }
}

/// Locates a candidate without loading it. Used by reverse lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CandidateRef {
    pub org_id: Uuid,
    pub candidate_id: Uuid,
}

/// Everything an evaluation run writes back to the candidate row in one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub links: Vec<String>,
    pub resume_text: String,
    pub score: i32,
    pub vector_match_score: i32,
    pub skills: Vec<SkillRecord>,
    pub experience: Vec<ExperienceRecord>,
    pub education: Vec<EducationRecord>,
    pub embedding: Vec<f32>,
    pub summary: String,
    pub match_reason: String,
    /// `None` clears any previously disclosed analysis.
    pub analysis: Option<CandidateAnalysis>,
}
