//! Evaluation pipeline: extract → analyze → embed/match → gate → persist.
//!
//! Steps run sequentially. Only the similarity step is best-effort; extraction and
//! analysis failures propagate with their own error codes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::analysis::engine::analyze;
use crate::analysis::gate::apply_gate;
use crate::capability::{request_ai, AiPermit};
use crate::errors::AppError;
use crate::extraction::resolver::ResumeSource;
use crate::models::candidate::{Candidate, EvaluationUpdate, Verdict};
use crate::models::job::Job;
use crate::models::organization::OrgSettings;
use crate::similarity::matcher::{match_resume, ResumeProfile};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluateRequest {
    /// Defaults to the job the candidate applied to.
    pub job_id: Option<Uuid>,
    pub resume_text: Option<String>,
    pub resume_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationOutcome {
    pub candidate_id: Uuid,
    pub score: i32,
    pub vector_match_score: i32,
    pub disclosed: bool,
    /// Only reported when the full analysis is disclosed.
    pub verdict: Option<Verdict>,
}

/// Full evaluation for a candidate, resolving the resume from the request or the record.
pub async fn evaluate(
    state: &AppState,
    org_id: Uuid,
    candidate_id: Uuid,
    request: EvaluateRequest,
) -> Result<EvaluationOutcome, AppError> {
    let candidate = state
        .store
        .get_candidate(org_id, candidate_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;

    let job_id = request
        .job_id
        .or(candidate.job_id)
        .ok_or_else(|| AppError::InvalidInput("job_id is required".to_string()))?;

    let job = state
        .store
        .get_job(org_id, job_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let settings = state
        .store
        .get_org_settings(org_id)
        .await
        .map_err(AppError::Internal)?;
    let permit = request_ai(state.platform_flags(), settings.as_ref())?;

    let source = resume_source(&request, &candidate)?;
    let resume_text = state.resolver().resolve(&permit, &source).await?;

    evaluate_text(state, &permit, &candidate, &job, settings.as_ref(), resume_text).await
}

/// Picks the resume source: request text, request URL, stored text, stored file.
fn resume_source(
    request: &EvaluateRequest,
    candidate: &Candidate,
) -> Result<ResumeSource, AppError> {
    if let Some(text) = request.resume_text.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok(ResumeSource::Inline(text.to_string()));
    }
    if let Some(url) = request.resume_url.as_deref().filter(|u| !u.trim().is_empty()) {
        return Ok(ResumeSource::Reference(url.to_string()));
    }
    if candidate.has_usable_resume_text() {
        return Ok(ResumeSource::Inline(
            candidate.resume_text.clone().unwrap_or_default(),
        ));
    }
    if let Some(url) = candidate.resume_url.as_deref().filter(|u| !u.trim().is_empty()) {
        return Ok(ResumeSource::Reference(url.to_string()));
    }
    Err(AppError::InvalidInput(
        "resume_text or resume_url is required".to_string(),
    ))
}

/// Runs analysis, matching, gating and persistence on already-extracted text.
pub async fn evaluate_text(
    state: &AppState,
    permit: &AiPermit,
    candidate: &Candidate,
    job: &Job,
    settings: Option<&OrgSettings>,
    resume_text: String,
) -> Result<EvaluationOutcome, AppError> {
    let analysis = analyze(
        state.text_service.as_ref(),
        permit,
        &resume_text,
        &job.full_description(),
    )
    .await?;
    let score = analysis.effective_score();

    let profile = ResumeProfile {
        name: analysis.name.as_deref().or(candidate.name.as_deref()),
        skills: &analysis.skills,
        summary: analysis.summary.as_deref(),
        experience: &analysis.experience,
        raw_text: &resume_text,
    };
    let similarity = match_resume(
        state.store.as_ref(),
        state.embedder.as_ref(),
        permit,
        job,
        &profile,
    )
    .await;

    let disclosure = apply_gate(&analysis, settings, Utc::now());
    let verdict = disclosure.analysis.as_ref().map(|a| a.verdict);

    let update = EvaluationUpdate {
        name: analysis.name.clone(),
        email: analysis.email.clone(),
        phone: analysis.phone.clone(),
        links: analysis.links.clone(),
        resume_text,
        score,
        vector_match_score: similarity.score,
        skills: analysis.skills,
        experience: analysis.experience,
        education: analysis.education,
        embedding: similarity.resume_embedding,
        summary: disclosure.summary,
        match_reason: disclosure.match_reason,
        analysis: disclosure.analysis,
    };

    state
        .store
        .save_evaluation(candidate.org_id, candidate.id, &update)
        .await
        .map_err(AppError::Internal)?;

    info!(
        candidate_id = %candidate.id,
        job_id = %job.id,
        score,
        vector_match_score = update.vector_match_score,
        disclosed = disclosure.disclosed,
        "Candidate evaluated"
    );

    Ok(EvaluationOutcome {
        candidate_id: candidate.id,
        score,
        vector_match_score: update.vector_match_score,
        disclosed: disclosure.disclosed,
        verdict,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::gate::{WITHHELD_MATCH_REASON, WITHHELD_SUMMARY};
    use crate::models::organization::OrgSettings;
    use crate::testing::{sample_candidate, sample_job, TestHarness};
    use serde_json::json;

    fn resume_of_len(len: usize) -> String {
        let base = "Experienced Rust and Go backend engineer, distributed systems, Postgres. ";
        base.chars().cycle().take(len).collect()
    }

    fn analysis_json(score: i32) -> serde_json::Value {
        json!({
            "name": "Grace Hopper",
            "email": "grace@example.com",
            "score": score,
            "verdict": "Proceed",
            "summary": "Pioneering engineer with deep compiler experience.",
            "matchReason": "Matches the backend requirements closely.",
            "skills": ["Rust", "Go"],
            "intelligence": {"technicalScore": 85, "strengths": ["Depth"]}
        })
    }

    fn settings(threshold: i32) -> OrgSettings {
        OrgSettings {
            auto_report_threshold: threshold,
            ..OrgSettings::default()
        }
    }

    #[tokio::test]
    async fn test_end_to_end_disclosed_evaluation() {
        let harness = TestHarness::new().with_analysis(analysis_json(82));
        let job = sample_job();
        let mut candidate = sample_candidate();
        candidate.org_id = job.org_id;
        candidate.job_id = Some(job.id);
        harness.store.insert_job(job.clone());
        harness.store.insert_candidate(candidate.clone());
        harness.store.insert_settings(job.org_id, settings(75));

        let outcome = evaluate(
            &harness.state,
            candidate.org_id,
            candidate.id,
            EvaluateRequest {
                resume_text: Some(resume_of_len(1200)),
                ..EvaluateRequest::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.score, 82);
        assert!(outcome.disclosed);
        assert_eq!(outcome.verdict, Some(Verdict::Proceed));

        let stored = harness.store.candidate(candidate.id).unwrap();
        assert_eq!(stored.score, Some(82));
        assert!(stored.analysis.is_some());
        assert_eq!(
            stored.summary.as_deref(),
            Some("Pioneering engineer with deep compiler experience.")
        );
        assert_eq!(stored.skills.0[0].id, "skill-1");
        assert!((0..=100).contains(&stored.vector_match_score.unwrap()));
    }

    #[tokio::test]
    async fn test_rescreen_below_threshold_withholds_previous_report() {
        let harness = TestHarness::new().with_analysis(analysis_json(90));
        let job = sample_job();
        let mut candidate = sample_candidate();
        candidate.org_id = job.org_id;
        harness.store.insert_job(job.clone());
        harness.store.insert_candidate(candidate.clone());

        let request = EvaluateRequest {
            job_id: Some(job.id),
            resume_text: Some(resume_of_len(600)),
            ..EvaluateRequest::default()
        };

        let first = evaluate(&harness.state, job.org_id, candidate.id, request.clone())
            .await
            .unwrap();
        assert!(first.disclosed);
        assert!(harness.store.candidate(candidate.id).unwrap().analysis.is_some());

        harness.text_service.set_analysis(analysis_json(55));
        let second = evaluate(&harness.state, job.org_id, candidate.id, request)
            .await
            .unwrap();
        assert!(!second.disclosed);
        assert_eq!(second.verdict, None);

        let stored = harness.store.candidate(candidate.id).unwrap();
        assert!(stored.analysis.is_none());
        assert_eq!(stored.summary.as_deref(), Some(WITHHELD_SUMMARY));
        assert_eq!(stored.match_reason.as_deref(), Some(WITHHELD_MATCH_REASON));
        assert_eq!(stored.score, Some(55));
    }

    #[tokio::test]
    async fn test_short_resume_is_insufficient_and_never_scored() {
        let harness = TestHarness::new().with_analysis(analysis_json(99));
        let job = sample_job();
        let mut candidate = sample_candidate();
        candidate.org_id = job.org_id;
        harness.store.insert_job(job.clone());
        harness.store.insert_candidate(candidate.clone());

        let err = evaluate(
            &harness.state,
            job.org_id,
            candidate.id,
            EvaluateRequest {
                job_id: Some(job.id),
                resume_text: Some(resume_of_len(49)),
                ..EvaluateRequest::default()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InsufficientText(_)));
        assert_eq!(harness.text_service.generate_calls(), 0);
        assert_eq!(harness.store.candidate(candidate.id).unwrap().score, None);
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_zero_vector_score() {
        let harness = TestHarness::new()
            .with_analysis(analysis_json(82))
            .with_failing_embedder();
        let job = sample_job();
        let mut candidate = sample_candidate();
        candidate.org_id = job.org_id;
        harness.store.insert_job(job.clone());
        harness.store.insert_candidate(candidate.clone());

        let outcome = evaluate(
            &harness.state,
            job.org_id,
            candidate.id,
            EvaluateRequest {
                job_id: Some(job.id),
                resume_text: Some(resume_of_len(300)),
                ..EvaluateRequest::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.vector_match_score, 0);
        assert_eq!(outcome.score, 82);
        assert!(harness.store.candidate(candidate.id).unwrap().embedding.is_empty());
    }

    #[tokio::test]
    async fn test_analysis_failure_propagates_and_persists_nothing() {
        let harness = TestHarness::new();
        harness.text_service.fail_generation();
        let job = sample_job();
        let mut candidate = sample_candidate();
        candidate.org_id = job.org_id;
        harness.store.insert_job(job.clone());
        harness.store.insert_candidate(candidate.clone());

        let err = evaluate(
            &harness.state,
            job.org_id,
            candidate.id,
            EvaluateRequest {
                job_id: Some(job.id),
                resume_text: Some(resume_of_len(300)),
                ..EvaluateRequest::default()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::AnalysisFailed(_)));
        assert_eq!(harness.store.candidate(candidate.id).unwrap().score, None);
    }

    #[tokio::test]
    async fn test_org_kill_switch_blocks_before_any_call() {
        let harness = TestHarness::new().with_analysis(analysis_json(82));
        let job = sample_job();
        let mut candidate = sample_candidate();
        candidate.org_id = job.org_id;
        harness.store.insert_job(job.clone());
        harness.store.insert_candidate(candidate.clone());
        harness.store.insert_settings(
            job.org_id,
            OrgSettings {
                ai_enabled: false,
                ..OrgSettings::default()
            },
        );

        let err = evaluate(
            &harness.state,
            job.org_id,
            candidate.id,
            EvaluateRequest {
                job_id: Some(job.id),
                resume_text: Some(resume_of_len(300)),
                ..EvaluateRequest::default()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::CapabilityDenied(_)));
        assert_eq!(harness.text_service.generate_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_job_is_invalid_input() {
        let harness = TestHarness::new();
        let candidate = sample_candidate();
        harness.store.insert_candidate(candidate.clone());

        let err = evaluate(
            &harness.state,
            candidate.org_id,
            candidate.id,
            EvaluateRequest::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_resume_source_prefers_request_then_record() {
        let mut candidate = sample_candidate();
        candidate.resume_text = Some(resume_of_len(100));
        candidate.resume_url = Some("s3://b/resume_1.pdf".to_string());

        let from_record = resume_source(&EvaluateRequest::default(), &candidate).unwrap();
        assert!(matches!(from_record, ResumeSource::Inline(_)));

        let from_url = resume_source(
            &EvaluateRequest {
                resume_url: Some("s3://b/resume_2.pdf".to_string()),
                ..EvaluateRequest::default()
            },
            &candidate,
        )
        .unwrap();
        assert_eq!(
            from_url,
            ResumeSource::Reference("s3://b/resume_2.pdf".to_string())
        );

        candidate.resume_text =
            Some(crate::models::candidate::UNREADABLE_RESUME_SENTINEL.to_string());
        let fallback = resume_source(&EvaluateRequest::default(), &candidate).unwrap();
        assert_eq!(
            fallback,
            ResumeSource::Reference("s3://b/resume_1.pdf".to_string())
        );
    }
}
