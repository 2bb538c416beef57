//! Similarity matcher: secondary, vector-based resume/job match score.
//!
//! The whole step is best-effort: nothing in here returns an error. Embedding
//! failures degrade to an empty vector, and an empty vector degrades to a zero score.

use tracing::{debug, warn};

use crate::capability::AiPermit;
use crate::models::candidate::{ExperienceRecord, SkillRecord};
use crate::models::job::Job;
use crate::similarity::embedder::Embedder;
use crate::storage::CandidateStore;

/// Hard cap on characters sent to the embedding service, after whitespace collapsing.
pub const MAX_EMBEDDING_INPUT_CHARS: usize = 8000;
/// Inputs shorter than this are refused without a network call.
pub const MIN_EMBEDDING_INPUT_CHARS: usize = 5;

const PROFILE_EXPERIENCE_ENTRIES: usize = 3;
const PROFILE_RAW_TEXT_CHARS: usize = 3000;

/// Structured view of a resume used to build a semantically dense embedding input.
#[derive(Debug, Clone, Copy)]
pub struct ResumeProfile<'a> {
    pub name: Option<&'a str>,
    pub skills: &'a [SkillRecord],
    pub summary: Option<&'a str>,
    pub experience: &'a [ExperienceRecord],
    pub raw_text: &'a str,
}

/// Result of matching one resume against one job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityMatch {
    pub score: i32,
    pub resume_embedding: Vec<f32>,
}

/// Collapses whitespace and truncates to the embedding cap.
/// Returns `None` when the input is too short to embed.
pub fn prepare_embedding_input(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() < MIN_EMBEDDING_INPUT_CHARS {
        return None;
    }
    Some(collapsed.chars().take(MAX_EMBEDDING_INPUT_CHARS).collect())
}

/// Embeds `text`. Never fails: short input or any service error yields an empty vector.
pub async fn embed(embedder: &dyn Embedder, _permit: &AiPermit, text: &str) -> Vec<f32> {
    let Some(input) = prepare_embedding_input(text) else {
        debug!("Embedding input too short, skipping");
        return Vec::new();
    };

    match embedder.embed_raw(&input).await {
        Ok(vector) => vector,
        Err(e) => {
            warn!(error = %e, "Embedding generation failed");
            Vec::new()
        }
    }
}

/// Cosine similarity in [-1, 1]. Empty, mismatched or zero-norm vectors give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// `round(similarity * 100)`, clamped to [0, 100].
pub fn vector_match_score(similarity: f64) -> i32 {
    if !similarity.is_finite() {
        return 0;
    }
    ((similarity * 100.0).round() as i32).clamp(0, 100)
}

pub fn resume_embedding_text(profile: &ResumeProfile<'_>) -> String {
    let mut parts = Vec::new();

    if let Some(name) = profile.name.filter(|n| !n.trim().is_empty()) {
        parts.push(format!("Name: {name}"));
    }
    if let Some(role) = profile.experience.first().map(|e| e.title.as_str()) {
        if !role.trim().is_empty() {
            parts.push(format!("Role: {role}"));
        }
    }
    if !profile.skills.is_empty() {
        let skills: Vec<&str> = profile.skills.iter().map(|s| s.name.as_str()).collect();
        parts.push(format!("Skills: {}", skills.join(", ")));
    }
    if let Some(summary) = profile.summary.filter(|s| !s.trim().is_empty()) {
        parts.push(format!("Summary: {summary}"));
    }
    for exp in profile.experience.iter().take(PROFILE_EXPERIENCE_ENTRIES) {
        let mut line = format!("Experience: {} at {}", exp.title, exp.company);
        if let Some(desc) = exp.description.as_deref().filter(|d| !d.trim().is_empty()) {
            line.push_str(": ");
            line.push_str(desc);
        }
        parts.push(line);
    }

    let raw: String = profile.raw_text.chars().take(PROFILE_RAW_TEXT_CHARS).collect();
    if !raw.trim().is_empty() {
        parts.push(raw);
    }

    parts.join("\n")
}

pub fn job_embedding_text(job: &Job) -> String {
    job.full_description()
}

/// Returns the job's embedding, generating and caching it on first use.
pub async fn job_embedding(
    store: &dyn CandidateStore,
    embedder: &dyn Embedder,
    permit: &AiPermit,
    job: &Job,
) -> Vec<f32> {
    if !job.embedding.is_empty() {
        return job.embedding.clone();
    }

    let embedding = embed(embedder, permit, &job_embedding_text(job)).await;
    if embedding.is_empty() {
        return embedding;
    }

    if let Err(e) = store.save_job_embedding(job.org_id, job.id, &embedding).await {
        warn!(job_id = %job.id, error = %e, "Failed to cache job embedding");
    }
    embedding
}

/// Computes the vector match for a resume against a job. Never fails.
pub async fn match_resume(
    store: &dyn CandidateStore,
    embedder: &dyn Embedder,
    permit: &AiPermit,
    job: &Job,
    profile: &ResumeProfile<'_>,
) -> SimilarityMatch {
    let resume_embedding = embed(embedder, permit, &resume_embedding_text(profile)).await;
    if resume_embedding.is_empty() {
        return SimilarityMatch::default();
    }

    let job_vector = job_embedding(store, embedder, permit, job).await;
    let similarity = cosine_similarity(&resume_embedding, &job_vector);
    let score = vector_match_score(similarity);

    debug!(job_id = %job.id, similarity, score, "Vector match computed");
    SimilarityMatch {
        score,
        resume_embedding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::test_permit;
    use crate::testing::{sample_job, FakeEmbedder, MemoryStore};

    #[test]
    fn test_cosine_of_vector_with_itself_is_one() {
        let v = [0.3_f32, -1.2, 4.0, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let a = [1.0_f32, 2.0, 3.0];
        let b = [-0.5_f32, 4.0, 0.25];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_cosine_safe_defaults() {
        assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_of_opposite_vectors_is_minus_one() {
        let a = [1.0_f32, 1.0];
        let b = [-1.0_f32, -1.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_vector_match_score_bounds() {
        assert_eq!(vector_match_score(1.0), 100);
        assert_eq!(vector_match_score(0.824), 82);
        assert_eq!(vector_match_score(0.826), 83);
        assert_eq!(vector_match_score(-0.7), 0);
        assert_eq!(vector_match_score(f64::NAN), 0);
        for i in -100..=100 {
            let score = vector_match_score(i as f64 / 100.0);
            assert!((0..=100).contains(&score));
        }
    }

    #[test]
    fn test_prepare_collapses_whitespace_and_caps_length() {
        let input = format!("  a \n\n b\t\tc {}", "x".repeat(9000));
        let prepared = prepare_embedding_input(&input).unwrap();
        assert!(prepared.starts_with("a b c x"));
        assert_eq!(prepared.chars().count(), MAX_EMBEDDING_INPUT_CHARS);
    }

    #[test]
    fn test_prepare_refuses_short_input() {
        assert!(prepare_embedding_input("  ab \n c ").is_none());
        assert!(prepare_embedding_input("abcde").is_some());
    }

    #[test]
    fn test_resume_text_includes_profile_sections() {
        let skills = vec![SkillRecord {
            id: "skill-1".into(),
            name: "Rust".into(),
            ..SkillRecord::default()
        }];
        let experience: Vec<ExperienceRecord> = (1..=5)
            .map(|i| ExperienceRecord {
                id: format!("exp-{i}"),
                title: format!("Engineer {i}"),
                company: "Acme".into(),
                ..ExperienceRecord::default()
            })
            .collect();
        let profile = ResumeProfile {
            name: Some("Ada"),
            skills: &skills,
            summary: Some("Systems engineer"),
            experience: &experience,
            raw_text: "raw resume body",
        };

        let text = resume_embedding_text(&profile);
        assert!(text.contains("Name: Ada"));
        assert!(text.contains("Role: Engineer 1"));
        assert!(text.contains("Skills: Rust"));
        assert!(text.contains("Engineer 3 at Acme"));
        assert!(!text.contains("Engineer 4 at Acme"));
        assert!(text.ends_with("raw resume body"));
    }

    #[tokio::test]
    async fn test_embed_failure_degrades_to_empty() {
        let embedder = FakeEmbedder::failing();
        let vector = embed(&embedder, &test_permit(), "a perfectly long input").await;
        assert!(vector.is_empty());
    }

    #[tokio::test]
    async fn test_short_input_makes_no_call() {
        let embedder = FakeEmbedder::constant(vec![1.0, 0.0]);
        let vector = embed(&embedder, &test_permit(), "abc").await;
        assert!(vector.is_empty());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_job_embedding_generated_once_and_cached() {
        let store = MemoryStore::default();
        let job = sample_job();
        store.insert_job(job.clone());
        let embedder = FakeEmbedder::constant(vec![0.5, 0.5]);

        let first = job_embedding(&store, &embedder, &test_permit(), &job).await;
        assert_eq!(first, vec![0.5, 0.5]);
        assert_eq!(embedder.calls(), 1);

        let cached_job = store.job(job.id).unwrap();
        assert_eq!(cached_job.embedding, vec![0.5, 0.5]);

        let second = job_embedding(&store, &embedder, &test_permit(), &cached_job).await;
        assert_eq!(second, first);
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn test_match_resume_scores_identical_vectors_100() {
        let store = MemoryStore::default();
        let job = sample_job();
        store.insert_job(job.clone());
        let embedder = FakeEmbedder::constant(vec![0.1, 0.2, 0.3]);
        let profile = ResumeProfile {
            name: Some("Ada"),
            skills: &[],
            summary: None,
            experience: &[],
            raw_text: "Rust engineer with ten years of experience",
        };

        let result = match_resume(&store, &embedder, &test_permit(), &job, &profile).await;
        assert_eq!(result.score, 100);
        assert_eq!(result.resume_embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_match_resume_failure_is_zero() {
        let store = MemoryStore::default();
        let job = sample_job();
        let embedder = FakeEmbedder::failing();
        let profile = ResumeProfile {
            name: None,
            skills: &[],
            summary: None,
            experience: &[],
            raw_text: "Rust engineer with ten years of experience",
        };

        let result = match_resume(&store, &embedder, &test_permit(), &job, &profile).await;
        assert_eq!(result, SimilarityMatch::default());
    }
}
