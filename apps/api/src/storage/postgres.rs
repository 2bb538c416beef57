use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::interviews::merge::merge_session;
use crate::models::candidate::{Candidate, CandidateRef, EvaluationUpdate};
use crate::models::interview::InterviewSession;
use crate::models::job::Job;
use crate::models::offer::{Offer, OfferChange, OfferUpdate, OfferWrite};
use crate::models::organization::Organization;
use crate::storage::CandidateStore;

/// Postgres-backed document store. Sub-records live in JSONB columns.
#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn get_candidate(&self, org_id: Uuid, candidate_id: Uuid) -> Result<Option<Candidate>> {
        sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE org_id = $1 AND id = $2")
            .bind(org_id)
            .bind(candidate_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load candidate")
    }

    async fn get_job(&self, org_id: Uuid, job_id: Uuid) -> Result<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE org_id = $1 AND id = $2")
            .bind(org_id)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load job")
    }

    async fn save_job_embedding(
        &self,
        org_id: Uuid,
        job_id: Uuid,
        embedding: &[f32],
    ) -> Result<()> {
        // Only the first writer caches; a concurrent evaluation keeps the existing vector.
        let result = sqlx::query(
            "UPDATE jobs SET embedding = $3 WHERE org_id = $1 AND id = $2 AND cardinality(embedding) = 0",
        )
        .bind(org_id)
        .bind(job_id)
        .bind(embedding)
        .execute(&self.pool)
        .await
        .context("Failed to cache job embedding")?;

        debug!(
            job_id = %job_id,
            rows = result.rows_affected(),
            "Job embedding cache write"
        );
        Ok(())
    }

    async fn get_organization(&self, org_id: Uuid) -> Result<Option<Organization>> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load organization")
    }

    async fn record_resume_text(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        resume_text: &str,
        parsed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE candidates
            SET resume_text = $3, resume_parsed_at = $4, updated_at = NOW()
            WHERE org_id = $1 AND id = $2
            "#,
        )
        .bind(org_id)
        .bind(candidate_id)
        .bind(resume_text)
        .bind(parsed_at)
        .execute(&self.pool)
        .await
        .context("Failed to record resume text")?;
        Ok(())
    }

    async fn save_evaluation(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        update: &EvaluationUpdate,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE candidates SET
                name = COALESCE($3, name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                links = $6,
                resume_text = $7,
                resume_parsed_at = COALESCE(resume_parsed_at, NOW()),
                score = $8,
                vector_match_score = $9,
                skills = $10,
                experience = $11,
                education = $12,
                embedding = $13,
                summary = $14,
                match_reason = $15,
                analysis = $16,
                updated_at = NOW()
            WHERE org_id = $1 AND id = $2
            "#,
        )
        .bind(org_id)
        .bind(candidate_id)
        .bind(update.name.as_deref())
        .bind(update.email.as_deref())
        .bind(update.phone.as_deref())
        .bind(Json(&update.links))
        .bind(&update.resume_text)
        .bind(update.score)
        .bind(update.vector_match_score)
        .bind(Json(&update.skills))
        .bind(Json(&update.experience))
        .bind(Json(&update.education))
        .bind(&update.embedding)
        .bind(&update.summary)
        .bind(&update.match_reason)
        .bind(update.analysis.as_ref().map(Json))
        .execute(&self.pool)
        .await
        .context("Failed to save evaluation")?;

        info!(candidate_id = %candidate_id, score = update.score, "Saved evaluation");
        Ok(())
    }

    async fn merge_interview_session(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        session: InterviewSession,
        match_key: &str,
    ) -> Result<Option<Vec<InterviewSession>>> {
        let mut tx = self.pool.begin().await?;

        let current: Option<Json<Vec<InterviewSession>>> = sqlx::query_scalar(
            "SELECT interviews FROM candidates WHERE org_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(org_id)
        .bind(candidate_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock candidate interviews")?;

        let Some(Json(mut sessions)) = current else {
            return Ok(None);
        };

        merge_session(&mut sessions, session, match_key);

        sqlx::query(
            "UPDATE candidates SET interviews = $3, updated_at = NOW() WHERE org_id = $1 AND id = $2",
        )
        .bind(org_id)
        .bind(candidate_id)
        .bind(Json(&sessions))
        .execute(&mut *tx)
        .await
        .context("Failed to write candidate interviews")?;

        tx.commit().await?;
        Ok(Some(sessions))
    }

    async fn update_offer(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        change: &OfferChange,
    ) -> Result<Option<OfferUpdate>> {
        let mut tx = self.pool.begin().await?;

        let current: Option<Option<Json<Offer>>> = sqlx::query_scalar(
            "SELECT offer FROM candidates WHERE org_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(org_id)
        .bind(candidate_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock candidate offer")?;

        let Some(current) = current else {
            return Ok(None);
        };

        let mut offer = current.map(|o| o.0).unwrap_or_default();
        let write = offer.apply(change);
        if write != OfferWrite::Applied {
            tx.rollback().await?;
            debug!(candidate_id = %candidate_id, ?write, "Offer change dropped");
            return Ok(Some(OfferUpdate { offer, write }));
        }

        sqlx::query(
            "UPDATE candidates SET offer = $3, updated_at = NOW() WHERE org_id = $1 AND id = $2",
        )
        .bind(org_id)
        .bind(candidate_id)
        .bind(Json(&offer))
        .execute(&mut *tx)
        .await
        .context("Failed to write candidate offer")?;

        if let Some(envelope_id) = change.new_envelope_id() {
            sqlx::query(
                r#"
                INSERT INTO offer_envelopes (envelope_id, org_id, candidate_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (envelope_id)
                DO UPDATE SET org_id = EXCLUDED.org_id, candidate_id = EXCLUDED.candidate_id
                "#,
            )
            .bind(envelope_id)
            .bind(org_id)
            .bind(candidate_id)
            .execute(&mut *tx)
            .await
            .context("Failed to index offer envelope")?;
        }

        tx.commit().await?;
        Ok(Some(OfferUpdate { offer, write }))
    }

    async fn find_offer_owner(&self, envelope_id: &str) -> Result<Option<CandidateRef>> {
        sqlx::query_as::<_, CandidateRef>(
            "SELECT org_id, candidate_id FROM offer_envelopes WHERE envelope_id = $1",
        )
        .bind(envelope_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up envelope owner")
    }
}
