use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub org_id: Uuid,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    /// Cached job embedding. Empty until first generated.
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// The job description as handed to the analysis engine and the embedder.
    pub fn full_description(&self) -> String {
        let mut text = format!("{}\n\n{}", self.title.trim(), self.description.trim());
        if let Some(reqs) = self.requirements.as_deref().filter(|r| !r.trim().is_empty()) {
            text.push_str("\n\nRequirements:\n");
            text.push_str(reqs.trim());
        }
        text
    }
}
