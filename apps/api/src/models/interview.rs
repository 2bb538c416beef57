use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Upcoming,
    InProgress,
    Completed,
    Cancelled,
    Expired,
}

/// One interview slot or completed session recorded against a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: String,
    #[serde(default)]
    pub token: Option<String>,
    pub status: SessionStatus,
    #[serde(default)]
    pub assessment_id: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transcript: Option<Value>,
    #[serde(default)]
    pub outcome: Option<Value>,
}

impl InterviewSession {
    pub fn is_upcoming(&self) -> bool {
        self.status == SessionStatus::Upcoming
    }
}
