use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_AUTO_REPORT_THRESHOLD: i32 = 80;

/// Per-organization screening policy. Missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgSettings {
    pub auto_report_enabled: bool,
    pub auto_report_threshold: i32,
    pub ai_enabled: bool,
}

impl Default for OrgSettings {
    fn default() -> Self {
        Self {
            auto_report_enabled: true,
            auto_report_threshold: DEFAULT_AUTO_REPORT_THRESHOLD,
            ai_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub settings: Json<OrgSettings>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: OrgSettings =
            serde_json::from_str(r#"{"auto_report_threshold": 75}"#).unwrap();
        assert_eq!(settings.auto_report_threshold, 75);
        assert!(settings.auto_report_enabled);
        assert!(settings.ai_enabled);
    }
}
