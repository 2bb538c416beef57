//! AI capability check.
//!
//! Every entry point that may reach the text/vision or embedding service must first
//! obtain an [`AiPermit`]. The permit can only be minted by [`request_ai`], so a call
//! path that skipped the check does not type-check.

use std::fmt;

use serde::Serialize;

use crate::models::organization::OrgSettings;

/// Platform-level switches, loaded from configuration at startup.
#[derive(Debug, Clone, Copy)]
pub struct PlatformFlags {
    pub ai_enabled: bool,
}

/// Proof that the AI capability check passed for the current invocation.
#[derive(Debug, Clone, Copy)]
pub struct AiPermit {
    _private: (),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityDenied {
    PlatformDisabled,
    OrganizationDisabled,
}

impl fmt::Display for CapabilityDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityDenied::PlatformDisabled => {
                write!(f, "AI features are disabled for the platform")
            }
            CapabilityDenied::OrganizationDisabled => {
                write!(f, "AI features are disabled for this organization")
            }
        }
    }
}

impl std::error::Error for CapabilityDenied {}

/// Platform switch is checked before the organization's. Absent settings allow.
pub fn request_ai(
    platform: PlatformFlags,
    settings: Option<&OrgSettings>,
) -> Result<AiPermit, CapabilityDenied> {
    if !platform.ai_enabled {
        return Err(CapabilityDenied::PlatformDisabled);
    }
    if settings.is_some_and(|s| !s.ai_enabled) {
        return Err(CapabilityDenied::OrganizationDisabled);
    }
    Ok(AiPermit { _private: () })
}

#[cfg(test)]
pub(crate) fn test_permit() -> AiPermit {
    AiPermit { _private: () }
}
