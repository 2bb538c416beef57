//! Offer sub-record and its merge rules.
//!
//! Every write to a candidate's offer goes through [`Offer::apply`], both for the
//! Postgres store (inside a `FOR UPDATE` transaction) and the in-memory test store,
//! so poll and webhook paths share one deterministic policy:
//!
//! - A status for any envelope other than the current one is dropped.
//! - `docusign_status` mirrors the most recently applied provider status until the
//!   envelope reaches `Completed`, `Declined` or `Voided`. After that only a replay of
//!   the same terminal status is accepted.
//! - `signed_at`, `rejected_at` and `signed_document_url` are first-write-wins.
//!   Replaying `completed` never moves the signing time.
//! - Creating a new envelope starts a fresh round and clears the previous round's stamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal offer outcome. `None` on the record means no offer has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    Sent,
    Signed,
    Declined,
}

/// Envelope lifecycle in the internal vocabulary.
///
/// Provider values outside the fixed table are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvelopeStatus {
    Draft,
    Sent,
    Delivered,
    Completed,
    Declined,
    Voided,
    Other(String),
}

impl EnvelopeStatus {
    /// Maps a raw provider status (`created`, `sent`, ...) to the internal vocabulary.
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" => EnvelopeStatus::Draft,
            "sent" => EnvelopeStatus::Sent,
            "delivered" => EnvelopeStatus::Delivered,
            "completed" => EnvelopeStatus::Completed,
            "declined" => EnvelopeStatus::Declined,
            "voided" => EnvelopeStatus::Voided,
            _ => EnvelopeStatus::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EnvelopeStatus::Draft => "Draft",
            EnvelopeStatus::Sent => "Sent",
            EnvelopeStatus::Delivered => "Delivered",
            EnvelopeStatus::Completed => "Completed",
            EnvelopeStatus::Declined => "Declined",
            EnvelopeStatus::Voided => "Voided",
            EnvelopeStatus::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EnvelopeStatus::Completed | EnvelopeStatus::Declined | EnvelopeStatus::Voided
        )
    }
}

impl From<String> for EnvelopeStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Draft" => EnvelopeStatus::Draft,
            "Sent" => EnvelopeStatus::Sent,
            "Delivered" => EnvelopeStatus::Delivered,
            "Completed" => EnvelopeStatus::Completed,
            "Declined" => EnvelopeStatus::Declined,
            "Voided" => EnvelopeStatus::Voided,
            _ => EnvelopeStatus::Other(value),
        }
    }
}

impl From<EnvelopeStatus> for String {
    fn from(value: EnvelopeStatus) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Offer {
    pub status: Option<OfferStatus>,
    pub docusign_status: Option<EnvelopeStatus>,
    pub docusign_envelope_id: Option<String>,
    pub job_title: Option<String>,
    pub salary: Option<String>,
    pub start_date: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub signed_document_url: Option<String>,
}

/// A single mutation of the offer sub-record.
#[derive(Debug, Clone, PartialEq)]
pub enum OfferChange {
    /// A new envelope was created and sent.
    Sent {
        envelope_id: String,
        job_title: Option<String>,
        salary: Option<String>,
        start_date: Option<String>,
        at: DateTime<Utc>,
    },
    /// A provider status observed by poll or webhook for `envelope_id`.
    Status {
        envelope_id: String,
        status: EnvelopeStatus,
        at: DateTime<Utc>,
        signed_document_url: Option<String>,
    },
}

impl OfferChange {
    /// Envelope id this change introduces, if any. Stores index it alongside the write.
    pub fn new_envelope_id(&self) -> Option<&str> {
        match self {
            OfferChange::Sent { envelope_id, .. } => Some(envelope_id),
            OfferChange::Status { .. } => None,
        }
    }
}

/// What [`Offer::apply`] did with a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferWrite {
    Applied,
    /// The status belongs to an envelope the offer no longer tracks.
    StaleEnvelope,
    /// The envelope already reached a different terminal status.
    Settled,
}

/// An offer after a store write, with what the write did.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferUpdate {
    pub offer: Offer,
    pub write: OfferWrite,
}

impl Offer {
    #[must_use]
    pub fn apply(&mut self, change: &OfferChange) -> OfferWrite {
        match change {
            OfferChange::Sent {
                envelope_id,
                job_title,
                salary,
                start_date,
                at,
            } => {
                self.status = Some(OfferStatus::Sent);
                self.docusign_status = Some(EnvelopeStatus::Sent);
                self.docusign_envelope_id = Some(envelope_id.clone());
                self.job_title = job_title.clone().or(self.job_title.take());
                self.salary = salary.clone().or(self.salary.take());
                self.start_date = start_date.clone().or(self.start_date.take());
                self.sent_at = Some(*at);
                self.signed_at = None;
                self.rejected_at = None;
                self.signed_document_url = None;
                OfferWrite::Applied
            }
            OfferChange::Status {
                envelope_id,
                status,
                at,
                signed_document_url,
            } => {
                if self.docusign_envelope_id.as_deref() != Some(envelope_id.as_str()) {
                    return OfferWrite::StaleEnvelope;
                }
                if let Some(current) = &self.docusign_status {
                    if current.is_terminal() && current != status {
                        return OfferWrite::Settled;
                    }
                }

                self.docusign_status = Some(status.clone());
                match status {
                    EnvelopeStatus::Completed => {
                        self.status = Some(OfferStatus::Signed);
                        self.signed_at.get_or_insert(*at);
                        if self.signed_document_url.is_none() {
                            self.signed_document_url = signed_document_url.clone();
                        }
                    }
                    EnvelopeStatus::Declined => {
                        self.status = Some(OfferStatus::Declined);
                        self.rejected_at.get_or_insert(*at);
                    }
                    _ => {}
                }
                OfferWrite::Applied
            }
        }
    }
}
