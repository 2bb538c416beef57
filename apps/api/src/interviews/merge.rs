use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::InterviewSession;
use crate::storage::CandidateStore;

/// What a merge did to the session list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Replaced { index: usize },
    Appended,
    /// The identical session is already recorded; nothing changed.
    AlreadyRecorded,
}

/// Replaces the first upcoming session whose id equals `match_key`, or appends.
///
/// Replacing preserves list order and length. A redelivered event whose session is
/// already recorded verbatim is a no-op, so at-least-once delivery never duplicates.
///
/// An upcoming session with a token takes over any upcoming record holding the same
/// token, so a token is never held by more than one upcoming record.
pub fn merge_session(
    sessions: &mut Vec<InterviewSession>,
    session: InterviewSession,
    match_key: &str,
) -> MergeOutcome {
    if sessions.iter().any(|s| *s == session) {
        return MergeOutcome::AlreadyRecorded;
    }

    let token = upcoming_token(&session).map(str::to_string);
    let target = sessions
        .iter()
        .position(|s| s.id == match_key && s.is_upcoming())
        .or_else(|| {
            let token = token.as_deref()?;
            sessions
                .iter()
                .position(|s| upcoming_token(s) == Some(token))
        });

    let index = match target {
        Some(index) => {
            sessions[index] = session;
            index
        }
        None => {
            sessions.push(session);
            sessions.len() - 1
        }
    };

    let Some(token) = token else {
        return placed(target, index);
    };
    let mut position = 0;
    let mut kept_index = index;
    sessions.retain(|s| {
        let current = position;
        position += 1;
        let duplicate = current != index && upcoming_token(s) == Some(token.as_str());
        if duplicate && current < index {
            kept_index -= 1;
        }
        !duplicate
    });
    placed(target, kept_index)
}

fn upcoming_token(session: &InterviewSession) -> Option<&str> {
    session
        .token
        .as_deref()
        .filter(|t| session.is_upcoming() && !t.is_empty())
}

fn placed(target: Option<usize>, index: usize) -> MergeOutcome {
    match target {
        Some(_) => MergeOutcome::Replaced { index },
        None => MergeOutcome::Appended,
    }
}

/// Records a session outcome against a candidate. `match_key` defaults to the session id.
pub async fn record_session(
    store: &dyn CandidateStore,
    org_id: Uuid,
    candidate_id: Uuid,
    session: InterviewSession,
    match_key: Option<&str>,
) -> Result<Vec<InterviewSession>, AppError> {
    let key = match_key
        .filter(|k| !k.trim().is_empty())
        .unwrap_or(&session.id)
        .to_string();

    if session.id.trim().is_empty() {
        return Err(AppError::InvalidInput("session.id cannot be empty".to_string()));
    }

    debug!(
        candidate_id = %candidate_id,
        session_id = %session.id,
        match_key = %key,
        "Merging interview session"
    );

    let sessions = store
        .merge_interview_session(org_id, candidate_id, session, &key)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;

    info!(candidate_id = %candidate_id, sessions = sessions.len(), "Interview session recorded");
    Ok(sessions)
}
