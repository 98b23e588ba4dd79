use diagnosis_core::model::SessionId;
use serde::Serialize;

use super::service::SessionStatus;

/// Aggregated view of a running session, published to observers on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub remaining_seconds: u32,
    pub answered: usize,
    pub total: usize,
    pub current_index: usize,
    pub low_on_time: bool,
    /// Set once the session has completed.
    pub is_auto_submit: Option<bool>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }
}
