//! Shared error types for the services crate.

use thiserror::Error;

use diagnosis_core::model::{RoundError, RoundNumber, SessionId};
use diagnosis_core::{ClockError, LedgerError};
use storage::repository::StorageError;

use crate::sessions::SessionStatus;

/// Why a round could not be turned into a running session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Round(#[from] RoundError),
    #[error(transparent)]
    Clock(#[from] ClockError),
    #[error("requested round {expected} but received round {received}")]
    RoundMismatch {
        expected: RoundNumber,
        received: RoundNumber,
    },
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("round {round} is not available yet (max available round is {max_available})")]
    NotAvailable { round: RoundNumber, max_available: u8 },
    #[error("failed to load round {round}: {source}")]
    Load {
        round: RoundNumber,
        #[source]
        source: LoadError,
    },
    #[error("failed to submit session {session_id}: {source}")]
    Submit {
        session_id: SessionId,
        #[source]
        source: StorageError,
    },
    #[error("failed to fetch progress: {0}")]
    Progress(#[source] StorageError),
    #[error("cannot {operation} while session is {status}")]
    InvalidState {
        operation: &'static str,
        status: SessionStatus,
    },
    #[error("question index {index} is out of range for {total} questions")]
    QuestionOutOfRange { index: usize, total: usize },
    #[error("session was abandoned")]
    Abandoned,
    #[error("session state lock poisoned")]
    StatePoisoned,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl SessionError {
    /// Whether calling the same operation again may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::Submit { .. } | Self::Progress(_))
    }
}

/// Errors emitted by `RoundCatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
