use thiserror::Error;

use crate::countdown::ClockError;
use crate::ledger::LedgerError;
use crate::model::{IdError, ProgressError, QuestionError, RoundError, SettingsError};

/// Any validation failure raised by the domain layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Round(#[from] RoundError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Clock(#[from] ClockError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
