#![forbid(unsafe_code)]

pub mod countdown;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod model;
pub mod scoring;
pub mod time;

pub use countdown::{ClockError, ClockEvent, SessionClock};
pub use error::Error;
pub use gate::RoundCatalog;
pub use ledger::{AnswerLedger, Completeness, LedgerError};
pub use scoring::{DomainScore, ScoreReport};
pub use time::Clock;
