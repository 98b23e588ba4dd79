#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod sessions;

pub use diagnosis_core::Clock;
pub use sessions as session;

pub use catalog::RoundCatalogService;
pub use error::{CatalogError, LoadError, SessionError};

pub use sessions::{
    AssessmentService, ManualScheduler, Scheduler, SessionHandle, SessionResult, SessionSnapshot,
    SessionStatus, SubmitOutcome, TestSession, TickReport, TokioScheduler,
};
