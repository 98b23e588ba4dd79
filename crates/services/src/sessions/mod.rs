mod driver;
mod progress;
mod service;
mod ticker;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{LoadError, SessionError};
pub use driver::{SessionHandle, TickReport};
pub use progress::SessionSnapshot;
pub use service::{
    PendingSubmission, SessionFailure, SessionResult, SessionStatus, TestSession, TickOutcome,
};
pub use ticker::{ManualScheduler, Scheduler, Ticks, TokioScheduler};
pub use workflow::{AssessmentService, SubmitOutcome};
