mod answer;
mod context;
mod ids;
mod progress;
mod question;
mod result;
mod round;
mod settings;

pub use answer::Answer;
pub use context::LearnerContext;
pub use ids::{Department, IdError, LearnerId, MAX_ROUNDS, QuestionId, RoundNumber, SessionId};
pub use progress::{DiagnosisProgress, NextRound, ProgressError};
pub use question::{
    AnswerKey, Choice, Confidence, Difficulty, KeyEntry, MAX_OPTIONS, Question, QuestionError,
};
pub use result::{PerformanceLevel, SubmissionPayload, SubmissionReceipt, SubmitTrigger};
pub use round::{Round, RoundData, RoundError, RoundRecord};
pub use settings::{AssessmentSettings, AssessmentSettingsDraft, SettingsError};
