use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{Department, QuestionId, RoundNumber};
use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RoundError {
    #[error("round {round} has no questions")]
    NoQuestions { round: RoundNumber },

    #[error("round {round} has a zero time limit")]
    ZeroTimeLimit { round: RoundNumber },

    #[error("round {round} repeats question {id}")]
    DuplicateQuestion { round: RoundNumber, id: QuestionId },
}

/// Backend-owned description of one round, before availability is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_number: RoundNumber,
    pub focus_area: String,
    pub total_questions: u32,
    pub time_limit_seconds: u32,
    pub score: Option<u32>,
    pub completion_date: Option<DateTime<Utc>>,
}

/// One round as presented to the learner: metadata plus derived lock state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Round {
    pub department: Department,
    pub round_number: RoundNumber,
    pub focus_area: String,
    pub total_questions: u32,
    pub time_limit_seconds: u32,
    pub is_completed: bool,
    pub is_available: bool,
    pub score: Option<u32>,
    pub completion_date: Option<DateTime<Utc>>,
}

impl Round {
    /// Available and not yet completed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_available && !self.is_completed
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        !self.is_available
    }
}

/// Test data for a single attempt: questions (with the key embedded) and the clock budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoundDataRepr")]
pub struct RoundData {
    pub round_number: RoundNumber,
    pub focus_area: String,
    pub time_limit_seconds: u32,
    pub questions: Vec<Question>,
}

#[derive(Deserialize)]
struct RoundDataRepr {
    round_number: RoundNumber,
    focus_area: String,
    time_limit_seconds: u32,
    questions: Vec<Question>,
}

impl TryFrom<RoundDataRepr> for RoundData {
    type Error = RoundError;

    fn try_from(repr: RoundDataRepr) -> Result<Self, Self::Error> {
        let data = Self {
            round_number: repr.round_number,
            focus_area: repr.focus_area,
            time_limit_seconds: repr.time_limit_seconds,
            questions: repr.questions,
        };
        data.validate()?;
        Ok(data)
    }
}

impl RoundData {
    /// Checks the payload is usable for a session.
    ///
    /// # Errors
    ///
    /// Returns `RoundError` for an empty question set, a zero time limit or a
    /// repeated question id.
    pub fn validate(&self) -> Result<(), RoundError> {
        let round = self.round_number;
        if self.questions.is_empty() {
            return Err(RoundError::NoQuestions { round });
        }
        if self.time_limit_seconds == 0 {
            return Err(RoundError::ZeroTimeLimit { round });
        }
        let mut seen = std::collections::HashSet::with_capacity(self.questions.len());
        for q in &self.questions {
            if !seen.insert(q.id()) {
                return Err(RoundError::DuplicateQuestion { round, id: q.id() });
            }
        }
        Ok(())
    }
}
