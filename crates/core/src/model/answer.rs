use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;
use crate::model::question::{Choice, Confidence};

/// A learner's recorded answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub selected_choice: Choice,
    /// Seconds spent on the question before this choice was made.
    pub time_spent: u32,
    pub confidence_level: Option<Confidence>,
}

impl Answer {
    #[must_use]
    pub fn new(question_id: QuestionId, selected_choice: Choice) -> Self {
        Self {
            question_id,
            selected_choice,
            time_spent: 0,
            confidence_level: None,
        }
    }

    #[must_use]
    pub fn with_time_spent(mut self, seconds: u32) -> Self {
        self.time_spent = seconds;
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: Option<Confidence>) -> Self {
        self.confidence_level = confidence;
        self
    }
}
