use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::{RoundNumber, SessionId};

/// Qualitative band for a percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerformanceLevel {
    Insufficient,
    Basic,
    Intermediate,
    Advanced,
    Excellent,
}

impl PerformanceLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Advanced => "Advanced",
            Self::Intermediate => "Intermediate",
            Self::Basic => "Basic",
            Self::Insufficient => "Insufficient",
        }
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a session to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

impl SubmitTrigger {
    #[must_use]
    pub fn from_manual(manual: bool) -> Self {
        if manual { Self::Manual } else { Self::Timeout }
    }

    #[must_use]
    pub fn is_auto(self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Body sent to the submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub round_number: RoundNumber,
    /// Rounded percentage.
    pub score: u32,
    pub elapsed_seconds: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub session_id: SessionId,
    pub level: PerformanceLevel,
}

/// Endpoint answer to an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Raw unlock pointer; `total_rounds + 1` once everything is complete.
    pub next_available_round: u8,
    /// The session id had already been accepted; nothing was counted twice.
    #[serde(default)]
    pub duplicate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_from_lowest_to_highest() {
        assert!(PerformanceLevel::Excellent > PerformanceLevel::Advanced);
        assert!(PerformanceLevel::Basic > PerformanceLevel::Insufficient);
        assert_eq!(PerformanceLevel::Intermediate.to_string(), "Intermediate");
    }

    #[test]
    fn trigger_from_manual_flag() {
        assert_eq!(SubmitTrigger::from_manual(true), SubmitTrigger::Manual);
        assert!(SubmitTrigger::from_manual(false).is_auto());
    }
}
