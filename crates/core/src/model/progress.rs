use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::ids::{Department, MAX_ROUNDS, RoundNumber};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("total rounds must be between 1 and {MAX_ROUNDS}, got {0}")]
    InvalidTotalRounds(u8),

    #[error("max available round {max} is outside 1..={sentinel}")]
    InvalidMaxAvailable { max: u8, sentinel: u8 },

    #[error("completed round {round} exceeds total rounds {total}")]
    CompletedBeyondTotal { round: RoundNumber, total: u8 },
}

/// Where a learner stands next in a department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "round")]
pub enum NextRound {
    Round(RoundNumber),
    /// Every round has been completed (the `total_rounds + 1` sentinel).
    AllComplete,
}

impl NextRound {
    /// Interpret a raw unlock pointer; anything past `total_rounds` is the sentinel.
    #[must_use]
    pub fn from_pointer(pointer: u8, total_rounds: u8) -> Self {
        if pointer > total_rounds {
            return Self::AllComplete;
        }
        RoundNumber::new(pointer).map_or(Self::AllComplete, Self::Round)
    }

    #[must_use]
    pub fn round(self) -> Option<RoundNumber> {
        match self {
            Self::Round(round) => Some(round),
            Self::AllComplete => None,
        }
    }
}

/// Completion history of a learner in one department, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProgressRepr")]
pub struct DiagnosisProgress {
    department: Department,
    total_rounds: u8,
    max_available_round: u8,
    completed_rounds: BTreeSet<RoundNumber>,
    total_tests_completed: u32,
    average_score: f64,
    completion_rate: f64,
}

#[derive(Deserialize)]
struct ProgressRepr {
    department: Department,
    total_rounds: u8,
    max_available_round: u8,
    completed_rounds: BTreeSet<RoundNumber>,
    total_tests_completed: u32,
    average_score: f64,
    completion_rate: f64,
}

impl TryFrom<ProgressRepr> for DiagnosisProgress {
    type Error = ProgressError;

    fn try_from(repr: ProgressRepr) -> Result<Self, Self::Error> {
        Self::from_persisted(
            repr.department,
            repr.total_rounds,
            repr.max_available_round,
            repr.completed_rounds,
            repr.total_tests_completed,
            repr.average_score,
            repr.completion_rate,
        )
    }
}

impl DiagnosisProgress {
    /// Rehydrate progress exactly as the backend reported it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` when the totals or the unlock pointer are out of range.
    pub fn from_persisted(
        department: Department,
        total_rounds: u8,
        max_available_round: u8,
        completed_rounds: BTreeSet<RoundNumber>,
        total_tests_completed: u32,
        average_score: f64,
        completion_rate: f64,
    ) -> Result<Self, ProgressError> {
        if total_rounds == 0 || total_rounds > MAX_ROUNDS {
            return Err(ProgressError::InvalidTotalRounds(total_rounds));
        }
        let sentinel = total_rounds + 1;
        if max_available_round == 0 || max_available_round > sentinel {
            return Err(ProgressError::InvalidMaxAvailable {
                max: max_available_round,
                sentinel,
            });
        }
        if let Some(round) = completed_rounds
            .iter()
            .find(|r| r.value() > total_rounds)
            .copied()
        {
            return Err(ProgressError::CompletedBeyondTotal {
                round,
                total: total_rounds,
            });
        }

        Ok(Self {
            department,
            total_rounds,
            max_available_round,
            completed_rounds,
            total_tests_completed,
            average_score,
            completion_rate,
        })
    }

    /// Compute progress from the latest score of each completed round.
    ///
    /// `max_available_round` is `count(completed) + 1`, capped at the
    /// `total_rounds + 1` sentinel.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if `total_rounds` is out of range or a completed
    /// round lies beyond it.
    pub fn from_completed(
        department: Department,
        total_rounds: u8,
        scores: &BTreeMap<RoundNumber, f64>,
        total_tests_completed: u32,
    ) -> Result<Self, ProgressError> {
        if total_rounds == 0 || total_rounds > MAX_ROUNDS {
            return Err(ProgressError::InvalidTotalRounds(total_rounds));
        }
        let completed: BTreeSet<RoundNumber> = scores.keys().copied().collect();
        // at most MAX_ROUNDS entries once validated below
        let count = u8::try_from(completed.len()).unwrap_or(u8::MAX);
        let max_available = count.saturating_add(1).min(total_rounds + 1);

        #[allow(clippy::cast_precision_loss)]
        let average = if scores.is_empty() {
            0.0
        } else {
            scores.values().sum::<f64>() / scores.len() as f64
        };
        let rate = f64::from(count.min(total_rounds)) / f64::from(total_rounds) * 100.0;

        Self::from_persisted(
            department,
            total_rounds,
            max_available,
            completed,
            total_tests_completed,
            average,
            rate,
        )
    }

    /// Fresh progress with nothing completed: only round 1 is open.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidTotalRounds` if `total_rounds` is out of range.
    pub fn fresh(department: Department, total_rounds: u8) -> Result<Self, ProgressError> {
        Self::from_completed(department, total_rounds, &BTreeMap::new(), 0)
    }

    #[must_use]
    pub fn department(&self) -> &Department {
        &self.department
    }

    #[must_use]
    pub fn total_rounds(&self) -> u8 {
        self.total_rounds
    }

    /// Highest unlocked round number; `total_rounds + 1` means all complete.
    #[must_use]
    pub fn max_available_round(&self) -> u8 {
        self.max_available_round
    }

    #[must_use]
    pub fn completed_rounds(&self) -> &BTreeSet<RoundNumber> {
        &self.completed_rounds
    }

    #[must_use]
    pub fn is_completed(&self, round: RoundNumber) -> bool {
        self.completed_rounds.contains(&round)
    }

    #[must_use]
    pub fn total_tests_completed(&self) -> u32 {
        self.total_tests_completed
    }

    #[must_use]
    pub fn average_score(&self) -> f64 {
        self.average_score
    }

    /// Percentage of rounds completed.
    #[must_use]
    pub fn completion_rate(&self) -> f64 {
        self.completion_rate
    }

    #[must_use]
    pub fn sentinel(&self) -> u8 {
        self.total_rounds + 1
    }
}
