use async_trait::async_trait;
use diagnosis_core::model::{
    Department, DiagnosisProgress, LearnerContext, RoundData, RoundNumber, RoundRecord,
    SubmissionPayload, SubmissionReceipt,
};
use std::sync::Arc;
use thiserror::Error;

use crate::memory::InMemoryRepository;

/// Errors surfaced by backend adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("round {round} is locked")]
    Locked { round: RoundNumber },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Source of per-round test data.
///
/// The payload carries the correct choices alongside the questions.
#[async_trait]
pub trait RoundDataRepository: Send + Sync {
    /// Fetch questions, answer key and time budget for one round.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the department or round is unknown, or
    /// other backend errors.
    async fn get_round_data(
        &self,
        learner: &LearnerContext,
        department: &Department,
        round: RoundNumber,
    ) -> Result<RoundData, StorageError>;
}

/// Source of a learner's completion history.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown department, or other backend errors.
    async fn get_progress(
        &self,
        learner: &LearnerContext,
        department: &Department,
    ) -> Result<DiagnosisProgress, StorageError>;

    /// Round metadata with the learner's latest score and completion date.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown department, or other backend errors.
    async fn list_rounds(
        &self,
        learner: &LearnerContext,
        department: &Department,
    ) -> Result<Vec<RoundRecord>, StorageError>;
}

/// Endpoint accepting finished sessions.
///
/// Implementations must treat `payload.session_id` as an idempotency key: a
/// repeated session id is acknowledged without being counted again.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Locked` if the backend rejects the round, or other
    /// backend errors.
    async fn submit_result(
        &self,
        learner: &LearnerContext,
        department: &Department,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, StorageError>;
}

/// Aggregates the collaborator contracts behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub rounds: Arc<dyn RoundDataRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub submissions: Arc<dyn SubmissionRepository>,
}

impl Storage {
    #[must_use]
    pub fn from_repository(repo: InMemoryRepository) -> Self {
        let rounds: Arc<dyn RoundDataRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let submissions: Arc<dyn SubmissionRepository> = Arc::new(repo);
        Self {
            rounds,
            progress,
            submissions,
        }
    }
}
