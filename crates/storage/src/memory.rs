use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diagnosis_core::Clock;
use diagnosis_core::{gate, scoring};
use diagnosis_core::model::{
    Department, DiagnosisProgress, LearnerContext, LearnerId, RoundData, RoundNumber,
    RoundRecord, SessionId, SubmissionPayload, SubmissionReceipt,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::repository::{
    ProgressRepository, RoundDataRepository, StorageError, SubmissionRepository,
};

/// Latest accepted result for a round. A retake replaces it.
#[derive(Debug, Clone, PartialEq)]
struct Completion {
    /// Rounded, as reported back in `RoundRecord::score`.
    score: u32,
    /// Exact percentage; averages are built from this.
    percentage: f64,
    completed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LearnerRecord {
    completions: BTreeMap<RoundNumber, Completion>,
    receipts: HashMap<SessionId, SubmissionReceipt>,
    accepted: Vec<SubmissionPayload>,
}

#[derive(Debug, Default)]
struct State {
    catalogs: HashMap<Department, BTreeMap<RoundNumber, RoundData>>,
    learners: HashMap<(LearnerId, Department), LearnerRecord>,
}

/// In-memory backend for testing, demos and prototyping.
///
/// Behaves like the remote portal API: submissions are idempotent per session id,
/// the round's availability is re-validated on submit, and a retake overwrites the
/// previous score of that round.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    clock: Clock,
    state: Arc<Mutex<State>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::default(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Use `clock` for completion dates.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Register (or replace) a round of a department's catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidData` if the round data is unusable.
    pub fn upsert_round(&self, department: &Department, data: RoundData) -> Result<(), StorageError> {
        data.validate()
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        let mut state = self.lock()?;
        state
            .catalogs
            .entry(department.clone())
            .or_default()
            .insert(data.round_number, data);
        Ok(())
    }

    /// Submissions accepted (not counting duplicates) for a learner and department.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn accepted_submissions(
        &self,
        learner: &LearnerContext,
        department: &Department,
    ) -> Result<Vec<SubmissionPayload>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .learners
            .get(&(learner.learner_id(), department.clone()))
            .map(|r| r.accepted.clone())
            .unwrap_or_default())
    }

    /// Departments with at least one round, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn departments(&self) -> Result<Vec<Department>, StorageError> {
        let state = self.lock()?;
        let mut names: Vec<Department> = state.catalogs.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Number of rounds in a department's catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown department and
    /// `StorageError::InvalidData` when the round numbers are not `1..=len`.
    pub fn round_count(&self, department: &Department) -> Result<u8, StorageError> {
        let state = self.lock()?;
        let catalog = state.catalogs.get(department).ok_or(StorageError::NotFound)?;
        total_rounds(catalog)
    }
}

/// Round count of a catalog whose round numbers run `1..=len` without gaps.
fn total_rounds(catalog: &BTreeMap<RoundNumber, RoundData>) -> Result<u8, StorageError> {
    let total = u8::try_from(catalog.len())
        .map_err(|_| StorageError::InvalidData(format!("too many rounds: {}", catalog.len())))?;
    if let Some(gap) = catalog
        .keys()
        .zip(1..=total)
        .find(|(round, expected)| round.value() != *expected)
        .map(|(_, expected)| expected)
    {
        return Err(StorageError::InvalidData(format!(
            "round numbers must run from 1 to {total} without gaps, round {gap} is missing"
        )));
    }
    Ok(total)
}

fn progress_for(
    department: &Department,
    catalog: &BTreeMap<RoundNumber, RoundData>,
    record: Option<&LearnerRecord>,
) -> Result<DiagnosisProgress, StorageError> {
    let scores: BTreeMap<RoundNumber, f64> = record
        .map(|r| {
            r.completions
                .iter()
                .map(|(round, c)| (*round, c.percentage))
                .collect()
        })
        .unwrap_or_default();
    let tests_completed = record
        .map(|r| u32::try_from(r.accepted.len()).unwrap_or(u32::MAX))
        .unwrap_or(0);

    DiagnosisProgress::from_completed(
        department.clone(),
        total_rounds(catalog)?,
        &scores,
        tests_completed,
    )
    .map_err(|e| StorageError::InvalidData(e.to_string()))
}

#[async_trait]
impl RoundDataRepository for InMemoryRepository {
    async fn get_round_data(
        &self,
        _learner: &LearnerContext,
        department: &Department,
        round: RoundNumber,
    ) -> Result<RoundData, StorageError> {
        let state = self.lock()?;
        state
            .catalogs
            .get(department)
            .and_then(|c| c.get(&round))
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        learner: &LearnerContext,
        department: &Department,
    ) -> Result<DiagnosisProgress, StorageError> {
        let state = self.lock()?;
        let catalog = state.catalogs.get(department).ok_or(StorageError::NotFound)?;
        let record = state
            .learners
            .get(&(learner.learner_id(), department.clone()));
        progress_for(department, catalog, record)
    }

    async fn list_rounds(
        &self,
        learner: &LearnerContext,
        department: &Department,
    ) -> Result<Vec<RoundRecord>, StorageError> {
        let state = self.lock()?;
        let catalog = state.catalogs.get(department).ok_or(StorageError::NotFound)?;
        let record = state
            .learners
            .get(&(learner.learner_id(), department.clone()));

        Ok(catalog
            .values()
            .map(|data| {
                let completion = record.and_then(|r| r.completions.get(&data.round_number));
                RoundRecord {
                    round_number: data.round_number,
                    focus_area: data.focus_area.clone(),
                    total_questions: u32::try_from(data.questions.len()).unwrap_or(u32::MAX),
                    time_limit_seconds: data.time_limit_seconds,
                    score: completion.map(|c| c.score),
                    completion_date: completion.map(|c| c.completed_at),
                }
            })
            .collect())
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryRepository {
    async fn submit_result(
        &self,
        learner: &LearnerContext,
        department: &Department,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, StorageError> {
        let now = self.clock.now();
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let catalog = state.catalogs.get(department).ok_or(StorageError::NotFound)?;
        let key = (learner.learner_id(), department.clone());

        if let Some(receipt) = state
            .learners
            .get(&key)
            .and_then(|r| r.receipts.get(&payload.session_id))
        {
            tracing::debug!(session_id = %payload.session_id, "duplicate submission acknowledged");
            return Ok(SubmissionReceipt {
                duplicate: true,
                ..*receipt
            });
        }

        let data = catalog
            .get(&payload.round_number)
            .ok_or(StorageError::NotFound)?;
        let expected = u32::try_from(data.questions.len()).unwrap_or(u32::MAX);
        if payload.total_questions != expected || payload.correct_count > payload.total_questions {
            return Err(StorageError::InvalidData(format!(
                "round {} expects {expected} questions, got {}/{}",
                payload.round_number, payload.correct_count, payload.total_questions
            )));
        }

        let current = progress_for(department, catalog, state.learners.get(&key))?;
        if !gate::is_available(&current, payload.round_number) {
            tracing::warn!(
                round = %payload.round_number,
                max_available = current.max_available_round(),
                "submission for locked round rejected"
            );
            return Err(StorageError::Locked {
                round: payload.round_number,
            });
        }

        let record = state.learners.entry(key).or_default();
        record.completions.insert(
            payload.round_number,
            Completion {
                score: payload.score,
                percentage: scoring::percentage(payload.correct_count, payload.total_questions),
                completed_at: now,
            },
        );
        record.accepted.push(payload.clone());

        let updated = progress_for(department, catalog, Some(record))?;
        let receipt = SubmissionReceipt {
            next_available_round: updated.max_available_round(),
            duplicate: false,
        };
        record.receipts.insert(payload.session_id, receipt);

        tracing::info!(
            session_id = %payload.session_id,
            round = %payload.round_number,
            score = payload.score,
            next_available_round = receipt.next_available_round,
            "submission accepted"
        );
        Ok(receipt)
    }
}
