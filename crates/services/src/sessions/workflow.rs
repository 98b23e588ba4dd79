use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;

use diagnosis_core::gate;
use diagnosis_core::model::{
    AssessmentSettings, Department, LearnerContext, RoundNumber, SubmitTrigger,
};
use storage::repository::{
    ProgressRepository, RoundDataRepository, Storage, SubmissionRepository,
};

use super::driver::SessionHandle;
use super::service::{SessionResult, SessionStatus, TestSession};
use crate::Clock;
use crate::error::{LoadError, SessionError};

/// Result of a submit request.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// This call won the status check and the endpoint accepted the payload.
    Completed(SessionResult),
    /// Another submission already moved the session out of `InProgress`.
    Skipped { status: SessionStatus },
}

impl SubmitOutcome {
    #[must_use]
    pub fn result(&self) -> Option<&SessionResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Skipped { .. } => None,
        }
    }
}

/// Orchestrates session start and submission against the backend collaborators.
#[derive(Clone)]
pub struct AssessmentService {
    clock: Clock,
    learner: LearnerContext,
    rounds: Arc<dyn RoundDataRepository>,
    progress: Arc<dyn ProgressRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    settings: AssessmentSettings,
    shuffle_questions: bool,
}

impl AssessmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        learner: LearnerContext,
        rounds: Arc<dyn RoundDataRepository>,
        progress: Arc<dyn ProgressRepository>,
        submissions: Arc<dyn SubmissionRepository>,
    ) -> Self {
        Self {
            clock,
            learner,
            rounds,
            progress,
            submissions,
            settings: AssessmentSettings::default(),
            shuffle_questions: false,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, learner: LearnerContext, storage: &Storage) -> Self {
        Self::new(
            clock,
            learner,
            Arc::clone(&storage.rounds),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.submissions),
        )
    }

    /// Apply settings; also sets question shuffling from them.
    #[must_use]
    pub fn with_settings(mut self, settings: AssessmentSettings) -> Self {
        self.shuffle_questions = settings.shuffle_questions();
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_shuffle_questions(mut self, shuffle_questions: bool) -> Self {
        self.shuffle_questions = shuffle_questions;
        self
    }

    #[must_use]
    pub fn learner(&self) -> &LearnerContext {
        &self.learner
    }

    #[must_use]
    pub fn settings(&self) -> &AssessmentSettings {
        &self.settings
    }

    /// Start a session for `round` in `department`.
    ///
    /// Availability is checked against the learner's current progress before
    /// anything is created. The backend checks again on submission.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAvailable` for a locked round (no session is
    /// created), `SessionError::Progress` if progress cannot be fetched, and
    /// `SessionError::Load` if the round data cannot be fetched or is unusable.
    pub async fn start(
        &self,
        department: &Department,
        round: RoundNumber,
    ) -> Result<TestSession, SessionError> {
        let progress = self
            .progress
            .get_progress(&self.learner, department)
            .await
            .map_err(SessionError::Progress)?;

        if !gate::is_available(&progress, round) {
            tracing::info!(
                department = %department,
                round = %round,
                max_available = progress.max_available_round(),
                "round not available"
            );
            return Err(SessionError::NotAvailable {
                round,
                max_available: progress.max_available_round(),
            });
        }

        let mut session = TestSession::new(department.clone(), round, progress.total_rounds());
        session.begin_loading()?;

        let mut data = match self
            .rounds
            .get_round_data(&self.learner, department, round)
            .await
        {
            Ok(data) => data,
            Err(err) => return Err(session.fail_loading(LoadError::Storage(err))),
        };
        if self.shuffle_questions {
            data.questions.as_mut_slice().shuffle(&mut rng());
        }

        session.finish_loading(data, self.clock.now())?;
        tracing::info!(
            session_id = %session.id(),
            department = %department,
            round = %round,
            questions = session.questions().len(),
            time_limit_seconds = session.time_limit_seconds(),
            "session started"
        );
        Ok(session)
    }

    /// Start a session and wrap it for shared use by input and clock.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start).
    pub async fn start_shared(
        &self,
        department: &Department,
        round: RoundNumber,
    ) -> Result<SessionHandle, SessionError> {
        let session = self.start(department, round).await?;
        Ok(self.open(session))
    }

    #[must_use]
    pub fn open(&self, session: TestSession) -> SessionHandle {
        SessionHandle::new(
            session,
            Arc::clone(&self.submissions),
            self.learner.clone(),
            self.clock,
            self.settings.low_time_warning_secs(),
        )
    }

    /// Submit a session owned by the caller, or retry its failed submission.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submit` if the endpoint fails; the session is then
    /// `Errored` with its ledger intact and can be submitted again.
    pub async fn submit(
        &self,
        session: &mut TestSession,
        manual: bool,
    ) -> Result<SubmitOutcome, SessionError> {
        let trigger = SubmitTrigger::from_manual(manual);
        let Some(pending) = session.begin_submit(trigger, self.clock.now())? else {
            return Ok(SubmitOutcome::Skipped {
                status: session.status(),
            });
        };
        let outcome = self
            .submissions
            .submit_result(&self.learner, session.department(), &pending.payload)
            .await;
        session.settle_submission(outcome).map(SubmitOutcome::Completed)
    }
}

impl std::fmt::Debug for AssessmentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentService")
            .field("clock", &self.clock)
            .field("learner", &self.learner)
            .field("settings", &self.settings)
            .field("shuffle_questions", &self.shuffle_questions)
            .finish_non_exhaustive()
    }
}
