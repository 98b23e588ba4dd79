use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use diagnosis_core::model::{
    Choice, Confidence, LearnerContext, Question, QuestionId, SubmitTrigger,
};
use storage::repository::SubmissionRepository;

use super::progress::SessionSnapshot;
use super::service::{PendingSubmission, SessionResult, TestSession, TickOutcome};
use super::ticker::Scheduler;
use super::workflow::SubmitOutcome;
use crate::Clock;
use crate::error::SessionError;

/// What one clock tick did to a shared session.
#[derive(Debug, Clone, PartialEq)]
pub enum TickReport {
    Idle,
    Running { remaining: u32 },
    /// The countdown expired and this tick delivered the automatic submission.
    AutoSubmitted(SessionResult),
}

struct Shared {
    session: Mutex<TestSession>,
    submissions: Arc<dyn SubmissionRepository>,
    learner: LearnerContext,
    clock: Clock,
    low_time_warning_secs: u32,
    snapshots: watch::Sender<SessionSnapshot>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(task) = self.ticker.get_mut().ok().and_then(Option::take) {
            task.abort();
        }
    }
}

/// A session shared between the learner's input and the clock.
///
/// The session lock is only held for synchronous transitions, never across the
/// network call, so a tick arriving mid-submission sees `Submitting` and backs
/// off. Observers follow changes through [`subscribe`](Self::subscribe).
/// Dropping every handle stops the clock task.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Shared>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(
        session: TestSession,
        submissions: Arc<dyn SubmissionRepository>,
        learner: LearnerContext,
        clock: Clock,
        low_time_warning_secs: u32,
    ) -> Self {
        let (snapshots, _) = watch::channel(session.snapshot(low_time_warning_secs));
        Self {
            inner: Arc::new(Shared {
                session: Mutex::new(session),
                submissions,
                learner,
                clock,
                low_time_warning_secs,
                snapshots,
                ticker: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshots.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Run `f` against the session under its lock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StatePoisoned` if a previous holder panicked.
    pub fn read<R>(&self, f: impl FnOnce(&TestSession) -> R) -> Result<R, SessionError> {
        let session = self.lock()?;
        Ok(f(&session))
    }

    /// # Errors
    ///
    /// See [`TestSession::answer`].
    pub fn answer(&self, question_id: QuestionId, choice: Choice) -> Result<bool, SessionError> {
        self.answer_with_confidence(question_id, choice, None)
    }

    /// # Errors
    ///
    /// See [`TestSession::answer_with_confidence`].
    pub fn answer_with_confidence(
        &self,
        question_id: QuestionId,
        choice: Choice,
        confidence: Option<Confidence>,
    ) -> Result<bool, SessionError> {
        self.mutate(|s| s.answer_with_confidence(question_id, choice, confidence))
    }

    /// # Errors
    ///
    /// See [`TestSession::navigate`].
    pub fn navigate(&self, index: usize) -> Result<Question, SessionError> {
        self.mutate(|s| s.navigate(index).cloned())
    }

    /// # Errors
    ///
    /// Returns `SessionError::StatePoisoned` if the session lock is poisoned.
    pub fn requires_confirmation(&self) -> Result<bool, SessionError> {
        self.read(TestSession::requires_confirmation)
    }

    /// Submit the session, or retry a failed submission.
    ///
    /// Returns `SubmitOutcome::Skipped` when another submission already won.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submit` if the endpoint fails (the session is then
    /// `Errored` and may be retried), or the errors of [`TestSession::begin_submit`].
    pub async fn submit(&self, manual: bool) -> Result<SubmitOutcome, SessionError> {
        let trigger = SubmitTrigger::from_manual(manual);
        let pending = {
            let mut session = self.lock()?;
            let pending = session.begin_submit(trigger, self.inner.clock.now())?;
            self.publish(&session);
            match pending {
                Some(pending) => pending,
                None => {
                    return Ok(SubmitOutcome::Skipped {
                        status: session.status(),
                    });
                }
            }
        };
        let result = self.deliver(pending).await?;
        Ok(SubmitOutcome::Completed(result))
    }

    /// Advance the clock by one unit, delivering the automatic submission when
    /// the countdown expires.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submit` if the automatic submission fails.
    pub async fn tick(&self) -> Result<TickReport, SessionError> {
        let pending = {
            let mut session = self.lock()?;
            let outcome = session.tick(self.inner.clock.now());
            self.publish(&session);
            match outcome {
                TickOutcome::Idle => return Ok(TickReport::Idle),
                TickOutcome::Running { remaining } => {
                    return Ok(TickReport::Running { remaining });
                }
                TickOutcome::TimedOut(pending) => pending,
            }
        };
        let result = self.deliver(pending).await?;
        Ok(TickReport::AutoSubmitted(result))
    }

    /// Drive the clock from `scheduler` every `period` until the session stops
    /// running or every handle is dropped. Replaces a previously started clock.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StatePoisoned` if the ticker lock is poisoned.
    pub fn run_clock(&self, scheduler: &dyn Scheduler, period: Duration) -> Result<(), SessionError> {
        let mut ticks = scheduler.start(period);
        let weak: Weak<Shared> = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while ticks.next().await.is_some() {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let handle = SessionHandle { inner };
                match handle.tick().await {
                    Ok(TickReport::Running { .. }) => {}
                    Ok(TickReport::Idle | TickReport::AutoSubmitted(_)) => break,
                    Err(err) => {
                        tracing::warn!(error = %err, "clock stopped after failed auto-submit");
                        break;
                    }
                }
            }
            ticks.stop();
        });

        let mut ticker = self
            .inner
            .ticker
            .lock()
            .map_err(|_| SessionError::StatePoisoned)?;
        if let Some(previous) = ticker.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// Leave the session: stop the clock and reject further input.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StatePoisoned` if the session or ticker lock is poisoned.
    pub fn abandon(&self) -> Result<(), SessionError> {
        let task = self
            .inner
            .ticker
            .lock()
            .map_err(|_| SessionError::StatePoisoned)?
            .take();
        if let Some(task) = task {
            task.abort();
        }
        let mut session = self.lock()?;
        session.abandon();
        self.publish(&session);
        Ok(())
    }

    async fn deliver(&self, pending: PendingSubmission) -> Result<SessionResult, SessionError> {
        let department = self.read(|s| s.department().clone())?;
        let outcome = self
            .inner
            .submissions
            .submit_result(&self.inner.learner, &department, &pending.payload)
            .await;
        self.mutate(|s| s.settle_submission(outcome))
    }

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut TestSession) -> Result<R, SessionError>,
    ) -> Result<R, SessionError> {
        let mut session = self.lock()?;
        let result = f(&mut session);
        self.publish(&session);
        result
    }

    fn publish(&self, session: &TestSession) {
        self.inner
            .snapshots
            .send_replace(session.snapshot(self.inner.low_time_warning_secs));
    }

    fn lock(&self) -> Result<MutexGuard<'_, TestSession>, SessionError> {
        self.inner
            .session
            .lock()
            .map_err(|_| SessionError::StatePoisoned)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("snapshot", &*self.inner.snapshots.borrow())
            .finish_non_exhaustive()
    }
}
