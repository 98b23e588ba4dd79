use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use diagnosis_core::model::{
    Answer, AnswerKey, Choice, Confidence, Department, NextRound, PerformanceLevel, Question,
    QuestionId, RoundData, RoundNumber, SessionId, SubmissionPayload, SubmissionReceipt,
    SubmitTrigger,
};
use diagnosis_core::{AnswerLedger, ClockEvent, ScoreReport, SessionClock, scoring};
use storage::repository::StorageError;

use super::progress::SessionSnapshot;
use crate::error::{LoadError, SessionError};

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of one attempt at a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    Loading,
    InProgress,
    Submitting,
    Completed,
    Errored,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Loading => "loading",
            Self::InProgress => "in progress",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session sits in `Errored`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    /// Round data never arrived; start a new session to retry.
    Load(String),
    /// The endpoint rejected or never received the payload; `submit` retries it.
    Submit(String),
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// A submission that won the status check and awaits delivery.
///
/// Frozen at the moment of the check: a retry after a transport failure
/// resends exactly this payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub payload: SubmissionPayload,
    pub report: ScoreReport,
    pub trigger: SubmitTrigger,
    pub submitted_at: DateTime<Utc>,
}

/// Final outcome of a completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub session_id: SessionId,
    pub round_number: RoundNumber,
    pub report: ScoreReport,
    pub score: u32,
    pub level: PerformanceLevel,
    pub elapsed_seconds: u32,
    pub is_auto_submit: bool,
    pub submitted_at: DateTime<Utc>,
    pub next_available_round: NextRound,
    /// The endpoint had already accepted this session id.
    pub duplicate: bool,
}

/// Result of advancing the session clock by one unit.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The session is not running; nothing changed.
    Idle,
    Running { remaining: u32 },
    /// The countdown expired and the automatic submission won the status check.
    TimedOut(PendingSubmission),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One timed attempt at a round.
///
/// Every mutation goes through a transition method on this type. Submission is
/// split into [`begin_submit`](Self::begin_submit), which performs the single
/// `InProgress -> Submitting` check-and-set, and
/// [`settle_submission`](Self::settle_submission), which records what the
/// endpoint answered. Nothing in between touches the session.
pub struct TestSession {
    id: SessionId,
    department: Department,
    round_number: RoundNumber,
    total_rounds: u8,
    status: SessionStatus,
    history: Vec<SessionStatus>,
    focus_area: String,
    questions: Vec<Question>,
    answer_key: AnswerKey,
    ledger: AnswerLedger,
    clock: SessionClock,
    cursor: usize,
    cursor_since: u32,
    dwell: BTreeMap<QuestionId, u32>,
    started_at: Option<DateTime<Utc>>,
    pending: Option<PendingSubmission>,
    result: Option<SessionResult>,
    failure: Option<SessionFailure>,
    abandoned: bool,
}

impl TestSession {
    /// Create a session for `round_number` of a department with `total_rounds` rounds.
    #[must_use]
    pub fn new(department: Department, round_number: RoundNumber, total_rounds: u8) -> Self {
        Self {
            id: SessionId::generate(),
            department,
            round_number,
            total_rounds,
            status: SessionStatus::NotStarted,
            history: vec![SessionStatus::NotStarted],
            focus_area: String::new(),
            questions: Vec::new(),
            answer_key: AnswerKey::default(),
            ledger: AnswerLedger::for_questions(&[]),
            clock: SessionClock::new(),
            cursor: 0,
            cursor_since: 0,
            dwell: BTreeMap::new(),
            started_at: None,
            pending: None,
            result: None,
            failure: None,
            abandoned: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn department(&self) -> &Department {
        &self.department
    }

    #[must_use]
    pub fn round_number(&self) -> RoundNumber {
        self.round_number
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Every status the session has been in, oldest first.
    #[must_use]
    pub fn history(&self) -> &[SessionStatus] {
        &self.history
    }

    #[must_use]
    pub fn focus_area(&self) -> &str {
        &self.focus_area
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn ledger(&self) -> &AnswerLedger {
        &self.ledger
    }

    #[must_use]
    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    #[must_use]
    pub fn time_limit_seconds(&self) -> u32 {
        self.clock.time_limit_seconds()
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.clock.remaining_seconds()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingSubmission> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn failure(&self) -> Option<&SessionFailure> {
        self.failure.as_ref()
    }

    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// A manual submit should be confirmed by the learner first: some questions
    /// are still unanswered. The session itself never prompts.
    #[must_use]
    pub fn requires_confirmation(&self) -> bool {
        !self.ledger.is_complete()
    }

    /// Seconds attributed to `question_id` so far, including the current visit.
    #[must_use]
    pub fn time_spent_on(&self, question_id: QuestionId) -> u32 {
        let settled = self.dwell.get(&question_id).copied().unwrap_or(0);
        let visiting = match self.current_question() {
            Some(q) if q.id() == question_id => {
                self.clock.elapsed_seconds().saturating_sub(self.cursor_since)
            }
            _ => 0,
        };
        settled.saturating_add(visiting)
    }

    #[must_use]
    pub fn snapshot(&self, low_time_warning_secs: u32) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            status: self.status,
            remaining_seconds: self.clock.remaining_seconds(),
            answered: self.ledger.answered_count(),
            total: self.ledger.total(),
            current_index: self.cursor,
            low_on_time: self.clock.is_low_on_time(low_time_warning_secs),
            is_auto_submit: self.result.as_ref().map(|r| r.is_auto_submit),
        }
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    /// `NotStarted -> Loading`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` from any other status.
    pub fn begin_loading(&mut self) -> Result<(), SessionError> {
        self.ensure_not_abandoned()?;
        if self.status != SessionStatus::NotStarted {
            return Err(self.invalid("load"));
        }
        self.transition(SessionStatus::Loading);
        Ok(())
    }

    /// `Loading -> InProgress`: build the ledger and answer key and start the clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` and moves to `Errored` when the data belongs to
    /// another round, is empty or has no time budget.
    pub fn finish_loading(
        &mut self,
        data: RoundData,
        started_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.status != SessionStatus::Loading {
            return Err(self.invalid("finish loading"));
        }
        if data.round_number != self.round_number {
            return Err(self.fail_loading(LoadError::RoundMismatch {
                expected: self.round_number,
                received: data.round_number,
            }));
        }
        if let Err(err) = data.validate() {
            return Err(self.fail_loading(err.into()));
        }
        let mut clock = SessionClock::new();
        if let Err(err) = clock.start(data.time_limit_seconds) {
            return Err(self.fail_loading(err.into()));
        }

        self.ledger = AnswerLedger::for_questions(&data.questions);
        self.answer_key = AnswerKey::from_questions(&data.questions);
        self.questions = data.questions;
        self.focus_area = data.focus_area;
        self.clock = clock;
        self.cursor = 0;
        self.cursor_since = 0;
        self.started_at = Some(started_at);
        self.transition(SessionStatus::InProgress);
        Ok(())
    }

    /// `Loading -> Errored`, returning the error to surface.
    pub fn fail_loading(&mut self, source: LoadError) -> SessionError {
        tracing::warn!(
            session_id = %self.id,
            round = %self.round_number,
            error = %source,
            "round failed to load"
        );
        self.failure = Some(SessionFailure::Load(source.to_string()));
        self.transition(SessionStatus::Errored);
        SessionError::Load {
            round: self.round_number,
            source,
        }
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Record `choice` for `question_id`. Returns whether the ledger changed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is in progress,
    /// and `SessionError::Ledger` for unknown questions or out-of-range choices.
    pub fn answer(&mut self, question_id: QuestionId, choice: Choice) -> Result<bool, SessionError> {
        self.answer_with_confidence(question_id, choice, None)
    }

    /// Like [`answer`](Self::answer), also recording how sure the learner is.
    ///
    /// # Errors
    ///
    /// See [`answer`](Self::answer).
    pub fn answer_with_confidence(
        &mut self,
        question_id: QuestionId,
        choice: Choice,
        confidence: Option<Confidence>,
    ) -> Result<bool, SessionError> {
        self.ensure_in_progress("answer")?;

        let unchanged = self
            .ledger
            .get(question_id)
            .filter(|existing| existing.selected_choice == choice)
            .map(|existing| existing.confidence_level);
        if let Some(recorded) = unchanged {
            return match confidence {
                Some(level) if recorded != Some(level) => {
                    self.ledger.set_confidence(question_id, level)?;
                    Ok(true)
                }
                _ => Ok(false),
            };
        }

        let answer = Answer::new(question_id, choice)
            .with_time_spent(self.time_spent_on(question_id))
            .with_confidence(confidence);
        Ok(self.ledger.record_answer(answer)?)
    }

    /// Move the cursor to `index`. No ledger or status effect.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::QuestionOutOfRange` for an index past the last question.
    pub fn navigate(&mut self, index: usize) -> Result<&Question, SessionError> {
        self.ensure_not_abandoned()?;
        if index >= self.questions.len() {
            return Err(SessionError::QuestionOutOfRange {
                index,
                total: self.questions.len(),
            });
        }
        if index != self.cursor {
            let now = self.clock.elapsed_seconds();
            if let Some(current) = self.questions.get(self.cursor).map(Question::id) {
                let spent = now.saturating_sub(self.cursor_since);
                *self.dwell.entry(current).or_default() += spent;
            }
            self.cursor = index;
            self.cursor_since = now;
        }
        self.questions
            .get(index)
            .ok_or(SessionError::QuestionOutOfRange {
                index,
                total: self.questions.len(),
            })
    }

    //
    // ─── CLOCK ─────────────────────────────────────────────────────────────────
    //

    /// Advance the countdown by one unit. On expiry the automatic submission is
    /// started immediately, in the same step.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.abandoned || self.status != SessionStatus::InProgress {
            return TickOutcome::Idle;
        }
        match self.clock.tick() {
            None => TickOutcome::Idle,
            Some(ClockEvent::Tick { remaining }) => TickOutcome::Running { remaining },
            Some(ClockEvent::Timeout) => {
                tracing::info!(session_id = %self.id, "time limit reached; submitting");
                match self.begin_submit(SubmitTrigger::Timeout, now) {
                    Ok(Some(pending)) => TickOutcome::TimedOut(pending),
                    Ok(None) | Err(_) => TickOutcome::Idle,
                }
            }
        }
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────────
    //

    /// The single authoritative check-and-set for submission.
    ///
    /// From `InProgress` the session moves to `Submitting`, cancels its clock,
    /// scores the ledger and freezes the payload. From `Errored` after a failed
    /// submission the frozen payload is handed out again. A session already
    /// `Submitting` or `Completed` returns `Ok(None)`: another caller won.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` before the round is loaded or after a
    /// load failure, and `SessionError::Abandoned` once abandoned.
    pub fn begin_submit(
        &mut self,
        trigger: SubmitTrigger,
        now: DateTime<Utc>,
    ) -> Result<Option<PendingSubmission>, SessionError> {
        self.ensure_not_abandoned()?;
        match self.status {
            SessionStatus::InProgress => {
                self.transition(SessionStatus::Submitting);
                self.clock.cancel();

                let report = scoring::score(&self.ledger, &self.answer_key);
                let elapsed = scoring::elapsed_seconds(
                    self.clock.time_limit_seconds(),
                    self.clock.remaining_seconds(),
                );
                let pending = PendingSubmission {
                    payload: SubmissionPayload {
                        round_number: self.round_number,
                        score: report.display_score(),
                        elapsed_seconds: elapsed,
                        correct_count: report.correct_count,
                        total_questions: report.total_questions,
                        session_id: self.id,
                        level: report.level,
                    },
                    report,
                    trigger,
                    submitted_at: now,
                };
                tracing::info!(
                    session_id = %self.id,
                    trigger = ?trigger,
                    score = pending.payload.score,
                    elapsed_seconds = elapsed,
                    "submission started"
                );
                self.pending = Some(pending.clone());
                Ok(Some(pending))
            }
            SessionStatus::Errored if matches!(self.failure, Some(SessionFailure::Submit(_))) => {
                let Some(pending) = self.pending.clone() else {
                    return Err(self.invalid("submit"));
                };
                tracing::info!(session_id = %self.id, "retrying submission");
                self.failure = None;
                self.transition(SessionStatus::Submitting);
                Ok(Some(pending))
            }
            SessionStatus::Submitting | SessionStatus::Completed => {
                tracing::debug!(
                    session_id = %self.id,
                    status = %self.status,
                    trigger = ?trigger,
                    "submit ignored"
                );
                Ok(None)
            }
            SessionStatus::NotStarted | SessionStatus::Loading | SessionStatus::Errored => {
                Err(self.invalid("submit"))
            }
        }
    }

    /// Record the endpoint's answer to the pending submission.
    ///
    /// `Submitting -> Completed` on success. On failure the session moves to
    /// `Errored`, keeping its ledger and frozen payload for a retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submit` carrying the transport error, or
    /// `SessionError::InvalidState` if no submission is in flight.
    pub fn settle_submission(
        &mut self,
        outcome: Result<SubmissionReceipt, StorageError>,
    ) -> Result<SessionResult, SessionError> {
        if self.status != SessionStatus::Submitting {
            return Err(self.invalid("settle submission"));
        }
        let Some(pending) = self.pending.clone() else {
            return Err(self.invalid("settle submission"));
        };

        match outcome {
            Ok(receipt) => {
                let result = SessionResult {
                    session_id: self.id,
                    round_number: self.round_number,
                    score: pending.payload.score,
                    level: pending.payload.level,
                    elapsed_seconds: pending.payload.elapsed_seconds,
                    is_auto_submit: pending.trigger.is_auto(),
                    submitted_at: pending.submitted_at,
                    next_available_round: NextRound::from_pointer(
                        receipt.next_available_round,
                        self.total_rounds,
                    ),
                    duplicate: receipt.duplicate,
                    report: pending.report,
                };
                tracing::info!(
                    session_id = %self.id,
                    score = result.score,
                    level = %result.level,
                    auto = result.is_auto_submit,
                    "session completed"
                );
                self.result = Some(result.clone());
                self.transition(SessionStatus::Completed);
                Ok(result)
            }
            Err(source) => {
                tracing::warn!(session_id = %self.id, error = %source, "submission failed");
                self.failure = Some(SessionFailure::Submit(source.to_string()));
                self.transition(SessionStatus::Errored);
                Err(SessionError::Submit {
                    session_id: self.id,
                    source,
                })
            }
        }
    }

    /// The learner navigated away. The clock stops and the session rejects
    /// further input. A submission already in flight is left to settle.
    pub fn abandon(&mut self) {
        if self.abandoned {
            return;
        }
        tracing::debug!(session_id = %self.id, status = %self.status, "session abandoned");
        self.clock.cancel();
        self.abandoned = true;
    }

    fn transition(&mut self, next: SessionStatus) {
        self.status = next;
        self.history.push(next);
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            operation,
            status: self.status,
        }
    }

    fn ensure_not_abandoned(&self) -> Result<(), SessionError> {
        if self.abandoned {
            return Err(SessionError::Abandoned);
        }
        Ok(())
    }

    fn ensure_in_progress(&self, operation: &'static str) -> Result<(), SessionError> {
        self.ensure_not_abandoned()?;
        if self.status != SessionStatus::InProgress {
            return Err(self.invalid(operation));
        }
        Ok(())
    }
}

impl fmt::Debug for TestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSession")
            .field("id", &self.id)
            .field("department", &self.department)
            .field("round_number", &self.round_number)
            .field("status", &self.status)
            .field("questions_len", &self.questions.len())
            .field("answered", &self.ledger.answered_count())
            .field("remaining_seconds", &self.clock.remaining_seconds())
            .field("cursor", &self.cursor)
            .field("abandoned", &self.abandoned)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use diagnosis_core::model::Difficulty;
    use diagnosis_core::time::fixed_now;

    fn choice(index: usize) -> Choice {
        Choice::new(index).unwrap()
    }

    fn question(id: u64, correct: usize) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            choice(correct),
            Difficulty::Medium,
            "general",
        )
        .unwrap()
    }

    fn round_data(count: u64, time_limit_seconds: u32) -> RoundData {
        RoundData {
            round_number: RoundNumber::FIRST,
            focus_area: "Foundations".into(),
            time_limit_seconds,
            questions: (1..=count).map(|id| question(id, 0)).collect(),
        }
    }

    fn running(count: u64, time_limit_seconds: u32) -> TestSession {
        let mut session =
            TestSession::new(Department::new("Biology").unwrap(), RoundNumber::FIRST, 10);
        session.begin_loading().unwrap();
        session
            .finish_loading(round_data(count, time_limit_seconds), fixed_now())
            .unwrap();
        session
    }

    fn receipt(next: u8) -> SubmissionReceipt {
        SubmissionReceipt {
            next_available_round: next,
            duplicate: false,
        }
    }

    #[test]
    fn loading_starts_clock_and_ledger() {
        let session = running(3, 120);
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.remaining_seconds(), 120);
        assert_eq!(session.ledger().total(), 3);
        assert_eq!(
            session.history(),
            &[
                SessionStatus::NotStarted,
                SessionStatus::Loading,
                SessionStatus::InProgress
            ]
        );
    }

    #[test]
    fn mismatched_round_data_errors_the_session() {
        let mut session = TestSession::new(
            Department::new("Biology").unwrap(),
            RoundNumber::new(2).unwrap(),
            10,
        );
        session.begin_loading().unwrap();
        let err = session
            .finish_loading(round_data(2, 60), fixed_now())
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Load {
                source: LoadError::RoundMismatch { .. },
                ..
            }
        ));
        assert_eq!(session.status(), SessionStatus::Errored);
        assert!(matches!(session.failure(), Some(SessionFailure::Load(_))));
    }

    #[test]
    fn answers_rejected_outside_in_progress() {
        let mut session =
            TestSession::new(Department::new("Biology").unwrap(), RoundNumber::FIRST, 10);
        let err = session.answer(QuestionId::new(1), choice(0)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                status: SessionStatus::NotStarted,
                ..
            }
        ));
    }

    #[test]
    fn same_answer_twice_is_a_no_op() {
        let mut session = running(2, 60);
        assert!(session.answer(QuestionId::new(1), choice(1)).unwrap());
        assert!(!session.answer(QuestionId::new(1), choice(1)).unwrap());
        assert!(session.answer(QuestionId::new(1), choice(2)).unwrap());
        assert_eq!(session.ledger().choice_for(QuestionId::new(1)), Some(choice(2)));
    }

    #[test]
    fn confidence_can_be_added_to_existing_answer() {
        let mut session = running(1, 60);
        session.answer(QuestionId::new(1), choice(0)).unwrap();
        let sure = Confidence::new(5).unwrap();
        assert!(session
            .answer_with_confidence(QuestionId::new(1), choice(0), Some(sure))
            .unwrap());
        let recorded = session.ledger().get(QuestionId::new(1)).unwrap();
        assert_eq!(recorded.confidence_level, Some(sure));
    }

    #[test]
    fn time_spent_follows_the_cursor() {
        let mut session = running(2, 60);
        let now = fixed_now();
        for _ in 0..5 {
            session.tick(now);
        }
        session.navigate(1).unwrap();
        for _ in 0..3 {
            session.tick(now);
        }
        session.answer(QuestionId::new(2), choice(0)).unwrap();
        session.answer(QuestionId::new(1), choice(0)).unwrap();

        assert_eq!(session.ledger().get(QuestionId::new(2)).unwrap().time_spent, 3);
        assert_eq!(session.ledger().get(QuestionId::new(1)).unwrap().time_spent, 5);
    }

    #[test]
    fn navigate_out_of_range_is_rejected() {
        let mut session = running(2, 60);
        let err = session.navigate(2).unwrap_err();
        assert!(matches!(err, SessionError::QuestionOutOfRange { index: 2, total: 2 }));
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn second_begin_submit_is_a_no_op() {
        let mut session = running(2, 60);
        let first = session.begin_submit(SubmitTrigger::Manual, fixed_now()).unwrap();
        let second = session.begin_submit(SubmitTrigger::Timeout, fixed_now()).unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
        let submitting = session
            .history()
            .iter()
            .filter(|s| **s == SessionStatus::Submitting)
            .count();
        assert_eq!(submitting, 1);
    }

    #[test]
    fn answers_rejected_while_submitting() {
        let mut session = running(2, 60);
        session.begin_submit(SubmitTrigger::Manual, fixed_now()).unwrap();
        let err = session.answer(QuestionId::new(1), choice(0)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                status: SessionStatus::Submitting,
                ..
            }
        ));
    }

    #[test]
    fn timeout_tick_starts_automatic_submission() {
        let mut session = running(2, 2);
        assert_eq!(session.tick(fixed_now()), TickOutcome::Running { remaining: 1 });
        let TickOutcome::TimedOut(pending) = session.tick(fixed_now()) else {
            panic!("expected timeout");
        };
        assert_eq!(pending.trigger, SubmitTrigger::Timeout);
        assert_eq!(pending.payload.elapsed_seconds, 2);
        assert_eq!(session.status(), SessionStatus::Submitting);
        assert_eq!(session.tick(fixed_now()), TickOutcome::Idle);
    }

    #[test]
    fn settle_success_completes_with_next_round() {
        let mut session = running(1, 60);
        session.answer(QuestionId::new(1), choice(0)).unwrap();
        session.begin_submit(SubmitTrigger::Manual, fixed_now()).unwrap();
        let result = session.settle_submission(Ok(receipt(2))).unwrap();

        assert_eq!(result.score, 100);
        assert_eq!(result.level, PerformanceLevel::Excellent);
        assert!(!result.is_auto_submit);
        assert_eq!(
            result.next_available_round,
            NextRound::Round(RoundNumber::new(2).unwrap())
        );
        assert_eq!(session.status(), SessionStatus::Completed);
    }

    #[test]
    fn failed_submission_can_be_retried_with_frozen_payload() {
        let mut session = running(2, 60);
        session.answer(QuestionId::new(1), choice(0)).unwrap();
        let first = session
            .begin_submit(SubmitTrigger::Manual, fixed_now())
            .unwrap()
            .unwrap();
        let err = session
            .settle_submission(Err(StorageError::Connection("offline".into())))
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(session.status(), SessionStatus::Errored);
        assert_eq!(session.ledger().answered_count(), 1);

        let retry = session
            .begin_submit(SubmitTrigger::Manual, fixed_now())
            .unwrap()
            .unwrap();
        assert_eq!(retry.payload, first.payload);
        session.settle_submission(Ok(receipt(2))).unwrap();
        assert_eq!(session.status(), SessionStatus::Completed);
    }

    #[test]
    fn load_failure_cannot_be_submitted() {
        let mut session =
            TestSession::new(Department::new("Biology").unwrap(), RoundNumber::FIRST, 10);
        session.begin_loading().unwrap();
        let _ = session.fail_loading(LoadError::Storage(StorageError::NotFound));
        let err = session
            .begin_submit(SubmitTrigger::Manual, fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
    }

    #[test]
    fn abandon_stops_clock_and_input() {
        let mut session = running(2, 60);
        session.abandon();
        assert!(session.clock().is_cancelled());
        assert_eq!(session.tick(fixed_now()), TickOutcome::Idle);
        assert!(matches!(
            session.answer(QuestionId::new(1), choice(0)),
            Err(SessionError::Abandoned)
        ));
        assert!(matches!(
            session.begin_submit(SubmitTrigger::Manual, fixed_now()),
            Err(SessionError::Abandoned)
        ));
    }

    #[test]
    fn confirmation_needed_only_while_incomplete() {
        let mut session = running(2, 60);
        assert!(session.requires_confirmation());
        session.answer(QuestionId::new(1), choice(0)).unwrap();
        session.answer(QuestionId::new(2), choice(0)).unwrap();
        assert!(!session.requires_confirmation());
    }
}
