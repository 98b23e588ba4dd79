use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use diagnosis_core::model::{
    Choice, Department, Difficulty, LearnerContext, LearnerId, Question, QuestionId, RoundData,
    RoundNumber, SubmissionPayload, SubmissionReceipt,
};
use diagnosis_core::time::fixed_clock;
use services::{
    AssessmentService, ManualScheduler, SessionHandle, SessionStatus, SubmitOutcome, TickReport,
    TokioScheduler,
};
use storage::InMemoryRepository;
use storage::repository::{StorageError, SubmissionRepository};

fn dept() -> Department {
    Department::new("Physics").unwrap()
}

fn learner() -> LearnerContext {
    LearnerContext::new(LearnerId::new(3))
}

fn seeded(count: u64, time_limit_seconds: u32) -> InMemoryRepository {
    let repo = InMemoryRepository::new().with_clock(fixed_clock());
    let data = RoundData {
        round_number: RoundNumber::FIRST,
        focus_area: "Mechanics".into(),
        time_limit_seconds,
        questions: (1..=count)
            .map(|q| {
                Question::new(
                    QuestionId::new(q),
                    format!("Question {q}"),
                    vec!["yes".into(), "no".into()],
                    Choice::new(0).unwrap(),
                    Difficulty::Easy,
                    "kinematics",
                )
                .unwrap()
            })
            .collect(),
    };
    repo.upsert_round(&dept(), data).unwrap();
    repo
}

/// Records every payload it receives, yielding first so the caller's future
/// is suspended mid-submission.
#[derive(Default)]
struct YieldingEndpoint {
    payloads: Mutex<Vec<SubmissionPayload>>,
}

#[async_trait]
impl SubmissionRepository for YieldingEndpoint {
    async fn submit_result(
        &self,
        _learner: &LearnerContext,
        _department: &Department,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, StorageError> {
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(SubmissionReceipt {
            next_available_round: 2,
            duplicate: false,
        })
    }
}

async fn racing_session(time_limit_seconds: u32) -> (SessionHandle, Arc<YieldingEndpoint>) {
    let repo = seeded(3, time_limit_seconds);
    let endpoint = Arc::new(YieldingEndpoint::default());
    let svc = AssessmentService::new(
        fixed_clock(),
        learner(),
        Arc::new(repo.clone()),
        Arc::new(repo),
        endpoint.clone(),
    );
    let handle = svc.start_shared(&dept(), RoundNumber::FIRST).await.unwrap();
    (handle, endpoint)
}

fn submitting_transitions(handle: &SessionHandle) -> usize {
    handle
        .read(|s| {
            s.history()
                .iter()
                .filter(|status| **status == SessionStatus::Submitting)
                .count()
        })
        .unwrap()
}

#[tokio::test]
async fn manual_submit_racing_final_tick_produces_one_payload() {
    let (handle, endpoint) = racing_session(1).await;

    let (submitted, ticked) = tokio::join!(handle.submit(true), handle.tick());
    let submitted = submitted.unwrap();
    let ticked = ticked.unwrap();

    let winners = usize::from(matches!(submitted, SubmitOutcome::Completed(_)))
        + usize::from(matches!(ticked, TickReport::AutoSubmitted(_)));
    assert_eq!(winners, 1);
    assert_eq!(endpoint.payloads.lock().unwrap().len(), 1);
    assert_eq!(submitting_transitions(&handle), 1);
    assert_eq!(handle.snapshot().status, SessionStatus::Completed);
}

#[tokio::test]
async fn final_tick_racing_manual_submit_produces_one_payload() {
    let (handle, endpoint) = racing_session(1).await;

    let (ticked, submitted) = tokio::join!(handle.tick(), handle.submit(true));
    let ticked = ticked.unwrap();
    let submitted = submitted.unwrap();

    let winners = usize::from(matches!(submitted, SubmitOutcome::Completed(_)))
        + usize::from(matches!(ticked, TickReport::AutoSubmitted(_)));
    assert_eq!(winners, 1);
    assert_eq!(endpoint.payloads.lock().unwrap().len(), 1);
    assert_eq!(submitting_transitions(&handle), 1);
}

#[tokio::test]
async fn repeated_submits_while_in_flight_are_skipped() {
    let (handle, endpoint) = racing_session(60).await;

    let (a, b, c) = tokio::join!(handle.submit(true), handle.submit(true), handle.submit(false));
    let completed = [a.unwrap(), b.unwrap(), c.unwrap()]
        .iter()
        .filter(|o| matches!(o, SubmitOutcome::Completed(_)))
        .count();

    assert_eq!(completed, 1);
    assert_eq!(endpoint.payloads.lock().unwrap().len(), 1);
    assert_eq!(submitting_transitions(&handle), 1);
}

#[tokio::test]
async fn manual_scheduler_drives_countdown_to_auto_submit() {
    let (handle, endpoint) = racing_session(3).await;
    let scheduler = ManualScheduler::new();
    let mut updates = handle.subscribe();

    handle.run_clock(&scheduler, Duration::from_secs(1)).unwrap();
    scheduler.fire(2);
    let snapshot = updates
        .wait_for(|s| s.remaining_seconds == 1)
        .await
        .unwrap()
        .clone();
    assert_eq!(snapshot.status, SessionStatus::InProgress);
    assert!(snapshot.low_on_time);

    scheduler.fire(1);
    let snapshot = updates
        .wait_for(|s| s.status == SessionStatus::Completed)
        .await
        .unwrap()
        .clone();
    assert_eq!(snapshot.remaining_seconds, 0);
    assert_eq!(snapshot.is_auto_submit, Some(true));
    assert_eq!(endpoint.payloads.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn tokio_scheduler_times_out_after_the_time_limit() {
    let (handle, endpoint) = racing_session(5).await;
    let mut updates = handle.subscribe();
    let started = tokio::time::Instant::now();

    handle
        .run_clock(&TokioScheduler, Duration::from_secs(1))
        .unwrap();
    updates
        .wait_for(|s| s.status == SessionStatus::Completed)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(5));
    let payloads = endpoint.payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].elapsed_seconds, 5);
}

#[tokio::test]
async fn dropping_every_handle_stops_the_clock() {
    let (handle, endpoint) = racing_session(30).await;
    let scheduler = ManualScheduler::new();
    handle.run_clock(&scheduler, Duration::from_secs(1)).unwrap();
    assert_eq!(scheduler.active(), 1);

    drop(handle);
    for _ in 0..10 {
        if scheduler.active() == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert_eq!(scheduler.active(), 0);
    assert_eq!(scheduler.fire(30), 0);
    assert!(endpoint.payloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn abandon_stops_scheduled_ticks() {
    let (handle, endpoint) = racing_session(2).await;
    let scheduler = ManualScheduler::new();
    handle.run_clock(&scheduler, Duration::from_secs(1)).unwrap();

    handle.abandon().unwrap();
    scheduler.fire(5);
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }

    assert_eq!(handle.snapshot().remaining_seconds, 2);
    assert!(endpoint.payloads.lock().unwrap().is_empty());
}
