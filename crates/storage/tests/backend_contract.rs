use std::path::Path;

use diagnosis_core::RoundCatalog;
use diagnosis_core::model::{
    Department, LearnerContext, LearnerId, PerformanceLevel, RoundNumber, SessionId,
    SubmissionPayload,
};
use diagnosis_core::time::fixed_clock;
use storage::fixtures::CatalogFixture;
use storage::repository::{Storage, StorageError};
use storage::InMemoryRepository;

fn sample() -> InMemoryRepository {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample_catalog.json");
    let repo = InMemoryRepository::new().with_clock(fixed_clock());
    let loaded = CatalogFixture::load(&path).unwrap().seed(&repo).unwrap();
    assert_eq!(loaded, 5);
    repo
}

fn cs() -> Department {
    Department::new("Computer Science").unwrap()
}

fn learner(id: u64) -> LearnerContext {
    LearnerContext::new(LearnerId::new(id))
}

fn r(n: u8) -> RoundNumber {
    RoundNumber::new(n).unwrap()
}

async fn complete(storage: &Storage, who: &LearnerContext, round: u8, score: u32) -> u8 {
    let data = storage.rounds.get_round_data(who, &cs(), r(round)).await.unwrap();
    let total = u32::try_from(data.questions.len()).unwrap();
    let payload = SubmissionPayload {
        round_number: r(round),
        score,
        elapsed_seconds: 120,
        correct_count: total * score / 100,
        total_questions: total,
        session_id: SessionId::generate(),
        level: PerformanceLevel::Intermediate,
    };
    storage
        .submissions
        .submit_result(who, &cs(), &payload)
        .await
        .unwrap()
        .next_available_round
}

#[tokio::test]
async fn sample_catalog_lists_departments() {
    let repo = sample();
    let names: Vec<String> = repo
        .departments()
        .unwrap()
        .iter()
        .map(|d| d.as_str().to_owned())
        .collect();
    assert_eq!(names, vec!["Computer Science", "Mathematics"]);
}

#[tokio::test]
async fn rounds_unlock_one_at_a_time() {
    let storage = Storage::from_repository(sample());
    let who = learner(1);

    assert_eq!(complete(&storage, &who, 1, 100).await, 2);
    assert_eq!(complete(&storage, &who, 2, 100).await, 3);
    assert_eq!(complete(&storage, &who, 3, 100).await, 4);

    let progress = storage.progress.get_progress(&who, &cs()).await.unwrap();
    assert_eq!(progress.total_rounds(), 3);
    assert_eq!(progress.max_available_round(), progress.sentinel());
    assert!((progress.completion_rate() - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn catalog_built_from_backend_marks_locked_rounds() {
    let storage = Storage::from_repository(sample());
    let who = learner(2);
    complete(&storage, &who, 1, 100).await;

    let progress = storage.progress.get_progress(&who, &cs()).await.unwrap();
    let records = storage.progress.list_rounds(&who, &cs()).await.unwrap();
    let catalog = RoundCatalog::build(progress, &records);

    let states: Vec<(bool, bool)> = catalog
        .rounds()
        .iter()
        .map(|round| (round.is_available, round.is_completed))
        .collect();
    assert_eq!(states, vec![(true, true), (true, false), (false, false)]);
    assert_eq!(catalog.default_focus(), Some(r(2)));
    assert_eq!(catalog.rounds()[0].score, Some(100));
}

#[tokio::test]
async fn skipping_ahead_is_rejected_by_the_backend() {
    let storage = Storage::from_repository(sample());
    let who = learner(3);
    let data = storage.rounds.get_round_data(&who, &cs(), r(3)).await.unwrap();
    let payload = SubmissionPayload {
        round_number: r(3),
        score: 100,
        elapsed_seconds: 10,
        correct_count: 3,
        total_questions: u32::try_from(data.questions.len()).unwrap(),
        session_id: SessionId::generate(),
        level: PerformanceLevel::Excellent,
    };

    let err = storage
        .submissions
        .submit_result(&who, &cs(), &payload)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Locked { .. }));
}

#[tokio::test]
async fn learners_do_not_share_progress() {
    let storage = Storage::from_repository(sample());
    complete(&storage, &learner(4), 1, 100).await;

    let other = storage.progress.get_progress(&learner(5), &cs()).await.unwrap();
    assert_eq!(other.max_available_round(), 1);
    assert_eq!(other.total_tests_completed(), 0);
}

#[tokio::test]
async fn unknown_department_is_not_found() {
    let storage = Storage::from_repository(sample());
    let err = storage
        .progress
        .get_progress(&learner(1), &Department::new("History").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}
