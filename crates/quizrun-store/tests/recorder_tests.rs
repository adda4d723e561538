//! Attempt recorder behaviour against the real stores.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use quizrun_core::error::{EngineError, StoreError};
use quizrun_core::model::AnswerRecord;
use quizrun_core::parser::parse_quiz_str;
use quizrun_core::recorder::{AttemptRecorder, RecorderConfig, SubmissionKey};
use quizrun_store::{FailPoint, JsonFileStore, MemoryStore, QuizCatalog};

const QUIZ: &str = r#"
[quiz]
id = "borrowing"
title = "Borrowing"
passing_score = 70

[[questions]]
id = "q1"
prompt = "Shared borrows may coexist?"

[[questions.options]]
id = "yes"
text = "Yes"
correct = true

[[questions.options]]
id = "no"
text = "No"

[[questions]]
id = "q2"
prompt = "A mutable borrow may coexist with a shared one?"

[[questions.options]]
id = "yes"
text = "Yes"

[[questions.options]]
id = "no"
text = "No"
correct = true

[[questions]]
id = "q3"
prompt = "Does `&mut T` implement Copy?"

[[questions.options]]
id = "yes"
text = "Yes"

[[questions.options]]
id = "no"
text = "No"
correct = true
"#;

fn catalog() -> Arc<QuizCatalog> {
    let quiz = parse_quiz_str(QUIZ, Path::new("borrowing.toml")).unwrap();
    Arc::new(QuizCatalog::from_quizzes([quiz]))
}

fn recorder(store: Arc<MemoryStore>, max_retries: u32) -> AttemptRecorder {
    AttemptRecorder::new(
        store,
        catalog(),
        RecorderConfig {
            max_retries,
            retry_delay: Duration::from_millis(200),
        },
    )
}

fn answers(picks: [Option<&str>; 3]) -> Vec<AnswerRecord> {
    picks
        .iter()
        .enumerate()
        .map(|(i, pick)| AnswerRecord::new(format!("q{}", i + 1), pick.map(String::from)))
        .collect()
}

fn all_correct() -> Vec<AnswerRecord> {
    answers([Some("yes"), Some("no"), Some("no")])
}

#[tokio::test(start_paused = true)]
async fn failed_answer_insert_leaves_no_partial_attempt() {
    let store = Arc::new(MemoryStore::new());
    store.fail_at(FailPoint::InsertAnswerRecords, 10);
    let recorder = recorder(store.clone(), 2);

    let err = recorder
        .submit("borrowing", "s1", &all_correct())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StorageUnavailable(_)));
    assert!(err.is_retryable());
    assert_eq!(store.begin_count(), 3);
    assert_eq!(store.attempt_count(), 0);
    assert_eq!(store.answer_count(), 0);
    assert!(recorder.list_attempts("borrowing", "s1").await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn transient_commit_failures_are_retried() {
    let store = Arc::new(MemoryStore::new());
    store.fail_at(FailPoint::Commit, 2);
    let recorder = recorder(store.clone(), 2);

    let started = tokio::time::Instant::now();
    let attempt = recorder
        .submit("borrowing", "s1", &all_correct())
        .await
        .unwrap();
    // 200 ms, then 400 ms
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(600), "{waited:?}");
    assert!(waited < Duration::from_secs(1), "{waited:?}");
    assert_eq!(store.commit_count(), 1);
    assert_eq!(store.attempt_count(), 1);
    assert_eq!(store.answer_count(), 3);
    assert_eq!(attempt.score_percent, 100);
}

#[tokio::test(start_paused = true)]
async fn lost_acknowledgement_is_not_recorded_twice() {
    let store = Arc::new(MemoryStore::new());
    store.fail_at(FailPoint::AckLost, 1);
    let recorder = recorder(store.clone(), 2);

    let attempt = recorder
        .submit("borrowing", "s1", &all_correct())
        .await
        .unwrap();
    assert_eq!(store.attempt_count(), 1);
    let listed = recorder.list_attempts("borrowing", "s1").await.unwrap();
    assert_eq!(listed[0].id, attempt.id);
}

#[tokio::test]
async fn resubmitting_with_same_key_after_lost_ack_records_once() {
    let store = Arc::new(MemoryStore::new());
    store.fail_at(FailPoint::AckLost, 1);
    let recorder = recorder(store.clone(), 0);
    let key = SubmissionKey::new();

    let err = recorder
        .submit_with_key("borrowing", "s1", &all_correct(), key)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(store.attempt_count(), 1);

    let attempt = recorder
        .submit_with_key("borrowing", "s1", &all_correct(), key)
        .await
        .unwrap();
    assert_eq!(attempt.id, key.attempt_id);
    assert_eq!(attempt.submitted_at, key.submitted_at);
    assert_eq!(store.attempt_count(), 1);
    assert_eq!(store.commit_count(), 1);
}

#[tokio::test]
async fn conflict_with_unreadable_history_is_reported() {
    let store = Arc::new(MemoryStore::new());
    store.fail_at(FailPoint::AckLost, 1);
    let recorder = recorder(store.clone(), 0);
    let key = SubmissionKey::new();
    recorder
        .submit_with_key("borrowing", "s1", &all_correct(), key)
        .await
        .unwrap_err();

    store.fail_at(FailPoint::Query, 1);
    let err = recorder
        .submit_with_key("borrowing", "s1", &all_correct(), key)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::StorageUnavailable(StoreError::Conflict(_))
    ));
    assert!(!err.is_retryable());
    assert_eq!(store.attempt_count(), 1);
}

#[tokio::test]
async fn invalid_submission_touches_no_store() {
    let store = Arc::new(MemoryStore::new());
    let recorder = recorder(store.clone(), 2);

    let err = recorder
        .submit("borrowing", "s1", &all_correct()[..2])
        .await
        .unwrap_err();
    match err {
        EngineError::IncompleteSubmission { missing } => assert_eq!(missing, ["q3"]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.begin_count(), 0);

    let err = recorder.submit("nope", "s1", &all_correct()).await.unwrap_err();
    assert!(matches!(err, EngineError::QuizNotFound(_)));
}

#[tokio::test]
async fn recorded_score_is_recomputed() {
    let store = Arc::new(MemoryStore::new());
    let recorder = recorder(store, 0);

    // claims of correctness from the caller are ignored
    let mut submitted = answers([Some("yes"), Some("yes"), None]);
    for record in &mut submitted {
        record.correct = true;
    }
    let attempt = recorder.submit("borrowing", "s1", &submitted).await.unwrap();
    assert_eq!(attempt.correct_count, 1);
    assert_eq!(attempt.score_percent, 33);
    assert!(!attempt.passed);
    assert_eq!(attempt.answers[2].selected_option_id, None);
}

#[tokio::test]
async fn reads_are_idempotent_and_newest_first() {
    let store = Arc::new(MemoryStore::new());
    let recorder = recorder(store.clone(), 0);

    let first = recorder
        .submit("borrowing", "s1", &all_correct())
        .await
        .unwrap();
    let second = recorder
        .submit("borrowing", "s1", &answers([None, None, None]))
        .await
        .unwrap();
    recorder
        .submit("borrowing", "someone-else", &all_correct())
        .await
        .unwrap();

    let a = recorder.list_attempts("borrowing", "s1").await.unwrap();
    let b = recorder.list_attempts("borrowing", "s1").await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 2);
    assert_eq!(a[0].id, second.id);
    assert_eq!(a[1].id, first.id);
    assert_eq!(store.attempt_count(), 3);
}

#[tokio::test]
async fn pass_is_remembered_after_lower_retake() {
    let store = Arc::new(MemoryStore::new());
    let recorder = recorder(store, 0);

    recorder
        .submit("borrowing", "s1", &all_correct())
        .await
        .unwrap();
    recorder
        .submit("borrowing", "s1", &answers([Some("yes"), Some("yes"), None]))
        .await
        .unwrap();

    assert!(recorder.has_passed("borrowing", "s1").await.unwrap());
    assert!(!recorder.has_passed("borrowing", "s2").await.unwrap());
    let best = recorder.best_attempt("borrowing", "s1").await.unwrap().unwrap();
    assert_eq!(best.score_percent, 100);

    let history = recorder.history("borrowing", "s1").await.unwrap();
    assert_eq!(history.attempt_count(), 2);
    assert_eq!(history.latest().unwrap().score_percent, 33);
}

#[tokio::test(start_paused = true)]
async fn corrupt_json_store_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attempts.json");
    std::fs::write(&path, "[[[").unwrap();

    let recorder = AttemptRecorder::new(
        Arc::new(JsonFileStore::new(&path)),
        catalog(),
        RecorderConfig::default(),
    );
    let started = tokio::time::Instant::now();
    let err = recorder
        .submit("borrowing", "s1", &all_correct())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::StorageUnavailable(StoreError::Corrupt(_))
    ));
    assert!(!err.is_retryable());
    assert!(started.elapsed() < Duration::from_millis(200));
}

#[tokio::test]
async fn json_store_round_trips_through_recorder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attempts.json");

    let attempt = {
        let recorder = AttemptRecorder::new(
            Arc::new(JsonFileStore::new(&path)),
            catalog(),
            RecorderConfig::default(),
        );
        recorder
            .submit("borrowing", "s1", &all_correct())
            .await
            .unwrap()
    };

    let recorder = AttemptRecorder::new(
        Arc::new(JsonFileStore::new(&path)),
        catalog(),
        RecorderConfig::default(),
    );
    let listed = recorder.list_attempts("borrowing", "s1").await.unwrap();
    assert_eq!(listed, vec![attempt]);
}
