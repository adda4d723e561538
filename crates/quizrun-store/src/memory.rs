//! In-memory attempt store with fault injection, for tests and ephemeral runs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use quizrun_core::error::StoreError;
use quizrun_core::model::{AnswerRecord, FinishedAttempt};
use quizrun_core::traits::{AttemptStore, AttemptWriter};

/// Where an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    InsertAttempt,
    InsertAnswerRecords,
    /// Commit fails and nothing is written.
    Commit,
    /// Commit is applied but reported as failed, as when the acknowledgement
    /// is lost on the way back.
    AckLost,
    /// History queries fail.
    Query,
}

#[derive(Debug, Default)]
struct Tables {
    /// Attempt rows, answers stripped, in insertion order.
    attempts: Vec<FinishedAttempt>,
    answers: Vec<(Uuid, AnswerRecord)>,
}

/// Attempt store backed by mutex-guarded vectors.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail: Mutex<Option<(FailPoint, u32)>>,
    begin_count: AtomicU32,
    commit_count: AtomicU32,
    query_count: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` operations at `point` fail with
    /// [`StoreError::Unavailable`]. Replaces any earlier injection.
    pub fn fail_at(&self, point: FailPoint, times: u32) {
        if let Ok(mut fail) = self.fail.lock() {
            *fail = Some((point, times));
        }
    }

    /// Number of transactions opened.
    pub fn begin_count(&self) -> u32 {
        self.begin_count.load(Ordering::Relaxed)
    }

    /// Number of transactions that made their writes visible.
    pub fn commit_count(&self) -> u32 {
        self.commit_count.load(Ordering::Relaxed)
    }

    pub fn query_count(&self) -> u32 {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Committed attempt rows across every quiz and subject.
    pub fn attempt_count(&self) -> usize {
        self.tables.lock().map(|t| t.attempts.len()).unwrap_or(0)
    }

    /// Committed answer records across every attempt.
    pub fn answer_count(&self) -> usize {
        self.tables.lock().map(|t| t.answers.len()).unwrap_or(0)
    }

    fn trip(&self, point: FailPoint) -> Result<(), StoreError> {
        let mut fail = lock(&self.fail)?;
        if let Some((p, remaining)) = fail.as_mut() {
            if *p == point && *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Unavailable(format!(
                    "injected failure at {point:?}"
                )));
            }
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
}

fn conflict(id: Uuid) -> StoreError {
    StoreError::Conflict(format!("attempt {id} already exists"))
}

#[async_trait]
impl AttemptStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn AttemptWriter + '_>, StoreError> {
        self.trip(FailPoint::Begin)?;
        self.begin_count.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemoryWriter {
            store: self,
            attempts: Vec::new(),
            answers: Vec::new(),
        }))
    }

    async fn query_attempts_by(
        &self,
        quiz_id: &str,
        subject_id: &str,
    ) -> Result<Vec<FinishedAttempt>, StoreError> {
        self.trip(FailPoint::Query)?;
        self.query_count.fetch_add(1, Ordering::Relaxed);
        let tables = lock(&self.tables)?;
        Ok(tables
            .attempts
            .iter()
            .filter(|a| a.quiz_id == quiz_id && a.subject_id == subject_id)
            .map(|a| {
                let mut attempt = a.clone();
                attempt.answers = tables
                    .answers
                    .iter()
                    .filter(|(id, _)| *id == a.id)
                    .map(|(_, record)| record.clone())
                    .collect();
                attempt
            })
            .collect())
    }
}

/// Staging buffer for one [`MemoryStore`] transaction.
pub struct MemoryWriter<'a> {
    store: &'a MemoryStore,
    attempts: Vec<FinishedAttempt>,
    answers: Vec<(Uuid, AnswerRecord)>,
}

#[async_trait]
impl AttemptWriter for MemoryWriter<'_> {
    async fn insert_attempt(&mut self, attempt: &FinishedAttempt) -> Result<(), StoreError> {
        self.store.trip(FailPoint::InsertAttempt)?;
        let committed = lock(&self.store.tables)?
            .attempts
            .iter()
            .any(|a| a.id == attempt.id);
        if committed || self.attempts.iter().any(|a| a.id == attempt.id) {
            return Err(conflict(attempt.id));
        }

        let mut row = attempt.clone();
        row.answers.clear();
        self.attempts.push(row);
        Ok(())
    }

    async fn insert_answer_records(
        &mut self,
        attempt_id: Uuid,
        records: &[AnswerRecord],
    ) -> Result<(), StoreError> {
        self.store.trip(FailPoint::InsertAnswerRecords)?;
        if !self.attempts.iter().any(|a| a.id == attempt_id) {
            return Err(StoreError::Rejected(format!(
                "answer records for attempt {attempt_id}, which is not part of this transaction"
            )));
        }
        self.answers
            .extend(records.iter().map(|r| (attempt_id, r.clone())));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryWriter {
            store,
            attempts,
            answers,
        } = *self;
        store.trip(FailPoint::Commit)?;

        {
            let mut tables = lock(&store.tables)?;
            if let Some(dup) = attempts
                .iter()
                .find(|staged| tables.attempts.iter().any(|a| a.id == staged.id))
            {
                return Err(conflict(dup.id));
            }
            tables.attempts.extend(attempts);
            tables.answers.extend(answers);
        }
        store.commit_count.fetch_add(1, Ordering::Relaxed);

        store.trip(FailPoint::AckLost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn attempt(quiz: &str, subject: &str) -> FinishedAttempt {
        FinishedAttempt {
            id: Uuid::new_v4(),
            quiz_id: quiz.into(),
            subject_id: subject.into(),
            submitted_at: Utc::now(),
            score_percent: 50,
            passed: false,
            correct_count: 1,
            question_count: 2,
            answers: vec![
                AnswerRecord::new("q1", Some("a".into())),
                AnswerRecord::new("q2", None),
            ],
        }
    }

    async fn write(store: &MemoryStore, attempt: &FinishedAttempt) -> Result<(), StoreError> {
        let mut tx = store.begin().await?;
        tx.insert_attempt(attempt).await?;
        tx.insert_answer_records(attempt.id, &attempt.answers)
            .await?;
        tx.commit().await
    }

    #[tokio::test]
    async fn commit_makes_attempt_visible_with_answers() {
        let store = MemoryStore::new();
        let a = attempt("quiz", "s1");
        write(&store, &a).await.unwrap();

        let found = store.query_attempts_by("quiz", "s1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].answers.len(), 2);
        assert!(store.query_attempts_by("quiz", "s2").await.unwrap().is_empty());
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn dropped_writer_leaves_nothing() {
        let store = MemoryStore::new();
        let a = attempt("quiz", "s1");
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_attempt(&a).await.unwrap();
            tx.insert_answer_records(a.id, &a.answers).await.unwrap();
        }
        assert_eq!(store.attempt_count(), 0);
        assert_eq!(store.answer_count(), 0);
    }

    #[tokio::test]
    async fn injected_failures_write_nothing() {
        for point in [
            FailPoint::Begin,
            FailPoint::InsertAttempt,
            FailPoint::InsertAnswerRecords,
            FailPoint::Commit,
        ] {
            let store = MemoryStore::new();
            store.fail_at(point, 1);
            let err = write(&store, &attempt("quiz", "s")).await.unwrap_err();
            assert!(err.is_retryable(), "{point:?}");
            assert_eq!(store.attempt_count(), 0, "{point:?}");
            assert_eq!(store.answer_count(), 0, "{point:?}");

            // the injection is spent
            write(&store, &attempt("quiz", "s")).await.unwrap();
            assert_eq!(store.attempt_count(), 1);
        }
    }

    #[tokio::test]
    async fn lost_ack_still_commits() {
        let store = MemoryStore::new();
        store.fail_at(FailPoint::AckLost, 1);
        let a = attempt("quiz", "s");
        assert!(write(&store, &a).await.is_err());
        assert_eq!(store.attempt_count(), 1);

        let err = write(&store, &a).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn injected_query_failure_is_retryable() {
        let store = MemoryStore::new();
        write(&store, &attempt("quiz", "s")).await.unwrap();
        store.fail_at(FailPoint::Query, 1);

        let err = store.query_attempts_by("quiz", "s").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.query_attempts_by("quiz", "s").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn answers_for_unstaged_attempt_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_answer_records(Uuid::new_v4(), &[AnswerRecord::new("q1", None)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert!(!err.is_retryable());
    }
}
