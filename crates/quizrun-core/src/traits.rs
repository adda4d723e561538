//! Collaborator seams: durable attempt storage and quiz content.
//!
//! Implementations live in the `quizrun-store` crate.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{AnswerRecord, FinishedAttempt, Quiz};

// ---------------------------------------------------------------------------
// Attempt storage
// ---------------------------------------------------------------------------

/// Append-only storage for finished attempts.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Human-readable store name (e.g. "memory").
    fn name(&self) -> &str;

    /// Open a write transaction.
    async fn begin(&self) -> Result<Box<dyn AttemptWriter + '_>, StoreError>;

    /// All attempts for a quiz/subject pair, in insertion order, with their
    /// answer records attached.
    async fn query_attempts_by(
        &self,
        quiz_id: &str,
        subject_id: &str,
    ) -> Result<Vec<FinishedAttempt>, StoreError>;
}

/// A single submission's write transaction.
///
/// Nothing written through the writer is visible until [`commit`] succeeds.
/// Dropping the writer without committing discards everything.
///
/// [`commit`]: AttemptWriter::commit
#[async_trait]
pub trait AttemptWriter: Send {
    /// Stage the attempt row. Its `answers` field is ignored; answer records
    /// are staged separately.
    async fn insert_attempt(&mut self, attempt: &FinishedAttempt) -> Result<(), StoreError>;

    /// Stage answer records for an attempt staged in this transaction.
    async fn insert_answer_records(
        &mut self,
        attempt_id: uuid::Uuid,
        records: &[AnswerRecord],
    ) -> Result<(), StoreError>;

    /// Make every staged write visible at once.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Quiz content
// ---------------------------------------------------------------------------

/// Read-only provider of quiz content.
///
/// Content is assumed immutable while any run references it.
#[async_trait]
pub trait QuizSource: Send + Sync {
    /// Load a quiz by id. `Ok(None)` if no such quiz exists.
    async fn load_quiz(&self, quiz_id: &str) -> anyhow::Result<Option<Quiz>>;

    /// Ids and titles of every available quiz.
    async fn list_quizzes(&self) -> anyhow::Result<Vec<QuizListing>>;
}

/// Catalog entry returned by [`QuizSource::list_quizzes`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizListing {
    pub id: String,
    pub title: String,
    pub question_count: usize,
}
