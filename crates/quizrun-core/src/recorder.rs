//! The boundary to durable storage.
//!
//! The recorder never trusts a caller-computed score: correctness, the
//! percentage and the pass flag are all recomputed here from the quiz
//! content and the submitted selections.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::aggregate::{is_passing, score_percent};
use crate::error::{EngineError, StoreError};
use crate::model::{AnswerRecord, FinishedAttempt, Quiz};
use crate::statistics::AttemptHistory;
use crate::traits::{AttemptStore, QuizSource};

/// Retry behaviour for transient store failures.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Retries after the first failed write.
    pub max_retries: u32,
    /// Delay before the first retry; doubles after each retry.
    pub retry_delay: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_millis(200),
        }
    }
}

const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Id and timestamp of one submission.
///
/// Resubmitting a run with the same key never records a second attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionKey {
    pub attempt_id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionKey {
    pub fn new() -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            submitted_at: Utc::now(),
        }
    }
}

impl Default for SubmissionKey {
    fn default() -> Self {
        Self::new()
    }
}

/// Persists finished attempts and answers history queries.
pub struct AttemptRecorder {
    store: Arc<dyn AttemptStore>,
    source: Arc<dyn QuizSource>,
    config: RecorderConfig,
}

impl AttemptRecorder {
    pub fn new(
        store: Arc<dyn AttemptStore>,
        source: Arc<dyn QuizSource>,
        config: RecorderConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn AttemptStore> {
        &self.store
    }

    pub fn source(&self) -> &Arc<dyn QuizSource> {
        &self.source
    }

    /// Grade and persist one complete submission under a fresh key.
    ///
    /// Either the attempt and all of its answer records become visible, or
    /// nothing does.
    pub async fn submit(
        &self,
        quiz_id: &str,
        subject_id: &str,
        answers: &[AnswerRecord],
    ) -> Result<FinishedAttempt, EngineError> {
        self.submit_with_key(quiz_id, subject_id, answers, SubmissionKey::new())
            .await
    }

    /// Like [`submit`](Self::submit), under a caller-held key. If an attempt
    /// with `key.attempt_id` is already stored the call succeeds without
    /// writing again.
    pub async fn submit_with_key(
        &self,
        quiz_id: &str,
        subject_id: &str,
        answers: &[AnswerRecord],
        key: SubmissionKey,
    ) -> Result<FinishedAttempt, EngineError> {
        let quiz = self.load_quiz(quiz_id).await?;
        let graded = grade_submission(&quiz, answers)?;

        let correct_count = graded.iter().filter(|a| a.correct).count() as u32;
        let question_count = quiz.question_count() as u32;
        let score = score_percent(correct_count, question_count);

        let attempt = FinishedAttempt {
            id: key.attempt_id,
            quiz_id: quiz.id.clone(),
            subject_id: subject_id.to_string(),
            submitted_at: key.submitted_at,
            score_percent: score,
            passed: is_passing(score, quiz.passing_score),
            correct_count,
            question_count,
            answers: graded,
        };

        let mut retry = 0;
        let mut retry_delay = self.config.retry_delay;
        loop {
            let err = match self.write(&attempt).await {
                Ok(()) => {
                    tracing::info!(
                        attempt_id = %attempt.id,
                        quiz_id,
                        subject_id,
                        score = attempt.score_percent,
                        passed = attempt.passed,
                        "attempt recorded"
                    );
                    return Ok(attempt);
                }
                Err(e) => e,
            };

            // A commit reported as failed may still have landed, here or in
            // an earlier call with the same key; a conflict on our own id
            // means it did.
            if matches!(err, StoreError::Conflict(_)) && self.is_recorded(&attempt).await {
                tracing::info!(attempt_id = %attempt.id, "attempt recorded by an earlier try");
                return Ok(attempt);
            }

            if !err.is_retryable() || retry >= self.config.max_retries {
                tracing::error!(attempt_id = %attempt.id, "attempt write failed: {err}");
                return Err(EngineError::StorageUnavailable(err));
            }

            retry += 1;
            tracing::warn!(
                attempt_id = %attempt.id,
                retry,
                "attempt write failed, retrying in {retry_delay:?}: {err}"
            );
            tokio::time::sleep(retry_delay).await;
            retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
        }
    }

    /// Attempts for a quiz/subject pair, most recent first.
    pub async fn list_attempts(
        &self,
        quiz_id: &str,
        subject_id: &str,
    ) -> Result<Vec<FinishedAttempt>, EngineError> {
        let mut attempts = self.store.query_attempts_by(quiz_id, subject_id).await?;
        // Stores return insertion order; reversing first keeps equal
        // timestamps newest-first under the stable sort.
        attempts.reverse();
        attempts.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(attempts)
    }

    /// Whether any recorded attempt passed. Passing never blocks a retake.
    pub async fn has_passed(&self, quiz_id: &str, subject_id: &str) -> Result<bool, EngineError> {
        Ok(self
            .list_attempts(quiz_id, subject_id)
            .await?
            .iter()
            .any(|a| a.passed))
    }

    /// The highest-scoring attempt; the earliest one wins ties.
    pub async fn best_attempt(
        &self,
        quiz_id: &str,
        subject_id: &str,
    ) -> Result<Option<FinishedAttempt>, EngineError> {
        Ok(self.history(quiz_id, subject_id).await?.best)
    }

    pub async fn history(
        &self,
        quiz_id: &str,
        subject_id: &str,
    ) -> Result<AttemptHistory, EngineError> {
        let attempts = self.list_attempts(quiz_id, subject_id).await?;
        Ok(AttemptHistory::from_attempts(attempts))
    }

    async fn load_quiz(&self, quiz_id: &str) -> Result<Quiz, EngineError> {
        let quiz = self
            .source
            .load_quiz(quiz_id)
            .await
            .map_err(|e| EngineError::ContentUnavailable(format!("{e:#}")))?
            .ok_or_else(|| EngineError::QuizNotFound(quiz_id.to_string()))?;
        quiz.validate()?;
        Ok(quiz)
    }

    async fn write(&self, attempt: &FinishedAttempt) -> Result<(), StoreError> {
        let mut tx = self.store.begin().await?;
        tx.insert_attempt(attempt).await?;
        tx.insert_answer_records(attempt.id, &attempt.answers)
            .await?;
        tx.commit().await
    }

    async fn is_recorded(&self, attempt: &FinishedAttempt) -> bool {
        self.store
            .query_attempts_by(&attempt.quiz_id, &attempt.subject_id)
            .await
            .map(|all| all.iter().any(|a| a.id == attempt.id))
            .unwrap_or_else(|e| {
                tracing::warn!(
                    attempt_id = %attempt.id,
                    "could not check whether the attempt was already recorded: {e}"
                );
                false
            })
    }
}

/// Check a submission against the quiz and recompute every answer's
/// correctness. Records come back in quiz order.
///
/// Every question needs exactly one entry; expired questions are submitted
/// with no selection rather than left out.
pub fn grade_submission(
    quiz: &Quiz,
    answers: &[AnswerRecord],
) -> Result<Vec<AnswerRecord>, EngineError> {
    let mut by_question: HashMap<&str, &AnswerRecord> = HashMap::new();
    for answer in answers {
        if by_question
            .insert(answer.question_id.as_str(), answer)
            .is_some()
        {
            return Err(EngineError::InvalidSubmission(format!(
                "question '{}' answered more than once",
                answer.question_id
            )));
        }
    }

    let known: HashSet<&str> = quiz.questions.iter().map(|q| q.id.as_str()).collect();
    if let Some(unknown) = answers
        .iter()
        .find(|a| !known.contains(a.question_id.as_str()))
    {
        return Err(EngineError::InvalidSubmission(format!(
            "quiz '{}' has no question '{}'",
            quiz.id, unknown.question_id
        )));
    }

    let mut missing = Vec::new();
    let mut graded = Vec::with_capacity(quiz.question_count());
    for question in &quiz.questions {
        let Some(answer) = by_question.get(question.id.as_str()) else {
            missing.push(question.id.clone());
            continue;
        };
        if let Some(option_id) = &answer.selected_option_id {
            if question.option(option_id).is_none() {
                return Err(EngineError::InvalidSubmission(format!(
                    "question '{}' has no option '{option_id}'",
                    question.id
                )));
            }
        }
        graded.push(AnswerRecord {
            question_id: question.id.clone(),
            selected_option_id: answer.selected_option_id.clone(),
            correct: question.is_correct(answer.selected_option_id.as_deref()),
        });
    }

    if !missing.is_empty() {
        return Err(EngineError::IncompleteSubmission { missing });
    }
    Ok(graded)
}
