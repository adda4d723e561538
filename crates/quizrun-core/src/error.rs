//! Engine and storage error types.
//!
//! `StoreError` is defined here rather than in `quizrun-store` so the
//! recorder can classify failures for retry decisions without string matching.

use thiserror::Error;

/// Errors surfaced by the assessment engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The quiz cannot be run (no questions, no correct option, ...).
    /// Raised before any session exists.
    #[error("invalid quiz definition '{quiz_id}': {reason}")]
    InvalidQuizDefinition { quiz_id: String, reason: String },

    /// The quiz content provider has no quiz with this id.
    #[error("quiz not found: {0}")]
    QuizNotFound(String),

    /// The quiz content provider failed.
    #[error("quiz content unavailable: {0}")]
    ContentUnavailable(String),

    /// A submission is missing answer entries for these questions.
    #[error("incomplete submission, unanswered questions: {}", missing.join(", "))]
    IncompleteSubmission { missing: Vec<String> },

    /// A submission references questions or options the quiz does not have,
    /// or answers a question twice.
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    /// The attempt store failed; the submission may be retried.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),

    /// A countdown was started while another one was still live.
    #[error("timer overlap: a countdown is already running")]
    TimerOverlap,

    /// A selection named a question other than the one being presented.
    #[error("question '{given}' is not the current question '{current}'")]
    QuestionMismatch { current: String, given: String },

    /// The option does not belong to the current question.
    #[error("unknown option '{option_id}' for question '{question_id}'")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },

    /// `advance` was called before the current answer was locked.
    #[error("cannot advance: question '{0}' has not been revealed")]
    NotRevealed(String),

    /// The run already moved past its last question.
    #[error("the session is complete")]
    SessionComplete,

    /// `submit` was called before the run reached its last question.
    #[error("the session is not complete yet")]
    SessionInProgress,

    /// The run was already recorded.
    #[error("attempt already submitted as {0}")]
    AlreadySubmitted(uuid::Uuid),
}

impl EngineError {
    /// Returns `true` if the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::StorageUnavailable(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Errors raised by an attempt store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record with the same key already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The stored data could not be decoded.
    #[error("corrupt store data: {0}")]
    Corrupt(String),

    /// The write violated the store contract (e.g. answers for an unknown attempt).
    #[error("rejected write: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` if this error is transient and a fresh transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Io(_))
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::StorageUnavailable(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability() {
        assert!(StoreError::Unavailable("down".into()).is_retryable());
        assert!(!StoreError::Conflict("dup".into()).is_retryable());
        assert!(!StoreError::Corrupt("bad json".into()).is_retryable());

        let err: EngineError = StoreError::Unavailable("down".into()).into();
        assert!(err.is_retryable());
        assert!(!EngineError::TimerOverlap.is_retryable());
    }

    #[test]
    fn incomplete_submission_lists_missing() {
        let err = EngineError::IncompleteSubmission {
            missing: vec!["q2".into(), "q3".into()],
        };
        assert_eq!(
            err.to_string(),
            "incomplete submission, unanswered questions: q2, q3"
        );
    }
}
