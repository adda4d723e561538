//! Core data model types for quizrun.
//!
//! Quiz content (`Quiz`, `Question`, `QuizOption`) is read-only input;
//! `AnswerRecord` and `FinishedAttempt` are the durable output of a run.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Fewest options a question may offer.
pub const MIN_OPTIONS: usize = 2;
/// Most options a question may offer.
pub const MAX_OPTIONS: usize = 6;
/// Per-question countdown used when a quiz does not set one.
pub const DEFAULT_QUESTION_DURATION_SECS: u32 = 30;

/// A multiple-choice quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    /// Unique identifier for this quiz.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Optional description shown before the first question.
    #[serde(default)]
    pub description: String,
    /// Questions in presentation order.
    pub questions: Vec<Question>,
    /// Minimum score percentage (0-100) for an attempt to pass.
    pub passing_score: u8,
    /// Fixed countdown for every question, in seconds.
    #[serde(default = "default_duration")]
    pub question_duration_secs: u32,
    /// Presentation variant; selects the celebration policy.
    #[serde(default)]
    pub variant: QuizVariant,
}

fn default_duration() -> u32 {
    DEFAULT_QUESTION_DURATION_SECS
}

/// A single question with its ordered options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<QuizOption>,
    /// Shown once the answer is revealed.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// One selectable answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

/// The two quiz flavours found in the product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizVariant {
    /// Chapter quiz with persisted attempts.
    #[default]
    Graded,
    /// Ungraded preview with streak and XP feedback.
    Gamified,
}

impl fmt::Display for QuizVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizVariant::Graded => write!(f, "graded"),
            QuizVariant::Gamified => write!(f, "gamified"),
        }
    }
}

impl FromStr for QuizVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "graded" | "chapter" => Ok(QuizVariant::Graded),
            "gamified" | "preview" => Ok(QuizVariant::Gamified),
            other => Err(format!("unknown quiz variant: {other}")),
        }
    }
}

impl Quiz {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Check that the quiz can be run.
    ///
    /// Every error here is fatal to opening the quiz; nothing is deferred
    /// to completion time (a zero-question quiz never reaches the percentage
    /// computation).
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |reason: String| EngineError::InvalidQuizDefinition {
            quiz_id: self.id.clone(),
            reason,
        };

        if self.questions.is_empty() {
            return Err(invalid("quiz has no questions".into()));
        }
        if self.passing_score > 100 {
            return Err(invalid(format!(
                "passing score {} is above 100",
                self.passing_score
            )));
        }
        if self.question_duration_secs == 0 {
            return Err(invalid("question duration must be at least 1 second".into()));
        }

        let mut question_ids = HashSet::new();
        for question in &self.questions {
            if !question_ids.insert(question.id.as_str()) {
                return Err(invalid(format!("duplicate question id '{}'", question.id)));
            }
            question.validate().map_err(invalid)?;
        }

        Ok(())
    }
}

impl Question {
    /// Look up an option by id.
    pub fn option(&self, id: &str) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// The single correct option, if the question is well-formed.
    pub fn correct_option(&self) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.correct)
    }

    /// Whether selecting `option_id` answers this question correctly.
    /// `None` (no selection) is never correct.
    pub fn is_correct(&self, option_id: Option<&str>) -> bool {
        option_id
            .and_then(|id| self.option(id))
            .is_some_and(|o| o.correct)
    }

    fn validate(&self) -> Result<(), String> {
        let n = self.options.len();
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&n) {
            return Err(format!(
                "question '{}' has {n} options, expected {MIN_OPTIONS}-{MAX_OPTIONS}",
                self.id
            ));
        }

        let mut option_ids = HashSet::new();
        for option in &self.options {
            if !option_ids.insert(option.id.as_str()) {
                return Err(format!(
                    "question '{}' has duplicate option id '{}'",
                    self.id, option.id
                ));
            }
        }

        match self.options.iter().filter(|o| o.correct).count() {
            1 => Ok(()),
            0 => Err(format!("question '{}' has no correct option", self.id)),
            c => Err(format!(
                "question '{}' has {c} correct options, expected exactly one",
                self.id
            )),
        }
    }
}

/// The durable outcome of one question in a submitted attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    /// `None` when the question expired without a selection.
    pub selected_option_id: Option<String>,
    pub correct: bool,
}

impl AnswerRecord {
    pub fn new(question_id: impl Into<String>, selected_option_id: Option<String>) -> Self {
        Self {
            question_id: question_id.into(),
            selected_option_id,
            correct: false,
        }
    }
}

/// A recorded, complete run of a quiz by one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedAttempt {
    pub id: Uuid,
    pub quiz_id: String,
    pub subject_id: String,
    pub submitted_at: DateTime<Utc>,
    /// round(100 * correct / total).
    pub score_percent: u8,
    pub passed: bool,
    pub correct_count: u32,
    pub question_count: u32,
    pub answers: Vec<AnswerRecord>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A question whose option "a" is correct.
    pub fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            prompt: format!("Prompt for {id}"),
            options: vec![
                QuizOption {
                    id: "a".into(),
                    text: "right".into(),
                    correct: true,
                },
                QuizOption {
                    id: "b".into(),
                    text: "wrong".into(),
                    correct: false,
                },
                QuizOption {
                    id: "c".into(),
                    text: "also wrong".into(),
                    correct: false,
                },
            ],
            explanation: Some(format!("Explanation for {id}")),
        }
    }

    pub fn quiz(question_count: usize, passing_score: u8) -> Quiz {
        Quiz {
            id: "quiz-1".into(),
            title: "Fixture quiz".into(),
            description: String::new(),
            questions: (1..=question_count)
                .map(|i| question(&format!("q{i}")))
                .collect(),
            passing_score,
            question_duration_secs: 30,
            variant: QuizVariant::Graded,
        }
    }
}
