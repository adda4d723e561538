//! Transient per-run state and the views handed to the presentation layer.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::{AttemptSummary, CelebrationPolicy, Tally};
use crate::model::{AnswerRecord, Quiz};
use crate::scoring::AnswerScore;

/// A question's answer once it has been locked by selection or expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockedAnswer {
    pub question_id: String,
    /// `None` if the countdown expired first.
    pub selected_option_id: Option<String>,
    /// Countdown value when the answer was locked (0 on expiry).
    pub remaining_secs: u32,
    pub score: AnswerScore,
}

impl LockedAnswer {
    pub fn expired(&self) -> bool {
        self.selected_option_id.is_none()
    }
}

/// State of one run in progress. Never persisted; it is discarded when the
/// run is submitted or abandoned.
#[derive(Debug, Clone)]
pub struct AttemptSession {
    pub quiz: Arc<Quiz>,
    pub subject_id: String,
    /// 0-based; equals the question count once the run is complete.
    pub index: usize,
    /// Locked answers keyed by question id. An entry is never replaced.
    pub answers: HashMap<String, LockedAnswer>,
    pub tally: Tally,
}

impl AttemptSession {
    pub fn new(quiz: Arc<Quiz>, subject_id: impl Into<String>) -> Self {
        Self {
            quiz,
            subject_id: subject_id.into(),
            index: 0,
            answers: HashMap::new(),
            tally: Tally::new(),
        }
    }

    pub fn question_count(&self) -> usize {
        self.quiz.question_count()
    }

    /// Records in quiz order for every locked question.
    pub fn answer_records(&self) -> Vec<AnswerRecord> {
        self.quiz
            .questions
            .iter()
            .filter_map(|q| self.answers.get(&q.id))
            .map(|locked| AnswerRecord {
                question_id: locked.question_id.clone(),
                selected_option_id: locked.selected_option_id.clone(),
                correct: locked.score.correct,
            })
            .collect()
    }

    pub fn summary(&self) -> AttemptSummary {
        self.tally.summarize(
            self.question_count() as u32,
            self.quiz.passing_score,
            CelebrationPolicy::for_variant(self.quiz.variant),
        )
    }
}

/// What a locked answer revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reveal {
    pub question_id: String,
    pub selected_option_id: Option<String>,
    pub correct_option_id: String,
    pub expired: bool,
    pub score: AnswerScore,
    pub explanation: Option<String>,
}

/// An option as displayed. `correct` is only filled in after reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: String,
    pub text: String,
    pub correct: Option<bool>,
}

/// The active question as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    /// 1-based.
    pub position: usize,
    pub question_count: usize,
    pub question_id: String,
    pub prompt: String,
    pub options: Vec<OptionView>,
    pub locked_option_id: Option<String>,
    pub expired: bool,
    pub explanation: Option<String>,
    pub remaining_secs: u32,
    pub low_time: bool,
    pub streak: u32,
    pub reward_total: u32,
}

/// Presentation view model for the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionView {
    Presenting(QuestionView),
    Revealed(QuestionView),
    Complete(AttemptSummary),
}
