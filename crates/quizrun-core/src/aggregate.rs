//! Attempt aggregation: running totals, final percentage, pass/fail and
//! celebration.

use serde::{Deserialize, Serialize};

use crate::model::QuizVariant;
use crate::scoring::AnswerScore;

/// round(100 * correct / total), rounding halves up.
///
/// `total` must be non-zero; quizzes without questions are rejected when
/// they are opened, long before this is called.
pub fn score_percent(correct: u32, total: u32) -> u8 {
    debug_assert!(total > 0, "score_percent with zero questions");
    debug_assert!(correct <= total);
    let total = u64::from(total.max(1));
    let correct = u64::from(correct).min(total);
    ((200 * correct + total) / (2 * total)) as u8
}

/// Whether a score meets the quiz threshold.
pub fn is_passing(score_percent: u8, passing_score: u8) -> bool {
    score_percent >= passing_score
}

/// When a finished run earns the celebratory confetti.
///
/// The two quiz variants deliberately use different rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CelebrationPolicy {
    /// Graded chapter quizzes celebrate every pass.
    OnPass,
    /// Gamified previews additionally require at least 70% of the
    /// questions answered correctly.
    OnPassWithSeventyPercentCorrect,
}

impl CelebrationPolicy {
    pub fn for_variant(variant: QuizVariant) -> Self {
        match variant {
            QuizVariant::Graded => CelebrationPolicy::OnPass,
            QuizVariant::Gamified => CelebrationPolicy::OnPassWithSeventyPercentCorrect,
        }
    }

    pub fn celebrate(&self, passed: bool, correct: u32, total: u32) -> bool {
        match self {
            CelebrationPolicy::OnPass => passed,
            // correct >= ceil(0.7 * total) <=> 10 * correct >= 7 * total
            CelebrationPolicy::OnPassWithSeventyPercentCorrect => {
                passed && u64::from(correct) * 10 >= u64::from(total) * 7
            }
        }
    }
}

/// Running totals for a run in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub revealed: u32,
    pub correct: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub reward_total: u32,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one revealed question into the totals.
    pub fn record(&mut self, score: &AnswerScore) {
        self.revealed += 1;
        if score.correct {
            self.correct += 1;
        }
        self.streak = score.streak;
        self.best_streak = self.best_streak.max(score.streak);
        self.reward_total += score.reward;
    }

    /// Compute the final figures for a quiz of `question_count` questions.
    pub fn summarize(
        &self,
        question_count: u32,
        passing_score: u8,
        policy: CelebrationPolicy,
    ) -> AttemptSummary {
        let score = score_percent(self.correct, question_count);
        let passed = is_passing(score, passing_score);
        AttemptSummary {
            correct_count: self.correct,
            question_count,
            score_percent: score,
            passed,
            celebrate: policy.celebrate(passed, self.correct, question_count),
            reward_total: self.reward_total,
            best_streak: self.best_streak,
        }
    }
}

/// Final figures for a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub correct_count: u32,
    pub question_count: u32,
    pub score_percent: u8,
    pub passed: bool,
    pub celebrate: bool,
    pub reward_total: u32,
    pub best_streak: u32,
}
