//! Streak and reward computation.
//!
//! A correct answer earns `BASE_REWARD + min(streak * STREAK_STEP, STREAK_CAP)
//! + floor(remaining / 2)`, where `streak` already includes this answer.
//! A miss (wrong option or expiry) earns nothing and resets the streak.

use serde::{Deserialize, Serialize};

/// Points for any correct answer.
pub const BASE_REWARD: u32 = 10;
/// Streak bonus per consecutive correct answer.
pub const STREAK_STEP: u32 = 5;
/// Upper bound on the streak bonus.
pub const STREAK_CAP: u32 = 25;

/// The result of scoring one revealed question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerScore {
    pub correct: bool,
    /// Streak after this answer.
    pub streak: u32,
    pub reward: u32,
}

/// Score a revealed question.
///
/// `remaining_secs` is the countdown value at the moment of the answer;
/// callers pass 0 for expiry.
pub fn score_answer(correct: bool, streak_before: u32, remaining_secs: u32) -> AnswerScore {
    if !correct {
        return AnswerScore {
            correct: false,
            streak: 0,
            reward: 0,
        };
    }

    let streak = streak_before.saturating_add(1);
    let streak_bonus = streak.saturating_mul(STREAK_STEP).min(STREAK_CAP);
    AnswerScore {
        correct: true,
        streak,
        reward: BASE_REWARD + streak_bonus + remaining_secs / 2,
    }
}

/// Largest reward a single correct answer can earn on a quiz whose
/// countdown is `duration_secs`.
pub fn max_reward(duration_secs: u32) -> u32 {
    BASE_REWARD + STREAK_CAP + duration_secs / 2
}
