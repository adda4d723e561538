//! Attempt-history statistics: prior pass detection and best score.

use serde::{Deserialize, Serialize};

use crate::model::FinishedAttempt;

/// Everything a results screen needs about past attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptHistory {
    /// Most recent first.
    pub attempts: Vec<FinishedAttempt>,
    pub has_passed: bool,
    /// Highest score; the earliest attempt wins ties.
    pub best: Option<FinishedAttempt>,
    pub average_score: Option<f64>,
    /// 1-based number of the first passing attempt.
    pub first_pass_attempt: Option<usize>,
}

impl AttemptHistory {
    /// Build statistics from attempts ordered most recent first.
    pub fn from_attempts(attempts: Vec<FinishedAttempt>) -> Self {
        let chronological = || attempts.iter().rev();

        let mut best: Option<&FinishedAttempt> = None;
        for attempt in chronological() {
            if best.map_or(true, |b| attempt.score_percent > b.score_percent) {
                best = Some(attempt);
            }
        }

        let first_pass_attempt = chronological().position(|a| a.passed).map(|i| i + 1);

        let average_score = if attempts.is_empty() {
            None
        } else {
            let sum: f64 = attempts.iter().map(|a| f64::from(a.score_percent)).sum();
            Some(sum / attempts.len() as f64)
        };

        Self {
            has_passed: first_pass_attempt.is_some(),
            best: best.cloned(),
            average_score,
            first_pass_attempt,
            attempts,
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn latest(&self) -> Option<&FinishedAttempt> {
        self.attempts.first()
    }

    pub fn best_score(&self) -> Option<u8> {
        self.best.as_ref().map(|a| a.score_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn attempt(minute: i64, score: u8, passed: bool) -> FinishedAttempt {
        FinishedAttempt {
            id: Uuid::new_v4(),
            quiz_id: "quiz".into(),
            subject_id: "s".into(),
            submitted_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minute),
            score_percent: score,
            passed,
            correct_count: 0,
            question_count: 3,
            answers: vec![],
        }
    }

    #[test]
    fn empty_history() {
        let history = AttemptHistory::from_attempts(vec![]);
        assert!(!history.has_passed);
        assert!(history.best.is_none());
        assert!(history.average_score.is_none());
        assert!(history.latest().is_none());
    }

    #[test]
    fn pass_then_lower_retake_keeps_first_as_best() {
        // most recent first
        let history =
            AttemptHistory::from_attempts(vec![attempt(5, 67, false), attempt(0, 100, true)]);
        assert!(history.has_passed);
        assert_eq!(history.best_score(), Some(100));
        assert_eq!(history.first_pass_attempt, Some(1));
        assert_eq!(history.latest().unwrap().score_percent, 67);
        assert_eq!(history.attempt_count(), 2);
    }

    #[test]
    fn ties_keep_earliest_attempt() {
        let early = attempt(0, 80, true);
        let late = attempt(9, 80, true);
        let early_id = early.id;
        let history = AttemptHistory::from_attempts(vec![late, early]);
        assert_eq!(history.best.unwrap().id, early_id);
    }

    #[test]
    fn average_and_first_pass() {
        let history = AttemptHistory::from_attempts(vec![
            attempt(2, 90, true),
            attempt(1, 60, false),
            attempt(0, 30, false),
        ]);
        assert_eq!(history.first_pass_attempt, Some(3));
        assert!((history.average_score.unwrap() - 60.0).abs() < f64::EPSILON);
    }
}
