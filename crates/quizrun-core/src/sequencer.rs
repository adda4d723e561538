//! Question sequencing state machine.
//!
//! ```text
//! Presenting(q) --select / expiry--> Revealed(q) --advance--> Presenting(q+1)
//!                                                 \--advance on last--> Complete
//! ```
//!
//! The clock runs only in `Presenting`. Every path out of `Presenting`
//! stops it, and `advance` stops it again before starting the next
//! countdown, so two countdowns are never live at once.

use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::AttemptSummary;
use crate::clock::{is_low_time, Clock, ClockEvent};
use crate::error::EngineError;
use crate::model::{AnswerRecord, Question, Quiz};
use crate::scoring::score_answer;
use crate::session::{
    AttemptSession, LockedAnswer, OptionView, QuestionView, Reveal, SessionView,
};

/// Observable sequencer states. Advancing is performed atomically inside
/// [`Sequencer::advance`] and is never observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Presenting,
    Revealed,
    Complete,
}

/// Result of a selection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The selection locked the question.
    Revealed(Reveal),
    /// The question was already locked (or the run is complete); nothing changed.
    Ignored,
}

/// Result of one elapsed clock second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Tick { remaining: u32, low_time: bool },
    /// The countdown ran out and locked the question with no selection.
    Expired(Reveal),
}

/// Drives one run of a quiz from the first question to completion.
pub struct Sequencer<C: Clock> {
    session: AttemptSession,
    clock: C,
    phase: Phase,
    remaining: u32,
    low_time: bool,
}

impl<C: Clock> Sequencer<C> {
    /// Validate the quiz and present its first question.
    ///
    /// No session is created for an invalid quiz.
    pub fn start(
        quiz: Arc<Quiz>,
        subject_id: impl Into<String>,
        mut clock: C,
    ) -> Result<Self, EngineError> {
        quiz.validate()?;
        let duration = quiz.question_duration_secs;
        clock.stop();
        clock.start(duration)?;

        let session = AttemptSession::new(quiz, subject_id);
        tracing::debug!(
            quiz_id = %session.quiz.id,
            subject_id = %session.subject_id,
            questions = session.question_count(),
            "attempt session opened"
        );

        Ok(Self {
            session,
            clock,
            phase: Phase::Presenting,
            remaining: duration,
            low_time: is_low_time(duration),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &AttemptSession {
        &self.session
    }

    pub fn quiz(&self) -> &Quiz {
        &self.session.quiz
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// 0-based index of the active question.
    pub fn current_index(&self) -> usize {
        self.session.index
    }

    /// The question being presented or revealed; `None` once complete.
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::Complete => None,
            _ => self.session.quiz.questions.get(self.session.index),
        }
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining
    }

    /// Lock `option_id` as the answer to the current question.
    pub fn select_option(
        &mut self,
        question_id: &str,
        option_id: &str,
    ) -> Result<SelectOutcome, EngineError> {
        if self.phase != Phase::Presenting {
            tracing::debug!(question_id, option_id, phase = ?self.phase, "selection ignored");
            return Ok(SelectOutcome::Ignored);
        }

        let question = self.active_question();
        if question.id != question_id {
            return Err(EngineError::QuestionMismatch {
                current: question.id.clone(),
                given: question_id.to_string(),
            });
        }
        if question.option(option_id).is_none() {
            return Err(EngineError::UnknownOption {
                question_id: question_id.to_string(),
                option_id: option_id.to_string(),
            });
        }

        let remaining = self.clock.remaining().unwrap_or(self.remaining);
        Ok(SelectOutcome::Revealed(
            self.lock(Some(option_id.to_string()), remaining),
        ))
    }

    /// Wait for the next clock second and apply it.
    ///
    /// Returns `None` when no countdown is live (outside `Presenting`).
    /// Cancel-safe: dropping the future before it resolves changes nothing.
    pub async fn tick(&mut self) -> Option<TickOutcome> {
        if self.phase != Phase::Presenting {
            return None;
        }
        let event = self.clock.next_event().await?;
        self.apply_clock_event(event)
    }

    /// Apply a clock event. Events arriving outside `Presenting` are stale
    /// and dropped.
    pub fn apply_clock_event(&mut self, event: ClockEvent) -> Option<TickOutcome> {
        if self.phase != Phase::Presenting {
            tracing::debug!(?event, phase = ?self.phase, "stale clock event dropped");
            return None;
        }
        match event {
            ClockEvent::Tick {
                remaining,
                low_time,
            } => {
                self.remaining = remaining;
                self.low_time = low_time;
                Some(TickOutcome::Tick {
                    remaining,
                    low_time,
                })
            }
            ClockEvent::Expired => {
                tracing::debug!(question_id = %self.active_question().id, "question expired");
                Some(TickOutcome::Expired(self.lock(None, 0)))
            }
        }
    }

    /// Move past a revealed question.
    pub fn advance(&mut self) -> Result<Phase, EngineError> {
        match self.phase {
            Phase::Presenting => {
                return Err(EngineError::NotRevealed(self.active_question().id.clone()))
            }
            Phase::Complete => return Err(EngineError::SessionComplete),
            Phase::Revealed => {}
        }

        self.session.index += 1;
        if self.session.index >= self.session.question_count() {
            self.session.index = self.session.question_count();
            self.phase = Phase::Complete;
            tracing::debug!(quiz_id = %self.session.quiz.id, "attempt session complete");
            return Ok(Phase::Complete);
        }

        let duration = self.session.quiz.question_duration_secs;
        self.clock.stop();
        self.clock.start(duration)?;
        self.remaining = duration;
        self.low_time = is_low_time(duration);
        self.phase = Phase::Presenting;
        Ok(Phase::Presenting)
    }

    /// Leave the run without submitting. The countdown is cancelled and the
    /// session discarded.
    pub fn abandon(mut self) {
        self.clock.stop();
        tracing::debug!(
            quiz_id = %self.session.quiz.id,
            answered = self.session.answers.len(),
            "attempt session abandoned"
        );
    }

    /// Answer records for every locked question, in quiz order.
    pub fn answer_records(&self) -> Vec<AnswerRecord> {
        self.session.answer_records()
    }

    /// Final figures, available once the run is complete.
    pub fn summary(&self) -> Option<AttemptSummary> {
        (self.phase == Phase::Complete).then(|| self.session.summary())
    }

    pub fn view(&self) -> SessionView {
        match self.phase {
            Phase::Presenting => SessionView::Presenting(self.question_view(false)),
            Phase::Revealed => SessionView::Revealed(self.question_view(true)),
            Phase::Complete => SessionView::Complete(self.session.summary()),
        }
    }

    fn active_question(&self) -> &Question {
        // index < question_count holds in Presenting and Revealed
        &self.session.quiz.questions[self.session.index]
    }

    fn lock(&mut self, selected_option_id: Option<String>, remaining_secs: u32) -> Reveal {
        self.clock.stop();

        let question = &self.session.quiz.questions[self.session.index];
        let correct = question.is_correct(selected_option_id.as_deref());
        let score = score_answer(correct, self.session.tally.streak, remaining_secs);
        let reveal = Reveal {
            question_id: question.id.clone(),
            selected_option_id: selected_option_id.clone(),
            correct_option_id: question
                .correct_option()
                .map(|o| o.id.clone())
                .unwrap_or_default(),
            expired: selected_option_id.is_none(),
            score,
            explanation: question.explanation.clone(),
        };

        self.session.tally.record(&score);
        self.session
            .answers
            .entry(question.id.clone())
            .or_insert(LockedAnswer {
                question_id: question.id.clone(),
                selected_option_id,
                remaining_secs,
                score,
            });
        self.remaining = remaining_secs;
        self.low_time = false;
        self.phase = Phase::Revealed;

        tracing::debug!(
            question_id = %reveal.question_id,
            correct,
            streak = score.streak,
            reward = score.reward,
            "question revealed"
        );
        reveal
    }

    fn question_view(&self, revealed: bool) -> QuestionView {
        let question = self.active_question();
        let locked = self.session.answers.get(&question.id);
        QuestionView {
            position: self.session.index + 1,
            question_count: self.session.question_count(),
            question_id: question.id.clone(),
            prompt: question.prompt.clone(),
            options: question
                .options
                .iter()
                .map(|o| OptionView {
                    id: o.id.clone(),
                    text: o.text.clone(),
                    correct: revealed.then_some(o.correct),
                })
                .collect(),
            locked_option_id: locked.and_then(|l| l.selected_option_id.clone()),
            expired: locked.is_some_and(LockedAnswer::expired),
            explanation: if revealed {
                question.explanation.clone()
            } else {
                None
            },
            remaining_secs: self.remaining,
            low_time: self.low_time,
            streak: self.session.tally.streak,
            reward_total: self.session.tally.reward_total,
        }
    }
}
