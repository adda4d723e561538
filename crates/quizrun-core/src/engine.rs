//! Engine facade used by presentation layers.
//!
//! A [`QuizEngine`] opens runs against quiz content and records them once
//! they complete. A [`QuizRun`] is the only handle a caller needs while a
//! quiz is in progress.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::{AttemptSummary, CelebrationPolicy};
use crate::clock::Clock;
use crate::error::EngineError;
use crate::model::{AnswerRecord, FinishedAttempt, Quiz};
use crate::recorder::{AttemptRecorder, SubmissionKey};
use crate::sequencer::{Phase, SelectOutcome, Sequencer, TickOutcome};
use crate::session::SessionView;
use crate::statistics::AttemptHistory;
use crate::traits::QuizSource;

/// What a successful submission hands back to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub attempt: FinishedAttempt,
    /// Run figures, with score and pass taken from the recorded attempt.
    pub summary: AttemptSummary,
    pub celebrate: bool,
}

/// One run of one quiz by one subject.
pub struct QuizRun<C: Clock> {
    sequencer: Sequencer<C>,
    key: Option<SubmissionKey>,
    submitted: Option<Uuid>,
}

impl<C: Clock> QuizRun<C> {
    pub fn quiz(&self) -> &Quiz {
        self.sequencer.quiz()
    }

    pub fn subject_id(&self) -> &str {
        &self.sequencer.session().subject_id
    }

    pub fn phase(&self) -> Phase {
        self.sequencer.phase()
    }

    pub fn sequencer(&self) -> &Sequencer<C> {
        &self.sequencer
    }

    /// Id of the recorded attempt, once submitted.
    pub fn submitted(&self) -> Option<Uuid> {
        self.submitted
    }

    pub fn select_option(
        &mut self,
        question_id: &str,
        option_id: &str,
    ) -> Result<SelectOutcome, EngineError> {
        self.sequencer.select_option(question_id, option_id)
    }

    pub fn advance(&mut self) -> Result<Phase, EngineError> {
        self.sequencer.advance()
    }

    /// See [`Sequencer::tick`]. Cancel-safe.
    pub async fn tick(&mut self) -> Option<TickOutcome> {
        self.sequencer.tick().await
    }

    pub fn view(&self) -> SessionView {
        self.sequencer.view()
    }

    pub fn answer_records(&self) -> Vec<AnswerRecord> {
        self.sequencer.answer_records()
    }

    pub fn summary(&self) -> Option<AttemptSummary> {
        self.sequencer.summary()
    }

    /// Discard the run without recording anything.
    pub fn abandon(self) {
        self.sequencer.abandon();
    }
}

/// Opens quiz runs and records finished ones.
pub struct QuizEngine {
    source: Arc<dyn QuizSource>,
    recorder: AttemptRecorder,
}

impl QuizEngine {
    /// The recorder is expected to read the same content as `source`.
    pub fn new(source: Arc<dyn QuizSource>, recorder: AttemptRecorder) -> Self {
        Self { source, recorder }
    }

    pub fn recorder(&self) -> &AttemptRecorder {
        &self.recorder
    }

    /// Load, validate and start a quiz. Fails before any session exists if
    /// the quiz is missing or cannot be run.
    pub async fn open_quiz<C: Clock>(
        &self,
        quiz_id: &str,
        subject_id: &str,
        clock: C,
    ) -> Result<QuizRun<C>, EngineError> {
        let quiz = self
            .source
            .load_quiz(quiz_id)
            .await
            .map_err(|e| EngineError::ContentUnavailable(format!("{e:#}")))?
            .ok_or_else(|| EngineError::QuizNotFound(quiz_id.to_string()))?;

        let sequencer = Sequencer::start(Arc::new(quiz), subject_id, clock)?;
        tracing::info!(quiz_id, subject_id, "quiz opened");
        Ok(QuizRun {
            sequencer,
            key: None,
            submitted: None,
        })
    }

    /// Record a completed run.
    ///
    /// A failed submission leaves the run untouched so it can be submitted
    /// again. Every try reuses the key taken on the first one, so a run is
    /// recorded at most once even when a failed try actually committed.
    pub async fn submit<C: Clock>(
        &self,
        run: &mut QuizRun<C>,
    ) -> Result<SubmitOutcome, EngineError> {
        if let Some(id) = run.submitted {
            return Err(EngineError::AlreadySubmitted(id));
        }
        let Some(mut summary) = run.summary() else {
            return Err(EngineError::SessionInProgress);
        };

        let key = *run.key.get_or_insert_with(SubmissionKey::new);
        let attempt = self
            .recorder
            .submit_with_key(&run.quiz().id, run.subject_id(), &run.answer_records(), key)
            .await?;
        run.submitted = Some(attempt.id);

        let policy = CelebrationPolicy::for_variant(run.quiz().variant);
        let celebrate =
            policy.celebrate(attempt.passed, attempt.correct_count, attempt.question_count);
        summary.correct_count = attempt.correct_count;
        summary.question_count = attempt.question_count;
        summary.score_percent = attempt.score_percent;
        summary.passed = attempt.passed;
        summary.celebrate = celebrate;

        Ok(SubmitOutcome {
            attempt,
            summary,
            celebrate,
        })
    }

    pub async fn history(
        &self,
        quiz_id: &str,
        subject_id: &str,
    ) -> Result<AttemptHistory, EngineError> {
        self.recorder.history(quiz_id, subject_id).await
    }
}
