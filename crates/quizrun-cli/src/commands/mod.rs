pub mod history;
pub mod init;
pub mod list;
pub mod take;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use quizrun_core::engine::QuizEngine;
use quizrun_core::recorder::AttemptRecorder;
use quizrun_store::{create_store, load_config_from, QuizCatalog, QuizrunConfig};

/// Load the config, applying a `--quiz-dir` override.
fn load_settings(config: Option<&Path>, quiz_dir: Option<PathBuf>) -> Result<QuizrunConfig> {
    let mut settings = load_config_from(config)?;
    if let Some(dir) = quiz_dir {
        settings.quiz_dir = dir;
    }
    Ok(settings)
}

/// Quizzes from the configured directory. A missing directory yields an
/// empty catalog so that history stays readable without content.
fn load_catalog(settings: &QuizrunConfig) -> Result<QuizCatalog> {
    if !settings.quiz_dir.exists() {
        tracing::warn!(
            "quiz directory {} does not exist",
            settings.quiz_dir.display()
        );
        return Ok(QuizCatalog::new());
    }
    QuizCatalog::from_path(&settings.quiz_dir)
        .with_context(|| format!("failed to load quizzes from {}", settings.quiz_dir.display()))
}

fn build_engine(settings: &QuizrunConfig, catalog: QuizCatalog) -> QuizEngine {
    let source = Arc::new(catalog);
    let store = create_store(&settings.store);
    tracing::debug!(store = store.name(), "attempt store ready");
    let recorder = AttemptRecorder::new(
        store,
        source.clone(),
        settings.recorder.to_recorder_config(),
    );
    QuizEngine::new(source, recorder)
}
