//! TOML quiz parser.
//!
//! Loads quizzes from TOML files and directories, and reports authoring
//! warnings that do not prevent a quiz from running.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Question, Quiz, QuizOption, QuizVariant, DEFAULT_QUESTION_DURATION_SECS};

/// Intermediate TOML structure for parsing quiz files.
#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    passing_score: u8,
    #[serde(default = "default_duration")]
    question_duration_secs: u32,
    #[serde(default = "default_variant_str")]
    variant: String,
}

fn default_duration() -> u32 {
    DEFAULT_QUESTION_DURATION_SECS
}

fn default_variant_str() -> String {
    "graded".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    prompt: String,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    options: Vec<TomlOption>,
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    id: String,
    text: String,
    #[serde(default)]
    correct: bool,
}

/// Parse a single TOML file into a `Quiz`.
pub fn parse_quiz(path: &Path) -> Result<Quiz> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    parse_quiz_str(&content, path)
}

/// Parse a TOML string into a `Quiz` (useful for testing).
///
/// Only the file format is checked here; call [`Quiz::validate`] before
/// running the quiz.
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<Quiz> {
    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let variant: QuizVariant = parsed
        .quiz
        .variant
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| Question {
            id: q.id,
            prompt: q.prompt,
            explanation: q.explanation,
            options: q
                .options
                .into_iter()
                .map(|o| QuizOption {
                    id: o.id,
                    text: o.text,
                    correct: o.correct,
                })
                .collect(),
        })
        .collect();

    Ok(Quiz {
        id: parsed.quiz.id,
        title: parsed.quiz.title,
        description: parsed.quiz.description,
        questions,
        passing_score: parsed.quiz.passing_score,
        question_duration_secs: parsed.quiz.question_duration_secs,
        variant,
    })
}

/// Recursively load all `.toml` quiz files from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<Quiz>> {
    let mut quizzes = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            quizzes.extend(load_quiz_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_quiz(&path) {
                Ok(quiz) => quizzes.push(quiz),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(quizzes)
}

/// A non-fatal authoring issue.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Report authoring issues that do not stop the quiz from running.
///
/// Fatal problems are reported by [`Quiz::validate`].
pub fn validate_quiz(quiz: &Quiz) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if quiz.title.trim().is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "quiz title is empty".into(),
        });
    }

    if quiz.passing_score == 0 {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "passing_score is 0, every attempt passes".into(),
        });
    }

    for question in &quiz.questions {
        if question.prompt.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "prompt is empty".into(),
            });
        }

        if question.options.iter().any(|o| o.text.trim().is_empty()) {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "an option has empty text".into(),
            });
        }

        if question.explanation.is_none() {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "no explanation to show after reveal".into(),
            });
        }
    }

    warnings
}
