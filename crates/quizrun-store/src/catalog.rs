//! In-memory quiz content provider.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use quizrun_core::model::Quiz;
use quizrun_core::parser::load_quiz_directory;
use quizrun_core::traits::{QuizListing, QuizSource};

/// Quizzes keyed by id.
#[derive(Debug, Clone, Default)]
pub struct QuizCatalog {
    quizzes: BTreeMap<String, Quiz>,
}

impl QuizCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from quiz values. A later quiz with an id already in
    /// the catalog is skipped.
    pub fn from_quizzes(quizzes: impl IntoIterator<Item = Quiz>) -> Self {
        let mut catalog = Self::new();
        for quiz in quizzes {
            catalog.insert(quiz);
        }
        catalog
    }

    /// Load every quiz file under `dir`, or a single quiz file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let quizzes = if path.is_file() {
            vec![quizrun_core::parser::parse_quiz(path)?]
        } else {
            load_quiz_directory(path)?
        };
        let catalog = Self::from_quizzes(quizzes);
        tracing::debug!(path = %path.display(), quizzes = catalog.len(), "quiz catalog loaded");
        Ok(catalog)
    }

    /// Returns `false` if a quiz with the same id was already present.
    pub fn insert(&mut self, quiz: Quiz) -> bool {
        if self.quizzes.contains_key(&quiz.id) {
            tracing::warn!(quiz_id = %quiz.id, "duplicate quiz id, keeping the first definition");
            return false;
        }
        self.quizzes.insert(quiz.id.clone(), quiz);
        true
    }

    pub fn get(&self, quiz_id: &str) -> Option<&Quiz> {
        self.quizzes.get(quiz_id)
    }

    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Quiz> {
        self.quizzes.values()
    }
}

#[async_trait]
impl QuizSource for QuizCatalog {
    async fn load_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>> {
        Ok(self.quizzes.get(quiz_id).cloned())
    }

    async fn list_quizzes(&self) -> Result<Vec<QuizListing>> {
        Ok(self
            .quizzes
            .values()
            .map(|q| QuizListing {
                id: q.id.clone(),
                title: q.title.clone(),
                question_count: q.question_count(),
            })
            .collect())
    }
}
