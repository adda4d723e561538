//! Attempt store persisted as a single JSON document.
//!
//! Each commit reads the document, appends the staged attempts and rewrites
//! the file through a temp file and a rename, so a crash mid-write leaves the
//! previous document intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use quizrun_core::error::StoreError;
use quizrun_core::model::{AnswerRecord, FinishedAttempt};
use quizrun_core::traits::{AttemptStore, AttemptWriter};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    /// Insertion order, answers attached.
    attempts: Vec<FinishedAttempt>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            attempts: Vec::new(),
        }
    }
}

/// Attempt store backed by one JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// The file is created on first commit.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<StoreDocument, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreDocument::default()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(StoreDocument::default());
        }

        let doc: StoreDocument = serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))?;
        if doc.version != FORMAT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "{}: unsupported format version {}",
                self.path.display(),
                doc.version
            )));
        }
        Ok(doc)
    }

    async fn write_document(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| StoreError::Rejected(format!("failed to encode attempts: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attempts.json".into());
        let tmp = self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl AttemptStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn begin(&self) -> Result<Box<dyn AttemptWriter + '_>, StoreError> {
        Ok(Box::new(JsonFileWriter {
            store: self,
            staged: Vec::new(),
        }))
    }

    async fn query_attempts_by(
        &self,
        quiz_id: &str,
        subject_id: &str,
    ) -> Result<Vec<FinishedAttempt>, StoreError> {
        let doc = self.read_document().await?;
        Ok(doc
            .attempts
            .into_iter()
            .filter(|a| a.quiz_id == quiz_id && a.subject_id == subject_id)
            .collect())
    }
}

/// Staged attempts for one [`JsonFileStore`] transaction.
pub struct JsonFileWriter<'a> {
    store: &'a JsonFileStore,
    staged: Vec<FinishedAttempt>,
}

#[async_trait]
impl AttemptWriter for JsonFileWriter<'_> {
    async fn insert_attempt(&mut self, attempt: &FinishedAttempt) -> Result<(), StoreError> {
        if self.staged.iter().any(|a| a.id == attempt.id) {
            return Err(StoreError::Conflict(format!(
                "attempt {} staged twice",
                attempt.id
            )));
        }
        let mut row = attempt.clone();
        row.answers.clear();
        self.staged.push(row);
        Ok(())
    }

    async fn insert_answer_records(
        &mut self,
        attempt_id: Uuid,
        records: &[AnswerRecord],
    ) -> Result<(), StoreError> {
        let Some(row) = self.staged.iter_mut().find(|a| a.id == attempt_id) else {
            return Err(StoreError::Rejected(format!(
                "answer records for attempt {attempt_id}, which is not part of this transaction"
            )));
        };
        row.answers.extend_from_slice(records);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let JsonFileWriter { store, staged } = *self;
        if staged.is_empty() {
            return Ok(());
        }

        let _guard = store.write_lock.lock().await;
        let mut doc = store.read_document().await?;
        if let Some(dup) = staged
            .iter()
            .find(|s| doc.attempts.iter().any(|a| a.id == s.id))
        {
            return Err(StoreError::Conflict(format!(
                "attempt {} already exists",
                dup.id
            )));
        }

        let count = staged.len();
        doc.attempts.extend(staged);
        store.write_document(&doc).await?;
        tracing::debug!(path = %store.path.display(), count, "attempts committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn attempt(quiz: &str, score: u8) -> FinishedAttempt {
        FinishedAttempt {
            id: Uuid::new_v4(),
            quiz_id: quiz.into(),
            subject_id: "s".into(),
            submitted_at: Utc::now(),
            score_percent: score,
            passed: score >= 70,
            correct_count: 1,
            question_count: 1,
            answers: vec![AnswerRecord {
                question_id: "q1".into(),
                selected_option_id: Some("a".into()),
                correct: true,
            }],
        }
    }

    async fn write(store: &JsonFileStore, attempt: &FinishedAttempt) -> Result<(), StoreError> {
        let mut tx = store.begin().await?;
        tx.insert_attempt(attempt).await?;
        tx.insert_answer_records(attempt.id, &attempt.answers)
            .await?;
        tx.commit().await
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("attempts.json"));
        assert!(store.query_attempts_by("quiz", "s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commits_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("attempts.json");

        let first = attempt("quiz", 100);
        let second = attempt("quiz", 0);
        {
            let store = JsonFileStore::new(&path);
            write(&store, &first).await.unwrap();
            write(&store, &second).await.unwrap();
            write(&store, &attempt("other", 50)).await.unwrap();
        }

        let store = JsonFileStore::new(&path);
        let found = store.query_attempts_by("quiz", "s").await.unwrap();
        assert_eq!(found, vec![first, second]);

        // no temp files left behind
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn uncommitted_writer_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attempts.json");
        let store = JsonFileStore::new(&path);
        let a = attempt("quiz", 100);
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_attempt(&a).await.unwrap();
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn duplicate_id_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("attempts.json"));
        let a = attempt("quiz", 100);
        write(&store, &a).await.unwrap();
        let err = write(&store, &a).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.query_attempts_by("quiz", "s").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_permanent_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attempts.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);

        let err = store.query_attempts_by("quiz", "s").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(!err.is_retryable());

        let err = write(&store, &attempt("quiz", 100)).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
