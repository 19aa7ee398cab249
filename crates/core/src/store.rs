//! Persistence gate for preprocessed corpora.
//!
//! The completion marker is the only source of truth for "already
//! preprocessed": its existence, not its content, gates the pipeline.

use crate::error::StoreError;
use crate::topic::{PreprocessedCorpus, Question, Topic};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const MARKER_FILE: &str = "preprocessed.lock";
const QUESTIONS_FILE: &str = "questions.json";
const TOPIC_PREFIX: &str = "topic_";

/// Storage for topics, questions, and the completion marker.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// True once a full preprocessing run has been saved.
    async fn is_done(&self) -> Result<bool, StoreError>;

    /// Writes the completion marker. Only called after a successful `save`.
    async fn mark_done(&self) -> Result<(), StoreError>;

    /// Removes the completion marker ahead of a forced re-run.
    async fn clear_done(&self) -> Result<(), StoreError>;

    /// Persists every topic as its own record and all questions as one collection.
    async fn save(&self, topics: &[Topic], questions: &[Question]) -> Result<(), StoreError>;

    /// Loads the stored topics, ordered by record index.
    async fn load_topics(&self) -> Result<Vec<Topic>, StoreError>;

    /// Loads topics and questions together.
    async fn load(&self) -> Result<PreprocessedCorpus, StoreError>;
}

/// A `CorpusStore` backed by JSON files in one directory.
///
/// Layout: `topic_<n>.json` per topic (1-based), `questions.json`, and the
/// `preprocessed.lock` marker.
#[derive(Debug, Clone)]
pub struct FileCorpusStore {
    dir: PathBuf,
}

impl FileCorpusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn marker_path(&self) -> PathBuf {
        self.dir.join(MARKER_FILE)
    }

    fn questions_path(&self) -> PathBuf {
        self.dir.join(QUESTIONS_FILE)
    }

    fn topic_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}{}.json", TOPIC_PREFIX, index))
    }

    /// Stored topic records as `(index, path)`, sorted by index.
    async fn topic_records(&self) -> Result<Vec<(usize, PathBuf)>, StoreError> {
        let mut records = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(index) = name.to_str().and_then(topic_index) else {
                continue;
            };
            records.push((index, entry.path()));
        }
        records.sort_by_key(|(index, _)| *index);
        Ok(records)
    }
}

/// Parses `topic_<n>.json` into `n`.
fn topic_index(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(TOPIC_PREFIX)?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

#[async_trait]
impl CorpusStore for FileCorpusStore {
    async fn is_done(&self) -> Result<bool, StoreError> {
        Ok(fs::try_exists(self.marker_path()).await?)
    }

    async fn mark_done(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        fs::write(self.marker_path(), "Preprocessing completed").await?;
        info!(path = %self.marker_path().display(), "Created completion marker");
        Ok(())
    }

    async fn clear_done(&self) -> Result<(), StoreError> {
        match fs::remove_file(self.marker_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, topics: &[Topic], questions: &[Question]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;

        for (_, stale) in self.topic_records().await? {
            debug!(path = %stale.display(), "Removing stale topic record");
            fs::remove_file(stale).await?;
        }

        for (i, topic) in topics.iter().enumerate() {
            let json = serde_json::to_string_pretty(topic)?;
            fs::write(self.topic_path(i + 1), json).await?;
        }

        let json = serde_json::to_string_pretty(questions)?;
        fs::write(self.questions_path(), json).await?;

        info!(
            topics = topics.len(),
            questions = questions.len(),
            dir = %self.dir.display(),
            "Saved preprocessed corpus"
        );
        Ok(())
    }

    async fn load_topics(&self) -> Result<Vec<Topic>, StoreError> {
        let mut topics = Vec::new();
        for (index, path) in self.topic_records().await? {
            let raw = fs::read_to_string(&path).await?;
            match serde_json::from_str::<Topic>(&raw) {
                Ok(topic) => topics.push(topic),
                Err(e) => warn!(index, error = %e, "Skipping unreadable topic record"),
            }
        }
        Ok(topics)
    }

    async fn load(&self) -> Result<PreprocessedCorpus, StoreError> {
        let topics = self.load_topics().await?;
        let questions = match fs::read_to_string(self.questions_path()).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(PreprocessedCorpus { topics, questions })
    }
}
