//! Error types for the core crate.
//!
//! Collaborator failures never surface here: they are absorbed at the call
//! site and replaced by placeholders. These types only cover structural
//! preconditions, storage, and the user I/O boundary.

use thiserror::Error;

/// Errors raised by the corpus store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("corpus store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("corpus record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fatal preconditions of the preprocessing pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("the source text is empty")]
    EmptyCorpus,
    #[error("cannot distribute {total} questions across {topics} topics")]
    QuotaUnmeetable { topics: usize, total: usize },
    #[error("topic extraction produced no topics")]
    NoTopics,
    #[error("question generation produced no questions")]
    NoQuestions,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Unrecoverable failures while a session is running.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("user I/O failed: {0}")]
    Io(#[source] anyhow::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}
