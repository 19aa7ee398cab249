//! Preprocessing Pipeline
//!
//! Wires the chunker, topic extractor, content generator and question
//! generator together and gates the whole run behind the store's completion
//! marker, so a corpus is processed at most once unless forced.

use crate::chunker;
use crate::content::ContentGenerator;
use crate::context::TrainerContext;
use crate::error::PipelineError;
use crate::extractor::{ExtractorSettings, TopicExtractor};
use crate::questions::{QuestionGenerator, question_quotas};
use crate::store::CorpusStore;
use crate::topic::PreprocessedCorpus;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Character budget per chunk.
    pub chunk_size: usize,
    pub topic_count: usize,
    pub total_questions: usize,
    pub summary_batch_size: usize,
    pub hierarchical_min_chunks: usize,
    /// Maximum in-flight per-chunk calls.
    pub concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: chunker::DEFAULT_CHUNK_SIZE,
            topic_count: 10,
            total_questions: 10,
            summary_batch_size: 10,
            hierarchical_min_chunks: 5,
            concurrency: 1,
        }
    }
}

/// What a preprocessing run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessOutcome {
    /// The marker was present; stored records were loaded unchanged.
    Loaded(PreprocessedCorpus),
    /// The pipeline ran and its output was saved.
    Processed(PreprocessedCorpus),
}

impl PreprocessOutcome {
    pub fn corpus(&self) -> &PreprocessedCorpus {
        match self {
            PreprocessOutcome::Loaded(corpus) | PreprocessOutcome::Processed(corpus) => corpus,
        }
    }

    pub fn into_corpus(self) -> PreprocessedCorpus {
        match self {
            PreprocessOutcome::Loaded(corpus) | PreprocessOutcome::Processed(corpus) => corpus,
        }
    }
}

pub struct Preprocessor {
    ctx: TrainerContext,
    store: Arc<dyn CorpusStore>,
    settings: PipelineSettings,
}

impl Preprocessor {
    pub fn new(ctx: TrainerContext, store: Arc<dyn CorpusStore>, settings: PipelineSettings) -> Self {
        Self {
            ctx,
            store,
            settings,
        }
    }

    /// True if a completed run is already stored.
    pub async fn is_done(&self) -> Result<bool, PipelineError> {
        Ok(self.store.is_done().await?)
    }

    /// Processes `text` unless the store already holds a completed run.
    ///
    /// With `force` the marker is cleared first and everything is regenerated.
    /// The marker is only written after topics and questions were saved.
    pub async fn run(&self, text: &str, force: bool) -> Result<PreprocessOutcome, PipelineError> {
        if force {
            info!("Forced preprocessing, clearing completion marker");
            self.store.clear_done().await?;
        } else if self.store.is_done().await? {
            info!("Preprocessing already completed, loading stored corpus");
            return Ok(PreprocessOutcome::Loaded(self.store.load().await?));
        }

        let settings = &self.settings;
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }
        // Fail before spending any calls on a run that cannot finish.
        question_quotas(settings.topic_count, settings.total_questions)?;

        let chunks = chunker::split(text, settings.chunk_size);
        if chunks.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }
        info!(chunks = chunks.len(), chars = text.chars().count(), "Split corpus into chunks");

        let extractor = TopicExtractor::new(
            self.ctx.clone(),
            ExtractorSettings {
                batch_size: settings.summary_batch_size,
                hierarchical_min_chunks: settings.hierarchical_min_chunks,
                concurrency: settings.concurrency,
            },
        );
        let mut topics = extractor.extract(&chunks, settings.topic_count).await;
        if topics.is_empty() {
            return Err(PipelineError::NoTopics);
        }
        info!(topics = topics.len(), "Extracted topics");

        ContentGenerator::new(self.ctx.clone(), settings.concurrency)
            .fill_topics(&mut topics, &chunks)
            .await;

        let questions = QuestionGenerator::new(self.ctx.clone())
            .generate(&topics, settings.total_questions)
            .await?;
        if questions.is_empty() {
            warn!("No questions generated, nothing saved");
            return Err(PipelineError::NoQuestions);
        }

        self.store.save(&topics, &questions).await?;
        self.store.mark_done().await?;
        info!(
            topics = topics.len(),
            questions = questions.len(),
            "Preprocessing completed"
        );

        Ok(PreprocessOutcome::Processed(PreprocessedCorpus { topics, questions }))
    }
}
