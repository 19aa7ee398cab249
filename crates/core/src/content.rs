//! Topic content generation.
//!
//! For each topic the relevant chunks are selected with one yes/no query per
//! chunk, then a single synthesis call turns at most three of them into a
//! long-form explanation.

use crate::context::TrainerContext;
use crate::language::TextKey;
use crate::parsing::is_relevant;
use crate::prompts::PromptKey;
use crate::topic::Topic;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// Relevance scanning stops once this many relevant chunks are found.
pub const MAX_RELEVANT_CHUNKS: usize = 5;
/// Chunks passed to the synthesis call.
pub const MAX_SOURCE_CHUNKS: usize = 3;

pub struct ContentGenerator {
    ctx: TrainerContext,
    concurrency: usize,
}

impl ContentGenerator {
    pub fn new(ctx: TrainerContext, concurrency: usize) -> Self {
        Self {
            ctx,
            concurrency: concurrency.max(1),
        }
    }

    /// Generates the explanatory passage for one topic.
    ///
    /// Never fails: without chunks a "no detailed information" marker is
    /// returned, and a failed synthesis call yields a failure marker naming
    /// the topic.
    pub async fn generate_content(&self, title: &str, chunks: &[String]) -> String {
        let vocabulary = self.ctx.vocabulary();
        if chunks.is_empty() {
            return vocabulary.render(TextKey::ContentMissing, &[("title", title)]);
        }

        let mut sources = self.relevant_chunks(title, chunks).await;
        if sources.is_empty() {
            debug!(topic = %title, "No relevant chunks, using the first ones");
            sources = chunks.iter().take(MAX_SOURCE_CHUNKS).collect();
        }
        let excerpts = sources
            .iter()
            .take(MAX_SOURCE_CHUNKS)
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        match self
            .ctx
            .ask(
                PromptKey::TopicContent,
                &[("topic", title), ("excerpts", excerpts.as_str())],
            )
            .await
        {
            Ok(content) if !content.trim().is_empty() => content.trim().to_string(),
            Ok(_) => {
                warn!(topic = %title, "Content generation returned nothing");
                vocabulary.render(TextKey::ContentFailed, &[("title", title)])
            }
            Err(e) => {
                warn!(topic = %title, error = %e, "Content generation failed");
                vocabulary.render(TextKey::ContentFailed, &[("title", title)])
            }
        }
    }

    /// Fills in `content` for every topic, in order.
    pub async fn fill_topics(&self, topics: &mut [Topic], chunks: &[String]) {
        for (i, topic) in topics.iter_mut().enumerate() {
            info!(topic = %topic.title, index = i + 1, "Generating topic content");
            topic.content = self.generate_content(&topic.title, chunks).await;
        }
    }

    /// Chunks judged relevant, in chunk order, at most `MAX_RELEVANT_CHUNKS`.
    async fn relevant_chunks<'c>(&self, title: &str, chunks: &'c [String]) -> Vec<&'c String> {
        let markers = &self.ctx.vocabulary().markers;
        let mut verdicts = stream::iter(chunks.iter().enumerate())
            .map(|(i, chunk)| async move {
                let relevant = match self
                    .ctx
                    .ask(PromptKey::Relevance, &[("topic", title), ("text", chunk.as_str())])
                    .await
                {
                    Ok(answer) => is_relevant(&answer, markers),
                    Err(e) => {
                        warn!(topic = %title, chunk = i + 1, error = %e, "Relevance check failed");
                        false
                    }
                };
                (chunk, relevant)
            })
            .buffered(self.concurrency);

        let mut relevant = Vec::new();
        while let Some((chunk, is_match)) = verdicts.next().await {
            if is_match {
                relevant.push(chunk);
                if relevant.len() >= MAX_RELEVANT_CHUNKS {
                    break;
                }
            }
        }
        relevant
    }
}
