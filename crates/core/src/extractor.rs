//! Topic Extraction Service
//!
//! Turns paragraph-aligned chunks into exactly `target` unique topic titles.
//! Large corpora go through hierarchical summarization (summarize every chunk,
//! collect candidates per batch of summaries, consolidate); small corpora ask
//! for topics directly from a sample of chunks. Extraction never fails: any
//! shortfall is padded with placeholder topics.

use crate::context::TrainerContext;
use crate::parsing::{TopicCandidate, clean_text, parse_topic_candidates, parse_topic_titles};
use crate::prompts::PromptKey;
use crate::topic::Topic;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{info, warn};

/// Upper bound on the candidates presented for consolidation.
pub const CONSOLIDATION_CAP: usize = 30;
/// Number of chunks sampled by the single-pass variant.
pub const DIRECT_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    /// Summaries per candidate-extraction call.
    pub batch_size: usize,
    /// Corpora with more chunks than this use the hierarchical variant.
    pub hierarchical_min_chunks: usize,
    /// Maximum in-flight summary and batch calls.
    pub concurrency: usize,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            hierarchical_min_chunks: 5,
            concurrency: 1,
        }
    }
}

pub struct TopicExtractor {
    ctx: TrainerContext,
    settings: ExtractorSettings,
}

impl TopicExtractor {
    pub fn new(ctx: TrainerContext, settings: ExtractorSettings) -> Self {
        Self { ctx, settings }
    }

    /// Extracts exactly `target` topics with unique titles and empty content.
    pub async fn extract(&self, chunks: &[String], target: usize) -> Vec<Topic> {
        if target == 0 {
            return Vec::new();
        }
        if chunks.is_empty() {
            warn!("No chunks to extract topics from, using placeholders");
            return enforce_count(Vec::new(), target);
        }
        if chunks.len() > self.settings.hierarchical_min_chunks {
            self.extract_hierarchical(chunks, target).await
        } else {
            self.extract_direct(chunks, target).await
        }
    }

    /// Summarize, collect candidates per batch, consolidate.
    pub async fn extract_hierarchical(&self, chunks: &[String], target: usize) -> Vec<Topic> {
        info!(chunks = chunks.len(), target, "Extracting topics hierarchically");

        let summaries = self.summarize(chunks).await;
        let candidates = dedupe_candidates(self.collect_candidates(&summaries).await);
        info!(candidates = candidates.len(), "Collected candidate topics");

        if candidates.is_empty() {
            warn!("No candidate topics parsed, using placeholders");
            return enforce_count(Vec::new(), target);
        }

        let listing = candidates
            .iter()
            .take(CONSOLIDATION_CAP)
            .map(|c| format!("- {}: {}", c.title, c.description))
            .collect::<Vec<_>>()
            .join("\n");
        let num_topics = target.to_string();

        match self
            .ctx
            .ask(
                PromptKey::ConsolidateTopics,
                &[("num_topics", num_topics.as_str()), ("topics", listing.as_str())],
            )
            .await
        {
            Ok(reply) => {
                let titles = parse_topic_titles(&reply, &self.ctx.vocabulary().markers);
                enforce_count(titles, target)
            }
            Err(e) => {
                warn!(error = %e, "Topic consolidation failed, using placeholders");
                enforce_count(Vec::new(), target)
            }
        }
    }

    /// Asks for topics directly from up to five evenly spaced chunks.
    pub async fn extract_direct(&self, chunks: &[String], target: usize) -> Vec<Topic> {
        info!(chunks = chunks.len(), target, "Extracting topics in a single pass");

        let excerpts = sample_evenly(chunks, DIRECT_SAMPLE_SIZE)
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| format!("Excerpt {}:\n{}", i + 1, chunk))
            .collect::<Vec<_>>()
            .join("\n\n");
        let num_topics = target.to_string();

        match self
            .ctx
            .ask(
                PromptKey::DirectTopics,
                &[("num_topics", num_topics.as_str()), ("excerpts", excerpts.as_str())],
            )
            .await
        {
            Ok(reply) => {
                let titles = parse_topic_titles(&reply, &self.ctx.vocabulary().markers);
                enforce_count(titles, target)
            }
            Err(e) => {
                warn!(error = %e, "Direct topic extraction failed, using placeholders");
                enforce_count(Vec::new(), target)
            }
        }
    }

    /// One summary per chunk, in chunk order. Failures become a section placeholder.
    async fn summarize(&self, chunks: &[String]) -> Vec<String> {
        stream::iter(chunks.iter().enumerate())
            .map(|(i, chunk)| async move {
                let fallback = format!("Content from section {}", i + 1);
                match self.ctx.ask(PromptKey::SummarizeChunk, &[("text", chunk.as_str())]).await {
                    Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
                    Ok(_) => fallback,
                    Err(e) => {
                        warn!(section = i + 1, error = %e, "Chunk summary failed");
                        fallback
                    }
                }
            })
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await
    }

    async fn collect_candidates(&self, summaries: &[String]) -> Vec<TopicCandidate> {
        let markers = &self.ctx.vocabulary().markers;
        let batches: Vec<Vec<TopicCandidate>> = stream::iter(
            summaries
                .chunks(self.settings.batch_size.max(1))
                .enumerate(),
        )
        .map(|(batch, summaries)| async move {
            let listing = summaries
                .iter()
                .enumerate()
                .map(|(i, s)| format!("Summary {}: {}", i + 1, s))
                .collect::<Vec<_>>()
                .join("\n\n");
            match self
                .ctx
                .ask(PromptKey::ExtractTopics, &[("summaries", listing.as_str())])
                .await
            {
                Ok(reply) => parse_topic_candidates(&reply, markers),
                Err(e) => {
                    warn!(batch = batch + 1, error = %e, "Candidate extraction failed");
                    Vec::new()
                }
            }
        })
        .buffered(self.settings.concurrency.max(1))
        .collect()
        .await;

        batches.into_iter().flatten().collect()
    }
}

/// Keeps the first candidate for each title, ignoring case.
fn dedupe_candidates(candidates: Vec<TopicCandidate>) -> Vec<TopicCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.title.to_lowercase()))
        .collect()
}

/// Picks up to `n` chunks spread across the whole corpus, in order.
fn sample_evenly(chunks: &[String], n: usize) -> Vec<&String> {
    if chunks.len() <= n {
        return chunks.iter().collect();
    }
    (0..n).map(|i| &chunks[i * chunks.len() / n]).collect()
}

/// Truncates or pads `titles` to exactly `target` topics with unique titles.
///
/// Duplicates (ignoring case) are dropped; placeholders `Topic k` skip any
/// title already in use.
pub fn enforce_count(titles: Vec<String>, target: usize) -> Vec<Topic> {
    let mut seen = HashSet::new();
    let mut topics = Vec::with_capacity(target);

    for title in titles {
        let title = clean_text(&title);
        if title.is_empty() || !seen.insert(title.to_lowercase()) {
            continue;
        }
        topics.push(Topic::new(title));
        if topics.len() == target {
            return topics;
        }
    }

    let mut k = topics.len() + 1;
    while topics.len() < target {
        let placeholder = Topic::placeholder(k);
        if seen.insert(placeholder.title.to_lowercase()) {
            topics.push(placeholder);
        }
        k += 1;
    }
    topics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::llm_client::MockLLMClient;
    use anyhow::anyhow;
    use std::sync::Arc;

    fn extractor(mock: MockLLMClient) -> TopicExtractor {
        let ctx = TrainerContext::with_builtin_prompts(Arc::new(mock), Language::English);
        TopicExtractor::new(ctx, ExtractorSettings::default())
    }

    fn chunks(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Paragraph number {}.", i)).collect()
    }

    fn assert_unique(topics: &[Topic]) {
        let titles: HashSet<_> = topics.iter().map(|t| t.title.to_lowercase()).collect();
        assert_eq!(titles.len(), topics.len());
    }

    #[test]
    fn test_enforce_count_truncates_and_pads() {
        let titles = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let truncated = enforce_count(titles.clone(), 2);
        assert_eq!(truncated.len(), 2);
        assert_eq!(truncated[1].title, "B");

        let padded = enforce_count(titles, 5);
        let names: Vec<_> = padded.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(names, ["A", "B", "C", "Topic 4", "Topic 5"]);
    }

    #[test]
    fn test_enforce_count_keeps_titles_unique() {
        let titles = vec![
            "Memory".to_string(),
            "memory".to_string(),
            "**Topic 2**".to_string(),
        ];
        let topics = enforce_count(titles, 4);
        let names: Vec<_> = topics.iter().map(|t| t.title.as_str()).collect();
        // "Topic 2" is taken by the service, so padding moves on to 3 and 4.
        assert_eq!(names, ["Memory", "Topic 2", "Topic 3", "Topic 4"]);
        assert_unique(&topics);
    }

    #[test]
    fn test_enforce_count_keeps_underscored_titles() {
        let titles = vec!["__init__ methods".to_string(), "__Traits__".to_string()];
        let topics = enforce_count(titles, 2);
        let names: Vec<_> = topics.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(names, ["__init__ methods", "Traits"]);
    }

    #[test]
    fn test_sample_evenly_spreads_across_corpus() {
        let all = chunks(10);
        let picked = sample_evenly(&all, 5);
        assert_eq!(picked.len(), 5);
        assert_eq!(picked[0], &all[0]);
        assert_eq!(picked[4], &all[8]);
        assert_eq!(sample_evenly(&all[..3], 5).len(), 3);
    }

    #[tokio::test]
    async fn test_hierarchical_extraction_returns_exact_count() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete().returning(|_, user| {
            if user.starts_with("Summarize") {
                Ok("A short summary.".to_string())
            } else if user.contains("TEXT SUMMARIES:") {
                Ok("1. Topic: Ownership\nDescription: Who frees memory.\n\
                    2. Borrowing: Temporary access to data.\n\
                    3. ownership: duplicate with other case."
                    .to_string())
            } else if user.contains("POTENTIAL TOPICS:") {
                assert!(user.contains("- Ownership: Who frees memory."));
                assert!(!user.contains("duplicate with other case"));
                Ok("1. Ownership\n2. **Borrowing**: temporary access\n3. Ownership".to_string())
            } else {
                Err(anyhow!("unexpected prompt"))
            }
        });

        let topics = extractor(mock).extract(&chunks(12), 4).await;
        let names: Vec<_> = topics.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(names, ["Ownership", "Borrowing", "Topic 3", "Topic 4"]);
        assert!(topics.iter().all(|t| t.content.is_empty()));
    }

    #[tokio::test]
    async fn test_failed_summaries_use_section_placeholders() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete().returning(|_, user| {
            if user.starts_with("Summarize") {
                Err(anyhow!("timeout"))
            } else if user.contains("TEXT SUMMARIES:") {
                assert!(user.contains("Summary 1: Content from section 1"));
                assert!(user.contains("Summary 6: Content from section 6"));
                Ok("1. Sections: Placeholder sections.".to_string())
            } else {
                Ok("1. Sections".to_string())
            }
        });

        let topics = extractor(mock).extract(&chunks(6), 1).await;
        assert_eq!(topics[0].title, "Sections");
    }

    #[tokio::test]
    async fn test_consolidation_failure_yields_placeholders() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete().returning(|_, user| {
            if user.contains("POTENTIAL TOPICS:") {
                Err(anyhow!("service unavailable"))
            } else if user.contains("TEXT SUMMARIES:") {
                Ok("1. Alpha: First.".to_string())
            } else {
                Ok("Summary.".to_string())
            }
        });

        let topics = extractor(mock).extract(&chunks(8), 3).await;
        let names: Vec<_> = topics.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(names, ["Topic 1", "Topic 2", "Topic 3"]);
    }

    #[tokio::test]
    async fn test_small_corpus_uses_single_pass() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete()
            .times(1)
            .returning(|_, user| {
                assert!(user.contains("Excerpt 1:\nParagraph number 1."));
                Ok("Here are the topics:\n1. Traits: shared behaviour\n2. Lifetimes: scope of references"
                    .to_string())
            });

        let topics = extractor(mock).extract(&chunks(3), 2).await;
        let names: Vec<_> = topics.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(names, ["Traits", "Lifetimes"]);
    }

    #[tokio::test]
    async fn test_single_pass_failure_yields_placeholders() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete()
            .returning(|_, _| Err(anyhow!("network down")));

        let topics = extractor(mock).extract(&chunks(2), 3).await;
        assert_eq!(topics.len(), 3);
        assert_unique(&topics);
    }

    #[tokio::test]
    async fn test_no_chunks_makes_no_calls() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete().never();

        let topics = extractor(mock).extract(&[], 2).await;
        assert_eq!(topics.len(), 2);
    }
}
