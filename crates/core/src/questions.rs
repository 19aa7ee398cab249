//! Question generation and per-topic quotas.

use crate::context::TrainerContext;
use crate::error::PipelineError;
use crate::parsing::parse_question_blocks;
use crate::prompts::PromptKey;
use crate::topic::{Question, Topic};
use tracing::{info, warn};

/// Splits `total` questions across `topic_count` topics.
///
/// Every topic gets `total / topic_count`; the remainder goes one per topic
/// to the earliest topics. Fewer questions than topics cannot be honored.
pub fn question_quotas(topic_count: usize, total: usize) -> Result<Vec<usize>, PipelineError> {
    if topic_count == 0 || total < topic_count {
        return Err(PipelineError::QuotaUnmeetable {
            topics: topic_count,
            total,
        });
    }
    let per_topic = (total / topic_count).max(1);
    let remainder = total - per_topic * topic_count;
    Ok((0..topic_count)
        .map(|i| per_topic + usize::from(i < remainder))
        .collect())
}

pub struct QuestionGenerator {
    ctx: TrainerContext,
}

impl QuestionGenerator {
    pub fn new(ctx: TrainerContext) -> Self {
        Self { ctx }
    }

    /// Generates up to `count` questions for one topic.
    ///
    /// A failed call or an unparseable reply yields fewer (possibly zero)
    /// questions, never an error.
    pub async fn generate_for_topic(&self, topic: &Topic, count: usize) -> Vec<Question> {
        if count == 0 {
            return Vec::new();
        }
        let count_str = count.to_string();
        let reply = match self
            .ctx
            .ask(
                PromptKey::GenerateQuestions,
                &[
                    ("topic", topic.title.as_str()),
                    ("count", count_str.as_str()),
                    ("content", topic.content.as_str()),
                ],
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(topic = %topic.title, error = %e, "Question generation failed");
                return Vec::new();
            }
        };

        let questions: Vec<Question> = parse_question_blocks(&reply, &self.ctx.vocabulary().markers)
            .into_iter()
            .take(count)
            .map(|q| Question::new(topic.title.clone(), q.question, q.answer_guide))
            .collect();

        if questions.len() < count {
            warn!(
                topic = %topic.title,
                requested = count,
                parsed = questions.len(),
                "Fewer questions than requested"
            );
        }
        questions
    }

    /// Generates `total` questions spread across `topics` by quota.
    ///
    /// Each question carries the index of its topic in `topic_id`.
    pub async fn generate(
        &self,
        topics: &[Topic],
        total: usize,
    ) -> Result<Vec<Question>, PipelineError> {
        let quotas = question_quotas(topics.len(), total)?;
        let mut all = Vec::with_capacity(total);

        for (i, (topic, quota)) in topics.iter().zip(quotas).enumerate() {
            info!(topic = %topic.title, quota, "Generating questions");
            let questions = self.generate_for_topic(topic, quota).await;
            all.extend(questions.into_iter().map(|mut q| {
                q.topic_id = Some(i);
                q
            }));
        }

        info!(questions = all.len(), requested = total, "Question generation finished");
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::llm_client::MockLLMClient;
    use anyhow::anyhow;
    use std::sync::Arc;

    fn generator(mock: MockLLMClient) -> QuestionGenerator {
        QuestionGenerator::new(TrainerContext::with_builtin_prompts(
            Arc::new(mock),
            Language::English,
        ))
    }

    #[test]
    fn test_quotas_sum_to_total_and_favour_earliest_topics() {
        assert_eq!(question_quotas(2, 4).unwrap(), vec![2, 2]);
        assert_eq!(question_quotas(3, 10).unwrap(), vec![4, 3, 3]);
        assert_eq!(question_quotas(4, 4).unwrap(), vec![1, 1, 1, 1]);

        for topics in 1..8 {
            for total in topics..40 {
                let quotas = question_quotas(topics, total).unwrap();
                assert_eq!(quotas.iter().sum::<usize>(), total);
                let max = quotas.iter().max().unwrap();
                let min = quotas.iter().min().unwrap();
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn test_quotas_reject_unmeetable_totals() {
        assert!(matches!(
            question_quotas(5, 3),
            Err(PipelineError::QuotaUnmeetable { topics: 5, total: 3 })
        ));
        assert!(question_quotas(0, 3).is_err());
    }

    #[tokio::test]
    async fn test_generate_for_topic_parses_and_caps_blocks() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete().returning(|_, user| {
            assert!(user.contains("create 2 thought-provoking questions"));
            assert!(user.contains("Ownership moves values."));
            Ok("1. Question: What does a move do?\nGuide: Transfers ownership.\n\n\
                This block has no question mark.\n\n\
                2. Why can a value have only one owner?\nGood answer: To free it exactly once.\n\n\
                3. What is a borrow?\nGuide: A reference."
                .to_string())
        });

        let topic = Topic::with_content("Ownership", "Ownership moves values.");
        let questions = generator(mock).generate_for_topic(&topic, 2).await;

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "What does a move do?");
        assert_eq!(questions[0].answer_guide, "Transfers ownership.");
        assert_eq!(questions[1].question, "Why can a value have only one owner?");
        assert_eq!(questions[1].answer_guide, "To free it exactly once.");
        assert!(questions.iter().all(|q| q.topic_title == "Ownership"));
        assert!(questions.iter().all(|q| q.topic_id.is_none()));
    }

    #[tokio::test]
    async fn test_generate_distributes_quotas_and_tags_topics() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete().returning(|_, user| {
            if user.contains("'B'") {
                Err(anyhow!("service unavailable"))
            } else {
                Ok("Q1?\n\nQ2?\n\nQ3?".to_string())
            }
        });

        let topics = vec![Topic::new("A"), Topic::new("B"), Topic::new("C")];
        let questions = generator(mock).generate(&topics, 5).await.unwrap();

        // A gets 2, B fails, C gets 1.
        let tagged: Vec<_> = questions
            .iter()
            .map(|q| (q.topic_title.as_str(), q.topic_id))
            .collect();
        assert_eq!(
            tagged,
            [("A", Some(0)), ("A", Some(0)), ("C", Some(2))]
        );
    }

    #[tokio::test]
    async fn test_generate_checks_quota_before_calling() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete().never();

        let topics = vec![Topic::new("A"), Topic::new("B")];
        let result = generator(mock).generate(&topics, 1).await;
        assert!(matches!(result, Err(PipelineError::QuotaUnmeetable { .. })));
    }
}
