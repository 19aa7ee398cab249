use crate::context::TrainerContext;
use crate::language::TextKey;
use crate::parsing::{parse_follow_ups, split_evaluation};
use crate::prompts::PromptKey;
use crate::topic::Question;
use tracing::warn;

/// Feedback on one answer plus the raw follow-up section of the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub feedback: String,
    pub follow_up_questions: String,
}

impl Evaluation {
    /// The follow-up section split into at most `max` questions.
    pub fn follow_ups(&self, max: usize) -> Vec<String> {
        parse_follow_ups(&self.follow_up_questions, max)
    }
}

pub struct AnswerEvaluator {
    ctx: TrainerContext,
}

impl AnswerEvaluator {
    pub fn new(ctx: TrainerContext) -> Self {
        Self { ctx }
    }

    /// Critiques `answer` against the question's answer guide.
    ///
    /// A failed call yields a fixed consolation message and no follow-ups.
    pub async fn evaluate(&self, question: &Question, answer: &str) -> Evaluation {
        let vocabulary = self.ctx.vocabulary();
        let reply = self
            .ctx
            .ask(
                PromptKey::EvaluateAnswer,
                &[
                    ("topic", question.topic_title.as_str()),
                    ("question", question.question.as_str()),
                    ("guide", question.answer_guide.as_str()),
                    ("answer", answer),
                ],
            )
            .await;

        match reply {
            Ok(reply) => {
                let (feedback, follow_up_questions) = split_evaluation(&reply, &vocabulary.markers);
                Evaluation {
                    feedback,
                    follow_up_questions,
                }
            }
            Err(e) => {
                warn!(topic = %question.topic_title, error = %e, "Answer evaluation failed");
                Evaluation {
                    feedback: vocabulary.text(TextKey::EvaluationFailed).to_string(),
                    follow_up_questions: String::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::llm_client::MockLLMClient;
    use anyhow::anyhow;
    use std::sync::Arc;

    fn evaluator(mock: MockLLMClient, language: Language) -> AnswerEvaluator {
        AnswerEvaluator::new(TrainerContext::with_builtin_prompts(Arc::new(mock), language))
    }

    fn question() -> Question {
        Question::new("Ownership", "What does a move do?", "Transfers ownership.")
    }

    #[tokio::test]
    async fn test_evaluation_splits_feedback_and_follow_ups() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete().returning(|_, user| {
            assert!(user.contains("Question: What does a move do?"));
            assert!(user.contains("A good answer should include: Transfers ownership."));
            assert!(user.contains("User's answer: It copies the value"));
            Ok("Feedback: Not quite, a move transfers ownership.\n\n\
                **Follow-up Questions:**\n1. What happens to the old binding?\n2. When is Copy used instead?"
                .to_string())
        });

        let evaluation = evaluator(mock, Language::English)
            .evaluate(&question(), "It copies the value")
            .await;

        assert_eq!(evaluation.feedback, "Not quite, a move transfers ownership.");
        assert_eq!(
            evaluation.follow_ups(3),
            vec![
                "1. What happens to the old binding?",
                "2. When is Copy used instead?"
            ]
        );
    }

    #[tokio::test]
    async fn test_reply_without_header_is_all_feedback() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete()
            .returning(|_, _| Ok("Great answer, nothing to add.".to_string()));

        let evaluation = evaluator(mock, Language::English)
            .evaluate(&question(), "It moves ownership")
            .await;
        assert_eq!(evaluation.feedback, "Great answer, nothing to add.");
        assert!(evaluation.follow_ups(3).is_empty());
    }

    #[tokio::test]
    async fn test_german_header_is_recognised() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete().returning(|_, _| {
            Ok("Gute Antwort.\n\nFolgefragen:\n- Was passiert danach?".to_string())
        });

        let evaluation = evaluator(mock, Language::German)
            .evaluate(&question(), "Der Besitz wechselt")
            .await;
        assert_eq!(evaluation.feedback, "Gute Antwort.");
        assert_eq!(evaluation.follow_ups(3), vec!["- Was passiert danach?"]);
    }

    #[tokio::test]
    async fn test_failure_yields_consolation_message() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete()
            .returning(|_, _| Err(anyhow!("timeout")));

        let evaluation = evaluator(mock, Language::German)
            .evaluate(&question(), "egal")
            .await;
        assert_eq!(
            evaluation.feedback,
            Language::German
                .vocabulary()
                .text(TextKey::EvaluationFailed)
        );
        assert!(evaluation.follow_up_questions.is_empty());
    }
}
