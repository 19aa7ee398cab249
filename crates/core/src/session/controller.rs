use super::state::{Ending, Phase, SessionState};
use crate::context::TrainerContext;
use crate::error::SessionError;
use crate::evaluator::AnswerEvaluator;
use crate::io::{InputHandler, OutputHandler};
use crate::language::TextKey;
use crate::prompts::PromptKey;
use crate::questions::QuestionGenerator;
use crate::store::CorpusStore;
use crate::topic::{PreprocessedCorpus, Question, Topic};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Characters of topic content reused as an intro when the intro call fails.
const INTRO_FALLBACK_CHARS: usize = 300;

/// Where a topic's question batch comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionSource {
    /// Regenerate the batch when the topic starts.
    #[default]
    Live,
    /// Use stored questions, generating live only when none are stored.
    Persisted,
}

impl FromStr for QuestionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(QuestionSource::Live),
            "persisted" | "stored" => Ok(QuestionSource::Persisted),
            other => Err(format!("unknown question source '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub questions_per_topic: usize,
    /// Follow-ups answered before the user is asked whether to move on.
    pub follow_up_threshold: RangeInclusive<u32>,
    /// Follow-ups taken from one evaluation.
    pub max_follow_ups: usize,
    pub question_source: QuestionSource,
    /// Fixes topic order and thresholds for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            questions_per_topic: 5,
            follow_up_threshold: 3..=4,
            max_follow_ups: 3,
            question_source: QuestionSource::Live,
            seed: None,
        }
    }
}

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Exited,
    NoTopics,
}

impl From<Ending> for SessionOutcome {
    fn from(ending: Ending) -> Self {
        match ending {
            Ending::Completed => SessionOutcome::Completed,
            Ending::Exited => SessionOutcome::Exited,
            Ending::NoTopics => SessionOutcome::NoTopics,
        }
    }
}

/// Drives one interactive session over a preprocessed corpus.
pub struct SessionController {
    ctx: TrainerContext,
    questions: QuestionGenerator,
    evaluator: AnswerEvaluator,
    settings: SessionSettings,
    rng: StdRng,
}

impl SessionController {
    pub fn new(ctx: TrainerContext, settings: SessionSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            questions: QuestionGenerator::new(ctx.clone()),
            evaluator: AnswerEvaluator::new(ctx.clone()),
            ctx,
            settings,
            rng,
        }
    }

    /// Loads the stored corpus and runs a session over it.
    pub async fn run_from_store(
        &mut self,
        store: &dyn CorpusStore,
        input: &mut dyn InputHandler,
        output: &mut dyn OutputHandler,
    ) -> Result<SessionOutcome, SessionError> {
        let corpus = store.load().await?;
        self.run(&corpus, input, output).await
    }

    /// Runs the dialog until the user exits or every topic is covered.
    pub async fn run(
        &mut self,
        corpus: &PreprocessedCorpus,
        input: &mut dyn InputHandler,
        output: &mut dyn OutputHandler,
    ) -> Result<SessionOutcome, SessionError> {
        let vocabulary = self.ctx.vocabulary();

        let mut topics = corpus.topics.clone();
        topics.shuffle(&mut self.rng);
        let threshold = self.draw_threshold();
        let mut state = SessionState::new(topics, threshold);

        let mut phase = state.start();
        if phase != Phase::Done(Ending::NoTopics) {
            say(output, vocabulary.text(TextKey::Welcome)).await?;
        }
        info!(
            topics = corpus.topics.len(),
            language = %self.ctx.language(),
            "Session started"
        );

        let mut last_answer = String::new();
        loop {
            debug!(?phase, "Session phase");
            phase = match phase {
                Phase::TopicIntro => {
                    let Some(topic) = state.current_topic().cloned() else {
                        phase = state.advance_topic();
                        continue;
                    };
                    self.introduce(&topic, output).await?;
                    let batch = self.question_batch(&topic, corpus).await;
                    if batch.is_empty() {
                        warn!(topic = %topic.title, "No questions for topic, skipping");
                        let notice = vocabulary
                            .render(TextKey::SkipTopic, &[("title", topic.title.as_str())]);
                        say(output, &notice).await?;
                    }
                    let threshold = self.draw_threshold();
                    state.questions_ready(batch, threshold)
                }
                Phase::AwaitingAnswer => {
                    let Some(question) = state.current_question().map(|q| q.question.clone())
                    else {
                        phase = state.next_question();
                        continue;
                    };
                    let index = (state.question_cursor() + 1).to_string();
                    let line = vocabulary.render(
                        TextKey::QuestionLine,
                        &[("index", index.as_str()), ("question", question.as_str())],
                    );
                    say(output, &line).await?;
                    match ask_user(input, vocabulary.text(TextKey::AnswerPrompt)).await? {
                        Some(answer) => {
                            let next = state.on_answer(&answer, vocabulary);
                            last_answer = answer;
                            next
                        }
                        None => Phase::Done(Ending::Exited),
                    }
                }
                Phase::Evaluating => {
                    let Some(question) = state.current_question().cloned() else {
                        phase = state.next_question();
                        continue;
                    };
                    let evaluation = self.evaluator.evaluate(&question, &last_answer).await;
                    let feedback =
                        vocabulary.render(TextKey::Feedback, &[("text", evaluation.feedback.as_str())]);
                    say(output, &feedback).await?;
                    state.on_evaluated(evaluation.follow_ups(self.settings.max_follow_ups))
                }
                Phase::FollowUpPrompt => state.prompt_follow_up(),
                Phase::AwaitingFollowUpAnswer => {
                    let line = vocabulary.render(
                        TextKey::FollowUpLine,
                        &[("question", state.active_follow_up().unwrap_or_default())],
                    );
                    say(output, &line).await?;
                    match ask_user(input, vocabulary.text(TextKey::FollowUpPrompt)).await? {
                        Some(answer) => {
                            let next = state.on_follow_up_answer(&answer, vocabulary);
                            if !matches!(next, Phase::Done(_)) {
                                say(output, vocabulary.text(TextKey::FollowUpAck)).await?;
                            }
                            next
                        }
                        None => Phase::Done(Ending::Exited),
                    }
                }
                Phase::ContinueFollowUps => {
                    match ask_user(input, vocabulary.text(TextKey::ContinueFollowUps)).await? {
                        Some(answer) => {
                            let threshold = self.draw_threshold();
                            state.on_follow_up_decision(&answer, vocabulary, threshold)
                        }
                        None => Phase::Done(Ending::Exited),
                    }
                }
                Phase::ContinueTopic => {
                    match ask_user(input, vocabulary.text(TextKey::ContinueTopic)).await? {
                        Some(answer) => state.on_topic_decision(&answer, vocabulary),
                        None => Phase::Done(Ending::Exited),
                    }
                }
                Phase::Done(ending) => {
                    let farewell = match ending {
                        Ending::Completed => TextKey::Completed,
                        Ending::Exited => TextKey::Goodbye,
                        Ending::NoTopics => TextKey::NoTopics,
                    };
                    say(output, vocabulary.text(farewell)).await?;
                    info!(?ending, "Session finished");
                    return Ok(ending.into());
                }
            };
        }
    }

    fn draw_threshold(&mut self) -> u32 {
        let range = self.settings.follow_up_threshold.clone();
        if range.is_empty() {
            return *range.start();
        }
        self.rng.random_range(range)
    }

    /// Shows the topic header and a short intro blurb.
    async fn introduce(
        &self,
        topic: &Topic,
        output: &mut dyn OutputHandler,
    ) -> Result<(), SessionError> {
        let vocabulary = self.ctx.vocabulary();
        let header = vocabulary.render(TextKey::TopicHeader, &[("title", topic.title.as_str())]);
        say(output, &header).await?;
        if let Some(intro) = self.intro(topic).await {
            say(output, &intro).await?;
        }
        Ok(())
    }

    /// The intro blurb, falling back to the start of the topic content.
    async fn intro(&self, topic: &Topic) -> Option<String> {
        match self
            .ctx
            .ask(
                PromptKey::TopicIntro,
                &[("topic", topic.title.as_str()), ("content", topic.content.as_str())],
            )
            .await
        {
            Ok(intro) if !intro.trim().is_empty() => return Some(intro.trim().to_string()),
            Ok(_) => debug!(topic = %topic.title, "Empty intro, using topic content"),
            Err(e) => warn!(topic = %topic.title, error = %e, "Intro generation failed"),
        }
        content_excerpt(&topic.content, INTRO_FALLBACK_CHARS)
    }

    async fn question_batch(&self, topic: &Topic, corpus: &PreprocessedCorpus) -> Vec<Question> {
        let count = self.settings.questions_per_topic;
        if self.settings.question_source == QuestionSource::Persisted {
            let stored: Vec<Question> = corpus
                .questions_for(&topic.title)
                .take(count)
                .cloned()
                .collect();
            if !stored.is_empty() {
                return stored;
            }
            debug!(topic = %topic.title, "No stored questions, generating live");
        }
        self.questions.generate_for_topic(topic, count).await
    }
}

/// The first `max_chars` characters of `content`, with an ellipsis if cut.
fn content_excerpt(content: &str, max_chars: usize) -> Option<String> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => Some(format!("{}...", content[..cut].trim_end())),
        None => Some(content.to_string()),
    }
}

async fn say(output: &mut dyn OutputHandler, message: &str) -> Result<(), SessionError> {
    output.display(message).await.map_err(SessionError::Io)
}

async fn ask_user(
    input: &mut dyn InputHandler,
    prompt: &str,
) -> Result<Option<String>, SessionError> {
    input.get_input(prompt).await.map_err(SessionError::Io)
}
