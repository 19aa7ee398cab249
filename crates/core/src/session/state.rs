//! Pure session state and transitions.
//!
//! Every transition takes the already-read user input (if any) and returns
//! the next [`Phase`]. No I/O happens here; the controller performs the
//! effects each phase calls for.

use crate::language::Vocabulary;
use crate::topic::{Question, Topic};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Introduce the current topic and fetch its question batch.
    TopicIntro,
    /// Ask the question at the cursor and wait for an answer.
    AwaitingAnswer,
    /// Evaluate the last answer.
    Evaluating,
    /// Pop the next queued follow-up.
    FollowUpPrompt,
    /// Ask the active follow-up and wait for an answer.
    AwaitingFollowUpAnswer,
    /// The follow-up threshold was hit: move on or keep discussing?
    ContinueFollowUps,
    /// The question batch is exhausted: move to the next topic?
    ContinueTopic,
    Done(Ending),
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// Every topic was covered.
    Completed,
    /// The user exited, interrupted, or declined to continue.
    Exited,
    /// There was nothing to study.
    NoTopics,
}

#[derive(Debug)]
pub struct SessionState {
    remaining_topics: VecDeque<Topic>,
    current_topic: Option<Topic>,
    questions: Vec<Question>,
    question_cursor: usize,
    follow_up_queue: VecDeque<String>,
    active_follow_up: Option<String>,
    follow_up_counter: u32,
    follow_up_threshold: u32,
}

impl SessionState {
    /// `topics` must already be in presentation order.
    pub fn new(topics: Vec<Topic>, follow_up_threshold: u32) -> Self {
        Self {
            remaining_topics: topics.into(),
            current_topic: None,
            questions: Vec::new(),
            question_cursor: 0,
            follow_up_queue: VecDeque::new(),
            active_follow_up: None,
            follow_up_counter: 0,
            follow_up_threshold,
        }
    }

    pub fn current_topic(&self) -> Option<&Topic> {
        self.current_topic.as_ref()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.question_cursor)
    }

    /// 0-based position in the current question batch.
    pub fn question_cursor(&self) -> usize {
        self.question_cursor
    }

    pub fn active_follow_up(&self) -> Option<&str> {
        self.active_follow_up.as_deref()
    }

    pub fn follow_up_counter(&self) -> u32 {
        self.follow_up_counter
    }

    pub fn follow_up_threshold(&self) -> u32 {
        self.follow_up_threshold
    }

    pub fn remaining_topics(&self) -> usize {
        self.remaining_topics.len()
    }

    /// Enters the first topic, or ends immediately when there is none.
    pub fn start(&mut self) -> Phase {
        match self.remaining_topics.pop_front() {
            Some(topic) => {
                self.current_topic = Some(topic);
                Phase::TopicIntro
            }
            None => Phase::Done(Ending::NoTopics),
        }
    }

    /// Installs the current topic's question batch.
    ///
    /// An empty batch skips straight to the next topic.
    pub fn questions_ready(&mut self, questions: Vec<Question>, follow_up_threshold: u32) -> Phase {
        self.question_cursor = 0;
        self.follow_up_queue.clear();
        self.active_follow_up = None;
        self.follow_up_counter = 0;
        self.follow_up_threshold = follow_up_threshold;
        self.questions = questions;

        if self.questions.is_empty() {
            self.advance_topic()
        } else {
            Phase::AwaitingAnswer
        }
    }

    pub fn on_answer(&mut self, answer: &str, vocabulary: &Vocabulary) -> Phase {
        if vocabulary.is_exit(answer) {
            Phase::Done(Ending::Exited)
        } else {
            Phase::Evaluating
        }
    }

    pub fn on_evaluated(&mut self, follow_ups: Vec<String>) -> Phase {
        if follow_ups.is_empty() {
            return self.next_question();
        }
        self.follow_up_queue = follow_ups.into();
        Phase::FollowUpPrompt
    }

    /// Moves the cursor forward.
    pub fn next_question(&mut self) -> Phase {
        self.question_cursor += 1;
        if self.question_cursor < self.questions.len() {
            Phase::AwaitingAnswer
        } else {
            Phase::ContinueTopic
        }
    }

    /// Activates the next queued follow-up; an empty queue moves on to the next question.
    pub fn prompt_follow_up(&mut self) -> Phase {
        match self.follow_up_queue.pop_front() {
            Some(follow_up) => {
                self.active_follow_up = Some(follow_up);
                Phase::AwaitingFollowUpAnswer
            }
            None => {
                self.active_follow_up = None;
                self.next_question()
            }
        }
    }

    pub fn on_follow_up_answer(&mut self, answer: &str, vocabulary: &Vocabulary) -> Phase {
        if vocabulary.is_exit(answer) {
            return Phase::Done(Ending::Exited);
        }
        self.active_follow_up = None;
        self.follow_up_counter += 1;
        if self.follow_up_counter >= self.follow_up_threshold {
            Phase::ContinueFollowUps
        } else {
            Phase::FollowUpPrompt
        }
    }

    /// Handles the answer to "move on?" after the follow-up threshold.
    ///
    /// Affirmative abandons the rest of the batch; anything else resets the
    /// counter with a fresh threshold and resumes the queue.
    pub fn on_follow_up_decision(
        &mut self,
        answer: &str,
        vocabulary: &Vocabulary,
        next_threshold: u32,
    ) -> Phase {
        if vocabulary.is_exit(answer) {
            return Phase::Done(Ending::Exited);
        }
        if vocabulary.is_affirmative(answer) {
            self.follow_up_queue.clear();
            self.question_cursor = self.questions.len();
            return Phase::ContinueTopic;
        }
        self.follow_up_counter = 0;
        self.follow_up_threshold = next_threshold;
        Phase::FollowUpPrompt
    }

    /// Handles the answer to "next topic?".
    pub fn on_topic_decision(&mut self, answer: &str, vocabulary: &Vocabulary) -> Phase {
        if vocabulary.is_affirmative(answer) {
            self.advance_topic()
        } else {
            Phase::Done(Ending::Exited)
        }
    }

    /// Enters the next topic, or completes the session when none are left.
    pub fn advance_topic(&mut self) -> Phase {
        self.questions.clear();
        self.question_cursor = 0;
        match self.remaining_topics.pop_front() {
            Some(topic) => {
                self.current_topic = Some(topic);
                Phase::TopicIntro
            }
            None => {
                self.current_topic = None;
                Phase::Done(Ending::Completed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    fn en() -> &'static Vocabulary {
        Language::English.vocabulary()
    }

    fn topics(titles: &[&str]) -> Vec<Topic> {
        titles.iter().map(|t| Topic::new(*t)).collect()
    }

    fn batch(n: usize) -> Vec<Question> {
        (1..=n)
            .map(|i| Question::new("A", format!("Q{}?", i), ""))
            .collect()
    }

    fn follow_ups(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{}. F{}?", i, i)).collect()
    }

    #[test]
    fn test_start_without_topics_ends() {
        let mut state = SessionState::new(Vec::new(), 3);
        assert_eq!(state.start(), Phase::Done(Ending::NoTopics));
    }

    #[test]
    fn test_walks_questions_then_asks_about_topic() {
        let mut state = SessionState::new(topics(&["A", "B"]), 3);
        assert_eq!(state.start(), Phase::TopicIntro);
        assert_eq!(state.current_topic().unwrap().title, "A");

        assert_eq!(state.questions_ready(batch(2), 3), Phase::AwaitingAnswer);
        assert_eq!(state.current_question().unwrap().question, "Q1?");
        assert_eq!(state.on_answer("x", en()), Phase::Evaluating);
        assert_eq!(state.on_evaluated(Vec::new()), Phase::AwaitingAnswer);
        assert_eq!(state.current_question().unwrap().question, "Q2?");
        assert_eq!(state.on_answer("x", en()), Phase::Evaluating);
        assert_eq!(state.on_evaluated(Vec::new()), Phase::ContinueTopic);

        assert_eq!(state.on_topic_decision("Yes", en()), Phase::TopicIntro);
        assert_eq!(state.current_topic().unwrap().title, "B");
        assert_eq!(state.questions_ready(batch(1), 3), Phase::AwaitingAnswer);
        assert_eq!(state.on_evaluated(Vec::new()), Phase::ContinueTopic);
        assert_eq!(
            state.on_topic_decision("y", en()),
            Phase::Done(Ending::Completed)
        );
    }

    #[test]
    fn test_exit_commands_end_the_session_everywhere() {
        let mut state = SessionState::new(topics(&["A"]), 1);
        state.start();
        state.questions_ready(batch(2), 1);
        assert_eq!(state.on_answer(" QUIT ", en()), Phase::Done(Ending::Exited));

        state.on_evaluated(follow_ups(1));
        state.prompt_follow_up();
        assert_eq!(
            state.on_follow_up_answer("exit", en()),
            Phase::Done(Ending::Exited)
        );
        assert_eq!(
            state.on_follow_up_decision("bye", en(), 3),
            Phase::Done(Ending::Exited)
        );
        assert_eq!(
            state.on_topic_decision("stop", en()),
            Phase::Done(Ending::Exited)
        );
    }

    #[test]
    fn test_declining_next_topic_exits() {
        let mut state = SessionState::new(topics(&["A", "B"]), 3);
        state.start();
        state.questions_ready(batch(1), 3);
        assert_eq!(
            state.on_topic_decision("maybe later", en()),
            Phase::Done(Ending::Exited)
        );
    }

    #[test]
    fn test_empty_batch_skips_to_next_topic() {
        let mut state = SessionState::new(topics(&["A", "B"]), 3);
        state.start();
        assert_eq!(state.questions_ready(Vec::new(), 3), Phase::TopicIntro);
        assert_eq!(state.current_topic().unwrap().title, "B");
        assert_eq!(
            state.questions_ready(Vec::new(), 3),
            Phase::Done(Ending::Completed)
        );
    }

    #[test]
    fn test_follow_up_queue_drains_then_advances() {
        let mut state = SessionState::new(topics(&["A"]), 4);
        state.start();
        state.questions_ready(batch(2), 4);

        assert_eq!(state.on_evaluated(follow_ups(2)), Phase::FollowUpPrompt);
        assert_eq!(state.prompt_follow_up(), Phase::AwaitingFollowUpAnswer);
        assert_eq!(state.active_follow_up(), Some("1. F1?"));
        assert_eq!(state.on_follow_up_answer("a", en()), Phase::FollowUpPrompt);
        assert_eq!(state.prompt_follow_up(), Phase::AwaitingFollowUpAnswer);
        assert_eq!(state.active_follow_up(), Some("2. F2?"));
        assert_eq!(state.on_follow_up_answer("b", en()), Phase::FollowUpPrompt);
        assert_eq!(state.prompt_follow_up(), Phase::AwaitingAnswer);
        assert_eq!(state.current_question().unwrap().question, "Q2?");
        assert_eq!(state.follow_up_counter(), 2);
    }

    #[test]
    fn test_threshold_decision_affirmative_abandons_batch() {
        let mut state = SessionState::new(topics(&["A", "B"]), 3);
        state.start();
        state.questions_ready(batch(3), 2);

        state.on_evaluated(follow_ups(3));
        state.prompt_follow_up();
        assert_eq!(state.on_follow_up_answer("a", en()), Phase::FollowUpPrompt);
        state.prompt_follow_up();
        assert_eq!(
            state.on_follow_up_answer("b", en()),
            Phase::ContinueFollowUps
        );
        assert_eq!(
            state.on_follow_up_decision("yes", en(), 3),
            Phase::ContinueTopic
        );
        assert!(state.current_question().is_none());
    }

    #[test]
    fn test_threshold_decision_negative_resets_counter() {
        let mut state = SessionState::new(topics(&["A"]), 3);
        state.start();
        state.questions_ready(batch(1), 1);

        state.on_evaluated(follow_ups(3));
        state.prompt_follow_up();
        assert_eq!(
            state.on_follow_up_answer("a", en()),
            Phase::ContinueFollowUps
        );
        assert_eq!(
            state.on_follow_up_decision("no", en(), 4),
            Phase::FollowUpPrompt
        );
        assert_eq!(state.follow_up_counter(), 0);
        assert_eq!(state.follow_up_threshold(), 4);
        assert_eq!(state.prompt_follow_up(), Phase::AwaitingFollowUpAnswer);
        assert_eq!(state.active_follow_up(), Some("2. F2?"));
    }

    #[test]
    fn test_counter_persists_across_questions_and_resets_per_topic() {
        let mut state = SessionState::new(topics(&["A", "B"]), 3);
        state.start();
        state.questions_ready(batch(2), 3);

        state.on_evaluated(follow_ups(1));
        state.prompt_follow_up();
        state.on_follow_up_answer("a", en());
        assert_eq!(state.prompt_follow_up(), Phase::AwaitingAnswer);
        state.on_evaluated(follow_ups(1));
        state.prompt_follow_up();
        state.on_follow_up_answer("b", en());
        assert_eq!(state.follow_up_counter(), 2);

        state.advance_topic();
        state.questions_ready(batch(1), 4);
        assert_eq!(state.follow_up_counter(), 0);
    }
}
