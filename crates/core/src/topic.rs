use serde::{Deserialize, Serialize};

/// A named unit of learning material extracted from the corpus.
///
/// Titles are unique within a corpus. `content` holds the generated
/// explanatory passage and stays empty until the content generator has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl Topic {
    /// Creates a topic whose content is still pending generation.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
        }
    }

    pub fn with_content(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Placeholder topic used when extraction cannot produce a real title.
    pub fn placeholder(index: usize) -> Self {
        Self::new(format!("Topic {}", index))
    }
}

/// An assessment question tied to a topic by title.
///
/// The answer guide informs evaluation only and is never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Index of the originating topic during preprocessing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<usize>,
    pub topic_title: String,
    pub question: String,
    #[serde(default)]
    pub answer_guide: String,
}

impl Question {
    pub fn new(
        topic_title: impl Into<String>,
        question: impl Into<String>,
        answer_guide: impl Into<String>,
    ) -> Self {
        Self {
            topic_id: None,
            topic_title: topic_title.into(),
            question: question.into(),
            answer_guide: answer_guide.into(),
        }
    }
}

/// Everything the extraction pipeline produces for one corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessedCorpus {
    pub topics: Vec<Topic>,
    pub questions: Vec<Question>,
}

impl PreprocessedCorpus {
    /// Stored questions belonging to the topic with the given title.
    pub fn questions_for<'a>(&'a self, title: &'a str) -> impl Iterator<Item = &'a Question> + 'a {
        self.questions
            .iter()
            .filter(move |q| q.topic_title == title)
    }
}
