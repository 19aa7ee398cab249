//! Language tables.
//!
//! Every language-dependent string the trainer uses lives here: exit and
//! affirmative commands, the marker synonyms the tolerant parsers recognise,
//! and the user-facing session messages. A session resolves its
//! [`Vocabulary`] once and never looks at the language tag again.

use std::fmt;
use std::str::FromStr;

/// Supported session languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    German,
    English,
}

impl Language {
    /// Short language tag, as used in configuration and transcription requests.
    pub fn tag(self) -> &'static str {
        match self {
            Language::German => "de",
            Language::English => "en",
        }
    }

    /// Resolves the full vocabulary for this language.
    pub fn vocabulary(self) -> &'static Vocabulary {
        match self {
            Language::German => &GERMAN,
            Language::English => &ENGLISH,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "de" | "german" | "deutsch" => Ok(Language::German),
            "en" | "english" | "englisch" => Ok(Language::English),
            other => Err(format!("unsupported language '{}'", other)),
        }
    }
}

/// Keys for the user-facing messages of a session.
///
/// Templates may contain `{title}`, `{index}`, `{question}` or `{text}`
/// placeholders, filled in by [`Vocabulary::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKey {
    Welcome,
    NoTopics,
    TopicHeader,
    SkipTopic,
    QuestionLine,
    AnswerPrompt,
    Feedback,
    FollowUpLine,
    FollowUpPrompt,
    FollowUpAck,
    ContinueFollowUps,
    ContinueTopic,
    Goodbye,
    Completed,
    EvaluationFailed,
    ContentMissing,
    ContentFailed,
}

/// Marker synonyms recognised by the tolerant reply parsers.
///
/// All entries are lowercase; matching is case-insensitive.
#[derive(Debug)]
pub struct Markers {
    /// Labels that introduce a candidate topic title (`"topic:"`).
    pub topic_labels: &'static [&'static str],
    /// Labels that introduce a candidate topic description.
    pub description_labels: &'static [&'static str],
    /// Labels stripped from the front of a generated question.
    pub question_labels: &'static [&'static str],
    /// Labels stripped from the front of an answer guide.
    pub guide_labels: &'static [&'static str],
    /// Section headers separating feedback from follow-up questions.
    pub follow_up_headers: &'static [&'static str],
    /// Labels stripped from the front of evaluator feedback.
    pub feedback_labels: &'static [&'static str],
    /// Words that count as a positive relevance verdict.
    pub relevance_yes: &'static [&'static str],
}

/// The complete language table for one session language.
#[derive(Debug)]
pub struct Vocabulary {
    pub language: Language,
    pub exit_commands: &'static [&'static str],
    pub affirmatives: &'static [&'static str],
    pub markers: Markers,
    texts: &'static [(TextKey, &'static str)],
}

impl Vocabulary {
    /// True if the input is one of the exit synonyms (case-insensitive).
    pub fn is_exit(&self, input: &str) -> bool {
        matches_any(input, self.exit_commands)
    }

    /// True if the input is one of the affirmative answers (case-insensitive).
    pub fn is_affirmative(&self, input: &str) -> bool {
        matches_any(input, self.affirmatives)
    }

    /// Raw message template for a key.
    pub fn text(&self, key: TextKey) -> &'static str {
        self.texts
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, t)| *t)
            .unwrap_or_default()
    }

    /// Message for a key with `{name}` placeholders substituted.
    pub fn render(&self, key: TextKey, vars: &[(&str, &str)]) -> String {
        fill(self.text(key), vars)
    }
}

/// Substitutes `{name}` placeholders in a template.
pub(crate) fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), value)
    })
}

fn matches_any(input: &str, words: &[&str]) -> bool {
    let normalized = input.trim().to_lowercase();
    words.iter().any(|w| *w == normalized)
}

const SHARED_TOPIC_LABELS: &[&str] = &["topic:", "thema:", "titel:", "title:"];
const SHARED_DESCRIPTION_LABELS: &[&str] = &["description:", "beschreibung:"];
const SHARED_QUESTION_LABELS: &[&str] = &["question:", "q:", "frage:", "f:"];
const SHARED_GUIDE_LABELS: &[&str] = &[
    "good answer:",
    "guide:",
    "answer guide:",
    "answer:",
    "gute antwort:",
    "hinweis:",
    "antwort:",
    "leitfaden:",
];
const SHARED_RELEVANCE_YES: &[&str] = &["yes", "ja"];

static ENGLISH: Vocabulary = Vocabulary {
    language: Language::English,
    exit_commands: &["exit", "quit", "stop", "bye", "end"],
    affirmatives: &["yes", "y"],
    markers: Markers {
        topic_labels: SHARED_TOPIC_LABELS,
        description_labels: SHARED_DESCRIPTION_LABELS,
        question_labels: SHARED_QUESTION_LABELS,
        guide_labels: SHARED_GUIDE_LABELS,
        follow_up_headers: &[
            "follow-up questions:",
            "follow up questions:",
            "followup questions:",
            "follow-up question:",
            "follow up question:",
        ],
        feedback_labels: &["feedback:"],
        relevance_yes: SHARED_RELEVANCE_YES,
    },
    texts: &[
        (
            TextKey::Welcome,
            "Welcome to VoicedTrainer!\n\nI'll ask you questions about various topics from the material. \
             Try to answer as completely as you can.\nSay 'exit' at any time to end the session.",
        ),
        (
            TextKey::NoTopics,
            "No topics found. Please ensure preprocessing has been completed.",
        ),
        (TextKey::TopicHeader, "\n\nNew Topic: {title}\n"),
        (
            TextKey::SkipTopic,
            "Could not generate questions for topic '{title}'. Skipping.",
        ),
        (TextKey::QuestionLine, "\nQuestion {index}: {question}"),
        (TextKey::AnswerPrompt, "Your answer:"),
        (TextKey::Feedback, "\nFeedback: {text}"),
        (TextKey::FollowUpLine, "\nFollow-up: {question}"),
        (TextKey::FollowUpPrompt, "Your answer:"),
        (TextKey::FollowUpAck, "Thanks, noted."),
        (
            TextKey::ContinueFollowUps,
            "\nWould you like to move on to the next topic? (yes/no)",
        ),
        (
            TextKey::ContinueTopic,
            "\nWould you like to continue to the next topic? (yes/no)",
        ),
        (
            TextKey::Goodbye,
            "\nThank you for using VoicedTrainer. Goodbye!",
        ),
        (
            TextKey::Completed,
            "\nCongratulations! You've completed all the topics.\nThank you for using VoicedTrainer. Goodbye!",
        ),
        (
            TextKey::EvaluationFailed,
            "I couldn't properly evaluate your answer. Let's move on to the next question.",
        ),
        (
            TextKey::ContentMissing,
            "No detailed information available for '{title}'.",
        ),
        (
            TextKey::ContentFailed,
            "Failed to generate detailed content for '{title}' due to an error.",
        ),
    ],
};

static GERMAN: Vocabulary = Vocabulary {
    language: Language::German,
    exit_commands: &[
        "exit", "beenden", "ende", "stopp", "stop", "tschüss", "aufhören",
    ],
    affirmatives: &["ja", "j"],
    markers: Markers {
        topic_labels: SHARED_TOPIC_LABELS,
        description_labels: SHARED_DESCRIPTION_LABELS,
        question_labels: SHARED_QUESTION_LABELS,
        guide_labels: SHARED_GUIDE_LABELS,
        follow_up_headers: &[
            "folgefragen:",
            "folgefrage:",
            "nachfragen:",
            "vertiefungsfragen:",
            "weiterführende fragen:",
            "follow-up questions:",
            "follow up questions:",
        ],
        feedback_labels: &["feedback:", "rückmeldung:"],
        relevance_yes: SHARED_RELEVANCE_YES,
    },
    texts: &[
        (
            TextKey::Welcome,
            "Willkommen beim VoicedTrainer!\n\nIch stelle dir Fragen zu verschiedenen Themen aus dem Material. \
             Versuche, so vollständig wie möglich zu antworten.\nSage jederzeit 'beenden', um die Sitzung zu beenden.",
        ),
        (
            TextKey::NoTopics,
            "Keine Themen gefunden. Bitte stelle sicher, dass die Vorverarbeitung abgeschlossen ist.",
        ),
        (TextKey::TopicHeader, "\n\nNeues Thema: {title}\n"),
        (
            TextKey::SkipTopic,
            "Für das Thema '{title}' konnten keine Fragen erstellt werden. Es wird übersprungen.",
        ),
        (TextKey::QuestionLine, "\nFrage {index}: {question}"),
        (TextKey::AnswerPrompt, "Deine Antwort:"),
        (TextKey::Feedback, "\nRückmeldung: {text}"),
        (TextKey::FollowUpLine, "\nNachfrage: {question}"),
        (TextKey::FollowUpPrompt, "Deine Antwort:"),
        (TextKey::FollowUpAck, "Danke, notiert."),
        (
            TextKey::ContinueFollowUps,
            "\nMöchtest du zum nächsten Thema wechseln? (ja/nein)",
        ),
        (
            TextKey::ContinueTopic,
            "\nMöchtest du mit dem nächsten Thema weitermachen? (ja/nein)",
        ),
        (
            TextKey::Goodbye,
            "\nDanke, dass du den VoicedTrainer benutzt hast. Auf Wiedersehen!",
        ),
        (
            TextKey::Completed,
            "\nGlückwunsch! Du hast alle Themen abgeschlossen.\nDanke, dass du den VoicedTrainer benutzt hast. Auf Wiedersehen!",
        ),
        (
            TextKey::EvaluationFailed,
            "Ich konnte deine Antwort leider nicht richtig auswerten. Machen wir mit der nächsten Frage weiter.",
        ),
        (
            TextKey::ContentMissing,
            "Keine ausführlichen Informationen zu '{title}' verfügbar.",
        ),
        (
            TextKey::ContentFailed,
            "Die ausführlichen Inhalte zu '{title}' konnten wegen eines Fehlers nicht erstellt werden.",
        ),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KEYS: &[TextKey] = &[
        TextKey::Welcome,
        TextKey::NoTopics,
        TextKey::TopicHeader,
        TextKey::SkipTopic,
        TextKey::QuestionLine,
        TextKey::AnswerPrompt,
        TextKey::Feedback,
        TextKey::FollowUpLine,
        TextKey::FollowUpPrompt,
        TextKey::FollowUpAck,
        TextKey::ContinueFollowUps,
        TextKey::ContinueTopic,
        TextKey::Goodbye,
        TextKey::Completed,
        TextKey::EvaluationFailed,
        TextKey::ContentMissing,
        TextKey::ContentFailed,
    ];

    #[test]
    fn test_every_key_has_text_in_every_language() {
        for language in [Language::German, Language::English] {
            let vocab = language.vocabulary();
            for key in ALL_KEYS {
                assert!(
                    !vocab.text(*key).is_empty(),
                    "{:?} is missing {:?}",
                    language,
                    key
                );
            }
        }
    }

    #[test]
    fn test_exit_commands_are_case_insensitive() {
        let en = Language::English.vocabulary();
        assert!(en.is_exit("EXIT"));
        assert!(en.is_exit("  Quit "));
        assert!(!en.is_exit("exit please"));

        let de = Language::German.vocabulary();
        assert!(de.is_exit("Beenden"));
        assert!(de.is_exit("TSCHÜSS"));
        assert!(!de.is_exit("ja"));
    }

    #[test]
    fn test_affirmatives_depend_on_language() {
        assert!(Language::English.vocabulary().is_affirmative("Y"));
        assert!(!Language::English.vocabulary().is_affirmative("ja"));
        assert!(Language::German.vocabulary().is_affirmative("J"));
        assert!(!Language::German.vocabulary().is_affirmative("yes"));
    }

    #[test]
    fn test_render_fills_placeholders() {
        let en = Language::English.vocabulary();
        let line = en.render(
            TextKey::QuestionLine,
            &[("index", "2"), ("question", "Why?")],
        );
        assert_eq!(line, "\nQuestion 2: Why?");
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("DE".parse::<Language>().unwrap(), Language::German);
        assert_eq!("english".parse::<Language>().unwrap(), Language::English);
        assert!("fr".parse::<Language>().is_err());
        assert_eq!(Language::default().tag(), "de");
    }
}
