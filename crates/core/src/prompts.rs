//! Prompt templates for the text-generation service.
//!
//! Each prompt has a system message and a user template with `{name}`
//! placeholders. Built-in templates exist for every [`Language`]; a directory
//! of `.md` files can override any of them by file stem (`summarize_chunk.md`
//! for the user template, `summarize_chunk_system.md` for the system message).

use crate::language::{Language, fill};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// The prompts issued by the pipeline and the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKey {
    SummarizeChunk,
    ExtractTopics,
    ConsolidateTopics,
    DirectTopics,
    Relevance,
    TopicContent,
    GenerateQuestions,
    TopicIntro,
    EvaluateAnswer,
}

impl PromptKey {
    pub const ALL: [PromptKey; 9] = [
        PromptKey::SummarizeChunk,
        PromptKey::ExtractTopics,
        PromptKey::ConsolidateTopics,
        PromptKey::DirectTopics,
        PromptKey::Relevance,
        PromptKey::TopicContent,
        PromptKey::GenerateQuestions,
        PromptKey::TopicIntro,
        PromptKey::EvaluateAnswer,
    ];

    /// File stem of the user template.
    pub fn name(self) -> &'static str {
        match self {
            PromptKey::SummarizeChunk => "summarize_chunk",
            PromptKey::ExtractTopics => "extract_topics",
            PromptKey::ConsolidateTopics => "consolidate_topics",
            PromptKey::DirectTopics => "direct_topics",
            PromptKey::Relevance => "relevance",
            PromptKey::TopicContent => "topic_content",
            PromptKey::GenerateQuestions => "generate_questions",
            PromptKey::TopicIntro => "topic_intro",
            PromptKey::EvaluateAnswer => "evaluate_answer",
        }
    }

    fn system_name(self) -> String {
        format!("{}_system", self.name())
    }
}

/// A rendered prompt ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Language-specific prompt templates, keyed by template name.
#[derive(Debug, Clone)]
pub struct PromptBook {
    templates: HashMap<String, String>,
}

impl PromptBook {
    /// Built-in templates for a language.
    pub fn for_language(language: Language) -> Self {
        let table = match language {
            Language::English => ENGLISH,
            Language::German => GERMAN,
        };
        let templates = table
            .iter()
            .flat_map(|(key, system, user)| {
                [
                    (key.system_name(), system.to_string()),
                    (key.name().to_string(), user.to_string()),
                ]
            })
            .collect();
        Self { templates }
    }

    /// Replaces built-in templates with the given ones. Unknown names are ignored.
    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        for (name, template) in overrides {
            if self.templates.contains_key(&name) {
                debug!(prompt = %name, "Overriding built-in prompt");
                self.templates.insert(name, template);
            } else {
                warn!(prompt = %name, "Ignoring unknown prompt override");
            }
        }
        self
    }

    /// Renders the system message and user template for a key.
    pub fn render(&self, key: PromptKey, vars: &[(&str, &str)]) -> Prompt {
        Prompt {
            system: fill(self.template(&key.system_name()), vars),
            user: fill(self.template(key.name()), vars),
        }
    }

    fn template(&self, name: &str) -> &str {
        self.templates
            .get(name)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Loads every `.md` file in a directory as a template keyed by file stem.
pub fn load_prompt_dir(dir: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read prompts directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = std::fs::read_to_string(&path)?;
            prompts.insert(key, content.trim().to_string());
        }
    }
    Ok(prompts)
}

type Table = &'static [(PromptKey, &'static str, &'static str)];

const ENGLISH: Table = &[
    (
        PromptKey::SummarizeChunk,
        "You are a helpful assistant that summarizes text accurately.",
        "Summarize the following text in 2-3 sentences, capturing its key points and main ideas:\n\nTEXT:\n{text}",
    ),
    (
        PromptKey::ExtractTopics,
        "You are a helpful assistant that extracts key topics from text.",
        "Analyze the following text summaries and identify important topics or concepts. \
         For each topic, provide a clear, concise title and a brief one-sentence description. \
         Format as a numbered list with 'Topic: [title]' and 'Description: [description]' on separate lines.\n\n\
         TEXT SUMMARIES:\n{summaries}",
    ),
    (
        PromptKey::ConsolidateTopics,
        "You are a helpful assistant that consolidates topics effectively.",
        "Based on the following list of potential topics extracted from a document, \
         identify the {num_topics} most significant and representative topics. \
         Combine similar topics and ensure diversity of coverage. \
         For each final topic, provide a clear, concise title as a numbered list.\n\n\
         POTENTIAL TOPICS:\n{topics}",
    ),
    (
        PromptKey::DirectTopics,
        "You are a helpful assistant that extracts key topics from text.",
        "Identify the {num_topics} most important and distinct topics covered by the following text excerpts. \
         Answer with a numbered list, one topic per line, formatted as 'N. Title: one-sentence description'.\n\n\
         TEXT EXCERPTS:\n{excerpts}",
    ),
    (
        PromptKey::Relevance,
        "You are a helpful assistant determining text relevance.",
        "Determine if the following text is relevant to the topic '{topic}'. Answer with only 'Yes' or 'No'.\n\nTEXT:\n{text}",
    ),
    (
        PromptKey::TopicContent,
        "You are a helpful assistant that creates educational content.",
        "Based on the following text excerpts, create a comprehensive explanation about the topic '{topic}'. \
         Include key concepts, examples, and insights from the text. \
         The content should be detailed enough to serve as learning material (about 500-800 words).\n\n\
         TEXT EXCERPTS:\n{excerpts}",
    ),
    (
        PromptKey::GenerateQuestions,
        "You are a helpful assistant that creates educational assessment questions.",
        "Based on the following topic about '{topic}', create {count} thought-provoking questions \
         that would test understanding and critical thinking. For each question, also provide a brief guide \
         on what a good answer should include, starting with 'Guide:'. Separate the questions with a blank line.\n\n\
         TOPIC CONTENT:\n{content}",
    ),
    (
        PromptKey::TopicIntro,
        "You are a friendly tutor introducing a new topic to a student.",
        "Write a short introduction (2-3 sentences) to the topic '{topic}' that prepares the student \
         for questions about it. Do not ask any questions.\n\nTOPIC CONTENT:\n{content}",
    ),
    (
        PromptKey::EvaluateAnswer,
        "You are a knowledgeable and supportive tutor evaluating a student's answer.",
        "Evaluate the user's answer to the following question about {topic}:\n\n\
         Question: {question}\n\n\
         A good answer should include: {guide}\n\n\
         User's answer: {answer}\n\n\
         Provide constructive feedback on the answer, highlighting strengths and areas for improvement. \
         Be encouraging but honest. Then add a section headed 'Follow-up questions:' with one to three \
         numbered follow-up questions that deepen understanding.",
    ),
];

const GERMAN: Table = &[
    (
        PromptKey::SummarizeChunk,
        "Du bist ein hilfreicher Assistent, der Texte präzise zusammenfasst.",
        "Fasse den folgenden Text in 2-3 Sätzen zusammen und erfasse dabei die wichtigsten Punkte und Kernaussagen:\n\nTEXT:\n{text}",
    ),
    (
        PromptKey::ExtractTopics,
        "Du bist ein hilfreicher Assistent, der zentrale Themen aus Texten herausarbeitet.",
        "Analysiere die folgenden Textzusammenfassungen und bestimme wichtige Themen oder Konzepte. \
         Gib für jedes Thema einen klaren, knappen Titel und eine kurze Beschreibung in einem Satz an. \
         Formatiere das Ergebnis als nummerierte Liste mit 'Thema: [Titel]' und 'Beschreibung: [Beschreibung]' in getrennten Zeilen.\n\n\
         ZUSAMMENFASSUNGEN:\n{summaries}",
    ),
    (
        PromptKey::ConsolidateTopics,
        "Du bist ein hilfreicher Assistent, der Themen sinnvoll zusammenführt.",
        "Bestimme aus der folgenden Liste möglicher Themen eines Dokuments die {num_topics} bedeutendsten \
         und repräsentativsten Themen. Fasse ähnliche Themen zusammen und achte auf eine breite Abdeckung. \
         Gib für jedes Thema einen klaren, knappen Titel als nummerierte Liste an.\n\n\
         MÖGLICHE THEMEN:\n{topics}",
    ),
    (
        PromptKey::DirectTopics,
        "Du bist ein hilfreicher Assistent, der zentrale Themen aus Texten herausarbeitet.",
        "Bestimme die {num_topics} wichtigsten und klar unterscheidbaren Themen der folgenden Textauszüge. \
         Antworte mit einer nummerierten Liste, ein Thema pro Zeile, im Format 'N. Titel: Beschreibung in einem Satz'.\n\n\
         TEXTAUSZÜGE:\n{excerpts}",
    ),
    (
        PromptKey::Relevance,
        "Du bist ein hilfreicher Assistent, der die Relevanz von Texten beurteilt.",
        "Entscheide, ob der folgende Text für das Thema '{topic}' relevant ist. Antworte nur mit 'Ja' oder 'Nein'.\n\nTEXT:\n{text}",
    ),
    (
        PromptKey::TopicContent,
        "Du bist ein hilfreicher Assistent, der Lernmaterial erstellt.",
        "Erstelle auf Grundlage der folgenden Textauszüge eine umfassende Erklärung zum Thema '{topic}'. \
         Gehe auf Schlüsselkonzepte, Beispiele und Erkenntnisse aus dem Text ein. \
         Der Inhalt soll ausführlich genug sein, um als Lernmaterial zu dienen (etwa 500-800 Wörter).\n\n\
         TEXTAUSZÜGE:\n{excerpts}",
    ),
    (
        PromptKey::GenerateQuestions,
        "Du bist ein hilfreicher Assistent, der Prüfungsfragen für Lernende erstellt.",
        "Erstelle zum folgenden Thema '{topic}' {count} anregende Fragen, die Verständnis und kritisches Denken prüfen. \
         Gib zu jeder Frage einen kurzen Hinweis, was eine gute Antwort enthalten sollte, beginnend mit 'Hinweis:'. \
         Trenne die Fragen durch eine Leerzeile.\n\n\
         THEMENINHALT:\n{content}",
    ),
    (
        PromptKey::TopicIntro,
        "Du bist ein freundlicher Tutor, der einem Lernenden ein neues Thema vorstellt.",
        "Schreibe eine kurze Einführung (2-3 Sätze) in das Thema '{topic}', die auf Fragen dazu vorbereitet. \
         Stelle selbst keine Fragen.\n\nTHEMENINHALT:\n{content}",
    ),
    (
        PromptKey::EvaluateAnswer,
        "Du bist ein kompetenter und unterstützender Tutor, der die Antwort eines Lernenden bewertet.",
        "Bewerte die Antwort des Nutzers auf die folgende Frage zum Thema {topic}:\n\n\
         Frage: {question}\n\n\
         Eine gute Antwort sollte enthalten: {guide}\n\n\
         Antwort des Nutzers: {answer}\n\n\
         Gib konstruktive Rückmeldung, nenne Stärken und Verbesserungsmöglichkeiten. \
         Sei ermutigend, aber ehrlich. Füge danach einen Abschnitt mit der Überschrift 'Folgefragen:' \
         und ein bis drei nummerierten Folgefragen hinzu, die das Verständnis vertiefen.",
    ),
];
