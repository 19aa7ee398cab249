//! Tolerant parsers for free-form service replies.
//!
//! The text-generation service answers in loosely formatted natural language.
//! Everything here is a pure function from reply text to structured records.
//! Lines or blocks that do not fit are dropped, never reported as errors.
//! Marker synonyms come from the session's [`Markers`] table.

use crate::language::Markers;

/// A candidate topic proposed for one batch of summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCandidate {
    pub title: String,
    pub description: String,
}

/// A question block split into the question and its answer guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestion {
    pub question: String,
    pub answer_guide: String,
}

const BULLETS: &[&str] = &["- ", "* ", "• ", "– "];

/// Parses a list of candidate topics with descriptions.
///
/// A line starting with a numeral, a bullet, or a topic label opens a new
/// candidate. Its description is the text after the first `:` on the same
/// line, or a following `Description:` line. A candidate without a
/// description is discarded when the next one opens.
pub fn parse_topic_candidates(text: &str, markers: &Markers) -> Vec<TopicCandidate> {
    let mut candidates = Vec::new();
    let mut pending: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let listed = strip_list_marker(line);
        let body = listed.unwrap_or(line);

        if let Some(description) = strip_label(body, markers.description_labels) {
            if let Some(title) = pending.take() {
                let description = clean_text(description);
                if !description.is_empty() {
                    candidates.push(TopicCandidate {
                        title,
                        description: description.to_string(),
                    });
                }
            }
            continue;
        }

        let labelled = strip_label(body, markers.topic_labels);
        if listed.is_none() && labelled.is_none() {
            continue;
        }

        pending = None;
        let (title, description) = split_title(labelled.unwrap_or(body));
        if title.is_empty() {
            continue;
        }
        match description {
            Some(description) => candidates.push(TopicCandidate {
                title,
                description,
            }),
            None => pending = Some(title),
        }
    }

    candidates
}

/// Parses the consolidated topic list into bare titles.
///
/// Only numbered or bulleted lines (or lines with a topic label) count; any
/// `: description` suffix is removed.
pub fn parse_topic_titles(text: &str, markers: &Markers) -> Vec<String> {
    text.lines()
        .filter_map(|raw| {
            let line = raw.trim();
            let listed = strip_list_marker(line);
            let body = listed.unwrap_or(line);
            let labelled = strip_label(body, markers.topic_labels);
            if listed.is_none() && labelled.is_none() {
                return None;
            }
            let (title, _) = split_title(labelled.unwrap_or(body));
            (!title.is_empty()).then_some(title)
        })
        .collect()
}

/// Parses generated question/guide pairs.
///
/// The reply is split into blank-line-delimited blocks. A block is a question
/// only if it contains `?`: everything through the first `?` is the question,
/// the rest is the answer guide. Numbering and `Question:`/`Guide:` style
/// labels are removed.
pub fn parse_question_blocks(text: &str, markers: &Markers) -> Vec<ParsedQuestion> {
    blocks(text)
        .into_iter()
        .filter_map(|block| {
            let mark = block.find('?')?;
            let (head, tail) = block.split_at(mark + 1);

            let mut question = head.trim();
            if let Some(rest) = strip_list_marker(question) {
                question = rest;
            }
            if let Some(rest) = strip_label(question, markers.question_labels) {
                question = rest;
            }
            let question = collapse_whitespace(trim_leading_decoration(question));
            if question.trim_end_matches('?').trim().is_empty() {
                return None;
            }

            let mut guide = trim_leading_decoration(tail);
            let unlisted = strip_list_marker(guide).unwrap_or(guide);
            if let Some(rest) = strip_label(unlisted, markers.guide_labels) {
                guide = rest;
            }

            Some(ParsedQuestion {
                question,
                answer_guide: guide.trim().to_string(),
            })
        })
        .collect()
}

/// Splits the raw follow-up section into at most `max` follow-up questions.
///
/// A line opens a new follow-up if it starts with a digit and has `". "`
/// within its first five characters, or starts with `"- "` or `"* "`. Other
/// lines continue the current follow-up. Unmarked but non-empty text becomes
/// a single follow-up.
pub fn parse_follow_ups(raw: &str, max: usize) -> Vec<String> {
    let mut follow_ups: Vec<String> = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if opens_follow_up(line) {
            follow_ups.push(line.to_string());
        } else if let Some(current) = follow_ups.last_mut() {
            current.push(' ');
            current.push_str(line);
        }
    }

    if follow_ups.is_empty() {
        let whole = raw.trim();
        if !whole.is_empty() {
            follow_ups.push(whole.to_string());
        }
    }

    follow_ups.truncate(max);
    follow_ups
}

/// Splits an evaluation reply into feedback and the raw follow-up section.
///
/// The split happens at the earliest case-insensitive occurrence of any
/// follow-up header. Without a header the whole reply is feedback.
pub fn split_evaluation(reply: &str, markers: &Markers) -> (String, String) {
    let header = markers
        .follow_up_headers
        .iter()
        .filter_map(|h| find_ignore_case(reply, h))
        .min_by_key(|(start, _)| *start);

    let (feedback, follow_ups) = match header {
        Some((start, end)) => (&reply[..start], &reply[end..]),
        None => (reply, ""),
    };

    let feedback = feedback.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '#' | '_'));
    let feedback = strip_label(feedback, markers.feedback_labels).unwrap_or(feedback);

    (
        feedback.trim().to_string(),
        trim_leading_decoration(follow_ups).trim().to_string(),
    )
}

/// Reads a yes/no relevance verdict. Any whole word matching an affirmative
/// counts, wherever it appears in the reply.
pub fn is_relevant(answer: &str, markers: &Markers) -> bool {
    answer
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|w| markers.relevance_yes.contains(&w.to_lowercase().as_str()))
}

/// Removes `- `, `* `, `1. `, `1) ` style list markers.
pub(crate) fn strip_list_marker(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if let Some(rest) = BULLETS.iter().find_map(|b| line.strip_prefix(b)) {
        return Some(rest.trim_start());
    }

    let unbolded = line.trim_start_matches('*');
    let digits = unbolded.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > 3 {
        return None;
    }
    let after = &unbolded[digits..];
    let rest = after.strip_prefix('.').or_else(|| after.strip_prefix(')'))?;
    if rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '*') {
        Some(rest.trim_start_matches('*').trim_start())
    } else {
        None
    }
}

/// Removes a leading label such as `Topic:`, `Question 2:` or `**Guide:**`.
///
/// Labels are matched case-insensitively and may be followed by an
/// enumeration before the colon.
pub(crate) fn strip_label<'a>(text: &'a str, labels: &[&str]) -> Option<&'a str> {
    let text = trim_leading_decoration(text);
    labels.iter().find_map(|label| {
        let rest = strip_prefix_ignore_case(text, label.trim_end_matches(':'))?;
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit() || c == ' ');
        let rest = rest.trim_start_matches(['*', '_']).strip_prefix(':')?;
        Some(trim_leading_decoration(rest).trim_end())
    })
}

/// Splits `Title: description` and cleans both halves.
fn split_title(body: &str) -> (String, Option<String>) {
    match body.split_once(':') {
        Some((title, description)) => {
            let description = clean_text(description);
            (
                clean_text(title).to_string(),
                (!description.is_empty()).then(|| description.to_string()),
            )
        }
        None => (clean_text(body).to_string(), None),
    }
}

/// Trims whitespace, quotes and `*` emphasis from both ends. Underscores go
/// only as balanced `_x_` or `__x__` pairs, so `__init__ methods` survives.
pub(crate) fn clean_text(text: &str) -> &str {
    let mut text = trim_asterisks_and_quotes(text);
    while let Some(inner) = ["__", "_"]
        .iter()
        .find_map(|m| text.strip_prefix(m)?.strip_suffix(m))
        .filter(|inner| !inner.trim().is_empty())
    {
        text = trim_asterisks_and_quotes(inner);
    }
    text
}

fn trim_asterisks_and_quotes(text: &str) -> &str {
    text.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '*' | '"' | '\'' | '“' | '”' | '„')
    })
}

fn trim_leading_decoration(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '_' | '#'))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn opens_follow_up(line: &str) -> bool {
    if line.starts_with("- ") || line.starts_with("* ") {
        return true;
    }
    line.starts_with(|c: char| c.is_ascii_digit())
        && line.chars().take(5).collect::<String>().contains(". ")
}

/// Groups consecutive non-blank lines into blocks.
fn blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
    blocks
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut end = 0;
    let mut chars = text.chars();
    for expected in prefix.chars() {
        let actual = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
        end += actual.len_utf8();
    }
    Some(&text[end..])
}

/// Byte span of the first case-insensitive occurrence of a lowercase needle.
/// The span is measured in the haystack, whose case forms may be wider.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    haystack.char_indices().find_map(|(start, _)| {
        strip_prefix_ignore_case(&haystack[start..], needle)
            .map(|rest| (start, haystack.len() - rest.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    fn en() -> &'static Markers {
        &Language::English.vocabulary().markers
    }

    fn de() -> &'static Markers {
        &Language::German.vocabulary().markers
    }

    #[test]
    fn test_numbered_title_description_lines() {
        let text = "1. Ownership: Who frees memory\n2. Borrowing: References without moves\n3. Lifetimes: How long references live";
        let candidates = parse_topic_candidates(text, en());
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].title, "Ownership");
        assert_eq!(candidates[0].description, "Who frees memory");
        assert_eq!(candidates[2].title, "Lifetimes");
    }

    #[test]
    fn test_topic_and_description_on_separate_lines() {
        let text = "Here are the topics:\n\n1. Topic: Ownership\n   Description: Who frees memory.\n\n2. Topic: Traits\nDescription: Shared behaviour.\n";
        let candidates = parse_topic_candidates(text, en());
        assert_eq!(
            candidates,
            vec![
                TopicCandidate {
                    title: "Ownership".into(),
                    description: "Who frees memory.".into()
                },
                TopicCandidate {
                    title: "Traits".into(),
                    description: "Shared behaviour.".into()
                },
            ]
        );
    }

    #[test]
    fn test_candidate_without_description_is_dropped() {
        let text = "1. Ownership\n2. Traits: Shared behaviour\nsome stray commentary";
        let candidates = parse_topic_candidates(text, en());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Traits");
    }

    #[test]
    fn test_markdown_emphasis_is_removed() {
        let text = "1. **Topic:** Ownership\n   **Description:** Who frees memory\n- **Traits**: Shared behaviour";
        let candidates = parse_topic_candidates(text, en());
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Ownership");
        assert_eq!(candidates[0].description, "Who frees memory");
        assert_eq!(candidates[1].title, "Traits");
        assert_eq!(candidates[1].description, "Shared behaviour");
    }

    #[test]
    fn test_german_labels() {
        let text = "Thema: Photosynthese\nBeschreibung: Wie Pflanzen Licht nutzen";
        let candidates = parse_topic_candidates(text, de());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Photosynthese");
    }

    #[test]
    fn test_topic_titles_strip_descriptions() {
        let text = "Final topics:\n1. Ownership: memory rules\n2) Borrowing\n- Traits: behaviour\n* Lifetimes\n\nThese cover the material.";
        assert_eq!(
            parse_topic_titles(text, en()),
            vec!["Ownership", "Borrowing", "Traits", "Lifetimes"]
        );
    }

    #[test]
    fn test_topic_titles_ignore_decimal_numbers() {
        let text = "1.5 million words were analysed.\n10. Error Handling";
        assert_eq!(parse_topic_titles(text, en()), vec!["Error Handling"]);
    }

    #[test]
    fn test_question_blocks() {
        let text = "1. What is ownership?\nGuide: Mentions single owner and drop.\n\nQuestion: Why borrow? Answer: Avoids moves.\n\nThis block has no question.\n\n3. **How do lifetimes work?**\nGood answer: Relates scopes.";
        let parsed = parse_question_blocks(text, en());
        assert_eq!(
            parsed,
            vec![
                ParsedQuestion {
                    question: "What is ownership?".into(),
                    answer_guide: "Mentions single owner and drop.".into(),
                },
                ParsedQuestion {
                    question: "Why borrow?".into(),
                    answer_guide: "Avoids moves.".into(),
                },
                ParsedQuestion {
                    question: "How do lifetimes work?".into(),
                    answer_guide: "Relates scopes.".into(),
                },
            ]
        );
    }

    #[test]
    fn test_question_block_with_enumerated_label_and_no_guide() {
        let text = "Question 2: What does the borrow checker enforce?";
        let parsed = parse_question_blocks(text, en());
        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed[0].question,
            "What does the borrow checker enforce?"
        );
        assert_eq!(parsed[0].answer_guide, "");
    }

    #[test]
    fn test_bare_question_mark_is_not_a_question() {
        assert!(parse_question_blocks("1. ?\nGuide: nothing", en()).is_empty());
    }

    #[test]
    fn test_german_question_labels() {
        let text = "Frage: Was ist Photosynthese?\nHinweis: Licht, Wasser, CO2.";
        let parsed = parse_question_blocks(text, de());
        assert_eq!(parsed[0].question, "Was ist Photosynthese?");
        assert_eq!(parsed[0].answer_guide, "Licht, Wasser, CO2.");
    }

    #[test]
    fn test_follow_ups_keep_their_numbering() {
        assert_eq!(
            parse_follow_ups("1. Why? \n2. How?", 3),
            vec!["1. Why?", "2. How?"]
        );
    }

    #[test]
    fn test_follow_up_continuation_lines() {
        let raw = "- What happens when\n  a value is moved?\n- Can you give an example?";
        assert_eq!(
            parse_follow_ups(raw, 3),
            vec![
                "- What happens when a value is moved?",
                "- Can you give an example?"
            ]
        );
    }

    #[test]
    fn test_unmarked_follow_up_becomes_single_item() {
        assert_eq!(
            parse_follow_ups("  Could you elaborate on moves?  ", 3),
            vec!["Could you elaborate on moves?"]
        );
        assert!(parse_follow_ups("   \n  ", 3).is_empty());
    }

    #[test]
    fn test_follow_ups_are_capped() {
        let raw = "1. A?\n2. B?\n3. C?\n4. D?";
        assert_eq!(parse_follow_ups(raw, 3), vec!["1. A?", "2. B?", "3. C?"]);
    }

    #[test]
    fn test_split_evaluation_at_header() {
        let reply = "Feedback: Good start, but mention drop.\n\n**Follow-Up Questions:**\n1. When is drop called?";
        let (feedback, follow_ups) = split_evaluation(reply, en());
        assert_eq!(feedback, "Good start, but mention drop.");
        assert_eq!(follow_ups, "1. When is drop called?");
    }

    #[test]
    fn test_split_evaluation_without_header() {
        let (feedback, follow_ups) = split_evaluation("Great answer!", en());
        assert_eq!(feedback, "Great answer!");
        assert_eq!(follow_ups, "");
    }

    #[test]
    fn test_split_evaluation_german_header() {
        let reply = "Gut gemacht.\nFOLGEFRAGEN:\n1. Warum?";
        let (feedback, follow_ups) = split_evaluation(reply, de());
        assert_eq!(feedback, "Gut gemacht.");
        assert_eq!(follow_ups, "1. Warum?");
    }

    #[test]
    fn test_clean_text_keeps_identifier_underscores() {
        assert_eq!(clean_text("__init__ methods"), "__init__ methods");
        assert_eq!(clean_text("**Ownership**"), "Ownership");
        assert_eq!(clean_text("__Borrowing__"), "Borrowing");
        assert_eq!(clean_text(" _\"Lifetimes\"_ "), "Lifetimes");
        assert_eq!(clean_text("**_private_ fields"), "_private_ fields");
        assert_eq!(clean_text("__"), "__");
    }

    #[test]
    fn test_relevance_verdict() {
        assert!(is_relevant("Yes.", en()));
        assert!(is_relevant("  ja", de()));
        assert!(is_relevant("The material is relevant: yes", en()));
        assert!(is_relevant("Antwort: JA", de()));
        assert!(!is_relevant("No.", en()));
        assert!(!is_relevant("Nein, das Jahr passt nicht", de()));
        assert!(!is_relevant("Eyes on the topic, but no", en()));
        assert!(!is_relevant("", en()));
    }

    #[test]
    fn test_header_span_is_measured_in_the_reply() {
        // U+212A KELVIN SIGN is three bytes and lowercases to an ASCII 'k'.
        assert_eq!(find_ignore_case("a\u{212A}b rest", "kb"), Some((1, 5)));
        assert_eq!(find_ignore_case("no match", "kb"), None);

        let reply = "Gut.\nWEITERFÜHRENDE FRAGEN:\n1. Warum?";
        let (feedback, follow_ups) = split_evaluation(reply, de());
        assert_eq!(feedback, "Gut.");
        assert_eq!(follow_ups, "1. Warum?");
    }

    #[test]
    fn test_strip_label_handles_non_ascii_text() {
        assert_eq!(strip_label("Rückmeldung: Prima", de().feedback_labels), Some("Prima"));
        assert_eq!(strip_label("Überblick", de().feedback_labels), None);
    }
}
