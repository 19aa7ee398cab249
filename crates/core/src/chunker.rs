//! Paragraph-aligned text chunking.

/// Separator between paragraphs in the source text and between the
/// paragraphs of a produced chunk.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Default chunk budget in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 3000;

/// Splits text into chunks of at most `max_size` characters.
///
/// Paragraphs (separated by a blank line) are never split. A paragraph that
/// alone exceeds the budget becomes its own oversized chunk. Whitespace-only
/// paragraphs are dropped and every chunk is trimmed.
pub fn split(text: &str, max_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in text.split(PARAGRAPH_SEPARATOR) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        let paragraph_len = paragraph.chars().count();

        if !current.is_empty()
            && current_len + PARAGRAPH_SEPARATOR.len() + paragraph_len > max_size
        {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push_str(PARAGRAPH_SEPARATOR);
            current_len += PARAGRAPH_SEPARATOR.len();
        }
        current.push_str(paragraph);
        current_len += paragraph_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
