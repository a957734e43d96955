//! Punctuation-based sentence segmentation.

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[\r\n]+\s*").unwrap());

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split text after every `.`, `!` or `?` that is followed by whitespace.
///
/// The terminator stays with its sentence. Segments are trimmed, empty ones
/// dropped, and line breaks inside a sentence become a single space.
/// Abbreviations and decimals are not special-cased.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        if let Some(&(_, next)) = chars.peek() {
            if next.is_whitespace() {
                let end = i + c.len_utf8();
                push_sentence(&text[start..end], &mut sentences);
                start = end;
            }
        }
    }
    push_sentence(&text[start..], &mut sentences);
    sentences
}

fn push_sentence(raw: &str, out: &mut Vec<String>) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        out.push(LINE_BREAK.replace_all(trimmed, " ").into_owned());
    }
}
