//! Normalization of bucket sentences before external annotation.
//!
//! Text is lowercased, letter-spaced words are rejoined, everything outside
//! the Spanish alphabet is stripped and stopwords are removed. Entries that
//! fail the validity check are handed back instead of being kept.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::classify::TopicBuckets;
use crate::stopwords::is_stopword;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACED_LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\b\w\b\s*){3,}").unwrap());
static NON_SPANISH: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-záéíóúñü\s]").unwrap());

/// Tokens of this many characters or fewer count as short.
const SHORT_TOKEN_CHARS: usize = 2;
const MIN_TOKENS: usize = 3;

pub fn clean_text(text: &str) -> String {
    let text = text.replace('\n', " ");
    let text = WHITESPACE.replace_all(&text, " ").to_lowercase();
    let text = SPACED_LETTERS.replace_all(&text, |caps: &regex::Captures| caps[0].replace(' ', ""));
    let text = NON_SPANISH.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// At least three tokens, no more than half of them short.
pub fn is_valid_sentence(sentence: &str) -> bool {
    let tokens: Vec<&str> = sentence.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return false;
    }
    let short = tokens
        .iter()
        .filter(|t| t.chars().count() <= SHORT_TOKEN_CHARS)
        .count();
    short * 2 <= tokens.len()
}

pub fn remove_stopwords<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    tokens.into_iter().filter(|t| !is_stopword(t)).collect()
}

/// Result of normalizing one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Kept(String),
    /// Failed validation; carries the cleaned text.
    Rejected(String),
    /// Nothing left after cleaning or stopword removal.
    Empty,
}

pub fn normalize_entry(entry: &str) -> Normalized {
    let cleaned = clean_text(entry);
    if !is_valid_sentence(&cleaned) {
        return if cleaned.is_empty() {
            Normalized::Empty
        } else {
            Normalized::Rejected(cleaned)
        };
    }
    let kept = remove_stopwords(cleaned.split_whitespace()).join(" ");
    if kept.is_empty() {
        Normalized::Empty
    } else {
        Normalized::Kept(kept)
    }
}

/// Normalize every bucket, dropping entries that do not survive. Rejected
/// cleaned strings are returned in bucket order.
pub fn normalize_buckets(buckets: &TopicBuckets) -> (TopicBuckets, Vec<String>) {
    let mut out = TopicBuckets::default();
    let mut rejected = Vec::new();
    for ((_, entries), target) in buckets.sections().into_iter().zip(out.sections_mut()) {
        for entry in entries {
            match normalize_entry(entry) {
                Normalized::Kept(text) => target.push(text),
                Normalized::Rejected(text) => rejected.push(text),
                Normalized::Empty => {}
            }
        }
    }
    (out, rejected)
}
