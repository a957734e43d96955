//! Discurso Classify — from linear text to topic buckets.
//!
//! Sentences are segmented on terminal punctuation, filtered (global
//! keywords, minimum length, chart captions) and scored against the GDP,
//! inflation and domestic-context keyword tables.

pub mod classify;
pub mod filters;
pub mod keywords;
pub mod normalize;
pub mod segment;
pub mod stopwords;

pub use classify::{
    priority_for, Classifier, Placement, Priority, SentenceScores, Topic, TopicBuckets, Verdict,
};
pub use filters::{FilterOutcome, RejectReason, Rejection, SentenceFilter};
pub use keywords::{KeywordMatcher, Lexicon};
pub use normalize::{clean_text, is_valid_sentence, normalize_buckets, normalize_entry, Normalized};
pub use segment::split_sentences;
