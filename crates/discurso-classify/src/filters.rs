//! Exclusion and length filter applied before scoring.
//!
//! Checks run in a fixed order and the first failing one is recorded:
//! global keyword, minimum length, chart caption.

use regex::Regex;
use serde::{Deserialize, Serialize};

use discurso_core::{Error, PipelineConfig, Result};

use crate::keywords::KeywordMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Global,
    TooShort,
    Caption,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Global => "global",
            Self::TooShort => "too_short",
            Self::Caption => "caption",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub sentence: String,
    pub reason: RejectReason,
}

/// Surviving sentences and the rejected ones, both in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub kept: Vec<String>,
    pub rejected: Vec<Rejection>,
}

pub struct SentenceFilter {
    global: KeywordMatcher,
    min_chars: usize,
    caption: Regex,
}

impl SentenceFilter {
    pub fn new(global: KeywordMatcher, min_chars: usize, caption_pattern: &str) -> Result<Self> {
        let caption = Regex::new(&format!("(?i){}", caption_pattern))
            .map_err(|e| Error::Pattern(format!("caption pattern {}: {}", caption_pattern, e)))?;
        Ok(Self {
            global,
            min_chars,
            caption,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(
            KeywordMatcher::new(&config.keywords.global)?,
            config.min_sentence_chars,
            &config.caption_pattern,
        )
    }

    /// First check the sentence fails, or `None` if it survives.
    pub fn check(&self, sentence: &str) -> Option<RejectReason> {
        if self.global.is_match(sentence) {
            Some(RejectReason::Global)
        } else if sentence.chars().count() < self.min_chars {
            Some(RejectReason::TooShort)
        } else if self.caption.is_match(sentence) {
            Some(RejectReason::Caption)
        } else {
            None
        }
    }

    pub fn apply(&self, sentences: Vec<String>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for sentence in sentences {
            match self.check(&sentence) {
                None => outcome.kept.push(sentence),
                Some(reason) => outcome.rejected.push(Rejection { sentence, reason }),
            }
        }
        outcome
    }
}
