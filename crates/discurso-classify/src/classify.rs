//! Threshold-based topic bucket classification.
//!
//! Each topic is evaluated on its own: a sentence with a positive topic score
//! lands in that topic's prioritized bucket when its domestic-context score
//! plus its topic score reaches the threshold, and in the other bucket
//! otherwise. A sentence can land in a GDP and an inflation bucket at once.

use serde::{Deserialize, Serialize};
use tracing::debug;

use discurso_core::{PipelineConfig, Result};

use crate::filters::{FilterOutcome, RejectReason, SentenceFilter};
use crate::keywords::Lexicon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Gdp,
    Inflation,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::Gdp, Topic::Inflation];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Prioritized,
    Other,
}

/// Where a sentence goes for one topic, if anywhere.
pub fn priority_for(topic_score: usize, mexico_score: usize, threshold: usize) -> Option<Priority> {
    if topic_score == 0 {
        None
    } else if mexico_score + topic_score >= threshold {
        Some(Priority::Prioritized)
    } else {
        Some(Priority::Other)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceScores {
    pub gdp: usize,
    pub inflation: usize,
    pub mexico: usize,
}

impl SentenceScores {
    pub fn topic(&self, topic: Topic) -> usize {
        match topic {
            Topic::Gdp => self.gdp,
            Topic::Inflation => self.inflation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub topic: Topic,
    pub priority: Priority,
}

impl Placement {
    pub fn bucket_name(&self) -> &'static str {
        match (self.topic, self.priority) {
            (Topic::Gdp, Priority::Prioritized) => "gdp_prioritized",
            (Topic::Gdp, Priority::Other) => "gdp_other",
            (Topic::Inflation, Priority::Prioritized) => "inflation_prioritized",
            (Topic::Inflation, Priority::Other) => "inflation_other",
        }
    }
}

/// The four buckets of one document. Field order is the serialized key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicBuckets {
    #[serde(default)]
    pub gdp_prioritized: Vec<String>,
    #[serde(default)]
    pub inflation_prioritized: Vec<String>,
    #[serde(default)]
    pub gdp_other: Vec<String>,
    #[serde(default)]
    pub inflation_other: Vec<String>,
}

impl TopicBuckets {
    pub fn bucket_mut(&mut self, placement: Placement) -> &mut Vec<String> {
        match (placement.topic, placement.priority) {
            (Topic::Gdp, Priority::Prioritized) => &mut self.gdp_prioritized,
            (Topic::Gdp, Priority::Other) => &mut self.gdp_other,
            (Topic::Inflation, Priority::Prioritized) => &mut self.inflation_prioritized,
            (Topic::Inflation, Priority::Other) => &mut self.inflation_other,
        }
    }

    /// `(name, sentences)` pairs in serialized key order.
    pub fn sections(&self) -> [(&'static str, &Vec<String>); 4] {
        [
            ("gdp_prioritized", &self.gdp_prioritized),
            ("inflation_prioritized", &self.inflation_prioritized),
            ("gdp_other", &self.gdp_other),
            ("inflation_other", &self.inflation_other),
        ]
    }

    pub fn sections_mut(&mut self) -> [&mut Vec<String>; 4] {
        [
            &mut self.gdp_prioritized,
            &mut self.inflation_prioritized,
            &mut self.gdp_other,
            &mut self.inflation_other,
        ]
    }

    /// Total entries across all buckets.
    pub fn len(&self) -> usize {
        self.sections().iter().map(|(_, v)| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything needed to turn sentences into buckets, compiled once per run.
pub struct Classifier {
    lexicon: Lexicon,
    filter: SentenceFilter,
    threshold: usize,
}

/// Full verdict for a single sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub sentence: String,
    pub rejected: Option<RejectReason>,
    pub scores: SentenceScores,
    pub placements: Vec<Placement>,
}

impl Classifier {
    pub fn new(lexicon: Lexicon, filter: SentenceFilter, threshold: usize) -> Self {
        Self {
            lexicon,
            filter,
            threshold,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(
            Lexicon::compile(&config.keywords)?,
            SentenceFilter::from_config(config)?,
            config.priority_threshold,
        ))
    }

    pub fn filter(&self, sentences: Vec<String>) -> FilterOutcome {
        self.filter.apply(sentences)
    }

    pub fn scores(&self, sentence: &str) -> SentenceScores {
        SentenceScores {
            gdp: self.lexicon.gdp.score(sentence),
            inflation: self.lexicon.inflation.score(sentence),
            mexico: self.lexicon.mexico.score(sentence),
        }
    }

    pub fn placements(&self, scores: &SentenceScores) -> Vec<Placement> {
        Topic::ALL
            .iter()
            .filter_map(|&topic| {
                priority_for(scores.topic(topic), scores.mexico, self.threshold)
                    .map(|priority| Placement { topic, priority })
            })
            .collect()
    }

    /// Bucket already-filtered sentences, preserving their order.
    pub fn classify(&self, sentences: &[String]) -> TopicBuckets {
        let mut buckets = TopicBuckets::default();
        for sentence in sentences {
            let scores = self.scores(sentence);
            for placement in self.placements(&scores) {
                buckets.bucket_mut(placement).push(sentence.clone());
            }
        }
        debug!(
            "Classified {} sentences into {} bucket entries",
            sentences.len(),
            buckets.len()
        );
        buckets
    }

    /// Filter, score and place one sentence without touching any document.
    pub fn verdict(&self, sentence: &str) -> Verdict {
        let rejected = self.filter.check(sentence);
        let scores = self.scores(sentence);
        let placements = if rejected.is_none() {
            self.placements(&scores)
        } else {
            Vec::new()
        };
        Verdict {
            sentence: sentence.to_string(),
            rejected,
            scores,
            placements,
        }
    }
}
