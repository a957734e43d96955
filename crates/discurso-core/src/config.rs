//! Pipeline configuration and data directory management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Sentences shorter than this (in characters) are dropped before scoring.
pub const DEFAULT_MIN_SENTENCE_CHARS: usize = 30;
/// `mexico_score + topic_score` at or above this lands in the prioritized bucket.
pub const DEFAULT_PRIORITY_THRESHOLD: usize = 2;
/// Chart captions ("Gráfica 3 ...") are matched at sentence start.
pub const DEFAULT_CAPTION_PATTERN: &str = r"^\s*grá?fica";

pub const GDP_KEYWORDS: &[&str] = &[
    "PIB",
    "producto interno bruto",
    "crecimiento económico",
    "desarrollo económico",
];

pub const INFLATION_KEYWORDS: &[&str] = &[
    "inflación",
    "inflación subyacente",
    "IPC",
    "tasa de inflación",
    "precios al consumidor",
];

pub const MEXICO_KEYWORDS: &[&str] = &[
    "México",
    "mexicano",
    "nacional",
    "doméstico",
    "economía nacional",
    "mercado interno",
    "Gobierno de México",
    "Banco de México",
    "Banxico",
];

pub const GLOBAL_KEYWORDS: &[&str] = &[
    "mundo",
    "mundial",
    "global",
    "internacional",
    "economía mundial",
    "zona del euro",
    "China",
    "Asia",
    "Japón",
    "Unión Europea",
    "EE.UU.",
    "Latinoamérica",
    "economías emergentes",
];

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// The four keyword tables driving filtering and classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTables {
    #[serde(default = "default_gdp")]
    pub gdp: Vec<String>,
    #[serde(default = "default_inflation")]
    pub inflation: Vec<String>,
    /// Domestic-context terms; they raise priority but never select a topic.
    #[serde(default = "default_mexico")]
    pub mexico: Vec<String>,
    /// Sentences mentioning any of these are excluded outright.
    #[serde(default = "default_global")]
    pub global: Vec<String>,
}

fn default_gdp() -> Vec<String> {
    owned(GDP_KEYWORDS)
}
fn default_inflation() -> Vec<String> {
    owned(INFLATION_KEYWORDS)
}
fn default_mexico() -> Vec<String> {
    owned(MEXICO_KEYWORDS)
}
fn default_global() -> Vec<String> {
    owned(GLOBAL_KEYWORDS)
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            gdp: default_gdp(),
            inflation: default_inflation(),
            mexico: default_mexico(),
            global: default_global(),
        }
    }
}

impl KeywordTables {
    /// Trim entries, drop blanks and repeated terms, keeping first occurrence order.
    fn normalize(&mut self) {
        for list in [
            &mut self.gdp,
            &mut self.inflation,
            &mut self.mexico,
            &mut self.global,
        ] {
            let mut seen = std::collections::HashSet::new();
            list.retain_mut(|kw| {
                *kw = kw.trim().to_string();
                !kw.is_empty() && seen.insert(kw.clone())
            });
        }
    }
}

/// Tunables for the extraction and classification pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub keywords: KeywordTables,
    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,
    #[serde(default = "default_priority_threshold")]
    pub priority_threshold: usize,
    /// Case-insensitive regex; sentences it matches are treated as captions.
    #[serde(default = "default_caption_pattern")]
    pub caption_pattern: String,
}

fn default_min_sentence_chars() -> usize {
    DEFAULT_MIN_SENTENCE_CHARS
}
fn default_priority_threshold() -> usize {
    DEFAULT_PRIORITY_THRESHOLD
}
fn default_caption_pattern() -> String {
    DEFAULT_CAPTION_PATTERN.into()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keywords: KeywordTables::default(),
            min_sentence_chars: DEFAULT_MIN_SENTENCE_CHARS,
            priority_threshold: DEFAULT_PRIORITY_THRESHOLD,
            caption_pattern: DEFAULT_CAPTION_PATTERN.into(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration file. Fields missing from the file take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))?;
        config.keywords.normalize();
        config.validate()?;
        info!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` if given, otherwise use the built-in tables.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.keywords.gdp.is_empty() || self.keywords.inflation.is_empty() {
            return Err(Error::Config(
                "gdp and inflation keyword tables must not be empty".into(),
            ));
        }
        if self.priority_threshold == 0 {
            return Err(Error::Config("priority_threshold must be at least 1".into()));
        }
        Ok(())
    }
}

/// Paths to the corpus data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Source PDFs (`data/raw/`).
    pub raw: PathBuf,
    /// Bucket records, partitioned by year (`data/extracted/`).
    pub extracted: PathBuf,
    /// Normalized records (`data/preprocessed/`).
    pub preprocessed: PathBuf,
    /// Metadata companions (`data/metadata/`).
    pub metadata: PathBuf,
}

impl CorpusPaths {
    /// Derive all paths from a root directory. Nothing is created on disk.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            raw: root.join("raw"),
            extracted: root.join("extracted"),
            preprocessed: root.join("preprocessed"),
            metadata: root.join("metadata"),
            root,
        }
    }

    /// Root from `DISCURSO_DATA_DIR`, falling back to `./data`.
    pub fn from_env() -> Self {
        let root = std::env::var("DISCURSO_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        Self::new(root)
    }
}
