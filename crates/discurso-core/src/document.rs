//! Document identity derived from the source filename.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Output partition used when no year can be read from the filename.
pub const UNKNOWN_YEAR: &str = "unknown";

/// First year (inclusive) of the single-column report format.
pub const SINGLE_COLUMN_FIRST_YEAR: i32 = 2015;
/// Last year (inclusive) of the single-column report format.
pub const SINGLE_COLUMN_LAST_YEAR: i32 = 2017;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"20\d{2}").unwrap());

/// How page text is read off the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Whole page at once.
    SingleColumn,
    /// Left half, then right half, of every page.
    TwoColumn,
}

impl LayoutMode {
    /// Reports from 2015–2017 are single-column; everything else, including
    /// documents with no recognizable year, is read as two columns.
    pub fn for_year(year: Option<i32>) -> Self {
        match year {
            Some(y) if (SINGLE_COLUMN_FIRST_YEAR..=SINGLE_COLUMN_LAST_YEAR).contains(&y) => {
                Self::SingleColumn
            }
            _ => Self::TwoColumn,
        }
    }

    pub fn is_two_column(&self) -> bool {
        matches!(self, Self::TwoColumn)
    }
}

impl std::fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleColumn => write!(f, "single-column"),
            Self::TwoColumn => write!(f, "two-column"),
        }
    }
}

/// Extract the first `20xx` group from a filename stem.
pub fn infer_year(stem: &str) -> Option<i32> {
    YEAR_RE.find(stem).and_then(|m| m.as_str().parse().ok())
}

/// A source report and the attributes inferred from its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub path: PathBuf,
    /// File name without extension; the output record is keyed by it.
    pub stem: String,
    pub year: Option<i32>,
    pub layout: LayoutMode,
}

impl DocumentInfo {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let year = infer_year(&stem);
        Self {
            layout: LayoutMode::for_year(year),
            path,
            stem,
            year,
        }
    }

    /// Directory name used to partition output by year.
    pub fn partition(&self) -> String {
        self.year
            .map(|y| y.to_string())
            .unwrap_or_else(|| UNKNOWN_YEAR.to_string())
    }
}
