//! Discurso Core — errors, configuration, document identity.

pub mod config;
pub mod document;
pub mod error;

pub use config::{CorpusPaths, KeywordTables, PipelineConfig};
pub use document::{infer_year, DocumentInfo, LayoutMode, UNKNOWN_YEAR};
pub use error::{Error, Result};
