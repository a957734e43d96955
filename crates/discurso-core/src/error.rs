//! Error types for the discurso pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid keyword pattern: {0}")]
    Pattern(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
