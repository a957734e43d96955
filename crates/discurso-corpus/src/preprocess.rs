//! Corpus normalization stage: extracted records → preprocessed records.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use discurso_classify::normalize_buckets;
use discurso_core::{Error, Result};

use crate::records::{list_records, read_record};
use crate::writer::{write_atomic, write_json};

pub const PREPROCESSED_PREFIX: &str = "preprocessed_";
pub const REJECTED_SENTENCES_FILE: &str = "rejected_sentences.txt";

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeReport {
    pub records: usize,
    pub entries_kept: usize,
    pub entries_rejected: usize,
    pub written: Vec<PathBuf>,
}

/// `<output_dir>/preprocessed_<filename>`
pub fn preprocessed_path(output_dir: &Path, record: &Path) -> Result<PathBuf> {
    let name = record
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Output(format!("unnamed record {}", record.display())))?;
    Ok(output_dir.join(format!("{}{}", PREPROCESSED_PREFIX, name)))
}

/// Normalize every record found (recursively) under `input_dir`.
///
/// Records are flattened into `output_dir`; later records with the same file
/// name overwrite earlier ones. Rejected strings from the whole run go to a
/// single text file, one per line, only when there are any.
pub fn run_normalization(input_dir: &Path, output_dir: &Path) -> Result<NormalizeReport> {
    let records = list_records(input_dir, true)?;
    info!(
        "Normalizing {} records from {} into {}",
        records.len(),
        input_dir.display(),
        output_dir.display()
    );

    let mut report = NormalizeReport::default();
    let mut rejected_all: Vec<String> = Vec::new();
    for record in &records {
        let buckets = read_record(record)?;
        let (normalized, rejected) = normalize_buckets(&buckets);
        let target = preprocessed_path(output_dir, record)?;
        if report.written.contains(&target) {
            warn!("{} overwrites an earlier record of the same name", target.display());
        }
        write_json(&target, &normalized)?;

        report.records += 1;
        report.entries_kept += normalized.len();
        report.entries_rejected += rejected.len();
        report.written.push(target);
        rejected_all.extend(rejected);
    }

    if !rejected_all.is_empty() {
        let mut lines = rejected_all.join("\n");
        lines.push('\n');
        let path = output_dir.join(REJECTED_SENTENCES_FILE);
        write_atomic(&path, lines.as_bytes())?;
        report.written.push(path);
    }

    info!(
        "Normalization complete: records={}, kept={}, rejected={}",
        report.records, report.entries_kept, report.entries_rejected
    );
    Ok(report)
}
