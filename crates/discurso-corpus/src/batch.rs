//! Sequential batch extraction over a directory of PDFs.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use discurso_classify::Classifier;
use discurso_core::Result;
use discurso_extract::list_pdfs;

use crate::pipeline::{DocumentOutcome, DocumentPipeline};
use crate::writer::{record_path, rejected_path, write_json};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Also write `<stem>.rejected.json` beside each record.
    pub keep_rejected: bool,
}

/// Totals for one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub documents: usize,
    pub sentences: usize,
    pub kept: usize,
    pub rejected: usize,
    pub bucket_entries: usize,
    pub written: Vec<PathBuf>,
    pub duration_ms: u64,
}

impl BatchReport {
    fn record(&mut self, outcome: &DocumentOutcome) {
        self.documents += 1;
        self.sentences += outcome.sentences;
        self.kept += outcome.kept();
        self.rejected += outcome.rejected.len();
        self.bucket_entries += outcome.buckets.len();
    }
}

/// Write the record (and optionally the rejected report) for one outcome.
/// Returns the paths written, record first.
pub fn write_outcome(
    output_dir: &Path,
    outcome: &DocumentOutcome,
    keep_rejected: bool,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let path = record_path(output_dir, &outcome.document);
    write_json(&path, &outcome.buckets)?;
    written.push(path);
    if keep_rejected {
        let path = rejected_path(output_dir, &outcome.document);
        write_json(&path, &outcome.rejected)?;
        written.push(path);
    }
    Ok(written)
}

/// Process every PDF in `input_dir` in sorted order. The first failure stops
/// the run; records already written stay in place.
pub fn run_extraction(classifier: &Classifier, options: &BatchOptions) -> Result<BatchReport> {
    let start = Instant::now();
    let files = list_pdfs(&options.input_dir)?;
    info!(
        "Extracting {} documents from {} into {}",
        files.len(),
        options.input_dir.display(),
        options.output_dir.display()
    );

    let pipeline = DocumentPipeline::new(classifier);
    let mut report = BatchReport::default();
    for path in &files {
        let outcome = pipeline.process_file(path)?;
        let written = write_outcome(&options.output_dir, &outcome, options.keep_rejected)?;
        info!(
            "{} → {}: gdp {}/{} inflation {}/{} (prioritized/other), {} rejected",
            outcome.document.stem,
            written[0].display(),
            outcome.buckets.gdp_prioritized.len(),
            outcome.buckets.gdp_other.len(),
            outcome.buckets.inflation_prioritized.len(),
            outcome.buckets.inflation_other.len(),
            outcome.rejected.len()
        );
        report.record(&outcome);
        report.written.extend(written);
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Extraction complete: documents={}, sentences={}, kept={}, rejected={}, duration={}ms",
        report.documents, report.sentences, report.kept, report.rejected, report.duration_ms
    );
    Ok(report)
}
