//! Metadata companions for bucket records.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use discurso_classify::TopicBuckets;
use discurso_core::{Error, Result};

use crate::preprocess::PREPROCESSED_PREFIX;
use crate::records::{list_records, read_record, METADATA_SUFFIX};
use crate::writer::write_json;

pub const DEFAULT_SOURCE: &str = "Banxico";

static FOUR_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());

/// Month ranges found in report filenames, with their quarter and first month.
const QUARTERS: &[(&str, &str, u32)] = &[
    ("enero-marzo", "Q1", 1),
    ("abril-junio", "Q2", 4),
    ("julio-septiembre", "Q3", 7),
    ("octubre-diciembre", "Q4", 10),
];

const GDP_TERMS: &[&str] = &["pib", "producto interno bruto", "crecimiento económico"];
const INFLATION_TERMS: &[&str] = &["inflación", "ipc", "precios al consumidor"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub document_id: String,
    pub filename: String,
    /// First day of the quarter, `YYYY-MM-DD`.
    pub date: Option<String>,
    pub quarter: Option<String>,
    pub indicators: Vec<String>,
    pub source: String,
    pub text_file: String,
    pub num_tokens: usize,
    pub num_sentences: usize,
    pub num_sections: usize,
    pub active_sections: Vec<String>,
}

/// Quarter start date and label from a filename such as
/// `informe_julio-septiembre_2021.json`. The year falls back to `0000`.
pub fn quarter_from_filename(filename: &str) -> Option<(String, &'static str)> {
    let name = filename.to_lowercase();
    let (_, quarter, month) = QUARTERS.iter().find(|(label, _, _)| name.contains(label))?;
    let year: i32 = FOUR_DIGITS
        .find(&name)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    let date = NaiveDate::from_ymd_opt(year, *month, 1)?;
    Some((date.format("%Y-%m-%d").to_string(), *quarter))
}

fn mentions(sections: &[String], terms: &[&str]) -> bool {
    sections
        .iter()
        .any(|text| terms.iter().any(|t| text.contains(t)))
}

/// Indicators mentioned anywhere in the record, in a fixed order.
pub fn tag_indicators(buckets: &TopicBuckets) -> Vec<String> {
    let sections: Vec<String> = buckets
        .sections()
        .iter()
        .map(|(_, entries)| entries.join(" ").to_lowercase())
        .collect();
    let mut indicators = Vec::new();
    if mentions(&sections, GDP_TERMS) {
        indicators.push("GDP".to_string());
    }
    if mentions(&sections, INFLATION_TERMS) {
        indicators.push("inflation".to_string());
    }
    indicators
}

pub fn build_metadata(record: &Path, buckets: &TopicBuckets, source: &str) -> Result<DocumentMetadata> {
    let filename = record
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Output(format!("unnamed record {}", record.display())))?
        .to_string();
    let stem = record
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let document_id = stem.replace(PREPROCESSED_PREFIX, "");
    let (date, quarter) = match quarter_from_filename(&filename) {
        Some((date, quarter)) => (Some(date), Some(quarter.to_string())),
        None => (None, None),
    };

    let mut num_tokens = 0;
    let mut num_sentences = 0;
    let mut active_sections = Vec::new();
    for (name, entries) in buckets.sections() {
        if entries.is_empty() {
            continue;
        }
        active_sections.push(name.to_string());
        num_sentences += entries.len();
        num_tokens += entries
            .iter()
            .map(|e| e.split_whitespace().count())
            .sum::<usize>();
    }

    Ok(DocumentMetadata {
        document_id,
        filename,
        date,
        quarter,
        indicators: tag_indicators(buckets),
        source: source.to_string(),
        text_file: record.display().to_string(),
        num_tokens,
        num_sentences,
        num_sections: active_sections.len(),
        active_sections,
    })
}

/// `<output_dir>/<stem>_metadata.json`
pub fn metadata_path(output_dir: &Path, record: &Path) -> PathBuf {
    let stem = record
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{}{}", stem, METADATA_SUFFIX))
}

/// Write a metadata companion for every record directly inside `input_dir`.
pub fn run_metadata(input_dir: &Path, output_dir: &Path, source: &str) -> Result<Vec<PathBuf>> {
    let records = list_records(input_dir, false)?;
    let mut written = Vec::with_capacity(records.len());
    for record in &records {
        let buckets = read_record(record)?;
        let metadata = build_metadata(record, &buckets, source)?;
        let path = metadata_path(output_dir, record);
        write_json(&path, &metadata)?;
        written.push(path);
    }
    info!(
        "Wrote {} metadata files from {} into {}",
        written.len(),
        input_dir.display(),
        output_dir.display()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_from_filename() {
        assert_eq!(
            quarter_from_filename("preprocessed_Informe_Julio-Septiembre_2021.json"),
            Some(("2021-07-01".to_string(), "Q3"))
        );
        assert_eq!(
            quarter_from_filename("informe_enero-marzo.json"),
            Some(("0000-01-01".to_string(), "Q1"))
        );
        assert_eq!(quarter_from_filename("informe_2021.json"), None);
    }

    #[test]
    fn test_tag_indicators_fixed_order() {
        let buckets = TopicBuckets {
            inflation_other: vec!["la inflación bajó".into()],
            gdp_other: vec!["el PIB creció".into()],
            ..Default::default()
        };
        assert_eq!(tag_indicators(&buckets), vec!["GDP", "inflation"]);
        assert!(tag_indicators(&TopicBuckets::default()).is_empty());
    }

    #[test]
    fn test_build_metadata() {
        let buckets = TopicBuckets {
            gdp_prioritized: vec!["pib méxico creció".into(), "crecimiento económico sólido".into()],
            inflation_other: vec!["ipc subió".into()],
            ..Default::default()
        };
        let record = Path::new("data/preprocessed/preprocessed_informe_abril-junio_2019.json");
        let meta = build_metadata(record, &buckets, DEFAULT_SOURCE).unwrap();

        assert_eq!(meta.document_id, "informe_abril-junio_2019");
        assert_eq!(meta.filename, "preprocessed_informe_abril-junio_2019.json");
        assert_eq!(meta.date.as_deref(), Some("2019-04-01"));
        assert_eq!(meta.quarter.as_deref(), Some("Q2"));
        assert_eq!(meta.indicators, vec!["GDP", "inflation"]);
        assert_eq!(meta.source, "Banxico");
        assert_eq!(meta.num_tokens, 8);
        assert_eq!(meta.num_sentences, 3);
        assert_eq!(meta.num_sections, 2);
        assert_eq!(meta.active_sections, vec!["gdp_prioritized", "inflation_other"]);
    }

    #[test]
    fn test_run_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("preprocessed");
        let output = dir.path().join("metadata");
        write_json(&input.join("preprocessed_a_2020.json"), &TopicBuckets::default()).unwrap();
        std::fs::write(input.join("rejected_sentences.txt"), "x\n").unwrap();

        let written = run_metadata(&input, &output, DEFAULT_SOURCE).unwrap();
        assert_eq!(written, vec![output.join("preprocessed_a_2020_metadata.json")]);

        let text = std::fs::read_to_string(&written[0]).unwrap();
        let meta: DocumentMetadata = serde_json::from_str(&text).unwrap();
        assert_eq!(meta.document_id, "a_2020");
        assert_eq!(meta.date, None);
        assert!(text.contains("\"date\": null"));
    }
}
