//! Record paths and all-or-nothing writes.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use discurso_core::{DocumentInfo, Error, Result};

/// `<root>/<year-or-unknown>/<stem>.json`
pub fn record_path(root: &Path, doc: &DocumentInfo) -> PathBuf {
    root.join(doc.partition()).join(format!("{}.json", doc.stem))
}

/// `<root>/<year-or-unknown>/<stem>.rejected.json`
pub fn rejected_path(root: &Path, doc: &DocumentInfo) -> PathBuf {
    root.join(doc.partition())
        .join(format!("{}.rejected.json", doc.stem))
}

/// Write `bytes` to a temporary file next to `path`, then rename it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| Error::Output(format!("{}: {}", path.display(), e)))?;
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Pretty-print `value` (two-space indent, non-ASCII kept) and write it atomically.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use discurso_classify::TopicBuckets;

    #[test]
    fn test_record_paths() {
        let doc = DocumentInfo::from_path("/in/informe_enero-marzo_2016.pdf");
        let root = Path::new("/out");
        assert_eq!(
            record_path(root, &doc),
            PathBuf::from("/out/2016/informe_enero-marzo_2016.json")
        );
        let doc = DocumentInfo::from_path("/in/informe.pdf");
        assert_eq!(
            rejected_path(root, &doc),
            PathBuf::from("/out/unknown/informe.rejected.json")
        );
    }

    #[test]
    fn test_write_json_creates_dirs_and_keeps_accents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2020").join("informe.json");
        let buckets = TopicBuckets {
            inflation_prioritized: vec!["La inflación en México subió.".into()],
            ..Default::default()
        };
        write_json(&path, &buckets).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("La inflación en México subió."));
        assert!(text.starts_with("{\n  \"gdp_prioritized\": []"));
        let back: TopicBuckets = serde_json::from_str(&text).unwrap();
        assert_eq!(back, buckets);
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        write_atomic(&path, b"old contents").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
