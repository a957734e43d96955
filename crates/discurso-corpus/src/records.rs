//! Discovery and loading of bucket records on disk.

use std::path::{Path, PathBuf};

use discurso_classify::TopicBuckets;
use discurso_core::{Error, Result};

pub const RECORD_EXTENSION: &str = "json";
/// Suffix of the rejected-sentence reports written next to records.
pub const REJECTED_SUFFIX: &str = ".rejected.json";
/// Suffix of metadata companions.
pub const METADATA_SUFFIX: &str = "_metadata.json";

fn is_record(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION)
        && !name.ends_with(REJECTED_SUFFIX)
        && !name.ends_with(METADATA_SUFFIX)
}

fn walk(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                walk(&path, recursive, out)?;
            }
        } else if is_record(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Bucket record files under `dir`, sorted by path.
pub fn list_records(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!("record directory {}", dir.display())));
    }
    let mut files = Vec::new();
    walk(dir, recursive, &mut files)?;
    files.sort();
    Ok(files)
}

pub fn read_record(path: &Path) -> Result<TopicBuckets> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Output(format!("invalid record {}: {}", path.display(), e)))
}
