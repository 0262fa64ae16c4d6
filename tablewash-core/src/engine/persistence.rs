//! Output directory layout: atomic part files plus a `_schema.json` manifest.

use crate::data::Schema;
use crate::engine::OutputFormat;
use crate::error::WashError;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "_schema.json";

/// Describes the part files in an output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format: OutputFormat,
    pub schema: Schema,
}

/// Atomically write raw bytes to a file.
///
/// Writes to a `.tmp` sibling file, then renames onto the target path.
/// Creates parent directories if they don't exist.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Serialize `data` as pretty JSON and write it atomically.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
    atomic_write(path, json.as_bytes())
}

/// The manifest of `dir`, or `None` if it has none.
pub fn read_manifest(dir: &Path) -> Result<Option<Manifest>, WashError> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

pub fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<(), WashError> {
    atomic_write_json(&dir.join(MANIFEST_FILE), manifest)?;
    Ok(())
}

/// `part-00007.csv` → `Some(7)` when the extension matches.
fn part_number(path: &Path, extension: &str) -> Option<u32> {
    if path.extension()?.to_str()? != extension {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("part-")?
        .parse()
        .ok()
}

/// Part files in `dir` with the given extension, in part order.
pub fn list_parts(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, WashError> {
    let mut parts = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(n) = part_number(&path, extension) {
            parts.push((n, path));
        }
    }
    parts.sort();
    Ok(parts.into_iter().map(|(_, p)| p).collect())
}

/// Data files in a directory that has no manifest: every visible file with
/// the extension, sorted by name.
pub fn list_data_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, WashError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('_') || n.starts_with('.'));
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)));
        if path.is_file() && !hidden && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Path for the next part file in `dir`.
pub fn next_part_path(dir: &Path, format: OutputFormat) -> Result<PathBuf, WashError> {
    let ext = format.extension();
    let next = list_parts(dir, ext)?
        .iter()
        .filter_map(|p| part_number(p, ext))
        .max()
        .map_or(0, |n| n + 1);
    Ok(dir.join(format!("part-{next:05}.{ext}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ColumnType, Field};
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("part-00000.csv");
        atomic_write(&path, b"x\n1\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\n1\n");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_manifest_round_trip() {
        let dir = TempDir::new().unwrap();
        assert!(read_manifest(dir.path()).unwrap().is_none());
        let manifest = Manifest {
            format: OutputFormat::Parquet,
            schema: Schema::new(vec![Field::new("x", ColumnType::Float)]).unwrap(),
        };
        write_manifest(dir.path(), &manifest).unwrap();
        assert_eq!(read_manifest(dir.path()).unwrap(), Some(manifest));
    }

    #[test]
    fn test_next_part_numbering() {
        let dir = TempDir::new().unwrap();
        let first = next_part_path(dir.path(), OutputFormat::Csv).unwrap();
        assert!(first.ends_with("part-00000.csv"));
        std::fs::write(&first, "").unwrap();
        std::fs::write(dir.path().join("part-00004.csv"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        let next = next_part_path(dir.path(), OutputFormat::Csv).unwrap();
        assert!(next.ends_with("part-00005.csv"));
        assert_eq!(list_parts(dir.path(), "csv").unwrap().len(), 2);
    }
}
