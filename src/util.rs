//! Small filesystem helpers shared by the writers.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Write `contents` to `path` without ever leaving a half-written file:
/// the data goes to a sibling temp file first and is renamed into place.
/// The parent directory is created when missing.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_parent_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.conf");

        write_atomic(&path, "Section \"Module\"\nEndSection\n").unwrap();
        let read = fs::read_to_string(&path).unwrap();
        assert!(read.starts_with("Section"));
        // no temp file left behind
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.conf");
        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
