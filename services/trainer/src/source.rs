//! Locating the study material on disk.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// Returns the first `.txt` file in `dir`, by file name.
pub fn find_source_file(dir: &Path) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read data directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("txt") {
            candidates.push(path);
        }
    }
    candidates.sort();
    match candidates.into_iter().next() {
        Some(path) => Ok(path),
        None => bail!("No .txt file found in {}", dir.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_picks_first_text_file_by_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        fs::write(dir.path().join("b_course.txt"), "second").unwrap();
        fs::write(dir.path().join("a_course.txt"), "first").unwrap();
        fs::create_dir(dir.path().join("processed")).unwrap();

        let found = find_source_file(dir.path()).unwrap();
        assert_eq!(found, dir.path().join("a_course.txt"));
    }

    #[test]
    fn test_missing_text_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        let err = find_source_file(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No .txt file"));

        assert!(find_source_file(&dir.path().join("missing")).is_err());
    }
}
