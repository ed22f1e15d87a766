//! File scanning utilities
//!
//! Provides deterministic file discovery and filtering across a directory tree.

use crate::error::{Error, Result};
use std::path::PathBuf;
use walkdir::{DirEntry, WalkDir};

/// File scanner with configurable filters
///
/// Files are returned in lexicographic path order so repeated scans of the
/// same tree always agree.
pub struct FileScanner {
    root: PathBuf,
    extensions: Vec<String>,
    exclude_dirs: Vec<String>,
}

impl FileScanner {
    /// Create a new file scanner rooted at the given path
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: Vec::new(),
            exclude_dirs: Vec::new(),
        }
    }

    /// Filter by file extensions (e.g., "xml", "so")
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Skip directories with any of these names
    pub fn exclude_dirs<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.exclude_dirs = names.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    /// Scan and return matching files
    ///
    /// A missing root is an error; unreadable entries below it are skipped.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Err(Error::directory_not_found(&self.root));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.extensions.is_empty() {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if !self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
                    continue;
                }
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        // The root itself is always walked.
        if entry.depth() == 0 {
            return false;
        }
        let Some(name) = entry.file_name().to_str() else {
            return false;
        };
        entry.file_type().is_dir() && self.exclude_dirs.iter().any(|d| d == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_file_scanner_new() {
        let scanner = FileScanner::new("/tmp");
        assert_eq!(scanner.root, PathBuf::from("/tmp"));
        assert!(scanner.extensions.is_empty());
    }

    #[test]
    fn test_scan_is_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b/values.xml");
        touch(dir.path(), "a/strings.xml");
        touch(dir.path(), "a/notes.txt");

        let files = FileScanner::new(dir.path()).with_extensions(&["xml"]).scan().unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(rel, vec![PathBuf::from("a/strings.xml"), PathBuf::from("b/values.xml")]);
    }

    #[test]
    fn test_scan_excludes_named_dirs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".git/objects/blob");
        touch(dir.path(), ".repo/manifest.xml");
        touch(dir.path(), "lib/libfoo.so");

        let files = FileScanner::new(dir.path())
            .exclude_dirs(&[".git", ".repo"])
            .scan()
            .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("lib/libfoo.so"));
    }

    #[test]
    fn test_scan_missing_root() {
        let err = FileScanner::new("/definitely/not/here").scan().unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::DirectoryNotFound);
    }

    #[test]
    fn test_scan_single_file_root() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "firmware.bin");
        let files = FileScanner::new(dir.path().join("firmware.bin")).scan().unwrap();
        assert_eq!(files.len(), 1);
    }
}
