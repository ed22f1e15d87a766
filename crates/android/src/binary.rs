//! Printable string search and in-place replacement inside binary files
//!
//! Strings are extracted the way `strings -a` does it. Replacements never
//! change a file's size: the new string is NUL terminated and padded to the
//! length of the old one, and anything longer is refused.

use droidtools_core::error::{Error, Result};
use droidtools_core::file_scanner::FileScanner;
use rayon::prelude::*;
use regex::bytes::{NoExpand, Regex as BytesRegex};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Shortest printable run reported by default
pub const DEFAULT_MIN_LENGTH: usize = 4;

/// Compile a user pattern, where `*` stands for any run of characters
pub fn pattern_to_regex(pattern: &str) -> Result<Regex> {
    if pattern.is_empty() {
        return Err(Error::validation("Search pattern must not be empty"));
    }
    let expanded = pattern.replace('*', ".*");
    Regex::new(&expanded).map_err(|e| {
        Error::validation(format!("Invalid pattern {:?}: {}", pattern, e))
            .with_suggestion("Patterns are regular expressions with '*' as a wildcard")
    })
}

fn is_printable(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7e | b'\t')
}

/// Runs of printable ASCII at least `min_len` bytes long
pub fn extract_strings(bytes: &[u8], min_len: usize) -> Vec<String> {
    let min_len = min_len.max(1);
    bytes
        .split(|b| !is_printable(*b))
        .filter(|run| run.len() >= min_len)
        .map(|run| run.iter().map(|&b| char::from(b)).collect())
        .collect()
}

/// Scan result for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatches {
    pub path: PathBuf,
    /// Distinct matched substrings, in descending order
    pub matches: Vec<String>,
    /// Nothing matched but the replacement text is already present
    pub replacement_found: bool,
}

impl FileMatches {
    fn is_reportable(&self) -> bool {
        !self.matches.is_empty() || self.replacement_found
    }
}

/// Pattern search over files and trees
#[derive(Debug, Clone)]
pub struct StringScanner {
    regex: Regex,
    min_len: usize,
    exclude_dirs: Vec<String>,
    replacement: Option<String>,
}

impl StringScanner {
    pub fn new(regex: Regex) -> Self {
        Self {
            regex,
            min_len: DEFAULT_MIN_LENGTH,
            exclude_dirs: vec![".git".to_string(), ".repo".to_string()],
            replacement: None,
        }
    }

    pub fn min_length(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    pub fn exclude_dirs<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.exclude_dirs = names.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    /// Also report files that already contain `replacement`
    pub fn replacement(mut self, replacement: Option<&str>) -> Self {
        self.replacement = replacement.map(str::to_string);
        self
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Matches in raw bytes and whether the replacement is already present
    pub fn scan_bytes(&self, bytes: &[u8]) -> (Vec<String>, bool) {
        let strings = extract_strings(bytes, self.min_len);

        let distinct: BTreeSet<&str> = strings
            .iter()
            .flat_map(|s| self.regex.find_iter(s))
            .map(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .collect();
        let matches: Vec<String> = distinct.into_iter().rev().map(str::to_string).collect();

        let replacement_found = matches.is_empty()
            && self
                .replacement
                .as_deref()
                .is_some_and(|r| !r.is_empty() && strings.iter().any(|s| s.contains(r)));

        (matches, replacement_found)
    }

    pub fn scan_file(&self, path: &Path) -> Result<FileMatches> {
        let bytes = std::fs::read(path)
            .map_err(Error::from)
            .map_err(|e| e.with_context(format!("Reading {}", path.display())))?;
        let (matches, replacement_found) = self.scan_bytes(&bytes);
        Ok(FileMatches {
            path: path.to_path_buf(),
            matches,
            replacement_found,
        })
    }

    /// Scan every file under `root` in parallel
    ///
    /// Only files with something to report are returned, in path order.
    pub fn scan_tree(&self, root: &Path) -> Result<Vec<FileMatches>> {
        let files = FileScanner::new(root)
            .exclude_dirs(&self.exclude_dirs)
            .scan()?;
        debug!(root = %root.display(), files = files.len(), "Scanning files");

        let results: Vec<FileMatches> = files
            .par_iter()
            .filter_map(|path| match self.scan_file(path) {
                Ok(found) => found.is_reportable().then_some(found),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping unreadable file");
                    None
                }
            })
            .collect();

        info!(
            root = %root.display(),
            scanned = files.len(),
            matched = results.len(),
            "Binary scan finished"
        );
        Ok(results)
    }
}

/// A size-preserving byte substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub old: String,
    pub new: String,
    needle: Vec<u8>,
    replacement: Vec<u8>,
}

impl Edit {
    /// NUL terminated old string as it appears on disk
    pub fn needle(&self) -> &[u8] {
        &self.needle
    }

    /// NUL padded new string, same length as [`Edit::needle`]
    pub fn replacement(&self) -> &[u8] {
        &self.replacement
    }
}

/// Outcome of planning a replacement for one matched string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    Ready(Edit),
    TooLong { old: String, new: String },
}

/// Work out what `old` becomes under `regex` and `replacement`
///
/// `$1`-style group references in `replacement` are expanded.
pub fn plan_replacement(old: &str, regex: &Regex, replacement: &str) -> Replacement {
    let new = regex.replace_all(old, replacement).into_owned();

    let mut needle = old.as_bytes().to_vec();
    needle.push(0);
    let mut padded = new.as_bytes().to_vec();
    padded.push(0);

    if padded.len() > needle.len() {
        return Replacement::TooLong {
            old: old.to_string(),
            new,
        };
    }
    padded.resize(needle.len(), 0);

    Replacement::Ready(Edit {
        old: old.to_string(),
        new,
        needle,
        replacement: padded,
    })
}

fn literal_bytes_regex(needle: &[u8]) -> Result<BytesRegex> {
    let mut pattern = String::with_capacity(needle.len() * 4 + 5);
    pattern.push_str("(?-u)");
    for byte in needle {
        let _ = write!(pattern, "\\x{:02X}", byte);
    }
    Ok(BytesRegex::new(&pattern)?)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Apply `edits` to the file at `path`, returning the number of replacements
///
/// The new content goes to `<file>.tmp`, receives the original permissions and
/// is renamed over the original. A file with no occurrences is left alone.
pub fn apply_edits(path: &Path, edits: &[Edit]) -> Result<usize> {
    let mut content = std::fs::read(path)?;
    let mut replaced = 0;

    for edit in edits {
        let needle = literal_bytes_regex(&edit.needle)?;
        let count = needle.find_iter(&content).count();
        if count == 0 {
            continue;
        }
        content = needle
            .replace_all(&content, NoExpand(&edit.replacement))
            .into_owned();
        replaced += count;
        debug!(file = %path.display(), old = %edit.old, new = %edit.new, count, "Replaced string");
    }

    if replaced == 0 {
        return Ok(0);
    }

    let tmp = tmp_path(path);
    let written = std::fs::write(&tmp, &content)
        .and_then(|_| std::fs::metadata(path))
        .and_then(|meta| std::fs::set_permissions(&tmp, meta.permissions()))
        .and_then(|_| std::fs::rename(&tmp, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(Error::from(e).with_context(format!("Rewriting {}", path.display())));
    }

    Ok(replaced)
}
