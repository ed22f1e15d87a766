//! apktool integration
//!
//! Locates the tool on PATH and decodes archives into resource trees. The
//! JVM heap override is handed to the child process only.

use droidtools_core::config::ApktoolConfig;
use droidtools_core::error::{Error, Result};
use droidtools_core::process::{run_command, run_command_with_env, which_command};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable the JVM reads extra options from
pub const HEAP_ENV: &str = "_JAVA_OPTIONS";

const STDERR_TAIL_LINES: usize = 10;

/// A resolved apktool executable
#[derive(Debug, Clone)]
pub struct Apktool {
    binary: PathBuf,
    heap: String,
}

impl Apktool {
    /// Resolve the configured binary on PATH
    pub fn locate(config: &ApktoolConfig) -> Result<Self> {
        let binary = which_command(&config.binary)
            .ok_or_else(|| Error::command_not_found(&config.binary))?;
        debug!(binary = %binary.display(), "Found apktool");
        Ok(Self::with_binary(binary, &config.heap))
    }

    /// Use an explicit executable
    pub fn with_binary(binary: impl Into<PathBuf>, heap: &str) -> Self {
        Self {
            binary: binary.into(),
            heap: heap.to_string(),
        }
    }

    /// Path of the executable
    pub fn path(&self) -> &Path {
        &self.binary
    }

    /// JVM options passed through [`HEAP_ENV`]
    pub fn java_options(&self) -> String {
        format!("-Xmx{}", self.heap)
    }

    /// Decode `archive` into `output_dir`, replacing anything already there
    pub fn decode(&self, archive: &Path, output_dir: &Path) -> Result<()> {
        if output_dir.exists() {
            debug!(dir = %output_dir.display(), "Removing previous decode output");
            std::fs::remove_dir_all(output_dir)?;
        }

        let args = [
            OsStr::new("decode"),
            archive.as_os_str(),
            OsStr::new("-o"),
            output_dir.as_os_str(),
        ];
        let java_options = self.java_options();

        info!(archive = %archive.display(), output = %output_dir.display(), "Decoding archive");
        let result = run_command_with_env(&self.binary, &args, &[(HEAP_ENV, java_options.as_str())])?;

        if !result.success {
            let lines: Vec<&str> = result.stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            let mut err = Error::command_failed("apktool", result.exit_code)
                .with_context(format!("Decoding {}", archive.display()));
            if !tail.trim().is_empty() {
                err = err.with_suggestion(tail);
            }
            return Err(err);
        }

        Ok(())
    }

    /// Version reported by `apktool --version`
    pub fn version(&self) -> Option<String> {
        let result = run_command(&self.binary, &["--version"]).ok()?;
        if !result.success {
            return None;
        }
        result.stdout.lines().next().map(|l| l.trim().to_string())
    }
}

/// apktool availability, for `doctor`
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        self.path.is_some()
    }
}

/// Check whether the configured apktool can be found
pub fn check(config: &ApktoolConfig) -> ToolStatus {
    match Apktool::locate(config) {
        Ok(tool) => ToolStatus {
            name: config.binary.clone(),
            version: tool.version(),
            path: Some(tool.binary),
        },
        Err(_) => ToolStatus {
            name: config.binary.clone(),
            path: None,
            version: None,
        },
    }
}
