//! Configuration schema definitions
//!
//! Every field defaults to the value the CLI uses when no file is present.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub apktool: ApktoolConfig,

    #[serde(default)]
    pub overlay: OverlayConfig,

    #[serde(default)]
    pub binary: BinaryConfig,
}

/// External unpacking tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApktoolConfig {
    /// Executable name or path looked up on PATH
    #[serde(default = "default_apktool_binary")]
    pub binary: String,

    /// Maximum JVM heap handed to the tool, e.g. "2048m"
    #[serde(default = "default_heap")]
    pub heap: String,
}

impl Default for ApktoolConfig {
    fn default() -> Self {
        Self {
            binary: default_apktool_binary(),
            heap: default_heap(),
        }
    }
}

fn default_apktool_binary() -> String {
    "apktool".to_string()
}

fn default_heap() -> String {
    "2048m".to_string()
}

/// Overlay generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Differences file
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Cleaned (common keys only) resource file
    #[serde(default = "default_cleaned_output")]
    pub cleaned_output: PathBuf,

    /// Directory receiving scaffolded overlay packages
    #[serde(default = "default_rro_output")]
    pub rro_output: PathBuf,

    /// Name in the generated copyright header
    #[serde(default = "default_copyright_holder")]
    pub copyright_holder: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            cleaned_output: default_cleaned_output(),
            rro_output: default_rro_output(),
            copyright_holder: default_copyright_holder(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("config.xml")
}

fn default_cleaned_output() -> PathBuf {
    PathBuf::from("cleaned_config.xml")
}

fn default_rro_output() -> PathBuf {
    PathBuf::from("rro_output")
}

fn default_copyright_holder() -> String {
    "The Android Open Source Project".to_string()
}

/// Binary string scanner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryConfig {
    /// Directory names never descended into
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// Shortest printable run reported as a string
    #[serde(default = "default_min_string_length")]
    pub min_string_length: usize,
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: default_exclude_dirs(),
            min_string_length: default_min_string_length(),
        }
    }
}

fn default_exclude_dirs() -> Vec<String> {
    vec![".git".to_string(), ".repo".to_string()]
}

fn default_min_string_length() -> usize {
    4
}
