//! Core utilities for droidtools
//!
//! This crate provides shared functionality used by every tool:
//!
//! - **Error handling**: errors with codes, context, recovery suggestions and exit statuses
//! - **File scanning**: deterministic file discovery with filtering
//! - **Process execution**: command execution with child-scoped environment
//! - **Configuration**: TOML-based configuration with defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use droidtools_core::{config::Config, process::command_exists};
//!
//! let config = Config::load(None).expect("Invalid configuration");
//! if !command_exists(&config.schema.apktool.binary) {
//!     eprintln!("apktool is not installed");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod file_scanner;
pub mod process;

pub use error::{Error, ErrorCode, Result, ResultExt};

