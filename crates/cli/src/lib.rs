//! CLI utilities for droidtools
//!
//! Provides shared CLI functionality:
//! - Terminal output formatting
//! - Progress indicators
//! - Confirmation prompts

#![warn(missing_docs)]

pub mod output;
pub mod progress;
pub mod prompt;
