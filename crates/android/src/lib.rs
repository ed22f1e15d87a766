//! Android platform tooling
//!
//! This crate provides:
//! - Resource tree loading and comparison (`res/values/*.xml`)
//! - Overlay configuration rendering and RRO package scaffolding
//! - apktool integration
//! - Printable string search and replacement in binary files

pub mod apktool;
pub mod binary;
pub mod compare;
pub mod overlay;
pub mod pipeline;
pub mod render;
pub mod resources;

pub use compare::{Difference, Differences};
pub use pipeline::{JobReport, OverlayJob, OverlayRequest};
pub use resources::{ResourceKey, ResourceKind, ResourceMap, ResourceValue};
