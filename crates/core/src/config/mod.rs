//! Configuration loading and schema definitions
//!
//! Shared configuration types used by every subcommand.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
