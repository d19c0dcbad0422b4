//! Configuration model for ftx.
//!
//! This module defines the Config struct that controls how long handles wait
//! for contended lock files, how often they poll, and how staged updates are
//! moved into place. It supports forward-compatible YAML parsing (unknown
//! fields are ignored), sensible defaults for optional fields, and validation
//! of config values.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use types::ReplaceMode;
