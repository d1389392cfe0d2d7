//! CLI interface and argument parsing
//!
//! This module builds the command-line surface from the parsed
//! configuration and drives task execution.

pub mod app;

// Re-export main types
pub use app::*;
