//! Task execution engine
//!
//! This module handles the execution of tasks: option resolution,
//! interpolation, conditional guards, command running, and the
//! source/target cache.

pub mod cache;
pub mod command;
pub mod context;
pub mod interpolate;
pub mod option;
pub mod task;
pub mod when;

// Re-export main types
pub use cache::Cache;
pub use command::{capture_command, check_command, flag_interrupt, run_command};
pub use context::Context;
pub use interpolate::{interpolate, interpolate_task};
pub use option::resolve_task;
pub use when::{when_list_passes, when_passes};
