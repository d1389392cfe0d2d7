//! Error types for Whisk

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Whisk operations
pub type Result<T> = std::result::Result<T, WhiskError>;

/// Main error type for Whisk
#[derive(Error, Debug)]
pub enum WhiskError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Variable interpolation errors
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl WhiskError {
    /// Process exit code for this error.
    ///
    /// Configuration and validation problems exit 2, a failed child process
    /// propagates its own exit code, everything else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            WhiskError::Config(_) | WhiskError::Yaml(_) | WhiskError::Interpolation(_) => 2,
            WhiskError::Execution(e) => e.exit_code(),
            WhiskError::Io(_) => 1,
        }
    }
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Task source cannot be defined without target")]
    SourceWithoutTarget,

    #[error("Task target cannot be defined without source")]
    TargetWithoutSource,

    #[error("Argument and option '{0}' must have unique names within a task")]
    DuplicateNames(String),

    #[error("Task '{0}' is not defined")]
    TaskNotFound(String),

    #[error("Option '{0}' cannot be required and have a default")]
    RequiredWithDefault(String),

    #[error("Option dependencies form a cycle: {0}")]
    OptionCycle(String),

    #[error("Task recursion detected: {0}")]
    TaskCycle(String),

    #[error("Failed to include file '{path}': {error}")]
    IncludeFile { path: PathBuf, error: String },
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command failed with exit code {0:?}")]
    CommandFailed(Option<i32>),

    #[error("Interrupted")]
    Interrupted,

    #[error("Option '{0}' is required but not provided")]
    MissingOption(String),

    #[error("Invalid value for '{name}': {error}")]
    InvalidValue { name: String, error: String },

    #[error("Task '{task}' expects {expected} argument(s), got {actual}")]
    WrongArgCount {
        task: String,
        expected: usize,
        actual: usize,
    },

    #[error("Cache error: {0}")]
    Cache(String),
}

impl ExecutionError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecutionError::CommandFailed(Some(code)) => *code,
            ExecutionError::CommandFailed(None) => 1,
            // 128 + SIGINT, matching the shell convention
            ExecutionError::Interrupted => 130,
            ExecutionError::MissingOption(_)
            | ExecutionError::InvalidValue { .. }
            | ExecutionError::WrongArgCount { .. } => 2,
            ExecutionError::Cache(_) => 1,
        }
    }
}

/// Variable interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Variable '{0}' is not defined")]
    UndefinedVariable(String),

    #[error("Invalid interpolation syntax: {0}")]
    InvalidSyntax(String),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;
