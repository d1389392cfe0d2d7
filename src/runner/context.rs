//! Execution context for task running
//!
//! The context carries the configuration path, the interpreter, the logger,
//! and the stack of executing tasks. It is cloned on every push so that
//! recursion branches never alias each other's stack.

use std::path::{Path, PathBuf};

use crate::ui::Logger;

/// State threaded through task execution.
#[derive(Debug, Clone)]
pub struct Context {
    /// Configuration file path
    pub config_path: PathBuf,

    /// Interpreter argv, e.g. `["sh", "-c"]`
    pub interpreter: Vec<String>,

    /// Progress output
    pub logger: Logger,

    /// Tasks currently executing, outermost first
    task_stack: Vec<Frame>,
}

/// One entry in the execution stack.
#[derive(Debug, Clone)]
pub struct Frame {
    pub name: String,
    pub quiet: bool,
}

impl Context {
    pub fn new(config_path: PathBuf, logger: Logger) -> Self {
        Context {
            config_path,
            interpreter: vec!["sh".to_string(), "-c".to_string()],
            logger,
            task_stack: Vec::new(),
        }
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        if !interpreter.is_empty() {
            self.interpreter = interpreter;
        }
        self
    }

    /// A copy of this context with one more task on the stack.
    pub fn with_task(&self, name: &str, quiet: bool) -> Self {
        let mut ctx = self.clone();
        ctx.task_stack.push(Frame {
            name: name.to_string(),
            quiet,
        });
        ctx
    }

    /// Check whether a task is already executing (recursion guard).
    pub fn in_stack(&self, name: &str) -> bool {
        self.task_stack.iter().any(|f| f.name == name)
    }

    /// Task names from outermost to innermost.
    pub fn stack_names(&self) -> Vec<&str> {
        self.task_stack.iter().map(|f| f.name.as_str()).collect()
    }

    /// A command is silent when any executing task asked for quiet.
    pub fn any_quiet(&self) -> bool {
        self.task_stack.iter().any(|f| f.quiet)
    }

    /// The directory holding the config file; commands run here.
    pub fn config_dir(&self) -> &Path {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}
