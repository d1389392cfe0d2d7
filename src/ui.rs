//! Progress output
//!
//! All user-facing progress goes through [`Logger`] so that verbosity and
//! colour handling live in one place. Command output itself is inherited
//! from the child process and never passes through here.

use colored::Colorize;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

/// Writes progress messages to stderr.
///
/// The `colored` crate handles the `NO_COLOR` convention and tty detection.
#[derive(Debug, Clone, Copy)]
pub struct Logger {
    verbosity: Verbosity,
}

impl Logger {
    pub fn new(verbosity: Verbosity) -> Self {
        Logger { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Echo a command about to run.
    pub fn command(&self, print: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "$".green().bold(), print);
        }
    }

    pub fn task_started(&self, name: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "Task:".cyan().bold(), name);
        }
    }

    pub fn task_finished(&self, name: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", "Finished:".cyan(), name);
        }
    }

    pub fn task_skipped(&self, name: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {} (up to date)", "Skipped:".yellow().bold(), name);
        }
    }

    pub fn error(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {}", "Error:".red().bold(), message);
        }
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", "Debug:".dimmed(), message);
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new(Verbosity::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordering() {
        assert!(Verbosity::Verbose > Verbosity::Normal);
        assert!(Verbosity::Normal > Verbosity::Quiet);
        assert!(Verbosity::Quiet > Verbosity::Silent);
    }

    #[test]
    fn test_default_logger() {
        let logger = Logger::default();
        assert_eq!(logger.verbosity(), Verbosity::Normal);
    }
}
