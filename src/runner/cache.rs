//! Source/target cache
//!
//! Skips a task when its declared sources are unchanged and its targets
//! exist. Each configuration file gets its own directory under the user's
//! cache home, keyed by a digest of the absolute config path; inside, one
//! marker file per task holds the last successful source fingerprint as a
//! single hex line.

use directories::ProjectDirs;
use glob::glob;
use globset::{Glob, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::types::Task;
use crate::error::{ExecutionError, ExecutionResult};
use crate::ui::Logger;

pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    /// Open the cache directory for a configuration file.
    pub fn open(config_path: &Path) -> ExecutionResult<Self> {
        let project = ProjectDirs::from("", "", "whisk")
            .ok_or_else(|| ExecutionError::Cache("no cache directory available".to_string()))?;
        let absolute = config_path
            .canonicalize()
            .unwrap_or_else(|_| config_path.to_path_buf());
        let key = hex_digest(absolute.to_string_lossy().as_bytes());
        Ok(Cache::at(project.cache_dir().join(&key[..16])))
    }

    /// Use an explicit directory instead of the user cache home.
    pub fn at(dir: PathBuf) -> Self {
        Cache { dir }
    }

    fn marker_path(&self, task_name: &str) -> PathBuf {
        self.dir.join(task_name)
    }

    /// Check whether a task's work can be skipped.
    ///
    /// Read problems are not errors: a missing or unreadable marker, or an
    /// unreadable source file, just means the task runs.
    pub fn is_up_to_date(&self, task: &Task, config_dir: &Path, logger: &Logger) -> bool {
        if task.source.is_empty() || task.target.is_empty() {
            return false;
        }

        match expand_globs(&task.target, config_dir) {
            Ok(targets) if !targets.is_empty() => {}
            Ok(_) => return false,
            Err(error) => {
                logger.debug(&format!("cache: target glob failed: {error}"));
                return false;
            }
        }

        let current = match fingerprint(&task.source, config_dir) {
            Ok(fp) => fp,
            Err(error) => {
                logger.debug(&format!("cache: fingerprint failed: {error}"));
                return false;
            }
        };

        match fs::read_to_string(self.marker_path(&task.name)) {
            Ok(stored) => stored.trim() == current,
            Err(error) => {
                logger.debug(&format!("cache: no usable marker: {error}"));
                false
            }
        }
    }

    /// Record a successful run. Failures here are task errors.
    pub fn record(&self, task: &Task, config_dir: &Path) -> ExecutionResult<()> {
        if task.source.is_empty() || task.target.is_empty() {
            return Ok(());
        }

        let fp = fingerprint(&task.source, config_dir).map_err(ExecutionError::Cache)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| ExecutionError::Cache(format!("creating cache dir: {e}")))?;
        fs::write(self.marker_path(&task.name), format!("{fp}\n"))
            .map_err(|e| ExecutionError::Cache(format!("writing marker: {e}")))
    }

    /// Drop one task's marker, or the whole directory.
    pub fn clean(&self, task_name: Option<&str>) -> io::Result<()> {
        match task_name {
            Some(name) => {
                let marker = self.marker_path(name);
                if marker.exists() {
                    fs::remove_file(marker)?;
                }
            }
            None => {
                if self.dir.exists() {
                    fs::remove_dir_all(&self.dir)?;
                }
            }
        }
        Ok(())
    }
}

/// Digest over the sorted source files: relative path plus content digest,
/// one record per file.
fn fingerprint(patterns: &[String], base: &Path) -> Result<String, String> {
    let files = expand_globs(patterns, base)?;
    let mut hasher = Sha256::new();
    for path in files {
        let rel = path.strip_prefix(base).unwrap_or(&path);
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        let bytes =
            fs::read(&path).map_err(|e| format!("reading {}: {e}", path.display()))?;
        hasher.update(Sha256::digest(&bytes));
        hasher.update([b'\n']);
    }
    Ok(to_hex(hasher.finalize().as_slice()))
}

/// Expand glob patterns relative to `base`. A leading `!` excludes matches;
/// only files count.
fn expand_globs(patterns: &[String], base: &Path) -> Result<Vec<PathBuf>, String> {
    let mut includes = Vec::new();
    let mut excludes = GlobSetBuilder::new();
    let mut has_excludes = false;

    for pattern in patterns {
        match pattern.strip_prefix('!') {
            Some(rest) => {
                excludes.add(Glob::new(rest).map_err(|e| e.to_string())?);
                has_excludes = true;
            }
            None => includes.push(pattern.as_str()),
        }
    }
    let excludes = excludes.build().map_err(|e| e.to_string())?;

    let mut files = Vec::new();
    for pattern in includes {
        let full = base.join(pattern);
        let entries = glob(&full.to_string_lossy()).map_err(|e| e.to_string())?;
        for entry in entries {
            let path = entry.map_err(|e| e.to_string())?;
            if !path.is_file() {
                continue;
            }
            if has_excludes {
                let rel = path.strip_prefix(base).unwrap_or(&path);
                if excludes.is_match(rel) {
                    continue;
                }
            }
            files.push(path);
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn hex_digest(bytes: &[u8]) -> String {
    to_hex(Sha256::digest(bytes).as_slice())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
