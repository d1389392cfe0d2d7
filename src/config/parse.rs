//! Configuration file parsing and discovery

use serde::Deserialize;
use serde_yaml::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::decode::{self, RawTask};
use crate::config::types::{Config, Task, TaskOption};
use crate::error::{ConfigError, ConfigResult, WhiskError};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["whisk.yml", "whisk.yaml"];

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    let cwd = env::current_dir()
        .map_err(|e| ConfigError::Invalid(format!("Failed to get current directory: {}", e)))?;
    find_config_file_from(cwd)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// The document shape before include resolution and name injection.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    usage: Option<String>,

    #[serde(default, deserialize_with = "de_interpreter")]
    interpreter: Option<Vec<String>>,

    #[serde(default, deserialize_with = "de_options")]
    options: Vec<TaskOption>,

    #[serde(default, deserialize_with = "de_tasks")]
    tasks: Vec<(String, RawTask)>,
}

fn de_interpreter<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    decode::interpreter(&value)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

fn de_options<'de, D>(deserializer: D) -> Result<Vec<TaskOption>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    decode::option_map(&value).map_err(serde::de::Error::custom)
}

fn de_tasks<'de, D>(deserializer: D) -> Result<Vec<(String, RawTask)>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    decode::task_map(&value).map_err(serde::de::Error::custom)
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, WhiskError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e)))?;

    parse_config(&contents, Some(path))
}

/// Parse configuration from a string.
///
/// `config_path` anchors include resolution; passing `None` makes any
/// `include` entry a configuration error.
pub fn parse_config(yaml: &str, config_path: Option<&Path>) -> Result<Config, WhiskError> {
    let raw: RawConfig = serde_yaml::from_str(yaml)?;
    let base_dir = config_path.and_then(Path::parent);

    let mut tasks = Vec::with_capacity(raw.tasks.len());
    for (name, entry) in raw.tasks {
        let mut task = match entry {
            RawTask::Inline(task) => *task,
            RawTask::Include(path) => {
                let base = base_dir.ok_or_else(|| {
                    ConfigError::IncludeFile {
                        path: PathBuf::from(&path),
                        error: "no config directory to resolve against".to_string(),
                    }
                })?;
                load_included_task(&base.join(&path))?
            }
        };
        task.name = name;
        tasks.push(task);
    }

    Ok(Config {
        name: raw.name,
        usage: raw.usage,
        interpreter: raw.interpreter,
        options: raw.options,
        tasks,
    })
}

/// Load a task definition from an included file.
///
/// The file is parsed in strict mode; an include inside it is not followed.
fn load_included_task(path: &Path) -> Result<Task, WhiskError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::IncludeFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let task: Task = serde_yaml::from_str(&contents).map_err(|e| ConfigError::IncludeFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    Ok(task)
}

/// Parse configuration with automatic file discovery
pub fn parse_config_auto() -> Result<(Config, PathBuf), WhiskError> {
    let config_path = find_config_file()?;
    let config = parse_config_file(&config_path)?;
    Ok((config, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_simple_config() {
        let yaml = r#"
tasks:
  hello:
    usage: Say hello
    run: echo "hello"
"#;
        let config = parse_config(yaml, None).unwrap();
        assert_eq!(config.tasks.len(), 1);
        assert_eq!(config.tasks[0].name, "hello");
        assert!(config.task("hello").is_some());
    }

    #[test]
    fn test_parse_config_with_name_and_usage() {
        let yaml = r#"
name: my-app
usage: My application
tasks:
  hello:
    run: echo "hello"
"#;
        let config = parse_config(yaml, None).unwrap();
        assert_eq!(config.name, Some("my-app".to_string()));
        assert_eq!(config.usage, Some("My application".to_string()));
    }

    #[test]
    fn test_parse_config_with_interpreter() {
        let yaml = r#"
interpreter:
  - bash
  - -c
tasks:
  hello:
    run: echo "hello"
"#;
        let config = parse_config(yaml, None).unwrap();
        assert_eq!(
            config.interpreter,
            Some(vec!["bash".to_string(), "-c".to_string()])
        );
    }

    #[test]
    fn test_parse_config_with_global_options() {
        let yaml = r#"
options:
  environment:
    default: dev
tasks:
  deploy:
    run: echo ${environment}
"#;
        let config = parse_config(yaml, None).unwrap();
        assert_eq!(config.options.len(), 1);
        assert_eq!(config.options[0].name, "environment");
    }

    #[test]
    fn test_parse_config_rejects_unknown_top_level_key() {
        let result = parse_config("task:\n  oops: {run: echo hi}\n", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_task_order_preserved() {
        let yaml = r#"
tasks:
  zulu: {run: echo z}
  alpha: {run: echo a}
  mike: {run: echo m}
"#;
        let config = parse_config(yaml, None).unwrap();
        let names: Vec<&str> = config.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("whisk.yml");

        fs::write(&config_path, "tasks:\n  test:\n    run: echo test\n").unwrap();

        let found = find_config_file_from(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("whisk.yml");
        let sub_dir = temp_dir.path().join("subdir");

        fs::create_dir(&sub_dir).unwrap();
        fs::write(&config_path, "tasks:\n  test:\n    run: echo test\n").unwrap();

        let found = find_config_file_from(sub_dir).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_config_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = find_config_file_from(temp_dir.path().to_path_buf());
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_include_substitutes_task() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("whisk.yml");
        fs::write(
            temp_dir.path().join("lint.yml"),
            "usage: Run the linter\nrun: echo lint\n",
        )
        .unwrap();
        fs::write(&config_path, "tasks:\n  lint:\n    include: lint.yml\n").unwrap();

        let config = parse_config_file(&config_path).unwrap();
        let task = config.task("lint").unwrap();
        assert_eq!(task.usage.as_deref(), Some("Run the linter"));
        assert_eq!(task.run[0].command[0].exec, "echo lint");
    }

    #[test]
    fn test_include_with_extra_fields_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("whisk.yml");
        fs::write(
            &config_path,
            "tasks:\n  lint:\n    include: lint.yml\n    usage: nope\n",
        )
        .unwrap();

        let result = parse_config_file(&config_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_include_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("whisk.yml");
        fs::write(&config_path, "tasks:\n  lint:\n    include: missing.yml\n").unwrap();

        let result = parse_config_file(&config_path);
        assert!(matches!(
            result,
            Err(WhiskError::Config(ConfigError::IncludeFile { .. }))
        ));
    }

    #[test]
    fn test_included_file_is_strict() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("whisk.yml");
        fs::write(temp_dir.path().join("lint.yml"), "runs: echo oops\n").unwrap();
        fs::write(&config_path, "tasks:\n  lint:\n    include: lint.yml\n").unwrap();

        let result = parse_config_file(&config_path);
        assert!(result.is_err());
    }
}
