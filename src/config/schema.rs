//! Configuration validation
//!
//! Structural checks that run once after parsing, before any task executes.

use std::collections::HashSet;

use crate::config::types::{Config, Task, TaskOption};
use crate::error::{ConfigError, ConfigResult};

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    let mut names = HashSet::new();
    for option in &config.options {
        if !names.insert(option.name.as_str()) {
            return Err(ConfigError::DuplicateNames(option.name.clone()));
        }
        validate_option(option)?;
    }

    for task in &config.tasks {
        validate_task(config, task)?;
    }

    Ok(())
}

/// Validate a single task
pub fn validate_task(config: &Config, task: &Task) -> ConfigResult<()> {
    // source and target gate the cache together
    if !task.source.is_empty() && task.target.is_empty() {
        return Err(ConfigError::SourceWithoutTarget);
    }
    if !task.target.is_empty() && task.source.is_empty() {
        return Err(ConfigError::TargetWithoutSource);
    }

    let mut names = HashSet::new();
    for option in config.options.iter().chain(task.options.iter()) {
        if !names.insert(option.name.as_str()) {
            return Err(ConfigError::DuplicateNames(option.name.clone()));
        }
    }
    for arg in &task.args {
        if !names.insert(arg.name.as_str()) {
            return Err(ConfigError::DuplicateNames(arg.name.clone()));
        }
    }

    for option in &task.options {
        validate_option(option)?;
    }

    validate_sub_task_refs(config, task)?;

    Ok(())
}

fn validate_option(option: &TaskOption) -> ConfigResult<()> {
    if option.required && !option.default.is_empty() {
        return Err(ConfigError::RequiredWithDefault(option.name.clone()));
    }
    Ok(())
}

/// Check that every sub-task reference points at a defined task and that its
/// overrides line up with the referenced task's surface.
fn validate_sub_task_refs(config: &Config, task: &Task) -> ConfigResult<()> {
    for item in task.run.iter().chain(task.finally.iter()) {
        for sub in &item.task {
            let Some(target) = config.task(&sub.name) else {
                return Err(ConfigError::TaskNotFound(sub.name.clone()));
            };
            if sub.args.len() != target.args.len() {
                return Err(ConfigError::Invalid(format!(
                    "task '{}' passes {} argument(s) to '{}', which takes {}",
                    task.name,
                    sub.args.len(),
                    sub.name,
                    target.args.len()
                )));
            }
            for (name, _) in &sub.options {
                let defined = target.options.iter().any(|o| o.name == *name)
                    || config.options.iter().any(|o| o.name == *name);
                if !defined {
                    return Err(ConfigError::Invalid(format!(
                        "task '{}' passes unknown option '{}' to '{}'",
                        task.name, name, sub.name
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn validated(yaml: &str) -> ConfigResult<()> {
        let config = parse_config(yaml, None).unwrap();
        validate_config(&config)
    }

    #[test]
    fn test_validate_source_without_target() {
        let result = validated(
            r#"
tasks:
  build:
    source: src/**
    run: echo build
"#,
        );
        assert!(matches!(result, Err(ConfigError::SourceWithoutTarget)));
    }

    #[test]
    fn test_validate_target_without_source() {
        let result = validated(
            r#"
tasks:
  build:
    target: out/bin
    run: echo build
"#,
        );
        assert!(matches!(result, Err(ConfigError::TargetWithoutSource)));
    }

    #[test]
    fn test_validate_duplicate_arg_and_option() {
        let result = validated(
            r#"
tasks:
  greet:
    args:
      name: {}
    options:
      name: {}
    run: echo ${name}
"#,
        );
        assert!(matches!(result, Err(ConfigError::DuplicateNames(_))));
    }

    #[test]
    fn test_validate_global_option_conflict() {
        let result = validated(
            r#"
options:
  environment: {}
tasks:
  deploy:
    options:
      environment: {}
    run: echo ${environment}
"#,
        );
        assert!(matches!(result, Err(ConfigError::DuplicateNames(_))));
    }

    #[test]
    fn test_validate_required_with_default() {
        let result = validated(
            r#"
tasks:
  greet:
    options:
      name:
        required: true
        default: world
    run: echo ${name}
"#,
        );
        assert!(matches!(result, Err(ConfigError::RequiredWithDefault(_))));
    }

    #[test]
    fn test_validate_unknown_sub_task() {
        let result = validated(
            r#"
tasks:
  all:
    run:
      - task: missing
"#,
        );
        assert!(matches!(result, Err(ConfigError::TaskNotFound(_))));
    }

    #[test]
    fn test_validate_sub_task_arg_count() {
        let result = validated(
            r#"
tasks:
  greet:
    args:
      first: {}
      second: {}
    run: echo ${first} ${second}
  all:
    run:
      - task:
          name: greet
          args: [only-one]
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_sub_task_unknown_option() {
        let result = validated(
            r#"
tasks:
  greet:
    run: echo hi
  all:
    run:
      - task:
          name: greet
          options:
            loud: "true"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_valid_config() {
        let result = validated(
            r#"
options:
  environment:
    default: dev
tasks:
  greet:
    options:
      name:
        default: world
    run: echo hello ${name}
  all:
    run:
      - task: greet
"#,
        );
        assert!(result.is_ok());
    }
}
