//! Task execution
//!
//! Drives a resolved, interpolated task: the cache short-circuit, the run
//! loop, the finally list, and sub-task recursion.

use std::collections::HashMap;
use std::env;

use crate::config::types::{Config, RunItem, SubTaskRef, Task};
use crate::error::{ConfigError, Result};
use crate::runner::cache::Cache;
use crate::runner::command::run_command;
use crate::runner::context::Context;
use crate::runner::interpolate::interpolate_task;
use crate::runner::option::resolve_task;
use crate::runner::when::when_list_passes;

impl Task {
    /// Execute this task. `self` must already be resolved and interpolated.
    pub fn execute(&self, config: &Config, ctx: &Context) -> Result<()> {
        if ctx.in_stack(&self.name) {
            let mut stack: Vec<&str> = ctx.stack_names();
            stack.push(&self.name);
            return Err(ConfigError::TaskCycle(stack.join(" -> ")).into());
        }
        let ctx = ctx.with_task(&self.name, self.quiet);

        let uses_cache = !self.source.is_empty() && !self.target.is_empty();
        let cache = if uses_cache {
            Some(Cache::open(&ctx.config_path))
        } else {
            None
        };

        match &cache {
            Some(Ok(cache)) => {
                if cache.is_up_to_date(self, ctx.config_dir(), &ctx.logger) {
                    ctx.logger.task_skipped(&self.name);
                    return Ok(());
                }
            }
            Some(Err(error)) => {
                ctx.logger.debug(&format!("cache unavailable: {error}"));
            }
            None => {}
        }

        ctx.logger.task_started(&self.name);

        // the marker records the run list's success and is written before
        // finally runs; finally errors are reported only when no prior
        // error exists
        let mut result = self.run_list(&self.run, config, &ctx);

        if result.is_ok() {
            result = match cache {
                Some(Ok(cache)) => cache.record(self, ctx.config_dir()).map_err(Into::into),
                Some(Err(error)) => Err(error.into()),
                None => Ok(()),
            };
        }

        let finally_result = self.run_list(&self.finally, config, &ctx);
        ctx.logger.task_finished(&self.name);

        result?;
        finally_result
    }

    fn run_list(&self, items: &[RunItem], config: &Config, ctx: &Context) -> Result<()> {
        for item in items {
            self.run_item(item, config, ctx)?;
        }
        Ok(())
    }

    /// Gate one run item by its guards, then dispatch its single action.
    fn run_item(&self, item: &RunItem, config: &Config, ctx: &Context) -> Result<()> {
        if !when_list_passes(&item.when, &self.raw_vars, ctx)? {
            return Ok(());
        }

        for command in &item.command {
            run_command(command, ctx)?;
        }

        for sub in &item.task {
            self.run_sub_task(sub, config, ctx)?;
        }

        for (name, value) in &item.set_environment {
            match value {
                Some(value) => env::set_var(name, value),
                None => env::remove_var(name),
            }
        }

        Ok(())
    }

    /// Clone the referenced task, apply per-call overrides as if they were
    /// passed on the command line, and recurse.
    fn run_sub_task(&self, sub: &SubTaskRef, config: &Config, ctx: &Context) -> Result<()> {
        let target = config
            .task(&sub.name)
            .ok_or_else(|| ConfigError::TaskNotFound(sub.name.clone()))?;

        let mut task = target.clone();
        let passed: HashMap<String, String> = sub.options.iter().cloned().collect();
        resolve_task(&mut task, config, &passed, &sub.args, ctx)?;
        interpolate_task(&mut task)?;
        task.execute(config, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::error::{ExecutionError, WhiskError};
    use crate::ui::{Logger, Verbosity};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn context(dir: &Path) -> Context {
        Context::new(dir.join("whisk.yml"), Logger::new(Verbosity::Silent))
    }

    fn run_task(yaml: &str, name: &str, dir: &Path) -> Result<()> {
        let config = parse_config(yaml, None).unwrap();
        let mut task = config.task(name).unwrap().clone();
        let ctx = context(dir);
        resolve_task(&mut task, &config, &HashMap::new(), &[], &ctx)?;
        interpolate_task(&mut task)?;
        task.execute(&config, &ctx)
    }

    #[test]
    fn test_execute_simple_task() {
        let temp = TempDir::new().unwrap();
        let yaml = "tasks:\n  hello:\n    run: echo hello\n";
        assert!(run_task(yaml, "hello", temp.path()).is_ok());
    }

    #[test]
    fn test_run_items_execute_in_order() {
        let temp = TempDir::new().unwrap();
        let yaml = "tasks:\n  build:\n    run:\n      - echo one > order.txt\n      - echo two >> order.txt\n";
        run_task(yaml, "build", temp.path()).unwrap();
        let contents = fs::read_to_string(temp.path().join("order.txt")).unwrap();
        assert_eq!(contents, "one\ntwo\n");
    }

    #[test]
    fn test_failure_aborts_remaining_items() {
        let temp = TempDir::new().unwrap();
        let yaml =
            "tasks:\n  fail:\n    run:\n      - exit 4\n      - touch not-reached.txt\n";
        let result = run_task(yaml, "fail", temp.path());
        assert!(matches!(
            result,
            Err(WhiskError::Execution(ExecutionError::CommandFailed(Some(4))))
        ));
        assert!(!temp.path().join("not-reached.txt").exists());
    }

    #[test]
    fn test_finally_runs_after_failure_and_error_is_kept() {
        let temp = TempDir::new().unwrap();
        let yaml = "tasks:\n  fail:\n    run: exit 2\n    finally:\n      - touch cleanup.txt\n";
        let result = run_task(yaml, "fail", temp.path());
        assert!(matches!(
            result,
            Err(WhiskError::Execution(ExecutionError::CommandFailed(Some(2))))
        ));
        assert!(temp.path().join("cleanup.txt").exists());
    }

    #[test]
    fn test_finally_error_surfaces_when_run_succeeds() {
        let temp = TempDir::new().unwrap();
        let yaml = "tasks:\n  t:\n    run: echo fine\n    finally: exit 7\n";
        let result = run_task(yaml, "t", temp.path());
        assert!(matches!(
            result,
            Err(WhiskError::Execution(ExecutionError::CommandFailed(Some(7))))
        ));
    }

    #[test]
    fn test_guard_skips_item_silently() {
        let temp = TempDir::new().unwrap();
        let yaml = "tasks:\n  t:\n    run:\n      - when:\n          command: \"false\"\n        command: touch skipped.txt\n      - touch ran.txt\n";
        run_task(yaml, "t", temp.path()).unwrap();
        assert!(!temp.path().join("skipped.txt").exists());
        assert!(temp.path().join("ran.txt").exists());
    }

    #[test]
    fn test_set_environment_applies_and_unsets() {
        let temp = TempDir::new().unwrap();
        env::set_var("WHISK_TASK_DROP", "before");
        let yaml = "tasks:\n  t:\n    run:\n      - set-environment:\n          WHISK_TASK_SET: hello\n          WHISK_TASK_DROP: ~\n";
        run_task(yaml, "t", temp.path()).unwrap();
        assert_eq!(env::var("WHISK_TASK_SET").unwrap(), "hello");
        assert!(env::var("WHISK_TASK_DROP").is_err());
        env::remove_var("WHISK_TASK_SET");
    }

    #[test]
    fn test_environment_visible_to_later_items() {
        let temp = TempDir::new().unwrap();
        let yaml = "tasks:\n  t:\n    run:\n      - set-environment:\n          WHISK_TASK_VISIBLE: yes\n      - test \"$WHISK_TASK_VISIBLE\" = yes\n";
        run_task(yaml, "t", temp.path()).unwrap();
        env::remove_var("WHISK_TASK_VISIBLE");
    }

    #[test]
    fn test_sub_task_executes_with_overrides() {
        let temp = TempDir::new().unwrap();
        let yaml = "tasks:\n  greet:\n    options:\n      name:\n        default: nobody\n    run: echo ${name} > greeting.txt\n  all:\n    run:\n      - task:\n          name: greet\n          options:\n            name: crew\n";
        run_task(yaml, "all", temp.path()).unwrap();
        let contents = fs::read_to_string(temp.path().join("greeting.txt")).unwrap();
        assert_eq!(contents.trim(), "crew");
    }

    #[test]
    fn test_direct_recursion_is_a_cycle_error() {
        let temp = TempDir::new().unwrap();
        let yaml = "tasks:\n  outer:\n    run:\n      - task: outer\n";
        let result = run_task(yaml, "outer", temp.path());
        match result {
            Err(WhiskError::Config(ConfigError::TaskCycle(stack))) => {
                assert_eq!(stack, "outer -> outer");
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_mutual_recursion_is_a_cycle_error() {
        let temp = TempDir::new().unwrap();
        let yaml = "tasks:\n  a:\n    run:\n      - task: b\n  b:\n    run:\n      - task: a\n";
        let result = run_task(yaml, "a", temp.path());
        match result {
            Err(WhiskError::Config(ConfigError::TaskCycle(stack))) => {
                assert_eq!(stack, "a -> b -> a");
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_guarded_run_item_with_equal() {
        let temp = TempDir::new().unwrap();
        let yaml = "tasks:\n  t:\n    options:\n      env:\n        default: dev\n    run:\n      - when:\n          equal: {env: prod}\n        command: touch prod.txt\n      - when:\n          equal: {env: dev}\n        command: touch dev.txt\n";
        run_task(yaml, "t", temp.path()).unwrap();
        assert!(!temp.path().join("prod.txt").exists());
        assert!(temp.path().join("dev.txt").exists());
    }
}
