//! When-guard evaluation
//!
//! A clause passes when every predicate it carries passes; the values listed
//! under a single predicate are an allow-list. Predicates are checked from
//! cheapest to most expensive: option comparisons first, then environment,
//! operating system, path existence, and finally guard commands, which spawn
//! a process. The first failing predicate short-circuits the clause.

use std::collections::HashMap;
use std::env;

use crate::config::types::When;
use crate::error::ExecutionResult;
use crate::runner::command::check_command;
use crate::runner::context::Context;

/// Evaluate a guard list; every clause must pass.
pub fn when_list_passes(
    list: &[When],
    vars: &HashMap<String, String>,
    ctx: &Context,
) -> ExecutionResult<bool> {
    for when in list {
        if !when_passes(when, vars, ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluate a single clause.
pub fn when_passes(
    when: &When,
    vars: &HashMap<String, String>,
    ctx: &Context,
) -> ExecutionResult<bool> {
    for (name, allowed) in &when.equal {
        match vars.get(name) {
            Some(value) if allowed.contains(value) => {}
            _ => return Ok(false),
        }
    }

    for (name, rejected) in &when.not_equal {
        match vars.get(name) {
            Some(value) if !rejected.contains(value) => {}
            _ => return Ok(false),
        }
    }

    for (name, allowed) in &when.environment {
        match env::var(name) {
            Ok(value) if allowed.contains(&value) => {}
            _ => return Ok(false),
        }
    }

    if !when.os.is_empty() && !when.os.iter().any(|os| os_matches(os)) {
        return Ok(false);
    }

    for path in &when.exists {
        if !ctx.config_dir().join(path).exists() {
            return Ok(false);
        }
    }
    for path in &when.not_exists {
        if ctx.config_dir().join(path).exists() {
            return Ok(false);
        }
    }

    for script in &when.command {
        if !check_command(script, ctx)? {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Match an OS name against the running platform. `darwin` is accepted as an
/// alias for `macos`.
fn os_matches(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    let current = env::consts::OS;
    match name.as_str() {
        "darwin" => current == "macos",
        other => current == other,
    }
}
