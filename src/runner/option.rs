//! Option and argument resolution
//!
//! Turns a task's declared surface plus the invocation (CLI values,
//! environment, defaults) into concrete strings. Options may reference each
//! other from guards and default commands, so they resolve in dependency
//! order; a reference cycle is a configuration error.

use std::collections::{HashMap, HashSet};
use std::env;

use crate::config::types::{Config, Task, TaskOption, ValueKind};
use crate::error::{ConfigError, ExecutionError, Result};
use crate::runner::command::capture_command;
use crate::runner::context::Context;
use crate::runner::interpolate::{interpolate, references};
use crate::runner::when::when_list_passes;

/// Resolve every arg and option of `task`, filling `task.vars` (interpolation
/// values) and `task.raw_vars` (raw values seen by when-guards).
///
/// `passed` holds values provided on the command line or by a sub-task
/// reference; `args` holds positional values in declaration order.
pub fn resolve_task(
    task: &mut Task,
    config: &Config,
    passed: &HashMap<String, String>,
    args: &[String],
    ctx: &Context,
) -> Result<()> {
    let mut vars = HashMap::new();
    let mut raw_vars = HashMap::new();

    if args.len() != task.args.len() {
        return Err(ExecutionError::WrongArgCount {
            task: task.name.clone(),
            expected: task.args.len(),
            actual: args.len(),
        }
        .into());
    }
    for (arg, value) in task.args.iter().zip(args) {
        check_value(&arg.name, arg.kind, &arg.values, value)?;
        vars.insert(arg.name.clone(), value.clone());
        raw_vars.insert(arg.name.clone(), value.clone());
    }

    // Global options resolve ahead of task options unless dependencies say
    // otherwise.
    let options: Vec<&TaskOption> = config
        .options
        .iter()
        .chain(task.options.iter())
        .collect();

    for option in order_by_dependencies(&options)? {
        let (raw, rendered) = resolve_option(option, passed, &vars, &raw_vars, ctx)?;
        raw_vars.insert(option.name.clone(), raw);
        vars.insert(option.name.clone(), rendered);
    }

    task.vars = vars;
    task.raw_vars = raw_vars;
    Ok(())
}

/// Option names this option's guards and templates mention.
fn dependencies(option: &TaskOption, known: &HashSet<&str>) -> Vec<String> {
    let mut deps = Vec::new();
    let mut texts: Vec<&str> = Vec::new();

    // Literal values are used verbatim, so only command text and guard
    // references create edges.
    for candidate in &option.default {
        if let Some(command) = &candidate.command {
            texts.push(command);
        }
        for when in &candidate.when {
            for script in &when.command {
                texts.push(script);
            }
            for (name, _) in when.equal.iter().chain(when.not_equal.iter()) {
                if known.contains(name.as_str()) {
                    deps.push(name.clone());
                }
            }
        }
    }
    if let Some(rewrite) = &option.rewrite {
        texts.push(rewrite);
    }

    for text in texts {
        for reference in references(text) {
            if known.contains(reference.as_str()) {
                deps.push(reference);
            }
        }
    }

    deps.sort();
    deps.dedup();
    deps
}

/// Topologically order options; a cycle is fatal.
fn order_by_dependencies<'a>(options: &[&'a TaskOption]) -> Result<Vec<&'a TaskOption>> {
    const VISITING: u8 = 1;
    const DONE: u8 = 2;

    fn visit<'a>(
        name: &str,
        by_name: &HashMap<&str, &'a TaskOption>,
        graph: &HashMap<&str, Vec<String>>,
        state: &mut HashMap<String, u8>,
        chain: &mut Vec<String>,
        order: &mut Vec<&'a TaskOption>,
    ) -> Result<()> {
        match state.get(name) {
            Some(&DONE) => return Ok(()),
            Some(&VISITING) => {
                let mut cycle: Vec<String> = chain
                    .iter()
                    .skip_while(|n| n.as_str() != name)
                    .cloned()
                    .collect();
                cycle.push(name.to_string());
                return Err(ConfigError::OptionCycle(cycle.join(" -> ")).into());
            }
            _ => {}
        }

        state.insert(name.to_string(), VISITING);
        chain.push(name.to_string());
        if let Some(deps) = graph.get(name) {
            for dep in deps {
                visit(dep, by_name, graph, state, chain, order)?;
            }
        }
        chain.pop();
        state.insert(name.to_string(), DONE);
        if let Some(option) = by_name.get(name) {
            order.push(*option);
        }
        Ok(())
    }

    let known: HashSet<&str> = options.iter().map(|o| o.name.as_str()).collect();
    let by_name: HashMap<&str, &'a TaskOption> =
        options.iter().map(|o| (o.name.as_str(), *o)).collect();
    let graph: HashMap<&str, Vec<String>> = options
        .iter()
        .map(|o| (o.name.as_str(), dependencies(o, &known)))
        .collect();

    let mut order = Vec::with_capacity(options.len());
    let mut state = HashMap::new();
    let mut chain = Vec::new();

    for option in options {
        visit(
            option.name.as_str(),
            &by_name,
            &graph,
            &mut state,
            &mut chain,
            &mut order,
        )?;
    }
    Ok(order)
}

/// Compute one option's raw value and its interpolation rendering.
fn resolve_option(
    option: &TaskOption,
    passed: &HashMap<String, String>,
    vars: &HashMap<String, String>,
    raw_vars: &HashMap<String, String>,
    ctx: &Context,
) -> Result<(String, String)> {
    let raw = select_raw(option, passed, vars, raw_vars, ctx)?;
    let rendered = render(option, &raw, vars)?;
    Ok((raw, rendered))
}

fn select_raw(
    option: &TaskOption,
    passed: &HashMap<String, String>,
    vars: &HashMap<String, String>,
    raw_vars: &HashMap<String, String>,
    ctx: &Context,
) -> Result<String> {
    if !option.private {
        if let Some(value) = passed.get(&option.name) {
            check_value(&option.name, option.kind, &option.values, value)?;
            return Ok(value.clone());
        }
    }

    if let Some(env_name) = &option.environment {
        if let Ok(value) = env::var(env_name) {
            check_value(&option.name, option.kind, &option.values, &value)?;
            return Ok(value);
        }
    }

    for candidate in &option.default {
        // Guard commands may reference earlier options.
        let mut guard = candidate.when.clone();
        for when in &mut guard {
            for script in &mut when.command {
                *script = interpolate(script, vars)?;
            }
        }
        if !when_list_passes(&guard, raw_vars, ctx)? {
            continue;
        }

        if let Some(value) = &candidate.value {
            return Ok(value.clone());
        }
        if let Some(script) = &candidate.command {
            let script = interpolate(script, vars)?;
            return Ok(capture_command(&script, ctx)?);
        }
        return Ok(String::new());
    }

    if option.required {
        return Err(ExecutionError::MissingOption(option.name.clone()).into());
    }

    Ok(option.kind.zero().to_string())
}

/// Apply rewrite semantics to produce the interpolation value.
fn render(
    option: &TaskOption,
    raw: &str,
    vars: &HashMap<String, String>,
) -> Result<String> {
    if option.kind == ValueKind::Bool {
        let is_true = raw.eq_ignore_ascii_case("true");
        return Ok(match &option.rewrite {
            Some(template) if is_true => interpolate(template, vars)?,
            Some(_) => String::new(),
            None => if is_true { "true" } else { "false" }.to_string(),
        });
    }

    match &option.rewrite {
        Some(template) => {
            let mut scope = vars.clone();
            scope.insert("value".to_string(), raw.to_string());
            Ok(interpolate(template, &scope)?)
        }
        None => Ok(raw.to_string()),
    }
}

fn check_value(
    name: &str,
    kind: ValueKind,
    allowed: &[String],
    value: &str,
) -> Result<()> {
    kind.check(value).map_err(|error| ExecutionError::InvalidValue {
        name: name.to_string(),
        error,
    })?;
    if !allowed.is_empty() && !allowed.iter().any(|a| a == value) {
        return Err(ExecutionError::InvalidValue {
            name: name.to_string(),
            error: format!("'{}' is not one of: {}", value, allowed.join(", ")),
        }
        .into());
    }
    Ok(())
}
