//! Polymorphic YAML decoding
//!
//! Most configuration nodes accept more than one YAML shape: a run item may
//! be a bare command string or a full mapping, an option default may be a
//! literal, a guarded candidate, or a list of either, and so on. Each node
//! kind declares an ordered list of [`Candidate`] shapes; the first whose
//! decode succeeds wins. A shape that does not apply reports
//! [`Decoded::WrongShape`] and the next one is tried, while a shape that
//! applies but fails validation aborts with its own error. If no shape
//! matches, the caller gets an error listing everything that was attempted.

use serde_yaml::{Mapping, Value};

use crate::config::types::{
    Arg, Command, RunItem, SubTaskRef, Task, TaskOption, ValueCandidate, When,
};

pub(crate) type DecodeResult<T> = Result<T, String>;

/// Outcome of trying one shape against a node.
pub(crate) enum Decoded<T> {
    Value(T),
    WrongShape,
}

/// One alternative shape for a node.
pub(crate) struct Candidate<T> {
    pub shape: &'static str,
    pub decode: fn(&Value) -> DecodeResult<Decoded<T>>,
}

/// Try candidates in order and commit on the first that matches.
pub(crate) fn first_match<T>(
    node: &Value,
    what: &str,
    candidates: &[Candidate<T>],
) -> DecodeResult<T> {
    for candidate in candidates {
        if let Decoded::Value(v) = (candidate.decode)(node)? {
            return Ok(v);
        }
    }
    let shapes: Vec<&str> = candidates.iter().map(|c| c.shape).collect();
    Err(format!(
        "{} must be {}, got {}",
        what,
        shapes.join(" or "),
        node_kind(node)
    ))
}

fn node_kind(node: &Value) -> &'static str {
    match node {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// YAML scalars are accepted wherever a string is expected.
pub(crate) fn scalar(node: &Value) -> Option<String> {
    match node {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn entry<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

fn key_string(key: &Value) -> DecodeResult<String> {
    key.as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("mapping key must be a string, got {}", node_kind(key)))
}

/// Reject unknown keys; included and inline definitions are both strict.
fn check_keys(map: &Mapping, allowed: &[&str], what: &str) -> DecodeResult<()> {
    for (key, _) in map {
        let name = key_string(key)?;
        if !allowed.contains(&name.as_str()) {
            return Err(format!("unknown key '{}' in {}", name, what));
        }
    }
    Ok(())
}

// --- string lists ---------------------------------------------------------

pub(crate) fn string_list(node: &Value, what: &str) -> DecodeResult<Vec<String>> {
    first_match(
        node,
        what,
        &[
            Candidate {
                shape: "a string",
                decode: |n| {
                    Ok(match scalar(n) {
                        Some(s) => Decoded::Value(vec![s]),
                        None => Decoded::WrongShape,
                    })
                },
            },
            Candidate {
                shape: "a list of strings",
                decode: |n| {
                    let Value::Sequence(seq) = n else {
                        return Ok(Decoded::WrongShape);
                    };
                    let mut out = Vec::with_capacity(seq.len());
                    for item in seq {
                        out.push(scalar(item).ok_or_else(|| {
                            format!("list entries must be strings, got {}", node_kind(item))
                        })?);
                    }
                    Ok(Decoded::Value(out))
                },
            },
        ],
    )
}

/// Interpreter: an argv list, or one string split on whitespace.
pub(crate) fn interpreter(node: &Value) -> DecodeResult<Vec<String>> {
    let words = string_list(node, "interpreter")?;
    if words.len() == 1 {
        return Ok(words[0].split_whitespace().map(str::to_string).collect());
    }
    Ok(words)
}

/// Mapping of name to allowed values (each scalar-or-list).
fn value_pairs(node: &Value, what: &str) -> DecodeResult<Vec<(String, Vec<String>)>> {
    let Value::Mapping(map) = node else {
        return Err(format!("{} must be a mapping, got {}", what, node_kind(node)));
    };
    let mut out = Vec::with_capacity(map.len());
    for (key, value) in map {
        let name = key_string(key)?;
        let values = string_list(value, what)?;
        out.push((name, values));
    }
    Ok(out)
}

// --- when clauses ---------------------------------------------------------

fn when_scalar(node: &Value) -> DecodeResult<Decoded<When>> {
    Ok(match scalar(node) {
        Some(s) => Decoded::Value(When {
            command: vec![s],
            ..When::default()
        }),
        None => Decoded::WrongShape,
    })
}

fn when_mapping(node: &Value) -> DecodeResult<Decoded<When>> {
    let Value::Mapping(map) = node else {
        return Ok(Decoded::WrongShape);
    };
    check_keys(
        map,
        &[
            "command",
            "equal",
            "not-equal",
            "environment",
            "os",
            "exists",
            "not-exists",
        ],
        "when clause",
    )?;
    let mut when = When::default();
    if let Some(v) = entry(map, "command") {
        when.command = string_list(v, "when command")?;
    }
    if let Some(v) = entry(map, "equal") {
        when.equal = value_pairs(v, "when equal")?;
    }
    if let Some(v) = entry(map, "not-equal") {
        when.not_equal = value_pairs(v, "when not-equal")?;
    }
    if let Some(v) = entry(map, "environment") {
        when.environment = value_pairs(v, "when environment")?;
    }
    if let Some(v) = entry(map, "os") {
        when.os = string_list(v, "when os")?;
    }
    if let Some(v) = entry(map, "exists") {
        when.exists = string_list(v, "when exists")?;
    }
    if let Some(v) = entry(map, "not-exists") {
        when.not_exists = string_list(v, "when not-exists")?;
    }
    Ok(Decoded::Value(when))
}

pub(crate) fn when(node: &Value) -> DecodeResult<When> {
    first_match(
        node,
        "when clause",
        &[
            Candidate {
                shape: "a command string",
                decode: when_scalar,
            },
            Candidate {
                shape: "a clause mapping",
                decode: when_mapping,
            },
        ],
    )
}

pub(crate) fn when_list(node: &Value) -> DecodeResult<Vec<When>> {
    first_match(
        node,
        "when",
        &[
            Candidate {
                shape: "a command string",
                decode: |n| Ok(map_single(when_scalar(n)?)),
            },
            Candidate {
                shape: "a clause mapping",
                decode: |n| Ok(map_single(when_mapping(n)?)),
            },
            Candidate {
                shape: "a list of clauses",
                decode: |n| {
                    let Value::Sequence(seq) = n else {
                        return Ok(Decoded::WrongShape);
                    };
                    let mut out = Vec::with_capacity(seq.len());
                    for item in seq {
                        out.push(when(item)?);
                    }
                    Ok(Decoded::Value(out))
                },
            },
        ],
    )
}

fn map_single<T>(decoded: Decoded<T>) -> Decoded<Vec<T>> {
    match decoded {
        Decoded::Value(v) => Decoded::Value(vec![v]),
        Decoded::WrongShape => Decoded::WrongShape,
    }
}

// --- default value candidates ---------------------------------------------

fn candidate_scalar(node: &Value) -> DecodeResult<Decoded<ValueCandidate>> {
    Ok(match scalar(node) {
        Some(s) => Decoded::Value(ValueCandidate {
            when: Vec::new(),
            value: Some(s),
            command: None,
        }),
        None => Decoded::WrongShape,
    })
}

fn candidate_mapping(node: &Value) -> DecodeResult<Decoded<ValueCandidate>> {
    let Value::Mapping(map) = node else {
        return Ok(Decoded::WrongShape);
    };
    check_keys(map, &["when", "value", "command"], "default entry")?;
    let when = match entry(map, "when") {
        Some(v) => when_list(v)?,
        None => Vec::new(),
    };
    let value = match entry(map, "value") {
        Some(v) => Some(scalar(v).ok_or_else(|| {
            format!("default value must be a scalar, got {}", node_kind(v))
        })?),
        None => None,
    };
    let command = match entry(map, "command") {
        Some(v) => Some(scalar(v).ok_or_else(|| {
            format!("default command must be a string, got {}", node_kind(v))
        })?),
        None => None,
    };
    if value.is_some() && command.is_some() {
        return Err("default entry may not define both value and command".to_string());
    }
    Ok(Decoded::Value(ValueCandidate {
        when,
        value,
        command,
    }))
}

pub(crate) fn candidate_list(node: &Value) -> DecodeResult<Vec<ValueCandidate>> {
    first_match(
        node,
        "default",
        &[
            Candidate {
                shape: "a literal value",
                decode: |n| Ok(map_single(candidate_scalar(n)?)),
            },
            Candidate {
                shape: "a value entry",
                decode: |n| Ok(map_single(candidate_mapping(n)?)),
            },
            Candidate {
                shape: "a list of value entries",
                decode: |n| {
                    let Value::Sequence(seq) = n else {
                        return Ok(Decoded::WrongShape);
                    };
                    let mut out = Vec::with_capacity(seq.len());
                    for item in seq {
                        out.push(first_match(
                            item,
                            "default entry",
                            &[
                                Candidate {
                                    shape: "a literal value",
                                    decode: candidate_scalar,
                                },
                                Candidate {
                                    shape: "a value entry",
                                    decode: candidate_mapping,
                                },
                            ],
                        )?);
                    }
                    Ok(Decoded::Value(out))
                },
            },
        ],
    )
}

// --- commands -------------------------------------------------------------

fn command_scalar(node: &Value) -> DecodeResult<Decoded<Command>> {
    Ok(match scalar(node) {
        Some(s) => Decoded::Value(Command {
            print: s.clone(),
            exec: s,
            dir: None,
            quiet: false,
        }),
        None => Decoded::WrongShape,
    })
}

fn command_mapping(node: &Value) -> DecodeResult<Decoded<Command>> {
    let Value::Mapping(map) = node else {
        return Ok(Decoded::WrongShape);
    };
    check_keys(map, &["exec", "print", "dir", "quiet"], "command")?;
    let exec = entry(map, "exec")
        .and_then(scalar)
        .ok_or("command requires an exec string")?;
    let print = match entry(map, "print") {
        Some(v) => scalar(v).ok_or_else(|| {
            format!("command print must be a string, got {}", node_kind(v))
        })?,
        None => exec.clone(),
    };
    let dir = match entry(map, "dir") {
        Some(v) => Some(scalar(v).ok_or_else(|| {
            format!("command dir must be a string, got {}", node_kind(v))
        })?),
        None => None,
    };
    let quiet = match entry(map, "quiet") {
        Some(Value::Bool(b)) => *b,
        Some(v) => {
            return Err(format!(
                "command quiet must be a boolean, got {}",
                node_kind(v)
            ))
        }
        None => false,
    };
    Ok(Decoded::Value(Command {
        exec,
        print,
        dir,
        quiet,
    }))
}

pub(crate) fn command_list(node: &Value) -> DecodeResult<Vec<Command>> {
    first_match(
        node,
        "command",
        &[
            Candidate {
                shape: "a string",
                decode: |n| Ok(map_single(command_scalar(n)?)),
            },
            Candidate {
                shape: "a command mapping",
                decode: |n| Ok(map_single(command_mapping(n)?)),
            },
            Candidate {
                shape: "a list of commands",
                decode: |n| {
                    let Value::Sequence(seq) = n else {
                        return Ok(Decoded::WrongShape);
                    };
                    let mut out = Vec::with_capacity(seq.len());
                    for item in seq {
                        out.push(first_match(
                            item,
                            "command",
                            &[
                                Candidate {
                                    shape: "a string",
                                    decode: command_scalar,
                                },
                                Candidate {
                                    shape: "a command mapping",
                                    decode: command_mapping,
                                },
                            ],
                        )?);
                    }
                    Ok(Decoded::Value(out))
                },
            },
        ],
    )
}

// --- sub-task references --------------------------------------------------

fn subtask_scalar(node: &Value) -> DecodeResult<Decoded<SubTaskRef>> {
    Ok(match scalar(node) {
        Some(name) => Decoded::Value(SubTaskRef {
            name,
            args: Vec::new(),
            options: Vec::new(),
        }),
        None => Decoded::WrongShape,
    })
}

fn subtask_mapping(node: &Value) -> DecodeResult<Decoded<SubTaskRef>> {
    let Value::Mapping(map) = node else {
        return Ok(Decoded::WrongShape);
    };
    check_keys(map, &["name", "args", "options"], "task reference")?;
    let name = entry(map, "name")
        .and_then(scalar)
        .ok_or("task reference requires a name")?;
    let args = match entry(map, "args") {
        Some(v) => string_list(v, "task reference args")?,
        None => Vec::new(),
    };
    let options = match entry(map, "options") {
        Some(Value::Mapping(opts)) => {
            let mut out = Vec::with_capacity(opts.len());
            for (key, value) in opts {
                let opt_name = key_string(key)?;
                let opt_value = scalar(value).ok_or_else(|| {
                    format!(
                        "task reference option '{}' must be a scalar, got {}",
                        opt_name,
                        node_kind(value)
                    )
                })?;
                out.push((opt_name, opt_value));
            }
            out
        }
        Some(v) => {
            return Err(format!(
                "task reference options must be a mapping, got {}",
                node_kind(v)
            ))
        }
        None => Vec::new(),
    };
    Ok(Decoded::Value(SubTaskRef {
        name,
        args,
        options,
    }))
}

pub(crate) fn subtask_list(node: &Value) -> DecodeResult<Vec<SubTaskRef>> {
    first_match(
        node,
        "task",
        &[
            Candidate {
                shape: "a task name",
                decode: |n| Ok(map_single(subtask_scalar(n)?)),
            },
            Candidate {
                shape: "a task reference",
                decode: |n| Ok(map_single(subtask_mapping(n)?)),
            },
            Candidate {
                shape: "a list of task references",
                decode: |n| {
                    let Value::Sequence(seq) = n else {
                        return Ok(Decoded::WrongShape);
                    };
                    let mut out = Vec::with_capacity(seq.len());
                    for item in seq {
                        out.push(first_match(
                            item,
                            "task reference",
                            &[
                                Candidate {
                                    shape: "a task name",
                                    decode: subtask_scalar,
                                },
                                Candidate {
                                    shape: "a task reference",
                                    decode: subtask_mapping,
                                },
                            ],
                        )?);
                    }
                    Ok(Decoded::Value(out))
                },
            },
        ],
    )
}

// --- run items ------------------------------------------------------------

fn run_item_scalar(node: &Value) -> DecodeResult<Decoded<RunItem>> {
    Ok(match scalar(node) {
        Some(s) => Decoded::Value(RunItem {
            when: Vec::new(),
            command: vec![Command {
                print: s.clone(),
                exec: s,
                dir: None,
                quiet: false,
            }],
            task: Vec::new(),
            set_environment: Vec::new(),
        }),
        None => Decoded::WrongShape,
    })
}

fn run_item_mapping(node: &Value) -> DecodeResult<Decoded<RunItem>> {
    let Value::Mapping(map) = node else {
        return Ok(Decoded::WrongShape);
    };
    check_keys(
        map,
        &["when", "command", "task", "set-environment"],
        "run item",
    )?;
    let when = match entry(map, "when") {
        Some(v) => when_list(v)?,
        None => Vec::new(),
    };
    let command = match entry(map, "command") {
        Some(v) => command_list(v)?,
        None => Vec::new(),
    };
    let task = match entry(map, "task") {
        Some(v) => subtask_list(v)?,
        None => Vec::new(),
    };
    let set_environment = match entry(map, "set-environment") {
        Some(v) => env_pairs(v)?,
        None => Vec::new(),
    };
    let actions = [
        !command.is_empty(),
        !task.is_empty(),
        !set_environment.is_empty(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if actions > 1 {
        return Err(
            "run item may define only one of command, task, and set-environment".to_string(),
        );
    }
    Ok(Decoded::Value(RunItem {
        when,
        command,
        task,
        set_environment,
    }))
}

fn env_pairs(node: &Value) -> DecodeResult<Vec<(String, Option<String>)>> {
    let Value::Mapping(map) = node else {
        return Err(format!(
            "set-environment must be a mapping, got {}",
            node_kind(node)
        ));
    };
    let mut out = Vec::with_capacity(map.len());
    for (key, value) in map {
        let name = key_string(key)?;
        let value = match value {
            Value::Null => None,
            other => Some(scalar(other).ok_or_else(|| {
                format!(
                    "set-environment value for '{}' must be a scalar or null, got {}",
                    name,
                    node_kind(other)
                )
            })?),
        };
        out.push((name, value));
    }
    Ok(out)
}

pub(crate) fn run_list(node: &Value) -> DecodeResult<Vec<RunItem>> {
    first_match(
        node,
        "run",
        &[
            Candidate {
                shape: "a command string",
                decode: |n| Ok(map_single(run_item_scalar(n)?)),
            },
            Candidate {
                shape: "a run item",
                decode: |n| Ok(map_single(run_item_mapping(n)?)),
            },
            Candidate {
                shape: "a list of run items",
                decode: |n| {
                    let Value::Sequence(seq) = n else {
                        return Ok(Decoded::WrongShape);
                    };
                    let mut out = Vec::with_capacity(seq.len());
                    for item in seq {
                        out.push(first_match(
                            item,
                            "run item",
                            &[
                                Candidate {
                                    shape: "a command string",
                                    decode: run_item_scalar,
                                },
                                Candidate {
                                    shape: "a run item",
                                    decode: run_item_mapping,
                                },
                            ],
                        )?);
                    }
                    Ok(Decoded::Value(out))
                },
            },
        ],
    )
}

// --- named maps -----------------------------------------------------------

/// Decode `options:` preserving declaration order and injecting names.
pub(crate) fn option_map(node: &Value) -> DecodeResult<Vec<TaskOption>> {
    let Value::Mapping(map) = node else {
        return Err(format!(
            "options must be a mapping, got {}",
            node_kind(node)
        ));
    };
    let mut out = Vec::with_capacity(map.len());
    for (key, value) in map {
        let name = key_string(key)?;
        let mut option: TaskOption =
            serde_yaml::from_value(value.clone()).map_err(|e| format!("option '{name}': {e}"))?;
        option.name = name;
        out.push(option);
    }
    Ok(out)
}

/// Decode `args:` preserving declaration order and injecting names.
pub(crate) fn arg_map(node: &Value) -> DecodeResult<Vec<Arg>> {
    let Value::Mapping(map) = node else {
        return Err(format!("args must be a mapping, got {}", node_kind(node)));
    };
    let mut out = Vec::with_capacity(map.len());
    for (key, value) in map {
        let name = key_string(key)?;
        let mut arg: Arg =
            serde_yaml::from_value(value.clone()).map_err(|e| format!("arg '{name}': {e}"))?;
        arg.name = name;
        out.push(arg);
    }
    Ok(out)
}

// --- task catalogue entries -----------------------------------------------

/// A task definition before include resolution.
#[derive(Debug, Clone)]
pub(crate) enum RawTask {
    /// `{include: path}` indirection; the file holds the real definition.
    Include(String),
    Inline(Box<Task>),
}

pub(crate) fn task_map(node: &Value) -> DecodeResult<Vec<(String, RawTask)>> {
    let Value::Mapping(map) = node else {
        return Err(format!("tasks must be a mapping, got {}", node_kind(node)));
    };
    let mut out = Vec::with_capacity(map.len());
    for (key, value) in map {
        let name = key_string(key)?;
        let raw = match value {
            Value::Mapping(body) if entry(body, "include").is_some() => {
                if body.len() > 1 {
                    return Err(format!(
                        "task '{}': include may not be combined with other fields",
                        name
                    ));
                }
                let path = entry(body, "include").and_then(scalar).ok_or_else(|| {
                    format!("task '{}': include must be a file path", name)
                })?;
                RawTask::Include(path)
            }
            // a bare `name:` declares a task with no body
            Value::Null => RawTask::Inline(Box::default()),
            other => {
                let task: Task = serde_yaml::from_value(other.clone())
                    .map_err(|e| format!("task '{name}': {e}"))?;
                RawTask::Inline(Box::new(task))
            }
        };
        out.push((name, raw));
    }
    Ok(out)
}
