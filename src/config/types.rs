//! Core configuration types
//!
//! This module defines the data structures behind a whisk.yml configuration
//! file. Polymorphic fields go through the decoders in [`crate::config::decode`]
//! so that every shape the file format allows normalises to one runtime form.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashMap;

use crate::config::decode;

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Default)]
pub struct Config {
    /// Application name shown in help output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Application usage description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Interpreter argv for commands, e.g. `["sh", "-c"]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,

    /// Options shared by every task
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "ser_options")]
    pub options: Vec<TaskOption>,

    /// Task catalogue in declaration order
    #[serde(serialize_with = "ser_tasks")]
    pub tasks: Vec<Task>,
}

impl Config {
    /// Look up a task by name.
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// A task definition
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Task name, injected from the catalogue key after decode
    #[serde(skip)]
    pub name: String,

    /// Usage description for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Longer description for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Private tasks can only be invoked as sub-tasks
    #[serde(default, skip_serializing_if = "is_false")]
    pub private: bool,

    /// Quiet tasks silence command echo for themselves and sub-tasks
    #[serde(default, skip_serializing_if = "is_false")]
    pub quiet: bool,

    /// Positional arguments in declaration order
    #[serde(
        default,
        deserialize_with = "de_args",
        serialize_with = "ser_args",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub args: Vec<Arg>,

    /// Named options in declaration order
    #[serde(
        default,
        deserialize_with = "de_options",
        serialize_with = "ser_options",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub options: Vec<TaskOption>,

    /// Run items to execute
    #[serde(
        default,
        deserialize_with = "de_run_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub run: Vec<RunItem>,

    /// Run items that always execute after `run`
    #[serde(
        default,
        deserialize_with = "de_run_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub finally: Vec<RunItem>,

    /// Source file globs for the up-to-date check
    #[serde(
        default,
        deserialize_with = "de_string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub source: Vec<String>,

    /// Target file globs for the up-to-date check
    #[serde(
        default,
        deserialize_with = "de_string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub target: Vec<String>,

    /// Interpolation values, materialised per invocation
    #[serde(skip)]
    pub vars: HashMap<String, String>,

    /// Raw option values, used by when-guard comparisons
    #[serde(skip)]
    pub raw_vars: HashMap<String, String>,
}

/// An option (flag) definition
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskOption {
    /// Option name, injected from the mapping key after decode
    #[serde(skip)]
    pub name: String,

    /// Usage description for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Short flag (single character)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,

    /// Value type
    #[serde(rename = "type", default, skip_serializing_if = "ValueKind::is_string")]
    pub kind: ValueKind,

    /// Environment variable to read when no flag is passed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Default value candidates, first passing guard wins
    #[serde(
        default,
        deserialize_with = "de_candidate_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub default: Vec<ValueCandidate>,

    /// Fail when neither flag nor environment provides a value
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    /// Template producing the interpolation text for this option
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,

    /// Allow-list for resolved values
    #[serde(
        default,
        deserialize_with = "de_string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub values: Vec<String>,

    /// Private options have no CLI flag but can still be interpolated
    #[serde(default, skip_serializing_if = "is_false")]
    pub private: bool,
}

/// An argument (positional parameter) definition
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Arg {
    /// Argument name, injected from the mapping key after decode
    #[serde(skip)]
    pub name: String,

    /// Usage description for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Value type
    #[serde(rename = "type", default, skip_serializing_if = "ValueKind::is_string")]
    pub kind: ValueKind,

    /// Allow-list for passed values
    #[serde(
        default,
        deserialize_with = "de_string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub values: Vec<String>,
}

/// Value types for options and args
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    String,
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "integer")]
    Int,
    Float,
}

impl ValueKind {
    pub fn is_string(&self) -> bool {
        matches!(self, ValueKind::String)
    }

    /// The value used when nothing provides one.
    pub fn zero(&self) -> &'static str {
        match self {
            ValueKind::String => "",
            ValueKind::Bool => "false",
            ValueKind::Int => "0",
            ValueKind::Float => "0",
        }
    }

    /// Check that a raw string is a member of this type.
    pub fn check(&self, raw: &str) -> Result<(), String> {
        match self {
            ValueKind::String => Ok(()),
            ValueKind::Bool => {
                if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
                    Ok(())
                } else {
                    Err(format!("'{raw}' is not a boolean"))
                }
            }
            ValueKind::Int => raw
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| format!("'{raw}' is not an integer")),
            ValueKind::Float => raw
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| format!("'{raw}' is not a number")),
        }
    }
}

/// A default value candidate: a literal or a command, gated by `when`.
#[derive(Debug, Clone, Serialize)]
pub struct ValueCandidate {
    /// Guards; every clause must pass for the candidate to apply
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub when: Vec<When>,

    /// Literal value, used verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Shell command whose stdout becomes the value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// A conditional guard clause.
///
/// Predicates within one clause are a conjunction; the listed values of a
/// single predicate form an allow-list.
#[derive(Debug, Clone, Serialize, Default)]
pub struct When {
    /// Commands that must exit zero
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    /// Option values that must match one of the allowed values
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "ser_pairs")]
    pub equal: Vec<(String, Vec<String>)>,

    /// Option values that must not match any of the listed values
    #[serde(
        rename = "not-equal",
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "ser_pairs"
    )]
    pub not_equal: Vec<(String, Vec<String>)>,

    /// Environment variables that must match one of the allowed values
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "ser_pairs")]
    pub environment: Vec<(String, Vec<String>)>,

    /// Operating systems the clause passes on
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub os: Vec<String>,

    /// Paths that must exist, relative to the config directory
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exists: Vec<String>,

    /// Paths that must not exist
    #[serde(rename = "not-exists", skip_serializing_if = "Vec::is_empty")]
    pub not_exists: Vec<String>,
}

/// One step in a task's execution list.
///
/// Exactly one of `command`, `task`, and `set_environment` is populated.
#[derive(Debug, Clone, Serialize)]
pub struct RunItem {
    /// Guards; any failing clause skips the item
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub when: Vec<When>,

    /// Commands to execute in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<Command>,

    /// Sub-tasks to execute in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub task: Vec<SubTaskRef>,

    /// Environment mutations, applied in order; null unsets
    #[serde(
        rename = "set-environment",
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "ser_env_pairs"
    )]
    pub set_environment: Vec<(String, Option<String>)>,
}

/// A command to pass to the interpreter
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    /// The text handed to the interpreter
    pub exec: String,

    /// What to echo before running; defaults to `exec`
    pub print: String,

    /// Working directory override, relative to the config directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Suppress the echo for this command
    #[serde(skip_serializing_if = "is_false")]
    pub quiet: bool,
}

/// A reference to a sub-task with per-call overrides
#[derive(Debug, Clone, Serialize)]
pub struct SubTaskRef {
    pub name: String,

    /// Positional argument values for the referenced task
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Option overrides, applied as if passed on the command line
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "ser_string_pairs")]
    pub options: Vec<(String, String)>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

// --- serde plumbing -------------------------------------------------------

fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    decode::string_list(&value, "field").map_err(serde::de::Error::custom)
}

fn de_run_list<'de, D>(deserializer: D) -> Result<Vec<RunItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    decode::run_list(&value).map_err(serde::de::Error::custom)
}

fn de_candidate_list<'de, D>(deserializer: D) -> Result<Vec<ValueCandidate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    decode::candidate_list(&value).map_err(serde::de::Error::custom)
}

fn de_options<'de, D>(deserializer: D) -> Result<Vec<TaskOption>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    decode::option_map(&value).map_err(serde::de::Error::custom)
}

fn de_args<'de, D>(deserializer: D) -> Result<Vec<Arg>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    decode::arg_map(&value).map_err(serde::de::Error::custom)
}

fn ser_options<S>(options: &[TaskOption], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(options.len()))?;
    for option in options {
        map.serialize_entry(&option.name, option)?;
    }
    map.end()
}

fn ser_args<S>(args: &[Arg], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(args.len()))?;
    for arg in args {
        map.serialize_entry(&arg.name, arg)?;
    }
    map.end()
}

fn ser_tasks<S>(tasks: &[Task], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(tasks.len()))?;
    for task in tasks {
        map.serialize_entry(&task.name, task)?;
    }
    map.end()
}

fn ser_pairs<S>(pairs: &[(String, Vec<String>)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (name, values) in pairs {
        map.serialize_entry(name, values)?;
    }
    map.end()
}

fn ser_env_pairs<S>(
    pairs: &[(String, Option<String>)],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (name, value) in pairs {
        map.serialize_entry(name, value)?;
    }
    map.end()
}

fn ser_string_pairs<S>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (name, value) in pairs {
        map.serialize_entry(name, value)?;
    }
    map.end()
}
