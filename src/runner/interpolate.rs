//! Variable interpolation for strings
//!
//! Handles `${name}` substitution. `$$` escapes to a literal `$`; an
//! unknown name is a fatal error. Substitution is textual and single-pass:
//! substituted values are never rescanned, so nested `${}` is not supported.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::types::{RunItem, Task};
use crate::error::{InterpolationError, InterpolationResult};

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\$|\$\{([^{}$]*)\}").unwrap())
}

/// Substitute `${name}` occurrences with values from `vars`.
pub fn interpolate(
    text: &str,
    vars: &HashMap<String, String>,
) -> InterpolationResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in pattern().captures_iter(text) {
        let matched = caps.get(0).unwrap();
        out.push_str(&text[last..matched.start()]);
        last = matched.end();

        if matched.as_str() == "$$" {
            out.push('$');
            continue;
        }

        let name = &caps[1];
        if name.is_empty() {
            return Err(InterpolationError::InvalidSyntax(
                "empty variable name".to_string(),
            ));
        }
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => return Err(InterpolationError::UndefinedVariable(name.to_string())),
        }
    }

    out.push_str(&text[last..]);
    Ok(out)
}

/// Rewrite every textual field of a task's run and finally items using its
/// resolved vars. This is the final interpolation pass; guard evaluation and
/// command execution later see finished strings.
pub fn interpolate_task(task: &mut Task) -> InterpolationResult<()> {
    let vars = task.vars.clone();
    for item in task.run.iter_mut().chain(task.finally.iter_mut()) {
        interpolate_run_item(item, &vars)?;
    }
    Ok(())
}

fn interpolate_run_item(
    item: &mut RunItem,
    vars: &HashMap<String, String>,
) -> InterpolationResult<()> {
    for when in &mut item.when {
        for script in &mut when.command {
            *script = interpolate(script, vars)?;
        }
    }
    for cmd in &mut item.command {
        cmd.exec = interpolate(&cmd.exec, vars)?;
        cmd.print = interpolate(&cmd.print, vars)?;
        if let Some(dir) = &cmd.dir {
            cmd.dir = Some(interpolate(dir, vars)?);
        }
    }
    for sub in &mut item.task {
        for arg in &mut sub.args {
            *arg = interpolate(arg, vars)?;
        }
        for (_, value) in &mut sub.options {
            *value = interpolate(value, vars)?;
        }
    }
    for (_, value) in &mut item.set_environment {
        if let Some(v) = value {
            *value = Some(interpolate(v, vars)?);
        }
    }
    Ok(())
}

/// The variable names a piece of text references.
pub fn references(text: &str) -> Vec<String> {
    pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_interpolation() {
        let vars = vars(&[("name", "world")]);
        assert_eq!(
            interpolate("Hello, ${name}!", &vars).unwrap(),
            "Hello, world!"
        );
    }

    #[test]
    fn test_multiple_variables() {
        let vars = vars(&[("first", "John"), ("last", "Doe")]);
        assert_eq!(interpolate("${first} ${last}", &vars).unwrap(), "John Doe");
    }

    #[test]
    fn test_undefined_variable_is_fatal() {
        let result = interpolate("Hello, ${missing}!", &HashMap::new());
        assert!(matches!(
            result,
            Err(InterpolationError::UndefinedVariable(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_dollar_escape() {
        let vars = vars(&[("cost", "5")]);
        assert_eq!(interpolate("$$${cost}", &vars).unwrap(), "$5");
        assert_eq!(interpolate("a$$b", &vars).unwrap(), "a$b");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let vars = vars(&[("outer", "${inner}")]);
        assert_eq!(interpolate("${outer}", &vars).unwrap(), "${inner}");
    }

    #[test]
    fn test_idempotent_when_no_patterns_remain() {
        let vars = vars(&[("name", "world")]);
        let once = interpolate("hello ${name}", &vars).unwrap();
        let twice = interpolate(&once, &vars).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_variable_name_is_invalid() {
        let result = interpolate("${}", &HashMap::new());
        assert!(matches!(result, Err(InterpolationError::InvalidSyntax(_))));
    }

    #[test]
    fn test_plain_text_untouched() {
        let result = interpolate("no variables here", &HashMap::new()).unwrap();
        assert_eq!(result, "no variables here");
    }

    #[test]
    fn test_references() {
        assert_eq!(
            references("go test ${race} ${verbose} ./..."),
            vec!["race".to_string(), "verbose".to_string()]
        );
        assert!(references("$$not-a-ref").is_empty());
    }
}
