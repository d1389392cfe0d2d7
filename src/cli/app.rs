//! Main CLI application
//!
//! Builds a clap command tree from the task catalogue: one subcommand per
//! public task, with the task's args as positionals and its options as
//! flags. Resolution decides final values, so flags declared here carry no
//! defaults; only values the user actually passed reach the resolver.

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use clap_complete::{generate, Shell};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use crate::config::{
    parse_config_auto, parse_config_file, validate_config, Config, Task, ValueKind,
};
use crate::error::{ConfigError, Result};
use crate::runner::{flag_interrupt, interpolate_task, resolve_task, Cache, Context};
use crate::ui::{Logger, Verbosity};

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
    /// Parsed configuration
    config: Config,
    /// Config file path
    config_path: PathBuf,
}

impl App {
    /// Create a new app, discovering the configuration file
    pub fn new() -> Result<Self> {
        let (config, config_path) = parse_config_auto()?;
        validate_config(&config)?;

        let command = build_command(&config);

        Ok(App {
            command,
            config,
            config_path,
        })
    }

    /// Create an app with a specific config file
    pub fn with_config_file(path: PathBuf) -> Result<Self> {
        let config = parse_config_file(&path)?;
        validate_config(&config)?;

        let command = build_command(&config);

        Ok(App {
            command,
            config,
            config_path: path,
        })
    }

    /// Run the application with command line arguments
    pub fn run(mut self) -> Result<()> {
        let matches = self.command.clone().get_matches();

        let logger = Logger::new(verbosity(&matches));

        if let Some(shell) = matches.get_one::<Shell>("completion") {
            let name = self.command.get_name().to_string();
            generate(*shell, &mut self.command, name, &mut io::stdout());
            return Ok(());
        }

        if matches.get_flag("clean") {
            let cache = Cache::open(&self.config_path)?;
            let task_name = matches.subcommand().map(|(name, _)| name);
            cache.clean(task_name)?;
            return Ok(());
        }

        let Some((task_name, task_matches)) = matches.subcommand() else {
            self.command.print_help()?;
            println!();
            return Ok(());
        };

        let task = self
            .config
            .task(task_name)
            .filter(|t| !t.private)
            .ok_or_else(|| ConfigError::TaskNotFound(task_name.to_string()))?;

        // A .env next to the config seeds the environment before resolution.
        let _ = dotenvy::from_path(self.config_path.with_file_name(".env"));
        let _ = ctrlc::set_handler(flag_interrupt);

        let mut ctx = Context::new(self.config_path.clone(), logger);
        if let Some(interpreter) = &self.config.interpreter {
            ctx = ctx.with_interpreter(interpreter.clone());
        }

        let passed = collect_passed(task, &self.config, task_matches);
        let args = collect_args(task, task_matches);

        let mut task = task.clone();
        resolve_task(&mut task, &self.config, &passed, &args, &ctx)?;
        interpolate_task(&mut task)?;
        task.execute(&self.config, &ctx)
    }
}

/// Build the clap command from configuration
fn build_command(config: &Config) -> Command {
    let mut cmd = Command::new(config.name.clone().unwrap_or_else(|| "whisk".to_string()))
        .version(crate::VERSION)
        .about(
            config
                .usage
                .clone()
                .unwrap_or_else(|| "A YAML-driven task runner".to_string()),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to the config file")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no extra output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("clean")
                .long("clean")
                .help("Drop the cache for one task, or for all tasks")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("completion")
                .long("completion")
                .value_name("SHELL")
                .help("Print a shell completion script")
                .value_parser(clap::value_parser!(Shell)),
        );

    for task in &config.tasks {
        if task.private {
            continue;
        }
        cmd = cmd.subcommand(build_task_command(config, task));
    }

    cmd
}

fn build_task_command(config: &Config, task: &Task) -> Command {
    let mut task_cmd =
        Command::new(task.name.clone()).about(task.usage.clone().unwrap_or_default());

    if let Some(description) = &task.description {
        task_cmd = task_cmd.long_about(description.clone());
    }

    for arg in &task.args {
        task_cmd = task_cmd.arg(
            Arg::new(arg.name.clone())
                .value_name(arg.name.to_uppercase())
                .help(arg.usage.clone().unwrap_or_default())
                .required(true),
        );
    }

    for option in config.options.iter().chain(task.options.iter()) {
        if option.private {
            continue;
        }

        let mut flag = Arg::new(option.name.clone())
            .long(option.name.clone())
            .help(option.usage.clone().unwrap_or_default());

        if let Some(short) = &option.short {
            if let Some(c) = short.chars().next() {
                flag = flag.short(c);
            }
        }

        flag = match option.kind {
            ValueKind::Bool => flag.action(ArgAction::SetTrue),
            _ => flag.value_name(option.name.to_uppercase()),
        };

        task_cmd = task_cmd.arg(flag);
    }

    task_cmd
}

/// Get verbosity level from global flags
fn verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Option values the user explicitly passed on the command line.
fn collect_passed(
    task: &Task,
    config: &Config,
    matches: &ArgMatches,
) -> HashMap<String, String> {
    let mut passed = HashMap::new();

    for option in config.options.iter().chain(task.options.iter()) {
        if option.private {
            continue;
        }
        if matches.value_source(&option.name) != Some(ValueSource::CommandLine) {
            continue;
        }
        let value = match option.kind {
            ValueKind::Bool => "true".to_string(),
            _ => match matches.get_one::<String>(&option.name) {
                Some(value) => value.clone(),
                None => continue,
            },
        };
        passed.insert(option.name.clone(), value);
    }

    passed
}

/// Positional argument values in declaration order.
fn collect_args(task: &Task, matches: &ArgMatches) -> Vec<String> {
    task.args
        .iter()
        .filter_map(|arg| matches.get_one::<String>(&arg.name).cloned())
        .collect()
}

/// Run the CLI application
pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let app = match extract_file_arg(&args) {
        Some(path) => App::with_config_file(path)?,
        None => App::new()?,
    };

    app.run()
}

/// Extract the --file argument before clap parsing; the rest of the CLI
/// surface depends on which config file is loaded.
fn extract_file_arg(args: &[String]) -> Option<PathBuf> {
    for i in 0..args.len() {
        if (args[i] == "--file" || args[i] == "-f") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
    }
    None
}
