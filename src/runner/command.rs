//! Command execution
//!
//! Thin adapter between the run model and `std::process`. Three call modes:
//! run (inherit stdio), check (discard output, success flag only), and
//! capture (stdout becomes a value).

use std::path::PathBuf;
use std::process::{Command as StdCommand, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::types::Command;
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::context::Context;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Record that the process received an interrupt. The running child sees the
/// same signal from the terminal; we stop scheduling work once it exits.
pub fn flag_interrupt() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

fn interpreter_command(script: &str, ctx: &Context) -> StdCommand {
    let mut command = StdCommand::new(&ctx.interpreter[0]);
    if ctx.interpreter.len() > 1 {
        command.args(&ctx.interpreter[1..]);
    }
    command.arg(script);
    command.current_dir(ctx.config_dir());
    command
}

/// Execute a run command, echoing its print form unless quiet.
pub fn run_command(cmd: &Command, ctx: &Context) -> ExecutionResult<()> {
    if !cmd.quiet && !ctx.any_quiet() {
        ctx.logger.command(&cmd.print);
    }

    let mut command = interpreter_command(&cmd.exec, ctx);
    if let Some(dir) = &cmd.dir {
        let mut path = PathBuf::from(ctx.config_dir());
        path.push(dir);
        command.current_dir(path);
    }

    command.stdin(Stdio::inherit());
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    let status = command
        .status()
        .map_err(|_| ExecutionError::CommandFailed(None))?;

    if interrupted() {
        return Err(ExecutionError::Interrupted);
    }
    if !status.success() {
        return Err(ExecutionError::CommandFailed(status.code()));
    }

    Ok(())
}

/// Run a guard command; a non-zero exit is a failed check, not an error.
pub fn check_command(script: &str, ctx: &Context) -> ExecutionResult<bool> {
    let mut command = interpreter_command(script, ctx);
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    let status = command
        .status()
        .map_err(|_| ExecutionError::CommandFailed(None))?;

    if interrupted() {
        return Err(ExecutionError::Interrupted);
    }
    Ok(status.success())
}

/// Run a command and return its stdout with one trailing newline trimmed.
pub fn capture_command(script: &str, ctx: &Context) -> ExecutionResult<String> {
    let mut command = interpreter_command(script, ctx);
    command.stdin(Stdio::null());
    command.stderr(Stdio::inherit());

    let output = command
        .output()
        .map_err(|_| ExecutionError::CommandFailed(None))?;

    if interrupted() {
        return Err(ExecutionError::Interrupted);
    }
    if !output.status.success() {
        return Err(ExecutionError::CommandFailed(output.status.code()));
    }

    let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if stdout.ends_with('\n') {
        stdout.pop();
        if stdout.ends_with('\r') {
            stdout.pop();
        }
    }
    Ok(stdout)
}
