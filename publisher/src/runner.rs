//! External command execution.
//!
//! Every external program the tooling drives goes through a [`CommandRunner`].
//! The [`Executor`] sits in front of it and decides whether a command is
//! announced, executed, or both, which is how `--verbose` and `--dry-run`
//! are implemented.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    /// The program could not be started at all
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A program with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; the current one when unset
    pub cwd: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

fn needs_quoting(word: &str) -> bool {
    word.is_empty()
        || word.chars().any(|c| {
            c.is_whitespace()
                || matches!(
                    c,
                    '\'' | '"' | '\\' | '$' | '`' | '!' | '&' | '|' | ';' | '<' | '>' | '(' | ')'
                )
        })
}

fn quote(word: &str) -> String {
    if needs_quoting(word) {
        format!("'{}'", word.replace('\'', r"'\''"))
    } else {
        word.to_string()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// How a finished command exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    /// Exit code, absent when the process was killed by a signal
    pub code: Option<i32>,
}

impl RunOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }

    pub fn failure(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

pub trait CommandRunner {
    /// Run to completion with inherited stdio
    fn run(&self, command: &CommandLine) -> Result<RunOutcome, CommandError>;

    /// Whether the command starts and exits successfully, output discarded
    fn probe(&self, command: &CommandLine) -> bool;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &CommandLine) -> Result<RunOutcome, CommandError> {
        (**self).run(command)
    }

    fn probe(&self, command: &CommandLine) -> bool {
        (**self).probe(command)
    }
}

/// Runs commands as child processes of this one
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(command: &CommandLine) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = command.cwd.as_ref().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> Result<RunOutcome, CommandError> {
        tracing::debug!(command = %command, "spawning");
        let status = Self::command(command)
            .status()
            .map_err(|source| CommandError::Spawn {
                command: command.to_string(),
                source,
            })?;

        Ok(RunOutcome {
            success: status.success(),
            code: status.code(),
        })
    }

    fn probe(&self, command: &CommandLine) -> bool {
        Self::command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }
}

/// Whether commands are executed, announced, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionMode {
    pub dry_run: bool,
    pub verbose: bool,
}

/// Applies an [`ExecutionMode`] in front of a runner
pub struct Executor<R, W> {
    runner: R,
    mode: ExecutionMode,
    out: W,
}

impl<R: CommandRunner> Executor<R, io::Stdout> {
    pub fn stdout(runner: R, mode: ExecutionMode) -> Self {
        Self::new(runner, mode, io::stdout())
    }
}

impl<R: CommandRunner, W: Write> Executor<R, W> {
    pub fn new(runner: R, mode: ExecutionMode, out: W) -> Self {
        Self { runner, mode, out }
    }

    pub fn is_dry_run(&self) -> bool {
        self.mode.dry_run
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Write a line of user-facing output
    pub fn say(&mut self, line: impl fmt::Display) -> Result<(), CommandError> {
        writeln!(self.out, "{}", line)?;
        Ok(())
    }

    /// Run `command`, or only print it in dry-run mode.
    ///
    /// Dry runs report success without touching the runner.
    pub fn execute(&mut self, command: &CommandLine) -> Result<RunOutcome, CommandError> {
        if self.mode.dry_run {
            self.say(format_args!("[dry-run] {}", command))?;
            return Ok(RunOutcome::success());
        }

        if self.mode.verbose {
            self.say(format_args!("+ {}", command))?;
            self.out.flush()?;
        }

        let outcome = self.runner.run(command)?;
        tracing::info!(command = %command, success = outcome.success, code = ?outcome.code, "command finished");
        Ok(outcome)
    }

    pub fn into_parts(self) -> (R, W) {
        (self.runner, self.out)
    }
}
