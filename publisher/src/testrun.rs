use crate::config::TestsConfig;
use crate::runner::{CommandError, CommandLine, CommandRunner, Executor, RunOutcome};
use crate::toolchain::{check_tool, ToolchainError};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestRunError {
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error("Tests failed ({outcome}): {command}")]
    TestsFailed { command: String, outcome: RunOutcome },

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Options for one test discovery run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRunOptions {
    pub start_dir: Option<String>,
    pub pattern: Option<String>,
    pub top_level_dir: Option<String>,
    /// Also passed on to the test runner
    pub verbose: bool,
    pub project_dir: PathBuf,
}

/// `<runner> [-s <start dir>] [-p <pattern>] [-t <top dir>] [-v]`, flags overriding config
pub fn discovery_command(config: &TestsConfig, options: &TestRunOptions) -> CommandLine {
    let mut command = config.runner.command();

    if let Some(start_dir) = options.start_dir.as_ref().or(config.start_dir.as_ref()) {
        command = command.args(["-s", start_dir.as_str()]);
    }
    if let Some(pattern) = options.pattern.as_ref().or(config.pattern.as_ref()) {
        command = command.args(["-p", pattern.as_str()]);
    }
    if let Some(top) = options
        .top_level_dir
        .as_ref()
        .or(config.top_level_dir.as_ref())
    {
        command = command.args(["-t", top.as_str()]);
    }
    if options.verbose {
        command = command.arg("-v");
    }

    command.current_dir(&options.project_dir)
}

pub fn run_tests<R, W>(
    config: &TestsConfig,
    options: &TestRunOptions,
    executor: &mut Executor<R, W>,
) -> Result<(), TestRunError>
where
    R: CommandRunner,
    W: Write,
{
    if !executor.is_dry_run() {
        check_tool(executor.runner(), "test", &config.runner)?;
    }

    let command = discovery_command(config, options);
    let outcome = executor.execute(&command)?;
    if !outcome.success {
        return Err(TestRunError::TestsFailed {
            command: command.to_string(),
            outcome,
        });
    }

    tracing::info!(command = %command, "tests passed");
    Ok(())
}
