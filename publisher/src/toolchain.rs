use crate::runner::{CommandLine, CommandRunner};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ToolchainError {
    #[error("The {tool} tool is not available ('{probe}' failed). Install it with: {install_hint}")]
    Missing {
        tool: String,
        probe: String,
        install_hint: String,
    },
}

/// An external program plus the leading arguments every invocation shares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Arguments used to check the tool is installed.
    ///
    /// Defaults to the shared arguments followed by `--version`.
    #[serde(default)]
    pub probe: Option<Vec<String>>,
    #[serde(default)]
    pub install_hint: Option<String>,
}

impl ToolSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            probe: None,
            install_hint: None,
        }
    }

    pub fn with_probe<I, S>(mut self, probe: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.probe = Some(probe.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_install_hint(mut self, hint: impl Into<String>) -> Self {
        self.install_hint = Some(hint.into());
        self
    }

    /// The program with its shared arguments, ready for more
    pub fn command(&self) -> CommandLine {
        CommandLine::new(&self.program).args(self.args.iter().cloned())
    }

    pub fn probe_command(&self) -> CommandLine {
        match &self.probe {
            Some(probe) => CommandLine::new(&self.program).args(probe.iter().cloned()),
            None => self.command().arg("--version"),
        }
    }

    pub fn install_hint(&self) -> String {
        self.install_hint
            .clone()
            .unwrap_or_else(|| format!("make sure '{}' is installed and on PATH", self.program))
    }
}

/// Fail with a remediation message unless `spec` can be run
pub fn check_tool<R: CommandRunner>(
    runner: &R,
    name: &str,
    spec: &ToolSpec,
) -> Result<(), ToolchainError> {
    let probe = spec.probe_command();
    if runner.probe(&probe) {
        tracing::debug!(tool = name, probe = %probe, "tool available");
        return Ok(());
    }

    tracing::warn!(tool = name, probe = %probe, "tool missing");
    Err(ToolchainError::Missing {
        tool: name.to_string(),
        probe: probe.to_string(),
        install_hint: spec.install_hint(),
    })
}
