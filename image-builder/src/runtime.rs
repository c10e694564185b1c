use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};

/// Container runtime types supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    /// Podman container runtime
    Podman,
    /// Docker container runtime
    Docker,
    /// No container runtime available
    None,
}

impl ContainerRuntime {
    /// Get the command name for this runtime
    pub fn command(&self) -> &'static str {
        match self {
            ContainerRuntime::Podman => "podman",
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::None => "",
        }
    }

    /// Whether this names a runtime at all; installation is probed separately
    pub fn is_available(&self) -> bool {
        matches!(self, ContainerRuntime::Podman | ContainerRuntime::Docker)
    }
}

fn responds_to_version(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Detect available container runtime in order of preference
pub fn detect_runtime() -> ContainerRuntime {
    // Podman first, it builds rootless without a daemon
    for runtime in [ContainerRuntime::Podman, ContainerRuntime::Docker] {
        if responds_to_version(runtime.command()) {
            tracing::debug!(runtime = runtime.command(), "detected container runtime");
            return runtime;
        }
    }

    ContainerRuntime::None
}

/// Arguments for `<runtime> build` producing `tag` from `containerfile`
pub fn build_args(tag: &str, containerfile: &Path, context_dir: &Path) -> Vec<String> {
    vec![
        "build".to_string(),
        "-t".to_string(),
        tag.to_string(),
        "-f".to_string(),
        containerfile.display().to_string(),
        context_dir.display().to_string(),
    ]
}
