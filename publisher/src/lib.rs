pub mod artifact;
pub mod cli;
pub mod config;
pub mod environment;
pub mod image;
pub mod publish;
pub mod runner;
pub mod testrun;
pub mod toolchain;

pub use artifact::{collect_artifacts, Artifact, ArtifactError, ArtifactKind};
pub use cli::{BuildImageArgs, CliError, PublishArgs, RunTestsArgs};
pub use config::{ConfigError, PublishConfig, TestsConfig};
pub use environment::{Environment, EnvironmentError};
pub use image::{build_image, resolve_runtime, ImageError};
pub use publish::{
    build_command, publish, upload_command, PublishError, PublishOptions, PublishReport,
    PublishResult,
};
pub use runner::{
    CommandError, CommandLine, CommandRunner, ExecutionMode, Executor, RunOutcome, SystemRunner,
};
pub use testrun::{discovery_command, run_tests, TestRunError, TestRunOptions};
pub use toolchain::{check_tool, ToolSpec, ToolchainError};
