//! Build-then-upload release flow.

use crate::artifact::{collect_artifacts, Artifact, ArtifactError};
use crate::config::PublishConfig;
use crate::environment::Environment;
use crate::runner::{CommandError, CommandLine, CommandRunner, Executor, RunOutcome};
use crate::toolchain::{check_tool, ToolchainError};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("--build-only and --upload-only are mutually exclusive")]
    ConflictingFlags,

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error("Build failed ({outcome}): {command}")]
    BuildFailed { command: String, outcome: RunOutcome },

    #[error("Upload failed ({outcome}): {command}")]
    UploadFailed { command: String, outcome: RunOutcome },

    #[error(transparent)]
    Artifacts(#[from] ArtifactError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

pub type PublishResult<T> = Result<T, PublishError>;

/// Validated options for one publish run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub environment: Environment,
    pub dry_run: bool,
    pub verbose: bool,
    pub build_only: bool,
    pub upload_only: bool,
    /// Directory the tools run in; output directories are relative to it
    pub project_dir: PathBuf,
}

impl PublishOptions {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            dry_run: false,
            verbose: false,
            build_only: false,
            upload_only: false,
            project_dir: PathBuf::from("."),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    /// Restrict the run to one step; asking for both is an error
    pub fn with_steps(mut self, build_only: bool, upload_only: bool) -> PublishResult<Self> {
        if build_only && upload_only {
            return Err(PublishError::ConflictingFlags);
        }
        self.build_only = build_only;
        self.upload_only = upload_only;
        Ok(self)
    }

    pub fn builds(&self) -> bool {
        !self.upload_only
    }

    pub fn uploads(&self) -> bool {
        !self.build_only
    }

    pub fn dist_dir(&self) -> &'static str {
        self.environment.dist_dir()
    }
}

/// What a publish run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub environment: Environment,
    pub dry_run: bool,
    pub built: bool,
    /// Files handed to the upload tool; empty when nothing was uploaded
    pub uploaded: Vec<Artifact>,
}

/// `<build tool> --outdir <dist dir>`
pub fn build_command(config: &PublishConfig, options: &PublishOptions) -> CommandLine {
    config
        .build
        .command()
        .args(["--outdir", options.dist_dir()])
        .current_dir(&options.project_dir)
}

/// `<upload tool> [--repository <test repository>] <files...>`
pub fn upload_command<I, S>(config: &PublishConfig, options: &PublishOptions, files: I) -> CommandLine
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    config
        .upload
        .command()
        .args(options.environment.repository_args(&config.test_repository))
        .args(files)
        .current_dir(&options.project_dir)
}

/// Upload arguments before expansion, as a shell would be handed them
pub fn upload_glob(options: &PublishOptions) -> String {
    format!("{}/*", options.dist_dir())
}

fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Build and/or upload according to `options`.
///
/// Stops at the first failing step. In dry-run mode nothing is probed,
/// run, or read from disk; the commands are only printed.
pub fn publish<R, W>(
    options: &PublishOptions,
    config: &PublishConfig,
    executor: &mut Executor<R, W>,
) -> PublishResult<PublishReport>
where
    R: CommandRunner,
    W: Write,
{
    tracing::info!(
        environment = %options.environment,
        dist_dir = options.dist_dir(),
        build = options.builds(),
        upload = options.uploads(),
        dry_run = options.dry_run,
        "publishing {}",
        config.package
    );

    if !executor.is_dry_run() {
        if options.builds() {
            check_tool(executor.runner(), "build", &config.build)?;
        }
        if options.uploads() {
            check_tool(executor.runner(), "upload", &config.upload)?;
        }
    }

    let mut report = PublishReport {
        environment: options.environment,
        dry_run: executor.is_dry_run(),
        built: false,
        uploaded: Vec::new(),
    };

    if options.builds() {
        let command = build_command(config, options);
        let outcome = executor.execute(&command)?;
        if !outcome.success {
            return Err(PublishError::BuildFailed {
                command: command.to_string(),
                outcome,
            });
        }
        report.built = true;
    }

    if options.uploads() {
        let command = if executor.is_dry_run() {
            upload_command(config, options, [upload_glob(options)])
        } else {
            let dist_dir = options.project_dir.join(options.dist_dir());
            let artifacts = collect_artifacts(&dist_dir)?;
            for artifact in &artifacts {
                if artifact.name.is_some() && !artifact.belongs_to(&config.package) {
                    tracing::warn!(
                        path = %artifact.path.display(),
                        package = %config.package,
                        "artifact does not look like it belongs to the package"
                    );
                }
            }
            let files: Vec<String> = artifacts
                .iter()
                .map(|a| relative_to(&a.path, &options.project_dir))
                .collect();
            report.uploaded = artifacts;
            upload_command(config, options, files)
        };

        let outcome = executor.execute(&command)?;
        if !outcome.success {
            return Err(PublishError::UploadFailed {
                command: command.to_string(),
                outcome,
            });
        }
    }

    Ok(report)
}
