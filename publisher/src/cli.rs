//! Argument parsing and entrypoints for the `publish`, `run-tests` and
//! `build-image` binaries.
//!
//! Every failure ends the process with status 1 after printing
//! `Error: <message>` to stderr. `--help` and `--version` exit 0.

use crate::config::{ConfigError, PublishConfig};
use crate::environment::{Environment, EnvironmentError};
use crate::image::{build_image, resolve_runtime, ImageError};
use crate::publish::{publish, PublishError, PublishOptions, PublishReport};
use crate::runner::{CommandError, ExecutionMode, Executor, SystemRunner};
use crate::testrun::{run_tests, TestRunError, TestRunOptions};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use image_builder::{detect_runtime, ContainerRuntime, ImageDefinition};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Tests(#[from] TestRunError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CliError {
    /// Usage mistakes get the usage line printed after the message
    fn is_usage_error(&self) -> bool {
        matches!(
            self,
            CliError::Environment(_) | CliError::Publish(PublishError::ConflictingFlags)
        )
    }
}

/// Install the stderr log subscriber; `RUST_LOG` wins over `default_level`
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn log_level(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

/// Parse with clap, mapping its exits onto ours: help/version 0, errors 1
fn parse_or_exit<P, I, T>(args: I) -> Result<P, ExitCode>
where
    P: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    P::try_parse_from(args).map_err(|e| {
        let _ = e.print();
        if e.use_stderr() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    })
}

fn finish<P: CommandFactory>(result: Result<(), CliError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {}", e);
            if e.is_usage_error() {
                eprintln!("{}", P::command().render_usage());
            }
            ExitCode::FAILURE
        }
    }
}

/// Build the resht package and upload it to a package index
#[derive(Parser, Debug)]
#[command(name = "publish", version)]
#[command(about = "Build the resht package and upload it to a package index")]
pub struct PublishArgs {
    /// Target environment: `test` uploads to TestPyPI from dist-test/, `live` to PyPI from dist/
    #[arg(value_name = "test|live")]
    pub environment: Option<String>,
    /// Print the commands without running them
    #[arg(short, long)]
    pub dry_run: bool,
    /// Echo each command before running it
    #[arg(short, long)]
    pub verbose: bool,
    /// Build the distributions but do not upload them
    #[arg(short, long)]
    pub build_only: bool,
    /// Upload previously built distributions without rebuilding
    #[arg(short, long)]
    pub upload_only: bool,
    /// Project directory the tools run in
    #[arg(short = 'C', long, default_value = ".")]
    pub project_dir: PathBuf,
    /// Config file (defaults to $PUBLISH_CONFIG, then publish.toml in the project directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl PublishArgs {
    pub fn options(&self) -> Result<PublishOptions, CliError> {
        let environment = Environment::from_arg(self.environment.as_deref())?;
        let options = PublishOptions::new(environment)
            .with_dry_run(self.dry_run)
            .with_verbose(self.verbose)
            .with_project_dir(&self.project_dir)
            .with_steps(self.build_only, self.upload_only)?;
        Ok(options)
    }
}

fn summarize(report: &PublishReport, options: &PublishOptions) -> String {
    if report.dry_run {
        return "Dry run complete: nothing was built or uploaded.".to_string();
    }

    let index = report.environment.package_index();
    match (report.built, report.uploaded.len()) {
        (true, 0) => format!("Built distributions in {}/", options.dist_dir()),
        (_, n) => format!(
            "Uploaded {} file{} from {}/ to {}",
            n,
            if n == 1 { "" } else { "s" },
            options.dist_dir(),
            index
        ),
    }
}

pub fn run_publish(args: &PublishArgs) -> Result<(), CliError> {
    let options = args.options()?;
    let config = PublishConfig::load(args.config.as_deref(), &options.project_dir)?;

    let mode = ExecutionMode {
        dry_run: options.dry_run,
        verbose: options.verbose,
    };
    let mut executor = Executor::stdout(SystemRunner, mode);
    let report = publish(&options, &config, &mut executor)?;
    executor.say(summarize(&report, &options))?;
    Ok(())
}

/// Entrypoint of the `publish` binary
pub fn publish_main<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: PublishArgs = match parse_or_exit(args) {
        Ok(args) => args,
        Err(code) => return code,
    };
    init_logging(log_level(args.verbose));
    tracing::debug!(?args, "arguments parsed");
    finish::<PublishArgs>(run_publish(&args))
}

/// Discover and run the resht test suite
#[derive(Parser, Debug)]
#[command(name = "run-tests", version)]
#[command(about = "Discover and run the resht test suite")]
pub struct RunTestsArgs {
    /// Print the test command without running it
    #[arg(short, long)]
    pub dry_run: bool,
    /// Echo the command and run the tests verbosely
    #[arg(short, long)]
    pub verbose: bool,
    /// Directory to start discovery from
    #[arg(short, long)]
    pub start_dir: Option<String>,
    /// Pattern test files must match
    #[arg(short, long)]
    pub pattern: Option<String>,
    /// Directory the package under test is imported from
    #[arg(short, long)]
    pub top_level_dir: Option<String>,
    /// Project directory the tests run in
    #[arg(short = 'C', long, default_value = ".")]
    pub project_dir: PathBuf,
    /// Config file (defaults to $PUBLISH_CONFIG, then publish.toml in the project directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn run_test_suite(args: &RunTestsArgs) -> Result<(), CliError> {
    let config = PublishConfig::load(args.config.as_deref(), &args.project_dir)?;
    let options = TestRunOptions {
        start_dir: args.start_dir.clone(),
        pattern: args.pattern.clone(),
        top_level_dir: args.top_level_dir.clone(),
        verbose: args.verbose,
        project_dir: args.project_dir.clone(),
    };
    let mode = ExecutionMode {
        dry_run: args.dry_run,
        verbose: args.verbose,
    };
    let mut executor = Executor::stdout(SystemRunner, mode);
    run_tests(&config.tests, &options, &mut executor)?;
    Ok(())
}

/// Entrypoint of the `run-tests` binary
pub fn run_tests_main<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: RunTestsArgs = match parse_or_exit(args) {
        Ok(args) => args,
        Err(code) => return code,
    };
    init_logging(log_level(args.verbose));
    finish::<RunTestsArgs>(run_test_suite(&args))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuntimeArg {
    Podman,
    Docker,
}

impl From<RuntimeArg> for ContainerRuntime {
    fn from(arg: RuntimeArg) -> Self {
        match arg {
            RuntimeArg::Podman => ContainerRuntime::Podman,
            RuntimeArg::Docker => ContainerRuntime::Docker,
        }
    }
}

/// Overrides for the image definition from the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ImageArgs {
    /// Package to install
    #[arg(long)]
    pub package: Option<String>,
    /// Exact package version to install
    #[arg(long)]
    pub package_version: Option<String>,
    /// Index to install from: `test` (TestPyPI) or `live` (PyPI)
    #[arg(long, value_name = "test|live")]
    pub index: Option<Environment>,
    /// Base image providing Python and pip
    #[arg(long)]
    pub base_image: Option<String>,
    /// Command the container runs
    #[arg(long)]
    pub entrypoint: Option<String>,
    /// Install the package's dependencies too
    #[arg(long)]
    pub with_deps: bool,
}

impl ImageArgs {
    pub fn apply(&self, mut definition: ImageDefinition) -> ImageDefinition {
        if let Some(package) = &self.package {
            definition.package = package.clone();
        }
        if let Some(version) = &self.package_version {
            definition = definition.with_version(version.clone());
        }
        if let Some(index) = self.index {
            definition = definition.with_index(index.package_index());
        }
        if let Some(base_image) = &self.base_image {
            definition = definition.with_base_image(base_image.clone());
        }
        if let Some(entrypoint) = &self.entrypoint {
            definition = definition.with_entrypoint(entrypoint.clone());
        }
        if self.with_deps {
            definition = definition.with_dependencies(true);
        }
        definition
    }
}

#[derive(Subcommand, Debug)]
pub enum ImageCommand {
    /// Print or write the Containerfile
    Render {
        #[command(flatten)]
        image: ImageArgs,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build the image with podman or docker
    Build {
        #[command(flatten)]
        image: ImageArgs,
        /// Image tag (defaults to <package>:<version> or <package>:latest)
        #[arg(short, long)]
        tag: Option<String>,
        /// Container runtime (detected when omitted, podman preferred)
        #[arg(long, value_enum)]
        runtime: Option<RuntimeArg>,
        /// Print the Containerfile and build command without building
        #[arg(short, long)]
        dry_run: bool,
        /// Echo the build command before running it
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Container image that installs a published resht release
#[derive(Parser, Debug)]
#[command(name = "build-image", version)]
#[command(about = "Render or build the container image that installs a published resht release")]
pub struct BuildImageArgs {
    #[command(subcommand)]
    pub command: ImageCommand,
    /// Project directory holding publish.toml
    #[arg(short = 'C', long, default_value = ".", global = true)]
    pub project_dir: PathBuf,
    /// Config file (defaults to $PUBLISH_CONFIG, then publish.toml in the project directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

fn default_tag(definition: &ImageDefinition) -> String {
    format!(
        "{}:{}",
        definition.package,
        definition.version.as_deref().unwrap_or("latest")
    )
}

fn write_output(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn run_build_image(args: &BuildImageArgs) -> Result<(), CliError> {
    let config = PublishConfig::load(args.config.as_deref(), &args.project_dir)?;

    match &args.command {
        ImageCommand::Render { image, output } => {
            let definition = image.apply(config.image.clone());
            definition.validate().map_err(ImageError::from)?;
            let rendered = definition.render_containerfile();
            match output {
                Some(path) => {
                    write_output(path, &rendered)?;
                    tracing::info!(path = %path.display(), "containerfile written");
                }
                None => print!("{}", rendered),
            }
            Ok(())
        }
        ImageCommand::Build {
            image,
            tag,
            runtime,
            dry_run,
            verbose,
        } => {
            let definition = image.apply(config.image.clone());
            let tag = tag.clone().unwrap_or_else(|| default_tag(&definition));
            let requested = runtime.map(ContainerRuntime::from);
            let runtime = if *dry_run {
                // Dry runs probe nothing and show podman when nothing is detected
                match requested.unwrap_or_else(detect_runtime) {
                    ContainerRuntime::None => ContainerRuntime::Podman,
                    runtime => runtime,
                }
            } else {
                resolve_runtime(requested, &SystemRunner, detect_runtime)
                    .map_err(ImageError::from)?
            };

            let mode = ExecutionMode {
                dry_run: *dry_run,
                verbose: *verbose,
            };
            let mut executor = Executor::stdout(SystemRunner, mode);
            build_image(&definition, runtime, &tag, &mut executor)?;
            if !dry_run {
                executor.say(format_args!("Built image {}", tag))?;
            }
            Ok(())
        }
    }
}

/// Entrypoint of the `build-image` binary
pub fn build_image_main<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: BuildImageArgs = match parse_or_exit(args) {
        Ok(args) => args,
        Err(code) => return code,
    };
    let verbose = matches!(args.command, ImageCommand::Build { verbose: true, .. });
    init_logging(log_level(verbose));
    finish::<BuildImageArgs>(run_build_image(&args))
}
