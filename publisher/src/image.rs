use crate::runner::{CommandError, CommandLine, CommandRunner, Executor};
use image_builder::{
    build_args, write_containerfile, ContainerRuntime, ImageBuilderError, ImageDefinition,
    CONTAINERFILE_NAME,
};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Image(#[from] ImageBuilderError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Placeholder shown for the temporary build context in dry runs
const DRY_RUN_CONTEXT: &str = "build-context";

/// Pick the requested runtime if it responds to `--version`, otherwise the
/// detected one
pub fn resolve_runtime<R: CommandRunner>(
    requested: Option<ContainerRuntime>,
    runner: &R,
    detect: impl FnOnce() -> ContainerRuntime,
) -> Result<ContainerRuntime, ImageBuilderError> {
    let runtime = match requested {
        Some(runtime) => {
            let probe = CommandLine::new(runtime.command()).arg("--version");
            if !runner.probe(&probe) {
                tracing::warn!(runtime = runtime.command(), "requested runtime is not installed");
                return Err(ImageBuilderError::NoRuntimeAvailable);
            }
            runtime
        }
        None => detect(),
    };

    if runtime.is_available() {
        Ok(runtime)
    } else {
        Err(ImageBuilderError::NoRuntimeAvailable)
    }
}

pub fn image_build_command(
    runtime: ContainerRuntime,
    tag: &str,
    context_dir: &Path,
) -> CommandLine {
    CommandLine::new(runtime.command()).args(build_args(
        tag,
        &context_dir.join(CONTAINERFILE_NAME),
        context_dir,
    ))
}

/// Build `definition` into an image tagged `tag`.
///
/// The Containerfile is the only thing in the build context, which lives in
/// a temporary directory for the duration of the build.
pub fn build_image<R, W>(
    definition: &ImageDefinition,
    runtime: ContainerRuntime,
    tag: &str,
    executor: &mut Executor<R, W>,
) -> Result<(), ImageError>
where
    R: CommandRunner,
    W: Write,
{
    definition.validate()?;

    if executor.is_dry_run() {
        for line in definition.render_containerfile().lines() {
            executor.say(format_args!("[dry-run] {}: {}", CONTAINERFILE_NAME, line))?;
        }
        executor.execute(&image_build_command(runtime, tag, Path::new(DRY_RUN_CONTEXT)))?;
        return Ok(());
    }

    let context = tempfile::tempdir().map_err(ImageBuilderError::Io)?;
    write_containerfile(definition, context.path())?;

    let command = image_build_command(runtime, tag, context.path());
    let outcome = executor.execute(&command)?;
    if !outcome.success {
        return Err(ImageBuilderError::BuildFailed(format!("{} ({})", command, outcome)).into());
    }

    tracing::info!(tag, runtime = runtime.command(), "image built");
    Ok(())
}
