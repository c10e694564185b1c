//! Container image utilities for the resht package
//!
//! This crate describes the container image that installs a published
//! release of the package from a package index, renders it as a
//! Containerfile, and detects which container runtime can build it.

pub mod runtime;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use runtime::{build_args, detect_runtime, ContainerRuntime};

/// File name the rendered definition is written under inside a build context
pub const CONTAINERFILE_NAME: &str = "Containerfile";

/// Errors related to image definitions and builds
#[derive(Error, Debug)]
pub enum ImageBuilderError {
    #[error("Invalid image definition: {0}")]
    InvalidDefinition(String),
    #[error("No container runtime available. Install Podman or Docker to build images.")]
    NoRuntimeAvailable,
    #[error("Image build failed: {0}")]
    BuildFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ImageBuilderResult<T> = Result<T, ImageBuilderError>;

/// Package index a release is installed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageIndex {
    /// The test index, where pre-release uploads land
    #[default]
    Test,
    /// The production index
    Production,
}

impl PackageIndex {
    /// Simple-API URL of this index
    pub fn simple_url(&self) -> &'static str {
        match self {
            PackageIndex::Test => "https://test.pypi.org/simple/",
            PackageIndex::Production => "https://pypi.org/simple/",
        }
    }
}

impl fmt::Display for PackageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageIndex::Test => write!(f, "TestPyPI"),
            PackageIndex::Production => write!(f, "PyPI"),
        }
    }
}

/// Definition of an image that installs a published package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageDefinition {
    /// Base image with a Python interpreter and pip
    pub base_image: String,
    /// Package to install
    pub package: String,
    /// Optional exact version pin
    pub version: Option<String>,
    /// Index the package is installed from
    pub index: PackageIndex,
    /// Skip transitive dependencies
    pub no_deps: bool,
    /// Command the container runs; the package name when unset
    pub entrypoint: Option<String>,
}

impl Default for ImageDefinition {
    fn default() -> Self {
        Self {
            base_image: "python:3".to_string(),
            package: "resht".to_string(),
            version: None,
            index: PackageIndex::Test,
            no_deps: true,
            entrypoint: None,
        }
    }
}

impl ImageDefinition {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    pub fn with_base_image(mut self, base_image: impl Into<String>) -> Self {
        self.base_image = base_image.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_index(mut self, index: PackageIndex) -> Self {
        self.index = index;
        self
    }

    pub fn with_dependencies(mut self, with_deps: bool) -> Self {
        self.no_deps = !with_deps;
        self
    }

    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    /// Command the container's entrypoint invokes
    pub fn entrypoint(&self) -> &str {
        self.entrypoint.as_deref().unwrap_or(&self.package)
    }

    /// Requirement string handed to pip, e.g. `resht==0.4.1`
    pub fn requirement(&self) -> String {
        match &self.version {
            Some(version) => format!("{}=={}", self.package, version),
            None => self.package.clone(),
        }
    }

    /// Check the definition renders to a well-formed Containerfile.
    ///
    /// Package and version land unquoted in a shell-form `RUN`, so they are
    /// limited to the characters package names and versions use. The
    /// entrypoint is a JSON string in the exec form.
    pub fn validate(&self) -> ImageBuilderResult<()> {
        let invalid = |message: String| Err(ImageBuilderError::InvalidDefinition(message));

        if self.package.trim().is_empty() {
            return invalid("package name cannot be empty".to_string());
        }
        if !self.package.chars().all(is_package_char) {
            return invalid(format!("invalid package name '{}'", self.package));
        }

        if self.base_image.trim().is_empty() {
            return invalid("base image cannot be empty".to_string());
        }
        if self.base_image.chars().any(char::is_whitespace) {
            return invalid(format!("invalid base image '{}'", self.base_image));
        }

        let entrypoint = self.entrypoint();
        if entrypoint.trim().is_empty() {
            return invalid("entrypoint cannot be empty".to_string());
        }
        if entrypoint
            .chars()
            .any(|c| c == '"' || c == '\\' || c.is_control())
        {
            return invalid(format!("invalid entrypoint '{}'", entrypoint));
        }

        if let Some(version) = &self.version {
            if version.is_empty() || !version.chars().all(is_version_char) {
                return invalid(format!("invalid version pin '{}'", version));
            }
        }

        Ok(())
    }

    /// Render the definition in Containerfile (Dockerfile) syntax
    pub fn render_containerfile(&self) -> String {
        let mut install = format!(
            "pip install --no-cache-dir --index-url {}",
            self.index.simple_url()
        );
        if self.no_deps {
            install.push_str(" --no-deps");
        }
        install.push(' ');
        install.push_str(&self.requirement());

        format!(
            "FROM {}\nRUN {}\nENTRYPOINT [\"{}\"]\n",
            self.base_image,
            install,
            self.entrypoint()
        )
    }
}

fn is_package_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '!')
}

/// Write the rendered Containerfile into `context_dir`
pub fn write_containerfile(
    definition: &ImageDefinition,
    context_dir: &Path,
) -> ImageBuilderResult<PathBuf> {
    definition.validate()?;
    let path = context_dir.join(CONTAINERFILE_NAME);
    std::fs::write(&path, definition.render_containerfile())?;
    tracing::debug!(path = %path.display(), "wrote containerfile");
    Ok(path)
}
