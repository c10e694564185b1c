use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("No distributions found in '{dir}'. Build them first or drop --upload-only.")]
    NoArtifacts { dir: String },

    #[error("Invalid artifact pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to read artifact: {0}")]
    Glob(#[from] glob::GlobError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Wheel,
    Sdist,
    Unknown,
}

/// A file produced by the build tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub name: Option<String>,
    pub version: Option<String>,
}

fn wheel_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<name>[A-Za-z0-9_.]+)-(?P<version>[^-]+)(-\d[^-]*)?-[^-]+-[^-]+-[^-]+\.whl$")
            .expect("wheel pattern is valid")
    })
}

fn sdist_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<name>.+)-(?P<version>[0-9][^-]*)\.(tar\.gz|zip)$")
            .expect("sdist pattern is valid")
    })
}

impl Artifact {
    /// Classify a distribution by its file name
    pub fn classify(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (kind, captures) = if let Some(captures) = wheel_pattern().captures(&file_name) {
            (ArtifactKind::Wheel, Some(captures))
        } else if let Some(captures) = sdist_pattern().captures(&file_name) {
            (ArtifactKind::Sdist, Some(captures))
        } else {
            (ArtifactKind::Unknown, None)
        };

        let field = |key: &str| {
            captures
                .as_ref()
                .and_then(|c| c.name(key))
                .map(|m| m.as_str().to_string())
        };

        Self {
            path: path.to_path_buf(),
            kind,
            name: field("name"),
            version: field("version"),
        }
    }

    /// Whether the file name belongs to `package`, ignoring the `-`/`_`/`.` spelling
    pub fn belongs_to(&self, package: &str) -> bool {
        let normalize = |s: &str| s.to_lowercase().replace(['-', '.'], "_");
        self.name
            .as_deref()
            .is_some_and(|name| normalize(name) == normalize(package))
    }
}

/// Every file directly inside `dir`, sorted, the way `dir/*` expands in a
/// shell. Dotfiles are not matched.
pub fn collect_artifacts(dir: &Path) -> Result<Vec<Artifact>, ArtifactError> {
    let pattern = format!("{}/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..Default::default()
    };

    let mut paths = Vec::new();
    for entry in glob::glob_with(&pattern, options)? {
        let path = entry?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(ArtifactError::NoArtifacts {
            dir: dir.display().to_string(),
        });
    }

    let artifacts: Vec<Artifact> = paths.iter().map(|p| Artifact::classify(p)).collect();
    for artifact in &artifacts {
        if artifact.kind == ArtifactKind::Unknown {
            tracing::warn!(path = %artifact.path.display(), "not a wheel or sdist, uploading anyway");
        }
    }
    Ok(artifacts)
}
