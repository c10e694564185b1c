use crate::toolchain::ToolSpec;
use image_builder::ImageDefinition;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "PUBLISH_CONFIG";

/// Config file picked up from the project directory when present
pub const DEFAULT_CONFIG_FILE: &str = "publish.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the publish, test and image commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Name of the package being released
    pub package: String,
    /// Repository name the upload tool knows the test index by
    pub test_repository: String,
    pub build: ToolSpec,
    pub upload: ToolSpec,
    pub tests: TestsConfig,
    pub image: ImageDefinition,
}

/// Discovery settings; the defaults find the client suite in `resht/tests`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestsConfig {
    pub runner: ToolSpec,
    pub start_dir: Option<String>,
    pub pattern: Option<String>,
    /// Directory the `resht` package is importable from
    pub top_level_dir: Option<String>,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            runner: ToolSpec::new("python3", ["-m", "unittest", "discover"])
                .with_probe(["--version"])
                .with_install_hint("install Python 3 and make sure python3 is on PATH"),
            start_dir: Some("resht/tests".to_string()),
            pattern: Some("test_*.py".to_string()),
            top_level_dir: Some(".".to_string()),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            package: "resht".to_string(),
            test_repository: "testpypi".to_string(),
            build: ToolSpec::new("python3", ["-m", "build"])
                .with_install_hint("python3 -m pip install build"),
            upload: ToolSpec::new("twine", ["upload"])
                .with_probe(["--version"])
                .with_install_hint("python3 -m pip install twine"),
            tests: TestsConfig::default(),
            image: ImageDefinition::default(),
        }
    }
}

impl PublishConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_build_tool(mut self, build: ToolSpec) -> Self {
        self.build = build;
        self
    }

    pub fn with_upload_tool(mut self, upload: ToolSpec) -> Self {
        self.upload = upload;
        self
    }

    pub fn with_test_runner(mut self, runner: ToolSpec) -> Self {
        self.tests.runner = runner;
        self
    }

    pub fn with_test_repository(mut self, repository: impl Into<String>) -> Self {
        self.test_repository = repository.into();
        self
    }

    /// Parse a config document; absent keys keep their defaults
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    /// Load and validate the config for a project.
    ///
    /// An explicit path wins over `PUBLISH_CONFIG`, which wins over a
    /// `publish.toml` in the project directory. Without any of them the
    /// defaults apply.
    pub fn load(explicit: Option<&Path>, project_dir: &Path) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let in_project = project_dir.join(DEFAULT_CONFIG_FILE);

        let config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::from_file(&path)?
            }
            None if in_project.is_file() => {
                tracing::debug!(path = %in_project.display(), "loading project config");
                Self::from_file(&in_project)?
            }
            None => {
                tracing::debug!("no config file, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.package.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "package name cannot be empty".to_string(),
            ));
        }

        if self.test_repository.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "test repository cannot be empty".to_string(),
            ));
        }

        for (name, tool) in [
            ("build", &self.build),
            ("upload", &self.upload),
            ("tests.runner", &self.tests.runner),
        ] {
            if tool.program.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "{} program cannot be empty",
                    name
                )));
            }
        }

        self.image
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = PublishConfig::default();
        assert_eq!(config.package, "resht");
        assert_eq!(config.test_repository, "testpypi");
        assert_eq!(config.build.program, "python3");
        assert_eq!(config.build.args, vec!["-m", "build"]);
        assert_eq!(config.upload.program, "twine");
        assert_eq!(config.upload.args, vec!["upload"]);
        assert_eq!(config.tests.runner.args, vec!["-m", "unittest", "discover"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = PublishConfig::new()
            .with_package("other")
            .with_test_repository("staging")
            .with_build_tool(ToolSpec::new("uv", ["build"]))
            .with_upload_tool(ToolSpec::new("uv", ["publish"]))
            .with_test_runner(ToolSpec::new("pytest", ["-q"]));

        assert_eq!(config.package, "other");
        assert_eq!(config.test_repository, "staging");
        assert_eq!(config.build.args, vec!["build"]);
        assert_eq!(config.upload.program, "uv");
        assert_eq!(config.tests.runner.program, "pytest");
        assert_eq!(config.tests.start_dir.as_deref(), Some("resht/tests"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = PublishConfig::from_toml_str(
            r#"
package = "resht"

[upload]
program = "python3"
args = ["-m", "twine", "upload"]

[tests]
start_dir = "tests"
"#,
            Path::new("publish.toml"),
        )
        .unwrap();

        assert_eq!(config.upload.program, "python3");
        assert_eq!(config.upload.args, vec!["-m", "twine", "upload"]);
        assert_eq!(config.build, PublishConfig::default().build);
        assert_eq!(config.tests.start_dir.as_deref(), Some("tests"));
        assert_eq!(config.tests.pattern.as_deref(), Some("test_*.py"));
        assert_eq!(config.tests.runner.program, "python3");
        assert_eq!(config.test_repository, "testpypi");
    }

    #[test]
    fn test_image_section() {
        let config = PublishConfig::from_toml_str(
            r#"
[image]
base_image = "python:3.12-slim"
index = "production"
"#,
            Path::new("publish.toml"),
        )
        .unwrap();

        assert_eq!(config.image.base_image, "python:3.12-slim");
        assert_eq!(config.image.index, image_builder::PackageIndex::Production);
        assert!(config.image.no_deps);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = PublishConfig::from_toml_str("package = [", Path::new("broken.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = PublishConfig::default();

        config.package = "".to_string();
        assert!(config.validate().is_err());

        config.package = "resht".to_string();
        config.test_repository = " ".to_string();
        assert!(config.validate().is_err());

        config.test_repository = "testpypi".to_string();
        config.build.program = "".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("build program"));

        config.build.program = "python3".to_string();
        config.image.base_image = "".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_prefers_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "package = \"from-project\"\n").unwrap();
        let explicit = dir.path().join("explicit.toml");
        fs::write(&explicit, "package = \"from-flag\"\n").unwrap();

        std::env::remove_var(CONFIG_ENV_VAR);
        let config = PublishConfig::load(Some(&explicit), dir.path()).unwrap();
        assert_eq!(config.package, "from-flag");
    }

    #[test]
    #[serial]
    fn test_load_env_over_project_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "package = \"from-project\"\n").unwrap();
        let env_file = dir.path().join("env.toml");
        fs::write(&env_file, "package = \"from-env\"\n").unwrap();

        std::env::set_var(CONFIG_ENV_VAR, &env_file);
        let config = PublishConfig::load(None, dir.path());
        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(config.unwrap().package, "from-env");
    }

    #[test]
    #[serial]
    fn test_load_project_file_then_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::env::remove_var(CONFIG_ENV_VAR);

        let config = PublishConfig::load(None, dir.path()).unwrap();
        assert_eq!(config, PublishConfig::default());

        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "package = \"from-project\"\n").unwrap();
        let config = PublishConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.package, "from-project");
    }

    #[test]
    #[serial]
    fn test_load_missing_explicit_file_fails() {
        std::env::remove_var(CONFIG_ENV_VAR);
        let dir = tempfile::tempdir().unwrap();
        let err = PublishConfig::load(Some(&dir.path().join("nope.toml")), dir.path())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    #[serial]
    fn test_load_rejects_invalid_values() {
        std::env::remove_var(CONFIG_ENV_VAR);
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "package = \"\"\n").unwrap();
        let err = PublishConfig::load(None, dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
