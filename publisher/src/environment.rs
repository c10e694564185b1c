use image_builder::PackageIndex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("Missing environment: expected 'test' or 'live'")]
    Missing,

    #[error("Invalid environment '{value}': expected 'test' or 'live'")]
    Invalid { value: String },
}

/// Where a release is built for and uploaded to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test index, output in `dist-test`
    Test,
    /// Production index, output in `dist`
    Live,
}

impl Environment {
    /// Directory the build tool writes distributions into
    pub fn dist_dir(&self) -> &'static str {
        match self {
            Environment::Test => "dist-test",
            Environment::Live => "dist",
        }
    }

    /// Upload tool arguments selecting the destination index.
    ///
    /// Live uploads go to the upload tool's default index, so they carry none.
    pub fn repository_args(&self, test_repository: &str) -> Vec<String> {
        match self {
            Environment::Test => vec!["--repository".to_string(), test_repository.to_string()],
            Environment::Live => Vec::new(),
        }
    }

    pub fn package_index(&self) -> PackageIndex {
        match self {
            Environment::Test => PackageIndex::Test,
            Environment::Live => PackageIndex::Production,
        }
    }

    /// Parse an optional positional argument
    pub fn from_arg(value: Option<&str>) -> Result<Self, EnvironmentError> {
        value.ok_or(EnvironmentError::Missing)?.parse()
    }
}

impl FromStr for Environment {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(Environment::Test),
            "live" => Ok(Environment::Live),
            other => Err(EnvironmentError::Invalid {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Live => write!(f, "live"),
        }
    }
}
