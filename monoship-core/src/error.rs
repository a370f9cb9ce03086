//! Error types and result aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot read packages directory {path}: {message}")]
    Scan { path: PathBuf, message: String },

    #[error("Invalid manifest {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    #[error("TOML parse error in {context}: {error}")]
    Toml {
        error: toml::de::Error,
        context: String,
    },

    #[error("Invalid exclusion pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Package not found: {name}. Available packages: {available}")]
    PackageNotFound { name: String, available: String },

    #[error("Circular dependency detected involving: {package}. Use 'monoship order' to inspect dependencies.")]
    CircularDependency { package: String },

    #[error("No package matches --start-from '{start_from}'. Available packages: {}", candidates.join(", "))]
    StartFromNotFound {
        start_from: String,
        candidates: Vec<String>,
    },

    #[error("Operation failed for {package} ({dir_name}): {message}")]
    PackageOperation {
        package: String,
        dir_name: String,
        message: String,
        output: Option<String>,
    },

    #[error("Operation for {package} ({dir_name}) aborted unexpectedly: {message}")]
    UnexpectedRejection {
        package: String,
        dir_name: String,
        message: String,
    },

    #[error("Repository lock for {root} was released while waiting")]
    LockReleased { root: PathBuf },
}

impl Error {
    /// Name of the package an execution-phase error belongs to.
    pub fn package(&self) -> Option<&str> {
        match self {
            Error::PackageOperation { package, .. } | Error::UnexpectedRejection { package, .. } => {
                Some(package)
            }
            Error::CircularDependency { package } => Some(package),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Toml {
            error,
            context: "monoship.toml".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
