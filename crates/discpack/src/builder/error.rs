//! Error types for track building

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while registering specs or running a build session.
///
/// Variants map onto the categories callers care about: configuration problems
/// (`InvalidValue`, `Conflict`, `Contiguity`, `RequiredUnused`, `NotFound`,
/// `AlreadyUsed`) versus API misuse (`Usage`, `Unsupported`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Contiguity(String),

    #[error("{0}")]
    RequiredUnused(String),

    #[error("Improper use of a build session: {0}")]
    Usage(String),

    #[error("Not implemented: {0}")]
    Unsupported(String),

    #[error("Could not find matching spec for '{}'", .0.display())]
    NotFound(PathBuf),

    #[error(
        "The spec '{}' matching the track '{}' was already used",
        spec.display(),
        candidate.display()
    )]
    AlreadyUsed { spec: PathBuf, candidate: PathBuf },

    #[error("{}", join_failures(.0))]
    SessionChecks(Vec<BuildError>),
}

impl BuildError {
    /// True when the caller drove the API incorrectly rather than supplying bad configuration.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, BuildError::Usage(_) | BuildError::Unsupported(_))
    }

    /// True for errors that only surface when a session closes.
    pub fn is_close_failure(&self) -> bool {
        match self {
            BuildError::Contiguity(_) | BuildError::RequiredUnused(_) => true,
            BuildError::SessionChecks(failures) => failures.iter().all(|f| f.is_close_failure()),
            _ => false,
        }
    }
}

fn join_failures(failures: &[BuildError]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BuildError>;
