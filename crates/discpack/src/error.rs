//! Error types for everything around the build engine: spec files, tool
//! configuration, discovery and registry output.

use crate::builder::BuildError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscpackError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Could not parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Could not parse entry {index} from '{}': {message}", path.display())]
    Entry {
        /// 1-based position of the entry in the file
        index: usize,
        path: PathBuf,
        message: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Permission error: {0}")]
    Permission(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl DiscpackError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        DiscpackError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DiscpackError>;
