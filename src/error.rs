//! Error type shared by every command.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::formats::ParseError;
use crate::stats::StatsError;

/// Errors that end a comparison run.
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Invalid alignment '{path}': {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Invalid range {start}..{end}: positions must satisfy 1 <= start <= end <= {width}")]
    Range { start: i64, end: i64, width: usize },

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Cannot write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("Credible interval failed: {0}")]
    Interval(#[from] StatsError),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

impl CompareError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompareError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn argument(message: impl Into<String>) -> Self {
        CompareError::Argument(message.into())
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompareError::Argument(_) | CompareError::Config { .. } => 2,
            CompareError::Io { .. } | CompareError::Image(_) => 3,
            CompareError::Format { .. } => 4,
            CompareError::Range { .. } => 5,
            CompareError::Interval(_) => 1,
        }
    }
}

/// Result type for comparison operations.
pub type CompareResult<T> = Result<T, CompareError>;
