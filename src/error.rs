use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy shared by every pipeline stage.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("{what} not found: {}", .path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to deserialize model artifact {}: {reason}", .path.display())]
    Deserialization { path: PathBuf, reason: String },

    #[error("no data rows in {}", .path.display())]
    EmptyData { path: PathBuf },

    #[error("incompatible model: {0}")]
    IncompatibleModel(String),

    #[error("metric computation failed: {0}")]
    MetricComputation(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize metrics: {0}")]
    Serialization(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;

impl EvalError {
    pub fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn metric(reason: impl Into<String>) -> Self {
        Self::MetricComputation(reason.into())
    }

    pub fn incompatible(reason: impl Into<String>) -> Self {
        Self::IncompatibleModel(reason.into())
    }

    /// Map an I/O error from reading `path`: a missing file becomes
    /// `NotFound`, everything else is unexpected.
    pub fn from_read(what: &'static str, path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { what, path }
        } else {
            Self::Unexpected(format!("reading {} {}: {}", what, path.display(), err))
        }
    }
}
