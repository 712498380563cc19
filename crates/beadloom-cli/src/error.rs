use std::path::PathBuf;

use beadloom_core::PayloadError;
use beadloom_runtime::{ConfigError, StoreError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Payload(#[from] PayloadError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl CliError {
    /// Process exit status: 2 for bad input, 1 for everything else.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } | Self::Payload(_) | Self::Config(_) => 2,
            Self::Store(StoreError::Payload(_) | StoreError::Model(_)) => 2,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CliError;
    use beadloom_core::ModelError;
    use beadloom_runtime::StoreError;

    #[test]
    fn invalid_input_exits_with_usage_code() {
        assert_eq!(CliError::invalid("nope").exit_code(), 2);
        let rejected = CliError::Store(StoreError::Model(ModelError::EmptyBeadId));
        assert_eq!(rejected.exit_code(), 2);
    }

    #[test]
    fn io_errors_exit_with_failure_code() {
        let error = CliError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(error.exit_code(), 1);
        assert!(error.to_string().contains("/tmp/x"));
    }
}
