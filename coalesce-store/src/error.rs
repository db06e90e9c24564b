//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by store backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store name cannot be used as a file name
    #[error("invalid store name: {name:?}")]
    InvalidName { name: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = StoreError::io(
            "/tmp/data.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "I/O error on /tmp/data.json: denied");
    }

    #[test]
    fn test_invalid_name_display() {
        let err = StoreError::InvalidName { name: "../x".to_string() };
        assert_eq!(err.to_string(), "invalid store name: \"../x\"");
    }
}
