//! Library-boundary error types
//!
//! Validation findings are never errors: they are [`Issue`](crate::Issue)
//! values in the report. These types cover the few operations that can fail
//! outright.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to configure or start a validation run
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Options document could not be parsed
    #[error("invalid validation options: {0}")]
    Config(#[from] toml::de::Error),

    /// Input file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of an external resource fetch
///
/// Reported as an `IO_ERROR` issue on the entity that needed the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("Resource not found ({0}).")]
    NotFound(String),

    #[error("Could not read resource ({0}): {1}")]
    Io(String, String),

    #[error("URI scheme is not supported by the resource loader ({0}).")]
    Unsupported(String),
}

impl ResourceError {
    pub(crate) fn from_io(uri: &str, err: &std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ResourceError::NotFound(uri.to_string())
        } else {
            ResourceError::Io(uri.to_string(), err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_from_io() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(
            ResourceError::from_io("a.bin", &missing),
            ResourceError::NotFound("a.bin".to_string())
        );

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ResourceError::from_io("b.bin", &denied);
        assert_eq!(err.to_string(), "Could not read resource (b.bin): denied");
    }
}
