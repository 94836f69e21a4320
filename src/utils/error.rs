//! Error Handling Module
//!
//! Defines the error type shared by the library. Every failure is fatal for
//! the run; the variants only exist so the message tells the user where the
//! pipeline stopped.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for classifier operations
#[derive(Error, Debug)]
pub enum CifarError {
    /// Fetching or unpacking the dataset archive failed
    #[error("Download error: {0}")]
    Download(String),

    /// A dataset file is missing or malformed
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// The checkpoint could not be written or decoded
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// A parameter in the checkpoint does not have the shape the model expects
    #[error("Shape mismatch for '{name}': expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// The experiment tracking sink rejected a write
    #[error("Tracking error: {0}")]
    Tracking(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for classifier operations
pub type Result<T> = std::result::Result<T, CifarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CifarError::Dataset("truncated record".to_string());
        assert_eq!(format!("{}", err), "Dataset error: truncated record");
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = CifarError::ShapeMismatch {
            name: "fc3.weight".to_string(),
            expected: vec![10, 84],
            found: vec![5, 84],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("fc3.weight"));
        assert!(msg.contains("[10, 84]"));
        assert!(msg.contains("[5, 84]"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CifarError = io.into();
        assert!(matches!(err, CifarError::Io(_)));
    }
}
