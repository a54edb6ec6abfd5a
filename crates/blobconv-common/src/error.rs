//! Error types for blobconv
//!
//! Only errors that abort a whole worker live here. Failures scoped to a
//! single object are recorded in a [`ConversionResult`](crate::ConversionResult)
//! instead of being propagated.

use thiserror::Error;

/// Result type alias for blobconv operations
pub type Result<T> = std::result::Result<T, BlobconvError>;

/// Exit status for a completed run
pub const EXIT_OK: i32 = 0;

/// Exit status for failures outside the documented taxonomy
pub const EXIT_UNEXPECTED: i32 = 1;

/// Exit status for missing or invalid configuration
pub const EXIT_CONFIGURATION: i32 = 2;

/// Exit status when the input store is missing or unreachable
pub const EXIT_STORE_UNAVAILABLE: i32 = 3;

/// Exit status for a finished run with item failures, when requested
pub const EXIT_ITEM_FAILURES: i32 = 4;

/// Main error type for blobconv
#[derive(Error, Debug)]
pub enum BlobconvError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store '{container}' unavailable: {reason}")]
    StoreUnavailable { container: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BlobconvError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a store-unavailable error
    pub fn store_unavailable(container: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            container: container.into(),
            reason: reason.into(),
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BlobconvError::Config(_) => EXIT_CONFIGURATION,
            BlobconvError::StoreUnavailable { .. } => EXIT_STORE_UNAVAILABLE,
            BlobconvError::Io(_) | BlobconvError::Serialization(_) => EXIT_UNEXPECTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let config = BlobconvError::config("missing S3_REGION");
        let store = BlobconvError::store_unavailable("images", "NoSuchBucket");
        let io = BlobconvError::Io(std::io::Error::other("disk on fire"));

        assert_eq!(config.exit_code(), EXIT_CONFIGURATION);
        assert_eq!(store.exit_code(), EXIT_STORE_UNAVAILABLE);
        assert_eq!(io.exit_code(), EXIT_UNEXPECTED);
        assert_ne!(EXIT_CONFIGURATION, EXIT_STORE_UNAVAILABLE);
        assert_ne!(EXIT_ITEM_FAILURES, EXIT_OK);
    }

    #[test]
    fn test_store_unavailable_message() {
        let err = BlobconvError::store_unavailable("images", "container does not exist");
        assert_eq!(
            err.to_string(),
            "Store 'images' unavailable: container does not exist"
        );
    }
}
