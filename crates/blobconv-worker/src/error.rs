//! Errors scoped to a single object
//!
//! An [`ItemError`] never aborts a run. The converter turns it into a failed
//! [`ConversionResult`](blobconv_common::ConversionResult) and moves on.

use blobconv_common::FailureKind;
use thiserror::Error;

use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum ItemError {
    #[error("Failed to read input: {0}")]
    Read(#[source] StoreError),

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Failed to write output: {0}")]
    Write(#[source] StoreError),

    /// The blocking transcode task panicked or was cancelled
    #[error("Conversion task aborted: {0}")]
    Aborted(String),
}

impl ItemError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ItemError::Read(_) => FailureKind::Read,
            ItemError::Decode(_) => FailureKind::Decode,
            ItemError::Encode(_) => FailureKind::Encode,
            ItemError::Write(_) => FailureKind::Write,
            ItemError::Aborted(_) => FailureKind::Internal,
        }
    }
}
