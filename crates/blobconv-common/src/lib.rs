//! blobconv common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup, and error handling for the blobconv workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the run-fatal error taxonomy and its process exit codes
//! - **Logging**: `tracing` subscriber setup shared by every binary
//! - **Types**: worker identity, per-item conversion results, run summaries
//!
//! # Example
//!
//! ```no_run
//! use blobconv_common::{Result, WorkerIdentity};
//!
//! fn identity_from_flags(task_id: usize, total_tasks: usize) -> Result<WorkerIdentity> {
//!     let identity = WorkerIdentity::new(task_id, total_tasks)?;
//!     println!("Running as worker {}", identity);
//!     Ok(identity)
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{BlobconvError, Result};
pub use types::{
    ConversionResult, ConversionStatus, FailureKind, ObjectName, RunSummary, WorkerIdentity,
};
