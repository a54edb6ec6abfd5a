//! blobconv worker library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Converts a shared batch of JPEG objects to PNG across any number of
//! independently launched workers, without a scheduler or lock.
//!
//! # Overview
//!
//! - **Storage**: the [`ObjectStore`](storage::ObjectStore) trait with S3,
//!   and local-directory backends, plus an in-memory one under `test-util`
//! - **Enumeration**: byte-ordered snapshot of the input container
//! - **Partitioning**: stride selection over the eligible names, so worker
//!   `k` of `T` takes eligible indices `k, k + T, k + 2T, …`
//! - **Conversion**: read, decode, encode PNG, write; failures stay per item
//! - **Worker**: ties the above together and produces a
//!   [`RunSummary`](blobconv_common::RunSummary)
//!
//! # Example
//!
//! ```no_run
//! use blobconv_worker::{config::WorkerConfig, storage::config::StoreConfig, worker};
//!
//! # async fn example() -> blobconv_common::Result<()> {
//! let config = WorkerConfig::new(StoreConfig::for_local("/srv/blobs"));
//! let summary = worker::run(&config).await?;
//! println!("{} converted, {} failed", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod convert;
pub mod enumerate;
pub mod error;
pub mod partition;
pub mod storage;
pub mod worker;

// Re-export commonly used types
pub use config::WorkerConfig;
pub use error::ItemError;
pub use worker::{run, run_with_stores};

use blobconv_common::error::{EXIT_ITEM_FAILURES, EXIT_OK};
use blobconv_common::RunSummary;
use clap::Parser;

use config::{
    DEFAULT_CONCURRENCY, DEFAULT_EXTENSIONS, DEFAULT_INPUT_CONTAINER, DEFAULT_OUTPUT_CONTAINER,
};

/// Convert this worker's share of a JPEG batch to PNG
///
/// Store settings come from the environment (`BLOBCONV_STORE_BACKEND`,
/// `S3_*`, `BLOBCONV_LOCAL_ROOT`); a `.env` file in the working directory is
/// loaded first.
#[derive(Parser, Debug)]
#[command(name = "blobconv-worker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Zero-based position of this worker
    #[arg(long, env = "BLOBCONV_TASK_ID", default_value_t = 0)]
    pub task_id: usize,

    /// Number of workers sharing the batch
    #[arg(long, env = "BLOBCONV_TOTAL_TASKS", default_value_t = 1)]
    pub total_tasks: usize,

    /// Container to read source images from
    #[arg(long, env = "BLOBCONV_INPUT_CONTAINER", default_value = DEFAULT_INPUT_CONTAINER)]
    pub input_container: String,

    /// Container to write PNGs to (created if missing)
    #[arg(long, env = "BLOBCONV_OUTPUT_CONTAINER", default_value = DEFAULT_OUTPUT_CONTAINER)]
    pub output_container: String,

    /// Eligible extensions, case-insensitive
    #[arg(
        long,
        env = "BLOBCONV_EXTENSIONS",
        value_delimiter = ',',
        default_value = DEFAULT_EXTENSIONS
    )]
    pub extensions: Vec<String>,

    /// Conversions in flight at once
    #[arg(long, env = "BLOBCONV_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Enumerate and partition only; convert nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Leave items whose output already exists
    #[arg(long, env = "BLOBCONV_SKIP_EXISTING")]
    pub skip_existing: bool,

    /// Exit with status 4 when any item failed
    #[arg(long, env = "BLOBCONV_FAIL_ON_ITEM_ERRORS")]
    pub fail_on_item_errors: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub report_json: bool,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Process exit status for a run that finished
pub fn summary_exit_code(summary: &RunSummary, fail_on_item_errors: bool) -> i32 {
    if fail_on_item_errors && summary.has_failures() {
        EXIT_ITEM_FAILURES
    } else {
        EXIT_OK
    }
}
