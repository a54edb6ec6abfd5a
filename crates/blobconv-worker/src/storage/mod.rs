//! Object storage backends
//!
//! Workers only ever talk to an [`ObjectStore`], one instance per container.
//! Three backends implement it:
//!
//! - [`s3::S3Store`]: S3 or any S3-compatible service (MinIO)
//! - [`local::LocalStore`]: a directory per container on the local filesystem
//! - `memory::MemoryStore`: in-process map for tests, behind the `test-util`
//!   feature

use async_trait::async_trait;
use blobconv_common::{BlobconvError, ObjectName};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub mod config;
pub mod local;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod s3;

use config::StoreConfig;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by a store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Container '{0}' does not exist")]
    ContainerNotFound(String),

    #[error("Object '{0}' not found")]
    ObjectNotFound(String),

    #[error("Invalid object name '{0}'")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// A single container of named objects
///
/// Implementations must be safe to share between concurrent conversions.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Container this store is bound to
    fn container(&self) -> &str;

    /// Whether the container itself exists
    async fn container_exists(&self) -> StoreResult<bool>;

    /// Create the container unless it is already there
    ///
    /// Several workers may race to create the same container; losing the race
    /// is not an error.
    async fn create_if_missing(&self) -> StoreResult<()>;

    /// Whether an object with this name exists
    async fn exists(&self, name: &str) -> StoreResult<bool>;

    /// Every object name in the container, in no particular order
    async fn list(&self) -> StoreResult<Vec<ObjectName>>;

    async fn read(&self, name: &str) -> StoreResult<Vec<u8>>;

    /// Write `data` under `name`, replacing any existing object
    async fn write(&self, name: &str, data: Vec<u8>) -> StoreResult<()>;
}

/// Input and output stores for one worker run
#[derive(Clone)]
pub struct StorePair {
    pub input: Arc<dyn ObjectStore>,
    pub output: Arc<dyn ObjectStore>,
}

/// Open the input and output containers described by `config`
pub async fn open_stores(
    config: &StoreConfig,
    input_container: &str,
    output_container: &str,
) -> blobconv_common::Result<StorePair> {
    let pair = match config {
        StoreConfig::S3(s3_config) => {
            let client = s3::connect(s3_config).await;
            StorePair {
                input: Arc::new(s3::S3Store::new(
                    client.clone(),
                    input_container,
                    &s3_config.region,
                )),
                output: Arc::new(s3::S3Store::new(
                    client,
                    output_container,
                    &s3_config.region,
                )),
            }
        }
        StoreConfig::Local(local_config) => {
            if !local_config.root.is_dir() {
                return Err(BlobconvError::config(format!(
                    "local store root '{}' is not a directory",
                    local_config.root.display()
                )));
            }
            StorePair {
                input: Arc::new(local::LocalStore::new(&local_config.root, input_container)),
                output: Arc::new(local::LocalStore::new(&local_config.root, output_container)),
            }
        }
    };

    info!(
        backend = config.backend_name(),
        input = %pair.input.container(),
        output = %pair.output.container(),
        "Storage opened"
    );

    Ok(pair)
}

/// Content type to attach when writing an object, by extension
pub(crate) fn content_type_for(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    if lower.ends_with(".png") {
        Some("image/png")
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        Some("image/jpeg")
    } else {
        None
    }
}
