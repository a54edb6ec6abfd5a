//! Worker configuration
//!
//! Built once at startup from CLI flags (which fall back to environment
//! variables and `.env`) and passed down explicitly. Nothing reads the
//! environment after this point.

use blobconv_common::{BlobconvError, Result, WorkerIdentity};

use crate::partition::ExtensionFilter;
use crate::storage::config::StoreConfig;
use crate::Cli;

// ============================================================================
// Defaults
// ============================================================================

/// Container holding the source images.
pub const DEFAULT_INPUT_CONTAINER: &str = "images";

/// Container receiving converted images.
pub const DEFAULT_OUTPUT_CONTAINER: &str = "converted";

/// Extensions eligible for conversion, comma separated.
pub const DEFAULT_EXTENSIONS: &str = "jpg,jpeg";

/// Conversions in flight at once within a worker.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Everything a worker run needs
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub identity: WorkerIdentity,
    pub input_container: String,
    pub output_container: String,
    pub filter: ExtensionFilter,
    pub concurrency: usize,
    pub dry_run: bool,
    pub skip_existing: bool,
    pub fail_on_item_errors: bool,
    pub report_json: bool,
    pub store: StoreConfig,
}

impl WorkerConfig {
    /// Build from parsed flags and the store settings in the environment
    pub fn load(cli: &Cli) -> Result<Self> {
        Self::from_cli(cli, StoreConfig::from_env()?)
    }

    pub fn from_cli(cli: &Cli, store: StoreConfig) -> Result<Self> {
        let config = Self {
            identity: WorkerIdentity::new(cli.task_id, cli.total_tasks)?,
            input_container: cli.input_container.trim().to_string(),
            output_container: cli.output_container.trim().to_string(),
            filter: ExtensionFilter::new(&cli.extensions)?,
            concurrency: cli.concurrency,
            dry_run: cli.dry_run,
            skip_existing: cli.skip_existing,
            fail_on_item_errors: cli.fail_on_item_errors,
            report_json: cli.report_json,
            store,
        };
        config.validate()?;
        Ok(config)
    }

    /// Single-worker defaults against `store`
    pub fn new(store: StoreConfig) -> Self {
        Self {
            identity: WorkerIdentity::single(),
            input_container: DEFAULT_INPUT_CONTAINER.to_string(),
            output_container: DEFAULT_OUTPUT_CONTAINER.to_string(),
            filter: ExtensionFilter::default(),
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
            skip_existing: false,
            fail_on_item_errors: false,
            report_json: false,
            store,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(BlobconvError::config("concurrency must be at least 1"));
        }
        if self.input_container.is_empty() {
            return Err(BlobconvError::config("input container name is empty"));
        }
        if self.output_container.is_empty() {
            return Err(BlobconvError::config("output container name is empty"));
        }
        if self.input_container == self.output_container {
            return Err(BlobconvError::config(format!(
                "input and output containers must differ (both '{}')",
                self.input_container
            )));
        }
        Ok(())
    }
}
