//! One worker's run over its share of the batch
//!
//! Enumerate once, partition once, then convert each assigned item. Only
//! store-level problems abort the run; item failures end up in the summary.

use blobconv_common::{BlobconvError, ConversionResult, Result, RunSummary};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::config::WorkerConfig;
use crate::convert::Converter;
use crate::enumerate::list_sorted;
use crate::partition;
use crate::storage::{open_stores, ObjectStore, StorePair};

/// Open the configured stores and run
pub async fn run(config: &WorkerConfig) -> Result<RunSummary> {
    let stores = open_stores(
        &config.store,
        &config.input_container,
        &config.output_container,
    )
    .await?;
    run_with_stores(config, stores).await
}

/// Run against already-open stores
#[instrument(skip_all, fields(worker = %config.identity))]
pub async fn run_with_stores(config: &WorkerConfig, stores: StorePair) -> Result<RunSummary> {
    let started_at = Utc::now();
    let identity = config.identity;
    let StorePair { input, output } = stores;

    info!(
        input = %input.container(),
        output = %output.container(),
        dry_run = config.dry_run,
        "Worker starting"
    );

    ensure_input_exists(input.as_ref()).await?;

    if !config.dry_run {
        output.create_if_missing().await.map_err(|err| {
            BlobconvError::store_unavailable(output.container(), err.to_string())
        })?;
    }

    let files = list_sorted(input.as_ref()).await?;
    let summary = |eligible: usize, assigned: usize, results: Vec<ConversionResult>| {
        RunSummary::from_results(
            identity,
            input.container(),
            output.container(),
            files.len(),
            eligible,
            assigned,
            config.dry_run,
            started_at,
            results,
        )
    };

    if files.is_empty() {
        info!("Input container is empty, nothing to do");
        return Ok(summary(0, 0, Vec::new()));
    }

    let plan = partition::plan(&files, |name| config.filter.matches(name), identity);
    info!(
        enumerated = files.len(),
        eligible = plan.eligible,
        assigned = plan.assignment.len(),
        extensions = ?config.filter.extensions(),
        "Assignment computed"
    );

    let eligible = partition::eligible(&files, |name| config.filter.matches(name));
    for (output_name, inputs) in partition::find_output_collisions(eligible) {
        warn!(
            output = %output_name,
            inputs = ?inputs,
            "Several inputs map to the same output; the last write wins"
        );
    }

    if plan.assignment.is_empty() {
        info!("No items assigned to this worker");
        return Ok(summary(plan.eligible, 0, Vec::new()));
    }

    for name in &plan.assignment {
        debug!(object = %name, "Assigned");
    }

    if config.dry_run {
        info!(
            assigned = plan.assignment.len(),
            "Dry run, skipping conversion"
        );
        return Ok(summary(plan.eligible, plan.assignment.len(), Vec::new()));
    }

    let converter =
        Converter::new(input.clone(), output.clone()).skip_existing(config.skip_existing);
    let count = plan.assignment.len();

    // `buffered` keeps results in assignment order
    let results: Vec<ConversionResult> = stream::iter(plan.assignment.iter().enumerate())
        .map(|(index, name)| {
            let converter = &converter;
            async move {
                info!("[{}/{}] {}", index + 1, count, name);
                converter.convert(name).await
            }
        })
        .buffered(config.concurrency)
        .collect()
        .await;

    let summary = summary(plan.eligible, count, results);
    for failure in summary.failures() {
        warn!(object = %failure.input, "Not converted");
    }
    info!(
        processed = summary.processed(),
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        elapsed_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
        "Run complete"
    );

    Ok(summary)
}

async fn ensure_input_exists(input: &dyn ObjectStore) -> Result<()> {
    match input.container_exists().await {
        Ok(true) => Ok(()),
        Ok(false) => Err(BlobconvError::store_unavailable(
            input.container(),
            "container does not exist",
        )),
        Err(err) => Err(BlobconvError::store_unavailable(
            input.container(),
            err.to_string(),
        )),
    }
}
