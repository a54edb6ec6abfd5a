//! blobconv worker - main entry point

use anyhow::Context;
use blobconv_common::error::{EXIT_CONFIGURATION, EXIT_UNEXPECTED};
use blobconv_common::logging::{init_logging, LogConfig, LogLevel, LoggingGuard};
use blobconv_worker::{summary_exit_code, Cli, WorkerConfig};
use clap::Parser;
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load .env before clap reads env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .log_file_prefix("blobconv-worker")
        .build();

    // Environment variables take precedence over flags
    let log_config = match log_config.with_env_overrides() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid logging configuration: {:#}", e);
            process::exit(EXIT_CONFIGURATION);
        }
    };

    let guard = match setup_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(EXIT_UNEXPECTED);
        }
    };

    let code = match execute(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Worker failed");
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };

    // Flush file logs before exiting
    drop(guard);
    process::exit(code);
}

fn setup_logging(config: &LogConfig) -> anyhow::Result<LoggingGuard> {
    init_logging(config).context("Failed to initialize logging")
}

async fn execute(cli: &Cli) -> blobconv_common::Result<i32> {
    let config = WorkerConfig::load(cli)?;
    info!(
        worker = %config.identity,
        backend = config.store.backend_name(),
        concurrency = config.concurrency,
        "Configuration loaded"
    );

    let summary = blobconv_worker::run(&config).await?;

    if config.report_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(summary_exit_code(&summary, config.fail_on_item_errors))
}
