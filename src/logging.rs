//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to both console and files
//! for debugging batch generation and worker pool behavior.

use chrono::Utc;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::detect_environment;
use crate::constants::{env as env_names, layout};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// JSON log files go to `IMDB_LOG_DIR`, or `log/` under the working directory.
/// `RUST_LOG` takes precedence over the environment's default level. Safe to call
/// more than once; only the first call installs a subscriber.
pub fn init_structured_logging() {
    let log_dir = env::var(env_names::LOG_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(layout::LOG_DIR_NAME));
    init_structured_logging_in(Some(&log_dir));
}

/// Like [`init_structured_logging`], with an explicit log file directory
///
/// `None` logs to the console only.
pub fn init_structured_logging_in(log_dir: Option<&Path>) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = detect_environment();
        let log_level = get_log_level(&environment);

        let file_layer = match log_dir.map(|dir| (dir, fs::create_dir_all(dir))) {
            Some((log_dir, Ok(()))) => {
                let pid = process::id();
                let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
                let file_appender = tracing_appender::rolling::never(
                    log_dir,
                    format!("{environment}.{pid}.{timestamp}.log"),
                );
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                // Keep the writer alive for the rest of the process
                std::mem::forget(guard);
                Some(
                    fmt::layer()
                        .with_writer(file_writer)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(build_filter(&log_level)),
                )
            }
            Some((_, Err(_))) | None => None,
        };

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_filter(build_filter(&log_level)),
            )
            .with(file_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            log_dir = ?log_dir,
            "🔧 LOGGING: Structured logging initialized"
        );
    });
}

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        "benchmark" => "warn".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log an epoch boundary of the batch cycler
pub fn log_epoch_rollover(dataset: &str, epoch: u64, num_images: usize, shuffled: bool) {
    tracing::info!(
        dataset = %dataset,
        epoch = epoch,
        num_images = num_images,
        shuffled = shuffled,
        timestamp = %Utc::now().to_rfc3339(),
        "🔄 EPOCH_ROLLOVER"
    );
}

/// Log structured data for batch operations
pub fn log_batch_operation(
    operation: &str,
    dataset: &str,
    epoch: u64,
    batch_size: usize,
    details: Option<&str>,
) {
    tracing::debug!(
        operation = %operation,
        dataset = %dataset,
        epoch = epoch,
        batch_size = batch_size,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📦 BATCH_OPERATION"
    );
}

/// Log structured data for worker pool operations
pub fn log_pool_operation(operation: &str, workers: usize, status: &str, details: Option<&str>) {
    tracing::info!(
        operation = %operation,
        workers = workers,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🏊 POOL_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
