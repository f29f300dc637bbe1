//! Cafe Sales - HOT/ICE drink sale logger
//!
//! Records one row per drink sold, summarizes a day by hour slot, menu and
//! category, and exports the day as CSV. Sales and the menu catalog live in
//! an embedded SQLite file or in hosted Supabase tables.

use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt, EnvFilter, Layer,
};

pub mod aggregate;
pub mod auth;
pub mod commands;
pub mod config;
pub mod controller;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod menu;
pub mod models;
pub mod report;
pub mod repository;
pub mod storage;
pub mod supabase;
pub mod time_slot;

const DEFAULT_LOG_FILTER: &str = "info,cafe_sales_lib=debug";

/// File output: plain text, or JSON lines when `json` is set.
fn file_layer<S>(writer: NonBlocking, json: bool) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let text = (!json).then(|| {
        fmt::layer()
            .with_writer(writer.clone())
            .with_ansi(false)
            .with_target(true)
    });
    let structured = json.then(|| fmt::layer().json().with_writer(writer).with_target(true));
    Layer::and_then(text, structured)
}

/// Structured logging: a daily rolling file under `log_dir` (JSON lines
/// when `json` is set) filtered by `RUST_LOG`, plus warnings on stderr.
///
/// Dropping the returned guard flushes the file writer.
pub fn init_logging(log_dir: &Path, json: bool) -> WorkerGuard {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("cannot create log directory {}: {e}", log_dir.display());
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, diagnostics::LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(file_layer(writer, json).with_filter(file_filter))
        .with(console_layer)
        .init();

    // After init so removal failures are logged.
    diagnostics::prune_old_logs(log_dir);

    guard
}
