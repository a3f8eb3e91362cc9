//! Logging setup for the `pgdev` binary
//!
//! Console output goes to stderr so command output on stdout stays clean.
//! `RUST_LOG` overrides the default filter. With `log_json` enabled a daily
//! rolling JSON file is written to the log directory as well.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_FILTER: &str = "warn,pgdev_cli=info,pgdev_services=info,pgdev_connection=info,pgdev_schema=info";
const VERBOSE_FILTER: &str = "info,pgdev_cli=debug,pgdev_services=debug,pgdev_connection=debug,pgdev_schema=debug,pgdev_index=debug,pgdev_driver_postgres=debug";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub enable_json_logs: bool,
    pub verbose: bool,
}

impl LoggingConfig {
    fn default_filter(&self) -> &'static str {
        if self.verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        }
    }
}

/// Install the global subscriber
///
/// The returned guard flushes the JSON file writer on drop and must be kept
/// alive until the program exits.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter()));

    let mut layers = Vec::new();

    let console_layer = fmt::layer()
        .with_target(config.verbose)
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone())
        .boxed();
    layers.push(console_layer);

    let mut guard = None;
    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "pgdev.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        "logging initialized"
    );
    Ok(guard)
}
