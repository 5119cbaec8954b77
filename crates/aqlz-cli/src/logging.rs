//! Logging and tracing setup for the `aqlz` binary
//!
//! Console output goes to stderr so that results on stdout stay clean.
//! When a log directory is configured, a daily-rolling JSON file is written
//! as well. `RUST_LOG` overrides the default filter.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable that enables the JSON file log
pub const ENV_LOG_DIR: &str = "AQLZ_LOG_DIR";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for JSON log files; `None` disables file logging
    pub log_dir: Option<PathBuf>,

    /// Whether to log to stderr
    pub enable_console_logs: bool,

    /// Whether to include file/line information in console logs
    pub include_location: bool,

    /// Default log level filter
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            enable_console_logs: true,
            include_location: false,
            default_filter: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Quiet console output, optional file log from `AQLZ_LOG_DIR`
    pub fn from_env(verbose: bool) -> Self {
        let log_dir = std::env::var_os(ENV_LOG_DIR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let config = Self {
            log_dir,
            ..Self::default()
        };
        if verbose { config.verbose() } else { config }
    }

    /// Debug-level output for the AQLZ crates
    pub fn verbose(self) -> Self {
        Self {
            include_location: true,
            default_filter: "info,aqlz_cli=debug,aqlz_core=debug,aqlz_drivers=debug,aqlz_driver_arangodb=debug,aqlz_query=debug".to_string(),
            ..self
        }
    }
}

/// Install the global subscriber
///
/// The returned guard flushes the file log when dropped and must be kept
/// alive for the duration of the program.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let mut layers = Vec::new();
    let mut guard = None;

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(std::io::stderr)
            .compact()
            .with_filter(env_filter.clone())
            .boxed();

        layers.push(console_layer);
    }

    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;
        let file_appender = tracing_appender::rolling::daily(log_dir, "aqlz.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
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
        log_dir = ?config.log_dir,
        console_enabled = config.enable_console_logs,
        "Logging system initialized"
    );

    Ok(guard)
}
