//! Logging and tracing infrastructure.
//!
//! Two complementary outputs are set up here:
//!
//! - **Structured records** - the [`Logger`] renders one JSON line per [`LogRecord`], tagged
//!   with the service name and the correlation ids of the request being served. This is what
//!   handlers, use cases and the request lifecycle middleware write to.
//! - **Diagnostics** - [`setup_tracing`] installs a `tracing` subscriber writing plain text to
//!   stderr. The HTTP stack (warp, hyper) and the request spans report through it, and it can
//!   additionally export spans via OpenTelemetry.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `LOG_LEVEL` | Threshold for structured records (`debug`, `info`, `warn`, `error`) | `info` |
//! | `LOG_OUTPUT` | Record sink: `stdout`, `stderr` or a file path | `stdout` |
//! | `RUST_LOG` | Diagnostic filter (e.g. `info`, `warp=debug`) | value of `LOG_LEVEL` |
//! | `RUST_TRACE` | OpenTelemetry trace filter | `debug` |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP endpoint URL | (required for OTel) |

use crate::config::Config;
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

mod console;
mod field;
mod logger;
mod sink;

#[cfg(feature = "open_telemetry")]
mod otel;

pub use field::*;
pub use logger::{LogRecord, Logger};
pub use sink::{CaptureSink, LogSink, WriterSink, open_sink};

/// Severity of a structured log record.
///
/// Ordered from least to most severe, so a threshold check is a plain comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Maps a `LOG_LEVEL` setting to a threshold.
    ///
    /// Matching is case-insensitive. Absent or unrecognized values yield [`LogLevel::Info`].
    /// `fatal` is deliberately not selectable: fatal records are never filtered.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("debug") => LogLevel::Debug,
            Some("warn") => LogLevel::Warn,
            Some("error") => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        }
    }

    /// The matching `tracing` filter directive.
    fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::Fatal => "error",
            other => other.as_str(),
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Initializes the diagnostic `tracing` subscriber with console output and OpenTelemetry.
///
/// Call once at startup. If OpenTelemetry setup fails (e.g. missing endpoint), it falls back
/// to console-only output and says so.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
#[cfg(feature = "open_telemetry")]
pub fn setup_tracing(config: &Config) {
    let console_layer = setup_console_layer(config);

    match otel::setup_open_telemetry_layer(&config.app_name, &config.app_version) {
        Ok(otlp_layer) => {
            Registry::default()
                .with(console_layer)
                .with(otlp_layer)
                .init();

            tracing::info!(
                "Tracing initialized successfully [reporting to console as well as OpenTelemetry]"
            );
        }
        Err(err) => {
            Registry::default().with(console_layer).init();
            tracing::info!("Tracing initialized successfully [reporting to console only]");
            tracing::info!("Skipping OpenTelemetry setup: {:#}", err);
        }
    }
}

/// Initializes the diagnostic `tracing` subscriber with console output only.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
#[cfg(not(feature = "open_telemetry"))]
pub fn setup_tracing(config: &Config) {
    let console_layer = setup_console_layer(config);
    Registry::default().with(console_layer).init();
    tracing::info!("Tracing initialized successfully [reporting to console only]");
}

fn setup_console_layer(config: &Config) -> Box<dyn Layer<Registry> + Send + Sync + 'static> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.filter_directive()));

    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .event_format(console::ConsoleLogFormat::new(&config.app_name))
        .with_filter(filter)
        .boxed()
}
