//! Destinations for structured log records.

use crate::logging::logger::LogRecord;
use anyhow::Context;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

/// Receives every record which passed the logger's threshold.
pub trait LogSink: Send + Sync {
    fn write(&self, record: &LogRecord);
}

/// Writes records as JSON lines into any [`Write`] implementation.
///
/// Write failures are reported through `tracing` and otherwise dropped, so that logging
/// never fails a request.
pub struct WriterSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl WriterSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        WriterSink {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }

    /// Appends to the given file, creating it if needed.
    pub fn file(path: &str) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file '{}'", path))?;

        Ok(Self::new(file))
    }
}

impl LogSink for WriterSink {
    fn write(&self, record: &LogRecord) {
        let mut line = match serde_json::to_vec(record) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!("Failed to serialize log record '{}': {}", record.message, err);
                return;
            }
        };
        line.push(b'\n');

        let mut writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = writer.write_all(&line).and_then(|_| writer.flush()) {
            tracing::warn!("Failed to write log record: {}", err);
        }
    }
}

/// Opens the sink named by a `LOG_OUTPUT` setting: `stdout`, `stderr` or a file path.
pub fn open_sink(output: &str) -> anyhow::Result<Arc<dyn LogSink>> {
    let sink = match output {
        "stdout" => WriterSink::stdout(),
        "stderr" => WriterSink::stderr(),
        path => WriterSink::file(path)?,
    };

    Ok(Arc::new(sink))
}

/// Keeps records in memory so tests can inspect what was logged.
#[derive(Clone, Default)]
pub struct CaptureSink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|record| record.message.clone()).collect()
    }

    /// All records with the given message, in emission order.
    pub fn find(&self, message: &str) -> Vec<LogRecord> {
        self.lock()
            .iter()
            .filter(|record| record.message == message)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogSink for CaptureSink {
    fn write(&self, record: &LogRecord) {
        self.lock().push(record.clone());
    }
}
