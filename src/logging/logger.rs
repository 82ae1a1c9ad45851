//! The structured log emitter.

use crate::config::Config;
use crate::context::RequestContext;
use crate::logging::field::{FIELD_REQUEST_ID, FIELD_TRACE_ID, FieldValue, LogField};
use crate::logging::sink::{LogSink, open_sink};
use crate::logging::{FIELD_CALLER, FIELD_MESSAGE, FIELD_SERVICE, FIELD_SEVERITY};
use crate::logging::{FIELD_STACKTRACE, FIELD_TIMESTAMP, LogLevel};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::backtrace::Backtrace;
use std::fmt::{Arguments, Debug, Formatter};
use std::panic::Location;
use std::sync::Arc;

/// One emitted log entry.
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: LogLevel,
    pub message: String,
    pub service: Arc<str>,
    /// Pre-registered fields, then correlation fields, then call-site fields.
    pub fields: Vec<LogField>,
    pub caller: Option<String>,
    pub stacktrace: Option<String>,
}

impl LogRecord {
    /// The first field with the given key.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.key() == key)
            .map(LogField::value)
    }

    pub fn field_keys(&self) -> Vec<&str> {
        self.fields.iter().map(LogField::key).collect()
    }
}

impl Serialize for LogRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(
            FIELD_TIMESTAMP,
            &self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        )?;
        map.serialize_entry(FIELD_SEVERITY, &self.severity)?;
        map.serialize_entry(FIELD_SERVICE, &*self.service)?;
        map.serialize_entry(FIELD_MESSAGE, &self.message)?;
        if let Some(caller) = &self.caller {
            map.serialize_entry(FIELD_CALLER, caller)?;
        }
        for field in &self.fields {
            map.serialize_entry(field.key(), field.value())?;
        }
        if let Some(stacktrace) = &self.stacktrace {
            map.serialize_entry(FIELD_STACKTRACE, stacktrace)?;
        }
        map.end()
    }
}

/// Leveled, field-tagged logger.
///
/// Constructed once at startup and handed to every component that logs. Cloning is cheap and
/// clones share the sink. Every emission takes the [`RequestContext`] of the caller; records
/// made within a request carry its `request-id` and `trace-id`, records made with
/// [`RequestContext::background`] carry neither.
///
/// ```rust,ignore
/// logger.info(&ctx, "User created successfully", [
///     LogField::int(FIELD_USER_ID, user.id),
///     LogField::int(FIELD_STATUS_CODE, 201),
/// ]);
/// logger.warnf(&ctx, format_args!("Retrying in {}s", delay));
/// ```
#[derive(Clone)]
pub struct Logger {
    service: Arc<str>,
    threshold: LogLevel,
    fields: Arc<[LogField]>,
    sink: Arc<dyn LogSink>,
}

impl Debug for Logger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("service", &self.service)
            .field("threshold", &self.threshold)
            .field("fields", &self.fields)
            .finish()
    }
}

impl Logger {
    pub fn new(service: impl Into<Arc<str>>, threshold: LogLevel, sink: Arc<dyn LogSink>) -> Self {
        Logger {
            service: service.into(),
            threshold,
            fields: Arc::from(Vec::new()),
            sink,
        }
    }

    /// Creates the logger described by the configuration.
    ///
    /// Fails if the configured output cannot be opened. There is no fallback: callers are
    /// expected to abort startup.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let sink = open_sink(&config.logging.output).with_context(|| {
            format!(
                "Failed to initialize logger for output '{}'",
                config.logging.output
            )
        })?;

        Ok(Logger::new(
            config.app_name.as_str(),
            config.logging.level,
            sink,
        ))
    }

    /// Returns a logger which prepends the given fields to every record.
    pub fn with_fields(&self, fields: impl IntoIterator<Item = LogField>) -> Self {
        let merged: Vec<LogField> = self.fields.iter().cloned().chain(fields).collect();
        Logger {
            fields: Arc::from(merged),
            ..self.clone()
        }
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.threshold
    }

    #[track_caller]
    pub fn debug(
        &self,
        ctx: &RequestContext,
        message: impl Into<String>,
        fields: impl IntoIterator<Item = LogField>,
    ) {
        self.log(LogLevel::Debug, ctx, message, fields);
    }

    #[track_caller]
    pub fn info(
        &self,
        ctx: &RequestContext,
        message: impl Into<String>,
        fields: impl IntoIterator<Item = LogField>,
    ) {
        self.log(LogLevel::Info, ctx, message, fields);
    }

    #[track_caller]
    pub fn warn(
        &self,
        ctx: &RequestContext,
        message: impl Into<String>,
        fields: impl IntoIterator<Item = LogField>,
    ) {
        self.log(LogLevel::Warn, ctx, message, fields);
    }

    #[track_caller]
    pub fn error(
        &self,
        ctx: &RequestContext,
        message: impl Into<String>,
        fields: impl IntoIterator<Item = LogField>,
    ) {
        self.log(LogLevel::Error, ctx, message, fields);
    }

    /// Logs at fatal severity and terminates the process.
    ///
    /// Only for unrecoverable startup conditions. Request failures are logged with
    /// [`Logger::error`].
    #[track_caller]
    pub fn fatal(
        &self,
        ctx: &RequestContext,
        message: impl Into<String>,
        fields: impl IntoIterator<Item = LogField>,
    ) -> ! {
        self.log(LogLevel::Fatal, ctx, message, fields);
        std::process::exit(1)
    }

    #[track_caller]
    pub fn debugf(&self, ctx: &RequestContext, args: Arguments<'_>) {
        self.logf(LogLevel::Debug, ctx, args);
    }

    #[track_caller]
    pub fn infof(&self, ctx: &RequestContext, args: Arguments<'_>) {
        self.logf(LogLevel::Info, ctx, args);
    }

    #[track_caller]
    pub fn warnf(&self, ctx: &RequestContext, args: Arguments<'_>) {
        self.logf(LogLevel::Warn, ctx, args);
    }

    #[track_caller]
    pub fn errorf(&self, ctx: &RequestContext, args: Arguments<'_>) {
        self.logf(LogLevel::Error, ctx, args);
    }

    #[track_caller]
    pub fn fatalf(&self, ctx: &RequestContext, args: Arguments<'_>) -> ! {
        self.logf(LogLevel::Fatal, ctx, args);
        std::process::exit(1)
    }

    #[track_caller]
    fn logf(&self, level: LogLevel, ctx: &RequestContext, args: Arguments<'_>) {
        if self.enabled(level) {
            self.log(level, ctx, args.to_string(), std::iter::empty());
        }
    }

    /// Emits a record at the given level, unless it is below the threshold.
    #[track_caller]
    pub fn log(
        &self,
        level: LogLevel,
        ctx: &RequestContext,
        message: impl Into<String>,
        fields: impl IntoIterator<Item = LogField>,
    ) {
        if !self.enabled(level) {
            return;
        }

        let record = self.build_record(level, ctx, message.into(), fields, Location::caller());
        self.sink.write(&record);
    }

    /// Assembles a record without emitting it.
    pub fn build_record(
        &self,
        level: LogLevel,
        ctx: &RequestContext,
        message: String,
        fields: impl IntoIterator<Item = LogField>,
        caller: &Location<'_>,
    ) -> LogRecord {
        let call_site = fields.into_iter();
        let mut merged = Vec::with_capacity(self.fields.len() + 2 + call_site.size_hint().0);
        merged.extend(self.fields.iter().cloned());
        if let Some(correlation) = ctx.correlation() {
            merged.push(LogField::string(FIELD_REQUEST_ID, correlation.request_id()));
            merged.push(LogField::string(FIELD_TRACE_ID, correlation.trace_id()));
        }
        merged.extend(call_site);

        LogRecord {
            timestamp: Utc::now(),
            severity: level,
            message,
            service: self.service.clone(),
            fields: merged,
            caller: Some(format!("{}:{}", caller.file(), caller.line())),
            stacktrace: (level == LogLevel::Fatal)
                .then(|| Backtrace::force_capture().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CorrelationContext;
    use crate::logging::sink::CaptureSink;
    use crate::logging::{FIELD_STATUS_CODE, LogField};
    use serde_json::Value;

    fn logger(threshold: LogLevel) -> (Logger, CaptureSink) {
        let sink = CaptureSink::new();
        (Logger::new("svc", threshold, Arc::new(sink.clone())), sink)
    }

    fn request_ctx() -> RequestContext {
        RequestContext::for_request(CorrelationContext::new("rid", "tid"))
    }

    #[test]
    fn fields_are_ordered_registered_then_correlation_then_call_site() {
        let (logger, sink) = logger(LogLevel::Info);
        let logger = logger.with_fields([LogField::int("a", 1)]);

        logger.info(&request_ctx(), "ordered", [LogField::int("b", 2)]);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field_keys(), vec!["a", "request-id", "trace-id", "b"]);
        assert_eq!(records[0].field("request-id").and_then(FieldValue::as_str), Some("rid"));
        assert_eq!(records[0].field("trace-id").and_then(FieldValue::as_str), Some("tid"));
    }

    #[test]
    fn background_context_omits_correlation_fields() {
        let (logger, sink) = logger(LogLevel::Info);

        logger.info(&RequestContext::background(), "startup", [LogField::int("b", 2)]);

        assert_eq!(sink.records()[0].field_keys(), vec!["b"]);
    }

    #[test]
    fn records_below_threshold_are_dropped() {
        let (logger, sink) = logger(LogLevel::Warn);
        let ctx = RequestContext::background();

        logger.debug(&ctx, "dropped", []);
        logger.info(&ctx, "dropped", []);
        logger.warn(&ctx, "kept", []);
        logger.error(&ctx, "kept", []);
        logger.infof(&ctx, format_args!("dropped {}", 1));
        logger.errorf(&ctx, format_args!("kept {}", 2));

        assert_eq!(sink.messages(), vec!["kept", "kept", "kept 2"]);
    }

    #[test]
    fn formatted_variants_carry_no_call_site_fields() {
        let (logger, sink) = logger(LogLevel::Debug);

        logger.debugf(&request_ctx(), format_args!("{} + {} = {}", 1, 1, 2));

        let record = &sink.records()[0];
        assert_eq!(record.message, "1 + 1 = 2");
        assert_eq!(record.severity, LogLevel::Debug);
        assert_eq!(record.field_keys(), vec!["request-id", "trace-id"]);
    }

    #[test]
    fn records_are_tagged_with_service_and_caller() {
        let (logger, sink) = logger(LogLevel::Info);

        logger.warn(&RequestContext::background(), "tagged", []);

        let record = &sink.records()[0];
        assert_eq!(&*record.service, "svc");
        assert!(record.caller.as_deref().is_some_and(|c| c.contains("logger.rs")));
        assert!(record.stacktrace.is_none());
    }

    #[test]
    fn with_fields_does_not_affect_the_parent() {
        let (parent, sink) = logger(LogLevel::Info);
        let child = parent.with_fields([LogField::string("component", "resolver")]);

        parent.info(&RequestContext::background(), "parent", []);
        child.info(&RequestContext::background(), "child", []);

        let records = sink.records();
        assert!(records[0].fields.is_empty());
        assert_eq!(records[1].field_keys(), vec!["component"]);
    }

    #[test]
    fn serialized_record_keeps_field_order() {
        let (logger, _) = logger(LogLevel::Info);
        let record = logger.build_record(
            LogLevel::Error,
            &request_ctx(),
            "Request failed".to_string(),
            [LogField::int(FIELD_STATUS_CODE, 500)],
            Location::caller(),
        );

        let line = serde_json::to_string(&record).unwrap();
        let keys = [
            "timestamp", "severity", "service", "message", "caller", "request-id", "trace-id",
            "status_code",
        ];
        let positions: Vec<usize> = keys
            .iter()
            .map(|key| line.find(&format!("\"{key}\":")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{line}");

        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["severity"], "error");
        assert_eq!(parsed["service"], "svc");
        assert_eq!(parsed["status_code"], 500);
    }

    #[test]
    fn fatal_records_carry_a_stacktrace() {
        let (logger, _) = logger(LogLevel::Info);
        let record = logger.build_record(
            LogLevel::Fatal,
            &RequestContext::background(),
            "boom".to_string(),
            [],
            Location::caller(),
        );

        assert!(record.stacktrace.is_some());
    }
}
