//! Plain text formatting for diagnostic output.

use chrono::{SecondsFormat, Utc};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

/// Console formatter tagging every line with the service name.
///
/// Enclosing spans follow the message as a path, outermost first:
///
/// ```text
/// 2024-05-01T10:00:00.000Z WARN  [service-template] service_template::web::middleware: Request exceeded the deadline of 10s (in http_request{http.method=GET http.url=/health} > handler)
/// ```
pub struct ConsoleLogFormat {
    service: String,
}

impl ConsoleLogFormat {
    pub fn new(service: &str) -> Self {
        ConsoleLogFormat {
            service: service.to_string(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for ConsoleLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        write!(
            writer,
            "{} {:<5} [{}] {}: ",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            metadata.level(),
            self.service,
            metadata.target()
        )?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        let Some(scope) = ctx.event_scope() else {
            return writeln!(writer);
        };

        let mut separator = " (in ";
        for span in scope.from_root() {
            write!(writer, "{}{}", separator, span.name())?;
            separator = " > ";

            if let Some(fields) = span.extensions().get::<FormattedFields<N>>() {
                if !fields.is_empty() {
                    write!(writer, "{{{}}}", fields)?;
                }
            }
        }
        if separator == " > " {
            write!(writer, ")")?;
        }

        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(emit: impl FnOnce()) -> String {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .event_format(ConsoleLogFormat::new("svc"));

        tracing::subscriber::with_default(Registry::default().with(layer), emit);

        let output = buffer.0.lock().unwrap().clone();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn lines_carry_level_and_service() {
        let output = capture(|| tracing::info!("listening"));

        assert!(output.contains(" INFO  [svc] "), "{output}");
        assert!(output.ends_with(": listening\n"), "{output}");
    }

    #[test]
    fn spans_are_rendered_outermost_first() {
        let output = capture(|| {
            let outer = tracing::debug_span!("http_request", request_id = %"abc");
            let _outer = outer.enter();
            let inner = tracing::debug_span!("handler");
            let _inner = inner.enter();
            tracing::warn!("slow");
        });

        assert!(
            output.ends_with("slow (in http_request{request_id=abc} > handler)\n"),
            "{output}"
        );
    }
}
