use anyhow::Context;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use std::env;
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Builds a layer exporting request spans to the endpoint in `OTEL_EXPORTER_OTLP_ENDPOINT`.
pub fn setup_open_telemetry_layer<S>(service: &str, version: &str) -> anyhow::Result<impl Layer<S>>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .context("No OpenTelemetry endpoint present in OTEL_EXPORTER_OTLP_ENDPOINT")?;

    let provider = setup_open_telemetry(endpoint, service, version)?;
    let tracer = provider.tracer(service.to_string());
    let filter = EnvFilter::try_from_env("RUST_TRACE").unwrap_or_else(|_| EnvFilter::new("debug"));

    Ok(OpenTelemetryLayer::new(tracer).with_filter(filter))
}

fn setup_open_telemetry(
    endpoint: String,
    service: &str,
    version: &str,
) -> anyhow::Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()
        .with_context(|| format!("Failed to build OpenTelemetry exporter for: {}", endpoint))?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_max_attributes_per_span(16)
        .with_resource(
            Resource::builder_empty()
                .with_attributes([
                    KeyValue::new(SERVICE_NAME, service.to_string()),
                    KeyValue::new(SERVICE_VERSION, version.to_string()),
                ])
                .build(),
        )
        .build();

    opentelemetry::global::set_tracer_provider(tracer_provider.clone());

    Ok(tracer_provider)
}
