//! Tracing subscriber and optional OTLP span export.

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;

/// Keeps the tracer provider alive so buffered spans can be flushed on exit.
pub struct Telemetry {
    provider: Option<sdktrace::SdkTracerProvider>,
}

impl Telemetry {
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!("Failed to flush traces: {}", e);
            }
        }
    }
}

fn init_tracer(endpoint: &str) -> anyhow::Result<sdktrace::SdkTracerProvider> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());
    Ok(provider)
}

/// Installs the global subscriber. Spans go to OTLP only when `otlp_endpoint`
/// is set.
pub fn init(format: LogFormat, otlp_endpoint: Option<&str>) -> anyhow::Result<Telemetry> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,paytrack_app=debug,paytrack_hex=debug".into());

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Plain => tracing_subscriber::fmt::layer().boxed(),
    };

    let provider = otlp_endpoint.map(init_tracer).transpose()?;
    let otel_layer = provider.as_ref().map(|p| {
        tracing_opentelemetry::layer().with_tracer(p.tracer("paytrack-service"))
    });

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .with(filter)
        .try_init()?;

    Ok(Telemetry { provider })
}
