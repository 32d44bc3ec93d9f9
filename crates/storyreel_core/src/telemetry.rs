//! Tracing subscriber setup.
//!
//! With the `otel` feature, spans are also exported through OpenTelemetry to
//! stdout; call [`shutdown_telemetry`] before exit to flush them.

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the process-wide tracing subscriber.
///
/// Respects `RUST_LOG`; falls back to `info` when it is unset or invalid.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_filter(default_filter());

    let registry = tracing_subscriber::registry().with(fmt_layer);

    #[cfg(feature = "otel")]
    let registry = registry.with(otel::layer().with_filter(default_filter()));

    registry.try_init()?;
    Ok(())
}

/// Flush and shut down the OpenTelemetry tracer provider.
#[cfg(feature = "otel")]
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(feature = "otel")]
mod otel {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_sdk::{
        Resource,
        trace::{RandomIdGenerator, Sampler, Tracer, TracerProvider},
    };
    use opentelemetry_stdout::SpanExporter;
    use tracing_opentelemetry::OpenTelemetryLayer;
    use tracing_subscriber::registry::LookupSpan;

    /// Span layer exporting to stdout, registered as the global provider.
    pub(super) fn layer<S>() -> OpenTelemetryLayer<S, Tracer>
    where
        S: tracing::Subscriber + for<'span> LookupSpan<'span>,
    {
        let provider = TracerProvider::builder()
            .with_simple_exporter(SpanExporter::default())
            .with_id_generator(RandomIdGenerator::default())
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(Resource::default())
            .build();
        let tracer = provider.tracer("storyreel");
        opentelemetry::global::set_tracer_provider(provider);

        tracing_opentelemetry::layer().with_tracer(tracer)
    }
}
