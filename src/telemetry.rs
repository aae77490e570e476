//! Logging, tracing and metrics export for the operator
//!
//! Logs always go to stdout as JSON. Setting `OTEL_EXPORTER_OTLP_ENDPOINT`
//! additionally ships spans and the instruments in [`crate::metrics`] to an
//! OTLP collector over gRPC.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info,redis_fleet=debug,kube=info,tower=warn,hyper=warn";

/// Telemetry setup failures
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// An OTLP exporter could not be built
    #[error("failed to build OTLP {signal} exporter: {message}")]
    Exporter {
        /// "trace" or "metrics"
        signal: &'static str,
        /// Exporter error
        message: String,
    },

    /// A global subscriber was already installed
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Telemetry settings
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `service.name` reported on spans and metrics
    pub service_name: String,
    /// OTLP gRPC endpoint; logs only when unset
    pub otlp_endpoint: Option<String>,
    /// Namespace the controller is restricted to, if any
    pub watch_namespace: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "redis-fleet".to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            watch_namespace: None,
        }
    }
}

/// Install the global subscriber and, when configured, the OTLP exporters
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => {
            let provider = install_otlp(endpoint, build_resource(&config))?;
            let tracer = provider.tracer(config.service_name.clone());
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))
}

/// `RUST_LOG` if set and valid, otherwise [`DEFAULT_FILTER`]
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn build_resource(config: &TelemetryConfig) -> Resource {
    let mut attributes = vec![
        KeyValue::new(SERVICE_NAME, config.service_name.clone()),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
    ];

    // Downward API
    if let Ok(pod_name) = std::env::var("POD_NAME") {
        attributes.push(KeyValue::new("k8s.pod.name", pod_name));
    }
    if let Ok(namespace) = std::env::var("POD_NAMESPACE") {
        attributes.push(KeyValue::new("k8s.namespace.name", namespace));
    }
    if let Some(watched) = &config.watch_namespace {
        attributes.push(KeyValue::new("redis_fleet.watch_namespace", watched.clone()));
    }

    Resource::new(attributes)
}

/// Register OTLP span and metric pipelines globally
///
/// Returns the tracer provider so the caller can bridge `tracing` spans.
fn install_otlp(endpoint: &str, resource: Resource) -> Result<TracerProvider, TelemetryError> {
    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "trace",
            message: e.to_string(),
        })?;
    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "metrics",
            message: e.to_string(),
        })?;

    let tracer_provider = TracerProvider::builder()
        .with_batch_exporter(span_exporter, runtime::Tokio)
        .with_resource(resource.clone())
        .build();
    let meter_provider = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(metric_exporter, runtime::Tokio).build())
        .with_resource(resource)
        .build();

    global::set_tracer_provider(tracer_provider.clone());
    global::set_meter_provider(meter_provider);

    Ok(tracer_provider)
}
