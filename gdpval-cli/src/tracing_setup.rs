//! Tracing and OpenTelemetry setup for the gdpval binary
//!
//! Usage:
//!   gdpval --debug serve              # Debug logging to console
//!   gdpval --otel serve               # Export traces to OTLP endpoint
//!   RUST_LOG=gdpval_server=debug gdpval serve  # Fine-grained log control
//!
//! Environment variables:
//!   RUST_LOG                          # Log filter (default: info, sqlx quiet)
//!   OTEL_EXPORTER_OTLP_ENDPOINT       # OTLP endpoint (default: http://localhost:4317)
//!   OTEL_SERVICE_NAME                 # Service name (default: gdpval)

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Filter used when RUST_LOG is unset. sqlx logs every statement at info.
const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

/// `--debug`: our crates and request tracing at debug, driver chatter kept down
const DEBUG_DIRECTIVES: &str = "info,gdpval=debug,gdpval_server=debug,tower_http=debug,sqlx=info";

const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
const DEFAULT_SERVICE_NAME: &str = "gdpval";

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Enable debug logging (ignored when RUST_LOG is set)
    pub debug: bool,
    /// Enable OpenTelemetry OTLP export
    pub otel: bool,
}

/// Which subscriber stack `init` installs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Console,
    ConsoleAndOtlp,
    /// `--otel` asked for, but the binary has no exporter
    ConsoleOtlpUnavailable,
}

fn backend(config: &TracingConfig) -> Backend {
    match (config.otel, cfg!(feature = "telemetry")) {
        (false, _) => Backend::Console,
        (true, true) => Backend::ConsoleAndOtlp,
        (true, false) => Backend::ConsoleOtlpUnavailable,
    }
}

/// RUST_LOG wins when it parses; otherwise the `--debug`-dependent default.
fn build_filter(rust_log: Option<&str>, config: &TracingConfig) -> EnvFilter {
    let fallback = if config.debug {
        DEBUG_DIRECTIVES
    } else {
        DEFAULT_DIRECTIVES
    };
    rust_log
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

fn env_filter(config: &TracingConfig) -> EnvFilter {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    build_filter(rust_log.as_deref(), config)
}

/// OTLP exporter target, read from the standard OTEL_* variables
#[derive(Debug, Clone, PartialEq, Eq)]
struct OtelSettings {
    endpoint: String,
    service_name: String,
}

impl OtelSettings {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string()),
            service_name: lookup("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
        }
    }

    #[cfg_attr(not(feature = "telemetry"), allow(dead_code))]
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Initialize tracing with console output only (no OTEL)
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(config.debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

/// Initialize tracing with OpenTelemetry OTLP export
#[cfg(feature = "telemetry")]
pub fn init_tracing_with_otel(config: &TracingConfig) -> Result<()> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::TracerProvider;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let settings = OtelSettings::from_env();

    let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&settings.endpoint)
        .build()
        .map_err(|e| anyhow!("Failed to create OTLP exporter: {}", e))?;

    let resource = opentelemetry_sdk::Resource::new(vec![KeyValue::new(
        "service.name",
        settings.service_name.clone(),
    )]);

    let provider = TracerProvider::builder()
        .with_batch_exporter(otlp_exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(resource)
        .build();

    let tracer = provider.tracer(DEFAULT_SERVICE_NAME);
    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    // Dropping the provider would stop export
    let _ = opentelemetry::global::set_tracer_provider(provider);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(config.debug)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt_layer)
        .with(telemetry_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    tracing::info!(
        endpoint = %settings.endpoint,
        service = %settings.service_name,
        "OpenTelemetry tracing initialized"
    );

    Ok(())
}

/// Shutdown OpenTelemetry (flush pending spans)
#[cfg(feature = "telemetry")]
pub fn shutdown_otel() {
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(not(feature = "telemetry"))]
pub fn shutdown_otel() {}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &TracingConfig) -> Result<()> {
    match backend(config) {
        #[cfg(feature = "telemetry")]
        Backend::ConsoleAndOtlp => init_tracing_with_otel(config),
        Backend::ConsoleOtlpUnavailable => {
            init_tracing(config)?;
            tracing::warn!("--otel ignored: built without the telemetry feature");
            Ok(())
        }
        _ => init_tracing(config),
    }
}
