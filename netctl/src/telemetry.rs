//! Logging and trace export setup.
//!
//! [`Telemetry`] installs the global `tracing` subscriber: an [`EnvFilter`]
//! driven by `RUST_LOG` (falling back to the configured level) and a console
//! formatter, plain or JSON. With the `telemetry` feature, spans are also
//! exported over OTLP when `OTEL_EXPORTER_OTLP_*` variables are present.

use std::time::Duration;

use axum::http::{Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, MakeSpan, OnResponse, TraceLayer};
use tracing::Span;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Subscriber settings.
#[derive(Debug, Default)]
pub struct Telemetry {
    name: Option<String>,
    version: Option<String>,
    log_level: Option<String>,
    json: bool,
}

impl Telemetry {
    /// Creates a new, empty [`Telemetry`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name reported to the trace collector.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the service version reported to the trace collector.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the filter used when `RUST_LOG` is not set, e.g.
    /// `"netctl=debug,tower_http=info"`.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Formats console output as JSON lines.
    #[must_use]
    pub const fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Installs the global subscriber.
    ///
    /// Returns a [`TelemetryGuard`] that flushes exporters on drop. If a global
    /// subscriber is already installed this one is discarded.
    pub fn register(self) -> TelemetryGuard {
        #[cfg(feature = "telemetry")]
        let tracer_provider = otlp::detect_protocol()
            .and_then(|protocol| otlp::init_tracer(protocol, self.resource()));
        #[cfg(feature = "telemetry")]
        let otel_layer = tracer_provider.as_ref().map(|tp| {
            use opentelemetry::trace::TracerProvider as _;
            tracing_opentelemetry::OpenTelemetryLayer::new(tp.tracer("netctl"))
        });
        #[cfg(not(feature = "telemetry"))]
        let otel_layer: Option<tracing_subscriber::layer::Identity> = None;

        let fallback = self.log_level.as_deref().unwrap_or("info");
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
        let json_layer = self.json.then(|| tracing_subscriber::fmt::layer().json());
        let text_layer = (!self.json).then(tracing_subscriber::fmt::layer);

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .with(text_layer)
            .with(otel_layer)
            .try_init()
            .is_ok();

        #[cfg(feature = "telemetry")]
        if tracer_provider.is_some() {
            tracing::info!("OTLP trace export enabled");
        }
        if !installed {
            tracing::debug!("global subscriber already installed");
        }

        TelemetryGuard {
            #[cfg(feature = "telemetry")]
            tracer_provider,
        }
    }

    #[cfg(feature = "telemetry")]
    fn resource(&self) -> opentelemetry_sdk::Resource {
        otlp::resource(self.name.as_deref(), self.version.as_deref())
    }
}

#[cfg(feature = "telemetry")]
mod otlp {
    use std::env;

    use opentelemetry::KeyValue;
    use opentelemetry_sdk::Resource;
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
    use opentelemetry_semantic_conventions::{SCHEMA_URL, attribute::SERVICE_VERSION};

    #[derive(Debug, Clone, Copy)]
    pub(super) enum OtlpProtocol {
        Http,
        Grpc,
    }

    fn env_or(key: &str, fallback: Option<&str>) -> Option<String> {
        env::var(key)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| fallback.map(ToOwned::to_owned))
    }

    /// `None` unless an OTLP endpoint, header or protocol is configured.
    pub(super) fn detect_protocol() -> Option<OtlpProtocol> {
        let enabled = ["ENDPOINT", "HEADERS", "PROTOCOL"]
            .iter()
            .any(|suffix| env::var(format!("OTEL_EXPORTER_OTLP_{suffix}")).is_ok());
        enabled.then(|| match env::var("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
            Ok("grpc") => OtlpProtocol::Grpc,
            _ => OtlpProtocol::Http,
        })
    }

    pub(super) fn resource(name: Option<&str>, version: Option<&str>) -> Resource {
        let mut builder = Resource::builder();
        if let Some(name) = env_or("OTEL_SERVICE_NAME", name) {
            builder = builder.with_service_name(name);
        }
        if let Some(version) = env_or("OTEL_SERVICE_VERSION", version) {
            builder =
                builder.with_schema_url([KeyValue::new(SERVICE_VERSION, version)], SCHEMA_URL);
        }
        builder.build()
    }

    // Runs before the subscriber exists, so failures go to stderr.
    #[allow(clippy::print_stderr)]
    pub(super) fn init_tracer(
        protocol: OtlpProtocol,
        resource: Resource,
    ) -> Option<SdkTracerProvider> {
        let exporter = match protocol {
            OtlpProtocol::Http => opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .build(),
            OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .build(),
        };
        let exporter = exporter
            .inspect_err(|err| eprintln!("OTLP exporter unavailable: {err}"))
            .ok()?;
        Some(
            SdkTracerProvider::builder()
                .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource)
                .with_batch_exporter(exporter)
                .build(),
        )
    }
}

/// Flushes the trace exporter on drop.
#[derive(Debug)]
pub struct TelemetryGuard {
    #[cfg(feature = "telemetry")]
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "telemetry")]
        if let Some(ref tp) = self.tracer_provider
            && let Err(err) = tp.shutdown()
        {
            tracing::error!(?err, "tracer provider shutdown error");
        }
    }
}

/// Request tracing layer for the HTTP API.
pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    ApiMakeSpan,
    DefaultOnRequest,
    ApiOnResponse,
>;

/// Creates the request tracing layer for the HTTP API.
#[must_use]
pub fn http_tracing() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(ApiMakeSpan)
        .on_response(ApiOnResponse)
}

/// One span per API request.
#[derive(Clone, Copy, Debug)]
pub struct ApiMakeSpan;

impl<B> MakeSpan<B> for ApiMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "api_request",
            otel.kind = "server",
            otel.name = %format!("{} {}", request.method(), request.uri().path()),
            method = %request.method(),
            path = %request.uri().path(),
            status = tracing::field::Empty,
        )
    }
}

/// Records the response status on the request span.
#[derive(Clone, Copy, Debug)]
pub struct ApiOnResponse;

impl<B> OnResponse<B> for ApiOnResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status();
        span.record("status", status.as_u16());

        #[cfg(feature = "telemetry")]
        {
            use opentelemetry::trace::Status;
            use tracing_opentelemetry::OpenTelemetrySpanExt;
            if status.is_server_error() {
                span.set_status(Status::error(
                    status.canonical_reason().unwrap_or("unknown").to_owned(),
                ));
            } else {
                span.set_status(Status::Ok);
            }
        }

        tracing::debug!(
            status = status.as_u16(),
            elapsed_ms = latency.as_millis(),
            "request finished"
        );
    }
}
