use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SpanData;
use opentelemetry_sdk::trace::SpanExporter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use url::Url;

/// Where human readable logs are written
///
/// Commands printing results on stdout log to stderr so both can be piped separately.
#[derive(Debug, PartialEq)]
pub enum Stream {
    Stderr,
    Stdout,
}

#[derive(Debug)]
pub struct Telemetry {
    pub service_name: String,
    pub endpoint: Url,
}

pub struct TracingConfig {
    pub stream: Stream,
    pub telemetry: Option<Telemetry>,
    pub directives: Vec<tracing_subscriber::filter::Directive>,
    pub span_uploading: SpanUploading,
}

pub enum SpanUploading {
    /// Each span is exported as soon as it closes. Only suitable for short-lived commands.
    Blocking,
    BackgroundBatched,
}

/// Exporter dropping every span, used when no collector is configured
#[derive(Debug, Default)]
pub struct NoopSpanExporter;

impl SpanExporter for NoopSpanExporter {
    fn export(&self, _: Vec<SpanData>) -> impl std::future::Future<Output = OTelSdkResult> + Send {
        std::future::ready(Ok(()))
    }
}

pub fn create_tracing_subscriber<T: SpanExporter + 'static>(
    tracing_config: TracingConfig,
    log_level: tracing_subscriber::filter::LevelFilter,
    exporter: T,
) -> impl tracing::Subscriber {
    let env_filter_layer = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    let env_filter_layer = tracing_config
        .directives
        .into_iter()
        .fold(env_filter_layer, |layer, directive| {
            layer.add_directive(directive)
        });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_file(true)
        .with_line_number(false);
    let fmt_layer = match tracing_config.stream {
        Stream::Stderr => fmt_layer.with_writer(std::io::stderr).boxed(),
        Stream::Stdout => fmt_layer.boxed(),
    };
    let telemetry_layer = tracing_config.telemetry.map(|telemetry| {
        let resource = Resource::builder()
            .with_service_name(telemetry.service_name.clone())
            .build();
        let provider =
            opentelemetry_sdk::trace::SdkTracerProvider::builder().with_resource(resource);
        let tracer = match tracing_config.span_uploading {
            SpanUploading::Blocking => provider.with_simple_exporter(exporter),
            SpanUploading::BackgroundBatched => provider.with_batch_exporter(exporter),
        }
        .build()
        .tracer(telemetry.service_name);
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
        tracing_opentelemetry::OpenTelemetryLayer::new(tracer)
    });

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(env_filter_layer)
        .with(fmt_layer)
}
