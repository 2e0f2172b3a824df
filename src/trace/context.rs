//! Process-wide trace context.
//!
//! # Responsibilities
//! - Own the tracer provider and the active propagator
//! - Hand out the tracer, created lazily on first use
//! - Optionally act as the process global
//!
//! # Design Decisions
//! - Built once at install time and shared by `Arc`; enhancers receive it
//!   explicitly, the global is only a convenience for host code
//! - Sampling is parent-based: a remote parent that is not sampled keeps the
//!   whole trace unsampled, everything else is recorded
//! - The batch processor runs on its own current-thread runtime, so no
//!   ambient tokio runtime is needed

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use opentelemetry::global;
use opentelemetry::propagation::{TextMapCompositePropagator, TextMapPropagator};
use opentelemetry::trace::{TraceResult, TracerProvider as _};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::export::trace::SpanExporter;
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::{self as sdk_trace, BatchConfigBuilder, BatchSpanProcessor, Sampler, Tracer, TracerProvider};
use opentelemetry_sdk::Resource;

use crate::config::schema::{BatchConfig, ExporterKind, ProcessorKind, PropagatorKind, TraceConfig};
use crate::trace::exporter::LoggingSpanExporter;

static GLOBAL: OnceLock<Arc<TraceContext>> = OnceLock::new();

type BoxPropagator = Box<dyn TextMapPropagator + Send + Sync>;

/// Tracer provider, propagator and tracer of one process.
pub struct TraceContext {
    provider: TracerProvider,
    propagator: BoxPropagator,
    scope_name: Cow<'static, str>,
    scope_version: Option<Cow<'static, str>>,
    tracer: OnceLock<Tracer>,
    global: AtomicBool,
}

impl TraceContext {
    pub fn builder() -> TraceContextBuilder {
        TraceContextBuilder::default()
    }

    /// Build the context described by `config`.
    pub fn from_config(config: &TraceConfig) -> Arc<Self> {
        let mut builder = Self::builder().with_scope(config.scope_name.clone(), config.scope_version.clone());

        builder = match config.propagator {
            PropagatorKind::TraceContext => builder.with_propagator(TraceContextPropagator::new()),
            PropagatorKind::None => builder.with_propagator(TextMapCompositePropagator::new(Vec::new())),
        };

        builder = match (config.exporter, config.processor) {
            (ExporterKind::None, _) => builder,
            (ExporterKind::Logging, ProcessorKind::Simple) => builder.with_simple_exporter(LoggingSpanExporter::new()),
            (ExporterKind::Logging, ProcessorKind::Batch) => {
                builder.with_batch_exporter(LoggingSpanExporter::new(), &config.batch)
            }
        };

        tracing::info!(
            exporter = ?config.exporter,
            processor = ?config.processor,
            propagator = ?config.propagator,
            "Trace context initialized"
        );
        builder.build()
    }

    /// Register `context` as the process global, including the
    /// OpenTelemetry global tracer provider. Returns false if a global was
    /// already registered.
    pub fn set_global(context: Arc<TraceContext>) -> bool {
        let provider = context.provider.clone();
        let flag = context.clone();
        if GLOBAL.set(context).is_err() {
            return false;
        }
        flag.global.store(true, Ordering::Release);
        global::set_tracer_provider(provider);
        true
    }

    pub fn global() -> Option<Arc<TraceContext>> {
        GLOBAL.get().cloned()
    }

    pub fn tracer(&self) -> &Tracer {
        self.tracer.get_or_init(|| {
            tracing::debug!(scope = %self.scope_name, "Creating tracer");
            self.provider
                .versioned_tracer(self.scope_name.clone(), self.scope_version.clone(), None::<&'static str>, None)
        })
    }

    pub fn propagator(&self) -> &dyn TextMapPropagator {
        self.propagator.as_ref()
    }

    pub fn provider(&self) -> &TracerProvider {
        &self.provider
    }

    /// Export everything the processors still hold.
    pub fn force_flush(&self) -> TraceResult<()> {
        self.provider
            .force_flush()
            .into_iter()
            .collect::<TraceResult<Vec<()>>>()
            .map(|_| ())
    }

    /// Flush pending spans and release the global provider if this context
    /// registered it.
    pub fn shutdown(&self) -> TraceResult<()> {
        let flushed = self.force_flush();
        if self.global.swap(false, Ordering::AcqRel) {
            global::shutdown_tracer_provider();
        }
        flushed
    }
}

impl fmt::Debug for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceContext")
            .field("scope_name", &self.scope_name)
            .field("scope_version", &self.scope_version)
            .field("propagator", &self.propagator)
            .finish()
    }
}

/// Assembles a `TraceContext`.
pub struct TraceContextBuilder {
    provider: sdk_trace::Builder,
    propagator: BoxPropagator,
    scope_name: Cow<'static, str>,
    scope_version: Option<Cow<'static, str>>,
}

impl Default for TraceContextBuilder {
    fn default() -> Self {
        let config = sdk_trace::config()
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
            .with_resource(Resource::default());
        Self {
            provider: TracerProvider::builder().with_config(config),
            propagator: Box::new(TraceContextPropagator::new()),
            scope_name: Cow::Borrowed("intercept-agent"),
            scope_version: Some(Cow::Borrowed(env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl TraceContextBuilder {
    pub fn with_simple_exporter(mut self, exporter: impl SpanExporter + 'static) -> Self {
        self.provider = self.provider.with_simple_exporter(exporter);
        self
    }

    pub fn with_batch_exporter(mut self, exporter: impl SpanExporter + 'static, config: &BatchConfig) -> Self {
        let batch = BatchConfigBuilder::default()
            .with_max_queue_size(config.max_queue_size)
            .with_max_export_batch_size(config.max_export_batch_size)
            .with_scheduled_delay(Duration::from_millis(config.scheduled_delay_ms))
            .build();
        let processor = BatchSpanProcessor::builder(exporter, runtime::TokioCurrentThread)
            .with_batch_config(batch)
            .build();
        self.provider = self.provider.with_span_processor(processor);
        self
    }

    pub fn with_propagator(mut self, propagator: impl TextMapPropagator + Send + Sync + 'static) -> Self {
        self.propagator = Box::new(propagator);
        self
    }

    pub fn with_scope(mut self, name: impl Into<String>, version: Option<String>) -> Self {
        self.scope_name = Cow::Owned(name.into());
        self.scope_version = version.map(Cow::Owned);
        self
    }

    pub fn build(self) -> Arc<TraceContext> {
        Arc::new(TraceContext {
            provider: self.provider.build(),
            propagator: self.propagator,
            scope_name: self.scope_name,
            scope_version: self.scope_version,
            tracer: OnceLock::new(),
            global: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::exporter::InMemorySpanExporter;
    use crate::trace::ServerRequest;
    use opentelemetry::trace::{Span as _, SpanId, SpanKind, TraceContextExt as _, TraceId, Tracer as _};
    use opentelemetry::Context;

    fn context() -> (InMemorySpanExporter, Arc<TraceContext>) {
        let exporter = InMemorySpanExporter::new();
        let context = TraceContext::builder()
            .with_scope("demo", Some("1.0.0".to_string()))
            .with_simple_exporter(exporter.clone())
            .build();
        (exporter, context)
    }

    fn remote_parent(context: &TraceContext, traceparent: &str) -> Context {
        let request = ServerRequest::new("GET", "/").with_header("traceparent", traceparent);
        context.propagator().extract_with_context(&Context::new(), &request)
    }

    #[test]
    fn test_tracer_is_created_once() {
        let (_exporter, context) = context();
        assert!(std::ptr::eq(context.tracer(), context.tracer()));
    }

    #[test]
    fn test_child_of_remote_parent() {
        let (exporter, context) = context();
        let parent = remote_parent(&context, "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01");
        assert!(parent.span().span_context().is_remote());

        let mut builder = context.tracer().span_builder("GET /");
        builder.span_kind = Some(SpanKind::Server);
        let mut span = context.tracer().build_with_context(builder, &parent);
        span.set_attribute(opentelemetry::KeyValue::new("http.method", "GET"));
        span.end();

        let spans = exporter.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(
            spans[0].span_context.trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
        );
        assert_eq!(spans[0].parent_span_id, SpanId::from_hex("00f067aa0ba902b7").unwrap());
        assert_eq!(spans[0].span_kind, SpanKind::Server);
        assert_eq!(spans[0].instrumentation_lib.name, "demo");
        assert_eq!(spans[0].instrumentation_lib.version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_unsampled_remote_parent_is_not_exported() {
        let (exporter, context) = context();
        let parent = remote_parent(&context, "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00");

        let builder = context.tracer().span_builder("GET /");
        context.tracer().build_with_context(builder, &parent).end();
        assert!(exporter.finished_spans().is_empty());
    }

    #[test]
    fn test_malformed_traceparent_starts_new_trace() {
        let (exporter, context) = context();
        let parent = remote_parent(&context, "00-not-a-trace-01");
        assert!(!parent.span().span_context().is_valid());

        let builder = context.tracer().span_builder("GET /");
        context.tracer().build_with_context(builder, &parent).end();

        let spans = exporter.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].parent_span_id, SpanId::INVALID);
    }

    #[test]
    fn test_invalid_traceparent_values_are_rejected() {
        let (_exporter, context) = context();
        for traceparent in [
            "00-00000000000000000000000000000000-00f067aa0ba902b7-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01",
            "ff-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        ] {
            let parent = remote_parent(&context, traceparent);
            assert!(!parent.span().span_context().is_valid(), "{traceparent}");
        }
    }

    #[test]
    fn test_disabled_propagator_ignores_headers() {
        let exporter = InMemorySpanExporter::new();
        let context = TraceContext::builder()
            .with_propagator(TextMapCompositePropagator::new(Vec::new()))
            .with_simple_exporter(exporter)
            .build();
        let parent = remote_parent(&context, "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01");
        assert!(!parent.span().span_context().is_valid());
    }

    #[test]
    fn test_dropped_span_ends_once() {
        let (exporter, context) = context();
        {
            let _span = context.tracer().start("scoped");
        }
        let mut span = context.tracer().start("explicit");
        span.end();
        span.end();

        let names: Vec<String> = exporter.finished_spans().into_iter().map(|s| s.name.into_owned()).collect();
        assert_eq!(names, vec!["scoped", "explicit"]);
    }

    #[test]
    fn test_batch_processor_exports_on_flush() {
        let exporter = InMemorySpanExporter::new();
        let config = BatchConfig {
            max_queue_size: 64,
            max_export_batch_size: 8,
            scheduled_delay_ms: 60_000,
        };
        let context = TraceContext::builder().with_batch_exporter(exporter.clone(), &config).build();

        for _ in 0..3 {
            context.tracer().start("batched").end();
        }
        context.force_flush().unwrap();
        assert_eq!(exporter.finished_spans().len(), 3);
    }
}
