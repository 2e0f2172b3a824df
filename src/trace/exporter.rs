//! Span exporters plugged into the SDK span processors.
//!
//! # Design Decisions
//! - Both exporters complete synchronously and return a ready future
//! - After `shutdown` the logging exporter refuses further batches

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::future::BoxFuture;
use opentelemetry::trace::{Status, TraceError};
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use serde_json::{json, Map, Value as JsonValue};

use crate::observability::metrics;

/// Writes every span as a JSON log line.
#[derive(Debug, Default)]
pub struct LoggingSpanExporter {
    stopped: bool,
}

impl LoggingSpanExporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpanExporter for LoggingSpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let result = if self.stopped {
            Err(TraceError::from("exporter is shut down"))
        } else {
            log_batch(&batch)
        };
        Box::pin(async move { result })
    }

    fn shutdown(&mut self) {
        self.stopped = true;
    }
}

fn log_batch(batch: &[SpanData]) -> ExportResult {
    for span in batch {
        let line = serde_json::to_string(&span_json(span)).map_err(|e| TraceError::from(e.to_string()))?;
        tracing::info!(
            scope.name = %span.instrumentation_lib.name,
            scope.version = span.instrumentation_lib.version.as_deref().unwrap_or(""),
            span = %line,
            "Span exported"
        );
    }
    metrics::record_spans_exported(batch.len());
    Ok(())
}

/// JSON summary of a finished span.
pub fn span_json(span: &SpanData) -> JsonValue {
    let attributes: Map<String, JsonValue> = span
        .attributes
        .iter()
        .map(|kv| (kv.key.as_str().to_string(), JsonValue::String(kv.value.as_str().into_owned())))
        .collect();
    let status = match &span.status {
        Status::Unset => json!("unset"),
        Status::Ok => json!("ok"),
        Status::Error { description } => json!({ "error": description }),
    };
    let parent = span.parent_span_id;

    json!({
        "name": span.name,
        "kind": format!("{:?}", span.span_kind),
        "trace_id": span.span_context.trace_id().to_string(),
        "span_id": span.span_context.span_id().to_string(),
        "parent_span_id": (parent != opentelemetry::trace::SpanId::INVALID).then(|| parent.to_string()),
        "start_unix_nanos": unix_nanos(span.start_time),
        "end_unix_nanos": unix_nanos(span.end_time),
        "attributes": attributes,
        "status": status,
    })
}

fn unix_nanos(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0)
}

/// String value of attribute `key`, if the span carries it.
pub fn span_attribute(span: &SpanData, key: &str) -> Option<String> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.as_str().into_owned())
}

/// Keeps finished spans in memory. Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl InMemorySpanExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.spans.lock().expect("span store mutex poisoned").clone()
    }

    pub fn reset(&self) {
        self.spans.lock().expect("span store mutex poisoned").clear();
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let result = self
            .spans
            .lock()
            .map(|mut spans| spans.extend(batch))
            .map_err(|_| TraceError::from("span store mutex poisoned"));
        Box::pin(async move { result })
    }
}
