//! Distributed tracing for instrumented host code, on the OpenTelemetry SDK.
//!
//! # Data Flow
//! ```text
//! Inbound request reaches an intercepted entry point:
//!     → enhancer.rs (HttpServerEnhancer::before_call)
//!     → TraceContextPropagator (W3C traceparent → remote parent Context)
//!     → context.rs (tracer from the SDK TracerProvider → RequestSpan)
//!     → SDK simple or batch span processor
//!     → exporter.rs (logging or in-memory)
//! ```
//!
//! # Design Decisions
//! - W3C Trace Context is the default propagation format
//! - Export failures are logged, never surfaced to instrumented code

pub mod context;
pub mod enhancer;
pub mod exporter;
pub mod request;

pub use context::{TraceContext, TraceContextBuilder};
pub use enhancer::{HttpServerEnhancer, RequestSpan};
pub use exporter::{span_attribute, span_json, InMemorySpanExporter, LoggingSpanExporter};
pub use request::ServerRequest;
