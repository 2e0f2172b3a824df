//! Request-tracing enhancer for server entry points.
//!
//! # Data Flow
//! ```text
//! before_call(request)
//!     → propagator.extract(request headers)      remote parent, if any
//!     → tracer.build_with_context("{METHOD} {uri}", parent)
//!     → CallScope::insert(RequestSpan)
//! on_error(failure)   → CallScope::take → record error → end
//! after_call          → CallScope::take → end (if still there)
//! ```
//!
//! The span lives in the invocation's scope, so concurrent calls on other
//! threads never see it and it cannot outlive the call.

use std::any::Any;
use std::sync::Arc;

use opentelemetry::trace::{Span as _, SpanKind, Status, Tracer as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::Span;

use crate::config::schema::HTTP_SERVER_ENHANCER;
use crate::enhancer::{Enhancer, Failure, HookResult, Invocation, Value};
use crate::loader::Settings;
use crate::matcher::{is_interface, is_static, named, BoxMatcher, MatcherExt};
use crate::trace::context::TraceContext;
use crate::trace::request::ServerRequest;

pub const DEFAULT_TARGET_MODULE: &str = "demo::HostValve";
pub const DEFAULT_TARGET_METHOD: &str = "invoke";

/// Server span of one intercepted call, owned by the call's scope. Ends
/// when dropped if no hook ended it first.
#[derive(Debug)]
pub struct RequestSpan(Span);

impl RequestSpan {
    pub fn span_mut(&mut self) -> &mut Span {
        &mut self.0
    }

    pub fn end(mut self) {
        self.0.end();
    }
}

/// Opens a server span around every intercepted request dispatch.
#[derive(Debug, Clone)]
pub struct HttpServerEnhancer {
    trace: Arc<TraceContext>,
    target_module: String,
    target_method: String,
    component: String,
}

impl HttpServerEnhancer {
    pub fn new(trace: Arc<TraceContext>) -> Self {
        Self {
            trace,
            target_module: DEFAULT_TARGET_MODULE.to_string(),
            target_method: DEFAULT_TARGET_METHOD.to_string(),
            component: "demo".to_string(),
        }
    }

    /// Override from plugin settings: `method` and `component` keys. The
    /// intercepted module always comes from the agent configuration.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        if let Some(method) = settings.get("method") {
            self.target_method = method.clone();
        }
        if let Some(component) = settings.get("component") {
            self.component = component.clone();
        }
        self
    }

    pub fn with_target(mut self, module: impl Into<String>, method: impl Into<String>) -> Self {
        self.target_module = module.into();
        self.target_method = method.into();
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    pub fn target_module(&self) -> &str {
        &self.target_module
    }

    fn start_span(&self, request: &ServerRequest) -> RequestSpan {
        let parent = self.trace.propagator().extract_with_context(&Context::new(), request);

        let mut attributes = vec![
            KeyValue::new("http.method", request.method().to_string()),
            KeyValue::new("http.url", request.url()),
            KeyValue::new("http.target", request.target().to_string()),
            KeyValue::new("component", self.component.clone()),
        ];
        if let Some(addr) = request.remote_addr() {
            attributes.push(KeyValue::new("net.peer.addr", addr.ip().to_string()));
            attributes.push(KeyValue::new("net.peer.port", addr.port().to_string()));
        }
        if let Some(host) = request.remote_host() {
            attributes.push(KeyValue::new("net.peer.host", host));
        }
        if let Some(user) = request.user() {
            attributes.push(KeyValue::new("enduser.id", user.to_string()));
        }

        let tracer = self.trace.tracer();
        let mut builder = tracer.span_builder(format!("{} {}", request.method(), request.path()));
        builder.span_kind = Some(SpanKind::Server);
        builder.attributes = Some(attributes);
        RequestSpan(tracer.build_with_context(builder, &parent))
    }
}

impl Enhancer for HttpServerEnhancer {
    fn name(&self) -> &str {
        HTTP_SERVER_ENHANCER
    }

    fn module_matcher(&self) -> Option<BoxMatcher> {
        Some(named(self.target_module.as_str()).and(is_interface().negate()).boxed())
    }

    fn method_matcher(&self) -> Option<BoxMatcher> {
        Some(named(self.target_method.as_str()).and(is_static().negate()).boxed())
    }

    fn before_call(&self, call: &Invocation<'_>) -> HookResult<Option<Value>> {
        tracing::debug!(module = %call.module(), member = %call.member(), "Trace before_call");

        let Some(request) = call.arg::<ServerRequest>(0) else {
            tracing::debug!(
                module = %call.module(),
                member = %call.member(),
                "First argument is not a ServerRequest, not tracing"
            );
            return Ok(None);
        };

        let span = self.start_span(request);
        call.scope().insert(span);
        Ok(None)
    }

    fn after_call(&self, call: &Invocation<'_>, _result: Option<&dyn Any>) -> HookResult<Option<Value>> {
        tracing::debug!(module = %call.module(), member = %call.member(), "Trace after_call");
        if let Some(span) = call.scope().take::<RequestSpan>() {
            span.end();
        }
        Ok(None)
    }

    fn on_error(&self, call: &Invocation<'_>, failure: &Failure<'_>) -> HookResult<()> {
        tracing::debug!(module = %call.module(), member = %call.member(), "Trace on_error");
        if let Some(mut span) = call.scope().take::<RequestSpan>() {
            let message = failure.message().to_string();
            let inner = span.span_mut();
            inner.set_attribute(KeyValue::new("error", true));
            inner.set_attribute(KeyValue::new("error.message", message.clone()));
            inner.set_status(Status::error(message));
            span.end();
        }
        Ok(())
    }
}
