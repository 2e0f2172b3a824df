//! The three transformer strategies installing the request-tracing enhancer
//! on the demo host valve.

mod common;

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

use intercept_agent::agent::install_with;
use intercept_agent::config::TransformerVersion;
use intercept_agent::demo::{GreetingService, HostValve};
use intercept_agent::intercept::Instrumentation;
use intercept_agent::trace::{span_attribute, ServerRequest};
use opentelemetry::trace::{SpanId, SpanKind, Status};
use intercept_agent::transformer::Strategy;

fn request(path: &str) -> ServerRequest {
    ServerRequest::new("GET", path)
        .with_header("host", "localhost:8080")
        .with_remote_addr("10.0.0.7:51000".parse().unwrap())
}

#[test]
fn test_v1_direct_traces_requests() {
    let (exporter, trace) = common::in_memory_trace();
    let inst = Instrumentation::new();
    let config = common::agent_config(TransformerVersion::V1, Path::new("/nonexistent/plugins.toml"));
    let installed = install_with(config, trace, &inst);
    assert_eq!(installed.strategy(), Strategy::Direct);

    let valve = HostValve::define(&inst, GreetingService::default()).unwrap();
    assert_eq!(valve.host_module().enhanced_members(), vec!["invoke"]);

    assert_eq!(valve.invoke(&request("/hello/ada"), "ada").unwrap(), "Hello, ada!");

    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "GET /hello/ada");
    assert_eq!(spans[0].span_kind, SpanKind::Server);
    assert_eq!(span_attribute(&spans[0], "http.url").as_deref(), Some("http://localhost:8080/hello/ada"));
    assert_eq!(span_attribute(&spans[0], "net.peer.addr").as_deref(), Some("10.0.0.7"));
    assert_eq!(span_attribute(&spans[0], "component").as_deref(), Some("demo"));
    assert_eq!(spans[0].status, Status::Unset);
}

#[test]
fn test_v2_namespace_traces_requests() {
    let (exporter, trace) = common::in_memory_trace();
    let inst = Instrumentation::new();
    let config = common::agent_config(TransformerVersion::V2, Path::new("/nonexistent/plugins.toml"));
    let installed = install_with(config, trace, &inst);
    assert_eq!(installed.strategy(), Strategy::TargetNamespace);
    assert!(installed.loader().is_none());

    let valve = HostValve::define(&inst, GreetingService::default()).unwrap();
    valve.invoke(&request("/hello/grace"), "grace").unwrap();

    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "GET /hello/grace");
}

#[test]
fn test_v3_plugin_loader_uses_archive_settings() {
    let (exporter, trace) = common::in_memory_trace();
    let archive = common::http_server_archive("Tomcat");
    let inst = Instrumentation::new();
    let config = common::agent_config(TransformerVersion::V3, archive.path());
    let installed = install_with(config, trace, &inst);
    assert_eq!(installed.strategy(), Strategy::PluginLoader);

    let valve = HostValve::define(&inst, GreetingService::default()).unwrap();
    assert_eq!(valve.host_module().enhanced_members(), vec!["invoke"]);
    valve.invoke(&request("/hello/linus"), "linus").unwrap();

    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(span_attribute(&spans[0], "component").as_deref(), Some("Tomcat"));

    let loader = installed.loader().unwrap();
    assert_eq!(loader.len(), 1);
    assert_eq!(loader.constructed(), 1);
}

#[test]
fn test_missing_archive_leaves_module_unenhanced() {
    let (exporter, trace) = common::in_memory_trace();
    let inst = Instrumentation::new();
    let config = common::agent_config(
        TransformerVersion::V3,
        Path::new("/nonexistent/intercept-agent-plugins.toml"),
    );

    let (valve, logs) = common::capture_logs(|| {
        install_with(config, trace, &inst);
        HostValve::define(&inst, GreetingService::default()).unwrap()
    });

    assert!(logs.contains("Failed to load the plugin archive"));
    assert!(valve.host_module().enhanced_members().is_empty());
    assert_eq!(valve.invoke(&request("/hello/ada"), "ada").unwrap(), "Hello, ada!");
    assert!(exporter.finished_spans().is_empty());
}

#[test]
fn test_failed_request_marks_span_error() {
    let (exporter, trace) = common::in_memory_trace();
    let inst = Instrumentation::new();
    install_with(
        common::agent_config(TransformerVersion::V1, Path::new("/unused")),
        trace,
        &inst,
    );
    let valve = HostValve::define(&inst, GreetingService::default()).unwrap();

    let long = "x".repeat(100);
    assert!(valve.invoke(&request("/hello/xxx"), &long).is_err());

    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 1);
    assert!(matches!(spans[0].status, Status::Error { .. }));
}

#[test]
fn test_concurrent_requests_get_separate_spans() {
    let (exporter, trace) = common::in_memory_trace();
    let inst = Instrumentation::new();
    install_with(
        common::agent_config(TransformerVersion::V1, Path::new("/unused")),
        trace,
        &inst,
    );
    let valve = Arc::new(HostValve::define(&inst, GreetingService::default()).unwrap());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["alice", "bob"]
        .into_iter()
        .map(|name| {
            let valve = valve.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..50 {
                    valve.invoke(&request(&format!("/hello/{name}")), name).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 100);
    let alice = spans.iter().filter(|s| s.name == "GET /hello/alice").count();
    let bob = spans.iter().filter(|s| s.name == "GET /hello/bob").count();
    assert_eq!((alice, bob), (50, 50));

    for span in &spans {
        assert!(span.start_time <= span.end_time);
        assert_eq!(span.parent_span_id, SpanId::INVALID);
        let target = span_attribute(span, "http.target").unwrap();
        assert_eq!(span.name, format!("GET {target}"));
    }

    let trace_ids: HashSet<_> = spans.iter().map(|s| s.span_context.trace_id()).collect();
    assert_eq!(trace_ids.len(), 100);
}
