//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use intercept_agent::config::{AgentConfig, AspectConfig, TransformerVersion, HTTP_SERVER_ENHANCER};
use intercept_agent::intercept::{Instrumentation, Module};
use intercept_agent::matcher::{MemberDescriptor, ModuleDescriptor};
use intercept_agent::trace::{InMemorySpanExporter, TraceContext};
use tempfile::NamedTempFile;

/// Trace context that keeps every finished span in memory.
pub fn in_memory_trace() -> (InMemorySpanExporter, Arc<TraceContext>) {
    let exporter = InMemorySpanExporter::new();
    let trace = TraceContext::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    (exporter, trace)
}

/// A module in the root namespace with one instance member per name.
pub fn module(instrumentation: &Instrumentation, name: &str, members: &[&str]) -> Module {
    let mut builder = Module::builder(
        ModuleDescriptor::new(name),
        instrumentation.root_namespace().clone(),
    );
    for member in members {
        builder = builder.member(MemberDescriptor::new(*member));
    }
    builder.build()
}

/// Write `content` to a temporary plugin archive.
pub fn archive_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp archive");
    file.write_all(content.as_bytes()).expect("write temp archive");
    file
}

/// Archive declaring the built-in HTTP server enhancer.
pub fn http_server_archive(component: &str) -> NamedTempFile {
    archive_file(&format!(
        "[[plugin]]\nname = \"{HTTP_SERVER_ENHANCER}\"\nversion = \"0.1.0\"\n\n[plugin.settings]\ncomponent = \"{component}\"\n"
    ))
}

/// Default configuration for `version` with the archive at `archive_path`.
pub fn agent_config(version: TransformerVersion, archive_path: &Path) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.transformer.version = version;
    config.plugins.archive_path = archive_path.to_path_buf();
    config.plugins.aspects = vec![AspectConfig {
        module: "demo::HostValve".to_string(),
        enhancer: HTTP_SERVER_ENHANCER.to_string(),
    }];
    config.trace.register_global = false;
    config
}

/// Collects formatted log output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a subscriber that writes into the returned buffer.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, buffer.contents())
}
