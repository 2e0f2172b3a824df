//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity of the built-in request-tracing enhancer.
pub const HTTP_SERVER_ENHANCER: &str = "intercept_agent::trace::HttpServerEnhancer";

/// Root configuration of the agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Which resolution strategy installs enhancers.
    pub transformer: TransformerConfig,

    /// Plugin archive and aspect table.
    pub plugins: PluginsConfig,

    /// Modules the agent never looks at.
    pub ignore: IgnoreConfig,

    /// Span pipeline.
    pub trace: TraceConfig,

    pub logging: LoggingConfig,

    pub metrics: MetricsConfig,
}

/// Transformer selection.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TransformerConfig {
    pub version: TransformerVersion,
}

/// `v1` (direct instance), `v2` (target namespace), `v3` (plugin loader).
///
/// Unknown strings are kept so the installer can warn about them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum TransformerVersion {
    #[default]
    V1,
    V2,
    V3,
    Unknown(String),
}

impl From<String> for TransformerVersion {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "v1" => Self::V1,
            "v2" => Self::V2,
            "v3" => Self::V3,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<TransformerVersion> for String {
    fn from(version: TransformerVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for TransformerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("v1"),
            Self::V2 => f.write_str("v2"),
            Self::V3 => f.write_str("v3"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Plugin archive location and the aspects resolved through it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// TOML manifest of the plugins the isolated namespace provides.
    pub archive_path: PathBuf,

    /// Target module → enhancer identity (used by v2 and v3).
    pub aspects: Vec<AspectConfig>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            archive_path: PathBuf::from("/tmp/intercept-agent-plugins.toml"),
            aspects: vec![AspectConfig::default()],
        }
    }
}

/// One aspect: which enhancer to attach to which module.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AspectConfig {
    pub module: String,
    pub enhancer: String,
}

impl Default for AspectConfig {
    fn default() -> Self {
        Self {
            module: "demo::HostValve".to_string(),
            enhancer: HTTP_SERVER_ENHANCER.to_string(),
        }
    }
}

/// Ignore rules applied before any other matching.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IgnoreConfig {
    pub prefixes: Vec<String>,
    pub contains: Vec<String>,

    /// Ignore synthetic modules.
    pub synthetic: bool,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            prefixes: vec![
                "intercept_agent::".to_string(),
                "std::".to_string(),
                "core::".to_string(),
                "alloc::".to_string(),
                "tracing::".to_string(),
            ],
            contains: vec!["::__private::".to_string()],
            synthetic: true,
        }
    }
}

/// Span pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TraceConfig {
    pub exporter: ExporterKind,
    pub processor: ProcessorKind,
    pub propagator: PropagatorKind,

    /// Instrumentation scope reported on every span.
    pub scope_name: String,
    pub scope_version: Option<String>,

    /// Register the trace context as the process global.
    pub register_global: bool,

    /// Component tag set by the HTTP server enhancer.
    pub component: String,

    pub batch: BatchConfig,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            exporter: ExporterKind::Logging,
            processor: ProcessorKind::Batch,
            propagator: PropagatorKind::TraceContext,
            scope_name: "intercept-agent".to_string(),
            scope_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            register_global: true,
            component: "demo".to_string(),
            batch: BatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    Logging,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Simple,
    Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropagatorKind {
    #[serde(alias = "w3c")]
    TraceContext,
    None,
}

/// Batch span processor tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Spans buffered before new ones are dropped.
    pub max_queue_size: usize,

    pub max_export_batch_size: usize,

    /// Delay between two scheduled exports in milliseconds.
    pub scheduled_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            max_export_batch_size: 512,
            scheduled_delay_ms: 5000,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "intercept_agent=info,tower_http=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:9100".to_string(),
        }
    }
}

impl MetricsConfig {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.bind_address.parse().ok()
    }
}
