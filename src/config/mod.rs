//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! agent argument (raw TOML string) or config file
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//!     → agent::install builds the transformer, loader and trace context
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the agent is installed once
//! - All fields have defaults so an empty argument is a valid config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AgentConfig, AspectConfig, ExporterKind, IgnoreConfig, LogFormat, LoggingConfig, MetricsConfig,
    PluginsConfig, ProcessorKind, PropagatorKind, TraceConfig, TransformerVersion, HTTP_SERVER_ENHANCER,
};
pub use validation::{validate_config, ValidationError};
