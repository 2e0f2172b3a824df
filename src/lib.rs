//! Method-interception agent with a request-tracing enhancer.
//!
//! Host code declares its modules to an [`intercept::Instrumentation`]
//! registry and routes member bodies through call slots. The [`agent`]
//! presents every module to its rules, resolves enhancers through one of the
//! [`transformer`] strategies and installs interception proxies. The
//! [`trace`] subsystem supplies the enhancer that opens a server span around
//! every intercepted request dispatch.

// Interception core
pub mod enhancer;
pub mod intercept;
pub mod matcher;

// Resolution and installation
pub mod agent;
pub mod loader;
pub mod transformer;

// Request tracing
pub mod trace;

// Cross-cutting concerns
pub mod config;
pub mod observability;

// Demo host
pub mod demo;

pub use agent::{install, Agent, InstalledAgent};
pub use config::AgentConfig;
pub use intercept::Instrumentation;
