//! The agent: decides which modules get which enhancers.
//!
//! # Data Flow
//! ```text
//! install.rs (raw config → rules, trace context, loader)
//!     → builder.rs (AgentBuilder::install_on → Instrumentation hook)
//!
//! Instrumentation presents a module:
//!     Agent::present
//!     → listener.rs on_discovery
//!     → ignore matcher? → on_ignored
//!     → each matching rule → Transformer::transform
//!         → on_transformation | on_error
//!     → on_complete
//! ```

pub mod builder;
pub mod install;
pub mod listener;

pub use builder::{Agent, AgentBuilder, Rule};
pub use install::{ignore_matcher, install, install_with, InstalledAgent};
pub use listener::{Listener, LoggingListener};
