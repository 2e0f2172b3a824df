//! Observability of the agent itself.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, demo binary only)
//! ```
//!
//! Spans produced by instrumented host code are not the agent's own
//! telemetry; they flow through `crate::trace`.

pub mod logging;
pub mod metrics;
