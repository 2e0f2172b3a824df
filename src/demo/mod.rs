//! Minimal demo host used to exercise the agent end to end.
//!
//! # Data Flow
//! ```text
//! GET /hello/{name}
//!     → server.rs hello handler (builds a ServerRequest)
//!     → HostValve::invoke → CallSlot::call
//!         → (installed proxy → enhancer hooks)
//!         → GreetingService::greet
//! ```

pub mod server;
pub mod valve;

pub use server::{router, serve, serve_with_shutdown, AppState};
pub use valve::{DemoError, GreetingService, HostValve, HOST_VALVE_MODULE, INVOKE_MEMBER};
