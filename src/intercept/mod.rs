//! Interception subsystem.
//!
//! # Data Flow
//! ```text
//! Host defines a module:
//!     module.rs (ModuleDescriptor + member CallSlots)
//!     → registry.rs (Instrumentation::define)
//!     → LoadHook (the agent) decides what to install
//!     → slot.rs (CallSlot::install swaps in a proxy)
//!
//! Host calls a member:
//!     CallSlot::call
//!     → proxy.rs (InterceptionProxy::invoke runs hooks around the body)
//!     → result / original error back to the caller
//! ```
//!
//! # Design Decisions
//! - Interception is wired at composition time: host code routes each
//!   member body through its slot, and "rewriting" the member means
//!   installing a proxy in that slot
//! - Slots are read lock-free; installation is an atomic swap
//! - Instrumentation is transparent to failures of the original call

pub mod module;
pub mod proxy;
pub mod registry;
pub mod slot;

pub use module::{Module, ModuleBuilder};
pub use proxy::{Hook, InterceptionProxy, Phase};
pub use registry::{Instrumentation, LoadHook};
pub use slot::CallSlot;
