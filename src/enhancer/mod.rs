//! Enhancer contract.
//!
//! # Data Flow
//! ```text
//! InterceptionProxy (per call)
//!     → invocation.rs (Invocation: module, member, instance, args, CallScope)
//!     → Enhancer::before_call  → Option<Value> override
//!     → body / override
//!     → Enhancer::on_error     (failure path only)
//!     → Enhancer::after_call   → Option<Value> replacement
//! ```
//!
//! # Design Decisions
//! - One stable trait; every hook has a no-op default so an enhancer opts
//!   into what it needs
//! - An enhancer also describes its own target (module + method matchers)
//! - Hooks return errors instead of unwinding; the proxy treats panics the
//!   same way anyway
//! - Per-call state lives in the `CallScope`, never in thread-locals

pub mod invocation;

use std::any::Any;
use std::fmt;

use crate::matcher::BoxMatcher;

pub use invocation::{CallScope, Failure, Invocation};

/// Dynamically typed value exchanged between hooks and the proxy.
pub type Value = Box<dyn Any + Send>;

/// Error raised by a hook. Never reaches the intercepted caller.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

pub type HookResult<T> = Result<T, HookError>;

/// Pluggable unit of before/after/error behaviour for matched members.
pub trait Enhancer: Send + Sync {
    /// Fully-qualified identity of this enhancer.
    fn name(&self) -> &str;

    /// Modules this enhancer wants to be attached to.
    fn module_matcher(&self) -> Option<BoxMatcher> {
        None
    }

    /// Members (within a matched module) to intercept.
    fn method_matcher(&self) -> Option<BoxMatcher> {
        None
    }

    /// Identity of the enhancer that should actually be attached, when this
    /// object is only an aspect definition pointing elsewhere.
    fn enhancer_ref(&self) -> Option<&str> {
        None
    }

    /// Runs before the body. Returning `Some` skips the body and uses the
    /// value as the call's result.
    fn before_call(&self, call: &Invocation<'_>) -> HookResult<Option<Value>> {
        let _ = call;
        Ok(None)
    }

    /// Runs exactly once after the body (or override), on both paths.
    /// `result` is absent when the call failed. Returning `Some` replaces the
    /// value delivered to the caller.
    fn after_call(&self, call: &Invocation<'_>, result: Option<&dyn Any>) -> HookResult<Option<Value>> {
        let _ = (call, result);
        Ok(None)
    }

    /// Observes a failure of the body. The failure is returned to the caller
    /// regardless of what this hook does.
    fn on_error(&self, call: &Invocation<'_>, failure: &Failure<'_>) -> HookResult<()> {
        let _ = (call, failure);
        Ok(())
    }
}

impl fmt::Debug for dyn Enhancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enhancer").field("name", &self.name()).finish()
    }
}

/// Enhancer with every hook left at its no-op default.
#[derive(Debug, Clone)]
pub struct NoopEnhancer {
    name: String,
}

impl NoopEnhancer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Enhancer for NoopEnhancer {
    fn name(&self) -> &str {
        &self.name
    }
}
