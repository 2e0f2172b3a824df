//! The interception proxy.
//!
//! # States (per invocation)
//! ```text
//! Entered → BeforeRan → BodyRan | BodySkipped → AfterRan → Exited
//! ```
//!
//! # Failure Isolation
//! - A failing hook (error or panic) is logged and counted, never propagated
//! - `on_error` runs only when the body failed, before `after_call`
//! - `after_call` runs exactly once, on both paths
//! - The body's error is returned as the very same value; a body panic is
//!   resumed with its original payload after the hooks ran

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::enhancer::{Enhancer, Failure, HookResult, Invocation};
use crate::matcher::{Describe, MemberDescriptor, ModuleDescriptor};
use crate::observability::metrics;

/// Lifecycle position of a single intercepted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Entered,
    BeforeRan,
    BodyRan,
    BodySkipped,
    AfterRan,
    Exited,
}

/// Hook identifiers used in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    BeforeCall,
    AfterCall,
    OnError,
}

impl Hook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::BeforeCall => "before_call",
            Hook::AfterCall => "after_call",
            Hook::OnError => "on_error",
        }
    }
}

enum Outcome<R, E> {
    Returned(R),
    Failed(E),
    Panicked(Box<dyn Any + Send>),
}

/// Generic wrapper run in place of an intercepted member.
#[derive(Clone)]
pub struct InterceptionProxy {
    enhancer: Arc<dyn Enhancer>,
}

impl InterceptionProxy {
    pub fn new(enhancer: Arc<dyn Enhancer>) -> Self {
        Self { enhancer }
    }

    pub fn enhancer(&self) -> &Arc<dyn Enhancer> {
        &self.enhancer
    }

    /// Run `body` with the enhancer's hooks around it.
    pub fn invoke<R, E, F>(
        &self,
        module: &ModuleDescriptor,
        member: &MemberDescriptor,
        instance: Option<&dyn Any>,
        args: &[&dyn Any],
        body: F,
    ) -> Result<R, E>
    where
        R: Any,
        E: fmt::Display + Any,
        F: FnOnce() -> Result<R, E>,
    {
        let call = Invocation::new(module, member, instance, args);
        metrics::record_intercepted_call(module.name());
        self.trace_phase(&call, Phase::Entered);

        let override_value = self
            .run_hook(&call, Hook::BeforeCall, || self.enhancer.before_call(&call))
            .flatten()
            .and_then(|value| match value.downcast::<R>() {
                Ok(r) => Some(*r),
                Err(_) => {
                    self.report_type_mismatch(&call, Hook::BeforeCall, std::any::type_name::<R>());
                    None
                }
            });
        self.trace_phase(&call, Phase::BeforeRan);

        let outcome = match override_value {
            Some(r) => {
                self.trace_phase(&call, Phase::BodySkipped);
                Outcome::Returned(r)
            }
            None => {
                let outcome = match panic::catch_unwind(AssertUnwindSafe(body)) {
                    Ok(Ok(r)) => Outcome::Returned(r),
                    Ok(Err(e)) => Outcome::Failed(e),
                    Err(payload) => Outcome::Panicked(payload),
                };
                self.trace_phase(&call, Phase::BodyRan);
                outcome
            }
        };

        let failure = match &outcome {
            Outcome::Returned(_) => None,
            Outcome::Failed(e) => Some(Failure::from_error(e)),
            Outcome::Panicked(payload) => Some(Failure::from_panic(payload.as_ref())),
        };
        if let Some(failure) = &failure {
            self.run_hook(&call, Hook::OnError, || self.enhancer.on_error(&call, failure));
        }
        drop(failure);

        let result_view: Option<&dyn Any> = match &outcome {
            Outcome::Returned(r) => Some(r),
            _ => None,
        };
        let replacement = self
            .run_hook(&call, Hook::AfterCall, || self.enhancer.after_call(&call, result_view))
            .flatten();
        self.trace_phase(&call, Phase::AfterRan);

        let outcome = match (outcome, replacement) {
            (Outcome::Returned(original), Some(value)) => match value.downcast::<R>() {
                Ok(r) => Outcome::Returned(*r),
                Err(_) => {
                    self.report_type_mismatch(&call, Hook::AfterCall, std::any::type_name::<R>());
                    Outcome::Returned(original)
                }
            },
            (outcome, _) => outcome,
        };

        self.trace_phase(&call, Phase::Exited);
        // Anything a hook left behind (an unfinished span) is released here.
        drop(call.into_scope());

        match outcome {
            Outcome::Returned(r) => Ok(r),
            Outcome::Failed(e) => Err(e),
            Outcome::Panicked(payload) => panic::resume_unwind(payload),
        }
    }

    fn run_hook<T>(
        &self,
        call: &Invocation<'_>,
        hook: Hook,
        f: impl FnOnce() -> HookResult<T>,
    ) -> Option<T> {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                self.report_hook_failure(call, hook, &e.to_string());
                None
            }
            Err(payload) => {
                let failure = Failure::from_panic(payload.as_ref());
                self.report_hook_failure(call, hook, failure.message());
                None
            }
        }
    }

    fn report_hook_failure(&self, call: &Invocation<'_>, hook: Hook, msg: &str) {
        tracing::error!(
            enhancer = %self.enhancer.name(),
            module = %call.module(),
            member = %call.member(),
            hook = hook.as_str(),
            error = %msg,
            "Interception proxy hook failed"
        );
        metrics::record_hook_failure(hook.as_str());
    }

    fn report_type_mismatch(&self, call: &Invocation<'_>, hook: Hook, expected: &'static str) {
        tracing::error!(
            enhancer = %self.enhancer.name(),
            module = %call.module(),
            member = %call.member(),
            hook = hook.as_str(),
            expected,
            "Hook produced a value of the wrong type, ignoring it"
        );
        metrics::record_hook_failure(hook.as_str());
    }

    fn trace_phase(&self, call: &Invocation<'_>, phase: Phase) {
        tracing::trace!(
            module = %call.module(),
            member = %call.member(),
            phase = ?phase,
            "Interception phase"
        );
    }
}

impl fmt::Debug for InterceptionProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionProxy")
            .field("enhancer", &self.enhancer.name())
            .finish()
    }
}
