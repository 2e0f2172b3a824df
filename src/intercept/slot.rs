//! Call slots: the install point of an interception proxy.
//!
//! # Responsibilities
//! - Route one member's invocations through its proxy, when one is installed
//! - Let the transformer install or replace the proxy at any time
//!
//! # Design Decisions
//! - Lock-free read on every call (arc-swap)
//! - An empty slot calls the body directly, with no hook overhead

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::intercept::proxy::InterceptionProxy;
use crate::matcher::{MemberDescriptor, ModuleDescriptor};

/// The routed entry point of a single module member.
pub struct CallSlot {
    module: Arc<ModuleDescriptor>,
    member: MemberDescriptor,
    proxy: ArcSwapOption<InterceptionProxy>,
}

impl CallSlot {
    pub fn new(module: Arc<ModuleDescriptor>, member: MemberDescriptor) -> Self {
        Self {
            module,
            member,
            proxy: ArcSwapOption::empty(),
        }
    }

    pub fn module(&self) -> &ModuleDescriptor {
        &self.module
    }

    pub fn member(&self) -> &MemberDescriptor {
        &self.member
    }

    /// Invoke the member body through the installed proxy, if any.
    pub fn call<R, E, F>(&self, instance: Option<&dyn Any>, args: &[&dyn Any], body: F) -> Result<R, E>
    where
        R: Any,
        E: fmt::Display + Any,
        F: FnOnce() -> Result<R, E>,
    {
        match self.proxy.load_full() {
            Some(proxy) => proxy.invoke(&self.module, &self.member, instance, args, body),
            None => body(),
        }
    }

    /// Install a proxy. Returns true if a previous proxy was replaced.
    pub fn install(&self, proxy: InterceptionProxy) -> bool {
        let previous = self.proxy.swap(Some(Arc::new(proxy)));
        if let Some(previous) = &previous {
            tracing::debug!(
                module = %self.module,
                member = %self.member,
                previous = %previous.enhancer().name(),
                "Replacing installed interception proxy"
            );
        }
        previous.is_some()
    }

    /// Remove the installed proxy, restoring the original behaviour.
    pub fn uninstall(&self) -> bool {
        self.proxy.swap(None).is_some()
    }

    pub fn is_enhanced(&self) -> bool {
        self.proxy.load().is_some()
    }

    /// Name of the enhancer currently attached.
    pub fn enhancer_name(&self) -> Option<String> {
        self.proxy
            .load_full()
            .map(|p| p.enhancer().name().to_string())
    }
}

impl fmt::Debug for CallSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSlot")
            .field("module", &self.module.to_string())
            .field("member", &self.member.to_string())
            .field("enhancer", &self.enhancer_name())
            .finish()
    }
}
