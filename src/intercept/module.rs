//! Host modules as seen by the agent.

use std::fmt;
use std::sync::Arc;

use crate::intercept::slot::CallSlot;
use crate::loader::HostNamespace;
use crate::matcher::{Describe, MemberDescriptor, ModuleDescriptor};

/// A loadable unit of host code: a descriptor, the namespace it was
/// resolved in, and one call slot per member.
pub struct Module {
    descriptor: Arc<ModuleDescriptor>,
    namespace: Arc<HostNamespace>,
    slots: Vec<Arc<CallSlot>>,
}

impl Module {
    pub fn builder(descriptor: ModuleDescriptor, namespace: Arc<HostNamespace>) -> ModuleBuilder {
        ModuleBuilder {
            descriptor: Arc::new(descriptor),
            namespace,
            members: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn namespace(&self) -> &Arc<HostNamespace> {
        &self.namespace
    }

    pub fn slots(&self) -> &[Arc<CallSlot>] {
        &self.slots
    }

    /// Slot of the first member with the given name.
    pub fn slot(&self, member: &str) -> Option<Arc<CallSlot>> {
        self.slots
            .iter()
            .find(|s| s.member().name() == member)
            .cloned()
    }

    /// Names of the members that currently have a proxy installed.
    pub fn enhanced_members(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|s| s.is_enhanced())
            .map(|s| s.member().name().to_string())
            .collect()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name())
            .field("namespace", &self.namespace.handle())
            .field("members", &self.slots.len())
            .finish()
    }
}

/// Declares the members of a module before it is defined.
pub struct ModuleBuilder {
    descriptor: Arc<ModuleDescriptor>,
    namespace: Arc<HostNamespace>,
    members: Vec<MemberDescriptor>,
}

impl ModuleBuilder {
    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    pub fn build(self) -> Module {
        let slots = self
            .members
            .into_iter()
            .map(|m| Arc::new(CallSlot::new(self.descriptor.clone(), m)))
            .collect();
        Module {
            descriptor: self.descriptor,
            namespace: self.namespace,
            slots,
        }
    }
}
