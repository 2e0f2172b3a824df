//! The instrumentation registry (code-modification facility).
//!
//! # Responsibilities
//! - Record every module the host defines
//! - Present each newly defined module to the registered load hooks
//! - Re-present already defined modules to a hook added later
//!   (retransformation)
//!
//! # Design Decisions
//! - Hooks run synchronously on the defining thread
//! - Modules and hooks share one lock: a module defined while a hook is being
//!   added is presented to that hook exactly once, either by `define` or by
//!   retransformation
//! - No lock is held while a hook runs

use std::sync::{Arc, Mutex};

use crate::intercept::module::Module;
use crate::loader::HostNamespace;

/// Receives modules as they are loaded.
pub trait LoadHook: Send + Sync {
    /// `loaded` is true when the module was defined before the hook was
    /// added.
    fn on_load(&self, module: &Module, loaded: bool);
}

#[derive(Default)]
struct Registry {
    modules: Vec<Arc<Module>>,
    hooks: Vec<Arc<dyn LoadHook>>,
}

/// Registry of host modules and load hooks.
pub struct Instrumentation {
    root: Arc<HostNamespace>,
    registry: Mutex<Registry>,
}

impl Instrumentation {
    pub fn new() -> Self {
        Self {
            root: HostNamespace::root(),
            registry: Mutex::new(Registry::default()),
        }
    }

    /// The system namespace every host namespace descends from.
    pub fn root_namespace(&self) -> &Arc<HostNamespace> {
        &self.root
    }

    /// Define (load) a module and present it to every hook.
    pub fn define(&self, module: Module) -> Arc<Module> {
        let module = Arc::new(module);
        let hooks = {
            let mut registry = self.registry.lock().expect("instrumentation registry lock poisoned");
            registry.modules.push(module.clone());
            registry.hooks.clone()
        };

        tracing::debug!(module = %module.name(), hooks = hooks.len(), "Defining module");
        for hook in &hooks {
            hook.on_load(&module, false);
        }
        module
    }

    /// Register a load hook. With `retransform`, every module defined so far
    /// is presented to it immediately.
    pub fn add_hook(&self, hook: Arc<dyn LoadHook>, retransform: bool) {
        let loaded = {
            let mut registry = self.registry.lock().expect("instrumentation registry lock poisoned");
            registry.hooks.push(hook.clone());
            if retransform {
                registry.modules.clone()
            } else {
                Vec::new()
            }
        };

        if retransform {
            tracing::debug!(modules = loaded.len(), "Retransforming loaded modules");
            for module in &loaded {
                hook.on_load(module, true);
            }
        }
    }

    pub fn modules(&self) -> Vec<Arc<Module>> {
        self.registry
            .lock()
            .expect("instrumentation registry lock poisoned")
            .modules
            .clone()
    }

    pub fn module(&self, name: &str) -> Option<Arc<Module>> {
        self.registry
            .lock()
            .expect("instrumentation registry lock poisoned")
            .modules
            .iter()
            .find(|m| m.name() == name)
            .cloned()
    }
}

impl Default for Instrumentation {
    fn default() -> Self {
        Self::new()
    }
}
