//! Host namespaces: the resolution boundaries host modules live in.
//!
//! # Responsibilities
//! - Hold the enhancer factories visible from a boundary
//! - Resolve names parent-first, like a regular host boundary
//! - Give every boundary a unique, stable handle
//!
//! # Design Decisions
//! - Namespaces form a tree rooted at the system namespace
//! - Factories are plain closures; constructing an enhancer never unwinds
//!   into the resolver (panics become `ResolveError::Construction`)

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::enhancer::{Enhancer, HookError};
use crate::loader::error::ResolveError;

/// Free-form settings handed to a factory (from the plugin archive).
pub type Settings = BTreeMap<String, String>;

/// Builds an enhancer instance.
pub type EnhancerFactory =
    Arc<dyn Fn(&Settings) -> Result<Arc<dyn Enhancer>, HookError> + Send + Sync>;

static NEXT_NAMESPACE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_namespace_id() -> u64 {
    NEXT_NAMESPACE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Named table of enhancer factories.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: RwLock<HashMap<String, EnhancerFactory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Settings) -> Result<Arc<dyn Enhancer>, HookError> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(enhancer = %name, "Registering enhancer factory");
        self.factories
            .write()
            .expect("factory registry lock poisoned")
            .insert(name, Arc::new(factory));
    }

    pub fn get(&self, name: &str) -> Option<EnhancerFactory> {
        self.factories
            .read()
            .expect("factory registry lock poisoned")
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .expect("factory registry lock poisoned")
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .expect("factory registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Run a factory, turning errors and panics into `ResolveError`.
pub(crate) fn construct(
    name: &str,
    factory: &EnhancerFactory,
    settings: &Settings,
) -> Result<Arc<dyn Enhancer>, ResolveError> {
    match panic::catch_unwind(AssertUnwindSafe(|| factory(settings))) {
        Ok(Ok(enhancer)) => Ok(enhancer),
        Ok(Err(e)) => Err(ResolveError::Construction {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(ResolveError::Construction {
            name: name.to_string(),
            reason: "factory panicked".to_string(),
        }),
    }
}

/// A host resolution boundary.
pub struct HostNamespace {
    id: u64,
    name: String,
    parent: Option<Arc<HostNamespace>>,
    factories: FactoryRegistry,
}

impl HostNamespace {
    /// A new root (system) namespace.
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            id: next_namespace_id(),
            name: "system".to_string(),
            parent: None,
            factories: FactoryRegistry::new(),
        })
    }

    /// A namespace delegating to `parent`.
    pub fn child(parent: &Arc<Self>, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: next_namespace_id(),
            name: name.into(),
            parent: Some(parent.clone()),
            factories: FactoryRegistry::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique handle used in cache keys and logs.
    pub fn handle(&self) -> String {
        format!("{}#{:x}", self.name, self.id)
    }

    pub fn parent(&self) -> Option<&Arc<HostNamespace>> {
        self.parent.as_ref()
    }

    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Settings) -> Result<Arc<dyn Enhancer>, HookError> + Send + Sync + 'static,
    {
        self.factories.register(name, factory);
    }

    /// Parent-first lookup of a factory.
    pub fn find(&self, name: &str) -> Option<EnhancerFactory> {
        self.parent
            .as_ref()
            .and_then(|p| p.find(name))
            .or_else(|| self.factories.get(name))
    }

    /// Construct a fresh instance of `name` as seen from this boundary.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Enhancer>, ResolveError> {
        match self.find(name) {
            Some(factory) => construct(name, &factory, &Settings::new()),
            None => Err(ResolveError::NotFound {
                name: name.to_string(),
                namespace: self.handle(),
            }),
        }
    }
}

impl fmt::Debug for HostNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostNamespace")
            .field("handle", &self.handle())
            .field("parent", &self.parent.as_ref().map(|p| p.handle()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancer::NoopEnhancer;

    fn noop(name: &'static str) -> impl Fn(&Settings) -> Result<Arc<dyn Enhancer>, HookError> {
        move |_| Ok(Arc::new(NoopEnhancer::new(name)) as Arc<dyn Enhancer>)
    }

    #[test]
    fn test_parent_first_resolution() {
        let root = HostNamespace::root();
        let app = HostNamespace::child(&root, "app");

        root.register("shared", noop("from-root"));
        app.register("shared", noop("from-app"));
        app.register("local", noop("local"));

        assert_eq!(app.resolve("shared").unwrap().name(), "from-root");
        assert_eq!(app.resolve("local").unwrap().name(), "local");
        assert!(root.resolve("local").unwrap_err().is_not_found());
    }

    #[test]
    fn test_unique_handles() {
        let root = HostNamespace::root();
        let a = HostNamespace::child(&root, "app");
        let b = HostNamespace::child(&root, "app");
        assert_ne!(a.handle(), b.handle());
        assert_eq!(a.parent().map(|p| p.id()), Some(root.id()));
    }

    #[test]
    fn test_construction_failures() {
        let root = HostNamespace::root();
        root.register("broken", |_: &Settings| Err("no config".into()));
        root.register("panicky", |_: &Settings| -> Result<Arc<dyn Enhancer>, HookError> {
            panic!("constructor exploded")
        });

        assert!(matches!(
            root.resolve("broken"),
            Err(ResolveError::Construction { .. })
        ));
        assert!(matches!(
            root.resolve("panicky"),
            Err(ResolveError::Construction { .. })
        ));
    }
}
