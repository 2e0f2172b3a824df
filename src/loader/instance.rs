//! Enhancer instance cache.
//!
//! # Responsibilities
//! - Keep one plugin namespace per host namespace
//! - Keep one enhancer instance per (enhancer identity, namespace)
//!
//! # Locking
//! ```text
//! load(name, host)
//!     → instances.get(key)               lock-free fast path (DashMap read)
//!     → namespaces mutex                 get or create the plugin namespace
//!     → build mutex                      re-check key, construct, insert
//! ```
//!
//! # Design Decisions
//! - Construction happens at most once per key, even under concurrent first
//!   use; the build mutex is never taken once the key is cached
//! - Entries are never evicted
//! - The loader is an explicit value owned by the agent, not a global

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use crate::enhancer::Enhancer;
use crate::loader::error::ResolveError;
use crate::loader::namespace::{FactoryRegistry, HostNamespace};
use crate::loader::plugin::PluginNamespace;
use crate::observability::metrics;

/// Resolves enhancers through isolated plugin namespaces and caches them.
pub struct EnhancerLoader {
    archive_path: PathBuf,
    catalog: Arc<FactoryRegistry>,
    root: Arc<HostNamespace>,
    namespaces: Mutex<HashMap<u64, Arc<PluginNamespace>>>,
    instances: DashMap<String, Arc<dyn Enhancer>>,
    build_lock: Mutex<()>,
    constructed: AtomicUsize,
}

impl EnhancerLoader {
    /// `root` is used when a lookup has no target namespace.
    pub fn new(archive_path: impl Into<PathBuf>, catalog: Arc<FactoryRegistry>, root: Arc<HostNamespace>) -> Self {
        Self {
            archive_path: archive_path.into(),
            catalog,
            root,
            namespaces: Mutex::new(HashMap::new()),
            instances: DashMap::new(),
            build_lock: Mutex::new(()),
            constructed: AtomicUsize::new(0),
        }
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn catalog(&self) -> &Arc<FactoryRegistry> {
        &self.catalog
    }

    /// Cache key of `name` resolved for `host`.
    pub fn instance_key(name: &str, host: &HostNamespace) -> String {
        format!("{}@{}", name, host.handle())
    }

    /// The plugin namespace layered over `host`, created on first use.
    pub fn plugin_namespace(&self, host: &Arc<HostNamespace>) -> Arc<PluginNamespace> {
        let mut namespaces = self.namespaces.lock().unwrap_or_else(PoisonError::into_inner);
        namespaces
            .entry(host.id())
            .or_insert_with(|| {
                tracing::debug!(host = %host.handle(), "Creating plugin namespace");
                Arc::new(PluginNamespace::new(
                    host.clone(),
                    self.archive_path.clone(),
                    self.catalog.clone(),
                ))
            })
            .clone()
    }

    /// Resolve `name` for the `target` host namespace (root when absent),
    /// constructing it at most once.
    pub fn load(&self, name: &str, target: Option<&Arc<HostNamespace>>) -> Result<Arc<dyn Enhancer>, ResolveError> {
        let target = target.unwrap_or(&self.root);
        let key = Self::instance_key(name, target);

        if let Some(instance) = self.instances.get(&key) {
            return Ok(instance.value().clone());
        }

        let namespace = self.plugin_namespace(target);

        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(instance) = self.instances.get(&key) {
            return Ok(instance.value().clone());
        }

        let instance = namespace.resolve(name)?;
        self.instances.insert(key.clone(), instance.clone());
        self.constructed.fetch_add(1, Ordering::SeqCst);
        metrics::record_enhancer_instances(self.instances.len());
        tracing::info!(enhancer = %name, key = %key, "Enhancer instance cached");
        Ok(instance)
    }

    /// Number of cached instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Total successful constructions since creation.
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for EnhancerLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhancerLoader")
            .field("archive_path", &self.archive_path)
            .field("instances", &self.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancer::{HookError, NoopEnhancer};
    use crate::loader::namespace::Settings;
    use std::io::Write;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn setup(archive: &str) -> (tempfile::NamedTempFile, Arc<AtomicUsize>, EnhancerLoader) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(archive.as_bytes()).unwrap();

        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let catalog = Arc::new(FactoryRegistry::new());
        catalog.register("x::Slow", move |_: &Settings| -> Result<Arc<dyn Enhancer>, HookError> {
            counter.fetch_add(1, Ordering::SeqCst);
            // Widen the race window.
            thread::sleep(Duration::from_millis(20));
            Ok(Arc::new(NoopEnhancer::new("x::Slow")))
        });

        let loader = EnhancerLoader::new(file.path(), catalog, HostNamespace::root());
        (file, builds, loader)
    }

    #[test]
    fn test_concurrent_first_use_builds_once() {
        let (_file, builds, loader) = setup("[[plugin]]\nname = \"x::Slow\"\n");
        let loader = Arc::new(loader);
        let host = HostNamespace::root();
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let loader = loader.clone();
                let host = host.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let instance = loader.load("x::Slow", Some(&host)).unwrap();
                    Arc::as_ptr(&instance) as *const () as usize
                })
            })
            .collect();

        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(loader.constructed(), 1);
        assert!(addresses.iter().all(|a| *a == addresses[0]));
    }

    #[test]
    fn test_instances_keyed_by_namespace() {
        let (_file, builds, loader) = setup("[[plugin]]\nname = \"x::Slow\"\n");
        let root = HostNamespace::root();
        let a = HostNamespace::child(&root, "a");
        let b = HostNamespace::child(&root, "b");

        let first = loader.load("x::Slow", Some(&a)).unwrap();
        let again = loader.load("x::Slow", Some(&a)).unwrap();
        let other = loader.load("x::Slow", Some(&b)).unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(loader.len(), 2);
    }

    #[test]
    fn test_one_plugin_namespace_per_host() {
        let (_file, _builds, loader) = setup("");
        let root = HostNamespace::root();
        let a = HostNamespace::child(&root, "a");
        let b = HostNamespace::child(&root, "b");

        assert_eq!(loader.plugin_namespace(&a).id(), loader.plugin_namespace(&a).id());
        assert_ne!(loader.plugin_namespace(&a).id(), loader.plugin_namespace(&b).id());
    }

    #[test]
    fn test_failed_resolution_is_not_cached() {
        let (_file, builds, loader) = setup("");
        assert!(loader.load("x::Slow", None).is_err());
        assert!(loader.is_empty());
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }
}
