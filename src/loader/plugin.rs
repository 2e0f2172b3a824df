//! Isolated plugin namespaces.
//!
//! # Resolution Order (child-first)
//! ```text
//! resolve(name)
//!     → plugin archive declares name?  → build from the plugin catalog
//!     → otherwise                      → parent host namespace (parent-first)
//! ```
//!
//! # Design Decisions
//! - Plugin code shadows host code of the same name
//! - The archive is read on first use; a failed read is retried on the next
//!   resolution
//! - When neither side provides the name and the archive could not be
//!   read, the archive failure is what gets reported

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::enhancer::Enhancer;
use crate::loader::archive::PluginArchive;
use crate::loader::error::ResolveError;
use crate::loader::namespace::{construct, next_namespace_id, FactoryRegistry, HostNamespace};

/// Isolated namespace layered over one host namespace.
pub struct PluginNamespace {
    id: u64,
    parent: Arc<HostNamespace>,
    archive_path: PathBuf,
    catalog: Arc<FactoryRegistry>,
    archive: Mutex<Option<Arc<PluginArchive>>>,
}

impl PluginNamespace {
    pub fn new(parent: Arc<HostNamespace>, archive_path: PathBuf, catalog: Arc<FactoryRegistry>) -> Self {
        Self {
            id: next_namespace_id(),
            parent,
            archive_path,
            catalog,
            archive: Mutex::new(None),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn parent(&self) -> &Arc<HostNamespace> {
        &self.parent
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn handle(&self) -> String {
        format!("plugins[{}]#{:x}", self.parent.handle(), self.id)
    }

    fn archive(&self) -> Result<Arc<PluginArchive>, ResolveError> {
        let mut slot = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(archive) = slot.as_ref() {
            return Ok(archive.clone());
        }

        match PluginArchive::open(&self.archive_path) {
            Ok(archive) => {
                tracing::info!(
                    path = %self.archive_path.display(),
                    plugins = archive.plugins.len(),
                    namespace = %self.handle(),
                    "Plugin archive loaded"
                );
                let archive = Arc::new(archive);
                *slot = Some(archive.clone());
                Ok(archive)
            }
            Err(e) => {
                tracing::error!(
                    path = %self.archive_path.display(),
                    error = %e,
                    "Failed to load the plugin archive"
                );
                Err(e)
            }
        }
    }

    /// Child-first resolution of `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Enhancer>, ResolveError> {
        let archive_failure = match self.archive() {
            Ok(archive) => {
                if let Some(entry) = archive.entry(name) {
                    match self.catalog.get(name) {
                        Some(factory) => {
                            tracing::debug!(enhancer = %name, namespace = %self.handle(), "Resolved from plugin archive");
                            return construct(name, &factory, &entry.settings);
                        }
                        None => tracing::warn!(
                            enhancer = %name,
                            "Plugin declared by the archive is not linked into the plugin catalog"
                        ),
                    }
                }
                None
            }
            Err(e) => Some(e),
        };

        match self.parent.resolve(name) {
            Ok(enhancer) => Ok(enhancer),
            Err(e) if e.is_not_found() => Err(archive_failure.unwrap_or(e)),
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for PluginNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginNamespace")
            .field("handle", &self.handle())
            .field("archive_path", &self.archive_path)
            .finish()
    }
}
