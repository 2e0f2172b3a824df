//! Plugin archive manifest.
//!
//! The archive is a TOML file declaring which plugins the isolated
//! namespace provides, with per-plugin settings:
//!
//! ```toml
//! [[plugin]]
//! name = "intercept_agent::trace::HttpServerEnhancer"
//! version = "1.0.0"
//!
//! [plugin.settings]
//! component = "demo"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::loader::error::ResolveError;

/// Parsed plugin archive.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PluginArchive {
    #[serde(default, rename = "plugin")]
    pub plugins: Vec<PluginEntry>,
}

/// One plugin declared by the archive.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginEntry {
    /// Fully-qualified enhancer identity.
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    /// Settings handed to the plugin's factory.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl PluginArchive {
    /// Read and parse the archive at `path`.
    pub fn open(path: &Path) -> Result<Self, ResolveError> {
        let content = fs::read_to_string(path).map_err(|source| ResolveError::ArchiveIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, ResolveError> {
        toml::from_str(content).map_err(|source| ResolveError::ArchiveParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn entry(&self, name: &str) -> Option<&PluginEntry> {
        self.plugins.iter().find(|p| p.name == name)
    }
}
