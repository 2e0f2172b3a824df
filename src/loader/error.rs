//! Enhancer resolution errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving an enhancer.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No namespace on the lookup path provides the name.
    #[error("enhancer `{name}` not found from namespace {namespace}")]
    NotFound { name: String, namespace: String },

    /// The factory failed or panicked.
    #[error("enhancer `{name}` could not be constructed: {reason}")]
    Construction { name: String, reason: String },

    /// The plugin archive is missing or unreadable.
    #[error("failed to read plugin archive {}: {source}", path.display())]
    ArchiveIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The plugin archive is not a valid manifest.
    #[error("failed to parse plugin archive {}: {source}", path.display())]
    ArchiveParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}
