//! Lifecycle listener.
//!
//! Per presented module the agent emits, in order:
//! ```text
//! on_discovery → (on_ignored | on_transformation* | on_error*) → on_complete
//! ```

use crate::intercept::Module;
use crate::transformer::{TransformError, Transformation};

/// Observes the agent's decisions. Every event defaults to a trace log.
pub trait Listener: Send + Sync {
    fn on_discovery(&self, module: &Module, loaded: bool) {
        tracing::trace!(
            module = %module.name(),
            namespace = %module.namespace().handle(),
            loaded,
            "Discovered module"
        );
    }

    fn on_transformation(&self, module: &Module, loaded: bool, transformation: &Transformation) {
        tracing::trace!(
            module = %module.name(),
            namespace = %module.namespace().handle(),
            loaded,
            enhancer = %transformation.enhancer,
            members = ?transformation.installed,
            "Transformed module"
        );
    }

    fn on_ignored(&self, module: &Module, loaded: bool) {
        tracing::trace!(
            module = %module.name(),
            namespace = %module.namespace().handle(),
            loaded,
            "Ignored module"
        );
    }

    fn on_error(&self, module: &Module, loaded: bool, error: &TransformError) {
        tracing::trace!(
            module = %module.name(),
            namespace = %module.namespace().handle(),
            loaded,
            error = %error,
            "Error while transforming module"
        );
    }

    fn on_complete(&self, module: &Module, loaded: bool) {
        tracing::trace!(
            module = %module.name(),
            namespace = %module.namespace().handle(),
            loaded,
            "Completed module"
        );
    }
}

/// The default listener: logs every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl Listener for LoggingListener {}
