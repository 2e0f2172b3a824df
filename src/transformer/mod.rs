//! Transformers: resolve an enhancer for a module and install it.
//!
//! # Data Flow
//! ```text
//! Agent presents a matched module:
//!     Transformer::resolve(module)
//!         v1 direct.rs     instance given at registration
//!         v2 namespace.rs  identity resolved in the module's HostNamespace
//!         v3 plugin.rs     identity resolved through the EnhancerLoader
//!     → install(): one InterceptionProxy per non-static member selected
//!       by the enhancer's method matcher
//! ```
//!
//! # Design Decisions
//! - Fail open: a resolution error leaves the module untouched
//! - Re-presenting a module replaces its proxies instead of stacking them

pub mod direct;
pub mod namespace;
pub mod plugin;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::enhancer::Enhancer;
use crate::intercept::{InterceptionProxy, Module};
use crate::loader::ResolveError;
use crate::matcher::Describe;
use crate::observability::metrics;

pub use direct::DirectTransformer;
pub use namespace::NamespaceTransformer;
pub use plugin::PluginTransformer;

/// How a transformer finds its enhancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `v1`
    Direct,
    /// `v2`
    TargetNamespace,
    /// `v3`
    PluginLoader,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => f.write_str("v1"),
            Strategy::TargetNamespace => f.write_str("v2"),
            Strategy::PluginLoader => f.write_str("v3"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("aspect '{aspect}' refers to itself through its enhancer reference")]
    SelfReference { aspect: String },
}

/// Result of one successful transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    pub enhancer: String,

    /// Members that now route through the proxy.
    pub installed: Vec<String>,
}

/// Turns a presented module into an enhanced one.
pub trait Transformer: Send + Sync + fmt::Debug {
    fn strategy(&self) -> Strategy;

    fn resolve(&self, module: &Module) -> Result<Arc<dyn Enhancer>, TransformError>;

    fn transform(&self, module: &Module) -> Result<Transformation, TransformError> {
        let enhancer = match self.resolve(module) {
            Ok(enhancer) => enhancer,
            Err(e) => {
                tracing::error!(
                    module = %module.name(),
                    namespace = %module.namespace().handle(),
                    strategy = %self.strategy(),
                    error = %e,
                    "Failed to resolve enhancer, module left untransformed"
                );
                metrics::record_transformation("failed");
                return Err(e);
            }
        };

        let installed = install(module, &enhancer);
        if installed.is_empty() {
            metrics::record_transformation("skipped");
        } else {
            tracing::info!(
                module = %module.name(),
                enhancer = %enhancer.name(),
                strategy = %self.strategy(),
                members = ?installed,
                "Module transformed"
            );
            metrics::record_transformation("installed");
        }

        Ok(Transformation {
            enhancer: enhancer.name().to_string(),
            installed,
        })
    }
}

/// Install `enhancer` on every non-static member of `module` its method
/// matcher selects. Returns the names of the members now intercepted.
pub fn install(module: &Module, enhancer: &Arc<dyn Enhancer>) -> Vec<String> {
    let Some(matcher) = enhancer.method_matcher() else {
        tracing::debug!(
            module = %module.name(),
            enhancer = %enhancer.name(),
            "Enhancer has no method matcher, nothing to install"
        );
        return Vec::new();
    };

    let mut installed = Vec::new();
    for slot in module.slots() {
        let member = slot.member();
        if member.is_static() || !matcher.matches(member) {
            continue;
        }
        slot.install(InterceptionProxy::new(enhancer.clone()));
        installed.push(member.name().to_string());
    }
    installed
}
