//! `v2`: the enhancer identity is resolved inside the target module's own
//! host namespace (parent-first). Each transformed module gets a fresh
//! instance.

use std::sync::Arc;

use crate::enhancer::Enhancer;
use crate::intercept::Module;
use crate::transformer::{Strategy, TransformError, Transformer};

#[derive(Debug, Clone)]
pub struct NamespaceTransformer {
    enhancer: String,
}

impl NamespaceTransformer {
    pub fn new(enhancer: impl Into<String>) -> Self {
        Self {
            enhancer: enhancer.into(),
        }
    }
}

impl Transformer for NamespaceTransformer {
    fn strategy(&self) -> Strategy {
        Strategy::TargetNamespace
    }

    fn resolve(&self, module: &Module) -> Result<Arc<dyn Enhancer>, TransformError> {
        tracing::debug!(
            enhancer = %self.enhancer,
            namespace = %module.namespace().handle(),
            "Resolving enhancer in the target namespace"
        );
        Ok(module.namespace().resolve(&self.enhancer)?)
    }
}
