//! `v1`: the enhancer instance is supplied at registration.

use std::fmt;
use std::sync::Arc;

use crate::enhancer::Enhancer;
use crate::intercept::Module;
use crate::transformer::{Strategy, TransformError, Transformer};

pub struct DirectTransformer {
    enhancer: Arc<dyn Enhancer>,
}

impl DirectTransformer {
    pub fn new(enhancer: Arc<dyn Enhancer>) -> Self {
        Self { enhancer }
    }
}

impl Transformer for DirectTransformer {
    fn strategy(&self) -> Strategy {
        Strategy::Direct
    }

    fn resolve(&self, _module: &Module) -> Result<Arc<dyn Enhancer>, TransformError> {
        Ok(self.enhancer.clone())
    }
}

impl fmt::Debug for DirectTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectTransformer")
            .field("enhancer", &self.enhancer.name())
            .finish()
    }
}
