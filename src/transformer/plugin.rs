//! `v3`: the aspect identity is resolved through the isolated plugin loader
//! and instance cache. An aspect that names a different enhancer through
//! `enhancer_ref` is only a definition; the referenced enhancer is resolved
//! the same way and attached instead.

use std::sync::Arc;

use crate::enhancer::Enhancer;
use crate::intercept::Module;
use crate::loader::EnhancerLoader;
use crate::transformer::{Strategy, TransformError, Transformer};

#[derive(Debug, Clone)]
pub struct PluginTransformer {
    aspect: String,
    loader: Arc<EnhancerLoader>,
}

impl PluginTransformer {
    pub fn new(aspect: impl Into<String>, loader: Arc<EnhancerLoader>) -> Self {
        Self {
            aspect: aspect.into(),
            loader,
        }
    }
}

impl Transformer for PluginTransformer {
    fn strategy(&self) -> Strategy {
        Strategy::PluginLoader
    }

    fn resolve(&self, module: &Module) -> Result<Arc<dyn Enhancer>, TransformError> {
        let target = module.namespace();
        let aspect = self.loader.load(&self.aspect, Some(target))?;

        let reference = aspect.enhancer_ref().map(str::to_string);
        match reference {
            Some(reference) if reference == self.aspect => Err(TransformError::SelfReference {
                aspect: self.aspect.clone(),
            }),
            Some(reference) => {
                tracing::debug!(aspect = %self.aspect, enhancer = %reference, "Following enhancer reference");
                Ok(self.loader.load(&reference, Some(target))?)
            }
            None => Ok(aspect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancer::HookError;
    use crate::loader::{FactoryRegistry, HostNamespace, Settings};
    use crate::matcher::{named, BoxMatcher, MatcherExt, MemberDescriptor, ModuleDescriptor};
    use std::io::Write;

    struct Aspect {
        target: &'static str,
    }

    impl Enhancer for Aspect {
        fn name(&self) -> &str {
            "plugin::Aspect"
        }

        fn enhancer_ref(&self) -> Option<&str> {
            Some(self.target)
        }
    }

    struct Worker;

    impl Enhancer for Worker {
        fn name(&self) -> &str {
            "plugin::Worker"
        }

        fn method_matcher(&self) -> Option<BoxMatcher> {
            Some(named("run").boxed())
        }
    }

    fn loader(archive: &str) -> (tempfile::NamedTempFile, Arc<EnhancerLoader>) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(archive.as_bytes()).unwrap();

        let catalog = Arc::new(FactoryRegistry::new());
        catalog.register("plugin::Aspect", |_: &Settings| -> Result<Arc<dyn Enhancer>, HookError> {
            Ok(Arc::new(Aspect { target: "plugin::Worker" }))
        });
        catalog.register("plugin::Loop", |_: &Settings| -> Result<Arc<dyn Enhancer>, HookError> {
            Ok(Arc::new(Aspect { target: "plugin::Loop" }))
        });
        catalog.register("plugin::Worker", |_: &Settings| -> Result<Arc<dyn Enhancer>, HookError> {
            Ok(Arc::new(Worker))
        });

        let loader = Arc::new(EnhancerLoader::new(file.path(), catalog, HostNamespace::root()));
        (file, loader)
    }

    fn module() -> Module {
        Module::builder(ModuleDescriptor::new("app::Job"), HostNamespace::root())
            .member(MemberDescriptor::new("run"))
            .build()
    }

    #[test]
    fn test_follows_enhancer_reference() {
        let (_file, loader) = loader(
            "[[plugin]]\nname = \"plugin::Aspect\"\n\n[[plugin]]\nname = \"plugin::Worker\"\n",
        );
        let module = module();

        let transformation = PluginTransformer::new("plugin::Aspect", loader.clone())
            .transform(&module)
            .unwrap();
        assert_eq!(transformation.enhancer, "plugin::Worker");
        assert_eq!(transformation.installed, vec!["run"]);
        assert_eq!(loader.len(), 2);
    }

    #[test]
    fn test_self_reference_rejected() {
        let (_file, loader) = loader("[[plugin]]\nname = \"plugin::Loop\"\n");
        let err = PluginTransformer::new("plugin::Loop", loader).resolve(&module()).unwrap_err();
        assert!(matches!(err, TransformError::SelfReference { .. }));
    }

    #[test]
    fn test_undeclared_plugin_fails_open() {
        let (_file, loader) = loader("");
        let module = module();
        assert!(PluginTransformer::new("plugin::Worker", loader).transform(&module).is_err());
        assert!(module.enhanced_members().is_empty());
    }
}
