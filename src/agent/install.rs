//! Agent entrypoint.
//!
//! # Install Sequence
//! ```text
//! raw TOML argument
//!     → config::parse_config (invalid → defaults, logged)
//!     → TraceContext::from_config (registered as global when asked)
//!     → transformer.version selects the strategy:
//!         v1  HttpServerEnhancer instance per aspect       → DirectTransformer
//!         v2  factory registered in the root namespace     → NamespaceTransformer
//!         v3  factory registered in the plugin catalog     → PluginTransformer
//!     → AgentBuilder::install_on (retransforms loaded modules)
//! ```

use std::fmt;
use std::sync::Arc;

use opentelemetry::trace::TraceResult;

use crate::agent::builder::{Agent, AgentBuilder};
use crate::config::{self, AgentConfig, IgnoreConfig, TransformerVersion, HTTP_SERVER_ENHANCER};
use crate::enhancer::{Enhancer, HookError};
use crate::intercept::Instrumentation;
use crate::loader::{EnhancerLoader, FactoryRegistry, Settings};
use crate::matcher::{is_interface, is_synthetic, name_contains, name_starts_with, named, BoxMatcher, MatcherExt, OrMatcher};
use crate::trace::enhancer::DEFAULT_TARGET_METHOD;
use crate::trace::{HttpServerEnhancer, TraceContext};
use crate::transformer::{DirectTransformer, NamespaceTransformer, PluginTransformer, Strategy};

/// Everything `install` set up.
pub struct InstalledAgent {
    agent: Arc<Agent>,
    config: AgentConfig,
    strategy: Strategy,
    trace: Arc<TraceContext>,
    loader: Option<Arc<EnhancerLoader>>,
}

impl InstalledAgent {
    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn trace(&self) -> &Arc<TraceContext> {
        &self.trace
    }

    /// The plugin loader (`v3` only).
    pub fn loader(&self) -> Option<&Arc<EnhancerLoader>> {
        self.loader.as_ref()
    }

    /// Flush pending spans and release the global tracer provider.
    pub fn shutdown(&self) -> TraceResult<()> {
        self.trace.shutdown()
    }
}

impl fmt::Debug for InstalledAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstalledAgent")
            .field("strategy", &self.strategy)
            .field("agent", &self.agent)
            .field("loader", &self.loader)
            .finish()
    }
}

/// Install the agent described by the raw TOML `raw_config`.
pub fn install(raw_config: &str, instrumentation: &Instrumentation) -> InstalledAgent {
    let config = match config::parse_config(raw_config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid agent configuration, using defaults");
            AgentConfig::default()
        }
    };
    if let Err(errors) = config::validate_config(&config) {
        for error in &errors {
            tracing::warn!(error = %error, "Agent configuration problem");
        }
    }

    let trace = TraceContext::from_config(&config.trace);
    if config.trace.register_global && !TraceContext::set_global(trace.clone()) {
        tracing::debug!("A global trace context is already registered, keeping it");
    }

    install_with(config, trace, instrumentation)
}

/// Install with an already-built trace context.
pub fn install_with(config: AgentConfig, trace: Arc<TraceContext>, instrumentation: &Instrumentation) -> InstalledAgent {
    tracing::info!("The agent starts to load");

    let strategy = match &config.transformer.version {
        TransformerVersion::V1 => Strategy::Direct,
        TransformerVersion::V2 => Strategy::TargetNamespace,
        TransformerVersion::V3 => Strategy::PluginLoader,
        TransformerVersion::Unknown(raw) => {
            tracing::warn!(version = %raw, "Unrecognized transformer version, falling back to v1");
            Strategy::Direct
        }
    };
    tracing::info!(strategy = %strategy, "Loading transformer");

    let mut builder = AgentBuilder::new().ignore(ignore_matcher(&config.ignore));
    let mut loader = None;
    let component = config.trace.component.clone();

    match strategy {
        Strategy::Direct => {
            for aspect in &config.plugins.aspects {
                if aspect.enhancer != HTTP_SERVER_ENHANCER {
                    tracing::warn!(
                        enhancer = %aspect.enhancer,
                        "Only the built-in enhancer can be attached directly, skipping aspect"
                    );
                    continue;
                }
                let enhancer = HttpServerEnhancer::new(trace.clone())
                    .with_target(aspect.module.clone(), DEFAULT_TARGET_METHOD)
                    .with_component(component.clone());
                builder = builder.rule(
                    enhancer.module_matcher(),
                    Arc::new(DirectTransformer::new(Arc::new(enhancer))),
                );
            }
        }
        Strategy::TargetNamespace => {
            let root = instrumentation.root_namespace();
            let (trace, component) = (trace.clone(), component.clone());
            root.register(HTTP_SERVER_ENHANCER, move |settings: &Settings| {
                build_trace_enhancer(&trace, &component, settings)
            });
            for aspect in &config.plugins.aspects {
                builder = builder.rule(
                    Some(aspect_matcher(&aspect.module)),
                    Arc::new(NamespaceTransformer::new(aspect.enhancer.clone())),
                );
            }
        }
        Strategy::PluginLoader => {
            let catalog = Arc::new(FactoryRegistry::new());
            let (trace, component) = (trace.clone(), component.clone());
            catalog.register(HTTP_SERVER_ENHANCER, move |settings: &Settings| {
                build_trace_enhancer(&trace, &component, settings)
            });
            let plugin_loader = Arc::new(EnhancerLoader::new(
                config.plugins.archive_path.clone(),
                catalog,
                instrumentation.root_namespace().clone(),
            ));
            for aspect in &config.plugins.aspects {
                builder = builder.rule(
                    Some(aspect_matcher(&aspect.module)),
                    Arc::new(PluginTransformer::new(aspect.enhancer.clone(), plugin_loader.clone())),
                );
            }
            loader = Some(plugin_loader);
        }
    }

    let agent = builder.install_on(instrumentation);
    tracing::info!("The agent has been loaded");

    InstalledAgent {
        agent,
        config,
        strategy,
        trace,
        loader,
    }
}

fn build_trace_enhancer(
    trace: &Arc<TraceContext>,
    component: &str,
    settings: &Settings,
) -> Result<Arc<dyn Enhancer>, HookError> {
    Ok(Arc::new(
        HttpServerEnhancer::new(trace.clone())
            .with_component(component)
            .with_settings(settings),
    ))
}

/// Concrete, non-interface module with the given name.
fn aspect_matcher(module: &str) -> BoxMatcher {
    named(module).and(is_interface().negate()).boxed()
}

/// Matcher for everything the agent must never touch.
pub fn ignore_matcher(config: &IgnoreConfig) -> OrMatcher {
    let mut matcher = OrMatcher::new(Vec::new());
    for prefix in &config.prefixes {
        matcher = matcher.or(name_starts_with(prefix.as_str()));
    }
    for fragment in &config.contains {
        matcher = matcher.or(name_contains(fragment.as_str()));
    }
    if config.synthetic {
        matcher = matcher.or(is_synthetic());
    }
    matcher
}
