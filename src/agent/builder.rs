//! Agent assembly and module presentation.
//!
//! # Responsibilities
//! - Hold the ignore matcher, the (type matcher, transformer) rules and the
//!   listener
//! - Decide, per presented module, which rules apply
//! - Install itself on an `Instrumentation` with retransformation
//!
//! # Design Decisions
//! - Ignore rules are checked before any rule
//! - Every matching rule runs; a failing rule does not stop the next one
//! - An absent type matcher matches nothing

use std::fmt;
use std::sync::Arc;

use crate::agent::listener::{Listener, LoggingListener};
use crate::intercept::{Instrumentation, LoadHook, Module};
use crate::matcher::{self, matches_opt, BoxMatcher, Matcher};
use crate::transformer::Transformer;

/// One registration: modules matching `matcher` get `transformer` applied.
pub struct Rule {
    matcher: Option<BoxMatcher>,
    transformer: Arc<dyn Transformer>,
}

impl Rule {
    pub fn new(matcher: Option<BoxMatcher>, transformer: Arc<dyn Transformer>) -> Self {
        Self { matcher, transformer }
    }

    pub fn matches(&self, module: &Module) -> bool {
        matches_opt(self.matcher.as_deref(), module.descriptor())
    }

    pub fn transformer(&self) -> &Arc<dyn Transformer> {
        &self.transformer
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("matcher", &self.matcher)
            .field("transformer", &self.transformer)
            .finish()
    }
}

/// Builds an `Agent`.
pub struct AgentBuilder {
    ignore: BoxMatcher,
    rules: Vec<Rule>,
    listener: Arc<dyn Listener>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self {
            ignore: Box::new(matcher::none()),
            rules: Vec::new(),
            listener: Arc::new(LoggingListener),
        }
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Modules matching `matcher` are never transformed.
    pub fn ignore(mut self, matcher: impl Matcher + 'static) -> Self {
        self.ignore = Box::new(matcher);
        self
    }

    pub fn rule(mut self, matcher: Option<BoxMatcher>, transformer: Arc<dyn Transformer>) -> Self {
        self.rules.push(Rule::new(matcher, transformer));
        self
    }

    pub fn listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            ignore: self.ignore,
            rules: self.rules,
            listener: self.listener,
        }
    }

    /// Build the agent and register it on `instrumentation`. Modules defined
    /// before this call are presented immediately.
    pub fn install_on(self, instrumentation: &Instrumentation) -> Arc<Agent> {
        let agent = Arc::new(self.build());
        tracing::info!(rules = agent.rules.len(), "Installing agent");
        instrumentation.add_hook(agent.clone(), true);
        agent
    }
}

/// The load hook that applies rules to presented modules.
pub struct Agent {
    ignore: BoxMatcher,
    rules: Vec<Rule>,
    listener: Arc<dyn Listener>,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Run the ignore check and every matching rule against `module`.
    pub fn present(&self, module: &Module, loaded: bool) {
        self.listener.on_discovery(module, loaded);

        if self.ignore.matches(module.descriptor()) {
            self.listener.on_ignored(module, loaded);
            self.listener.on_complete(module, loaded);
            return;
        }

        let mut matched = false;
        for rule in self.rules.iter().filter(|r| r.matches(module)) {
            matched = true;
            match rule.transformer.transform(module) {
                Ok(transformation) => self.listener.on_transformation(module, loaded, &transformation),
                Err(e) => self.listener.on_error(module, loaded, &e),
            }
        }

        if !matched {
            self.listener.on_ignored(module, loaded);
        }
        self.listener.on_complete(module, loaded);
    }
}

impl LoadHook for Agent {
    fn on_load(&self, module: &Module, loaded: bool) {
        self.present(module, loaded);
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("ignore", &self.ignore)
            .field("rules", &self.rules)
            .finish()
    }
}
