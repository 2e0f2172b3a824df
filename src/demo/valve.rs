//! The intercepted host module: `demo::HostValve`.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

use crate::intercept::{CallSlot, Instrumentation, Module};
use crate::matcher::{MemberDescriptor, ModuleDescriptor};
use crate::trace::ServerRequest;

pub const HOST_VALVE_MODULE: &str = "demo::HostValve";
pub const INVOKE_MEMBER: &str = "invoke";

const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("name is empty")]
    EmptyName,

    #[error("name is longer than {max} characters")]
    NameTooLong { max: usize },

    #[error("module {module} has no member {member}")]
    MissingMember { module: String, member: String },
}

/// The greeting.
#[derive(Debug, Clone)]
pub struct GreetingService {
    greeting: String,
}

impl Default for GreetingService {
    fn default() -> Self {
        Self::new("Hello")
    }
}

impl GreetingService {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
        }
    }

    pub fn greet(&self, name: &str) -> Result<String, DemoError> {
        if name.is_empty() {
            return Err(DemoError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DemoError::NameTooLong { max: MAX_NAME_LEN });
        }
        Ok(format!("{}, {}!", self.greeting, name))
    }
}

/// Request dispatcher whose `invoke` member is routed through a call slot.
#[derive(Debug)]
pub struct HostValve {
    module: Arc<Module>,
    invoke: Arc<CallSlot>,
    greeter: GreetingService,
}

impl HostValve {
    /// The module declaration: `invoke(ServerRequest)` plus a static
    /// constructor that is never intercepted.
    pub fn module(instrumentation: &Instrumentation) -> Module {
        Module::builder(
            ModuleDescriptor::new(HOST_VALVE_MODULE),
            instrumentation.root_namespace().clone(),
        )
        .member(MemberDescriptor::new(INVOKE_MEMBER).with_params(["ServerRequest", "String"]))
        .member(MemberDescriptor::new("new").with_params(["GreetingService"]).static_member())
        .build()
    }

    /// Define the module on `instrumentation` and bind to its `invoke` slot.
    pub fn define(instrumentation: &Instrumentation, greeter: GreetingService) -> Result<Self, DemoError> {
        let module = instrumentation.define(Self::module(instrumentation));
        let invoke = module.slot(INVOKE_MEMBER).ok_or_else(|| DemoError::MissingMember {
            module: HOST_VALVE_MODULE.to_string(),
            member: INVOKE_MEMBER.to_string(),
        })?;

        tracing::debug!(
            module = %module.name(),
            enhanced = ?module.enhanced_members(),
            "Host valve defined"
        );
        Ok(Self {
            module,
            invoke,
            greeter,
        })
    }

    pub fn host_module(&self) -> &Module {
        &self.module
    }

    /// Dispatch one request.
    pub fn invoke(&self, request: &ServerRequest, name: &str) -> Result<String, DemoError> {
        let name_arg = name.to_string();
        let args: [&dyn Any; 2] = [request, &name_arg];
        self.invoke
            .call(Some(self as &dyn Any), &args, || self.greeter.greet(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greet() {
        let greeter = GreetingService::default();
        assert_eq!(greeter.greet("ada").unwrap(), "Hello, ada!");
        assert!(matches!(greeter.greet(""), Err(DemoError::EmptyName)));
        assert!(matches!(
            greeter.greet(&"x".repeat(65)),
            Err(DemoError::NameTooLong { max: 64 })
        ));
    }

    #[test]
    fn test_uninstrumented_invoke_calls_body() {
        let inst = Instrumentation::new();
        let valve = HostValve::define(&inst, GreetingService::new("Hi")).unwrap();
        let request = ServerRequest::new("GET", "/hello/bob");

        assert_eq!(valve.invoke(&request, "bob").unwrap(), "Hi, bob!");
        assert!(valve.host_module().enhanced_members().is_empty());
        assert!(inst.module(HOST_VALVE_MODULE).is_some());
    }
}
