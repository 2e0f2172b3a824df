//! Descriptors of the things interception rules are evaluated against.

use std::fmt;

/// Common view over module and member descriptors used by matchers.
pub trait Describe: fmt::Debug {
    /// Fully-qualified name.
    fn name(&self) -> &str;

    fn is_static(&self) -> bool {
        false
    }

    fn is_interface(&self) -> bool {
        false
    }

    fn is_synthetic(&self) -> bool {
        false
    }
}

/// Identity of a loadable module (the unit a type matcher selects).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleDescriptor {
    name: String,
    interface: bool,
    synthetic: bool,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interface: false,
            synthetic: false,
        }
    }

    /// Mark the module as a pure interface (no bodies to intercept).
    pub fn interface(mut self) -> Self {
        self.interface = true;
        self
    }

    /// Mark the module as generated glue rather than user code.
    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }
}

impl Describe for ModuleDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_interface(&self) -> bool {
        self.interface
    }

    fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Identity of a callable member of a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberDescriptor {
    name: String,
    param_types: Vec<String>,
    is_static: bool,
}

impl MemberDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_types: Vec::new(),
            is_static: false,
        }
    }

    /// Declare the parameter type names, in order.
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param_types = params.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the member as statically dispatched (never intercepted).
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn param_types(&self) -> &[String] {
        &self.param_types
    }
}

impl Describe for MemberDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_static(&self) -> bool {
        self.is_static
    }
}

impl fmt::Display for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.param_types.join(", "))
    }
}
