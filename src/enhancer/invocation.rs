//! Per-call view handed to enhancer hooks.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use crate::matcher::{MemberDescriptor, ModuleDescriptor};

/// Typed storage that lives exactly as long as one intercepted call.
///
/// Hooks use it to hand state from `before_call` to `after_call` / `on_error`
/// (an open span, a start timestamp). Values still present when the call
/// finishes are dropped with the scope, so nothing leaks into a later call
/// running on the same thread.
#[derive(Default)]
pub struct CallScope {
    slots: RefCell<HashMap<TypeId, Box<dyn Any>>>,
}

impl CallScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, returning the previous value of the same type.
    pub fn insert<T: Any>(&self, value: T) -> Option<T> {
        self.slots
            .borrow_mut()
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|prev| prev.downcast::<T>().ok())
            .map(|prev| *prev)
    }

    /// Remove and return the value of type `T`.
    pub fn take<T: Any>(&self) -> Option<T> {
        self.slots
            .borrow_mut()
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.slots.borrow().contains_key(&TypeId::of::<T>())
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }
}

impl fmt::Debug for CallScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallScope").field("len", &self.len()).finish()
    }
}

/// Everything a hook may inspect about the intercepted call.
pub struct Invocation<'a> {
    module: &'a ModuleDescriptor,
    member: &'a MemberDescriptor,
    instance: Option<&'a dyn Any>,
    args: &'a [&'a dyn Any],
    scope: CallScope,
}

impl<'a> Invocation<'a> {
    pub fn new(
        module: &'a ModuleDescriptor,
        member: &'a MemberDescriptor,
        instance: Option<&'a dyn Any>,
        args: &'a [&'a dyn Any],
    ) -> Self {
        Self {
            module,
            member,
            instance,
            args,
            scope: CallScope::new(),
        }
    }

    pub fn module(&self) -> &ModuleDescriptor {
        self.module
    }

    pub fn member(&self) -> &MemberDescriptor {
        self.member
    }

    /// The receiver of the call, if the member has one.
    pub fn instance(&self) -> Option<&'a dyn Any> {
        self.instance
    }

    pub fn args(&self) -> &'a [&'a dyn Any] {
        self.args
    }

    /// Argument at `index`, if present and of type `T`.
    pub fn arg<T: Any>(&self, index: usize) -> Option<&'a T> {
        self.args.get(index).and_then(|a| a.downcast_ref::<T>())
    }

    /// Declared parameter type names of the member.
    pub fn arg_types(&self) -> &[String] {
        self.member.param_types()
    }

    pub fn scope(&self) -> &CallScope {
        &self.scope
    }

    pub(crate) fn into_scope(self) -> CallScope {
        self.scope
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("module", &self.module.to_string())
            .field("member", &self.member.to_string())
            .field("args", &self.args.len())
            .field("scope", &self.scope)
            .finish()
    }
}

enum FailureSource<'a> {
    Error(&'a dyn Any),
    Panic(&'a (dyn Any + Send)),
}

/// A failure of the original body, as observed by `on_error`.
pub struct Failure<'a> {
    source: FailureSource<'a>,
    message: String,
}

impl<'a> Failure<'a> {
    pub fn from_error<E: fmt::Display + Any>(error: &'a E) -> Self {
        Self {
            message: error.to_string(),
            source: FailureSource::Error(error),
        }
    }

    pub fn from_panic(payload: &'a (dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self {
            source: FailureSource::Panic(payload),
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_panic(&self) -> bool {
        matches!(self.source, FailureSource::Panic(_))
    }

    /// The error value returned by the body, if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        match self.source {
            FailureSource::Error(e) => e.downcast_ref::<T>(),
            FailureSource::Panic(p) => p.downcast_ref::<T>(),
        }
    }
}

impl fmt::Debug for Failure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("message", &self.message)
            .field("panic", &self.is_panic())
            .finish()
    }
}

impl fmt::Display for Failure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
