//! Element matching logic.
//!
//! # Responsibilities
//! - Match names (exact, prefix, substring; case-sensitive)
//! - Match descriptor flags (static, interface, synthetic)
//! - Combine conditions with AND / OR / NOT semantics
//!
//! # Design Decisions
//! - One trait for both module and member descriptors
//! - No regex to guarantee O(n) matching
//! - Empty AND = always matches, empty OR = never matches

use std::fmt;
use std::sync::Arc;

use super::descriptor::Describe;

/// Trait for matching descriptors against conditions.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns true if the descriptor matches this condition.
    fn matches(&self, target: &dyn Describe) -> bool;
}

pub type BoxMatcher = Box<dyn Matcher>;

impl<M: Matcher + ?Sized> Matcher for Box<M> {
    fn matches(&self, target: &dyn Describe) -> bool {
        (**self).matches(target)
    }
}

impl<M: Matcher + ?Sized> Matcher for Arc<M> {
    fn matches(&self, target: &dyn Describe) -> bool {
        (**self).matches(target)
    }
}

/// Evaluate an optional matcher; an absent matcher matches nothing.
pub fn matches_opt(matcher: Option<&dyn Matcher>, target: &dyn Describe) -> bool {
    match matcher {
        Some(m) => m.matches(target),
        None => {
            tracing::debug!(target_name = %target.name(), "No matcher configured, treating as no match");
            false
        }
    }
}

/// Combinators available on every matcher.
pub trait MatcherExt: Matcher + Sized + 'static {
    fn and<M: Matcher + 'static>(self, other: M) -> AndMatcher {
        AndMatcher::new(vec![Box::new(self), Box::new(other)])
    }

    fn or<M: Matcher + 'static>(self, other: M) -> OrMatcher {
        OrMatcher::new(vec![Box::new(self), Box::new(other)])
    }

    fn negate(self) -> NotMatcher {
        NotMatcher::new(Box::new(self))
    }

    fn boxed(self) -> BoxMatcher {
        Box::new(self)
    }
}

impl<M: Matcher + 'static> MatcherExt for M {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameMode {
    Exact,
    Prefix,
    Contains,
}

/// Matches the descriptor name.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    expected: String,
    mode: NameMode,
}

impl Matcher for NameMatcher {
    fn matches(&self, target: &dyn Describe) -> bool {
        let name = target.name();
        match self.mode {
            NameMode::Exact => name == self.expected,
            NameMode::Prefix => name.starts_with(&self.expected),
            NameMode::Contains => name.contains(&self.expected),
        }
    }
}

/// Exact name match.
pub fn named(name: impl Into<String>) -> NameMatcher {
    NameMatcher {
        expected: name.into(),
        mode: NameMode::Exact,
    }
}

pub fn name_starts_with(prefix: impl Into<String>) -> NameMatcher {
    NameMatcher {
        expected: prefix.into(),
        mode: NameMode::Prefix,
    }
}

pub fn name_contains(fragment: impl Into<String>) -> NameMatcher {
    NameMatcher {
        expected: fragment.into(),
        mode: NameMode::Contains,
    }
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Static,
    Interface,
    Synthetic,
}

/// Matches a descriptor flag.
#[derive(Debug, Clone, Copy)]
pub struct FlagMatcher(Flag);

impl Matcher for FlagMatcher {
    fn matches(&self, target: &dyn Describe) -> bool {
        match self.0 {
            Flag::Static => target.is_static(),
            Flag::Interface => target.is_interface(),
            Flag::Synthetic => target.is_synthetic(),
        }
    }
}

pub fn is_static() -> FlagMatcher {
    FlagMatcher(Flag::Static)
}

pub fn is_interface() -> FlagMatcher {
    FlagMatcher(Flag::Interface)
}

pub fn is_synthetic() -> FlagMatcher {
    FlagMatcher(Flag::Synthetic)
}

/// Constant matcher.
#[derive(Debug, Clone, Copy)]
pub struct ConstMatcher(bool);

impl Matcher for ConstMatcher {
    fn matches(&self, _target: &dyn Describe) -> bool {
        self.0
    }
}

pub fn any() -> ConstMatcher {
    ConstMatcher(true)
}

pub fn none() -> ConstMatcher {
    ConstMatcher(false)
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<BoxMatcher>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<BoxMatcher>) -> Self {
        Self { matchers }
    }

    /// Append another condition; keeps the chain flat.
    pub fn and<M: Matcher + 'static>(mut self, other: M) -> Self {
        self.matchers.push(Box::new(other));
        self
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, target: &dyn Describe) -> bool {
        self.matchers.iter().all(|m| m.matches(target))
    }
}

/// Combines multiple matchers with OR semantics.
#[derive(Debug)]
pub struct OrMatcher {
    matchers: Vec<BoxMatcher>,
}

impl OrMatcher {
    pub fn new(matchers: Vec<BoxMatcher>) -> Self {
        Self { matchers }
    }

    pub fn or<M: Matcher + 'static>(mut self, other: M) -> Self {
        self.matchers.push(Box::new(other));
        self
    }
}

impl Matcher for OrMatcher {
    fn matches(&self, target: &dyn Describe) -> bool {
        self.matchers.iter().any(|m| m.matches(target))
    }
}

/// Inverts a matcher.
#[derive(Debug)]
pub struct NotMatcher {
    inner: BoxMatcher,
}

impl NotMatcher {
    pub fn new(inner: BoxMatcher) -> Self {
        Self { inner }
    }
}

impl Matcher for NotMatcher {
    fn matches(&self, target: &dyn Describe) -> bool {
        !self.inner.matches(target)
    }
}
