//! Interception rule matching.
//!
//! # Data Flow
//! ```text
//! Module presented for loading
//!     → descriptor.rs (ModuleDescriptor / MemberDescriptor)
//!     → element.rs (evaluate type matcher, then method matcher)
//!     → Return: applies / does not apply
//! ```
//!
//! # Design Decisions
//! - Matchers are pure: same descriptor always gives the same answer
//! - Composite matchers short-circuit like `&&` / `||`
//! - An absent matcher matches nothing (a misconfigured enhancer installs no
//!   interception instead of failing the host)

pub mod descriptor;
pub mod element;

pub use descriptor::{Describe, MemberDescriptor, ModuleDescriptor};
pub use element::{
    any, is_interface, is_static, is_synthetic, matches_opt, name_contains, name_starts_with,
    named, none, AndMatcher, BoxMatcher, Matcher, MatcherExt, NameMatcher, NotMatcher, OrMatcher,
};
