//! Enhancer resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Transformer needs an enhancer for a module:
//!     v2 → namespace.rs (module's HostNamespace, parent-first)
//!     v3 → instance.rs (EnhancerLoader cache)
//!            → plugin.rs (PluginNamespace for the module's HostNamespace)
//!            → archive.rs (which plugins the isolated namespace provides)
//!            → catalog factory, or parent HostNamespace
//! ```
//!
//! # Design Decisions
//! - Namespaces are explicit registries, not host-runtime machinery
//! - Two host namespaces never share a plugin namespace
//! - Resolution failures are values (`ResolveError`), never panics

pub mod archive;
pub mod error;
pub mod instance;
pub mod namespace;
pub mod plugin;

pub use archive::{PluginArchive, PluginEntry};
pub use error::ResolveError;
pub use instance::EnhancerLoader;
pub use namespace::{EnhancerFactory, FactoryRegistry, HostNamespace, Settings};
pub use plugin::PluginNamespace;
