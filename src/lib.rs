//! embkit: component selection and binding for embedding build tools.
//!
//! A host application that embeds a build engine composes its services from
//! several extensions. Each extension declares components (an implementation
//! for a role, optionally under a hint) and may override which hint a lookup
//! resolves to. embkit decides, at container build time, which declared
//! component serves each role/hint and then answers lookups against that plan.
//!
//! # Architecture
//!
//! - [`selector`] maps a requested role/hint to the effective hint
//! - [`registry`] holds instances supplied directly, including virtual slots
//! - [`binder`] turns declarations into bindings, aliasing overridden slots
//! - [`container`] is the composition root and answers lookups
//! - [`extension`] bundles what one extension contributes
//! - [`config`] loads selections and planned components from `embkit.toml`
//! - [`graph`] accumulates the dependency graph observed during resolution
//!
//! # Example
//!
//! ```rust
//! use embkit::container::ContainerBuilder;
//! use embkit::core::Role;
//! use embkit::extension::Extension;
//! use std::sync::Arc;
//!
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! impl Role for dyn Greeter {
//!     const NAME: &'static str = "Greeter";
//! }
//!
//! struct Plain(&'static str);
//!
//! impl Greeter for Plain {
//!     fn greet(&self) -> String {
//!         self.0.to_string()
//!     }
//! }
//!
//! # fn main() -> embkit::core::Result<()> {
//! let core = Extension::new("core", "Core", "1.0.0")
//!     .component::<dyn Greeter, _>(None, "PlainGreeter", |_| Ok(Arc::new(Plain("hello")) as Arc<dyn Greeter>))
//!     .component::<dyn Greeter, _>(Some("loud"), "LoudGreeter", |_| Ok(Arc::new(Plain("HELLO")) as Arc<dyn Greeter>));
//!
//! let container = ContainerBuilder::new()
//!     .with_extension(core)?
//!     .with_selection("Greeter", "loud")?
//!     .build()?;
//!
//! assert_eq!(container.lookup::<dyn Greeter>(None)?.greet(), "HELLO");
//! # Ok(())
//! # }
//! ```

// Core types
pub mod constants;
pub mod core;

// Selection and binding
pub mod binder;
pub mod component;
pub mod registry;
pub mod selector;

// Composition
pub mod container;
pub mod extension;

// Dependency graph accumulation
pub mod graph;

// Configuration and command line
pub mod cli;
pub mod config;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
