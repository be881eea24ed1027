//! Core types for embkit
//!
//! This module holds the vocabulary every other subsystem speaks:
//!
//! - [`error`] - [`EmbError`], [`ErrorContext`] and [`user_friendly_error`]
//! - [`key`] - typed roles ([`Role`], [`RoleDescriptor`]) and string-keyed
//!   component slots ([`ComponentKey`])
//!
//! # Error Handling Pattern
//!
//! Library functions return [`Result`], which uses [`EmbError`] directly so that
//! callers can match on the failure. The command line converts any error into
//! an [`ErrorContext`] before printing it:
//!
//! ```rust,no_run
//! use embkit::core::{EmbError, user_friendly_error};
//!
//! fn run() -> anyhow::Result<()> {
//!     Err(EmbError::ComponentNotFound {
//!         role: "ArtifactResolver".to_string(),
//!         hint: "default".to_string(),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = run() {
//!     user_friendly_error(e).display();
//! }
//! ```

pub mod error;
pub mod key;

pub use error::{EmbError, ErrorContext, Result, user_friendly_error};
pub use key::{ComponentKey, Role, RoleDescriptor};
