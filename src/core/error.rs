//! Error handling for embkit
//!
//! This module provides the error type shared by every embkit subsystem and the
//! user-facing rendering used by the command line. The error system follows two
//! principles:
//! 1. **Strongly-typed errors** so callers can react to specific failures
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`EmbError`] - Enumerated error types for all failure cases in embkit
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Configuration**: [`EmbError::ConfigError`], [`EmbError::ConfigParseError`],
//!   [`EmbError::OverrideCycle`], [`EmbError::DuplicateBinding`]. These abort
//!   container construction and are never retried.
//! - **Wiring defects**: [`EmbError::RoleMismatch`], [`EmbError::Sealed`]. These are
//!   programming errors reported at the moment of registration.
//! - **Lookup**: [`EmbError::ComponentNotFound`], [`EmbError::SelectionSuppressed`],
//!   [`EmbError::ImplementationNotFound`], [`EmbError::InstantiationFailed`].
//!
//! A miss inside one resolution strategy (no selection for a hint, no instance in the
//! registry) is *not* an error. Those paths return `None` or the unchanged hint and
//! resolution falls through to the next strategy. Only the final outcome of a lookup
//! can be [`EmbError::ComponentNotFound`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use embkit::core::{EmbError, ErrorContext, user_friendly_error};
//!
//! let error = EmbError::OverrideCycle {
//!     chain: "Resolver#a → Resolver#b → Resolver#a".to_string(),
//! };
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // colored error with suggestion on stderr
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Result alias used by the library modules.
pub type Result<T> = std::result::Result<T, EmbError>;

/// The main error type for embkit operations
///
/// Every variant names the role, hint, key, or file involved so that a failed
/// startup points directly at the offending declaration.
///
/// # Examples
///
/// ```rust,no_run
/// use embkit::core::EmbError;
///
/// fn handle_error(error: EmbError) {
///     match error {
///         EmbError::RoleMismatch { role, actual, .. } => {
///             eprintln!("{actual} cannot be registered as {role}");
///         }
///         EmbError::ComponentNotFound { role, hint } => {
///             eprintln!("nothing bound for {role}#{hint}");
///         }
///         _ => eprintln!("{error}"),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum EmbError {
    /// Configuration content is invalid
    ///
    /// Raised for malformed selection keys or values and for invalid
    /// component plans. Fatal to container initialization.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error, including the offending key
        message: String,
    },

    /// Config file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the configuration file that was not found
        path: String,
    },

    /// Configuration file could not be read or parsed
    #[error("Invalid configuration file {file}: {reason}")]
    ConfigParseError {
        /// Path to the configuration file that failed to parse
        file: String,
        /// Specific reason for the failure
        reason: String,
    },

    /// An instance was registered under a role it does not implement
    ///
    /// This is a wiring defect and is reported at registration time, before any
    /// container build step runs.
    ///
    /// # Fields
    /// - `role`: The declared role name
    /// - `hint`: The hint the instance was registered under
    /// - `actual`: The type name of the rejected instance
    #[error("Instance of type {actual} is not assignable to role {role} (hint: {hint})")]
    RoleMismatch {
        /// Declared role name
        role: String,
        /// Hint the instance was registered under
        hint: String,
        /// Type name of the rejected instance
        actual: String,
    },

    /// The override graph contains a cycle
    ///
    /// Example: `Resolver#a` is configured to be replaced by `Resolver#b`, and
    /// `Resolver#b` by `Resolver#a`. Neither component could ever be selected.
    #[error("Override cycle detected: {chain}")]
    OverrideCycle {
        /// String representation of the cycle
        chain: String,
    },

    /// Two selected components claim the same binding key
    #[error("Duplicate binding for {key}: {existing} is already bound, {rejected} rejected")]
    DuplicateBinding {
        /// The binding key both components claim
        key: String,
        /// Implementation already bound to the key
        existing: String,
        /// Implementation that was rejected
        rejected: String,
    },

    /// No component could be resolved for a lookup
    #[error("No component found for role '{role}' with hint '{hint}'")]
    ComponentNotFound {
        /// Requested role
        role: String,
        /// Requested hint
        hint: String,
    },

    /// The role/hint was explicitly configured to select nothing
    #[error("Component selection for role '{role}' with hint '{hint}' is suppressed")]
    SelectionSuppressed {
        /// Requested role
        role: String,
        /// Requested hint
        hint: String,
    },

    /// A deferred implementation is not present in any implementation catalog
    #[error("Implementation '{implementation}' for role '{role}' is not available")]
    ImplementationNotFound {
        /// Implementation name referenced by the declaration
        implementation: String,
        /// Role the implementation was declared for
        role: String,
    },

    /// A factory failed or produced an instance of the wrong type
    #[error("Failed to instantiate component {role}#{hint}: {reason}")]
    InstantiationFailed {
        /// Role of the failing component
        role: String,
        /// Hint of the failing component
        hint: String,
        /// Reason reported by the factory or the type check
        reason: String,
    },

    /// An alias chain never reached a concrete binding
    #[error("Alias chain starting at {key} does not terminate")]
    AliasLoop {
        /// First key of the chain
        key: String,
    },

    /// Mutation attempted after the structure was sealed
    #[error("Cannot modify {what}: it was sealed when the container was built")]
    Sealed {
        /// The sealed structure (e.g. "instance registry")
        what: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl EmbError {
    /// Shorthand for [`EmbError::ConfigError`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Returns true for errors that are fatal to container initialization.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. }
                | Self::ConfigNotFound { .. }
                | Self::ConfigParseError { .. }
                | Self::OverrideCycle { .. }
                | Self::DuplicateBinding { .. }
                | Self::TomlError(_)
        )
    }
}

impl Clone for EmbError {
    fn clone(&self) -> Self {
        match self {
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::ConfigNotFound {
                path,
            } => Self::ConfigNotFound {
                path: path.clone(),
            },
            Self::ConfigParseError {
                file,
                reason,
            } => Self::ConfigParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::RoleMismatch {
                role,
                hint,
                actual,
            } => Self::RoleMismatch {
                role: role.clone(),
                hint: hint.clone(),
                actual: actual.clone(),
            },
            Self::OverrideCycle {
                chain,
            } => Self::OverrideCycle {
                chain: chain.clone(),
            },
            Self::DuplicateBinding {
                key,
                existing,
                rejected,
            } => Self::DuplicateBinding {
                key: key.clone(),
                existing: existing.clone(),
                rejected: rejected.clone(),
            },
            Self::ComponentNotFound {
                role,
                hint,
            } => Self::ComponentNotFound {
                role: role.clone(),
                hint: hint.clone(),
            },
            Self::SelectionSuppressed {
                role,
                hint,
            } => Self::SelectionSuppressed {
                role: role.clone(),
                hint: hint.clone(),
            },
            Self::ImplementationNotFound {
                implementation,
                role,
            } => Self::ImplementationNotFound {
                implementation: implementation.clone(),
                role: role.clone(),
            },
            Self::InstantiationFailed {
                role,
                hint,
                reason,
            } => Self::InstantiationFailed {
                role: role.clone(),
                hint: hint.clone(),
                reason: reason.clone(),
            },
            Self::AliasLoop {
                key,
            } => Self::AliasLoop {
                key: key.clone(),
            },
            Self::Sealed {
                what,
            } => Self::Sealed {
                what: what.clone(),
            },
            // io and toml errors are not Clone; keep their message
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::TomlError(e) => Self::ConfigParseError {
                file: "unknown".to_string(),
                reason: e.to_string(),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Wraps an [`EmbError`] with an optional suggestion (displayed in green) and
/// optional details (displayed in yellow).
///
/// ```rust,no_run
/// use embkit::core::{EmbError, ErrorContext};
///
/// let context = ErrorContext::new(EmbError::config("empty selection key"))
///     .with_suggestion("Remove the empty key from [selections]")
///     .with_details("Selection keys have the form role or role#hint");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying embkit error
    pub error: EmbError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: EmbError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`EmbError`] (directly or wrapped in an [`ErrorContext`]),
/// [`std::io::Error`] and [`toml::de::Error`]; anything else is rendered with its
/// full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(emb_error) = error.downcast_ref::<EmbError>() {
        return create_error_context(emb_error.clone());
    }

    if let Some(ctx) = error.downcast_ref::<ErrorContext>() {
        return ErrorContext {
            error: ctx.error.clone(),
            suggestion: ctx.suggestion.clone(),
            details: ctx.details.clone(),
        };
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(EmbError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check the ownership and permissions of the configuration file")
                .with_details("embkit could not read a file it needs to start");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(EmbError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the file exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(EmbError::ConfigParseError {
            file: "embkit.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax: quote keys that contain '#', e.g. \"Role#hint\" = \"other\"");
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(EmbError::Other {
        message,
    })
}

/// Map each [`EmbError`] variant to suggestions and details.
fn create_error_context(error: EmbError) -> ErrorContext {
    match &error {
        EmbError::ConfigError { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Fix the offending entry in the [selections] or [[components]] section")
            .with_details("Selection keys have the form 'role' or 'role#hint'; values are hints, '#' to select nothing, or '_hint_' for a literal hint"),

        EmbError::ConfigParseError { file, .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Check the TOML syntax in {file}. Keys containing '#' must be quoted"
            )),

        EmbError::ConfigNotFound { path } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Create {path} or pass --config with an existing file")),

        EmbError::RoleMismatch { role, actual, .. } => {
            let details = format!("{actual} does not implement {role}; the registration was rejected before the container was built");
            ErrorContext::new(error.clone())
                .with_suggestion("Register the instance under the role it implements, or wrap it in an adapter")
                .with_details(details)
        }

        EmbError::OverrideCycle { chain } => {
            let details = format!(
                "Override chain: {chain}. Every component in a cycle is overridden by another, so none can be selected"
            );
            ErrorContext::new(error.clone())
                .with_suggestion("Remove one of the selections forming the cycle")
                .with_details(details)
        }

        EmbError::DuplicateBinding { key, .. } => {
            let details = format!("Only one selected component can be bound to {key}");
            ErrorContext::new(error.clone())
                .with_suggestion("Give one of the components a different hint, or add a selection that overrides one with the other")
                .with_details(details)
        }

        EmbError::SelectionSuppressed { role, .. } => {
            let suggestion =
                format!("Remove the '#' selection for '{role}' if a component should be selected");
            ErrorContext::new(error.clone()).with_suggestion(suggestion)
        }

        EmbError::ImplementationNotFound { implementation, .. } => {
            let suggestion = format!(
                "Register an extension that provides '{implementation}', or declare the component with an available implementation"
            );
            ErrorContext::new(error.clone())
                .with_suggestion(suggestion)
                .with_details("Deferred implementations are resolved by name on first lookup")
        }

        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = EmbError::RoleMismatch {
            role: "ArtifactResolver".to_string(),
            hint: "remote".to_string(),
            actual: "alloc::string::String".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Instance of type alloc::string::String is not assignable to role ArtifactResolver (hint: remote)"
        );

        let error = EmbError::ComponentNotFound {
            role: "MirrorSelector".to_string(),
            hint: "default".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "No component found for role 'MirrorSelector' with hint 'default'"
        );
    }

    #[test]
    fn test_error_clone() {
        let error1 = EmbError::OverrideCycle {
            chain: "R#a → R#b → R#a".to_string(),
        };
        let error2 = error1.clone();
        assert_eq!(error1.to_string(), error2.to_string());

        let io = EmbError::IoError(std::io::Error::other("disk gone"));
        assert!(io.clone().to_string().contains("disk gone"));
    }

    #[test]
    fn test_is_configuration_error() {
        assert!(EmbError::config("bad").is_configuration_error());
        assert!(
            EmbError::OverrideCycle {
                chain: String::new()
            }
            .is_configuration_error()
        );
        assert!(
            !EmbError::ComponentNotFound {
                role: "R".to_string(),
                hint: "default".to_string()
            }
            .is_configuration_error()
        );
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(EmbError::config("empty key"))
            .with_suggestion("remove it")
            .with_details("keys must name a role");
        let display = format!("{ctx}");
        assert!(display.contains("Configuration error: empty key"));
        assert!(display.contains("Details: keys must name a role"));
        assert!(display.contains("Suggestion: remove it"));
    }

    #[test]
    fn test_user_friendly_error_override_cycle() {
        let ctx = user_friendly_error(anyhow::Error::from(EmbError::OverrideCycle {
            chain: "R#a → R#b → R#a".to_string(),
        }));
        assert!(ctx.suggestion.unwrap().contains("Remove one of the selections"));
        assert!(ctx.details.unwrap().contains("R#a → R#b → R#a"));
    }

    #[test]
    fn test_user_friendly_error_role_mismatch() {
        let ctx = user_friendly_error(anyhow::Error::from(EmbError::RoleMismatch {
            role: "Resolver".to_string(),
            hint: "x".to_string(),
            actual: "u32".to_string(),
        }));
        assert!(ctx.details.unwrap().contains("u32 does not implement Resolver"));
    }

    #[test]
    fn test_user_friendly_error_generic_chain() {
        let error = anyhow::anyhow!("root cause").context("while building container");
        let ctx = user_friendly_error(error);
        let message = ctx.error.to_string();
        assert!(message.contains("while building container"));
        assert!(message.contains("Caused by:"));
        assert!(message.contains("root cause"));
    }
}
