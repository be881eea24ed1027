//! Component identity: roles, hints and keys.
//!
//! A component slot is identified by a role (the capability a component
//! provides) and an optional hint (which of several implementations). Inside
//! Rust code roles are types implementing [`Role`]; at the configuration and
//! extension boundary they are plain strings carried by [`ComponentKey`].
//!
//! # Typed roles
//!
//! ```rust
//! use embkit::core::{ComponentKey, Role};
//!
//! pub trait MirrorSelector: Send + Sync {
//!     fn mirror_for(&self, repository: &str) -> Option<String>;
//! }
//!
//! impl Role for dyn MirrorSelector {
//!     const NAME: &'static str = "MirrorSelector";
//! }
//!
//! let key = ComponentKey::of::<dyn MirrorSelector>(Some("auto"));
//! assert_eq!(key.key(), "MirrorSelector#auto");
//! ```

use crate::constants::{DEFAULT_HINT, LITERAL_HINT_DELIMITER, RAW_HINT_SUFFIX, ROLE_HINT_SEPARATOR};
use std::any::TypeId;
use std::fmt;

/// A capability that components can be registered and looked up under.
///
/// Implement it for trait objects (`dyn ArtifactResolver`) or for concrete
/// types. `NAME` is the stable string identifier used in configuration files.
pub trait Role: Send + Sync + 'static {
    /// Stable identifier used in selection keys (`NAME` or `NAME#hint`).
    const NAME: &'static str;
}

/// Runtime description of a [`Role`]: its name and the type of a stored instance.
///
/// Instances are stored as `Arc<R>`, so `instance_type` is the `TypeId` of
/// `Arc<R>`. Comparing it against an erased instance's type is the
/// assignability check performed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleDescriptor {
    name: &'static str,
    instance_type: TypeId,
    type_name: &'static str,
}

impl RoleDescriptor {
    /// Describe the role `R`.
    pub fn of<R: Role + ?Sized>() -> Self {
        Self {
            name: R::NAME,
            instance_type: TypeId::of::<std::sync::Arc<R>>(),
            type_name: std::any::type_name::<R>(),
        }
    }

    /// Role name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `TypeId` of `Arc<R>`.
    pub fn instance_type(&self) -> TypeId {
        self.instance_type
    }

    /// Rust type name of the role, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Identifies an implementation slot by role and optional hint.
///
/// Two keys are equal iff role and hint are equal (case-sensitive). A `None`
/// hint and `Some("default")` are *different* keys; lookups that need to treat
/// them alike use [`ComponentKey::default_hint_alternate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey {
    role: String,
    hint: Option<String>,
}

impl ComponentKey {
    /// Create a key from a role name and optional hint. A blank hint is
    /// stored as no hint.
    pub fn new(role: impl Into<String>, hint: Option<&str>) -> Self {
        Self {
            role: role.into(),
            hint: hint.filter(|h| !h.trim().is_empty()).map(str::to_string),
        }
    }

    /// Create a key without a hint.
    pub fn role_only(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            hint: None,
        }
    }

    /// Create a key for the typed role `R`.
    pub fn of<R: Role + ?Sized>(hint: Option<&str>) -> Self {
        Self::new(R::NAME, hint)
    }

    /// Parse a formatted selection key (`role` or `role#hint`).
    ///
    /// Splits on the first `#`. Returns `None` for an empty role.
    pub fn parse(formatted: &str) -> Option<Self> {
        let (role, hint) = match formatted.split_once(ROLE_HINT_SEPARATOR) {
            Some((role, hint)) => (role, Some(hint)),
            None => (formatted, None),
        };
        if role.trim().is_empty() {
            return None;
        }
        Some(Self::new(role, hint))
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// The hint with blank and absent hints folded into [`DEFAULT_HINT`].
    pub fn canonical_hint(&self) -> &str {
        canonical_hint(self.hint.as_deref())
    }

    /// `role`, or `role#hint` when a non-default hint is present.
    pub fn key(&self) -> String {
        if is_default_hint(self.hint.as_deref()) {
            self.role.clone()
        } else {
            format!("{}{ROLE_HINT_SEPARATOR}{}", self.role, self.canonical_hint())
        }
    }

    /// Same role with the hint folded to its canonical form.
    pub fn canonical(&self) -> Self {
        Self::new(self.role.clone(), Some(self.canonical_hint()))
    }

    /// The other spelling of the default slot: `None` for `"default"`, and
    /// `"default"` for `None`. Returns `None` for non-default hints.
    pub fn default_hint_alternate(&self) -> Option<Self> {
        match self.hint.as_deref() {
            Some(DEFAULT_HINT) => Some(Self::role_only(self.role.clone())),
            Some(_) => None,
            None => Some(Self::new(self.role.clone(), Some(DEFAULT_HINT))),
        }
    }

    /// Key under which a component is bound when its own slot was overridden.
    pub fn raw(&self) -> Self {
        Self::new(self.role.clone(), Some(&raw_hint(self.canonical_hint())))
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Fold `None` and blank hints into [`DEFAULT_HINT`].
pub fn canonical_hint(hint: Option<&str>) -> &str {
    match hint {
        Some(h) if !h.trim().is_empty() => h,
        _ => DEFAULT_HINT,
    }
}

/// True for `None`, blank, and [`DEFAULT_HINT`].
pub fn is_default_hint(hint: Option<&str>) -> bool {
    canonical_hint(hint) == DEFAULT_HINT
}

/// If `hint` is delimiter-wrapped and longer than two characters, return the
/// inner literal.
pub fn literal_hint(hint: &str) -> Option<&str> {
    if hint.len() > 2
        && hint.starts_with(LITERAL_HINT_DELIMITER)
        && hint.ends_with(LITERAL_HINT_DELIMITER)
    {
        Some(&hint[1..hint.len() - 1])
    } else {
        None
    }
}

/// Hint used for the raw binding of an overridden component.
pub fn raw_hint(hint: &str) -> String {
    format!("{hint}{RAW_HINT_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Resolver: Send + Sync {}

    impl Role for dyn Resolver {
        const NAME: &'static str = "Resolver";
    }

    #[test]
    fn test_key_formatting() {
        assert_eq!(ComponentKey::role_only("role").key(), "role");
        assert_eq!(ComponentKey::new("role", Some("hint")).key(), "role#hint");
        assert_eq!(ComponentKey::new("role", Some("  ")).key(), "role");
        assert_eq!(ComponentKey::new("role", Some(DEFAULT_HINT)).key(), "role");
        assert_eq!(ComponentKey::new("role", Some("hint")).to_string(), "role#hint");
    }

    #[test]
    fn test_key_equality_is_exact() {
        assert_eq!(ComponentKey::new("role", Some("a")), ComponentKey::new("role", Some("a")));
        assert_ne!(ComponentKey::new("role", Some("a")), ComponentKey::new("role", Some("A")));
        assert_ne!(ComponentKey::role_only("role"), ComponentKey::new("role", Some("default")));
    }

    #[test]
    fn test_parse() {
        assert_eq!(ComponentKey::parse("role#hint"), Some(ComponentKey::new("role", Some("hint"))));
        assert_eq!(ComponentKey::parse("role"), Some(ComponentKey::role_only("role")));
        assert_eq!(ComponentKey::parse("role#"), Some(ComponentKey::role_only("role")));
        assert_eq!(ComponentKey::parse("#hint"), None);
        assert_eq!(ComponentKey::parse(""), None);
    }

    #[test]
    fn test_default_hint_alternate() {
        let bare = ComponentKey::role_only("role");
        let explicit = ComponentKey::new("role", Some(DEFAULT_HINT));
        assert_eq!(bare.default_hint_alternate(), Some(explicit.clone()));
        assert_eq!(explicit.default_hint_alternate(), Some(bare));
        assert_eq!(ComponentKey::new("role", Some("x")).default_hint_alternate(), None);
    }

    #[test]
    fn test_blank_hint_is_no_hint() {
        let blank = ComponentKey::new("role", Some("  "));
        assert_eq!(blank, ComponentKey::role_only("role"));
        assert_eq!(blank.hint(), None);
        assert_eq!(blank.default_hint_alternate(), Some(ComponentKey::new("role", Some(DEFAULT_HINT))));
    }

    #[test]
    fn test_literal_hint() {
        assert_eq!(literal_hint("_x_"), Some("x"));
        assert_eq!(literal_hint("_remote_"), Some("remote"));
        assert_eq!(literal_hint("__"), None);
        assert_eq!(literal_hint("_x"), None);
        assert_eq!(literal_hint("x_"), None);
    }

    #[test]
    fn test_raw_key() {
        assert_eq!(ComponentKey::new("role", Some("hint")).raw().key(), "role#hint_");
        assert_eq!(ComponentKey::role_only("role").raw().key(), "role#default_");
    }

    #[test]
    fn test_typed_role() {
        let key = ComponentKey::of::<dyn Resolver>(None);
        assert_eq!(key.role(), "Resolver");

        let descriptor = RoleDescriptor::of::<dyn Resolver>();
        assert_eq!(descriptor.name(), "Resolver");
        assert_eq!(
            descriptor.instance_type(),
            TypeId::of::<std::sync::Arc<dyn Resolver>>()
        );
    }
}
