//! Component selection: configurable hint substitution.
//!
//! A [`ComponentSelector`] holds override rules that map a formatted
//! `role` or `role#hint` key to a replacement hint. Extensions contribute
//! selectors, the composition root merges them (later entries win), and the
//! binder consults the result to decide which declared component owns each
//! role/hint slot.
//!
//! # Selection grammar
//!
//! | Configured | Meaning |
//! |---|---|
//! | `"Resolver#local" = "remote"` | lookups of `Resolver#local` get `remote` |
//! | `"Resolver" = "remote"` | lookups of the default `Resolver` get `remote` |
//! | `"Resolver#legacy" = "#"` | `Resolver#legacy` selects nothing |
//! | `"Resolver" = "#"` | no non-literal hint of `Resolver` is selected |
//! | `"Resolver#a" = "_b_"` | `b`, marked literal (never substituted again) |
//!
//! A hint passed *to* [`ComponentSelector::select_role_hint`] may itself be
//! reserved: `#` selects nothing and `_name_` is returned as `name` without
//! consulting the rules.
//!
//! # Example
//!
//! ```rust
//! use embkit::selector::ComponentSelector;
//!
//! let selector: ComponentSelector =
//!     [("role#hint", "other-hint")].into_iter().collect();
//!
//! assert_eq!(selector.select_role_hint("role", Some("hint")).as_deref(), Some("other-hint"));
//! assert_eq!(selector.select_role_hint("role", Some("_hint_")).as_deref(), Some("hint"));
//! assert_eq!(selector.select_role_hint("role", Some("#")), None);
//! ```

pub mod cycle;

use crate::constants::{BLANK_ROLE_HINT_PLACEHOLDER, ROLE_HINT_SEPARATOR};
use crate::core::key::{canonical_hint, is_default_hint, literal_hint};
use crate::core::{ComponentKey, EmbError, Result, Role};
use std::collections::BTreeMap;
use tracing::{debug, trace};

pub use cycle::detect_override_cycles;

/// A set of override rules keyed by formatted `role` / `role#hint` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentSelector {
    selections: BTreeMap<String, String>,
    sealed: bool,
}

impl ComponentSelector {
    /// Create an empty selector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selector from flat key/value pairs after validating each entry.
    pub fn try_from_selections<K, V, I>(selections: I) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut selector = Self::new();
        for (key, value) in selections {
            let (key, value) = (key.into(), value.into());
            validate_selection(&key, &value)?;
            selector.selections.insert(key, value);
        }
        Ok(selector)
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    /// Iterate the raw `(formatted key, value)` entries in key order.
    pub fn selections(&self) -> impl Iterator<Item = (&str, &str)> {
        self.selections.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Forbid further mutation. Merging an empty selector stays a no-op.
    pub fn seal(&mut self) {
        if !self.sealed {
            debug!("Sealing component selector with {} selection(s)", self.selections.len());
        }
        self.sealed = true;
    }

    /// Merge another selector into this one; its entries win on key collision.
    pub fn merge(&mut self, other: &ComponentSelector) -> Result<&mut Self> {
        if other.is_empty() {
            return Ok(self);
        }
        self.ensure_mutable()?;
        for (key, value) in &other.selections {
            if let Some(previous) = self.selections.insert(key.clone(), value.clone())
                && previous != *value
            {
                trace!("Selection '{key}' replaced: '{previous}' -> '{value}'");
            }
        }
        Ok(self)
    }

    /// Configure `new_hint` as the replacement for `original`.
    pub fn set_selection(&mut self, original: &ComponentKey, new_hint: &str) -> Result<&mut Self> {
        self.ensure_mutable()?;
        let key = format_key(original.role(), original.hint());
        validate_selection(&key, new_hint)?;
        self.selections.insert(key, new_hint.to_string());
        Ok(self)
    }

    /// Configure `new_hint` as the replacement for `role#old_hint` of a typed role.
    pub fn select<R: Role + ?Sized>(
        &mut self,
        old_hint: Option<&str>,
        new_hint: &str,
    ) -> Result<&mut Self> {
        self.set_selection(&ComponentKey::of::<R>(old_hint), new_hint)
    }

    /// Resolve the effective hint for a role/hint pair.
    ///
    /// Returns `None` when nothing is selected (the blank placeholder was
    /// passed or configured). An absent or blank `hint` is the default hint,
    /// so with no matching rule the result is `Some("default")`; any other
    /// hint without a matching rule is returned unchanged.
    pub fn select_role_hint(&self, role: &str, hint: Option<&str>) -> Option<String> {
        if let Some(h) = hint.filter(|h| !h.trim().is_empty()) {
            if h == BLANK_ROLE_HINT_PLACEHOLDER {
                debug!("Blank hint placeholder requested for role: '{role}'; selecting nothing.");
                return None;
            }
            if let Some(literal) = literal_hint(h) {
                debug!("Literal hint: '{literal}' for role: '{role}'; no substitution.");
                return Some(literal.to_string());
            }
        }

        match self.lookup(role, hint) {
            None => {
                debug!("No component override for role: '{role}', hint: '{hint:?}'.");
                Some(canonical_hint(hint).to_string())
            }
            Some(BLANK_ROLE_HINT_PLACEHOLDER) => {
                debug!("Selection for role: '{role}', hint: '{hint:?}' is suppressed.");
                None
            }
            Some(selected) => {
                let selected = literal_hint(selected).unwrap_or(selected);
                debug!("Replaced hint: '{hint:?}' with hint: '{selected}' for role: '{role}'.");
                Some(selected.to_string())
            }
        }
    }

    /// True when the role/hint slot has been configured to resolve to
    /// something other than itself (another hint, or nothing).
    pub fn has_override(&self, role: &str, hint: Option<&str>) -> bool {
        let hint = canonical_hint(hint);
        match self.lookup(role, Some(hint)) {
            None => false,
            Some(BLANK_ROLE_HINT_PLACEHOLDER) => true,
            Some(selected) => literal_hint(selected).unwrap_or(selected) != hint,
        }
    }

    /// Keys of other hints of `role` that are configured to be replaced by `hint`.
    ///
    /// The result is sorted and free of duplicates; `role` and `role#default`
    /// both appear as the default key.
    pub fn keys_overridden_by(&self, role: &str, hint: Option<&str>) -> Vec<ComponentKey> {
        let hint = canonical_hint(hint);
        let mut keys: Vec<ComponentKey> = self
            .override_edges()
            .filter(|(from, to)| from.role() == role && to.canonical_hint() == hint)
            .map(|(from, _)| from)
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Every configured replacement as a `(replaced, replacement)` pair of
    /// canonical keys. Suppressions and self-selections are skipped.
    pub fn override_edges(&self) -> impl Iterator<Item = (ComponentKey, ComponentKey)> + '_ {
        self.selections.iter().filter_map(|(key, value)| {
            if value == BLANK_ROLE_HINT_PLACEHOLDER {
                return None;
            }
            let from = ComponentKey::parse(key)?.canonical();
            let target = literal_hint(value).unwrap_or(value);
            let to = ComponentKey::new(from.role(), Some(canonical_hint(Some(target))));
            (from != to).then_some((from, to))
        })
    }

    fn lookup(&self, role: &str, hint: Option<&str>) -> Option<&str> {
        let exact = format_raw_key(role, hint);
        if let Some(selected) = self.selections.get(&exact) {
            return Some(selected);
        }
        if is_default_hint(hint)
            && let Some(selected) = self.selections.get(role)
        {
            return Some(selected);
        }
        // a bare-role placeholder suppresses every hint of the role
        match self.selections.get(role) {
            Some(selected) if selected == BLANK_ROLE_HINT_PLACEHOLDER => Some(selected),
            _ => None,
        }
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.sealed {
            return Err(EmbError::Sealed {
                what: "component selector".to_string(),
            });
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ComponentSelector {
    /// Collect without validation; use [`ComponentSelector::try_from_selections`]
    /// for untrusted input.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            selections: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            sealed: false,
        }
    }
}

/// `role` for default/blank hints, `role#hint` otherwise.
pub fn format_key(role: &str, hint: Option<&str>) -> String {
    if is_default_hint(hint) {
        role.to_string()
    } else {
        format_raw_key(role, hint)
    }
}

fn format_raw_key(role: &str, hint: Option<&str>) -> String {
    match hint.filter(|h| !h.trim().is_empty()) {
        Some(h) => format!("{role}{ROLE_HINT_SEPARATOR}{h}"),
        None => role.to_string(),
    }
}

/// Check one selection entry; errors name the offending key.
pub fn validate_selection(key: &str, value: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(EmbError::config("selection with an empty key"));
    }
    if key.starts_with(ROLE_HINT_SEPARATOR) {
        return Err(EmbError::config(format!("selection '{key}' has an empty role")));
    }
    if key.ends_with(ROLE_HINT_SEPARATOR) {
        return Err(EmbError::config(format!("selection '{key}' has an empty hint")));
    }
    if value.trim().is_empty() {
        return Err(EmbError::config(format!("selection '{key}' has an empty replacement hint")));
    }
    Ok(())
}
