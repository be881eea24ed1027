//! Selection-aware binding of declared components.
//!
//! When a container is built, [`SelectingBinder`] walks every
//! [`ComponentDeclaration`] and decides how it is bound, based on the merged
//! [`ComponentSelector`]:
//!
//! | State | When | Bound under |
//! |---|---|---|
//! | [`BindingState::Unselected`] | something else replaces this role/hint | the raw key `role#hint_` only |
//! | [`BindingState::SelectedPlain`] | active, replaces nothing | `role#hint` |
//! | [`BindingState::SelectedWithAliases`] | active and configured to replace other hints | `role#hint`, plus one alias per replaced key |
//!
//! Raw keys are never produced by the selector, so an overridden component is
//! only reachable through a literal lookup (`_hint_`), which is how an
//! overriding component delegates to the one it replaced.
//!
//! Aliases always point at a concrete binding, never at another alias. Chains
//! of overrides (`a → b → c`) still resolve because the selector maps `a` to
//! `b` and the alias at `b` leads to `c`.
//!
//! # Duplicates
//!
//! Repeating an identical declaration is skipped with a warning. Two different
//! implementations claiming the same key fail with
//! [`EmbError::DuplicateBinding`].

use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::component::{ComponentDeclaration, ImplementationCatalog, InstantiationStrategy};
use crate::core::{ComponentKey, EmbError, Result};
use crate::selector::ComponentSelector;

/// How a declared component ended up bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingState {
    /// Replaced by another component; bound only under its raw key.
    Unselected,
    /// The active implementation for its own role/hint.
    SelectedPlain,
    /// Active, and also the target of one or more overrides.
    SelectedWithAliases,
}

impl BindingState {
    pub fn is_selected(&self) -> bool {
        !matches!(self, Self::Unselected)
    }
}

impl fmt::Display for BindingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unselected => "unselected",
            Self::SelectedPlain => "selected",
            Self::SelectedWithAliases => "selected+aliases",
        })
    }
}

/// Instance lifetime of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Created while the container is built and shared afterwards.
    EagerSingleton,
    /// Created on first lookup and shared afterwards.
    Singleton,
    /// Created on every lookup.
    PerLookup,
}

impl Scope {
    pub fn for_strategy(strategy: InstantiationStrategy) -> Self {
        match strategy {
            InstantiationStrategy::LoadOnStart => Self::EagerSingleton,
            InstantiationStrategy::Singleton => Self::Singleton,
            InstantiationStrategy::PerLookup => Self::PerLookup,
        }
    }

    pub fn is_shared(&self) -> bool {
        !matches!(self, Self::PerLookup)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EagerSingleton => "eager-singleton",
            Self::Singleton => "singleton",
            Self::PerLookup => "per-lookup",
        })
    }
}

/// What a binding key resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingTarget {
    /// The role is its own implementation.
    Direct {
        implementation: String,
    },
    /// Implementation was present in the catalog when the component was bound.
    Loaded {
        implementation: String,
    },
    /// Implementation is looked up by name on first use and may be absent.
    Deferred {
        implementation: String,
    },
    /// Redirect to another binding key.
    Alias(ComponentKey),
}

impl BindingTarget {
    /// Implementation name, or `None` for aliases.
    pub fn implementation(&self) -> Option<&str> {
        match self {
            Self::Direct {
                implementation,
            }
            | Self::Loaded {
                implementation,
            }
            | Self::Deferred {
                implementation,
            } => Some(implementation),
            Self::Alias(_) => None,
        }
    }
}

impl fmt::Display for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct {
                implementation,
            } => write!(f, "{implementation} (direct)"),
            Self::Loaded {
                implementation,
            } => write!(f, "{implementation}"),
            Self::Deferred {
                implementation,
            } => write!(f, "{implementation} (deferred)"),
            Self::Alias(key) => write!(f, "alias of {key}"),
        }
    }
}

/// One entry of the binding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Key lookups use to reach this binding.
    pub key: ComponentKey,
    pub target: BindingTarget,
    pub scope: Scope,
    pub state: BindingState,
    /// Key of the declaration that produced this binding.
    pub source: ComponentKey,
}

impl Binding {
    pub fn is_alias(&self) -> bool {
        matches!(self.target, BindingTarget::Alias(_))
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<17} {} -> {} [{}]", self.state.to_string(), self.key, self.target, self.scope)
    }
}

/// Bindings in the order they were produced, indexed by key.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    bindings: Vec<Binding>,
    index: HashMap<ComponentKey, usize>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn get(&self, key: &ComponentKey) -> Option<&Binding> {
        self.index.get(key).map(|&i| &self.bindings[i])
    }

    pub fn contains(&self, key: &ComponentKey) -> bool {
        self.index.contains_key(key)
    }

    /// Follow aliases from `key` to a concrete binding.
    ///
    /// `Ok(None)` when nothing is bound at `key` or at the end of its alias
    /// chain. A chain longer than the table itself is an [`EmbError::AliasLoop`].
    pub fn resolve(&self, key: &ComponentKey) -> Result<Option<&Binding>> {
        let mut current = key;
        for _ in 0..=self.bindings.len() {
            match self.get(current) {
                Some(Binding {
                    target: BindingTarget::Alias(next),
                    ..
                }) => current = next,
                other => return Ok(other),
            }
        }
        Err(EmbError::AliasLoop {
            key: key.to_string(),
        })
    }

    /// Add a binding. An identical binding is skipped; a conflicting one is an error.
    pub fn insert(&mut self, binding: Binding) -> Result<()> {
        if let Some(existing) = self.get(&binding.key) {
            if existing.target == binding.target && existing.source == binding.source {
                warn!("Skipping duplicate declaration of {} ({})", binding.key, binding.target);
                return Ok(());
            }
            return Err(EmbError::DuplicateBinding {
                key: binding.key.to_string(),
                existing: existing.target.to_string(),
                rejected: binding.target.to_string(),
            });
        }
        self.index.insert(binding.key.clone(), self.bindings.len());
        self.bindings.push(binding);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a BindingTable {
    type Item = &'a Binding;
    type IntoIter = std::slice::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

/// Binds declarations according to a selector.
#[derive(Debug, Clone, Copy)]
pub struct SelectingBinder<'a> {
    selector: &'a ComponentSelector,
}

impl<'a> SelectingBinder<'a> {
    pub fn new(selector: &'a ComponentSelector) -> Self {
        Self {
            selector,
        }
    }

    /// Decide the binding state of a declaration.
    pub fn state_of(&self, declaration: &ComponentDeclaration) -> BindingState {
        let (role, hint) = (declaration.role(), declaration.hint());
        if self.selector.has_override(role, hint) {
            BindingState::Unselected
        } else if self.selector.keys_overridden_by(role, hint).is_empty() {
            BindingState::SelectedPlain
        } else {
            BindingState::SelectedWithAliases
        }
    }

    /// Bind every declaration, in order.
    pub fn bind(
        &self,
        declarations: &[ComponentDeclaration],
        catalog: &ImplementationCatalog,
    ) -> Result<BindingTable> {
        let mut table = BindingTable::new();
        for declaration in declarations {
            self.bind_component(declaration, catalog, &mut table)?;
        }
        debug!("Bound {} declaration(s) into {} binding(s)", declarations.len(), table.len());
        Ok(table)
    }

    /// Bind one declaration into `table`, returning its state.
    pub fn bind_component(
        &self,
        declaration: &ComponentDeclaration,
        catalog: &ImplementationCatalog,
        table: &mut BindingTable,
    ) -> Result<BindingState> {
        let state = self.state_of(declaration);
        let root = declaration.key().canonical();
        let scope = Scope::for_strategy(declaration.strategy());
        let target = Self::target_for(declaration, catalog);

        debug!("Component {root} ({}) is {state}", declaration.implementation());

        if state == BindingState::Unselected {
            table.insert(Binding {
                key: root.raw(),
                target,
                scope,
                state,
                source: root,
            })?;
            return Ok(state);
        }

        table.insert(Binding {
            key: root.clone(),
            target,
            scope,
            state,
            source: root.clone(),
        })?;

        if state == BindingState::SelectedWithAliases {
            for overridden in self.selector.keys_overridden_by(root.role(), root.hint()) {
                debug!("Aliasing {overridden} to {root}");
                table.insert(Binding {
                    key: overridden,
                    target: BindingTarget::Alias(root.clone()),
                    scope,
                    state,
                    source: root.clone(),
                })?;
            }
        }
        Ok(state)
    }

    fn target_for(declaration: &ComponentDeclaration, catalog: &ImplementationCatalog) -> BindingTarget {
        let implementation = declaration.implementation().to_string();
        if declaration.is_self_bound() {
            BindingTarget::Direct {
                implementation,
            }
        } else if declaration.strategy() == InstantiationStrategy::LoadOnStart
            || catalog.contains(&implementation)
        {
            BindingTarget::Loaded {
                implementation,
            }
        } else {
            BindingTarget::Deferred {
                implementation,
            }
        }
    }
}
