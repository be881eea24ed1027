//! The component container and its composition root.
//!
//! [`ContainerBuilder`] collects extensions, selections, instances and
//! declarations; [`ContainerBuilder::build`] checks the override graph for
//! cycles, binds every declaration, seals the selector and registry, and
//! creates load-on-start components. The resulting [`Container`] is immutable
//! apart from its singleton cache and can be shared across threads.
//!
//! # Lookup order
//!
//! For `lookup(role, hint)`:
//!
//! 1. The instance registry, under the requested key (then the other spelling
//!    of the default hint).
//! 2. The selector maps the hint to the effective hint. A suppressed slot fails
//!    with [`EmbError::SelectionSuppressed`]. If the effective hint differs, the
//!    registry is consulted again under it.
//! 3. The binding table, following aliases. A literal hint (`_x_`) first tries
//!    the raw binding of `x`, reaching the component that `x` was overridden
//!    away from.
//! 4. The binding's scope decides whether a cached instance is returned or a
//!    new one is built through the implementation catalog, with decorators
//!    applied.
//!
//! Factories and virtual-instance injectors receive the container as their
//! context, so components resolve their own dependencies through it.

mod builder;

use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::binder::{Binding, BindingTable};
use crate::component::{Decorator, ImplementationCatalog};
use crate::core::key::{canonical_hint, literal_hint};
use crate::core::{ComponentKey, EmbError, Result, Role};
use crate::extension::ExtensionInfo;
use crate::registry::{ErasedInstance, InstanceRegistry};
use crate::selector::ComponentSelector;

pub use builder::ContainerBuilder;

/// A built, sealed component container.
pub struct Container {
    selector: ComponentSelector,
    registry: InstanceRegistry,
    bindings: BindingTable,
    catalog: ImplementationCatalog,
    decorators: HashMap<ComponentKey, Vec<Decorator>>,
    singletons: DashMap<ComponentKey, ErasedInstance>,
    extensions: Vec<ExtensionInfo>,
}

impl Container {
    /// Start composing a container.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub fn selector(&self) -> &ComponentSelector {
        &self.selector
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Extensions in registration order.
    pub fn extensions(&self) -> &[ExtensionInfo] {
        &self.extensions
    }

    /// Look up the component for the typed role `R`.
    pub fn lookup<R: Role + ?Sized>(&self, hint: Option<&str>) -> Result<Arc<R>> {
        let instance = self.lookup_erased(R::NAME, hint)?;
        downcast_role::<R>(instance, hint)
    }

    /// Like [`Container::lookup`], but a missing or suppressed component is `Ok(None)`.
    ///
    /// Only a miss on the requested key itself is absorbed. Errors raised while
    /// the component is built, including failed lookups made by its factory,
    /// are returned.
    pub fn try_lookup<R: Role + ?Sized>(&self, hint: Option<&str>) -> Result<Option<Arc<R>>> {
        match self.find_erased(R::NAME, hint)? {
            Resolution::Found(instance) => downcast_role::<R>(instance, hint).map(Some),
            Resolution::Missing(miss) => {
                trace!("No component for {}: {miss}", R::NAME);
                Ok(None)
            }
        }
    }

    /// Look up a component by role name.
    pub fn lookup_erased(&self, role: &str, hint: Option<&str>) -> Result<ErasedInstance> {
        match self.find_erased(role, hint)? {
            Resolution::Found(instance) => Ok(instance),
            Resolution::Missing(miss) => Err(miss),
        }
    }

    fn find_erased(&self, role: &str, hint: Option<&str>) -> Result<Resolution> {
        let literal = hint.and_then(literal_hint);
        let requested = ComponentKey::new(role, literal.or(hint));

        if let Some(instance) = self.registry.get_erased(&requested, self)? {
            trace!("Resolved {requested} from the instance registry");
            return Ok(Resolution::Found(instance));
        }

        let Some(selected) = self.selector.select_role_hint(role, hint) else {
            return Ok(Resolution::Missing(EmbError::SelectionSuppressed {
                role: role.to_string(),
                hint: canonical_hint(hint).to_string(),
            }));
        };
        let selected_key = ComponentKey::new(role, Some(selected.as_str())).canonical();

        if selected_key != requested.canonical()
            && let Some(instance) = self.registry.get_erased(&selected_key, self)?
        {
            trace!("Resolved {requested} from the instance registry as {selected_key}");
            return Ok(Resolution::Found(instance));
        }

        let binding = match literal {
            Some(_) => match self.bindings.resolve(&selected_key.raw())? {
                Some(binding) => Some(binding),
                None => self.bindings.resolve(&selected_key)?,
            },
            None => self.bindings.resolve(&selected_key)?,
        };

        match binding {
            Some(binding) => self.instance_for(binding).map(Resolution::Found),
            None => Ok(Resolution::Missing(EmbError::ComponentNotFound {
                role: role.to_string(),
                hint: selected,
            })),
        }
    }

    /// True when a lookup of `role`/`hint` would find something to return.
    ///
    /// Does not instantiate anything, so a deferred implementation that is
    /// missing from the catalog still counts.
    pub fn has_component(&self, role: &str, hint: Option<&str>) -> bool {
        let literal = hint.and_then(literal_hint);
        if self.registry.has(&ComponentKey::new(role, literal.or(hint))) {
            return true;
        }
        let Some(selected) = self.selector.select_role_hint(role, hint) else {
            return false;
        };
        let selected_key = ComponentKey::new(role, Some(selected.as_str())).canonical();
        if self.registry.has(&selected_key) {
            return true;
        }
        let raw = literal.is_some() && matches!(self.bindings.resolve(&selected_key.raw()), Ok(Some(_)));
        raw || matches!(self.bindings.resolve(&selected_key), Ok(Some(_)))
    }

    /// Produce the instance for a concrete binding, honouring its scope.
    pub(crate) fn instance_for(&self, binding: &Binding) -> Result<ErasedInstance> {
        if !binding.scope.is_shared() {
            return self.instantiate(binding);
        }
        if let Some(existing) = self.singletons.get(&binding.key) {
            return Ok(existing.value().clone());
        }
        let created = self.instantiate(binding)?;
        // a concurrent first lookup may have won; keep whichever landed first
        let shared = self.singletons.entry(binding.key.clone()).or_insert(created).value().clone();
        Ok(shared)
    }

    fn instantiate(&self, binding: &Binding) -> Result<ErasedInstance> {
        let role = binding.key.role();
        let name = binding.target.implementation().ok_or_else(|| EmbError::AliasLoop {
            key: binding.key.to_string(),
        })?;
        let implementation = self.catalog.get(name).ok_or_else(|| EmbError::ImplementationNotFound {
            implementation: name.to_string(),
            role: role.to_string(),
        })?;
        if implementation.role().name() != role {
            return Err(EmbError::InstantiationFailed {
                role: role.to_string(),
                hint: binding.source.canonical_hint().to_string(),
                reason: format!("implementation '{name}' builds {}", implementation.role().name()),
            });
        }

        debug!("Instantiating {} for {} ({})", name, binding.key, binding.scope);
        let mut instance = implementation.instantiate(self)?;
        if let Some(decorators) = self.decorators.get(&binding.source) {
            for decorator in decorators {
                instance = decorator.apply(instance)?;
            }
        }
        Ok(instance)
    }
}

/// Outcome of resolving one role/hint. `Missing` carries the error a plain
/// lookup reports for a miss on that key.
enum Resolution {
    Found(ErasedInstance),
    Missing(EmbError),
}

fn downcast_role<R: Role + ?Sized>(instance: ErasedInstance, hint: Option<&str>) -> Result<Arc<R>> {
    instance.downcast::<R>().ok_or_else(|| EmbError::InstantiationFailed {
        role: R::NAME.to_string(),
        hint: canonical_hint(hint).to_string(),
        reason: format!(
            "expected an instance of {}, found {}",
            std::any::type_name::<R>(),
            instance.type_name()
        ),
    })
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("selections", &self.selector.len())
            .field("instances", &self.registry.len())
            .field("bindings", &self.bindings.len())
            .field("singletons", &self.singletons.len())
            .field("extensions", &self.extensions)
            .finish()
    }
}
