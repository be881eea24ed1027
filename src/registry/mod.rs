//! Explicit instance bindings.
//!
//! An [`InstanceRegistry`] maps a [`ComponentKey`] to an object that was
//! supplied directly instead of being produced by a declared component. Every
//! container lookup consults the registry before falling through to the
//! selected component bindings.
//!
//! Entries are either plain instances or [`VirtualInstance`] slots whose value
//! is supplied later and re-injected on every access.
//!
//! # Type safety
//!
//! Typed registration ([`InstanceRegistry::add`]) cannot put a value under the
//! wrong role. At the erased boundary ([`InstanceRegistry::add_erased`]) the
//! instance's runtime type is compared with the role's declared instance type
//! and a mismatch is rejected immediately with [`EmbError::RoleMismatch`].
//!
//! # Merging
//!
//! Registries contributed by several extensions are combined with
//! [`InstanceRegistry::override_merge`]: incoming entries replace same-keyed
//! entries wholesale. After the container is built the registry is sealed.

pub mod virtual_instance;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::container::Container;
use crate::core::key::canonical_hint;
use crate::core::{ComponentKey, EmbError, Result, Role, RoleDescriptor};

pub use virtual_instance::{VirtualInstance, VirtualProvider};

/// A shared component instance with its concrete type erased.
///
/// Holds an `Arc<T>` behind `dyn Any`, so it can be recovered with
/// [`ErasedInstance::downcast`] for the same `T` it was created from.
#[derive(Clone)]
pub struct ErasedInstance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ErasedInstance {
    pub fn new<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> Self {
        Self {
            value: Arc::new(instance),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// `TypeId` of the wrapped `Arc<T>`.
    pub fn instance_type(&self) -> TypeId {
        (*self.value).type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_instance_of(&self, role: &RoleDescriptor) -> bool {
        self.instance_type() == role.instance_type()
    }

    pub fn downcast<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }
}

impl fmt::Debug for ErasedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedInstance").field("type", &self.type_name).finish()
    }
}

/// A single registry entry.
#[derive(Clone)]
pub enum RegistryEntry {
    /// Directly supplied instance.
    Instance(ErasedInstance),
    /// Slot filled in after registration.
    Virtual(Arc<dyn VirtualProvider>),
}

impl RegistryEntry {
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual(_))
    }

    /// The entry's instance, injecting virtual slots against `ctx`.
    pub fn resolve(&self, ctx: &Container) -> Result<Option<ErasedInstance>> {
        match self {
            Self::Instance(instance) => Ok(Some(instance.clone())),
            Self::Virtual(provider) => provider.provide(ctx),
        }
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(instance) => f.debug_tuple("Instance").field(instance).finish(),
            Self::Virtual(provider) => f.debug_tuple("Virtual").field(&provider.role().name()).finish(),
        }
    }
}

/// Explicit instance bindings keyed by role and hint.
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
    entries: HashMap<ComponentKey, RegistryEntry>,
    sealed: bool,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn seal(&mut self) {
        if !self.sealed {
            debug!("Sealing instance registry with {} entr(ies)", self.entries.len());
        }
        self.sealed = true;
    }

    /// Keys of all entries, sorted.
    pub fn keys(&self) -> Vec<&ComponentKey> {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        keys
    }

    /// Register `instance` for the typed role `R`.
    pub fn add<R: Role + ?Sized>(&mut self, hint: Option<&str>, instance: Arc<R>) -> Result<&mut Self> {
        self.insert(ComponentKey::of::<R>(hint), RegistryEntry::Instance(ErasedInstance::new(instance)))
    }

    /// Register an erased instance under `role`.
    ///
    /// Fails with [`EmbError::RoleMismatch`] if the instance was not created
    /// from an `Arc` of the role's type.
    pub fn add_erased(
        &mut self,
        role: RoleDescriptor,
        hint: Option<&str>,
        instance: ErasedInstance,
    ) -> Result<&mut Self> {
        if !instance.is_instance_of(&role) {
            return Err(EmbError::RoleMismatch {
                role: role.name().to_string(),
                hint: canonical_hint(hint).to_string(),
                actual: instance.type_name().to_string(),
            });
        }
        self.insert(ComponentKey::new(role.name(), hint), RegistryEntry::Instance(instance))
    }

    /// Register a virtual slot for the typed role `R`.
    pub fn add_virtual<R: Role + ?Sized>(
        &mut self,
        hint: Option<&str>,
        slot: Arc<VirtualInstance<R>>,
    ) -> Result<&mut Self> {
        self.insert(ComponentKey::of::<R>(hint), RegistryEntry::Virtual(slot))
    }

    /// Register an erased virtual provider under `role`.
    pub fn add_virtual_erased(
        &mut self,
        role: RoleDescriptor,
        hint: Option<&str>,
        provider: Arc<dyn VirtualProvider>,
    ) -> Result<&mut Self> {
        let provided = provider.role();
        if provided.instance_type() != role.instance_type() {
            return Err(EmbError::RoleMismatch {
                role: role.name().to_string(),
                hint: canonical_hint(hint).to_string(),
                actual: provided.type_name().to_string(),
            });
        }
        self.insert(ComponentKey::new(role.name(), hint), RegistryEntry::Virtual(provider))
    }

    /// The entry for `key`, trying the other spelling of the default hint
    /// when there is no exact match.
    pub fn entry(&self, key: &ComponentKey) -> Option<&RegistryEntry> {
        self.entries.get(key).or_else(|| {
            key.default_hint_alternate().and_then(|alternate| self.entries.get(&alternate))
        })
    }

    pub fn has(&self, key: &ComponentKey) -> bool {
        self.entry(key).is_some()
    }

    /// Resolve the erased instance registered for `key`.
    ///
    /// `Ok(None)` means nothing is registered, or a virtual slot has no value
    /// yet; both are misses the caller falls through on.
    pub fn get_erased(&self, key: &ComponentKey, ctx: &Container) -> Result<Option<ErasedInstance>> {
        match self.entry(key) {
            Some(entry) => entry.resolve(ctx),
            None => Ok(None),
        }
    }

    /// Resolve the instance registered for the typed role `R`.
    pub fn get<R: Role + ?Sized>(&self, hint: Option<&str>, ctx: &Container) -> Result<Option<Arc<R>>> {
        let key = ComponentKey::of::<R>(hint);
        match self.get_erased(&key, ctx)? {
            Some(instance) => instance.downcast::<R>().map(Some).ok_or_else(|| EmbError::RoleMismatch {
                role: R::NAME.to_string(),
                hint: key.canonical_hint().to_string(),
                actual: instance.type_name().to_string(),
            }),
            None => Ok(None),
        }
    }

    /// Copy every entry of `other` into this registry, replacing same-keyed entries.
    pub fn override_merge(&mut self, other: &InstanceRegistry) -> Result<&mut Self> {
        if other.is_empty() {
            return Ok(self);
        }
        self.ensure_mutable()?;
        for (key, entry) in &other.entries {
            if self.entries.insert(key.clone(), entry.clone()).is_some() {
                trace!("Instance registry entry {key} overridden by merge");
            }
        }
        Ok(self)
    }

    fn insert(&mut self, key: ComponentKey, entry: RegistryEntry) -> Result<&mut Self> {
        self.ensure_mutable()?;
        trace!("Registering {} instance for {key}", if entry.is_virtual() { "virtual" } else { "explicit" });
        self.entries.insert(key, entry);
        Ok(self)
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.sealed {
            return Err(EmbError::Sealed {
                what: "instance registry".to_string(),
            });
        }
        Ok(())
    }
}
