//! Virtual instances: registry entries filled in after registration.
//!
//! A [`VirtualInstance`] is registered while the container is being composed,
//! but its backing object may only be supplied later, possibly by a different
//! extension or from another thread. Every access re-runs the configured
//! injector against the container doing the lookup, so an instance that was
//! incomplete when it was handed over is wired up on use.
//!
//! ```rust,no_run
//! use embkit::core::Role;
//! use embkit::registry::VirtualInstance;
//! use std::sync::Arc;
//!
//! pub struct BuildSession {
//!     pub id: String,
//! }
//!
//! impl Role for BuildSession {
//!     const NAME: &'static str = "BuildSession";
//! }
//!
//! let slot = Arc::new(VirtualInstance::<BuildSession>::new());
//! slot.set_instance(Arc::new(BuildSession { id: "b-1".to_string() }));
//! assert!(slot.is_set());
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

use super::ErasedInstance;
use crate::container::Container;
use crate::core::{Result, Role, RoleDescriptor};

/// Injection callback run on every access to a virtual instance.
pub type Injector<R> = dyn Fn(&Arc<R>, &Container) -> Result<()> + Send + Sync;

/// Type-erased view of a [`VirtualInstance`] as stored in the registry.
pub trait VirtualProvider: Send + Sync {
    /// Role the provided instance is declared under.
    fn role(&self) -> RoleDescriptor;

    /// Current instance, injected against `ctx`. `None` until one is set.
    fn provide(&self, ctx: &Container) -> Result<Option<ErasedInstance>>;
}

/// A typed slot whose value is supplied after registration.
pub struct VirtualInstance<R: Role + ?Sized> {
    instance: RwLock<Option<Arc<R>>>,
    injector: Option<Box<Injector<R>>>,
}

impl<R: Role + ?Sized> VirtualInstance<R> {
    /// Empty slot without an injector.
    pub fn new() -> Self {
        Self {
            instance: RwLock::new(None),
            injector: None,
        }
    }

    /// Empty slot whose value is passed to `injector` on every access.
    pub fn with_injector<F>(injector: F) -> Self
    where
        F: Fn(&Arc<R>, &Container) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            instance: RwLock::new(None),
            injector: Some(Box::new(injector)),
        }
    }

    /// Slot that already holds `instance`.
    pub fn of(instance: Arc<R>) -> Self {
        let slot = Self::new();
        slot.set_instance(instance);
        slot
    }

    /// Supply or replace the backing instance. Safe to call while other
    /// threads are looking the slot up.
    pub fn set_instance(&self, instance: Arc<R>) {
        let mut guard = self.instance.write().unwrap_or_else(PoisonError::into_inner);
        if guard.replace(instance).is_some() {
            trace!("Replaced virtual instance for role {}", R::NAME);
        }
    }

    pub fn is_set(&self) -> bool {
        self.instance.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// The current instance after running the injector against `ctx`.
    ///
    /// The lock is released before the injector runs, so an injector may
    /// itself look up other components, including this one.
    pub fn get(&self, ctx: &Container) -> Result<Option<Arc<R>>> {
        let current = self.instance.read().unwrap_or_else(PoisonError::into_inner).clone();
        let Some(instance) = current else {
            return Ok(None);
        };
        if let Some(injector) = &self.injector {
            injector(&instance, ctx)?;
        }
        Ok(Some(instance))
    }
}

impl<R: Role + ?Sized> Default for VirtualInstance<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Role + ?Sized> fmt::Debug for VirtualInstance<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualInstance")
            .field("role", &R::NAME)
            .field("set", &self.is_set())
            .field("injector", &self.injector.is_some())
            .finish()
    }
}

impl<R: Role + ?Sized> VirtualProvider for VirtualInstance<R> {
    fn role(&self) -> RoleDescriptor {
        RoleDescriptor::of::<R>()
    }

    fn provide(&self, ctx: &Container) -> Result<Option<ErasedInstance>> {
        Ok(self.get(ctx)?.map(ErasedInstance::new))
    }
}
