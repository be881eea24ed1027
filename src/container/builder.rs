//! Composition root for [`Container`].

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::Container;
use crate::binder::{Scope, SelectingBinder};
use crate::component::{ComponentDeclaration, Decorator, ImplementationCatalog};
use crate::config::EmbConfig;
use crate::core::{ComponentKey, Result, Role};
use crate::extension::{Extension, ExtensionInfo};
use crate::registry::{InstanceRegistry, VirtualInstance};
use crate::selector::{ComponentSelector, detect_override_cycles, validate_selection};

/// Collects contributions and builds a [`Container`].
///
/// Contributions are merged in the order they are added: selections and
/// instances added later replace earlier ones with the same key, while every
/// component declaration is kept for the binder.
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    selector: ComponentSelector,
    registry: InstanceRegistry,
    declarations: Vec<ComponentDeclaration>,
    catalog: ImplementationCatalog,
    decorators: Vec<Decorator>,
    extensions: Vec<ExtensionInfo>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an extension's selections, instances, declarations,
    /// implementations, and decorators, and register its [`ExtensionInfo`].
    pub fn with_extension(mut self, extension: Extension) -> Result<Self> {
        info!("Loading extension {}", extension.label());
        self.selector.merge(extension.selector())?;
        self.registry.override_merge(extension.registry())?;
        self.registry.add::<ExtensionInfo>(Some(extension.id()), Arc::new(extension.info().clone()))?;
        self.declarations.extend_from_slice(extension.declarations());
        self.catalog.merge(extension.catalog());
        self.decorators.extend_from_slice(extension.decorators());
        self.extensions.push(extension.info().clone());
        Ok(self)
    }

    pub fn with_selector(mut self, selector: &ComponentSelector) -> Result<Self> {
        self.selector.merge(selector)?;
        Ok(self)
    }

    /// Add a raw `role` / `role#hint` selection entry.
    pub fn with_selection(mut self, key: &str, new_hint: &str) -> Result<Self> {
        validate_selection(key, new_hint)?;
        let original = ComponentKey::parse(key).unwrap_or_else(|| ComponentKey::role_only(key));
        self.selector.set_selection(&original, new_hint)?;
        Ok(self)
    }

    pub fn with_registry(mut self, registry: &InstanceRegistry) -> Result<Self> {
        self.registry.override_merge(registry)?;
        Ok(self)
    }

    pub fn with_instance<R: Role + ?Sized>(mut self, hint: Option<&str>, instance: Arc<R>) -> Result<Self> {
        self.registry.add::<R>(hint, instance)?;
        Ok(self)
    }

    pub fn with_virtual<R: Role + ?Sized>(
        mut self,
        hint: Option<&str>,
        slot: Arc<VirtualInstance<R>>,
    ) -> Result<Self> {
        self.registry.add_virtual::<R>(hint, slot)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_declaration(mut self, declaration: ComponentDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    #[must_use]
    pub fn with_implementation<R, F>(mut self, name: &str, factory: F) -> Self
    where
        R: Role + ?Sized,
        F: Fn(&Container) -> Result<Arc<R>> + Send + Sync + 'static,
    {
        self.catalog.provide::<R, F>(name, factory);
        self
    }

    /// Wrap every instance produced for `R#hint` with `decorate`.
    #[must_use]
    pub fn with_decorator<R, F>(mut self, hint: Option<&str>, decorate: F) -> Self
    where
        R: Role + ?Sized,
        F: Fn(Arc<R>) -> Arc<R> + Send + Sync + 'static,
    {
        self.decorators.push(Decorator::new::<R, F>(hint, decorate));
        self
    }

    /// Merge the selections and component declarations of a configuration file.
    pub fn with_config(mut self, config: &EmbConfig) -> Result<Self> {
        self.selector.merge(&config.selector()?)?;
        self.declarations.extend(config.declarations()?);
        Ok(self)
    }

    /// Bind, seal, and start the container.
    pub fn build(self) -> Result<Container> {
        let Self {
            mut selector,
            mut registry,
            declarations,
            catalog,
            decorators,
            extensions,
        } = self;

        detect_override_cycles(&selector)?;
        let bindings = SelectingBinder::new(&selector).bind(&declarations, &catalog)?;

        selector.seal();
        registry.seal();

        let mut by_key: HashMap<ComponentKey, Vec<Decorator>> = HashMap::new();
        for decorator in decorators {
            by_key.entry(decorator.key().clone()).or_default().push(decorator);
        }

        let container = Container {
            selector,
            registry,
            bindings,
            catalog,
            decorators: by_key,
            singletons: DashMap::new(),
            extensions,
        };

        let mut eager = 0;
        for binding in container.bindings.iter() {
            if binding.scope == Scope::EagerSingleton && !binding.is_alias() {
                container.instance_for(binding)?;
                eager += 1;
            }
        }
        if eager > 0 {
            debug!("Started {eager} load-on-start component(s)");
        }

        info!(
            "Container ready: {} extension(s), {} binding(s), {} explicit instance(s)",
            container.extensions.len(),
            container.bindings.len(),
            container.registry.len()
        );
        Ok(container)
    }
}
