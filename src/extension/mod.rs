//! Extensions: the unit in which component contributions are packaged.
//!
//! An [`Extension`] bundles everything one library contributes to a
//! container:
//!
//! - selections declaring which role/hints it overrides
//! - explicit and virtual instances
//! - component declarations, with the implementations that build them
//! - decorators for components of any extension
//!
//! The composition root ([`crate::container::ContainerBuilder`]) merges
//! extensions in registration order. Selections and instances from later
//! extensions win on key collision; all declarations are retained and the
//! binder decides which one is active.
//!
//! ```rust,no_run
//! use embkit::core::Role;
//! use embkit::extension::Extension;
//! use std::sync::Arc;
//!
//! pub trait MirrorSelector: Send + Sync {
//!     fn mirror_for(&self, repository: &str) -> Option<String>;
//! }
//!
//! impl Role for dyn MirrorSelector {
//!     const NAME: &'static str = "MirrorSelector";
//! }
//!
//! struct CorporateMirror;
//!
//! impl MirrorSelector for CorporateMirror {
//!     fn mirror_for(&self, _repository: &str) -> Option<String> {
//!         Some("https://mirror.example.com/maven2".to_string())
//!     }
//! }
//!
//! # fn main() -> embkit::core::Result<()> {
//! let extension = Extension::new("corp-mirror", "Corporate Mirror", "1.2.0")
//!     .component::<dyn MirrorSelector, _>(Some("corp"), "CorporateMirror", |_| {
//!         Ok(Arc::new(CorporateMirror) as Arc<dyn MirrorSelector>)
//!     })
//!     .select::<dyn MirrorSelector>(None, "corp")?;
//! assert_eq!(extension.label(), "Corporate Mirror: 1.2.0");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::component::{ComponentDeclaration, Decorator, ImplementationCatalog, InstantiationStrategy};
use crate::container::Container;
use crate::core::{ComponentKey, Result, Role};
use crate::registry::{InstanceRegistry, VirtualInstance};
use crate::selector::{ComponentSelector, validate_selection};

/// Identity of a registered extension.
///
/// The container registers one instance per extension under
/// `(ExtensionInfo, id)`, so components can discover what is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionInfo {
    id: String,
    name: String,
    version: String,
}

impl Role for ExtensionInfo {
    const NAME: &'static str = "ExtensionInfo";
}

impl ExtensionInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `name: version`
    pub fn label(&self) -> String {
        format!("{}: {}", self.name, self.version)
    }
}

impl fmt::Display for ExtensionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.id)
    }
}

/// Everything one extension contributes to a container.
#[derive(Debug, Clone)]
pub struct Extension {
    info: ExtensionInfo,
    selector: ComponentSelector,
    registry: InstanceRegistry,
    declarations: Vec<ComponentDeclaration>,
    catalog: ImplementationCatalog,
    decorators: Vec<Decorator>,
}

impl Extension {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ExtensionInfo::new(id, name, version),
            selector: ComponentSelector::new(),
            registry: InstanceRegistry::new(),
            declarations: Vec::new(),
            catalog: ImplementationCatalog::new(),
            decorators: Vec::new(),
        }
    }

    pub fn info(&self) -> &ExtensionInfo {
        &self.info
    }

    pub fn id(&self) -> &str {
        self.info.id()
    }

    pub fn label(&self) -> String {
        self.info.label()
    }

    pub fn selector(&self) -> &ComponentSelector {
        &self.selector
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn declarations(&self) -> &[ComponentDeclaration] {
        &self.declarations
    }

    pub fn catalog(&self) -> &ImplementationCatalog {
        &self.catalog
    }

    pub fn decorators(&self) -> &[Decorator] {
        &self.decorators
    }

    /// Configure `role#old_hint` to be replaced by `new_hint`.
    pub fn select<R: Role + ?Sized>(mut self, old_hint: Option<&str>, new_hint: &str) -> Result<Self> {
        self.selector.select::<R>(old_hint, new_hint)?;
        Ok(self)
    }

    /// Add a raw `role` / `role#hint` selection entry.
    pub fn with_selection(mut self, key: &str, new_hint: &str) -> Result<Self> {
        validate_selection(key, new_hint)?;
        let original = ComponentKey::parse(key).unwrap_or_else(|| ComponentKey::role_only(key));
        self.selector.set_selection(&original, new_hint)?;
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
    pub fn declare(mut self, declaration: ComponentDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Make an implementation available by name without declaring a component.
    #[must_use]
    pub fn provide<R, F>(mut self, implementation: &str, factory: F) -> Self
    where
        R: Role + ?Sized,
        F: Fn(&Container) -> Result<Arc<R>> + Send + Sync + 'static,
    {
        self.catalog.provide::<R, F>(implementation, factory);
        self
    }

    /// Declare a singleton component and provide its implementation.
    #[must_use]
    pub fn component<R, F>(self, hint: Option<&str>, implementation: &str, factory: F) -> Self
    where
        R: Role + ?Sized,
        F: Fn(&Container) -> Result<Arc<R>> + Send + Sync + 'static,
    {
        self.component_with::<R, F>(hint, implementation, InstantiationStrategy::Singleton, factory)
    }

    /// Declare a component with an explicit strategy and provide its implementation.
    #[must_use]
    pub fn component_with<R, F>(
        self,
        hint: Option<&str>,
        implementation: &str,
        strategy: InstantiationStrategy,
        factory: F,
    ) -> Self
    where
        R: Role + ?Sized,
        F: Fn(&Container) -> Result<Arc<R>> + Send + Sync + 'static,
    {
        self.declare(ComponentDeclaration::of::<R>(hint, implementation).with_strategy(strategy))
            .provide::<R, F>(implementation, factory)
    }

    #[must_use]
    pub fn with_decorator<R, F>(mut self, hint: Option<&str>, decorate: F) -> Self
    where
        R: Role + ?Sized,
        F: Fn(Arc<R>) -> Arc<R> + Send + Sync + 'static,
    {
        self.decorators.push(Decorator::new::<R, F>(hint, decorate));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        let info = ExtensionInfo::new("ext", "Example", "0.1.0");
        assert_eq!(info.label(), "Example: 0.1.0");
        assert_eq!(info.to_string(), "Example: 0.1.0 (ext)");
    }

    #[test]
    fn test_contributions_accumulate() {
        let extension = Extension::new("ext", "Example", "0.1.0")
            .component::<ExtensionInfo, _>(Some("a"), "InfoA", |_| {
                Ok(Arc::new(ExtensionInfo::new("a", "A", "1")))
            })
            .declare(ComponentDeclaration::of::<ExtensionInfo>(Some("b"), "InfoB"))
            .with_selection("ExtensionInfo#b", "a")
            .unwrap()
            .with_instance::<ExtensionInfo>(Some("c"), Arc::new(ExtensionInfo::new("c", "C", "1")))
            .unwrap();

        assert_eq!(extension.declarations().len(), 2);
        assert!(extension.catalog().contains("InfoA"));
        assert!(!extension.catalog().contains("InfoB"));
        assert_eq!(extension.selector().len(), 1);
        assert!(extension.registry().has(&ComponentKey::of::<ExtensionInfo>(Some("c"))));
    }

    #[test]
    fn test_invalid_selection_is_rejected() {
        let result = Extension::new("ext", "Example", "0.1.0").with_selection("#hint", "x");
        assert!(result.is_err());
    }
}
