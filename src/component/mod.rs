//! Component declarations, implementation catalogs, and decorators.
//!
//! A [`ComponentDeclaration`] names a role/hint slot and the implementation
//! that can fill it, by name. The code that actually builds the instance lives
//! in an [`ImplementationCatalog`] under that same name. Keeping the two apart
//! lets a declaration refer to an implementation that is not available when the
//! container is bound; only a lookup of that component then fails.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::container::Container;
use crate::core::{ComponentKey, EmbError, Result, Role, RoleDescriptor};
use crate::registry::ErasedInstance;

/// When and how often a component is instantiated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstantiationStrategy {
    /// One shared instance, created on first lookup.
    #[default]
    Singleton,
    /// One shared instance, created while the container is built.
    LoadOnStart,
    /// A new instance for every lookup.
    PerLookup,
}

impl InstantiationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::LoadOnStart => "load-on-start",
            Self::PerLookup => "per-lookup",
        }
    }
}

impl fmt::Display for InstantiationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstantiationStrategy {
    type Err = EmbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "singleton" => Ok(Self::Singleton),
            "load-on-start" => Ok(Self::LoadOnStart),
            "per-lookup" => Ok(Self::PerLookup),
            other => Err(EmbError::config(format!(
                "unknown instantiation strategy '{other}' (expected singleton, load-on-start or per-lookup)"
            ))),
        }
    }
}

/// A component offered for a role/hint slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDeclaration {
    key: ComponentKey,
    implementation: String,
    strategy: InstantiationStrategy,
    description: Option<String>,
}

impl ComponentDeclaration {
    pub fn new(role: impl Into<String>, hint: Option<&str>, implementation: impl Into<String>) -> Self {
        Self {
            key: ComponentKey::new(role, hint),
            implementation: implementation.into(),
            strategy: InstantiationStrategy::default(),
            description: None,
        }
    }

    /// Declaration for the typed role `R`.
    pub fn of<R: Role + ?Sized>(hint: Option<&str>, implementation: impl Into<String>) -> Self {
        Self::new(R::NAME, hint, implementation)
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: InstantiationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn key(&self) -> &ComponentKey {
        &self.key
    }

    pub fn role(&self) -> &str {
        self.key.role()
    }

    pub fn hint(&self) -> Option<&str> {
        self.key.hint()
    }

    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    pub fn strategy(&self) -> InstantiationStrategy {
        self.strategy
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// True when the role names its own implementation (no indirection).
    pub fn is_self_bound(&self) -> bool {
        self.implementation == self.key.role()
    }
}

type Factory = dyn Fn(&Container) -> Result<ErasedInstance> + Send + Sync;

/// A named way of building instances of one role.
#[derive(Clone)]
pub struct Implementation {
    name: String,
    role: RoleDescriptor,
    factory: Arc<Factory>,
}

impl Implementation {
    pub fn new<R, F>(name: impl Into<String>, factory: F) -> Self
    where
        R: Role + ?Sized,
        F: Fn(&Container) -> Result<Arc<R>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            role: RoleDescriptor::of::<R>(),
            factory: Arc::new(move |ctx: &Container| factory(ctx).map(ErasedInstance::new)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> RoleDescriptor {
        self.role
    }

    /// Build a new instance, passing the container for dependency lookups.
    pub fn instantiate(&self, ctx: &Container) -> Result<ErasedInstance> {
        (self.factory)(ctx)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("name", &self.name)
            .field("role", &self.role.name())
            .finish()
    }
}

/// Implementations available to the container, by name.
#[derive(Debug, Clone, Default)]
pub struct ImplementationCatalog {
    implementations: BTreeMap<String, Implementation>,
}

impl ImplementationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory under `name`, replacing any earlier one.
    pub fn provide<R, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        R: Role + ?Sized,
        F: Fn(&Container) -> Result<Arc<R>> + Send + Sync + 'static,
    {
        self.insert(Implementation::new::<R, F>(name, factory))
    }

    pub fn insert(&mut self, implementation: Implementation) -> &mut Self {
        self.implementations.insert(implementation.name.clone(), implementation);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Implementation> {
        self.implementations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.implementations.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.implementations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.implementations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.implementations.is_empty()
    }

    /// Add every implementation of `other`; later catalogs win on name collision.
    pub fn merge(&mut self, other: &ImplementationCatalog) -> &mut Self {
        for implementation in other.implementations.values() {
            self.insert(implementation.clone());
        }
        self
    }
}

type Wrap = dyn Fn(ErasedInstance) -> Result<ErasedInstance> + Send + Sync;

/// A wrapper applied to every instance a component of one role/hint produces.
///
/// Decorators for the same slot run in registration order, so the first one
/// registered wraps the bare instance and the last one is outermost.
#[derive(Clone)]
pub struct Decorator {
    key: ComponentKey,
    wrap: Arc<Wrap>,
}

impl Decorator {
    pub fn new<R, F>(hint: Option<&str>, decorate: F) -> Self
    where
        R: Role + ?Sized,
        F: Fn(Arc<R>) -> Arc<R> + Send + Sync + 'static,
    {
        let key = ComponentKey::of::<R>(hint).canonical();
        let target = key.clone();
        Self {
            key,
            wrap: Arc::new(move |instance: ErasedInstance| {
                let typed = instance.downcast::<R>().ok_or_else(|| EmbError::InstantiationFailed {
                    role: target.role().to_string(),
                    hint: target.canonical_hint().to_string(),
                    reason: format!("decorator expected {}, got {}", R::NAME, instance.type_name()),
                })?;
                Ok(ErasedInstance::new(decorate(typed)))
            }),
        }
    }

    /// Canonical key of the decorated slot.
    pub fn key(&self) -> &ComponentKey {
        &self.key
    }

    pub fn apply(&self, instance: ErasedInstance) -> Result<ErasedInstance> {
        (self.wrap)(instance)
    }
}

impl fmt::Debug for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorator").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("singleton".parse::<InstantiationStrategy>().unwrap(), InstantiationStrategy::Singleton);
        assert_eq!(
            "load-on-start".parse::<InstantiationStrategy>().unwrap(),
            InstantiationStrategy::LoadOnStart
        );
        assert_eq!("per-lookup".parse::<InstantiationStrategy>().unwrap(), InstantiationStrategy::PerLookup);

        let err = "eager".parse::<InstantiationStrategy>().unwrap_err();
        assert!(err.to_string().contains("eager"));
    }

    #[test]
    fn test_strategy_display_roundtrips_config_spelling() {
        for strategy in [
            InstantiationStrategy::Singleton,
            InstantiationStrategy::LoadOnStart,
            InstantiationStrategy::PerLookup,
        ] {
            assert_eq!(strategy.to_string().parse::<InstantiationStrategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn test_declaration_accessors() {
        let decl = ComponentDeclaration::new("Resolver", Some("remote"), "RemoteResolver")
            .with_strategy(InstantiationStrategy::PerLookup)
            .with_description("resolves from remote repositories");
        assert_eq!(decl.key().key(), "Resolver#remote");
        assert_eq!(decl.strategy(), InstantiationStrategy::PerLookup);
        assert_eq!(decl.description(), Some("resolves from remote repositories"));
        assert!(!decl.is_self_bound());
        assert!(ComponentDeclaration::new("Clock", None, "Clock").is_self_bound());
    }

    #[test]
    fn test_catalog_merge_last_wins() {
        let mut first = ImplementationCatalog::new();
        first.provide::<Text, _>("Greeting", |_| Ok(Arc::new(Text("hello"))));
        let mut second = ImplementationCatalog::new();
        second.provide::<Text, _>("Greeting", |_| Ok(Arc::new(Text("bonjour"))));
        second.provide::<Text, _>("Farewell", |_| Ok(Arc::new(Text("bye"))));

        first.merge(&second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.names().collect::<Vec<_>>(), vec!["Farewell", "Greeting"]);
    }

    struct Text(&'static str);

    impl Role for Text {
        const NAME: &'static str = "Text";
    }
}
