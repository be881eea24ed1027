//! End-to-end composition of containers from several extensions.

use embkit::component::InstantiationStrategy;
use embkit::container::{Container, ContainerBuilder};
use embkit::core::{EmbError, Result, Role};
use embkit::extension::{Extension, ExtensionInfo};
use embkit::registry::VirtualInstance;
use embkit::test_utils::init_test_logging;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub trait ArtifactResolver: Send + Sync {
    fn resolve(&self, coordinate: &str) -> String;
}

impl Role for dyn ArtifactResolver {
    const NAME: &'static str = "ArtifactResolver";
}

pub trait Transport: Send + Sync {
    fn scheme(&self) -> &str;
}

impl Role for dyn Transport {
    const NAME: &'static str = "Transport";
}

struct LocalResolver;

impl ArtifactResolver for LocalResolver {
    fn resolve(&self, coordinate: &str) -> String {
        format!("local:{coordinate}")
    }
}

/// Resolves through a transport looked up from the container.
struct RemoteResolver {
    transport: Arc<dyn Transport>,
}

impl ArtifactResolver for RemoteResolver {
    fn resolve(&self, coordinate: &str) -> String {
        format!("{}:{coordinate}", self.transport.scheme())
    }
}

/// Tries a cache first and falls back to whatever it replaced.
struct CachingResolver {
    fallback: Arc<dyn ArtifactResolver>,
}

impl ArtifactResolver for CachingResolver {
    fn resolve(&self, coordinate: &str) -> String {
        format!("cached({})", self.fallback.resolve(coordinate))
    }
}

struct Http;

impl Transport for Http {
    fn scheme(&self) -> &str {
        "https"
    }
}

fn core_extension() -> Extension {
    Extension::new("core", "Core", "3.9.0")
        .component::<dyn ArtifactResolver, _>(None, "LocalResolver", |_| {
            Ok(Arc::new(LocalResolver) as Arc<dyn ArtifactResolver>)
        })
        .component::<dyn ArtifactResolver, _>(Some("remote"), "RemoteResolver", |ctx: &Container| {
            let transport = ctx.lookup::<dyn Transport>(None)?;
            Ok(Arc::new(RemoteResolver {
                transport,
            }) as Arc<dyn ArtifactResolver>)
        })
        .component::<dyn Transport, _>(None, "HttpTransport", |_| Ok(Arc::new(Http) as Arc<dyn Transport>))
}

fn caching_extension() -> Result<Extension> {
    Extension::new("cache", "Resolver Cache", "0.4.1")
        .component::<dyn ArtifactResolver, _>(Some("caching"), "CachingResolver", |ctx: &Container| {
            // the literal hint reaches the component this one replaced
            let fallback = ctx.lookup::<dyn ArtifactResolver>(Some("_default_"))?;
            Ok(Arc::new(CachingResolver {
                fallback,
            }) as Arc<dyn ArtifactResolver>)
        })
        .select::<dyn ArtifactResolver>(None, "caching")
}

#[test]
fn test_factories_resolve_their_dependencies() {
    init_test_logging(None);
    let container = ContainerBuilder::new().with_extension(core_extension()).unwrap().build().unwrap();

    let remote = container.lookup::<dyn ArtifactResolver>(Some("remote")).unwrap();
    assert_eq!(remote.resolve("g:a:1"), "https:g:a:1");
}

#[test]
fn test_overriding_extension_delegates_to_original() {
    let container = ContainerBuilder::new()
        .with_extension(core_extension())
        .unwrap()
        .with_extension(caching_extension().unwrap())
        .unwrap()
        .build()
        .unwrap();

    let resolver = container.lookup::<dyn ArtifactResolver>(None).unwrap();
    assert_eq!(resolver.resolve("g:a:1"), "cached(local:g:a:1)");

    // the overriding component answers under its own hint as well
    let caching = container.lookup::<dyn ArtifactResolver>(Some("caching")).unwrap();
    assert!(Arc::ptr_eq(&resolver, &caching));
}

#[test]
fn test_later_selection_wins() {
    let container = ContainerBuilder::new()
        .with_extension(core_extension())
        .unwrap()
        .with_extension(caching_extension().unwrap())
        .unwrap()
        .with_selection("ArtifactResolver", "remote")
        .unwrap()
        .build()
        .unwrap();

    let resolver = container.lookup::<dyn ArtifactResolver>(None).unwrap();
    assert_eq!(resolver.resolve("g:a:1"), "https:g:a:1");
}

#[test]
fn test_suppressed_role_hint() {
    let container = ContainerBuilder::new()
        .with_extension(core_extension())
        .unwrap()
        .with_selection("ArtifactResolver#remote", "#")
        .unwrap()
        .build()
        .unwrap();

    let err = container.lookup::<dyn ArtifactResolver>(Some("remote")).err().unwrap();
    assert!(matches!(err, EmbError::SelectionSuppressed { .. }));
    assert!(container.try_lookup::<dyn ArtifactResolver>(Some("remote")).unwrap().is_none());
    assert!(container.lookup::<dyn ArtifactResolver>(None).is_ok());
}

#[test]
fn test_missing_component_names_role_and_hint() {
    let container = ContainerBuilder::new().with_extension(core_extension()).unwrap().build().unwrap();
    let err = container.lookup::<dyn ArtifactResolver>(Some("p2")).err().unwrap();
    assert_eq!(err.to_string(), "No component found for role 'ArtifactResolver' with hint 'p2'");
}

#[test]
fn test_explicit_instance_takes_precedence() {
    let container = ContainerBuilder::new()
        .with_extension(core_extension())
        .unwrap()
        .with_instance::<dyn ArtifactResolver>(Some("remote"), Arc::new(LocalResolver))
        .unwrap()
        .build()
        .unwrap();

    let resolver = container.lookup::<dyn ArtifactResolver>(Some("remote")).unwrap();
    assert_eq!(resolver.resolve("x"), "local:x");
}

#[test]
fn test_extension_info_is_registered() {
    let container = ContainerBuilder::new()
        .with_extension(core_extension())
        .unwrap()
        .with_extension(caching_extension().unwrap())
        .unwrap()
        .build()
        .unwrap();

    let labels: Vec<String> = container.extensions().iter().map(ExtensionInfo::label).collect();
    assert_eq!(labels, vec!["Core: 3.9.0", "Resolver Cache: 0.4.1"]);

    let info = container.lookup::<ExtensionInfo>(Some("cache")).unwrap();
    assert_eq!(info.version(), "0.4.1");
}

#[test]
fn test_load_on_start_component_built_during_build() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let extension = Extension::new("eager", "Eager", "1.0.0").component_with::<dyn Transport, _>(
        Some("eager"),
        "EagerTransport",
        InstantiationStrategy::LoadOnStart,
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Http) as Arc<dyn Transport>)
        },
    );

    let container = ContainerBuilder::new().with_extension(extension).unwrap().build().unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 1);

    container.lookup::<dyn Transport>(Some("eager")).unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failing_load_on_start_fails_build() {
    let extension = Extension::new("broken", "Broken", "1.0.0").component_with::<dyn Transport, _>(
        None,
        "BrokenTransport",
        InstantiationStrategy::LoadOnStart,
        |_| Err(EmbError::config("no proxy configured")),
    );

    assert!(ContainerBuilder::new().with_extension(extension).unwrap().build().is_err());
}

#[test]
fn test_decorator_wraps_selected_component() {
    let container = ContainerBuilder::new()
        .with_extension(core_extension())
        .unwrap()
        .with_decorator::<dyn ArtifactResolver, _>(None, |inner| {
            Arc::new(CachingResolver {
                fallback: inner,
            }) as Arc<dyn ArtifactResolver>
        })
        .build()
        .unwrap();

    let resolver = container.lookup::<dyn ArtifactResolver>(None).unwrap();
    assert_eq!(resolver.resolve("x"), "cached(local:x)");

    let remote = container.lookup::<dyn ArtifactResolver>(Some("remote")).unwrap();
    assert_eq!(remote.resolve("x"), "https:x");
}

#[test]
fn test_virtual_instance_supplied_after_build() {
    let slot = Arc::new(VirtualInstance::<dyn Transport>::new());
    let container = ContainerBuilder::new()
        .with_virtual::<dyn Transport>(Some("session"), slot.clone())
        .unwrap()
        .build()
        .unwrap();

    assert!(container.lookup::<dyn Transport>(Some("session")).is_err());

    slot.set_instance(Arc::new(Http));
    assert_eq!(container.lookup::<dyn Transport>(Some("session")).unwrap().scheme(), "https");
}

#[test]
fn test_override_cycle_rejected_at_build() {
    let err = ContainerBuilder::new()
        .with_extension(core_extension())
        .unwrap()
        .with_selection("ArtifactResolver#a", "b")
        .unwrap()
        .with_selection("ArtifactResolver#b", "a")
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, EmbError::OverrideCycle { .. }));
}
