//! Lookups from many tasks at once against one shared container.

use embkit::component::InstantiationStrategy;
use embkit::container::{Container, ContainerBuilder};
use embkit::core::Role;
use embkit::extension::Extension;
use embkit::registry::VirtualInstance;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub trait Counter: Send + Sync {
    fn id(&self) -> usize;
}

impl Role for dyn Counter {
    const NAME: &'static str = "Counter";
}

struct Numbered(usize);

impl Counter for Numbered {
    fn id(&self) -> usize {
        self.0
    }
}

fn container(created: Arc<AtomicUsize>) -> Arc<Container> {
    let singleton = created.clone();
    let per_lookup = created;
    let extension = Extension::new("counters", "Counters", "1.0.0")
        .component::<dyn Counter, _>(None, "SharedCounter", move |_| {
            Ok(Arc::new(Numbered(singleton.fetch_add(1, Ordering::SeqCst))) as Arc<dyn Counter>)
        })
        .component_with::<dyn Counter, _>(
            Some("fresh"),
            "FreshCounter",
            InstantiationStrategy::PerLookup,
            move |_| Ok(Arc::new(Numbered(per_lookup.fetch_add(1, Ordering::SeqCst))) as Arc<dyn Counter>),
        );
    Arc::new(ContainerBuilder::new().with_extension(extension).unwrap().build().unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_singleton_shared_across_tasks() {
    let container = container(Arc::new(AtomicUsize::new(0)));

    let mut handles = Vec::new();
    for _ in 0..32 {
        let container = container.clone();
        handles.push(tokio::spawn(async move { container.lookup::<dyn Counter>(None).unwrap() }));
    }

    let mut instances = Vec::new();
    for handle in handles {
        instances.push(handle.await.unwrap());
    }
    let first = &instances[0];
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, first)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_lookup_creates_fresh_instances() {
    let created = Arc::new(AtomicUsize::new(0));
    let container = container(created.clone());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let container = container.clone();
        handles.push(tokio::spawn(async move { container.lookup::<dyn Counter>(Some("fresh")).unwrap().id() }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    assert_eq!(created.load(Ordering::SeqCst), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_virtual_instance_set_while_looking_up() {
    let injected = Arc::new(AtomicUsize::new(0));
    let seen = injected.clone();
    let slot = Arc::new(VirtualInstance::<dyn Counter>::with_injector(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));
    let container = Arc::new(
        ContainerBuilder::new()
            .with_virtual::<dyn Counter>(Some("session"), slot.clone())
            .unwrap()
            .build()
            .unwrap(),
    );

    let writer = {
        let slot = slot.clone();
        tokio::spawn(async move {
            for i in 0..50 {
                slot.set_instance(Arc::new(Numbered(i)));
                tokio::task::yield_now().await;
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let container = container.clone();
        readers.push(tokio::spawn(async move {
            let mut hits = 0;
            for _ in 0..50 {
                if let Ok(counter) = container.lookup::<dyn Counter>(Some("session")) {
                    assert!(counter.id() < 50);
                    hits += 1;
                }
                tokio::task::yield_now().await;
            }
            hits
        }));
    }

    writer.await.unwrap();
    let mut hits = 0;
    for reader in readers {
        hits += reader.await.unwrap();
    }

    // every successful lookup re-ran the injector
    assert_eq!(injected.load(Ordering::SeqCst), hits);
    assert_eq!(container.lookup::<dyn Counter>(Some("session")).unwrap().id(), 49);
}
