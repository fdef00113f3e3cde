//! Concurrency tests for the shared registry.

use std::sync::Arc;

use csta_registry::{Allocation, Release, ResourceRegistry};

async fn seeded() -> Arc<ResourceRegistry> {
    let registry = Arc::new(ResourceRegistry::new());
    registry.add_extension("1001", "S1", "10.0.0.1").await.unwrap();
    registry
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_racing_allocations_grant_exactly_once() {
    let registry = seeded().await;

    let a = tokio::spawn({
        let registry = Arc::clone(&registry);
        async move { registry.allocate("1001", Some("10.0.0.1"), Some("S1")).await }
    });
    let b = tokio::spawn({
        let registry = Arc::clone(&registry);
        async move { registry.allocate("1001", Some("10.0.0.1"), Some("S1")).await }
    });

    let outcomes = [a.await.unwrap(), b.await.unwrap()];
    let granted = outcomes.iter().filter(|o| o.is_granted()).count();
    let refused = outcomes
        .iter()
        .filter(|o| **o == Allocation::AlreadyAllocated)
        .count();
    assert_eq!((granted, refused), (1, 1));

    assert_eq!(registry.release("1001:S1:10.0.0.1:0").await, Release::Released);
    assert!(registry.allocate("1001", None, Some("S1")).await.is_granted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_callers_never_double_allocate() {
    let registry = seeded().await;

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.allocate("1001", None, Some("S1")).await })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap().is_granted() {
            granted += 1;
        }
    }
    assert_eq!(granted, 1);
    assert!(registry.is_allocated("1001").await);
}

#[tokio::test]
async fn test_allocation_cycle_survives_repeated_release() {
    let registry = seeded().await;
    for _ in 0..3 {
        assert!(registry.allocate("1001", Some("10.0.0.1"), None).await.is_granted());
        assert_eq!(
            registry.allocate("1001", Some("10.0.0.1"), None).await,
            Allocation::AlreadyAllocated
        );
        assert_eq!(registry.release("1001:S1:10.0.0.1:0").await, Release::Released);
    }
}
