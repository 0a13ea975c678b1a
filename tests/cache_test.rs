mod common;

use common::init_tracing;
use content_curator::cache::CacheService;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    name: String,
    count: u64,
}

fn payload(name: &str) -> Payload {
    Payload {
        name: name.to_string(),
        count: 42,
    }
}

// All tests run without a redis URL, exercising the in-process fallback the
// service degrades to when redis is absent or unreachable.

#[tokio::test]
async fn test_set_get_roundtrip() {
    init_tracing();
    let cache = CacheService::new(None);

    cache.set("greeting", &payload("hello"), 60, None).await;
    let got: Option<Payload> = cache.get("greeting", None).await;
    assert_eq!(got, Some(payload("hello")));
}

#[tokio::test]
async fn test_missing_key_is_none() {
    init_tracing();
    let cache = CacheService::new(None);

    let got: Option<Payload> = cache.get("never-set", None).await;
    assert!(got.is_none());
}

#[tokio::test]
async fn test_expired_entry_is_a_miss() {
    init_tracing();
    let cache = CacheService::new(None);

    cache.set("ephemeral", &payload("gone"), 0, None).await;
    let got: Option<Payload> = cache.get("ephemeral", None).await;
    assert!(got.is_none(), "zero TTL must expire immediately");
}

#[tokio::test]
async fn test_delete_removes_entry() {
    init_tracing();
    let cache = CacheService::new(None);

    cache.set("doomed", &payload("bye"), 60, None).await;
    cache.delete("doomed", None).await;
    let got: Option<Payload> = cache.get("doomed", None).await;
    assert!(got.is_none());
}

#[tokio::test]
async fn test_delete_pattern_only_touches_matches() {
    init_tracing();
    let cache = CacheService::new(None);

    cache.set("content:1:20:all:", &payload("page1"), 60, None).await;
    cache.set("content:2:20:all:", &payload("page2"), 60, None).await;
    cache.set("item:abc", &payload("item"), 60, None).await;

    cache.delete_pattern("content:*", None).await;

    let page: Option<Payload> = cache.get("content:1:20:all:", None).await;
    let item: Option<Payload> = cache.get("item:abc", None).await;
    assert!(page.is_none());
    assert_eq!(item, Some(payload("item")));
}

#[tokio::test]
async fn test_deployment_namespacing_isolates_tenants() {
    init_tracing();
    let cache = CacheService::new(None);

    cache.set("feed", &payload("tenant-a"), 60, Some("tenant-a")).await;
    cache.set("feed", &payload("tenant-b"), 60, Some("tenant-b")).await;

    let a: Option<Payload> = cache.get("feed", Some("tenant-a")).await;
    let b: Option<Payload> = cache.get("feed", Some("tenant-b")).await;
    assert_eq!(a, Some(payload("tenant-a")));
    assert_eq!(b, Some(payload("tenant-b")));

    // Pattern invalidation under one tenant must not leak into the other
    cache.delete_pattern("*", Some("tenant-a")).await;
    let a: Option<Payload> = cache.get("feed", Some("tenant-a")).await;
    let b: Option<Payload> = cache.get("feed", Some("tenant-b")).await;
    assert!(a.is_none());
    assert_eq!(b, Some(payload("tenant-b")));
}

#[tokio::test]
async fn test_get_or_set_invokes_fetcher_once() -> content_curator::Result<()> {
    init_tracing();
    let cache = CacheService::new(None);
    let fetches = AtomicUsize::new(0);
    let fetches = &fetches;

    for _ in 0..3 {
        let value: Payload = cache
            .get_or_set(
                "expensive",
                || async move {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(payload("computed"))
                },
                60,
                None,
            )
            .await?;
        assert_eq!(value, payload("computed"));
    }

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_get_or_set_propagates_fetcher_error() {
    init_tracing();
    let cache = CacheService::new(None);

    let result: content_curator::Result<Payload> = cache
        .get_or_set(
            "failing",
            || async move { Err(content_curator::CuratorError::Cache("backend down".to_string())) },
            60,
            None,
        )
        .await;
    assert!(result.is_err());

    // A failed fetch must not poison the key
    let got: Option<Payload> = cache.get("failing", None).await;
    assert!(got.is_none());
}

#[tokio::test]
async fn test_increment_counts_up() {
    init_tracing();
    let cache = CacheService::new(None);

    assert_eq!(cache.increment("hits", None).await, 1);
    assert_eq!(cache.increment("hits", None).await, 2);
    assert_eq!(cache.increment("hits", None).await, 3);
    assert_eq!(cache.increment("other", None).await, 1);
}

#[tokio::test]
async fn test_exists() {
    init_tracing();
    let cache = CacheService::new(None);

    assert!(!cache.exists("thing", None).await);
    cache.set("thing", &payload("x"), 60, None).await;
    assert!(cache.exists("thing", None).await);
}

#[tokio::test]
async fn test_capacity_evicts_oldest_inserted() {
    init_tracing();
    let cache = CacheService::new(None);

    // One entry past capacity forces an eviction of the earliest insert
    for i in 0..=1000 {
        cache.set(&format!("k{i}"), &payload("v"), 60, None).await;
    }

    let first: Option<Payload> = cache.get("k0", None).await;
    let last: Option<Payload> = cache.get("k1000", None).await;
    assert!(first.is_none(), "oldest entry must be evicted at capacity");
    assert_eq!(last, Some(payload("v")));

    let stats = cache.stats().await;
    assert_eq!(stats.memory_keys, 1000);
}

#[tokio::test]
async fn test_stats_counts_memory_keys() {
    init_tracing();
    let cache = CacheService::new(None);

    cache.set("a", &payload("a"), 60, None).await;
    cache.set("b", &payload("b"), 60, None).await;

    let stats = cache.stats().await;
    assert_eq!(stats.memory_keys, 2);
    assert_eq!(stats.remote_keys, 0);
}
