mod common;

use common::{deployment_config, init_tracing, make_item, make_source, MockAdapter};
use content_curator::aggregator::ContentAggregator;
use content_curator::cache::CacheService;
use content_curator::config::FilterConfig;
use content_curator::registry::ProviderRegistry;
use content_curator::types::{ContentQuery, SourceType};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn build_aggregator(
    adapters: Vec<MockAdapter>,
    sources: Vec<content_curator::types::ContentSource>,
) -> ContentAggregator {
    let mut registry = ProviderRegistry::new();
    for adapter in adapters {
        registry.register(Arc::new(adapter));
    }
    let config = Arc::new(deployment_config(sources, FilterConfig::default()));
    ContentAggregator::new(config, Arc::new(registry), Arc::new(CacheService::new(None)))
}

#[tokio::test]
async fn test_dedup_first_occurrence_wins() -> content_curator::Result<()> {
    init_tracing();

    // Two sources on the same platform return overlapping items
    let adapter = MockAdapter::new(
        "youtube",
        vec![make_item("dup", "Shared upload", 1), make_item("solo", "Unique upload", 2)],
    );
    let aggregator = build_aggregator(
        vec![adapter],
        vec![
            make_source("youtube", SourceType::Channel, "UCone"),
            make_source("youtube", SourceType::Channel, "UCtwo"),
        ],
    );

    let items = aggregator.aggregate_content().await?;
    assert_eq!(items.len(), 2, "duplicates across sources must collapse");
    Ok(())
}

#[tokio::test]
async fn test_items_sorted_newest_first() -> content_curator::Result<()> {
    init_tracing();

    let adapter = MockAdapter::new(
        "youtube",
        vec![
            make_item("old", "Old", 30),
            make_item("new", "New", 1),
            make_item("mid", "Mid", 10),
        ],
    );
    let aggregator = build_aggregator(
        vec![adapter],
        vec![make_source("youtube", SourceType::Channel, "UCone")],
    );

    let items = aggregator.aggregate_content().await?;
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
    Ok(())
}

#[tokio::test]
async fn test_pagination_boundaries() -> content_curator::Result<()> {
    init_tracing();

    let items: Vec<_> = (0..5)
        .map(|i| make_item(&format!("v{i}"), &format!("Video {i}"), i))
        .collect();
    let aggregator = build_aggregator(
        vec![MockAdapter::new("youtube", items)],
        vec![make_source("youtube", SourceType::Channel, "UCone")],
    );

    let query = |page| ContentQuery {
        page,
        limit: 2,
        category: None,
        q: None,
    };

    let first = aggregator.get_content(&query(1)).await?;
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.total, 5);
    assert_eq!(first.total_pages, 3);
    assert!(first.has_more);

    let last = aggregator.get_content(&query(3)).await?;
    assert_eq!(last.items.len(), 1);
    assert!(!last.has_more);

    let beyond = aggregator.get_content(&query(4)).await?;
    assert!(beyond.items.is_empty());
    assert!(!beyond.has_more);
    assert_eq!(beyond.total, 5);
    Ok(())
}

#[tokio::test]
async fn test_category_and_search_filters() -> content_curator::Result<()> {
    init_tracing();

    let mut gaming = make_item("g1", "Speedrun world record", 1);
    gaming.category_name = Some("Gaming".to_string());
    let adapter = MockAdapter::new(
        "youtube",
        vec![make_item("m1", "Symphony no. 9", 2), gaming],
    );
    let aggregator = build_aggregator(
        vec![adapter],
        vec![make_source("youtube", SourceType::Channel, "UCone")],
    );

    let by_category = aggregator
        .get_content(&ContentQuery {
            category: Some("Gaming".to_string()),
            ..ContentQuery::default()
        })
        .await?;
    assert_eq!(by_category.items.len(), 1);
    assert_eq!(by_category.items[0].id, "g1");

    // Category narrowing is an exact match on the stored name
    let wrong_case = aggregator
        .get_content(&ContentQuery {
            category: Some("gaming".to_string()),
            ..ContentQuery::default()
        })
        .await?;
    assert!(wrong_case.items.is_empty());

    let by_search = aggregator
        .get_content(&ContentQuery {
            q: Some("symphony".to_string()),
            ..ContentQuery::default()
        })
        .await?;
    assert_eq!(by_search.items.len(), 1);
    assert_eq!(by_search.items[0].id, "m1");
    Ok(())
}

#[tokio::test]
async fn test_failing_source_does_not_poison_feed() -> content_curator::Result<()> {
    init_tracing();

    let good = MockAdapter::new("youtube", vec![make_item("ok", "Still here", 1)]);
    let bad = MockAdapter::failing("vimeo");
    let aggregator = build_aggregator(
        vec![good, bad],
        vec![
            make_source("youtube", SourceType::Channel, "UCone"),
            make_source("vimeo", SourceType::Channel, "somechannel"),
        ],
    );

    let items = aggregator.aggregate_content().await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "ok");
    Ok(())
}

#[tokio::test]
async fn test_page_cache_avoids_refetch() -> content_curator::Result<()> {
    init_tracing();

    let adapter = MockAdapter::new("youtube", vec![make_item("v1", "Video", 1)]);
    let calls = adapter.fetch_calls.clone();
    let aggregator = build_aggregator(
        vec![adapter],
        vec![make_source("youtube", SourceType::Channel, "UCone")],
    );

    let query = ContentQuery::default();
    aggregator.get_content(&query).await?;
    aggregator.get_content(&query).await?;
    assert_eq!(calls.load(Ordering::SeqCst), 1, "second read must hit the cache");
    Ok(())
}

#[tokio::test]
async fn test_refresh_cache_invalidates_and_refetches() -> content_curator::Result<()> {
    init_tracing();

    let adapter = MockAdapter::new("youtube", vec![make_item("v1", "Video", 1)]);
    let calls = adapter.fetch_calls.clone();
    let aggregator = build_aggregator(
        vec![adapter],
        vec![make_source("youtube", SourceType::Channel, "UCone")],
    );

    aggregator.get_content(&ContentQuery::default()).await?;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    aggregator.refresh_cache().await?;
    assert_eq!(calls.load(Ordering::SeqCst), 2, "refresh must eagerly re-aggregate");

    aggregator.get_content(&ContentQuery::default()).await?;
    assert_eq!(calls.load(Ordering::SeqCst), 2, "refreshed page must be served from cache");
    Ok(())
}

#[tokio::test]
async fn test_probe_order_from_id_shape() {
    init_tracing();

    let aggregator = build_aggregator(
        vec![
            MockAdapter::new("youtube", vec![]),
            MockAdapter::new("vimeo", vec![]),
        ],
        vec![make_source("youtube", SourceType::Channel, "UCone")],
    );

    // All digits: Vimeo-shaped
    assert_eq!(aggregator.probe_order("76979871"), vec!["vimeo", "youtube"]);
    // Eleven URL-safe characters: YouTube-shaped
    assert_eq!(
        aggregator.probe_order("dQw4w9WgXcQ"),
        vec!["youtube", "vimeo"]
    );
    // Anything else keeps registration order
    assert_eq!(
        aggregator.probe_order("not an id"),
        vec!["youtube", "vimeo"]
    );
}

#[tokio::test]
async fn test_item_probe_survives_adapter_error() -> content_curator::Result<()> {
    init_tracing();

    // Eleven digits probe vimeo first; it errors, and the probe must carry
    // on to youtube, which owns the item.
    let item = make_item("12345678901", "Numeric ID", 1);
    let aggregator = build_aggregator(
        vec![
            MockAdapter::failing("vimeo"),
            MockAdapter::new("youtube", vec![item]),
        ],
        vec![make_source("youtube", SourceType::Channel, "UCone")],
    );

    let found = aggregator.get_item_by_id("12345678901").await?;
    assert_eq!(found.map(|i| i.id), Some("12345678901".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_get_item_by_id_miss() -> content_curator::Result<()> {
    init_tracing();

    let aggregator = build_aggregator(
        vec![MockAdapter::new("youtube", vec![])],
        vec![make_source("youtube", SourceType::Channel, "UCone")],
    );

    assert!(aggregator.get_item_by_id("missing").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_invalid_source_is_skipped_without_fetch() -> content_curator::Result<()> {
    init_tracing();

    let adapter = MockAdapter::new("youtube", vec![make_item("v1", "Video", 1)]);
    let calls = adapter.fetch_calls.clone();
    let aggregator = build_aggregator(
        vec![adapter],
        vec![make_source("youtube", SourceType::Channel, "")],
    );

    let items = aggregator.aggregate_content().await?;
    assert!(items.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0, "invalid source must not be fetched");
    Ok(())
}

#[tokio::test]
async fn test_health_check_reports_per_platform() {
    init_tracing();

    let aggregator = build_aggregator(
        vec![
            MockAdapter::new("youtube", vec![]),
            MockAdapter::failing("vimeo"),
        ],
        vec![make_source("youtube", SourceType::Channel, "UCone")],
    );

    let health = aggregator.health_check().await;
    assert_eq!(health.get("youtube"), Some(&true));
    assert_eq!(health.get("vimeo"), Some(&false));
}

#[tokio::test]
async fn test_stats_breakdowns() -> content_curator::Result<()> {
    init_tracing();

    let mut vimeo_item = make_item("v1", "On vimeo", 1);
    vimeo_item.platform = "vimeo".to_string();
    vimeo_item.category_name = None;
    let aggregator = build_aggregator(
        vec![
            MockAdapter::new("youtube", vec![make_item("y1", "On youtube", 1)]),
            MockAdapter::new("vimeo", vec![vimeo_item]),
        ],
        vec![
            make_source("youtube", SourceType::Channel, "UCone"),
            make_source("vimeo", SourceType::Channel, "somechannel"),
        ],
    );

    let stats = aggregator.get_stats().await?;
    assert_eq!(stats.total_items, 2);
    assert_eq!(stats.total_sources, 2);
    assert_eq!(stats.platforms.get("youtube"), Some(&1));
    assert_eq!(stats.platforms.get("vimeo"), Some(&1));
    assert_eq!(stats.categories.get("Music"), Some(&1));
    Ok(())
}
