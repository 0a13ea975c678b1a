mod common;

use common::{cond, deployment_config, init_tracing, make_item, make_source, rule, MockAdapter};
use content_curator::aggregator::ContentAggregator;
use content_curator::cache::CacheService;
use content_curator::config::FilterConfig;
use content_curator::filters::build_filter_engine;
use content_curator::registry::ProviderRegistry;
use content_curator::service::ContentService;
use content_curator::types::{ConditionOperator, ContentQuery, RuleAction, RuleType, SourceType};
use serde_json::json;
use std::sync::Arc;

fn build_service(adapter: MockAdapter, filters: FilterConfig) -> ContentService {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(adapter));
    let config = Arc::new(deployment_config(
        vec![make_source("youtube", SourceType::Channel, "UCone")],
        filters.clone(),
    ));
    let aggregator = ContentAggregator::new(
        config,
        Arc::new(registry),
        Arc::new(CacheService::new(None)),
    );
    ContentService::with_parts(aggregator, build_filter_engine(filters))
}

fn block_clickbait() -> FilterConfig {
    FilterConfig {
        rules: vec![rule(
            "no-clickbait",
            RuleType::Metadata,
            RuleAction::Block,
            vec![cond("title", ConditionOperator::Contains, json!("SHOCKING"))],
        )],
        ..FilterConfig::default()
    }
}

#[tokio::test]
async fn test_get_content_filters_page() -> content_curator::Result<()> {
    init_tracing();

    let service = build_service(
        MockAdapter::new(
            "youtube",
            vec![
                make_item("ok", "A calm explainer", 1),
                make_item("bad", "SHOCKING secrets", 2),
            ],
        ),
        block_clickbait(),
    );

    let page = service.get_content(&ContentQuery::default()).await?;
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, "ok");
    // total reflects the pre-filter page, so consumers can detect withheld items
    assert_eq!(page.total, 2);
    Ok(())
}

#[tokio::test]
async fn test_get_item_by_id_hides_blocked_item() -> content_curator::Result<()> {
    init_tracing();

    let service = build_service(
        MockAdapter::new(
            "youtube",
            vec![
                make_item("ok", "A calm explainer", 1),
                make_item("bad", "SHOCKING secrets", 2),
            ],
        ),
        block_clickbait(),
    );

    assert!(service.get_item_by_id("ok").await?.is_some());
    assert!(
        service.get_item_by_id("bad").await?.is_none(),
        "a blocked item must read as absent"
    );
    Ok(())
}

#[tokio::test]
async fn test_no_rules_round_trip() -> content_curator::Result<()> {
    init_tracing();

    let items = vec![
        make_item("a", "First", 1),
        make_item("b", "Second", 2),
        make_item("c", "Third", 3),
    ];
    let service = build_service(
        MockAdapter::new("youtube", items),
        FilterConfig::default(),
    );

    let page = service.get_content(&ContentQuery::default()).await?;
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total, 3);

    let ids: Vec<&str> = page.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"], "newest first");
    Ok(())
}

#[tokio::test]
async fn test_refresh_content_delegates() -> content_curator::Result<()> {
    init_tracing();

    let adapter = MockAdapter::new("youtube", vec![make_item("a", "First", 1)]);
    let calls = adapter.fetch_calls.clone();
    let service = build_service(adapter, FilterConfig::default());

    service.refresh_content().await?;
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_warm_cache_prefetches_default_page() -> content_curator::Result<()> {
    init_tracing();

    let adapter = MockAdapter::new("youtube", vec![make_item("a", "First", 1)]);
    let calls = adapter.fetch_calls.clone();
    let service = build_service(adapter, FilterConfig::default());

    service.warm_cache().await;
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    // The warmed page serves subsequent reads without another fetch
    service.get_content(&ContentQuery::default()).await?;
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_stats_combine_content_and_filters() -> content_curator::Result<()> {
    init_tracing();

    let service = build_service(
        MockAdapter::new("youtube", vec![make_item("a", "First", 1)]),
        block_clickbait(),
    );

    let stats = service.get_stats().await?;
    assert_eq!(stats.content.total_items, 1);
    assert_eq!(stats.filters.total_rules, 1);
    assert!(stats.filters.enabled);
    Ok(())
}
