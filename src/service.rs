use crate::aggregator::{ContentAggregator, ContentStats};
use crate::cache::CacheService;
use crate::config::DeploymentConfig;
use crate::error::Result;
use crate::filters::{build_filter_engine, FilterEngine, FilterStats};
use crate::types::{ContentItem, ContentQuery, PaginatedContent};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub content: ContentStats,
    pub filters: FilterStats,
}

/// Composition of the aggregator and the filter engine: everything that
/// leaves this type has passed the deployment's rules.
pub struct ContentService {
    aggregator: ContentAggregator,
    engine: FilterEngine,
}

impl ContentService {
    pub fn new(config: Arc<DeploymentConfig>, cache: Arc<CacheService>) -> Result<Self> {
        let engine = build_filter_engine(config.filters.clone());
        let aggregator = ContentAggregator::from_config(config, cache)?;
        Ok(Self { aggregator, engine })
    }

    /// Assemble from pre-built parts. Lets callers register custom
    /// evaluators or adapters before wiring the service together.
    pub fn with_parts(aggregator: ContentAggregator, engine: FilterEngine) -> Self {
        Self { aggregator, engine }
    }

    /// One page of curated content. The page is fetched (or served from
    /// cache) first, then filtered, so `total` counts pre-filter items and a
    /// page can come back shorter than `limit`.
    pub async fn get_content(&self, query: &ContentQuery) -> Result<PaginatedContent> {
        let PaginatedContent {
            items,
            page,
            limit,
            total,
            total_pages,
            has_more,
        } = self.aggregator.get_content(query).await?;
        let filtered = self.engine.filter_items(items);

        if !filtered.blocked.is_empty() {
            debug!(blocked = filtered.blocked.len(), page, "Filtered items out of page");
        }

        Ok(PaginatedContent {
            items: filtered.passed,
            page,
            limit,
            total,
            total_pages,
            has_more,
        })
    }

    /// Single-item lookup, run through the rules as a batch of one. A blocked
    /// item is reported as absent.
    pub async fn get_item_by_id(&self, item_id: &str) -> Result<Option<ContentItem>> {
        let Some(item) = self.aggregator.get_item_by_id(item_id).await? else {
            return Ok(None);
        };

        let filtered = self.engine.filter_items(vec![item]);
        Ok(filtered.passed.into_iter().next())
    }

    pub async fn refresh_content(&self) -> Result<()> {
        self.aggregator.refresh_cache().await
    }

    pub async fn warm_cache(&self) {
        self.aggregator.warm_cache().await;
    }

    /// Per-platform adapter health, keyed by platform name.
    pub async fn health_check(&self) -> std::collections::HashMap<String, bool> {
        self.aggregator.health_check().await
    }

    pub async fn get_stats(&self) -> Result<ServiceStats> {
        Ok(ServiceStats {
            content: self.aggregator.get_stats().await?,
            filters: self.engine.stats(),
        })
    }

    pub fn filter_engine(&self) -> &FilterEngine {
        &self.engine
    }
}
