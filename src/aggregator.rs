use crate::cache::CacheService;
use crate::config::DeploymentConfig;
use crate::error::Result;
use crate::registry::ProviderRegistry;
use crate::types::{ContentItem, ContentQuery, PaginatedContent};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

const ITEM_CACHE_TTL_SECONDS: u64 = 600;

#[derive(Debug, Clone, Serialize)]
pub struct ContentStats {
    pub total_items: usize,
    pub total_sources: usize,
    pub platforms: HashMap<String, usize>,
    pub categories: HashMap<String, usize>,
}

/// Pulls every configured source through its adapter and merges the results
/// into one deduplicated, newest-first feed.
///
/// Source failures are isolated: one provider being down or over quota costs
/// its items, not the feed.
pub struct ContentAggregator {
    config: Arc<DeploymentConfig>,
    registry: Arc<ProviderRegistry>,
    cache: Arc<CacheService>,
}

impl ContentAggregator {
    pub fn new(
        config: Arc<DeploymentConfig>,
        registry: Arc<ProviderRegistry>,
        cache: Arc<CacheService>,
    ) -> Self {
        Self {
            config,
            registry,
            cache,
        }
    }

    /// Build the aggregator with a registry derived from the deployment's
    /// API credentials.
    pub fn from_config(config: Arc<DeploymentConfig>, cache: Arc<CacheService>) -> Result<Self> {
        let registry = Arc::new(ProviderRegistry::from_api_config(&config.api)?);
        Ok(Self::new(config, registry, cache))
    }

    fn deployment_id(&self) -> &str {
        &self.config.deployment.id
    }

    fn page_ttl_seconds(&self) -> u64 {
        self.config.content.refresh_interval * 60
    }

    /// Fetch all configured sources fresh, then dedup and sort. Never cached
    /// here; callers that want caching go through [`get_content`].
    ///
    /// [`get_content`]: ContentAggregator::get_content
    pub async fn aggregate_content(&self) -> Result<Vec<ContentItem>> {
        let started = Instant::now();
        info!(
            deployment_id = %self.deployment_id(),
            sources = self.config.content.sources.len(),
            "Starting content aggregation"
        );

        let mut items = Vec::new();
        for source in &self.config.content.sources {
            let Some(adapter) = self.registry.get(&source.platform) else {
                warn!(
                    platform = %source.platform,
                    source_id = %source.id,
                    "No adapter registered for platform, skipping source"
                );
                continue;
            };

            if !adapter.validate_source(source) {
                warn!(
                    platform = %source.platform,
                    source_id = %source.id,
                    "Source failed validation, skipping"
                );
                continue;
            }

            match adapter.fetch_content(source).await {
                Ok(fetched) => items.extend(fetched),
                Err(e) if e.is_not_found() => warn!(
                    platform = %source.platform,
                    source_id = %source.id,
                    "Source not found, skipping: {}",
                    e
                ),
                Err(e) => error!(
                    platform = %source.platform,
                    source_id = %source.id,
                    "Source fetch failed, skipping: {}",
                    e
                ),
            }
        }

        let items = dedup_items(items);
        let items = sort_newest_first(items);

        info!(
            deployment_id = %self.deployment_id(),
            items = items.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Content aggregation complete"
        );
        Ok(items)
    }

    /// One page of the merged feed, with optional category and text search
    /// narrowing. Pages are cached for the deployment's refresh interval.
    pub async fn get_content(&self, query: &ContentQuery) -> Result<PaginatedContent> {
        let cache_key = page_cache_key(query);
        let ttl = self.page_ttl_seconds();

        self.cache
            .get_or_set(
                &cache_key,
                || async move {
                    let items = self.aggregate_content().await?;
                    let items = apply_query_filters(items, query);
                    Ok(paginate(items, query.page, query.limit))
                },
                ttl,
                Some(self.deployment_id()),
            )
            .await
    }

    /// Look up a single item by ID, probing adapters in an order guessed
    /// from the ID's shape. Adapter failures during the probe are swallowed;
    /// an item no adapter claims is simply absent.
    pub async fn get_item_by_id(&self, item_id: &str) -> Result<Option<ContentItem>> {
        let cache_key = format!("item:{item_id}");
        if let Some(item) = self
            .cache
            .get::<ContentItem>(&cache_key, Some(self.deployment_id()))
            .await
        {
            return Ok(Some(item));
        }

        for platform in self.probe_order(item_id) {
            let Some(adapter) = self.registry.get(&platform) else {
                continue;
            };
            match adapter.fetch_item_details(item_id).await {
                Ok(Some(item)) => {
                    self.cache
                        .set(
                            &cache_key,
                            &item,
                            ITEM_CACHE_TTL_SECONDS,
                            Some(self.deployment_id()),
                        )
                        .await;
                    return Ok(Some(item));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(platform = %platform, item_id, "Item probe failed: {}", e);
                }
            }
        }

        debug!(item_id, "No adapter resolved item");
        Ok(None)
    }

    /// Probe order for an unqualified item ID. All-digit IDs look like Vimeo,
    /// eleven URL-safe characters look like YouTube; otherwise registration
    /// order stands.
    pub fn probe_order(&self, item_id: &str) -> Vec<String> {
        let registered = self.registry.platforms();
        let preferred = if !item_id.is_empty() && item_id.chars().all(|c| c.is_ascii_digit()) {
            Some("vimeo")
        } else if item_id.len() == 11
            && item_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            Some("youtube")
        } else {
            None
        };

        let mut order: Vec<String> = Vec::with_capacity(registered.len());
        if let Some(preferred) = preferred {
            if self.registry.contains(preferred) {
                order.push(preferred.to_string());
            }
        }
        for platform in registered {
            if !order.contains(platform) {
                order.push(platform.clone());
            }
        }
        order
    }

    /// Drop all cached pages and items, then eagerly rebuild the first page.
    /// Unlike aggregation inside normal reads, failures here propagate so an
    /// operator-triggered refresh reports what went wrong.
    pub async fn refresh_cache(&self) -> Result<()> {
        info!(deployment_id = %self.deployment_id(), "Refreshing content cache");
        let deployment_id = self.deployment_id().to_string();
        self.cache
            .delete_pattern("content:*", Some(&deployment_id))
            .await;
        self.cache
            .delete_pattern("item:*", Some(&deployment_id))
            .await;

        let page = self.get_content(&ContentQuery::default()).await?;
        info!(
            deployment_id = %deployment_id,
            total = page.total,
            "Content cache refreshed"
        );
        Ok(())
    }

    /// Pre-populate the default page on startup. Failures are logged, not
    /// propagated; a cold cache just means the first reader pays the fetch.
    pub async fn warm_cache(&self) {
        match self.get_content(&ContentQuery::default()).await {
            Ok(page) => debug!(total = page.total, "Cache warmed"),
            Err(e) => warn!("Cache warm-up failed: {}", e),
        }
    }

    /// Ping every registered adapter. An erroring adapter reports unhealthy
    /// rather than failing the check.
    pub async fn health_check(&self) -> HashMap<String, bool> {
        let mut health = HashMap::new();
        for platform in self.registry.platforms() {
            let Some(adapter) = self.registry.get(platform) else {
                continue;
            };
            let healthy = adapter.health_check().await.unwrap_or(false);
            health.insert(platform.clone(), healthy);
        }
        health
    }

    pub async fn get_stats(&self) -> Result<ContentStats> {
        let items = self.aggregate_content().await?;

        let mut platforms: HashMap<String, usize> = HashMap::new();
        let mut categories: HashMap<String, usize> = HashMap::new();
        for item in &items {
            *platforms.entry(item.platform.clone()).or_insert(0) += 1;
            if let Some(category) = &item.category_name {
                *categories.entry(category.clone()).or_insert(0) += 1;
            }
        }

        Ok(ContentStats {
            total_items: items.len(),
            total_sources: self.config.content.sources.len(),
            platforms,
            categories,
        })
    }
}

fn page_cache_key(query: &ContentQuery) -> String {
    format!(
        "content:{}:{}:{}:{}",
        query.page,
        query.limit,
        query.category.as_deref().unwrap_or("all"),
        query.q.as_deref().unwrap_or("")
    )
}

/// Deduplicate by item ID, first occurrence wins. Sources are fetched in
/// configured order, so earlier sources take precedence.
fn dedup_items(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let total = items.len();
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(total);
    for item in items {
        if seen.insert(item.id.clone()) {
            unique.push(item);
        }
    }

    let duplicates = total - unique.len();
    if duplicates > 0 {
        info!(duplicates, "Removed duplicate items across sources");
    }
    unique
}

/// Newest first. The sort is stable, so equal timestamps keep source order.
fn sort_newest_first(mut items: Vec<ContentItem>) -> Vec<ContentItem> {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    items
}

fn apply_query_filters(items: Vec<ContentItem>, query: &ContentQuery) -> Vec<ContentItem> {
    let mut items = items;

    if let Some(category) = &query.category {
        items.retain(|item| item.category_name.as_deref() == Some(category.as_str()));
    }

    if let Some(q) = &query.q {
        let needle = q.to_lowercase();
        items.retain(|item| {
            item.title.to_lowercase().contains(&needle)
                || item.description.to_lowercase().contains(&needle)
                || item
                    .channel_name
                    .as_deref()
                    .map(|c| c.to_lowercase().contains(&needle))
                    .unwrap_or(false)
                || item.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        });
    }

    items
}

fn paginate(items: Vec<ContentItem>, page: u32, limit: u32) -> PaginatedContent {
    let total = items.len();
    let limit = limit.max(1);
    let page = page.max(1);
    let total_pages = (total as u32).div_ceil(limit);

    let start = ((page - 1) * limit) as usize;
    let page_items: Vec<ContentItem> = if start >= total {
        Vec::new()
    } else {
        items
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect()
    };

    PaginatedContent {
        items: page_items,
        page,
        limit,
        total,
        total_pages,
        has_more: page < total_pages,
    }
}
