#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use content_curator::config::{
    ApiConfig, ContentConfig, DeploymentConfig, DeploymentInfo, FilterConfig,
};
use content_curator::error::{CuratorError, Result};
use content_curator::sources::ProviderAdapter;
use content_curator::types::{
    ConditionOperator, ContentItem, ContentMetadata, ContentSource, FilterCondition, FilterRule,
    ContentType, RuleAction, RuleType, SourceType,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

/// A content item with sensible defaults, published `days_ago` days in the
/// past so sort order is controllable per test.
pub fn make_item(id: &str, title: &str, days_ago: i64) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("Description for {title}"),
        content_type: ContentType::Video,
        platform: "youtube".to_string(),
        url: format!("https://www.youtube.com/watch?v={id}"),
        thumbnail: "https://example.com/thumb.jpg".to_string(),
        thumbnail_high: None,
        channel_id: Some("UCtest".to_string()),
        channel_name: Some("Test Channel".to_string()),
        channel_thumbnail: None,
        published_at: Utc::now() - Duration::days(days_ago),
        duration: 300,
        view_count: 1000,
        like_count: 100,
        comment_count: 10,
        tags: vec!["test".to_string()],
        category_id: Some("10".to_string()),
        category_name: Some("Music".to_string()),
        default_language: None,
        default_audio_language: None,
        content_rating: None,
        has_closed_captions: None,
        is_live_content: None,
        metadata: ContentMetadata {
            fetched_at: Utc::now(),
            source_type: "channel".to_string(),
            source_id: "UCtest".to_string(),
            filter_results: None,
        },
    }
}

pub fn make_source(platform: &str, source_type: SourceType, id: &str) -> ContentSource {
    ContentSource {
        platform: platform.to_string(),
        source_type,
        id: id.to_string(),
        params: None,
    }
}

pub fn deployment_config(sources: Vec<ContentSource>, filters: FilterConfig) -> DeploymentConfig {
    DeploymentConfig {
        deployment: DeploymentInfo {
            id: "test-deployment".to_string(),
            name: "Test Deployment".to_string(),
            domain: "test.example.com".to_string(),
        },
        content: ContentConfig {
            sources,
            refresh_interval: 30,
            manual_approval_mode: false,
        },
        filters,
        api: ApiConfig {
            youtube_api_key: "test-key".to_string(),
            vimeo_access_token: None,
        },
    }
}

pub fn rule(
    id: &str,
    rule_type: RuleType,
    action: RuleAction,
    conditions: Vec<FilterCondition>,
) -> FilterRule {
    FilterRule {
        id: id.to_string(),
        rule_type,
        conditions,
        action,
        logic: None,
    }
}

pub fn cond(field: &str, operator: ConditionOperator, value: Value) -> FilterCondition {
    FilterCondition {
        field: field.to_string(),
        operator,
        value,
    }
}

/// Canned provider adapter. Serves a fixed item list, optionally failing
/// every call, and counts fetches so cache behavior is observable.
pub struct MockAdapter {
    platform: &'static str,
    items: Vec<ContentItem>,
    fail: bool,
    pub fetch_calls: Arc<AtomicUsize>,
}

impl MockAdapter {
    pub fn new(platform: &'static str, items: Vec<ContentItem>) -> Self {
        Self {
            platform,
            items,
            fail: false,
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(platform: &'static str) -> Self {
        Self {
            platform,
            items: Vec::new(),
            fail: true,
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn platform(&self) -> &'static str {
        self.platform
    }

    async fn fetch_content(&self, _source: &ContentSource) -> Result<Vec<ContentItem>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CuratorError::provider("Service unavailable", 503));
        }
        Ok(self.items.clone())
    }

    async fn fetch_item_details(&self, item_id: &str) -> Result<Option<ContentItem>> {
        if self.fail {
            return Err(CuratorError::provider("Service unavailable", 503));
        }
        Ok(self.items.iter().find(|i| i.id == item_id).cloned())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }
}
