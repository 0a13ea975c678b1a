use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Canonical unit of content produced by every provider adapter.
///
/// `id` is provider-unique, not globally unique; `(platform, id)` together
/// identify an item. Items are built fresh on every fetch and never mutated
/// in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub platform: String,
    pub url: String,
    pub thumbnail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_high: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_thumbnail: Option<String>,
    pub published_at: DateTime<Utc>,
    /// Duration in seconds.
    pub duration: u64,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_audio_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_rating: Option<ContentRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_closed_captions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_live_content: Option<bool>,
    pub metadata: ContentMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Audio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRating {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yt_rating: Option<String>,
    pub made_for_kids: bool,
    pub age_restricted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    pub fetched_at: DateTime<Utc>,
    pub source_type: String,
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_results: Option<Vec<FilterResult>>,
}

/// One configured content source for a deployment. Drives what an adapter
/// fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSource {
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<HashMap<String, Value>>,
}

fn default_platform() -> String {
    "youtube".to_string()
}

impl ContentSource {
    /// String parameter lookup, e.g. the `q` of a search source.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.as_ref()?.get(key)?.as_str()
    }

    /// Numeric parameter lookup, e.g. `maxResults`.
    pub fn u64_param(&self, key: &str) -> Option<u64> {
        self.params.as_ref()?.get(key)?.as_u64()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Channel,
    Playlist,
    Video,
    Search,
    User,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Channel => "channel",
            SourceType::Playlist => "playlist",
            SourceType::Video => "video",
            SourceType::Search => "search",
            SourceType::User => "user",
        }
    }
}

/// Deployment-authored filter rule. Rules are evaluated in configured order;
/// the first rule an item fails decides its fate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRule {
    pub id: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub conditions: Vec<FilterCondition>,
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<RuleLogic>,
}

impl FilterRule {
    pub fn logic(&self) -> RuleLogic {
        self.logic.unwrap_or(RuleLogic::And)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Metadata,
    Content,
    Source,
    Pattern,
    Behavioral,
    Temporal,
    Allowlist,
    Blocklist,
    External,
    Ml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Block,
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleLogic {
    And,
    Or,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: ConditionOperator,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    Equals,
    Contains,
    Regex,
    Gt,
    Lt,
    In,
}

/// Outcome of evaluating one item against the filter rules. Not persisted,
/// only returned and logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResult {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub rule_id: String,
}

/// Query parameters for the paginated feed. Bounds are validated by the
/// caller; this crate trusts `page >= 1` and a sane `limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

/// One page of the curated feed, shaped for direct serialization to API
/// consumers and for cache round-trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedContent {
    pub items: Vec<ContentItem>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: u32,
    pub has_more: bool,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl Default for ContentQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            category: None,
            q: None,
        }
    }
}
