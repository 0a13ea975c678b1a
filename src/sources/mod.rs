use crate::error::Result;
use crate::types::{ContentItem, ContentSource};
use async_trait::async_trait;

pub mod vimeo;
pub mod youtube;

pub use vimeo::VimeoAdapter;
pub use youtube::YouTubeAdapter;

/// Trait for pulling content from video platforms (YouTube, Vimeo, etc.)
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Platform identifier this adapter serves, e.g. "youtube"
    fn platform(&self) -> &'static str;

    /// Fetch all items for one configured source
    async fn fetch_content(&self, source: &ContentSource) -> Result<Vec<ContentItem>>;

    /// Look up a single item by its provider-assigned ID.
    /// Returns Ok(None) when the item does not exist or cannot be resolved.
    async fn fetch_item_details(&self, item_id: &str) -> Result<Option<ContentItem>>;

    /// Pure structural check that a configured source is usable by this
    /// adapter, run before any fetch is attempted.
    fn validate_source(&self, source: &ContentSource) -> bool {
        !source.id.is_empty()
    }

    /// Check if the provider API is reachable with the configured credentials
    async fn health_check(&self) -> Result<bool>;
}
