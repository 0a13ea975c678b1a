use crate::config::ApiConfig;
use crate::error::{CuratorError, Result};
use crate::sources::{ProviderAdapter, VimeoAdapter, YouTubeAdapter};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Registry of provider adapters keyed by platform name.
///
/// Registration order is preserved so ID probes and health checks walk
/// platforms deterministically.
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    order: Vec<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Build a registry from deployment credentials. YouTube is always
    /// registered; Vimeo only when an access token is configured.
    pub fn from_api_config(api: &ApiConfig) -> Result<Self> {
        if api.youtube_api_key.is_empty() {
            return Err(CuratorError::Config(
                "YouTube API key is required".to_string(),
            ));
        }

        let mut registry = Self::new();
        registry.register(Arc::new(YouTubeAdapter::new(&api.youtube_api_key)));
        if let Some(token) = &api.vimeo_access_token {
            registry.register(Arc::new(VimeoAdapter::new(token)));
        }
        Ok(registry)
    }

    /// Register an adapter. Re-registering a platform replaces the previous
    /// adapter but keeps its original position in the probe order.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        let platform = adapter.platform().to_string();
        if self.adapters.insert(platform.clone(), adapter).is_none() {
            self.order.push(platform.clone());
        }
        info!(platform = %platform, "Registered provider adapter");
    }

    pub fn get(&self, platform: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(platform).cloned()
    }

    pub fn contains(&self, platform: &str) -> bool {
        self.adapters.contains_key(platform)
    }

    /// Platform names in registration order
    pub fn platforms(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
