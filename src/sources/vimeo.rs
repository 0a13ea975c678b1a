use crate::error::{retry_with_backoff, CuratorError, Result};
use crate::normalizer::{normalize_vimeo_video, VimeoVideo};
use crate::sources::ProviderAdapter;
use crate::types::{ContentItem, ContentSource, SourceType};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const API_BASE: &str = "https://api.vimeo.com";
const PAGE_SIZE: u64 = 50;
const DEFAULT_MAX_RESULTS: u64 = 50;
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Field projection requested on every listing so responses stay small and
/// carry exactly what normalization needs.
const VIDEO_FIELDS: &str = "uri,name,description,link,duration,created_time,release_time,\
pictures.sizes,stats.plays,metadata.connections.likes.total,\
metadata.connections.comments.total,tags.name,content_rating,\
user.name,user.link,user.pictures.sizes";

/// Vimeo API adapter. Lists channel, user, and search results with a field
/// projection, paging until the configured cap.
pub struct VimeoAdapter {
    client: Client,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PagedResponse {
    #[serde(default = "Vec::new")]
    data: Vec<VimeoVideo>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: Option<String>,
}

impl VimeoAdapter {
    pub fn new(access_token: &str) -> Self {
        let client = Client::builder()
            .user_agent("content-curator/0.1")
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            access_token: access_token.to_string(),
        }
    }

    async fn api_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let mut url = Url::parse(&format!("{API_BASE}{path}"))?;
        url.query_pairs_mut().extend_pairs(params);

        retry_with_backoff(
            || {
                let url = url.clone();
                async move {
                    let response = self
                        .client
                        .get(url)
                        .bearer_auth(&self.access_token)
                        .send()
                        .await?;
                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        let message = serde_json::from_str::<ApiError>(&body)
                            .ok()
                            .and_then(|e| e.error)
                            .unwrap_or_else(|| format!("Vimeo API returned HTTP {status}"));
                        return Err(CuratorError::provider(message, status.as_u16()));
                    }
                    Ok(response.json::<T>().await?)
                }
            },
            MAX_RETRIES,
            RETRY_BASE_DELAY,
        )
        .await
    }

    /// Page through a listing endpoint up to `max_results` videos.
    async fn collect_videos(
        &self,
        path: &str,
        extra_params: &[(&str, &str)],
        max_results: u64,
        source: &ContentSource,
    ) -> Result<Vec<ContentItem>> {
        let mut items = Vec::new();
        let mut page: u64 = 1;

        loop {
            let per_page = PAGE_SIZE.min(max_results - items.len() as u64).to_string();
            let page_str = page.to_string();
            let mut params = vec![
                ("fields", VIDEO_FIELDS),
                ("per_page", per_page.as_str()),
                ("page", page_str.as_str()),
                ("sort", "date"),
                ("direction", "desc"),
            ];
            params.extend_from_slice(extra_params);

            let response: PagedResponse = self.api_get(path, &params).await?;
            let has_next = response
                .paging
                .as_ref()
                .map(|p| p.next.is_some())
                .unwrap_or(false);

            for video in &response.data {
                match normalize_vimeo_video(video, source) {
                    Ok(item) => items.push(item),
                    Err(e) => warn!(uri = %video.uri, "Dropping video: {}", e),
                }
            }

            if !has_next || items.len() as u64 >= max_results {
                break;
            }
            page += 1;
        }

        items.truncate(max_results as usize);
        debug!(path, count = items.len(), "Collected Vimeo videos");
        Ok(items)
    }
}

#[async_trait]
impl ProviderAdapter for VimeoAdapter {
    fn platform(&self) -> &'static str {
        "vimeo"
    }

    async fn fetch_content(&self, source: &ContentSource) -> Result<Vec<ContentItem>> {
        let max_results = source.u64_param("maxResults").unwrap_or(DEFAULT_MAX_RESULTS);

        let items = match source.source_type {
            SourceType::Channel => {
                let path = format!("/channels/{}/videos", source.id);
                self.collect_videos(&path, &[], max_results, source).await?
            }
            SourceType::User => {
                let path = format!("/users/{}/videos", source.id);
                self.collect_videos(&path, &[], max_results, source).await?
            }
            SourceType::Search => {
                let query = source.str_param("q").filter(|q| !q.is_empty()).ok_or_else(|| {
                    CuratorError::Validation(format!(
                        "Search source '{}' has no query param",
                        source.id
                    ))
                })?;
                self.collect_videos("/videos", &[("query", query)], max_results, source)
                    .await?
            }
            SourceType::Video => {
                let path = format!("/videos/{}", source.id);
                let video: VimeoVideo = self.api_get(&path, &[("fields", VIDEO_FIELDS)]).await?;
                vec![normalize_vimeo_video(&video, source)?]
            }
            SourceType::Playlist => {
                return Err(CuratorError::Validation(format!(
                    "Source type 'playlist' is not supported on vimeo (source {})",
                    source.id
                )));
            }
        };

        info!(
            source_id = %source.id,
            source_type = source.source_type.as_str(),
            count = items.len(),
            "Fetched Vimeo content"
        );
        Ok(items)
    }

    fn validate_source(&self, source: &ContentSource) -> bool {
        if source.platform != self.platform() {
            return false;
        }
        match source.source_type {
            SourceType::Playlist => false,
            SourceType::Search => source
                .str_param("q")
                .map(|q| !q.is_empty())
                .unwrap_or(false),
            _ => !source.id.is_empty(),
        }
    }

    /// Single-item lookup never propagates provider errors: a missing or
    /// momentarily rate-limited video is just "not available here".
    async fn fetch_item_details(&self, item_id: &str) -> Result<Option<ContentItem>> {
        let path = format!("/videos/{item_id}");
        let result: Result<VimeoVideo> = self.api_get(&path, &[("fields", VIDEO_FIELDS)]).await;

        match result {
            Ok(video) => {
                let source = ContentSource {
                    platform: "vimeo".to_string(),
                    source_type: SourceType::Video,
                    id: item_id.to_string(),
                    params: None,
                };
                Ok(normalize_vimeo_video(&video, &source).ok())
            }
            Err(e) if e.is_not_found() => {
                debug!(item_id, "Vimeo video not found");
                Ok(None)
            }
            Err(e) if e.status_code() == Some(429) => {
                warn!(item_id, "Vimeo rate limit hit on detail lookup");
                Ok(None)
            }
            Err(e) => {
                warn!(item_id, "Vimeo detail lookup failed: {}", e);
                Ok(None)
            }
        }
    }

    async fn health_check(&self) -> Result<bool> {
        let response: serde_json::Value = self.api_get("/tutorial", &[]).await?;
        Ok(response.get("message").is_some() || response.is_object())
    }
}
