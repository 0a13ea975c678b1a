use crate::error::{retry_with_backoff, CuratorError, Result};
use crate::normalizer::{normalize_youtube_video, normalize_youtube_videos, YouTubeVideo};
use crate::sources::ProviderAdapter;
use crate::types::{ContentItem, ContentSource, SourceType};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const PAGE_SIZE: u64 = 50;
const DEFAULT_MAX_RESULTS: u64 = 50;
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// YouTube Data API v3 adapter. Resolves channels and users to their uploads
/// playlist, pages through playlist and search results, and hydrates full
/// video resources in batches of 50.
pub struct YouTubeAdapter {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResource {
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResource {
    id: SearchResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl YouTubeAdapter {
    pub fn new(api_key: &str) -> Self {
        let client = Client::builder()
            .user_agent("content-curator/0.1")
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.to_string(),
        }
    }

    /// One GET against the Data API with retries on transient failures.
    /// Non-2xx responses become provider errors carrying the API's own
    /// message, which is where quota exhaustion is detected.
    async fn api_get<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let mut url = Url::parse(&format!("{API_BASE}/{resource}"))?;
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .extend_pairs(params);

        retry_with_backoff(
            || {
                let url = url.clone();
                async move {
                    let response = self.client.get(url).send().await?;
                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                            .ok()
                            .and_then(|e| e.error)
                            .and_then(|e| e.message)
                            .unwrap_or_else(|| format!("YouTube API returned HTTP {status}"));
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

    /// Resolve a channel (by ID or by legacy username) to its uploads
    /// playlist ID.
    async fn resolve_uploads_playlist(&self, id: &str, by_username: bool) -> Result<String> {
        let id_param = if by_username {
            ("forUsername", id)
        } else if id.starts_with('@') {
            ("forHandle", id)
        } else {
            ("id", id)
        };
        let response: ListResponse<ChannelResource> = self
            .api_get("channels", &[("part", "contentDetails"), id_param])
            .await?;

        response
            .items
            .into_iter()
            .next()
            .and_then(|c| c.content_details)
            .and_then(|d| d.related_playlists)
            .and_then(|p| p.uploads)
            .ok_or_else(|| CuratorError::NotFound {
                resource_type: "channel".to_string(),
                resource_id: id.to_string(),
            })
    }

    /// Collect up to `max_results` video IDs from a playlist, walking
    /// `nextPageToken` until exhausted.
    async fn collect_playlist_video_ids(
        &self,
        playlist_id: &str,
        max_results: u64,
    ) -> Result<Vec<String>> {
        let mut video_ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_size = PAGE_SIZE.min(max_results - video_ids.len() as u64).to_string();
            let mut params = vec![
                ("part", "contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.as_str()));
            }

            let response: ListResponse<PlaylistItemResource> =
                self.api_get("playlistItems", &params).await?;

            video_ids.extend(
                response
                    .items
                    .into_iter()
                    .filter_map(|i| i.content_details.and_then(|d| d.video_id)),
            );

            page_token = response.next_page_token;
            if page_token.is_none() || video_ids.len() as u64 >= max_results {
                break;
            }
        }

        video_ids.truncate(max_results as usize);
        Ok(video_ids)
    }

    async fn collect_search_video_ids(
        &self,
        query: &str,
        max_results: u64,
    ) -> Result<Vec<String>> {
        let mut video_ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_size = PAGE_SIZE.min(max_results - video_ids.len() as u64).to_string();
            let mut params = vec![
                ("part", "id"),
                ("q", query),
                ("type", "video"),
                ("order", "date"),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.as_str()));
            }

            let response: ListResponse<SearchResource> = self.api_get("search", &params).await?;

            video_ids.extend(response.items.into_iter().filter_map(|i| i.id.video_id));

            page_token = response.next_page_token;
            if page_token.is_none() || video_ids.len() as u64 >= max_results {
                break;
            }
        }

        video_ids.truncate(max_results as usize);
        Ok(video_ids)
    }

    /// Hydrate full video resources for a list of IDs, batched at the API's
    /// limit of 50 per call. Records that fail normalization are dropped
    /// individually rather than failing the batch.
    async fn fetch_videos_by_ids(
        &self,
        video_ids: &[String],
        source: &ContentSource,
    ) -> Result<Vec<ContentItem>> {
        let mut items = Vec::with_capacity(video_ids.len());

        for chunk in video_ids.chunks(PAGE_SIZE as usize) {
            let ids = chunk.join(",");
            let response: ListResponse<YouTubeVideo> = self
                .api_get(
                    "videos",
                    &[
                        ("part", "snippet,contentDetails,statistics,status"),
                        ("id", ids.as_str()),
                    ],
                )
                .await?;

            items.extend(normalize_youtube_videos(&response.items, source));
        }

        debug!(
            source_id = %source.id,
            count = items.len(),
            "Hydrated YouTube videos"
        );
        Ok(items)
    }
}

#[async_trait]
impl ProviderAdapter for YouTubeAdapter {
    fn platform(&self) -> &'static str {
        "youtube"
    }

    async fn fetch_content(&self, source: &ContentSource) -> Result<Vec<ContentItem>> {
        let max_results = source.u64_param("maxResults").unwrap_or(DEFAULT_MAX_RESULTS);

        let video_ids = match source.source_type {
            SourceType::Channel => {
                let uploads = self.resolve_uploads_playlist(&source.id, false).await?;
                self.collect_playlist_video_ids(&uploads, max_results).await?
            }
            SourceType::User => {
                let uploads = self.resolve_uploads_playlist(&source.id, true).await?;
                self.collect_playlist_video_ids(&uploads, max_results).await?
            }
            SourceType::Playlist => {
                self.collect_playlist_video_ids(&source.id, max_results).await?
            }
            SourceType::Search => {
                let query = source.str_param("q").filter(|q| !q.is_empty()).ok_or_else(|| {
                    CuratorError::Validation(format!(
                        "Search source '{}' has no query param",
                        source.id
                    ))
                })?;
                self.collect_search_video_ids(query, max_results).await?
            }
            SourceType::Video => vec![source.id.clone()],
        };

        let items = self.fetch_videos_by_ids(&video_ids, source).await?;
        info!(
            source_id = %source.id,
            source_type = source.source_type.as_str(),
            count = items.len(),
            "Fetched YouTube content"
        );
        Ok(items)
    }

    fn validate_source(&self, source: &ContentSource) -> bool {
        if source.platform != self.platform() {
            return false;
        }
        match source.source_type {
            // A search is only fetchable with an explicit query param
            SourceType::Search => source
                .str_param("q")
                .map(|q| !q.is_empty())
                .unwrap_or(false),
            _ => !source.id.is_empty(),
        }
    }

    async fn fetch_item_details(&self, item_id: &str) -> Result<Option<ContentItem>> {
        let response: ListResponse<YouTubeVideo> = self
            .api_get(
                "videos",
                &[
                    ("part", "snippet,contentDetails,statistics,status"),
                    ("id", item_id),
                ],
            )
            .await?;

        let Some(video) = response.items.first() else {
            return Ok(None);
        };

        let source = ContentSource {
            platform: "youtube".to_string(),
            source_type: SourceType::Video,
            id: item_id.to_string(),
            params: None,
        };
        Ok(normalize_youtube_video(video, &source).ok())
    }

    async fn health_check(&self) -> Result<bool> {
        // Cheapest authenticated call: a single-region i18n lookup
        let response: serde_json::Value = self
            .api_get("i18nRegions", &[("part", "snippet"), ("hl", "en")])
            .await?;
        Ok(response.get("items").is_some())
    }
}
