//! Normalization of provider wire formats into [`ContentItem`].
//!
//! Each provider returns its own JSON shape; everything downstream of the
//! adapters (filters, cache, service) only ever sees the canonical model
//! produced here.

use crate::error::{CuratorError, Result};
use crate::types::{ContentItem, ContentMetadata, ContentRating, ContentSource, ContentType};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{error, warn};

// ---------------------------------------------------------------------------
// YouTube wire types (Data API v3)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeVideo {
    pub id: String,
    pub snippet: Option<YouTubeSnippet>,
    pub content_details: Option<YouTubeContentDetails>,
    pub statistics: Option<YouTubeStatistics>,
    pub status: Option<YouTubeStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: Option<String>,
    pub channel_id: Option<String>,
    pub channel_title: Option<String>,
    pub thumbnails: Option<YouTubeThumbnails>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category_id: Option<String>,
    pub default_language: Option<String>,
    pub default_audio_language: Option<String>,
    pub live_broadcast_content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeThumbnails {
    pub default: Option<YouTubeThumbnail>,
    pub medium: Option<YouTubeThumbnail>,
    pub high: Option<YouTubeThumbnail>,
    pub standard: Option<YouTubeThumbnail>,
    pub maxres: Option<YouTubeThumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeThumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeContentDetails {
    pub duration: Option<String>,
    pub caption: Option<String>,
    pub content_rating: Option<YouTubeContentRating>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeContentRating {
    pub yt_rating: Option<String>,
}

// YouTube returns statistics counters as strings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeStatistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeStatus {
    pub made_for_kids: Option<bool>,
}

// ---------------------------------------------------------------------------
// Vimeo wire types (API v3.4)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct VimeoVideo {
    pub uri: String,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    #[serde(default)]
    pub duration: u64,
    pub created_time: Option<String>,
    pub release_time: Option<String>,
    pub pictures: Option<VimeoPictures>,
    pub stats: Option<VimeoStats>,
    pub metadata: Option<VimeoMetadata>,
    #[serde(default)]
    pub tags: Vec<VimeoTag>,
    #[serde(default)]
    pub content_rating: Vec<String>,
    pub user: Option<VimeoUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VimeoPictures {
    #[serde(default)]
    pub sizes: Vec<VimeoPictureSize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VimeoPictureSize {
    pub link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VimeoStats {
    pub plays: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VimeoMetadata {
    pub connections: Option<VimeoConnections>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VimeoConnections {
    pub likes: Option<VimeoConnectionTotal>,
    pub comments: Option<VimeoConnectionTotal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VimeoConnectionTotal {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VimeoTag {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VimeoUser {
    pub name: Option<String>,
    pub link: Option<String>,
    pub pictures: Option<VimeoPictures>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Convert a full YouTube video resource into the canonical model.
/// Errors only on structurally unusable records (no snippet); callers drop
/// those items with a warning rather than failing the whole batch.
pub fn normalize_youtube_video(video: &YouTubeVideo, source: &ContentSource) -> Result<ContentItem> {
    if video.id.is_empty() {
        return Err(CuratorError::Normalization(
            "YouTube video is missing an ID".to_string(),
        ));
    }
    let snippet = video.snippet.as_ref().ok_or_else(|| {
        CuratorError::Normalization(format!("YouTube video {} has no snippet", video.id))
    })?;

    let published_at = snippet
        .published_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(|| {
            warn!(video_id = %video.id, "Unparseable publishedAt, using fetch time");
            Utc::now()
        });

    let thumbnails = snippet.thumbnails.as_ref();
    let thumbnail = thumbnails
        .and_then(|t| t.medium.as_ref().or(t.default.as_ref()).or(t.high.as_ref()))
        .map(|t| t.url.clone())
        .unwrap_or_default();
    let thumbnail_high = thumbnails
        .and_then(|t| t.maxres.as_ref().or(t.standard.as_ref()).or(t.high.as_ref()))
        .map(|t| t.url.clone());

    let details = video.content_details.as_ref();
    let duration = details
        .and_then(|d| d.duration.as_deref())
        .map(|d| parse_iso8601_duration(d).unwrap_or_else(|| {
            warn!(video_id = %video.id, duration = %d, "Unparseable ISO 8601 duration");
            0
        }))
        .unwrap_or(0);

    let yt_rating = details
        .and_then(|d| d.content_rating.as_ref())
        .and_then(|r| r.yt_rating.clone());
    let content_rating = ContentRating {
        age_restricted: yt_rating.as_deref() == Some("ytAgeRestricted"),
        made_for_kids: video
            .status
            .as_ref()
            .and_then(|s| s.made_for_kids)
            .unwrap_or(false),
        yt_rating,
    };

    let stats = video.statistics.as_ref();
    let count = |value: Option<&String>| value.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);

    Ok(ContentItem {
        id: video.id.clone(),
        title: snippet.title.clone(),
        description: snippet.description.clone(),
        content_type: ContentType::Video,
        platform: "youtube".to_string(),
        url: format!("https://www.youtube.com/watch?v={}", video.id),
        thumbnail,
        thumbnail_high,
        channel_id: snippet.channel_id.clone(),
        channel_name: snippet.channel_title.clone(),
        channel_thumbnail: None,
        published_at,
        duration,
        view_count: count(stats.and_then(|s| s.view_count.as_ref())),
        like_count: count(stats.and_then(|s| s.like_count.as_ref())),
        comment_count: count(stats.and_then(|s| s.comment_count.as_ref())),
        tags: snippet.tags.clone(),
        category_name: snippet
            .category_id
            .as_deref()
            .map(|id| youtube_category_name(id).to_string()),
        category_id: snippet.category_id.clone(),
        default_language: snippet.default_language.clone(),
        default_audio_language: snippet.default_audio_language.clone(),
        content_rating: Some(content_rating),
        has_closed_captions: details.map(|d| d.caption.as_deref() == Some("true")),
        is_live_content: snippet
            .live_broadcast_content
            .as_deref()
            .map(|l| l != "none"),
        metadata: source_metadata(source),
    })
}

/// Convert a Vimeo video resource into the canonical model. The numeric ID is
/// the tail of the `uri` field ("/videos/12345").
pub fn normalize_vimeo_video(video: &VimeoVideo, source: &ContentSource) -> Result<ContentItem> {
    let id = video
        .uri
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            CuratorError::Normalization(format!("Vimeo video has an unusable uri: {}", video.uri))
        })?
        .to_string();

    let published_at = video
        .release_time
        .as_deref()
        .or(video.created_time.as_deref())
        .and_then(parse_timestamp)
        .unwrap_or_else(|| {
            warn!(video_id = %id, "Vimeo video has no usable timestamp, using fetch time");
            Utc::now()
        });

    let sizes = video
        .pictures
        .as_ref()
        .map(|p| p.sizes.as_slice())
        .unwrap_or(&[]);
    let thumbnail = sizes
        .get(2)
        .or_else(|| sizes.first())
        .map(|s| s.link.clone())
        .unwrap_or_default();
    let thumbnail_high = sizes.get(4).or_else(|| sizes.last()).map(|s| s.link.clone());

    let connections = video
        .metadata
        .as_ref()
        .and_then(|m| m.connections.as_ref());

    let user = video.user.as_ref();

    Ok(ContentItem {
        title: video.name.clone(),
        description: video.description.clone().unwrap_or_default(),
        content_type: ContentType::Video,
        platform: "vimeo".to_string(),
        url: video
            .link
            .clone()
            .unwrap_or_else(|| format!("https://vimeo.com/{id}")),
        thumbnail,
        thumbnail_high,
        channel_id: user
            .and_then(|u| u.link.as_deref())
            .and_then(|link| link.rsplit('/').next())
            .map(str::to_string),
        channel_name: user.and_then(|u| u.name.clone()),
        channel_thumbnail: user
            .and_then(|u| u.pictures.as_ref())
            .and_then(|p| p.sizes.last())
            .map(|s| s.link.clone()),
        published_at,
        duration: video.duration,
        view_count: video.stats.as_ref().and_then(|s| s.plays).unwrap_or(0),
        like_count: connections
            .and_then(|c| c.likes.as_ref())
            .map(|t| t.total)
            .unwrap_or(0),
        comment_count: connections
            .and_then(|c| c.comments.as_ref())
            .map(|t| t.total)
            .unwrap_or(0),
        tags: video.tags.iter().map(|t| t.name.clone()).collect(),
        category_id: None,
        category_name: None,
        default_language: None,
        default_audio_language: None,
        content_rating: Some(ContentRating {
            yt_rating: None,
            made_for_kids: false,
            age_restricted: video
                .content_rating
                .iter()
                .any(|r| r.contains("adversely")),
        }),
        has_closed_captions: None,
        is_live_content: None,
        metadata: source_metadata(source),
        id,
    })
}

/// Normalize a batch, dropping records that fail with an error log. A bad
/// record never aborts the batch.
pub fn normalize_youtube_videos(
    videos: &[YouTubeVideo],
    source: &ContentSource,
) -> Vec<ContentItem> {
    videos
        .iter()
        .filter_map(|video| match normalize_youtube_video(video, source) {
            Ok(item) => Some(item),
            Err(e) => {
                error!(video_id = %video.id, "Dropping video: {}", e);
                None
            }
        })
        .collect()
}

fn source_metadata(source: &ContentSource) -> ContentMetadata {
    ContentMetadata {
        fetched_at: Utc::now(),
        source_type: source.source_type.as_str().to_string(),
        source_id: source.id.clone(),
        filter_results: None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Parse an ISO 8601 duration of the `PT#H#M#S` form into seconds.
/// Returns None for anything outside that form (e.g. `P0D` live placeholders).
pub fn parse_iso8601_duration(raw: &str) -> Option<u64> {
    static DURATION_RE: OnceLock<Regex> = OnceLock::new();
    let re = DURATION_RE
        .get_or_init(|| Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").unwrap());

    let captures = re.captures(raw)?;
    let part = |i: usize| {
        captures
            .get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    // PT alone is not a duration
    if captures.get(1).is_none() && captures.get(2).is_none() && captures.get(3).is_none() {
        return None;
    }
    Some(part(1) * 3600 + part(2) * 60 + part(3))
}

/// Human-readable name for a YouTube category ID
pub fn youtube_category_name(category_id: &str) -> &'static str {
    match category_id {
        "1" => "Film & Animation",
        "2" => "Autos & Vehicles",
        "10" => "Music",
        "15" => "Pets & Animals",
        "17" => "Sports",
        "18" => "Short Movies",
        "19" => "Travel & Events",
        "20" => "Gaming",
        "21" => "Videoblogging",
        "22" => "People & Blogs",
        "23" => "Comedy",
        "24" => "Entertainment",
        "25" => "News & Politics",
        "26" => "Howto & Style",
        "27" => "Education",
        "28" => "Science & Technology",
        "29" => "Nonprofits & Activism",
        "30" => "Movies",
        "31" => "Anime/Animation",
        "32" => "Action/Adventure",
        "33" => "Classics",
        "34" => "Comedy",
        "35" => "Documentary",
        "36" => "Drama",
        "37" => "Family",
        "38" => "Foreign",
        "39" => "Horror",
        "40" => "Sci-Fi/Fantasy",
        "41" => "Thriller",
        "42" => "Shorts",
        "43" => "Shows",
        "44" => "Trailers",
        _ => "Unknown",
    }
}
