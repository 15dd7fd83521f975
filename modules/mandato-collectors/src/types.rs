use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mandato_common::{MediaType, SocialPlatform};

/// A candidate article as produced by a news-search adapter, before scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNews {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub source_name: Option<String>,
    pub full_text: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub shares: i64,
    pub comments: i64,
    pub likes: i64,
}

impl RawNews {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            url: url.into(),
            source_name: None,
            full_text: None,
            image_url: None,
            published_at: None,
            shares: 0,
            comments: 0,
            likes: 0,
        }
    }
}

/// A third-party post referring to a politician, as produced by a
/// social-search adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMention {
    pub platform: SocialPlatform,
    pub mention_id: String,
    pub author: Option<String>,
    pub author_handle: Option<String>,
    pub content: String,
    pub url: Option<String>,
    pub likes: i64,
    pub replies: i64,
    pub reposts: i64,
    pub engagement_score: f64,
    pub posted_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

/// A post from the politician's own account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPost {
    pub platform: SocialPlatform,
    pub post_id: String,
    pub url: Option<String>,
    pub content: Option<String>,
    pub likes: i64,
    pub comments: i64,
    pub engagement_score: f64,
    pub media_type: MediaType,
    pub media_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

/// One ranked trending entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingEntry {
    pub rank: i32,
    pub title: String,
    pub subtitle: Option<String>,
}

/// Content extracted from an article page in the enrichment pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub full_text: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl ArticleContent {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.full_text.is_none()
            && self.image_url.is_none()
            && self.published_at.is_none()
    }
}
