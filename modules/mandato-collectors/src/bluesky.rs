//! Bluesky mention search via the public AppView API. No authentication
//! required.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mandato_common::text::normalize;
use mandato_common::SocialPlatform;

use crate::http::Fetcher;
use crate::types::RawMention;

const SEARCH_URL: &str = "https://public.api.bsky.app/xrpc/app.bsky.feed.searchPosts";

/// Hard limit of the searchPosts endpoint.
const API_MAX_RESULTS: u32 = 100;

pub struct BlueskyClient {
    fetcher: Fetcher,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Post {
    uri: String,
    author: Author,
    record: Record,
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    reply_count: i64,
    #[serde(default)]
    repost_count: i64,
    indexed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Author {
    handle: String,
    display_name: Option<String>,
    avatar: Option<String>,
    followers_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    #[serde(default)]
    text: String,
    created_at: Option<String>,
}

impl BlueskyClient {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            base_url: SEARCH_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Search public posts mentioning a politician. Posts that only matched
    /// the query loosely (no name token in the text) are dropped.
    pub async fn search_mentions(
        &self,
        name: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Vec<RawMention> {
        let limit = limit.min(API_MAX_RESULTS).to_string();
        let params = [("q", name), ("limit", limit.as_str())];

        let response: SearchResponse =
            match self.fetcher.get_json(&self.base_url, &params, cancel).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(name, error = %e, "Bluesky search failed");
                    return Vec::new();
                }
            };

        let mentions: Vec<RawMention> = response
            .posts
            .into_iter()
            .filter_map(|post| parse_post(post, name))
            .collect();

        info!(name, count = mentions.len(), "Bluesky mentions");
        mentions
    }
}

fn parse_post(post: Post, name: &str) -> Option<RawMention> {
    let text = post.record.text.clone();
    if text.is_empty() || !mentions_name(&text, name) {
        return None;
    }

    let post_id = post.uri.rsplit('/').next().unwrap_or_default().to_string();
    let mention_id = if post_id.is_empty() { post.uri.clone() } else { post_id.clone() };
    let url = (!post_id.is_empty())
        .then(|| format!("https://bsky.app/profile/{}/post/{post_id}", post.author.handle));

    // Reposts spread furthest, replies signal conversation.
    let engagement_score =
        (post.like_count + 2 * post.reply_count + 3 * post.repost_count) as f64;

    let posted_at = post
        .record
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| Some(Utc::now()));

    Some(RawMention {
        platform: SocialPlatform::Bluesky,
        mention_id,
        author: post
            .author
            .display_name
            .clone()
            .or_else(|| Some(post.author.handle.clone())),
        author_handle: Some(post.author.handle.clone()),
        content: text,
        url,
        likes: post.like_count,
        replies: post.reply_count,
        reposts: post.repost_count,
        engagement_score,
        posted_at,
        metadata: json!({
            "uri": post.uri,
            "author_avatar": post.author.avatar,
            "author_followers": post.author.followers_count,
            "indexed_at": post.indexed_at,
        }),
    })
}

/// Search results can match loosely; require the full name or at least the
/// first or last name token in the text.
fn mentions_name(text: &str, name: &str) -> bool {
    let text_norm = normalize(text);
    let name_norm = normalize(name);
    if name_norm.is_empty() {
        return false;
    }
    if text_norm.contains(&name_norm) {
        return true;
    }

    let tokens: Vec<&str> = name_norm.split_whitespace().collect();
    if tokens.len() < 2 {
        return false;
    }
    text_norm.contains(tokens[0]) || text_norm.contains(tokens[tokens.len() - 1])
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SEARCH_FIXTURE: &str = r#"{
      "posts": [
        {
          "uri": "at://did:plc:abc/app.bsky.feed.post/3kfx2",
          "author": {
            "handle": "cidadao.bsky.social",
            "displayName": "Cidadão Atento",
            "avatar": "https://cdn.bsky.app/avatar.jpg",
            "followersCount": 321
          },
          "record": {
            "text": "João Silva prometeu o hospital e nada até agora",
            "createdAt": "2025-01-14T22:10:00.000Z"
          },
          "likeCount": 10,
          "replyCount": 4,
          "repostCount": 2,
          "indexedAt": "2025-01-14T22:11:00.000Z"
        },
        {
          "uri": "at://did:plc:def/app.bsky.feed.post/9aaa1",
          "author": {"handle": "outro.bsky.social"},
          "record": {
            "text": "nada a ver com o assunto",
            "createdAt": "2025-01-14T20:00:00.000Z"
          },
          "likeCount": 1,
          "replyCount": 0,
          "repostCount": 0
        }
      ]
    }"#;

    #[tokio::test]
    async fn search_parses_posts_and_drops_weak_matches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "João Silva"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_FIXTURE))
            .mount(&server)
            .await;

        let fetcher = Fetcher::without_delay(Duration::from_secs(5));
        let client = BlueskyClient::new(fetcher).with_base_url(&server.uri());
        let mentions = client
            .search_mentions("João Silva", 50, &CancellationToken::new())
            .await;

        assert_eq!(mentions.len(), 1);
        let mention = &mentions[0];
        assert_eq!(mention.platform, SocialPlatform::Bluesky);
        assert_eq!(mention.mention_id, "3kfx2");
        assert_eq!(mention.author.as_deref(), Some("Cidadão Atento"));
        assert_eq!(
            mention.url.as_deref(),
            Some("https://bsky.app/profile/cidadao.bsky.social/post/3kfx2")
        );
        // likes + 2*replies + 3*reposts = 10 + 8 + 6
        assert_eq!(mention.engagement_score, 24.0);
        assert!(mention.posted_at.is_some());
    }

    #[tokio::test]
    async fn api_failure_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = Fetcher::without_delay(Duration::from_secs(5));
        let client = BlueskyClient::new(fetcher).with_base_url(&server.uri());
        let mentions = client
            .search_mentions("João Silva", 50, &CancellationToken::new())
            .await;
        assert!(mentions.is_empty());
    }

    #[test]
    fn name_matching_accepts_partial_tokens() {
        assert!(mentions_name("o deputado joão silva falou", "João Silva"));
        assert!(mentions_name("silva aprovou o projeto", "João Silva"));
        assert!(!mentions_name("texto sem relação", "João Silva"));
        assert!(!mentions_name("joão padeiro", "Lula"));
    }
}
