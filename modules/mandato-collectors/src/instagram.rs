//! Instagram profile-post adapter.
//!
//! Enabled only when account credentials are configured; public profile data
//! is fetched through the web profile-info endpoint with the standard web
//! app id. Private or missing profiles yield empty results.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mandato_common::{MediaType, SocialPlatform};

use crate::http::Fetcher;
use crate::types::RawPost;

const PROFILE_INFO_URL: &str = "https://i.instagram.com/api/v1/users/web_profile_info/";

/// App id the web client sends; required by the profile-info endpoint.
const WEB_APP_ID: &str = "936619743392459";

/// Captions are capped before persistence.
const MAX_CAPTION_CHARS: usize = 1000;

pub struct InstagramClient {
    fetcher: Fetcher,
    credentials: Option<(String, String)>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    data: ProfileData,
}

#[derive(Debug, Deserialize)]
struct ProfileData {
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    #[serde(default)]
    is_private: bool,
    edge_owner_to_timeline_media: Option<MediaConnection>,
}

#[derive(Debug, Deserialize)]
struct MediaConnection {
    #[serde(default)]
    edges: Vec<MediaEdge>,
}

#[derive(Debug, Deserialize)]
struct MediaEdge {
    node: MediaNode,
}

#[derive(Debug, Deserialize)]
struct MediaNode {
    shortcode: String,
    display_url: Option<String>,
    #[serde(default)]
    is_video: bool,
    edge_liked_by: Option<Count>,
    edge_media_to_comment: Option<Count>,
    taken_at_timestamp: Option<i64>,
    edge_media_to_caption: Option<CaptionConnection>,
}

#[derive(Debug, Deserialize)]
struct Count {
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Deserialize)]
struct CaptionConnection {
    #[serde(default)]
    edges: Vec<CaptionEdge>,
}

#[derive(Debug, Deserialize)]
struct CaptionEdge {
    node: CaptionNode,
}

#[derive(Debug, Deserialize)]
struct CaptionNode {
    #[serde(default)]
    text: String,
}

impl InstagramClient {
    pub fn new(
        fetcher: Fetcher,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        let credentials = match (username, password) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => {
                info!("Instagram credentials not configured, adapter disabled");
                None
            }
        };
        Self {
            fetcher,
            credentials,
            base_url: PROFILE_INFO_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn is_available(&self) -> bool {
        self.credentials.is_some()
    }

    /// Fetch the most recent posts of a profile.
    pub async fn fetch_profile_posts(
        &self,
        username: &str,
        max_posts: usize,
        cancel: &CancellationToken,
    ) -> Vec<RawPost> {
        if self.credentials.is_none() {
            return Vec::new();
        }

        let params = [("username", username)];
        let headers = [("x-ig-app-id", WEB_APP_ID)];

        let response: ProfileResponse = match self
            .fetcher
            .get_json_with_headers(&self.base_url, &params, &headers, cancel)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(username, error = %e, "Instagram profile fetch failed");
                return Vec::new();
            }
        };

        let posts = parse_profile_posts(response, max_posts);
        info!(username, count = posts.len(), "Instagram posts");
        posts
    }
}

fn parse_profile_posts(response: ProfileResponse, max_posts: usize) -> Vec<RawPost> {
    let user = match response.data.user {
        Some(user) => user,
        None => {
            warn!("Instagram profile does not exist");
            return Vec::new();
        }
    };
    if user.is_private {
        warn!("Instagram profile is private, skipping");
        return Vec::new();
    }

    user.edge_owner_to_timeline_media
        .map(|media| media.edges)
        .unwrap_or_default()
        .into_iter()
        .take(max_posts)
        .map(|edge| node_to_post(edge.node))
        .collect()
}

fn node_to_post(node: MediaNode) -> RawPost {
    let likes = node.edge_liked_by.map(|c| c.count).unwrap_or(0);
    let comments = node.edge_media_to_comment.map(|c| c.count).unwrap_or(0);
    let caption = node
        .edge_media_to_caption
        .and_then(|c| c.edges.into_iter().next())
        .map(|e| truncate_chars(&e.node.text, MAX_CAPTION_CHARS))
        .filter(|t| !t.is_empty());

    RawPost {
        platform: SocialPlatform::Instagram,
        post_id: node.shortcode.clone(),
        url: Some(format!("https://www.instagram.com/p/{}/", node.shortcode)),
        content: caption,
        likes,
        comments,
        engagement_score: engagement_score(likes, comments),
        media_type: if node.is_video { MediaType::Video } else { MediaType::Image },
        media_url: node.display_url,
        posted_at: node
            .taken_at_timestamp
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
    }
}

/// Comments signal much stronger engagement than likes.
pub fn engagement_score(likes: i64, comments: i64) -> f64 {
    (likes + comments * 5) as f64
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PROFILE_FIXTURE: &str = r#"{
      "data": {
        "user": {
          "is_private": false,
          "edge_owner_to_timeline_media": {
            "edges": [
              {
                "node": {
                  "shortcode": "Cx1abc",
                  "display_url": "https://scontent.cdninstagram.com/1.jpg",
                  "is_video": false,
                  "edge_liked_by": {"count": 1200},
                  "edge_media_to_comment": {"count": 40},
                  "taken_at_timestamp": 1736935800,
                  "edge_media_to_caption": {
                    "edges": [{"node": {"text": "Visita às obras do hospital"}}]
                  }
                }
              },
              {
                "node": {
                  "shortcode": "Cx2def",
                  "display_url": "https://scontent.cdninstagram.com/2.jpg",
                  "is_video": true,
                  "edge_liked_by": {"count": 300},
                  "edge_media_to_comment": {"count": 12},
                  "taken_at_timestamp": 1736849400,
                  "edge_media_to_caption": {"edges": []}
                }
              }
            ]
          }
        }
      }
    }"#;

    fn client(server_uri: &str, with_creds: bool) -> InstagramClient {
        let fetcher = Fetcher::without_delay(Duration::from_secs(5));
        let (user, pass) = if with_creds {
            (Some("bot".to_string()), Some("secret".to_string()))
        } else {
            (None, None)
        };
        InstagramClient::new(fetcher, user, pass).with_base_url(server_uri)
    }

    #[tokio::test]
    async fn fetches_and_maps_profile_posts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("username", "deputado"))
            .and(header("x-ig-app-id", WEB_APP_ID))
            .respond_with(ResponseTemplate::new(200).set_body_string(PROFILE_FIXTURE))
            .mount(&server)
            .await;

        let posts = client(&server.uri(), true)
            .fetch_profile_posts("deputado", 10, &CancellationToken::new())
            .await;

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].post_id, "Cx1abc");
        assert_eq!(posts[0].url.as_deref(), Some("https://www.instagram.com/p/Cx1abc/"));
        assert_eq!(posts[0].media_type, MediaType::Image);
        // likes + 5*comments = 1200 + 200
        assert_eq!(posts[0].engagement_score, 1400.0);
        assert_eq!(posts[1].media_type, MediaType::Video);
        assert!(posts[1].content.is_none());
    }

    #[tokio::test]
    async fn respects_max_posts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PROFILE_FIXTURE))
            .mount(&server)
            .await;

        let posts = client(&server.uri(), true)
            .fetch_profile_posts("deputado", 1, &CancellationToken::new())
            .await;
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn disabled_without_credentials() {
        let server = MockServer::start().await;
        let adapter = client(&server.uri(), false);
        assert!(!adapter.is_available());
        let posts = adapter
            .fetch_profile_posts("deputado", 10, &CancellationToken::new())
            .await;
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn missing_profile_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"data": {"user": null}}"#),
            )
            .mount(&server)
            .await;

        let posts = client(&server.uri(), true)
            .fetch_profile_posts("fantasma", 10, &CancellationToken::new())
            .await;
        assert!(posts.is_empty());
    }

    #[test]
    fn engagement_weights_comments() {
        assert_eq!(engagement_score(100, 10), 150.0);
        assert_eq!(engagement_score(0, 0), 0.0);
    }
}
