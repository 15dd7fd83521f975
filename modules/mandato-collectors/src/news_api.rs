//! NewsAPI.org adapter. Optional: without an API key the client reports
//! itself unavailable and aggregators skip it.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::http::Fetcher;
use crate::types::RawNews;

const BASE_URL: &str = "https://newsapi.org/v2";

/// The free plan only serves articles from the last 7 days.
const SEARCH_WINDOW_DAYS: i64 = 7;

pub struct NewsApiClient {
    fetcher: Fetcher,
    api_key: Option<String>,
    page_size: u32,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    source: ArticleSource,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: String,
    url_to_image: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

impl NewsApiClient {
    pub fn new(fetcher: Fetcher, api_key: Option<String>, page_size: u32) -> Self {
        if api_key.is_none() {
            info!("NewsAPI key not configured, adapter disabled");
        }
        Self {
            fetcher,
            api_key,
            page_size,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search /v2/everything for Portuguese-language articles from the last
    /// week.
    pub async fn search(&self, query: &str, cancel: &CancellationToken) -> Vec<RawNews> {
        let api_key = match &self.api_key {
            Some(key) => key.clone(),
            None => return Vec::new(),
        };

        let from = (Utc::now() - Duration::days(SEARCH_WINDOW_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        let page_size = self.page_size.to_string();
        let url = format!("{}/everything", self.base_url);
        let params = [
            ("q", query),
            ("language", "pt"),
            ("sortBy", "relevancy"),
            ("pageSize", page_size.as_str()),
            ("from", from.as_str()),
            ("apiKey", api_key.as_str()),
        ];

        let response: SearchResponse = match self.fetcher.get_json(&url, &params, cancel).await {
            Ok(response) => response,
            Err(e) => {
                warn!(query, error = %e, "NewsAPI search failed");
                return Vec::new();
            }
        };

        if response.status != "ok" {
            warn!(query, status = %response.status, "NewsAPI returned non-ok status");
            return Vec::new();
        }

        let items: Vec<RawNews> = response
            .articles
            .into_iter()
            .filter_map(article_to_raw)
            .collect();
        info!(query, count = items.len(), "NewsAPI results");
        items
    }

    pub async fn search_politician(
        &self,
        name: &str,
        city: Option<&str>,
        cancel: &CancellationToken,
    ) -> Vec<RawNews> {
        let query = match city {
            Some(city) => format!("{name} {city}"),
            None => name.to_string(),
        };
        self.search(&query, cancel).await
    }

    pub async fn search_city(
        &self,
        city: &str,
        state: Option<&str>,
        cancel: &CancellationToken,
    ) -> Vec<RawNews> {
        let query = match state {
            Some(state) => format!("{city} {state}"),
            None => city.to_string(),
        };
        self.search(&query, cancel).await
    }

    pub async fn search_state(&self, uf: &str, cancel: &CancellationToken) -> Vec<RawNews> {
        self.search(&format!("política {uf}"), cancel).await
    }

    pub async fn search_national(&self, cancel: &CancellationToken) -> Vec<RawNews> {
        self.search("política Brasil", cancel).await
    }
}

fn article_to_raw(article: Article) -> Option<RawNews> {
    let title = article.title.filter(|t| !t.is_empty())?;
    let mut item = RawNews::new(title, article.url);
    item.description = article.description.filter(|d| !d.is_empty());
    item.full_text = article.content.filter(|c| !c.is_empty());
    item.image_url = article.url_to_image.filter(|u| !u.is_empty());
    item.source_name = article.source.name.filter(|n| !n.is_empty());
    item.published_at = article.published_at;
    Some(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESPONSE_FIXTURE: &str = r#"{
      "status": "ok",
      "totalResults": 2,
      "articles": [
        {
          "source": {"id": null, "name": "Folha de S.Paulo"},
          "title": "Prefeito anuncia pacote de obras",
          "description": "Pacote inclui novas creches.",
          "content": "O prefeito anunciou nesta terça um pacote...",
          "url": "https://folha.com.br/pacote",
          "urlToImage": "https://folha.com.br/img.jpg",
          "publishedAt": "2025-01-15T13:00:00Z"
        },
        {
          "source": {"id": null, "name": null},
          "title": null,
          "description": null,
          "content": null,
          "url": "https://semtitulo.com/x",
          "urlToImage": null,
          "publishedAt": null
        }
      ]
    }"#;

    fn client(server_uri: &str, key: Option<&str>) -> NewsApiClient {
        let fetcher = Fetcher::without_delay(StdDuration::from_secs(5));
        NewsApiClient::new(fetcher, key.map(str::to_string), 20).with_base_url(server_uri)
    }

    #[tokio::test]
    async fn search_maps_articles_and_skips_untitled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/everything"))
            .and(query_param("language", "pt"))
            .and(query_param("apiKey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESPONSE_FIXTURE))
            .mount(&server)
            .await;

        let items = client(&server.uri(), Some("test-key"))
            .search("prefeito", &CancellationToken::new())
            .await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Prefeito anuncia pacote de obras");
        assert_eq!(items[0].source_name.as_deref(), Some("Folha de S.Paulo"));
        assert!(items[0].full_text.is_some());
        assert!(items[0].published_at.is_some());
    }

    #[tokio::test]
    async fn missing_key_disables_adapter_without_network() {
        let server = MockServer::start().await;
        // No mounted mocks: a request would 404 and show up as an error.
        let adapter = client(&server.uri(), None);
        assert!(!adapter.is_available());
        let items = adapter.search("prefeito", &CancellationToken::new()).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn non_ok_status_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"status": "error", "articles": []}"#),
            )
            .mount(&server)
            .await;

        let items = client(&server.uri(), Some("k"))
            .search("x", &CancellationToken::new())
            .await;
        assert!(items.is_empty());
    }
}
