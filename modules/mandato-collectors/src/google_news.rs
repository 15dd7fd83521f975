//! Google News search adapter.
//!
//! Queries the Google News search RSS feed for pt-BR results and optionally
//! extracts full article content from the target page. All operations fail
//! soft: network or parse trouble yields an empty result, never an error.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::http::Fetcher;
use crate::types::{ArticleContent, RawNews};

const SEARCH_FEED_URL: &str = "https://news.google.com/rss/search";

/// Region parameters for Brazilian results.
const FEED_PARAMS: [(&str, &str); 3] = [("hl", "pt-BR"), ("gl", "BR"), ("ceid", "BR:pt-419")];

pub struct GoogleNewsClient {
    fetcher: Fetcher,
    max_results: usize,
    base_url: String,
}

impl GoogleNewsClient {
    pub fn new(fetcher: Fetcher, max_results: usize) -> Self {
        Self {
            fetcher,
            max_results,
            base_url: SEARCH_FEED_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Search the news feed for a free-text query.
    pub async fn search(&self, query: &str, cancel: &CancellationToken) -> Vec<RawNews> {
        let url = format!("{}?q={}", self.base_url, urlencoding::encode(query));
        let url = FEED_PARAMS
            .iter()
            .fold(url, |acc, (k, v)| format!("{acc}&{k}={v}"));

        let body = match self.fetcher.get_text(&url, cancel).await {
            Ok(body) => body,
            Err(e) => {
                warn!(query, error = %e, "Google News search failed");
                return Vec::new();
            }
        };

        let items = parse_feed(body.as_bytes(), self.max_results);
        info!(query, count = items.len(), "Google News results");
        items
    }

    /// News about a politician, optionally narrowed by their city.
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

    /// State-level political news: three queries against the state's full
    /// name and assembly, deduplicated by raw URL.
    pub async fn search_state(&self, uf: &str, cancel: &CancellationToken) -> Vec<RawNews> {
        let name = state_name(uf);
        let queries = [
            format!("política {name}"),
            format!("governo {name}"),
            format!("assembleia legislativa {}", uf.to_uppercase()),
        ];
        self.search_many(&queries, cancel).await
    }

    /// National political news.
    pub async fn search_national(&self, cancel: &CancellationToken) -> Vec<RawNews> {
        let queries = [
            "política Brasil".to_string(),
            "Congresso Nacional".to_string(),
            "Câmara dos Deputados".to_string(),
            "Senado Federal".to_string(),
        ];
        self.search_many(&queries, cancel).await
    }

    async fn search_many(&self, queries: &[String], cancel: &CancellationToken) -> Vec<RawNews> {
        let mut seen = HashSet::new();
        let mut all = Vec::new();
        for query in queries {
            for item in self.search(query, cancel).await {
                if seen.insert(item.url.clone()) {
                    all.push(item);
                }
            }
        }
        all
    }

    /// Best-effort extraction of full article content from the target page.
    /// Returns an empty `ArticleContent` when the page cannot be fetched or
    /// parsed.
    pub async fn fetch_article(&self, url: &str, cancel: &CancellationToken) -> ArticleContent {
        match self.fetcher.get_text(url, cancel).await {
            Ok(html) => parse_article(&html),
            Err(e) => {
                warn!(url, error = %e, "Article fetch failed");
                ArticleContent::default()
            }
        }
    }
}

/// Parse the Google News search RSS payload into raw candidates.
///
/// Google News titles come as "Headline - Publisher"; the publisher suffix
/// doubles as the source name.
pub fn parse_feed(bytes: &[u8], max_results: usize) -> Vec<RawNews> {
    let feed = match feed_rs::parser::parse(bytes) {
        Ok(feed) => feed,
        Err(e) => {
            warn!(error = %e, "Failed to parse news feed");
            return Vec::new();
        }
    };

    feed.entries
        .into_iter()
        .filter_map(|entry| {
            let url = entry.links.first().map(|l| l.href.clone())?;
            let raw_title = entry.title.map(|t| t.content).unwrap_or_default();
            if raw_title.is_empty() {
                return None;
            }
            let (title, source_name) = split_publisher_suffix(&raw_title);

            let mut item = RawNews::new(title, url);
            item.source_name = source_name;
            item.description = entry.summary.map(|s| s.content).filter(|s| !s.is_empty());
            item.published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc));
            Some(item)
        })
        .take(max_results)
        .collect()
}

/// Split the " - Publisher" suffix Google News appends to titles.
fn split_publisher_suffix(raw_title: &str) -> (String, Option<String>) {
    match raw_title.rsplit_once(" - ") {
        Some((title, publisher)) if !title.is_empty() && !publisher.is_empty() => {
            (title.trim().to_string(), Some(publisher.trim().to_string()))
        }
        _ => (raw_title.trim().to_string(), None),
    }
}

/// Extract article content from an HTML page: Open Graph metadata plus the
/// concatenated article paragraphs.
pub fn parse_article(html: &str) -> ArticleContent {
    let document = Html::parse_document(html);

    let title = meta_content(&document, "meta[property=\"og:title\"]")
        .or_else(|| select_text(&document, "title"));
    let description = meta_content(&document, "meta[property=\"og:description\"]")
        .or_else(|| meta_content(&document, "meta[name=\"description\"]"));
    let image_url = meta_content(&document, "meta[property=\"og:image\"]");
    let published_at = meta_content(&document, "meta[property=\"article:published_time\"]")
        .or_else(|| attr_content(&document, "time[datetime]", "datetime"))
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let full_text = extract_body_text(&document);

    ArticleContent {
        title,
        description,
        full_text,
        image_url,
        published_at,
    }
}

fn extract_body_text(document: &Html) -> Option<String> {
    let article_p = Selector::parse("article p").unwrap();
    let mut paragraphs: Vec<String> = document
        .select(&article_p)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if paragraphs.is_empty() {
        // No <article> element: fall back to substantial top-level paragraphs.
        let any_p = Selector::parse("p").unwrap();
        paragraphs = document
            .select(&any_p)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .filter(|t| t.len() > 80)
            .collect();
    }

    if paragraphs.is_empty() {
        return None;
    }
    Some(paragraphs.join("\n\n"))
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    attr_content(document, selector, "content")
}

fn attr_content(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Full state name for a two-letter code; unknown codes pass through.
fn state_name(uf: &str) -> String {
    let name = match uf.to_uppercase().as_str() {
        "AC" => "Acre",
        "AL" => "Alagoas",
        "AP" => "Amapá",
        "AM" => "Amazonas",
        "BA" => "Bahia",
        "CE" => "Ceará",
        "DF" => "Distrito Federal",
        "ES" => "Espírito Santo",
        "GO" => "Goiás",
        "MA" => "Maranhão",
        "MT" => "Mato Grosso",
        "MS" => "Mato Grosso do Sul",
        "MG" => "Minas Gerais",
        "PA" => "Pará",
        "PB" => "Paraíba",
        "PR" => "Paraná",
        "PE" => "Pernambuco",
        "PI" => "Piauí",
        "RJ" => "Rio de Janeiro",
        "RN" => "Rio Grande do Norte",
        "RS" => "Rio Grande do Sul",
        "RO" => "Rondônia",
        "RR" => "Roraima",
        "SC" => "Santa Catarina",
        "SP" => "São Paulo",
        "SE" => "Sergipe",
        "TO" => "Tocantins",
        _ => return uf.to_string(),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>"joão silva" - Google Notícias</title>
  <item>
    <title>João Silva visita obra - G1</title>
    <link>https://news.google.com/rss/articles/abc?url=https://g1.globo.com/visita</link>
    <pubDate>Wed, 15 Jan 2025 10:30:00 GMT</pubDate>
    <description>O deputado visitou as obras nesta quarta.</description>
  </item>
  <item>
    <title>Assembleia vota projeto - Estadão</title>
    <link>https://estadao.com.br/projeto</link>
    <pubDate>Wed, 15 Jan 2025 08:00:00 GMT</pubDate>
  </item>
  <item>
    <title></title>
    <link>https://semtitulo.com/x</link>
  </item>
</channel></rss>"#;

    #[test]
    fn feed_parses_title_source_and_date() {
        let items = parse_feed(FEED_FIXTURE.as_bytes(), 20);
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "João Silva visita obra");
        assert_eq!(items[0].source_name.as_deref(), Some("G1"));
        assert!(items[0].published_at.is_some());
        assert_eq!(
            items[0].description.as_deref(),
            Some("O deputado visitou as obras nesta quarta.")
        );

        assert_eq!(items[1].source_name.as_deref(), Some("Estadão"));
    }

    #[test]
    fn feed_respects_max_results() {
        let items = parse_feed(FEED_FIXTURE.as_bytes(), 1);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn feed_garbage_yields_empty() {
        assert!(parse_feed(b"not xml at all", 10).is_empty());
    }

    #[test]
    fn publisher_suffix_split() {
        assert_eq!(
            split_publisher_suffix("Manchete - Folha de S.Paulo"),
            ("Manchete".to_string(), Some("Folha de S.Paulo".to_string()))
        );
        assert_eq!(split_publisher_suffix("Sem fonte"), ("Sem fonte".to_string(), None));
    }

    const ARTICLE_FIXTURE: &str = r#"<!DOCTYPE html><html><head>
      <title>Fallback title</title>
      <meta property="og:title" content="João Silva visita obra do hospital" />
      <meta property="og:description" content="Visita ocorreu na manhã desta quarta." />
      <meta property="og:image" content="https://g1.globo.com/img/hero.jpg" />
      <meta property="article:published_time" content="2025-01-15T10:30:00-03:00" />
    </head><body>
      <article>
        <p>O deputado João Silva visitou nesta quarta-feira as obras do novo hospital municipal.</p>
        <p>Segundo Silva, a entrega está prevista para o segundo semestre.</p>
      </article>
    </body></html>"#;

    #[test]
    fn article_extracts_metadata_and_body() {
        let content = parse_article(ARTICLE_FIXTURE);
        assert_eq!(content.title.as_deref(), Some("João Silva visita obra do hospital"));
        assert_eq!(
            content.description.as_deref(),
            Some("Visita ocorreu na manhã desta quarta.")
        );
        assert_eq!(content.image_url.as_deref(), Some("https://g1.globo.com/img/hero.jpg"));
        assert!(content.published_at.is_some());

        let body = content.full_text.unwrap();
        assert!(body.contains("obras do novo hospital"));
        assert!(body.contains("segundo semestre"));
    }

    #[test]
    fn article_without_og_tags_falls_back() {
        let html = "<html><head><title>Só título</title></head><body><p>curto</p></body></html>";
        let content = parse_article(html);
        assert_eq!(content.title.as_deref(), Some("Só título"));
        assert!(content.full_text.is_none());
        assert!(content.image_url.is_none());
    }

    #[test]
    fn state_name_lookup() {
        assert_eq!(state_name("SP"), "São Paulo");
        assert_eq!(state_name("rj"), "Rio de Janeiro");
        assert_eq!(state_name("XX"), "XX");
    }

    #[tokio::test]
    async fn search_parses_feed_from_server() {
        use wiremock::matchers::{method, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "joão silva"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED_FIXTURE))
            .mount(&server)
            .await;

        let fetcher = Fetcher::without_delay(std::time::Duration::from_secs(5));
        let client = GoogleNewsClient::new(fetcher, 10).with_base_url(&server.uri());
        let items = client.search("joão silva", &CancellationToken::new()).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "João Silva visita obra");
    }

    #[tokio::test]
    async fn search_fails_soft_on_server_error() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = Fetcher::without_delay(std::time::Duration::from_secs(5));
        let client = GoogleNewsClient::new(fetcher, 10).with_base_url(&server.uri());
        let items = client.search("qualquer coisa", &CancellationToken::new()).await;
        assert!(items.is_empty());
    }
}
