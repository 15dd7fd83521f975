//! Wikidata SPARQL adapter for official social handles.
//!
//! P2003 is the Instagram username property, P2002 the X/Twitter one.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::http::Fetcher;

const SPARQL_URL: &str = "https://query.wikidata.org/sparql";

pub struct WikidataClient {
    fetcher: Fetcher,
    base_url: String,
}

/// Handles found for one entity, still unnormalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialHandles {
    pub instagram: Option<String>,
    pub x: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<Binding>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    instagram: Option<BoundValue>,
    twitter: Option<BoundValue>,
}

#[derive(Debug, Deserialize)]
struct BoundValue {
    value: String,
}

impl WikidataClient {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            base_url: SPARQL_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Fetch the social handles registered for a QID. Empty on any failure.
    pub async fn social_handles(&self, qid: &str, cancel: &CancellationToken) -> SocialHandles {
        let query = format!(
            "SELECT ?instagram ?twitter WHERE {{ \
             OPTIONAL {{ wd:{qid} wdt:P2003 ?instagram. }} \
             OPTIONAL {{ wd:{qid} wdt:P2002 ?twitter. }} \
             }} LIMIT 1"
        );
        let params = [("query", query.as_str()), ("format", "json")];

        let response: SparqlResponse = match self
            .fetcher
            .get_json(&self.base_url, &params, cancel)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(qid, error = %e, "Wikidata query failed");
                return SocialHandles::default();
            }
        };

        let binding = match response.results.bindings.into_iter().next() {
            Some(binding) => binding,
            None => return SocialHandles::default(),
        };

        SocialHandles {
            instagram: binding.instagram.map(|v| v.value),
            x: binding.twitter.map(|v| v.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_bound_handles() {
        let server = MockServer::start().await;
        let body = r#"{
          "results": {
            "bindings": [
              {
                "instagram": {"type": "literal", "value": "deputadojoao"},
                "twitter": {"type": "literal", "value": "joao_oficial"}
              }
            ]
          }
        }"#;
        Mock::given(method("GET"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = WikidataClient::new(Fetcher::without_delay(Duration::from_secs(5)))
            .with_base_url(&server.uri());
        let handles = client.social_handles("Q123", &CancellationToken::new()).await;
        assert_eq!(handles.instagram.as_deref(), Some("deputadojoao"));
        assert_eq!(handles.x.as_deref(), Some("joao_oficial"));
    }

    #[tokio::test]
    async fn empty_bindings_yield_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"results": {"bindings": []}}"#),
            )
            .mount(&server)
            .await;

        let client = WikidataClient::new(Fetcher::without_delay(Duration::from_secs(5)))
            .with_base_url(&server.uri());
        let handles = client.social_handles("Q123", &CancellationToken::new()).await;
        assert_eq!(handles, SocialHandles::default());
    }

    #[tokio::test]
    async fn server_error_yields_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = WikidataClient::new(Fetcher::without_delay(Duration::from_secs(5)))
            .with_base_url(&server.uri());
        let handles = client.social_handles("Q123", &CancellationToken::new()).await;
        assert_eq!(handles, SocialHandles::default());
    }
}
