//! Subject/sentiment classification of social mentions.
//!
//! A thin wrapper over the chat endpoint, batched in small chunks to
//! amortize cost. Without an API key it degrades to defaults for every input
//! and never touches the network; errors also produce defaults, so callers
//! never have to handle a failure.

use serde::Deserialize;
use tracing::{info, warn};

use mandato_common::{Sentiment, Subject};

use crate::client::{ChatClient, ChatMessage, ChatRequest, ResponseFormat};
use crate::util::{strip_code_blocks, truncate_chars};

/// Mentions per chat request.
const BATCH_SIZE: usize = 5;

/// Mention text is clipped before entering the prompt.
const MAX_CONTENT_CHARS: usize = 300;

/// Subject detail is clipped before persistence.
const MAX_DETAIL_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub subject: Subject,
    pub subject_detail: String,
    pub sentiment: Sentiment,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            subject: Subject::Other,
            subject_detail: String::new(),
            sentiment: Sentiment::Neutral,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    classifications: Vec<RawClassification>,
}

#[derive(Debug, Deserialize, Default)]
struct RawClassification {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    subject_detail: String,
    #[serde(default)]
    sentiment: String,
}

pub struct TopicClassifier {
    client: Option<ChatClient>,
    model: String,
}

impl TopicClassifier {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        let client = match api_key {
            Some(key) => Some(ChatClient::new(&key)),
            None => {
                info!("LLM key not configured, mention classification degrades to defaults");
                None
            }
        };
        Self { client, model }
    }

    /// Swap the underlying client (tests point it at a local server).
    pub fn with_client(mut self, client: ChatClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    /// Classify a batch of mention texts. Always returns exactly one
    /// classification per input, in order.
    pub async fn classify_batch(
        &self,
        texts: &[String],
        politician_name: &str,
    ) -> Vec<Classification> {
        let client = match &self.client {
            Some(client) => client,
            None => return vec![Classification::default(); texts.len()],
        };

        let mut results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            match self.classify_chunk(client, chunk, politician_name).await {
                Ok(mut classified) => {
                    // Pad short responses so outputs stay aligned with inputs.
                    classified.resize(chunk.len(), Classification::default());
                    results.extend(classified.into_iter().take(chunk.len()));
                }
                Err(e) => {
                    warn!(error = %e, "Classification chunk failed, using defaults");
                    results.extend(vec![Classification::default(); chunk.len()]);
                }
            }
        }
        results
    }

    async fn classify_chunk(
        &self,
        client: &ChatClient,
        chunk: &[String],
        politician_name: &str,
    ) -> anyhow::Result<Vec<Classification>> {
        let numbered: Vec<String> = chunk
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| format!("{}. \"{}\"", i + 1, truncate_chars(text, MAX_CONTENT_CHARS)))
            .collect();

        if numbered.is_empty() {
            return Ok(vec![Classification::default(); chunk.len()]);
        }

        let categories = Subject::ALL
            .iter()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join(", ");

        let prompt = format!(
            "Analise estas {} menções sobre o político {politician_name}:\n\n{}\n\n\
             Para cada menção, classifique:\n\
             - subject: uma das categorias: {categories}\n\
             - subject_detail: breve descrição do contexto (máx 80 caracteres)\n\
             - sentiment: positive, negative ou neutral\n\n\
             Responda em JSON com um array \"classifications\" contendo objetos \
             com as chaves: subject, subject_detail, sentiment",
            numbered.len(),
            numbered.join("\n"),
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(
                    "Você é um analista político brasileiro. Classifique menções em redes \
                     sociais sobre políticos. Responda apenas em JSON válido.",
                ),
                ChatMessage::user(prompt),
            ],
            response_format: ResponseFormat::json_object(),
            max_tokens: 500,
            temperature: 0.3,
        };

        let content = client.chat(&request).await?;
        let envelope: Envelope = serde_json::from_str(strip_code_blocks(&content))?;

        Ok(envelope.classifications.into_iter().map(normalize).collect())
    }
}

fn normalize(raw: RawClassification) -> Classification {
    Classification {
        subject: Subject::parse_lossy(&raw.subject),
        subject_detail: truncate_chars(&raw.subject_detail, MAX_DETAIL_CHARS).to_string(),
        sentiment: Sentiment::parse_lossy(&raw.sentiment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("menção {i} sobre saúde")).collect()
    }

    #[tokio::test]
    async fn unconfigured_classifier_returns_defaults_without_network() {
        let classifier = TopicClassifier::new(None, "gpt-4o-mini".to_string());
        assert!(!classifier.is_available());

        let results = classifier.classify_batch(&texts(50), "João Silva").await;
        assert_eq!(results.len(), 50);
        for classification in results {
            assert_eq!(classification.subject, Subject::Other);
            assert_eq!(classification.subject_detail, "");
            assert_eq!(classification.sentiment, Sentiment::Neutral);
        }
    }

    #[tokio::test]
    async fn classifies_and_normalizes_via_server() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{
                "message": {
                    "content": r#"{"classifications": [
                        {"subject": "Health", "subject_detail": "Inauguração de hospital", "sentiment": "positive"},
                        {"subject": "Categoria Inventada", "subject_detail": "", "sentiment": "mixed"}
                    ]}"#
                }
            }]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let classifier = TopicClassifier::new(None, "gpt-4o-mini".to_string())
            .with_client(ChatClient::new("test-key").with_base_url(&server.uri()));

        let results = classifier.classify_batch(&texts(2), "João Silva").await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].subject, Subject::Health);
        assert_eq!(results[0].sentiment, Sentiment::Positive);
        // Unknown category and sentiment collapse to the defaults.
        assert_eq!(results[1].subject, Subject::Other);
        assert_eq!(results[1].sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn short_responses_are_padded_per_chunk() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{
                "message": {
                    "content": r#"{"classifications": [
                        {"subject": "Economy", "subject_detail": "x", "sentiment": "negative"}
                    ]}"#
                }
            }]
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let classifier = TopicClassifier::new(None, "gpt-4o-mini".to_string())
            .with_client(ChatClient::new("test-key").with_base_url(&server.uri()));

        let results = classifier.classify_batch(&texts(4), "João Silva").await;
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].subject, Subject::Economy);
        assert_eq!(results[1], Classification::default());
    }

    #[tokio::test]
    async fn server_errors_degrade_to_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let classifier = TopicClassifier::new(None, "gpt-4o-mini".to_string())
            .with_client(ChatClient::new("test-key").with_base_url(&server.uri()));

        let results = classifier.classify_batch(&texts(7), "João Silva").await;
        assert_eq!(results.len(), 7);
        assert!(results.iter().all(|c| c.subject == Subject::Other));
    }

    #[tokio::test]
    async fn batches_in_chunks_of_five() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{"message": {"content": r#"{"classifications": []}"#}}]
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(3)
            .mount(&server)
            .await;

        let classifier = TopicClassifier::new(None, "gpt-4o-mini".to_string())
            .with_client(ChatClient::new("test-key").with_base_url(&server.uri()));

        let results = classifier.classify_batch(&texts(12), "João Silva").await;
        assert_eq!(results.len(), 12);
    }

    #[test]
    fn detail_truncated_to_150_chars() {
        let raw = RawClassification {
            subject: "Health".to_string(),
            subject_detail: "x".repeat(400),
            sentiment: "neutral".to_string(),
        };
        let classification = normalize(raw);
        assert_eq!(classification.subject_detail.chars().count(), 150);
    }
}
