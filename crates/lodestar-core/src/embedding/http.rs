//! HTTP embedding client for OpenAI-compatible and Ollama endpoints.

use super::config::{EmbeddingConfig, EmbeddingEndpoint, EndpointShape};
use super::traits::EmbeddingProvider;
use crate::error::{ConfigError, ProviderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Embedding provider speaking one of the [`EndpointShape`] wire formats.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: EmbeddingEndpoint,
    model: String,
}

impl fmt::Debug for HttpEmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEmbeddingProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl HttpEmbeddingProvider {
    /// Builds a provider, resolving the endpoint from `config` and the
    /// process environment.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingEndpoint`] if no endpoint resolves
    /// - [`ConfigError::Invalid`] for an empty model id, a zero timeout, or an
    ///   HTTP client that cannot be built
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let endpoint = EmbeddingEndpoint::resolve(config)?;
        Self::with_endpoint(config, endpoint)
    }

    /// Builds a provider for an already resolved endpoint.
    ///
    /// # Errors
    ///
    /// Same as [`HttpEmbeddingProvider::new`], minus endpoint resolution.
    pub fn with_endpoint(
        config: &EmbeddingConfig,
        endpoint: EmbeddingEndpoint,
    ) -> Result<Self, ConfigError> {
        if config.model.trim().is_empty() {
            return Err(ConfigError::Invalid("embedding model must be set".into()));
        }
        if config.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "embedding timeout_secs must be > 0".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("lodestar/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {e}")))?;

        debug!(
            "Embedding endpoint: {:?} at {}",
            endpoint.shape, endpoint.url
        );

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &EmbeddingEndpoint {
        &self.endpoint
    }

    async fn send<B: Serialize + Sync>(&self, body: &B) -> Result<String, ProviderError> {
        let mut request = self.client.post(&self.endpoint.url).json(body);
        if let Some(key) = &self.endpoint.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Embedding API error {status}: {text}");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    #[instrument(skip_all, fields(text_len = text.len(), shape = ?self.endpoint.shape))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let embedding = match self.endpoint.shape {
            EndpointShape::OpenAi => {
                let body = OpenAiRequest {
                    model: &self.model,
                    input: text,
                    encoding_format: "float",
                };
                let response: OpenAiResponse = serde_json::from_str(&self.send(&body).await?)?;
                response
                    .data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .unwrap_or_default()
            }
            EndpointShape::Ollama => {
                let body = OllamaRequest {
                    model: &self.model,
                    prompt: text,
                };
                let response: OllamaResponse = serde_json::from_str(&self.send(&body).await?)?;
                response.embedding
            }
        };

        if embedding.is_empty() {
            return Err(ProviderError::EmptyEmbedding);
        }
        Ok(embedding)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a str,
    encoding_format: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, base_path: &str, key: Option<&str>) -> HttpEmbeddingProvider {
        let base_url = format!("{}{base_path}", server.uri());
        let mut config = EmbeddingConfig::new("test-embed").with_base_url(base_url);
        if let Some(key) = key {
            config = config.with_api_key(key);
        }
        let endpoint = EmbeddingEndpoint::resolve_with(&config, |_| None).unwrap();
        HttpEmbeddingProvider::with_endpoint(&config, endpoint).unwrap()
    }

    #[tokio::test]
    async fn test_openai_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-embed",
                "input": "cats are mammals",
                "encoding_format": "float"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.1, 0.2, 0.3]}]
            })))
            .mount(&server)
            .await;

        let provider = provider(&server, "/v1", Some("sk-test"));
        let embedding = provider.embed("cats are mammals").await.unwrap();

        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(provider.model_id(), "test-embed");
    }

    #[tokio::test]
    async fn test_ollama_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-embed",
                "prompt": "dogs"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embedding": [1.0, -1.0]})),
            )
            .mount(&server)
            .await;

        let provider = provider(&server, "", None);
        assert_eq!(provider.endpoint().shape, EndpointShape::Ollama);
        assert_eq!(provider.embed("dogs").await.unwrap(), vec![1.0, -1.0]);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let result = provider(&server, "", None).embed("x").await;

        match result {
            Err(ProviderError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_embedding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let result = provider(&server, "/v1", Some("k")).embed("x").await;
        assert!(matches!(result, Err(ProviderError::EmptyEmbedding)));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result = provider(&server, "", None).embed("x").await;
        assert!(matches!(result, Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_errors() {
        let config = EmbeddingConfig::new("m").with_base_url("http://127.0.0.1:1");
        let endpoint = EmbeddingEndpoint::resolve_with(&config, |_| None).unwrap();
        let provider = HttpEmbeddingProvider::with_endpoint(&config, endpoint).unwrap();

        assert!(matches!(
            provider.embed("x").await,
            Err(ProviderError::Http(_))
        ));
    }

    #[test]
    fn test_rejects_empty_model() {
        let config = EmbeddingConfig::new("").with_base_url("http://localhost:11434");
        let endpoint = EmbeddingEndpoint::resolve_with(&config, |_| None).unwrap();
        assert!(matches!(
            HttpEmbeddingProvider::with_endpoint(&config, endpoint),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let config = EmbeddingConfig::new("m")
            .with_base_url("https://api.example.com/v1")
            .with_api_key("sk-secret");
        let endpoint = EmbeddingEndpoint::resolve_with(&config, |_| None).unwrap();
        let provider = HttpEmbeddingProvider::with_endpoint(&config, endpoint).unwrap();
        assert!(!format!("{provider:?}").contains("sk-secret"));
    }
}
