//! Embedding endpoint configuration and resolution.

use crate::config::DEFAULT_EMBED_TIMEOUT_SECS;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment variable holding an OpenAI-compatible base URL.
pub const ENV_EMBEDDING_BASE_URL: &str = "EMBEDDING_BASE_URL";
/// Environment variable holding the key for [`ENV_EMBEDDING_BASE_URL`].
pub const ENV_EMBEDDING_KEY: &str = "EMBEDDING_KEY";
/// Environment variable holding an Ollama base URL.
pub const ENV_OLLAMA_EMBED_BASE_URL: &str = "OLLAMA_EMBED_BASE_URL";

/// Wire format spoken by an embedding endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointShape {
    /// `POST {base}/embeddings` with `{model, input}`, reply `{data: [{embedding}]}`
    OpenAi,
    /// `POST {base}/api/embeddings` with `{model, prompt}`, reply `{embedding}`
    Ollama,
}

impl EndpointShape {
    fn endpoint_url(self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            EndpointShape::OpenAi => format!("{base}/embeddings"),
            EndpointShape::Ollama => format!("{base}/api/embeddings"),
        }
    }
}

/// Embedding provider settings.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model id sent with every request and stamped into index metadata
    pub model: String,
    /// Base URL; when absent the environment is consulted
    pub base_url: Option<String>,
    /// Bearer token for an explicit `base_url`
    pub api_key: Option<String>,
    /// Forces the wire shape instead of inferring it from `base_url`
    pub shape: Option<EndpointShape>,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            base_url: None,
            api_key: None,
            shape: None,
            timeout_secs: DEFAULT_EMBED_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("shape", &self.shape)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl EmbeddingConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: EndpointShape) -> Self {
        self.shape = Some(shape);
        self
    }
}

/// A fully resolved endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct EmbeddingEndpoint {
    pub shape: EndpointShape,
    /// Full request URL
    pub url: String,
    pub api_key: Option<String>,
}

impl fmt::Debug for EmbeddingEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingEndpoint")
            .field("shape", &self.shape)
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl EmbeddingEndpoint {
    /// Resolves against the process environment.
    ///
    /// # Errors
    ///
    /// See [`EmbeddingEndpoint::resolve_with`].
    pub fn resolve(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Resolves an endpoint, first match wins:
    ///
    /// 1. `config.base_url`: OpenAI shape if it contains `/v1`, else Ollama,
    ///    unless `config.shape` says otherwise
    /// 2. `EMBEDDING_BASE_URL` and `EMBEDDING_KEY` both set: OpenAI shape
    /// 3. `OLLAMA_EMBED_BASE_URL` set: Ollama shape
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingEndpoint`] if nothing matches.
    pub fn resolve_with<F>(config: &EmbeddingConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        if let Some(base_url) = non_empty(config.base_url.clone()) {
            let shape = config.shape.unwrap_or(if base_url.contains("/v1") {
                EndpointShape::OpenAi
            } else {
                EndpointShape::Ollama
            });
            return Ok(Self {
                shape,
                url: shape.endpoint_url(&base_url),
                api_key: non_empty(config.api_key.clone()),
            });
        }

        let openai_url = non_empty(env(ENV_EMBEDDING_BASE_URL));
        let openai_key = non_empty(env(ENV_EMBEDDING_KEY));
        if let (Some(base_url), Some(key)) = (openai_url, openai_key) {
            return Ok(Self {
                shape: EndpointShape::OpenAi,
                url: EndpointShape::OpenAi.endpoint_url(&base_url),
                api_key: Some(key),
            });
        }

        if let Some(base_url) = non_empty(env(ENV_OLLAMA_EMBED_BASE_URL)) {
            return Ok(Self {
                shape: EndpointShape::Ollama,
                url: EndpointShape::Ollama.endpoint_url(&base_url),
                api_key: None,
            });
        }

        Err(ConfigError::MissingEndpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_v1_url_is_openai() {
        let config = EmbeddingConfig::new("m")
            .with_base_url("https://api.example.com/v1/")
            .with_api_key("sk-test");
        let endpoint = EmbeddingEndpoint::resolve_with(&config, env_of(&[])).unwrap();

        assert_eq!(endpoint.shape, EndpointShape::OpenAi);
        assert_eq!(endpoint.url, "https://api.example.com/v1/embeddings");
        assert_eq!(endpoint.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_explicit_plain_url_is_ollama() {
        let config = EmbeddingConfig::new("m").with_base_url("http://localhost:11434");
        let endpoint = EmbeddingEndpoint::resolve_with(&config, env_of(&[])).unwrap();

        assert_eq!(endpoint.shape, EndpointShape::Ollama);
        assert_eq!(endpoint.url, "http://localhost:11434/api/embeddings");
    }

    #[test]
    fn test_shape_override() {
        let config = EmbeddingConfig::new("m")
            .with_base_url("http://gateway.internal")
            .with_shape(EndpointShape::OpenAi);
        let endpoint = EmbeddingEndpoint::resolve_with(&config, env_of(&[])).unwrap();

        assert_eq!(endpoint.url, "http://gateway.internal/embeddings");
    }

    #[test]
    fn test_explicit_url_wins_over_env() {
        let config = EmbeddingConfig::new("m").with_base_url("http://localhost:11434");
        let env = env_of(&[
            (ENV_EMBEDDING_BASE_URL, "https://api.example.com/v1"),
            (ENV_EMBEDDING_KEY, "sk-env"),
        ]);
        let endpoint = EmbeddingEndpoint::resolve_with(&config, env).unwrap();
        assert_eq!(endpoint.shape, EndpointShape::Ollama);
    }

    #[test]
    fn test_env_openai_requires_key() {
        let config = EmbeddingConfig::new("m");

        let only_url = env_of(&[(ENV_EMBEDDING_BASE_URL, "https://api.example.com/v1")]);
        assert_eq!(
            EmbeddingEndpoint::resolve_with(&config, only_url),
            Err(ConfigError::MissingEndpoint)
        );

        let both = env_of(&[
            (ENV_EMBEDDING_BASE_URL, "https://api.example.com/v1"),
            (ENV_EMBEDDING_KEY, "sk-env"),
        ]);
        let endpoint = EmbeddingEndpoint::resolve_with(&config, both).unwrap();
        assert_eq!(endpoint.shape, EndpointShape::OpenAi);
        assert_eq!(endpoint.api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn test_env_openai_before_ollama() {
        let env = env_of(&[
            (ENV_EMBEDDING_BASE_URL, "https://api.example.com/v1"),
            (ENV_EMBEDDING_KEY, "sk-env"),
            (ENV_OLLAMA_EMBED_BASE_URL, "http://localhost:11434"),
        ]);
        let endpoint = EmbeddingEndpoint::resolve_with(&EmbeddingConfig::new("m"), env).unwrap();
        assert_eq!(endpoint.shape, EndpointShape::OpenAi);
    }

    #[test]
    fn test_env_ollama() {
        let env = env_of(&[(ENV_OLLAMA_EMBED_BASE_URL, "http://localhost:11434/")]);
        let endpoint = EmbeddingEndpoint::resolve_with(&EmbeddingConfig::new("m"), env).unwrap();

        assert_eq!(endpoint.shape, EndpointShape::Ollama);
        assert_eq!(endpoint.url, "http://localhost:11434/api/embeddings");
        assert_eq!(endpoint.api_key, None);
    }

    #[test]
    fn test_nothing_configured() {
        let env = env_of(&[(ENV_OLLAMA_EMBED_BASE_URL, "  ")]);
        assert_eq!(
            EmbeddingEndpoint::resolve_with(&EmbeddingConfig::new("m"), env),
            Err(ConfigError::MissingEndpoint)
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = EmbeddingConfig::new("m").with_api_key("sk-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: EmbeddingConfig =
            serde_json::from_str(r#"{"model": "nomic-embed-text"}"#).unwrap();
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.shape, None);

        let config: EmbeddingConfig =
            serde_json::from_str(r#"{"model": "m", "shape": "openai"}"#).unwrap();
        assert_eq!(config.shape, Some(EndpointShape::OpenAi));
    }
}
