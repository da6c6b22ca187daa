//! HTTP embedding provider for OpenAI-compatible `/embeddings` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use knowledge_types::ProviderSettings;

use crate::error::EmbeddingError;
use crate::provider::{check_dimension, EmbeddingProvider};

/// Configuration for the HTTP embedding provider.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Embedding model name
    pub model: String,

    /// API key
    pub api_key: SecretString,

    /// Expected vector dimension
    pub dimension: usize,

    /// Request timeout
    pub timeout: Duration,
}

impl HttpProviderConfig {
    /// Create config for the Zhipu `embedding-2` endpoint.
    pub fn zhipu(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            model: "embedding-2".to_string(),
            api_key: SecretString::from(api_key.into()),
            dimension: 1024,
            timeout: Duration::from_secs(60),
        }
    }

    /// Create config for the OpenAI embeddings API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            dimension,
            timeout: Duration::from_secs(60),
        }
    }

    /// Build from loaded settings. The API key is mandatory here.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, EmbeddingError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                EmbeddingError::Config(
                    "provider.api_key is not set (KNOWLEDGE_PROVIDER__API_KEY)".to_string(),
                )
            })?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: SecretString::from(api_key),
            dimension: settings.dimension,
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding provider backed by a remote HTTP API.
///
/// One request per segment, no retries: callers that want a retry policy
/// wrap this provider.
pub struct HttpEmbeddingProvider {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpEmbeddingProvider {
    /// Create a new HTTP provider.
    pub fn new(config: HttpProviderConfig) -> Result<Self, EmbeddingError> {
        if config.dimension == 0 {
            return Err(EmbeddingError::Config("dimension must be > 0".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpProviderConfig {
        &self.config
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, segment: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: segment,
        };

        debug!(
            model = %self.config.model,
            chars = segment.chars().count(),
            "Requesting embedding"
        );

        let response = self
            .client
            .post(self.config.endpoint())
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbeddingError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("HTTP {}: {}", status, body)));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Parse(e.to_string()))?;

        let vector = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Parse("No data in response".to_string()))?;

        check_dimension(&vector, self.config.dimension)?;
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, dimension: usize) -> HttpProviderConfig {
        HttpProviderConfig {
            base_url: server.uri(),
            model: "embedding-2".to_string(),
            api_key: SecretString::from("test-key".to_string()),
            dimension,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_zhipu_config() {
        let config = HttpProviderConfig::zhipu("test-key");
        assert!(config.base_url.contains("bigmodel"));
        assert_eq!(config.model, "embedding-2");
        assert_eq!(config.dimension, 1024);
        assert_eq!(
            config.endpoint(),
            "https://open.bigmodel.cn/api/paas/v4/embeddings"
        );
    }

    #[test]
    fn test_openai_config() {
        let config = HttpProviderConfig::openai("test-key", "text-embedding-3-small", 1536);
        assert!(config.base_url.contains("openai"));
        assert_eq!(config.dimension, 1536);
    }

    #[test]
    fn test_from_settings_requires_api_key() {
        let settings = ProviderSettings::default();
        assert!(matches!(
            HttpProviderConfig::from_settings(&settings),
            Err(EmbeddingError::Config(_))
        ));
    }

    #[test]
    fn test_from_settings_trims_base_url() {
        let settings = ProviderSettings {
            base_url: "http://localhost:8080/v1/".to_string(),
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        let config = HttpProviderConfig::from_settings(&settings).unwrap();
        assert_eq!(config.endpoint(), "http://localhost:8080/v1/embeddings");
    }

    #[tokio::test]
    async fn test_embed_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_json(serde_json::json!({
                "model": "embedding-2",
                "input": "hello"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "embedding": [0.25, -0.5, 1.0] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(config_for(&server, 3)).unwrap();
        let vector = provider.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_embed_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(config_for(&server, 3)).unwrap();
        assert!(matches!(
            provider.embed("hello").await,
            Err(EmbeddingError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_embed_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(config_for(&server, 3)).unwrap();
        match provider.embed("hello").await {
            Err(EmbeddingError::Api(msg)) => assert!(msg.contains("500")),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_embed_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(config_for(&server, 3)).unwrap();
        assert!(matches!(
            provider.embed("hello").await,
            Err(EmbeddingError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_empty_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })),
            )
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(config_for(&server, 3)).unwrap();
        assert!(matches!(
            provider.embed("hello").await,
            Err(EmbeddingError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_wrong_dimension() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "embedding": [1.0, 2.0] }]
            })))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(config_for(&server, 3)).unwrap();
        assert!(matches!(
            provider.embed("hello").await,
            Err(EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
