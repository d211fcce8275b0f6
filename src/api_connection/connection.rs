use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::endpoints::{embed_url, EmbedRequest, EmbedResponse, DEFAULT_EMBEDDING_MODEL, DEFAULT_OLLAMA_URL};

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("Network error: {0}")]
    NetworkError(#[source] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },

    #[error("Failed to decode embedding response: {0}")]
    DecodeError(#[source] reqwest::Error),

    #[error("No embeddings in response")]
    EmptyEmbeddings,
}

/// Turns query text into an embedding vector.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, ApiConnectionError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for an Ollama-compatible `/api/embed` endpoint. Does not retry.
pub struct OllamaClient {
    http_client: Client,
    url: String,
    config: EncoderConfig,
}

impl OllamaClient {
    pub fn new(config: EncoderConfig) -> Result<Self, ApiConnectionError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiConnectionError::NetworkError)?;
        Ok(Self {
            http_client,
            url: embed_url(&config.endpoint),
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Encoder for OllamaClient {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, ApiConnectionError> {
        let request = EmbedRequest {
            model: self.config.model.clone(),
            input: text.to_string(),
        };

        let response = self
            .http_client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiConnectionError::Timeout(self.config.timeout)
                } else {
                    ApiConnectionError::NetworkError(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(ApiConnectionError::ApiError { status, error_body });
        }

        let parsed = response
            .json::<EmbedResponse>()
            .await
            .map_err(ApiConnectionError::DecodeError)?;

        let embedding = parsed
            .embeddings
            .into_iter()
            .next()
            .ok_or(ApiConnectionError::EmptyEmbeddings)?;
        debug!(model = %self.config.model, dimension = embedding.len(), "Encoded query text");
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_embed_url() {
        let client = OllamaClient::new(EncoderConfig {
            endpoint: "http://127.0.0.1:9/".to_string(),
            ..EncoderConfig::default()
        })
        .unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:9/api/embed");
        assert_eq!(client.model(), DEFAULT_EMBEDDING_MODEL);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        // Port 9 (discard) is not expected to accept HTTP connections.
        let client = OllamaClient::new(EncoderConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            ..EncoderConfig::default()
        })
        .unwrap();
        let err = client.encode("new truck").await.unwrap_err();
        assert!(
            matches!(err, ApiConnectionError::NetworkError(_) | ApiConnectionError::Timeout(_)),
            "unexpected error: {}",
            err
        );
    }
}
