use serde::{Deserialize, Serialize};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text:latest";
pub const EMBED_PATH: &str = "/api/embed";

/// Body of `POST /api/embed`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmbedRequest {
    pub model: String,
    pub input: String,
}

/// Ollama answers with one inner vector per input.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Joins the configured endpoint with the embed path, tolerating a trailing slash.
pub fn embed_url(endpoint: &str) -> String {
    format!("{}{}", endpoint.trim_end_matches('/'), EMBED_PATH)
}
