//! OpenAI-compatible embedding client.
//!
//! Produces fixed-dimension vectors for a list of strings, batching large
//! inputs internally. Every returned vector is checked against the declared
//! dimension; a provider returning anything else is a hard error rather than
//! silently corrupted similarity search.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use statecraft_core::error::ProviderError;
use statecraft_core::provider::Embedder;
use statecraft_core::setting::EmbeddingModelConfig;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Largest number of inputs sent in one request.
const BATCH_LIMIT: usize = 256;

pub struct OpenAiEmbeddingClient {
    base_url: String,
    api_key: String,
    model: String,
    vector_dim: usize,
    batch_limit: usize,
    client: reqwest::Client,
}

impl OpenAiEmbeddingClient {
    pub fn new(config: &EmbeddingModelConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            vector_dim: config.vector_dim,
            batch_limit: BATCH_LIMIT,
            client,
        })
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "input": inputs,
            "encoding_format": "float",
        });

        debug!(model = %self.model, count = inputs.len(), "Sending embedding request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::Auth("Invalid API key".into()));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: EmbeddingApiResponse = response.json().await.map_err(|e| {
            ProviderError::BadResponse(format!("Failed to parse embedding response: {e}"))
        })?;

        let vectors: Vec<Vec<f32>> = api_resp.data.into_iter().map(|d| d.embedding).collect();

        for vector in &vectors {
            if vector.len() != self.vector_dim {
                return Err(ProviderError::DimensionMismatch {
                    expected: self.vector_dim,
                    actual: vector.len(),
                });
            }
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbeddingClient {
    fn dimension(&self) -> usize {
        self.vector_dim
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(self.batch_limit.max(1)) {
            let result = match self.embed_batch(batch).await {
                // Transport failures get one retry
                Err(ProviderError::Network(e)) | Err(ProviderError::Timeout(e)) => {
                    warn!(error = %e, "Embedding transport failure, retrying once");
                    self.embed_batch(batch).await
                }
                other => other,
            };
            vectors.extend(result?);
        }
        Ok(vectors)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
