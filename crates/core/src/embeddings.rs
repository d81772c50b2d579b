use crate::http::{check_status, endpoint_url, read_json};
use crate::traits::Embedder;
use crate::{ConfigError, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const EMBEDDINGS_API_VERSION: &str = "2023-07-01-preview";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

const BACKEND: &str = "azure-openai-embeddings";

/// Embedding deployment on an Azure OpenAI resource.
pub struct AzureOpenAiEmbedder {
    client: Client,
    url: Url,
    api_key: String,
    model: String,
}

impl AzureOpenAiEmbedder {
    pub fn new(
        client: Client,
        endpoint: &str,
        deployment: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let url = endpoint_url(
            "embedding endpoint",
            endpoint,
            &["openai", "deployments", deployment, "embeddings"],
            EMBEDDINGS_API_VERSION,
        )?;
        Ok(Self {
            client,
            url,
            api_key: api_key.into(),
            model: deployment.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for AzureOpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let response = self
            .client
            .post(self.url.clone())
            .header("api-key", &self.api_key)
            .json(&EmbeddingRequest {
                input: text,
                model: &self.model,
            })
            .send()
            .await?;

        let response = check_status(BACKEND, response).await?;
        let parsed: EmbeddingResponse = read_json(BACKEND, response).await?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .unwrap_or_default();

        if embedding.is_empty() {
            return Err(ProviderError::MalformedPayload {
                backend: BACKEND.to_string(),
                details: "response carried no embedding".to_string(),
            });
        }

        Ok(embedding)
    }
}
