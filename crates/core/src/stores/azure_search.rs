use crate::http::{check_status, endpoint_url, read_json};
use crate::stores::schema::CandidateSchema;
use crate::traits::VectorIndex;
use crate::{ConfigError, ProviderError, RetrievedCandidate};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use url::Url;

pub const SEARCH_API_VERSION: &str = "2023-11-01";

const BACKEND: &str = "azure-search";
const PREVIEW_CHARS: usize = 50;

/// Researcher index hosted on Azure AI Search.
pub struct AzureSearchIndex {
    client: Client,
    url: Url,
    api_key: String,
    schema: CandidateSchema,
}

/// One field of a sampled index document, for diagnosing schema drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPreview {
    pub name: String,
    pub preview: String,
}

impl AzureSearchIndex {
    pub fn new(
        client: Client,
        endpoint: &str,
        index_name: &str,
        api_key: impl Into<String>,
        schema: CandidateSchema,
    ) -> Result<Self, ConfigError> {
        let url = endpoint_url(
            "search endpoint",
            endpoint,
            &["indexes", index_name, "docs", "search"],
            SEARCH_API_VERSION,
        )?;
        Ok(Self {
            client,
            url,
            api_key: api_key.into(),
            schema,
        })
    }

    pub fn schema(&self) -> &CandidateSchema {
        &self.schema
    }

    async fn post_search(&self, body: &Value) -> Result<Vec<Map<String, Value>>, ProviderError> {
        let response = self
            .client
            .post(self.url.clone())
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let response = check_status(BACKEND, response).await?;
        let parsed: Value = read_json(BACKEND, response).await?;

        let documents = parsed
            .pointer("/value")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::MalformedPayload {
                backend: BACKEND.to_string(),
                details: "response has no `value` array".to_string(),
            })?;

        Ok(documents
            .iter()
            .filter_map(|document| document.as_object().cloned())
            .collect())
    }

    /// Fetches one arbitrary document and lists its non-metadata fields.
    pub async fn sample_fields(&self) -> Result<Vec<FieldPreview>, ProviderError> {
        let documents = self.post_search(&json!({"search": "*", "top": 1})).await?;
        let Some(document) = documents.into_iter().next() else {
            return Ok(Vec::new());
        };

        Ok(document
            .into_iter()
            .filter(|(name, _)| !name.starts_with('@'))
            .map(|(name, value)| FieldPreview {
                name,
                preview: preview(&value),
            })
            .collect())
    }
}

fn preview(value: &Value) -> String {
    let text = match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text
    }
}

#[async_trait]
impl VectorIndex for AzureSearchIndex {
    async fn nearest(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedCandidate>, ProviderError> {
        let body = json!({
            "vectorQueries": [{
                "kind": "vector",
                "vector": query_vector,
                "k": top_k,
                "fields": self.schema.vector_field,
            }],
            "select": self.schema.projection().join(","),
            "top": top_k,
        });

        let documents = self.post_search(&body).await?;
        Ok(documents
            .iter()
            .take(top_k)
            .map(|document| self.schema.to_candidate(document))
            .collect())
    }
}
