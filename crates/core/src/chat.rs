use crate::http::{check_status, endpoint_url, read_json};
use crate::traits::ChatCompletion;
use crate::{ChatRequest, ConfigError, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

pub const CHAT_API_VERSION: &str = "2024-08-01-preview";

const BACKEND: &str = "azure-openai-chat";

/// Chat-completions deployment on an Azure OpenAI resource.
pub struct AzureOpenAiChat {
    client: Client,
    url: Url,
    api_key: String,
}

impl AzureOpenAiChat {
    pub fn new(
        client: Client,
        endpoint: &str,
        deployment: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let url = endpoint_url(
            "chat endpoint",
            endpoint,
            &["openai", "deployments", deployment, "chat", "completions"],
            CHAT_API_VERSION,
        )?;
        Ok(Self {
            client,
            url,
            api_key: api_key.into(),
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatCompletion for AzureOpenAiChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.url.clone())
            .header("api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let response = check_status(BACKEND, response).await?;
        let parsed: ChatResponse = read_json(BACKEND, response).await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::MalformedPayload {
                backend: BACKEND.to_string(),
                details: "response carried no completion text".to_string(),
            })
    }
}
