use crate::{ConfigError, ProviderError};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared client for all provider calls; cheap to clone.
pub fn build_http_client(request_timeout: Duration) -> Result<Client, ConfigError> {
    Ok(Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()?)
}

/// Appends `segments` to the base endpoint and sets `api-version`.
pub(crate) fn endpoint_url(
    setting: &'static str,
    base: &str,
    segments: &[&str],
    api_version: &str,
) -> Result<Url, ConfigError> {
    let mut url = Url::parse(base.trim()).map_err(|source| ConfigError::Url { setting, source })?;
    url.path_segments_mut()
        .map_err(|_| ConfigError::Invalid {
            setting,
            details: format!("{base} cannot be used as a base url"),
        })?
        .pop_if_empty()
        .extend(segments);
    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}

/// Passes successful responses through; turns anything else into `BackendResponse`.
pub(crate) async fn check_status(backend: &str, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::BackendResponse {
        backend: backend.to_string(),
        status: status.as_u16(),
        details: error_message(&body),
    })
}

/// Decodes a JSON body, reporting decode failures as a malformed payload.
pub(crate) async fn read_json<T: DeserializeOwned>(
    backend: &str,
    response: Response,
) -> Result<T, ProviderError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|error| ProviderError::MalformedPayload {
        backend: backend.to_string(),
        details: error.to_string(),
    })
}

// Azure services wrap failures as {"error": {"code": ..., "message": ...}}.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_appends_segments_and_version() -> Result<(), ConfigError> {
        let url = endpoint_url(
            "embedding endpoint",
            "https://example.openai.azure.com/",
            &["openai", "deployments", "text-embedding-3-large", "embeddings"],
            "2023-07-01-preview",
        )?;
        assert_eq!(
            url.as_str(),
            "https://example.openai.azure.com/openai/deployments/text-embedding-3-large/embeddings?api-version=2023-07-01-preview"
        );
        Ok(())
    }

    #[test]
    fn endpoint_url_rejects_garbage() {
        let result = endpoint_url("search endpoint", "not a url", &["indexes"], "1");
        assert!(matches!(
            result,
            Err(ConfigError::Url {
                setting: "search endpoint",
                ..
            })
        ));
    }

    #[test]
    fn error_message_prefers_nested_message() {
        let body = r#"{"error":{"code":"InvalidRequestParameter","message":"Cannot find nested property 'keywords_pi'"}}"#;
        assert_eq!(
            error_message(body),
            "Cannot find nested property 'keywords_pi'"
        );
        assert_eq!(error_message("  gateway timeout \n"), "gateway timeout");
    }
}
