use std::time::Duration;
use thiserror::Error;

/// Failure of a single call to an external provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {backend} ({status}): {details}")]
    BackendResponse {
        backend: String,
        status: u16,
        details: String,
    },

    #[error("malformed payload from {backend}: {details}")]
    MalformedPayload { backend: String, details: String },

    #[error("{backend} call timed out after {elapsed:?}")]
    Timeout { backend: String, elapsed: Duration },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl ProviderError {
    /// Raw detail text reported by the backend, if any.
    pub fn details(&self) -> Option<&str> {
        match self {
            ProviderError::BackendResponse { details, .. }
            | ProviderError::MalformedPayload { details, .. } => Some(details),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ProviderError::Timeout { .. } => true,
            ProviderError::Http(error) => error.is_timeout(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFailureKind {
    /// The query names a field the index does not define.
    SchemaMismatch,
    /// Connectivity, timeout, or any other provider-side failure.
    Transport,
}

impl std::fmt::Display for IndexFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexFailureKind::SchemaMismatch => f.write_str("schema mismatch"),
            IndexFailureKind::Transport => f.write_str("transport"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(#[source] ProviderError),

    #[error("index query failed ({kind}): {source}")]
    IndexQueryFailed {
        kind: IndexFailureKind,
        #[source]
        source: ProviderError,
    },

    #[error("explanation unavailable for researcher {researcher_id}: {source}")]
    ExplanationUnavailable {
        researcher_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    #[error("pipeline misconfigured: {0}")]
    Misconfigured(String),
}

impl SearchError {
    /// Whether the caller should see this error instead of an empty result.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(
            self,
            SearchError::InvalidRequest(_) | SearchError::Misconfigured(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {setting}: {details}")]
    Invalid { setting: &'static str, details: String },

    #[error("url parse error for {setting}: {source}")]
    Url {
        setting: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failure of the matchmaking database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_request_and_config_errors_escape_the_pipeline() {
        let embedding = SearchError::EmbeddingUnavailable(ProviderError::MalformedPayload {
            backend: "embeddings".to_string(),
            details: "empty vector".to_string(),
        });
        assert!(!embedding.is_unrecoverable());
        assert!(SearchError::InvalidRequest("top_k".to_string()).is_unrecoverable());
        assert!(SearchError::Misconfigured("dims".to_string()).is_unrecoverable());
    }

    #[test]
    fn backend_details_are_exposed_for_classification() {
        let error = ProviderError::BackendResponse {
            backend: "search".to_string(),
            status: 400,
            details: "Cannot find nested property 'x'".to_string(),
        };
        assert_eq!(error.details(), Some("Cannot find nested property 'x'"));
        assert!(ProviderError::Timeout {
            backend: "search".to_string(),
            elapsed: Duration::from_millis(10),
        }
        .details()
        .is_none());
    }
}
