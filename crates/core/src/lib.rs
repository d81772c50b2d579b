pub mod chat;
pub mod embeddings;
pub mod error;
pub mod explanations;
pub mod http;
pub mod matching;
pub mod models;
pub mod orchestrator;
pub mod stores;
pub mod traits;

pub use chat::AzureOpenAiChat;
pub use embeddings::{AzureOpenAiEmbedder, DEFAULT_EMBEDDING_MODEL};
pub use error::{ConfigError, IndexFailureKind, ProviderError, SearchError, StoreError};
pub use explanations::{explanation_prompt, explanation_request};
pub use http::build_http_client;
pub use matching::{
    MatchedProject, ResearcherAffiliation, ResearcherSummary, RESEARCHER_LIST_LIMIT,
};
pub use models::{
    compose_query, ChatMessage, ChatRequest, ChatRole, PipelineOptions, RetrievedCandidate,
    SearchRequest, SearchResult, DEFAULT_MAX_TOP_K, DEFAULT_TOP_K, MISSING_FIELD_PLACEHOLDER,
};
pub use orchestrator::MatchPipeline;
pub use stores::{
    classify_index_failure, AzureSearchIndex, CandidateSchema, FieldPreview, MySqlMatchingStore,
};
pub use traits::{ChatCompletion, Embedder, MatchingStore, VectorIndex};
