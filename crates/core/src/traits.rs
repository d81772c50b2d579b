use crate::matching::{MatchedProject, ResearcherAffiliation, ResearcherSummary};
use crate::{ChatRequest, ProviderError, RetrievedCandidate, StoreError};
use async_trait::async_trait;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `top_k` nearest candidates, in the provider's order.
    async fn nearest(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedCandidate>, ProviderError>;
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError>;
}

/// Researcher and matching records behind the matchmaking endpoints.
#[async_trait]
pub trait MatchingStore: Send + Sync {
    async fn list_researchers(&self, limit: u32) -> Result<Vec<ResearcherSummary>, StoreError>;

    /// Researchers whose name contains `name`, ignoring case.
    async fn find_researchers_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<ResearcherAffiliation>, StoreError>;

    async fn matchings_for(
        &self,
        researcher_id: i32,
        matching_status: i32,
    ) -> Result<Vec<MatchedProject>, StoreError>;

    async fn matching(&self, matching_id: i32) -> Result<Option<MatchedProject>, StoreError>;

    /// `false` when no matching has `matching_id`.
    async fn update_matching_status(
        &self,
        matching_id: i32,
        matching_status: i32,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Box<T> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        (**self).embed(text).await
    }
}

#[async_trait]
impl<T: VectorIndex + ?Sized> VectorIndex for Box<T> {
    async fn nearest(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedCandidate>, ProviderError> {
        (**self).nearest(query_vector, top_k).await
    }
}

#[async_trait]
impl<T: ChatCompletion + ?Sized> ChatCompletion for Box<T> {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        (**self).complete(request).await
    }
}
