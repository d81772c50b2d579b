use crate::explanations::explanation_request;
use crate::stores::schema::classify_index_failure;
use crate::traits::{ChatCompletion, Embedder, VectorIndex};
use crate::{
    ChatRequest, IndexFailureKind, PipelineOptions, ProviderError, RetrievedCandidate, SearchError,
    SearchRequest, SearchResult,
};
use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

/// Embedding, nearest-neighbour retrieval, and per-candidate explanation,
/// run as one forward pass per request.
pub struct MatchPipeline<E, V, C>
where
    E: Embedder,
    V: VectorIndex,
    C: ChatCompletion,
{
    embedder: E,
    index: V,
    chat: C,
    options: PipelineOptions,
}

impl<E, V, C> MatchPipeline<E, V, C>
where
    E: Embedder,
    V: VectorIndex,
    C: ChatCompletion,
{
    pub fn new(embedder: E, index: V, chat: C) -> Self {
        Self {
            embedder,
            index,
            chat,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Ranked, explained researchers for `request`.
    ///
    /// Provider failures are logged and yield an empty list. Only an invalid
    /// request or a misconfigured pipeline is returned as an error.
    pub async fn search_researchers(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let span = tracing::info_span!(
            "search_researchers",
            request_id = %Uuid::new_v4(),
            top_k = request.top_k,
        );

        async {
            match self.run(request).await {
                Ok(results) => {
                    info!(result_count = results.len(), "search complete");
                    Ok(results)
                }
                Err(failure) if failure.is_unrecoverable() => Err(failure),
                Err(failure) => {
                    log_stage_failure(request, &failure);
                    Ok(Vec::new())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Same pass as [`Self::search_researchers`], but fatal stage failures are returned.
    pub async fn run(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, SearchError> {
        let top_k = self.effective_top_k(request.top_k)?;
        let query_text = request.query_text();

        let query_vector = self.embed(&query_text).await?;
        let mut candidates = self.retrieve(&query_vector, top_k).await?;
        candidates.truncate(top_k);

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let explanations = self.explain_all(&query_text, &candidates).await;
        Ok(assemble(candidates, explanations))
    }

    fn effective_top_k(&self, requested: usize) -> Result<usize, SearchError> {
        if requested == 0 {
            return Err(SearchError::InvalidRequest(
                "top_k must be greater than zero".to_string(),
            ));
        }
        let max_top_k = self.options.max_top_k.max(1);
        if requested > max_top_k {
            warn!(requested, max_top_k, "clamping top_k");
            return Ok(max_top_k);
        }
        Ok(requested)
    }

    async fn embed(&self, query_text: &str) -> Result<Vec<f32>, SearchError> {
        debug!(stage = "embedding", query_len = query_text.len(), "requesting embedding");
        let vector = self
            .bounded("embedding", self.embedder.embed(query_text))
            .await
            .map_err(SearchError::EmbeddingUnavailable)?;

        if let Some(expected) = self.options.expected_dimensions {
            if vector.len() != expected {
                return Err(SearchError::Misconfigured(format!(
                    "embedding has {} dimensions, index expects {expected}",
                    vector.len()
                )));
            }
        }

        Ok(vector)
    }

    async fn retrieve(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedCandidate>, SearchError> {
        debug!(stage = "similarity_search", dimensions = query_vector.len(), top_k, "querying index");
        self.bounded("vector index", self.index.nearest(query_vector, top_k))
            .await
            .map_err(|source| SearchError::IndexQueryFailed {
                kind: classify_index_failure(&source),
                source,
            })
    }

    /// One outcome per candidate, in candidate order.
    async fn explain_all(
        &self,
        query_text: &str,
        candidates: &[RetrievedCandidate],
    ) -> Vec<Result<String, SearchError>> {
        let concurrency = self.options.explanation_concurrency.max(1);

        // Owned jobs keep the fan-out future free of borrowed candidates.
        let jobs: Vec<(usize, String, ChatRequest)> = candidates
            .iter()
            .enumerate()
            .map(|(position, candidate)| {
                (
                    position,
                    candidate.researcher_id.clone(),
                    explanation_request(query_text, candidate),
                )
            })
            .collect();

        let mut outcomes: Vec<(usize, Result<String, SearchError>)> = stream::iter(jobs)
            .map(|(position, researcher_id, request)| async move {
                let outcome = self
                    .bounded("chat completion", self.chat.complete(&request))
                    .await
                    .map_err(|source| SearchError::ExplanationUnavailable {
                        researcher_id,
                        source,
                    });
                (position, outcome)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        outcomes.sort_by_key(|(position, _)| *position);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn bounded<T>(
        &self,
        backend: &str,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        let limit = self.options.call_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout {
                backend: backend.to_string(),
                elapsed: limit,
            }),
        }
    }
}

/// Candidates whose explanation failed are dropped; order is never changed.
fn assemble(
    candidates: Vec<RetrievedCandidate>,
    explanations: Vec<Result<String, SearchError>>,
) -> Vec<SearchResult> {
    candidates
        .into_iter()
        .zip(explanations)
        .filter_map(|(candidate, explanation)| match explanation {
            Ok(text) => Some(SearchResult::assemble(candidate, text)),
            Err(failure) => {
                warn!(
                    stage = "explanation",
                    researcher_id = %candidate.researcher_id,
                    error = %failure,
                    "dropping candidate without explanation"
                );
                None
            }
        })
        .collect()
}

fn log_stage_failure(request: &SearchRequest, failure: &SearchError) {
    let query_len = request.query_text().len();
    match failure {
        SearchError::EmbeddingUnavailable(source) => {
            error!(
                stage = "embedding",
                query_len,
                timed_out = source.is_timeout(),
                error = %source,
                "embedding failed, returning no results"
            );
        }
        SearchError::IndexQueryFailed {
            kind: IndexFailureKind::SchemaMismatch,
            source,
        } => {
            error!(
                stage = "similarity_search",
                top_k = request.top_k,
                error = %source,
                "index rejected the query fields; the candidate schema does not match the index \
                 (compare with `researcher-match inspect-index`)"
            );
        }
        SearchError::IndexQueryFailed { kind, source } => {
            error!(
                stage = "similarity_search",
                top_k = request.top_k,
                failure_kind = %kind,
                timed_out = source.is_timeout(),
                error = %source,
                "index query failed, returning no results"
            );
        }
        other => {
            error!(error = %other, "search failed, returning no results");
        }
    }
}
