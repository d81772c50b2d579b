use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_MAX_TOP_K: usize = 50;

/// Stand-in for a candidate field the index did not return.
pub const MISSING_FIELD_PLACEHOLDER: &str = "unknown";

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SearchRequest {
    pub category: String,
    pub field: String,
    pub description: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl SearchRequest {
    pub fn new(
        category: impl Into<String>,
        field: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            field: field.into(),
            description: description.into(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// The text sent to the embedding provider and quoted in explanation prompts.
    pub fn query_text(&self) -> String {
        compose_query(&self.category, &self.field, &self.description)
    }
}

/// Joins the three request parts with single spaces, in order. Empty parts are kept.
pub fn compose_query(category: &str, field: &str, description: &str) -> String {
    let mut query = String::with_capacity(category.len() + field.len() + description.len() + 2);
    query.push_str(category);
    query.push(' ');
    query.push_str(field);
    query.push(' ');
    query.push_str(description);
    query
}

/// One researcher row as delivered by the similarity index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedCandidate {
    pub researcher_id: String,
    pub research_field: String,
    pub keywords: String,
    pub project_title: String,
    pub similarity_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub researcher_id: String,
    pub research_field: String,
    pub keywords: String,
    #[serde(rename = "research_project_title")]
    pub project_title: String,
    pub explanation: String,
    pub score: f64,
}

impl SearchResult {
    pub fn assemble(candidate: RetrievedCandidate, explanation: String) -> Self {
        Self {
            researcher_id: candidate.researcher_id,
            research_field: candidate.research_field,
            keywords: candidate.keywords,
            project_title: candidate.project_title,
            explanation,
            score: candidate.similarity_score,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound applied to `SearchRequest::top_k`.
    pub max_top_k: usize,
    /// Explanation calls allowed in flight at once.
    pub explanation_concurrency: usize,
    /// Deadline for each individual provider call.
    pub call_timeout: Duration,
    /// When set, embeddings of any other length are treated as misconfiguration.
    pub expected_dimensions: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_top_k: DEFAULT_MAX_TOP_K,
            explanation_concurrency: 4,
            call_timeout: Duration::from_secs(30),
            expected_dimensions: None,
        }
    }
}

impl PipelineOptions {
    /// Longest a single search can take when every call runs to its deadline:
    /// embedding, index query, then explanation rounds of
    /// `explanation_concurrency` calls each.
    pub fn worst_case_duration(&self) -> Duration {
        let concurrency = self.explanation_concurrency.max(1);
        let rounds = self.max_top_k.max(1).div_ceil(concurrency);
        let calls = u32::try_from(rounds.saturating_add(2)).unwrap_or(u32::MAX);
        self.call_timeout.saturating_mul(calls)
    }
}
