//! Mapping between index document fields and [`RetrievedCandidate`].
//!
//! The researcher index has been loaded under more than one naming scheme
//! (`research_field_pi` vs `research_field_jp`, `keywords_pi` vs
//! `keywords_jp`). Every alias lives here; nothing else in the crate reads
//! raw index field names.

use crate::{IndexFailureKind, ProviderError, RetrievedCandidate, MISSING_FIELD_PLACEHOLDER};
use serde_json::{Map, Value};

pub const DEFAULT_VECTOR_FIELD: &str = "research_field_vectorization";
pub const DEFAULT_SCORE_FIELD: &str = "@search.score";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSchema {
    /// Vector field the nearest-neighbour query targets.
    pub vector_field: String,
    pub score_field: String,
    /// Each list is tried in order; the first name present wins. Only the
    /// first name is projected by `nearest`, so the remaining aliases only
    /// match in unprojected documents; pick the naming scheme of a live
    /// index with [`Self::with_field_suffix`].
    pub researcher_id: Vec<String>,
    pub research_field: Vec<String>,
    pub keywords: Vec<String>,
    pub project_title: Vec<String>,
}

impl Default for CandidateSchema {
    fn default() -> Self {
        Self {
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
            score_field: DEFAULT_SCORE_FIELD.to_string(),
            researcher_id: names(&["researcher_id"]),
            research_field: names(&["research_field_pi", "research_field_jp"]),
            keywords: names(&["keywords_pi", "keywords_jp"]),
            project_title: names(&["research_project_title"]),
        }
    }
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl CandidateSchema {
    pub fn with_vector_field(mut self, field: impl Into<String>) -> Self {
        self.vector_field = field.into();
        self
    }

    /// Promotes aliases ending in `_{suffix}` (e.g. `jp`) to primary names.
    pub fn with_field_suffix(mut self, suffix: &str) -> Self {
        let ending = format!("_{suffix}");
        for aliases in [
            &mut self.researcher_id,
            &mut self.research_field,
            &mut self.keywords,
            &mut self.project_title,
        ] {
            aliases.sort_by_key(|name| !name.ends_with(&ending));
        }
        self
    }

    /// Fields requested from the index: the primary name of each candidate field.
    pub fn projection(&self) -> Vec<&str> {
        [
            &self.researcher_id,
            &self.research_field,
            &self.keywords,
            &self.project_title,
        ]
        .into_iter()
        .filter_map(|aliases| aliases.first().map(String::as_str))
        .collect()
    }

    pub fn to_candidate(&self, document: &Map<String, Value>) -> RetrievedCandidate {
        RetrievedCandidate {
            researcher_id: lookup(document, &self.researcher_id),
            research_field: lookup(document, &self.research_field),
            keywords: lookup(document, &self.keywords),
            project_title: lookup(document, &self.project_title),
            similarity_score: document
                .get(&self.score_field)
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        }
    }
}

fn lookup(document: &Map<String, Value>, aliases: &[String]) -> String {
    aliases
        .iter()
        .find_map(|name| document.get(name).and_then(render))
        .unwrap_or_else(|| MISSING_FIELD_PLACEHOLDER.to_string())
}

// Ids arrive as numbers or strings depending on how the index was loaded;
// keyword fields are sometimes string collections.
fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Object(_) => Some(value.to_string()),
    }
}

// Lowercased fragments of the errors an index returns when a selected or
// targeted field does not exist.
const SCHEMA_MISMATCH_MARKERS: &[&str] = &[
    "cannot find nested property",
    "could not find a property named",
    "unknown field",
];

/// Separates "the query names fields the index lacks" from everything else.
pub fn classify_index_failure(error: &ProviderError) -> IndexFailureKind {
    let Some(details) = error.details() else {
        return IndexFailureKind::Transport;
    };
    let lowered = details.to_lowercase();
    if SCHEMA_MISMATCH_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        IndexFailureKind::SchemaMismatch
    } else {
        IndexFailureKind::Transport
    }
}
