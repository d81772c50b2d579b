use crate::{ChatMessage, ChatRequest, RetrievedCandidate};

pub const EXPLANATION_SYSTEM_PROMPT: &str =
    "You are an assistant that explains researcher search results to companies looking for academic collaborators.";
pub const EXPLANATION_TEMPERATURE: f32 = 0.0;
pub const EXPLANATION_MAX_TOKENS: u32 = 300;

pub fn explanation_prompt(query_text: &str, candidate: &RetrievedCandidate) -> String {
    format!(
        "Request: {query_text}\n\
         Research project: {title}\n\
         Research field: {field}\n\
         Research keywords: {keywords}\n\n\
         Briefly explain why this researcher is a good fit for the request.",
        title = candidate.project_title,
        field = candidate.research_field,
        keywords = candidate.keywords,
    )
}

/// System instruction plus the candidate prompt, sampled deterministically.
pub fn explanation_request(query_text: &str, candidate: &RetrievedCandidate) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::system(EXPLANATION_SYSTEM_PROMPT),
            ChatMessage::user(explanation_prompt(query_text, candidate)),
        ],
        temperature: EXPLANATION_TEMPERATURE,
        max_tokens: EXPLANATION_MAX_TOKENS,
    }
}
