pub mod azure_search;
pub mod mysql;
pub mod schema;

pub use azure_search::{AzureSearchIndex, FieldPreview};
pub use mysql::MySqlMatchingStore;
pub use schema::{classify_index_failure, CandidateSchema};
