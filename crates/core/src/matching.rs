//! Records served by the matchmaking endpoints: researcher profiles and the
//! matchings between researchers and company project postings.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Rows returned by the researcher listing.
pub const RESEARCHER_LIST_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct ResearcherSummary {
    pub researcher_id: i32,
    pub researcher_name: String,
    pub position: Option<String>,
    pub research_field: Option<String>,
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct ResearcherAffiliation {
    pub researcher_id: i32,
    pub researcher_name: String,
    pub researcher_affiliation_current: Option<String>,
    pub researcher_department_current: Option<String>,
}

/// A matching joined with its project posting and the posting company.
///
/// Project and company columns are optional because the joins are outer joins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct MatchedProject {
    pub matching_id: i32,
    pub project_id: i32,
    pub researcher_id: i32,
    pub matching_status: i32,
    pub matched_date: NaiveDateTime,
    pub project_title: Option<String>,
    pub consultation_category: Option<String>,
    pub project_content: Option<String>,
    pub research_field: Option<String>,
    pub application_deadline: Option<NaiveDateTime>,
    pub budget: Option<i64>,
    pub company_user_name: Option<String>,
    pub department: Option<String>,
    pub company_name: Option<String>,
}
