//! MySQL-backed [`MatchingStore`] over the matchmaking tables
//! (`researcher_information`, `matching_information`, `project_information`,
//! `company_user`, `company`).

use crate::matching::{MatchedProject, ResearcherAffiliation, ResearcherSummary};
use crate::traits::MatchingStore;
use crate::StoreError;
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::debug;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MySqlMatchingStore {
    pool: MySqlPool,
}

impl MySqlMatchingStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

fn matched_project_query(filter: &str) -> String {
    format!(
        "SELECT m.matching_id, m.project_id, m.researcher_id, m.matching_status, m.matched_date, \
                p.project_title, p.consultation_category, p.project_content, p.research_field, \
                p.application_deadline, CAST(p.budget AS SIGNED) AS budget, \
                u.company_user_name, u.department, c.company_name \
         FROM matching_information m \
         LEFT JOIN project_information p ON p.project_id = m.project_id \
         LEFT JOIN company_user u ON u.company_user_id = p.company_user_id \
         LEFT JOIN company c ON c.company_id = u.company_id \
         WHERE {filter} \
         ORDER BY m.matching_id"
    )
}

/// Case-insensitive substring pattern for `LIKE ... ESCAPE '!'`.
pub fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for ch in fragment.to_lowercase().chars() {
        if matches!(ch, '!' | '%' | '_') {
            pattern.push('!');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl MatchingStore for MySqlMatchingStore {
    async fn list_researchers(&self, limit: u32) -> Result<Vec<ResearcherSummary>, StoreError> {
        let rows = sqlx::query_as::<_, ResearcherSummary>(
            "SELECT researcher_id, researcher_name, researcher_position_current AS position, \
                    research_field_pi AS research_field, keywords_pi AS keywords \
             FROM researcher_information \
             ORDER BY researcher_id \
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_researchers_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<ResearcherAffiliation>, StoreError> {
        let rows = sqlx::query_as::<_, ResearcherAffiliation>(
            "SELECT researcher_id, researcher_name, researcher_affiliation_current, \
                    researcher_department_current \
             FROM researcher_information \
             WHERE LOWER(researcher_name) LIKE ? ESCAPE '!' \
             ORDER BY researcher_id",
        )
        .bind(like_pattern(name))
        .fetch_all(&self.pool)
        .await?;
        debug!(matches = rows.len(), "researcher name search");
        Ok(rows)
    }

    async fn matchings_for(
        &self,
        researcher_id: i32,
        matching_status: i32,
    ) -> Result<Vec<MatchedProject>, StoreError> {
        let sql = matched_project_query("m.researcher_id = ? AND m.matching_status = ?");
        let rows = sqlx::query_as::<_, MatchedProject>(&sql)
            .bind(researcher_id)
            .bind(matching_status)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn matching(&self, matching_id: i32) -> Result<Option<MatchedProject>, StoreError> {
        let sql = matched_project_query("m.matching_id = ?");
        let row = sqlx::query_as::<_, MatchedProject>(&sql)
            .bind(matching_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_matching_status(
        &self,
        matching_id: i32,
        matching_status: i32,
    ) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            "UPDATE matching_information SET matching_status = ? WHERE matching_id = ?",
        )
        .bind(matching_status)
        .bind(matching_id)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() > 0 {
            return Ok(true);
        }

        // MySQL reports zero affected rows when the status is already set.
        let exists = sqlx::query("SELECT 1 FROM matching_information WHERE matching_id = ?")
            .bind(matching_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(exists.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_lowercases() {
        assert_eq!(like_pattern("Tanaka"), "%tanaka%");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_a!"), "%50!%!_a!!%");
    }

    #[test]
    fn matched_project_query_outer_joins_the_posting() {
        let sql = matched_project_query("m.matching_id = ?");
        assert!(sql.contains("LEFT JOIN project_information p"));
        assert!(sql.contains("WHERE m.matching_id = ? ORDER BY"));
    }
}
