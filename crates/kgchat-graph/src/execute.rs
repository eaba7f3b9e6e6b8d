//! Read-only query execution.

use kgchat_core::sanitizer::validate::forbidden_keyword;
use kgchat_core::{KgError, KgResult, SanitizedQuery};
use neo4rs::Query;
use serde_json::Value;
use tracing::{info, warn};

use crate::GraphClient;

/// Runs sanitized queries against the graph.
///
/// Only queries the sanitizer marked valid are sent to the server.
pub struct QueryExecutor {
    client: GraphClient,
}

impl QueryExecutor {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub async fn execute(&self, query: &SanitizedQuery) -> KgResult<Vec<Value>> {
        check_executable(query)?;

        let rows = self
            .client
            .query_json(Query::new(query.text.clone()))
            .await
            .map_err(|e| KgError::Execution(format!("{:#}", e)))?;

        info!(rows = rows.len(), "Query executed");
        Ok(rows)
    }
}

fn check_executable(query: &SanitizedQuery) -> KgResult<()> {
    if !query.valid {
        return Err(KgError::SanitizationRejected(
            "refusing to execute a query that failed sanitization".to_string(),
        ));
    }
    if let Some(keyword) = forbidden_keyword(&query.text) {
        warn!(policy_violation = true, %keyword, "Mutating keyword in a query marked valid");
        return Err(KgError::ForbiddenOperation(keyword));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgchat_core::sanitize_text;

    #[test]
    fn test_invalid_query_is_refused() {
        let query = sanitize_text("MATCH (s:Student)");
        assert!(matches!(check_executable(&query), Err(KgError::SanitizationRejected(_))));
    }

    #[test]
    fn test_forged_valid_query_is_refused() {
        let mut query = sanitize_text("MATCH (s:Student) RETURN s");
        query.text = "MATCH (s) DETACH DELETE s".to_string();
        assert!(matches!(check_executable(&query), Err(KgError::ForbiddenOperation(k)) if k == "DETACH"));
    }

    #[test]
    fn test_valid_query_passes() {
        let query = sanitize_text("MATCH (s:Student) RETURN s.name");
        assert!(check_executable(&query).is_ok());
    }
}
