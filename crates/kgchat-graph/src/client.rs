//! Neo4j connection client.

use anyhow::{Context, Result};
use neo4rs::{ConfigBuilder, Graph, Query};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            database: "neo4j".to_string(),
        }
    }
}

/// Client for the student graph.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect and ping the server.
    ///
    /// `Graph::connect` only builds a lazy pool, so a `RETURN 1` ping forces
    /// the bolt handshake and an unreachable server fails here.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(4)
            .fetch_size(200)
            .build()
            .context("Failed to build Neo4j config")?;

        let graph = Graph::connect(neo4j_config)
            .await
            .context("Failed to create Neo4j connection pool")?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .context("Neo4j is not responding to queries")?;

        debug!(uri = %config.uri, database = %config.database, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Execute a Cypher query and return results as rows.
    pub async fn query(&self, query: Query) -> Result<Vec<neo4rs::Row>> {
        let mut result = self.graph.execute(query).await.context("Neo4j query failed")?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await.context("Failed to read Neo4j result stream")? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a Cypher query and return each row as a JSON object.
    pub async fn query_json(&self, query: Query) -> Result<Vec<Value>> {
        let rows = self.query(query).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    /// Execute a Cypher query and return a single scalar value.
    pub async fn query_scalar<T: DeserializeOwned>(&self, query: Query, field: &str) -> Result<Option<T>> {
        let rows = self.query(query).await?;
        match rows.into_iter().next() {
            Some(row) => {
                let val: T = row
                    .get(field)
                    .map_err(|e| anyhow::anyhow!("Failed to get field '{}': {:?}", field, e))?;
                Ok(Some(val))
            }
            None => Ok(None),
        }
    }

    /// Node and relationship counts for status display.
    pub async fn get_counts(&self) -> Result<GraphCounts> {
        let node_query = Query::new("MATCH (n) RETURN count(n) AS count".to_string());
        let rel_query = Query::new("MATCH ()-[r]->() RETURN count(r) AS count".to_string());

        let node_count: i64 = self.query_scalar(node_query, "count").await?.unwrap_or(0);
        let rel_count: i64 = self.query_scalar(rel_query, "count").await?.unwrap_or(0);

        Ok(GraphCounts {
            nodes: node_count.max(0) as usize,
            relationships: rel_count.max(0) as usize,
        })
    }
}

/// Convert a result row to a JSON object keyed by column name.
///
/// Values that do not map onto JSON fall back to their debug rendering.
fn row_to_json(row: &neo4rs::Row) -> Value {
    match row.to::<Map<String, Value>>() {
        Ok(map) => Value::Object(map),
        Err(e) => {
            debug!(error = ?e, "Row is not JSON-shaped, using debug rendering");
            serde_json::json!({ "row": format!("{:?}", row) })
        }
    }
}

/// Node and relationship counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphCounts {
    pub nodes: usize,
    pub relationships: usize,
}
