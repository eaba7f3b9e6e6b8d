//! Entity catalog backed by Neo4j nodes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use kgchat_core::{EntityRecord, EntitySource, KgError, KgResult};
use neo4rs::Query;
use serde_json::{Map, Value};
use tracing::debug;

use crate::GraphClient;

/// Lists every node of one label as an [`EntityRecord`].
pub struct Neo4jCatalog {
    client: GraphClient,
    label: String,
    name_property: String,
}

impl Neo4jCatalog {
    pub fn new(client: GraphClient) -> Self {
        Self {
            client,
            label: "Student".to_string(),
            name_property: "name".to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_name_property(mut self, property: impl Into<String>) -> Self {
        self.name_property = property.into();
        self
    }

    fn query(&self) -> Query {
        // Labels and property keys cannot be parameters.
        Query::new(format!(
            "MATCH (n:`{label}`) WHERE n.`{prop}` IS NOT NULL \
             RETURN toString(n.`{prop}`) AS name, properties(n) AS props \
             ORDER BY name",
            label = escape_identifier(&self.label),
            prop = escape_identifier(&self.name_property),
        ))
    }
}

#[async_trait]
impl EntitySource for Neo4jCatalog {
    async fn list_entities(&self) -> KgResult<Vec<EntityRecord>> {
        let rows = self
            .client
            .query(self.query())
            .await
            .map_err(|e| KgError::catalog(format!("{:#}", e)))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .get("name")
                .map_err(|e| KgError::catalog(format!("Missing name column: {:?}", e)))?;
            let props: Map<String, Value> = row.get("props").unwrap_or_default();
            records.push(EntityRecord {
                canonical_name: name,
                attributes: attributes(&props, &self.name_property),
            });
        }

        debug!(label = %self.label, count = records.len(), "Loaded entity catalog");
        Ok(records)
    }
}

fn escape_identifier(identifier: &str) -> String {
    identifier.replace('`', "``")
}

/// Flatten node properties into string attributes, skipping the name itself.
pub fn attributes(props: &Map<String, Value>, name_property: &str) -> BTreeMap<String, String> {
    props
        .iter()
        .filter(|(key, _)| key.as_str() != name_property)
        .filter_map(|(key, value)| attribute_text(value).map(|text| (key.clone(), text)))
        .collect()
}

fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(attribute_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}
