//! Schema discovery for the synthesis prompt.

use anyhow::Result;
use kgchat_core::synthesis::{NodeSchema, PropertyKind, PropertySchema};
use kgchat_core::SchemaDescription;
use neo4rs::Query;
use tracing::{info, warn};

use crate::GraphClient;

const LABELS: &str = "CALL db.labels() YIELD label RETURN label ORDER BY label";
const RELATIONSHIP_TYPES: &str =
    "CALL db.relationshipTypes() YIELD relationshipType RETURN relationshipType ORDER BY relationshipType";
const NODE_PROPERTIES: &str = "CALL db.schema.nodeTypeProperties() \
     YIELD nodeLabels, propertyName, propertyTypes, mandatory \
     RETURN nodeLabels, propertyName, propertyTypes, mandatory";

/// One row of `db.schema.nodeTypeProperties()`.
#[derive(Debug, Clone, Default)]
pub struct PropertyRow {
    pub node_labels: Vec<String>,
    pub property_name: Option<String>,
    pub property_types: Vec<String>,
    pub mandatory: bool,
}

/// Read the live schema, falling back to the default student schema when
/// discovery fails or the database is empty.
pub async fn discover_schema(client: &GraphClient) -> SchemaDescription {
    match read_schema(client).await {
        Ok(schema) if !schema.is_empty() => {
            info!(
                labels = schema.nodes.len(),
                relationship_types = schema.relationship_types.len(),
                "Discovered graph schema"
            );
            schema
        }
        Ok(_) => {
            warn!("Graph has no labels yet, using the default schema");
            SchemaDescription::student_network()
        }
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Schema discovery failed, using the default schema");
            SchemaDescription::student_network()
        }
    }
}

async fn read_schema(client: &GraphClient) -> Result<SchemaDescription> {
    let mut labels = Vec::new();
    for row in client.query(Query::new(LABELS.to_string())).await? {
        if let Ok(label) = row.get::<String>("label") {
            labels.push(label);
        }
    }

    let mut relationship_types = Vec::new();
    for row in client.query(Query::new(RELATIONSHIP_TYPES.to_string())).await? {
        if let Ok(rel) = row.get::<String>("relationshipType") {
            relationship_types.push(rel);
        }
    }

    let property_rows = client
        .query(Query::new(NODE_PROPERTIES.to_string()))
        .await?
        .into_iter()
        .map(|row| PropertyRow {
            node_labels: row.get("nodeLabels").unwrap_or_default(),
            property_name: row.get("propertyName").unwrap_or_default(),
            property_types: row.get("propertyTypes").unwrap_or_default(),
            mandatory: row.get("mandatory").unwrap_or(false),
        })
        .collect::<Vec<_>>();

    Ok(assemble(labels, relationship_types, &property_rows))
}

/// Build a schema description from discovery results.
pub fn assemble(labels: Vec<String>, relationship_types: Vec<String>, rows: &[PropertyRow]) -> SchemaDescription {
    let nodes = labels
        .into_iter()
        .map(|label| {
            let properties = rows
                .iter()
                .filter(|r| r.node_labels.iter().any(|l| l == &label))
                .filter_map(|r| {
                    let name = r.property_name.clone()?;
                    let kind = r
                        .property_types
                        .first()
                        .map(|t| PropertyKind::from_neo4j(t))
                        .unwrap_or(PropertyKind::Other);
                    Some(PropertySchema {
                        name,
                        kind,
                        optional: !r.mandatory,
                    })
                })
                .collect();
            NodeSchema { label, properties }
        })
        .collect();

    SchemaDescription {
        nodes,
        relationship_types,
        name_property: "name".to_string(),
    }
}
