//! Schema hints handed to the language model.

use serde::{Deserialize, Serialize};

/// Value type of a node property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    String,
    Integer,
    Float,
    Boolean,
    StringList,
    Other,
}

impl PropertyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::StringList => "list of strings",
            Self::Other => "any",
        }
    }

    /// Map a Neo4j type name (as reported by `db.schema.nodeTypeProperties`).
    pub fn from_neo4j(type_name: &str) -> Self {
        match type_name {
            "String" => Self::String,
            "Long" | "Integer" => Self::Integer,
            "Double" | "Float" => Self::Float,
            "Boolean" => Self::Boolean,
            "StringArray" | "List<String>" => Self::StringList,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub name: String,
    pub kind: PropertyKind,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSchema {
    pub label: String,
    pub properties: Vec<PropertySchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub nodes: Vec<NodeSchema>,
    pub relationship_types: Vec<String>,
    /// Property that holds an entity's canonical name.
    pub name_property: String,
}

fn prop(name: &str, kind: PropertyKind, optional: bool) -> PropertySchema {
    PropertySchema {
        name: name.to_string(),
        kind,
        optional,
    }
}

impl SchemaDescription {
    /// The student network the chatbot was built for.
    pub fn student_network() -> Self {
        Self {
            nodes: vec![NodeSchema {
                label: "Student".to_string(),
                properties: vec![
                    prop("name", PropertyKind::String, false),
                    prop("address", PropertyKind::String, true),
                    prop("college", PropertyKind::String, true),
                    prop("board", PropertyKind::String, true),
                    prop("stream", PropertyKind::String, true),
                    prop("interests", PropertyKind::StringList, true),
                ],
            }],
            relationship_types: [
                "KNOWS",
                "FRIEND_OF",
                "CLASSMATE_OF",
                "SAME_COLLEGE",
                "SAME_BOARD",
                "SAME_STREAM",
                "NEARBY",
                "SHARES_INTEREST",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            name_property: "name".to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationship_types.is_empty()
    }

    /// Full multi-line rendering used in the primary prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            out.push_str(&format!("- Node label: {}\n", node.label));
            for p in &node.properties {
                let optional = if p.optional { "optional " } else { "" };
                out.push_str(&format!("    - {} ({}{})\n", p.name, optional, p.kind.as_str()));
            }
        }
        if !self.relationship_types.is_empty() {
            out.push_str(&format!(
                "- Relationship types: {}\n",
                self.relationship_types.join(", ")
            ));
        }
        out
    }

    /// One-line rendering used in the shortened retry prompt.
    pub fn render_compact(&self) -> String {
        let nodes: Vec<String> = self
            .nodes
            .iter()
            .map(|n| {
                let props: Vec<&str> = n.properties.iter().map(|p| p.name.as_str()).collect();
                format!("(:{} {{{}}})", n.label, props.join(", "))
            })
            .collect();
        format!(
            "Nodes: {}. Relationships: {}.",
            nodes.join(" "),
            self.relationship_types.join(", ")
        )
    }
}

impl Default for SchemaDescription {
    fn default() -> Self {
        Self::student_network()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_student_network() {
        let rendered = SchemaDescription::student_network().render();
        assert!(rendered.contains("- Node label: Student"));
        assert!(rendered.contains("    - name (string)"));
        assert!(rendered.contains("    - interests (optional list of strings)"));
        assert!(rendered.contains("SHARES_INTEREST"));
    }

    #[test]
    fn test_render_compact() {
        let compact = SchemaDescription::student_network().render_compact();
        assert!(compact.starts_with("Nodes: (:Student {name, address, college, board, stream, interests})."));
        assert!(compact.contains("KNOWS, FRIEND_OF"));
    }

    #[test]
    fn test_neo4j_type_names() {
        assert_eq!(PropertyKind::from_neo4j("String"), PropertyKind::String);
        assert_eq!(PropertyKind::from_neo4j("StringArray"), PropertyKind::StringList);
        assert_eq!(PropertyKind::from_neo4j("Long"), PropertyKind::Integer);
        assert_eq!(PropertyKind::from_neo4j("Point"), PropertyKind::Other);
    }
}
