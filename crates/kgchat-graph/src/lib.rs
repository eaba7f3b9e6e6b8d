//! # KGChat Graph
//!
//! Neo4j collaborators for the KGChat pipeline: the entity catalog source,
//! schema discovery and the read-only query executor.

pub mod catalog;
pub mod client;
pub mod execute;
pub mod schema;

pub use catalog::Neo4jCatalog;
pub use client::{GraphClient, GraphConfig, GraphCounts};
pub use execute::QueryExecutor;
pub use schema::discover_schema;
