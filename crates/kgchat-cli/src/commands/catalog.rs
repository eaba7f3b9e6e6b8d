//! Entity listing.

use anyhow::Result;
use kgchat_core::{CatalogSnapshot, EntitySource};
use kgchat_graph::Neo4jCatalog;

use super::connect_graph;
use crate::config::AppConfig;
use crate::output;

pub async fn execute(config: &AppConfig) -> Result<()> {
    let graph = connect_graph(config).await?;
    let records = Neo4jCatalog::new(graph).list_entities().await?;
    output::print_catalog(&CatalogSnapshot::new(records));
    Ok(())
}
