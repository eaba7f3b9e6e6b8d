//! Schema hint inspection.

use anyhow::Result;
use colored::Colorize;

use super::connect_graph;
use crate::config::AppConfig;

pub async fn execute(config: &AppConfig) -> Result<()> {
    let graph = connect_graph(config).await?;
    let schema = kgchat_graph::discover_schema(&graph).await;

    println!("{}", "Schema".bold());
    print!("{}", schema.render());
    println!("{}: {}", "Name property".dimmed(), schema.name_property);
    Ok(())
}
