//! Resolver debugging.

use anyhow::Result;
use colored::Colorize;
use kgchat_core::{classify, CatalogSnapshot, EntitySource, FuzzyResolver, Intent};
use kgchat_graph::Neo4jCatalog;

use super::connect_graph;
use crate::config::AppConfig;
use crate::output;

pub async fn execute(question: &str, config: &AppConfig) -> Result<()> {
    let graph = connect_graph(config).await?;
    let records = Neo4jCatalog::new(graph).list_entities().await?;
    let catalog = CatalogSnapshot::new(records);

    let resolver = FuzzyResolver::new(config.pipeline.resolver.clone());
    let resolution = resolver.resolve(question, &catalog);
    output::print_resolution(&resolution);

    let classification = classify(&resolution.resolved_question, &catalog);
    let intent = match &classification.intent {
        Intent::Chat { kind } => format!("chat ({:?})", kind).to_lowercase(),
        Intent::Query { focus: Some(name) } => format!("query (describe {})", name),
        Intent::Query { focus: None } => "query".to_string(),
    };
    println!();
    println!(
        "{}: {} {}",
        "Intent".bold(),
        intent.cyan(),
        classification
            .confidence
            .map(|c| format!("({:.2})", c))
            .unwrap_or_default()
            .dimmed()
    );
    Ok(())
}
