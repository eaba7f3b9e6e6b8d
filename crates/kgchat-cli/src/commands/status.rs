//! Connectivity status.

use anyhow::Result;
use colored::Colorize;
use kgchat_llm::OllamaClient;

use super::connect_graph;
use crate::config::AppConfig;

pub async fn execute(config: &AppConfig) -> Result<()> {
    println!("{}", "KGChat Status".bold());
    println!("{}", "─".repeat(40));

    match connect_graph(config).await {
        Ok(graph) => match graph.get_counts().await {
            Ok(counts) => println!(
                "  {} Neo4j {} ({} nodes, {} relationships)",
                "✓".green(),
                config.graph.uri.dimmed(),
                counts.nodes,
                counts.relationships
            ),
            Err(e) => println!("  {} Neo4j {}: {:#}", "✗".red(), config.graph.uri.dimmed(), e),
        },
        Err(e) => println!("  {} Neo4j {}: {:#}", "✗".red(), config.graph.uri.dimmed(), e),
    }

    let ollama = OllamaClient::new(&config.ollama);
    match ollama.health_check().await {
        Ok(true) => println!("  {} Ollama {} (model {})", "✓".green(), ollama.base_url().dimmed(), ollama.model()),
        Ok(false) => println!(
            "  {} Ollama {}: model {} not available (ollama pull {})",
            "✗".red(),
            ollama.base_url().dimmed(),
            ollama.model(),
            ollama.model()
        ),
        Err(e) => println!("  {} Ollama {}: {:#}", "✗".red(), ollama.base_url().dimmed(), e),
    }

    Ok(())
}
