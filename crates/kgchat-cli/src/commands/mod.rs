//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kgchat_core::{EntityCatalog, Pipeline, ResultExplainer};
use kgchat_graph::{GraphClient, Neo4jCatalog, QueryExecutor};
use kgchat_llm::OllamaClient;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::AppConfig;

pub mod ask;
pub mod catalog;
pub mod chat;
pub mod resolve;
pub mod sanitize;
pub mod schema;
pub mod status;

/// Fail fast when Neo4j does not answer the connection ping.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// KGChat - talk to your knowledge graph
#[derive(Parser)]
#[command(name = "kgchat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (defaults to ./kgchat.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive chat session
    Chat,

    /// Ask a single question
    Ask(ask::AskArgs),

    /// Show how entity names in a question are resolved
    Resolve {
        /// Question to resolve
        question: String,
    },

    /// Sanitize a Cypher query (argument or stdin)
    Sanitize {
        /// Query text; read from stdin when omitted
        query: Option<String>,
    },

    /// List known entities
    Catalog,

    /// Show the schema hint given to the model
    Schema,

    /// Show Neo4j and Ollama status
    Status,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = AppConfig::load(self.config.as_deref())?;

        match self.command {
            Commands::Chat => chat::execute(&config).await,
            Commands::Ask(args) => ask::execute(args, &config).await,
            Commands::Resolve { question } => resolve::execute(&question, &config).await,
            Commands::Sanitize { query } => sanitize::execute(query),
            Commands::Catalog => catalog::execute(&config).await,
            Commands::Schema => schema::execute(&config).await,
            Commands::Status => status::execute(&config).await,
        }
    }
}

/// Connect to Neo4j with a bounded wait.
pub async fn connect_graph(config: &AppConfig) -> Result<GraphClient> {
    tokio::time::timeout(CONNECT_TIMEOUT, GraphClient::connect(&config.graph))
        .await
        .with_context(|| format!("Timed out connecting to Neo4j at {}", config.graph.uri))?
        .with_context(|| format!("Failed to connect to Neo4j at {}", config.graph.uri))
}

/// Everything a question needs: pipeline, executor and explainer.
pub struct Services {
    pub pipeline: Pipeline,
    pub executor: QueryExecutor,
    pub explainer: ResultExplainer,
    refresh_task: Option<JoinHandle<()>>,
}

impl Services {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let graph = connect_graph(config).await?;
        let model = Arc::new(OllamaClient::new(&config.ollama));

        let source = Arc::new(Neo4jCatalog::new(graph.clone()));
        let catalog = Arc::new(EntityCatalog::new(source, &config.pipeline.catalog));
        let refresh_task = config.pipeline.catalog.refresh_interval().map(|interval| {
            info!(?interval, "Starting background catalog refresh");
            Arc::clone(&catalog).spawn_refresh(interval)
        });

        let schema = kgchat_graph::discover_schema(&graph).await;

        Ok(Self {
            pipeline: Pipeline::new(catalog, model.clone(), schema, &config.pipeline),
            executor: QueryExecutor::new(graph),
            explainer: ResultExplainer::new(model, config.pipeline.synthesis.timeout()),
            refresh_task,
        })
    }
}

impl Drop for Services {
    fn drop(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
    }
}
