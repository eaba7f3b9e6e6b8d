//! KGChat CLI
//!
//! Ask questions about a Neo4j student graph in plain language.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod output;

use commands::Cli;

const CRATES: &[&str] = &["kgchat", "kgchat_core", "kgchat_graph", "kgchat_llm"];

fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    CRATES
        .iter()
        .map(|c| format!("{}={}", c, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize tracing on stderr, plus a non-ANSI file layer with `--log-file`.
///
/// The returned guard flushes the file writer and must outlive the command.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = if verbose {
        EnvFilter::new(default_filter(true))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(false)))
    };

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    cli.execute().await
}
