//! Interactive chat loop.

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Input;

use super::{ask, Services};
use crate::config::AppConfig;

fn is_exit(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "exit" | "quit" | ":q")
}

pub async fn execute(config: &AppConfig) -> Result<()> {
    let services = Services::connect(config).await?;

    println!("{}", "KGChat".cyan().bold());
    println!("{}", "Ask about the graph. Type 'exit' or 'quit' to leave.".dimmed());
    println!();

    loop {
        let line: String = Input::new()
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input")?;

        if is_exit(&line) {
            println!("{}", "Goodbye!".dimmed());
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let answer = ask::answer(&services, &line, true).await;
        ask::print_answer(&answer, false);
        println!();
    }
}
