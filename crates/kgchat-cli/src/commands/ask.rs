//! One-shot questions.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use kgchat_core::Outcome;
use serde::Serialize;
use serde_json::Value;

use super::Services;
use crate::config::AppConfig;
use crate::output;

#[derive(Args)]
pub struct AskArgs {
    /// The question to ask
    pub question: String,

    /// Show the generated query without running it
    #[arg(long)]
    pub no_exec: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Everything produced for one question.
#[derive(Serialize)]
pub struct Answer {
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run a question through the pipeline and, when allowed, execute and
/// explain the resulting query.
pub async fn answer(services: &Services, question: &str, execute: bool) -> Answer {
    let outcome = services.pipeline.handle(question).await;

    let mut answer = Answer {
        outcome,
        rows: None,
        answer: None,
        error: None,
    };

    let Outcome::ExecutableQuery(query) = &answer.outcome else {
        return answer;
    };
    if !execute {
        return answer;
    }

    match services.executor.execute(query).await {
        Ok(rows) => {
            answer.answer = Some(services.explainer.explain(question, &rows).await);
            answer.rows = Some(rows);
        }
        Err(e) => answer.error = Some(e.to_string()),
    }
    answer
}

pub fn print_answer(answer: &Answer, show_rows: bool) {
    output::print_outcome(&answer.outcome);

    if let Some(rows) = answer.rows.as_ref().filter(|_| show_rows) {
        println!();
        output::print_rows(rows);
    }
    if let Some(text) = &answer.answer {
        println!();
        println!("{} {}", "bot:".green().bold(), text);
    }
    if let Some(error) = &answer.error {
        println!("{} {}", "error:".red().bold(), error);
    }
}

pub async fn execute(args: AskArgs, config: &AppConfig) -> Result<()> {
    let services = Services::connect(config).await?;
    let answer = answer(&services, &args.question, !args.no_exec).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&answer, true);
    }
    Ok(())
}
