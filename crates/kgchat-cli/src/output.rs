//! Terminal output formatting.

use colored::Colorize;
use kgchat_core::{CatalogSnapshot, Outcome, Resolution, SanitizedQuery};
use serde_json::Value;

/// Print a pipeline outcome. Executable queries are shown, not run.
pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::ChatReply(reply) => println!("{} {}", "bot:".green().bold(), reply),
        Outcome::ExecutableQuery(query) => print_query(query),
        Outcome::Rejected(reason) => {
            println!("{} {}", "rejected:".red().bold(), reason);
            println!("{}", "Try rephrasing your question.".dimmed());
        }
    }
}

/// Print a query with its repairs.
pub fn print_query(query: &SanitizedQuery) {
    println!("{}", "Cypher".bold());
    for line in query.text.lines() {
        println!("  {}", line.cyan());
    }
    if query.stripped_wrapper {
        println!("  {} {}", "·".dimmed(), "removed text around the query".dimmed());
    }
    for repair in &query.repairs_applied {
        println!("  {} {}", "·".dimmed(), repair.yellow());
    }
}

/// Print a sanitization report.
pub fn print_sanitized(query: &SanitizedQuery) {
    print_query(query);
    println!();
    if query.valid {
        println!("{} {}", "✓".green(), "valid".green().bold());
    } else {
        println!("{} {}", "✗".red(), "invalid".red().bold());
    }
}

/// Print the resolver's view of a question.
pub fn print_resolution(resolution: &Resolution) {
    println!("{}: {}", "Resolved".bold(), resolution.resolved_question);

    if resolution.candidates.is_empty() {
        println!("{}", "No fuzzy matches.".dimmed());
        return;
    }

    println!();
    println!("{:<20} {:<20} {:>6} {:>5}  {}", "Span", "Match", "Score", "Dist", "Status");
    println!("{}", "─".repeat(64));
    for c in &resolution.candidates {
        let status = if c.accepted { "accepted".green() } else { "tied".yellow() };
        println!(
            "{:<20} {:<20} {:>6.3} {:>5}  {}",
            truncate(&c.raw_token, 19),
            truncate(&c.matched_name, 19),
            c.similarity_score,
            c.edit_distance,
            status
        );
    }
}

/// Print entity names with their attributes.
pub fn print_catalog(catalog: &CatalogSnapshot) {
    if catalog.is_empty() {
        println!("{}", "No entities found.".dimmed());
        return;
    }

    for record in catalog.records() {
        println!("  {} {}", "●".cyan(), record.canonical_name.bold());
        for (key, value) in &record.attributes {
            println!("    {}: {}", key.dimmed(), value);
        }
    }
    println!();
    println!("{} entities", catalog.len().to_string().bold());
}

/// Print result rows, one JSON object per line.
pub fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("{}", "No results.".dimmed());
        return;
    }
    for (i, row) in rows.iter().enumerate() {
        println!("{}: {}", (i + 1).to_string().dimmed(), row);
    }
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
