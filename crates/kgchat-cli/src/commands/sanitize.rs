//! Offline query sanitization.

use std::io::Read;

use anyhow::{bail, Context, Result};

use crate::output;

pub fn execute(query: Option<String>) -> Result<()> {
    let text = match query {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read query from stdin")?;
            buf
        }
    };
    if text.trim().is_empty() {
        bail!("No query given. Pass it as an argument or on stdin.");
    }

    let sanitized = kgchat_core::sanitize_text(&text);
    output::print_sanitized(&sanitized);
    Ok(())
}
