//! Natural-language explanation of query results.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::synthesis::LanguageModel;

pub const NO_RESULTS: &str = "I couldn't find any records matching your question.";

/// Rows serialized into the explanation prompt.
const MAX_PROMPT_ROWS: usize = 20;
/// Names listed in the local fallback summary.
const MAX_NAMES: usize = 5;

pub struct ResultExplainer {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl ResultExplainer {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Explain `rows` (JSON objects, one per result record) as a short reply.
    pub async fn explain(&self, question: &str, rows: &[Value]) -> String {
        if rows.is_empty() {
            return NO_RESULTS.to_string();
        }
        if let Some(count) = count_shortcut(rows) {
            return format!("There are {} matching records.", count);
        }

        let prompt = build_prompt(question, rows);
        debug!(rows = rows.len(), "Explaining results");
        let reply = tokio::time::timeout(self.timeout, self.model.complete(&prompt, self.timeout)).await;
        match reply {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Ok(_)) => local_summary(rows),
            Ok(Err(e)) => {
                warn!(error = %e, "Explanation failed, using local summary");
                local_summary(rows)
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Explanation timed out, using local summary");
                local_summary(rows)
            }
        }
    }
}

/// A single row holding one number, or a column named like a count.
fn count_shortcut(rows: &[Value]) -> Option<String> {
    let [Value::Object(row)] = rows else {
        return None;
    };
    if row.len() == 1 {
        if let Some(n @ Value::Number(_)) = row.values().next() {
            return Some(n.to_string());
        }
    }
    row.iter()
        .find(|(key, value)| value.is_number() && key.to_lowercase().contains("count"))
        .map(|(_, value)| value.to_string())
}

fn build_prompt(question: &str, rows: &[Value]) -> String {
    let shown = &rows[..rows.len().min(MAX_PROMPT_ROWS)];
    let results = serde_json::to_string(shown).unwrap_or_default();
    let more = if rows.len() > shown.len() {
        format!("\n({} more rows omitted)", rows.len() - shown.len())
    } else {
        String::new()
    };

    format!(
        r#"You are a helpful assistant. Produce a concise, conversational reply (one or two sentences) for a user based on the question and the database results.

Instructions:
- Keep the reply short and natural, like a chat reply.
- If the results list people, mention up to 5 names or summarize if there are many.
- If shared interests are present, list the common interests succinctly.
- Do NOT include JSON, code blocks or internal keys; only plain text.

Question:
{question}

Database Results:
{results}{more}

Reply:
"#
    )
}

/// Collect `name` values from a row, including nested node maps.
fn names_in(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                let is_name_key = key == "name" || key.ends_with(".name");
                match v {
                    Value::String(s) if is_name_key => {
                        if !out.contains(s) {
                            out.push(s.clone());
                        }
                    }
                    _ => names_in(v, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| names_in(v, out)),
        _ => {}
    }
}

fn local_summary(rows: &[Value]) -> String {
    let mut names = Vec::new();
    rows.iter().for_each(|row| names_in(row, &mut names));

    let noun = if rows.len() == 1 { "record" } else { "records" };
    if names.is_empty() {
        return format!("I found {} matching {}.", rows.len(), noun);
    }

    let mut listed = names.iter().take(MAX_NAMES).cloned().collect::<Vec<_>>().join(", ");
    if names.len() > MAX_NAMES {
        listed.push_str(&format!(" and {} more", names.len() - MAX_NAMES));
    }
    format!("I found {} matching {}: {}.", rows.len(), noun, listed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::tests::{Reply, ScriptedModel};
    use serde_json::json;

    fn explainer(model: Arc<ScriptedModel>) -> ResultExplainer {
        ResultExplainer::new(model, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_no_rows() {
        let model = ScriptedModel::new(vec![]);
        let reply = explainer(model.clone()).explain("Who knows Rohan?", &[]).await;
        assert_eq!(reply, NO_RESULTS);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_count_shortcut() {
        let model = ScriptedModel::new(vec![]);
        let explainer = explainer(model.clone());

        let reply = explainer
            .explain("How many students?", &[json!({"num_students": 12})])
            .await;
        assert_eq!(reply, "There are 12 matching records.");

        let reply = explainer
            .explain("How many?", &[json!({"college": "KU", "student_count": 4})])
            .await;
        assert_eq!(reply, "There are 4 matching records.");
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_reply() {
        let model = ScriptedModel::new(vec![Reply::Text("  Rohan and Sita both study at KU.  ")]);
        let rows = vec![json!({"s.name": "Rohan"}), json!({"s.name": "Sita"})];

        let reply = explainer(model.clone()).explain("Who studies at KU?", &rows).await;

        assert_eq!(reply, "Rohan and Sita both study at KU.");
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Question:\nWho studies at KU?"));
        assert!(prompts[0].contains(r#"{"s.name":"Rohan"}"#));
    }

    #[tokio::test]
    async fn test_fallback_lists_names() {
        let model = ScriptedModel::new(vec![Reply::Fail]);
        let rows: Vec<Value> = ["A1", "B2", "C3", "D4", "E5", "F6"]
            .iter()
            .map(|n| json!({"s": {"name": n, "college": "KU"}}))
            .collect();

        let reply = explainer(model).explain("List students", &rows).await;

        assert_eq!(reply, "I found 6 matching records: A1, B2, C3, D4, E5 and 1 more.");
    }

    #[test]
    fn test_prompt_caps_rows() {
        let rows: Vec<Value> = (0..25).map(|i| json!({"n": i})).collect();
        let prompt = build_prompt("q", &rows);
        assert!(prompt.contains("(5 more rows omitted)"));
        assert!(!prompt.contains(r#"{"n":20}"#));
    }
}
