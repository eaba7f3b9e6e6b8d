//! Query sanitizer.
//!
//! Repairs predictable model mistakes in a candidate query and decides
//! whether the result may be executed. The read-only policy is checked
//! before any repair: a query with a mutating keyword is never fixed up.

pub mod lexer;
pub mod rules;
pub mod validate;

use serde::Serialize;
use tracing::debug;

use crate::synthesis::CandidateQuery;
use rules::{RuleOutcome, RULES};

/// Passes over the rule sequence before giving up on a fixed point.
const MAX_PASSES: usize = 4;

/// Why a sanitized query is not executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SanitizeFailure {
    /// A mutating keyword or write procedure was found.
    Forbidden(String),
    /// A repair or structural check failed.
    Invalid(String),
}

/// Terminal artifact of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedQuery {
    pub text: String,
    pub valid: bool,
    pub repairs_applied: Vec<String>,
    /// Prose, fences or backticks were removed around the query.
    pub stripped_wrapper: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SanitizeFailure>,
}

impl SanitizedQuery {
    fn rejected(text: String, repairs: Vec<String>, stripped: bool, failure: SanitizeFailure) -> Self {
        Self {
            text,
            valid: false,
            repairs_applied: repairs,
            stripped_wrapper: stripped,
            failure: Some(failure),
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self.failure, Some(SanitizeFailure::Forbidden(_)))
    }
}

pub fn sanitize(candidate: &CandidateQuery) -> SanitizedQuery {
    sanitize_text(&candidate.text)
}

/// Sanitize raw query text.
pub fn sanitize_text(raw: &str) -> SanitizedQuery {
    let mut text = rules::strip_wrapper(raw);
    let stripped = text != raw.trim();

    if let Some(keyword) = validate::forbidden_keyword(&text) {
        debug!(%keyword, "Mutating keyword found, skipping repairs");
        return SanitizedQuery::rejected(text, Vec::new(), stripped, SanitizeFailure::Forbidden(keyword));
    }

    let mut repairs: Vec<String> = Vec::new();
    for _ in 0..MAX_PASSES {
        let mut changed = false;
        for rule in RULES {
            match (rule.apply)(&text) {
                RuleOutcome::Unchanged => {}
                RuleOutcome::Repaired { text: fixed, note } => {
                    debug!(rule = rule.name, %note, "Repair applied");
                    text = fixed;
                    changed = true;
                    if !repairs.contains(&note) {
                        repairs.push(note);
                    }
                }
                RuleOutcome::Failed(reason) => {
                    debug!(rule = rule.name, %reason, "Repair failed");
                    repairs.push(format!("validation failed: {}", reason));
                    return SanitizedQuery::rejected(text, repairs, stripped, SanitizeFailure::Invalid(reason));
                }
            }
        }
        if !changed {
            break;
        }
    }

    // Repairs may have exposed a keyword, e.g. by closing a literal.
    if let Some(keyword) = validate::forbidden_keyword(&text) {
        return SanitizedQuery::rejected(text, repairs, stripped, SanitizeFailure::Forbidden(keyword));
    }

    match validate::validate(&text) {
        Ok(()) => SanitizedQuery {
            text,
            valid: true,
            repairs_applied: repairs,
            stripped_wrapper: stripped,
            failure: None,
        },
        Err(reason) => {
            repairs.push(format!("validation failed: {}", reason));
            SanitizedQuery::rejected(text, repairs, stripped, SanitizeFailure::Invalid(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL_OUTPUTS: &[&str] = &[
        "MATCH (s:Student) RETURN s.name",
        "Here is the query:\n```cypher\nMATCH (s:Student {name: \"Rohan\"}) RETURN s\n```",
        "Sure! MATCH (s:Student)-[:KNOWS]->(t RETURN t.name",
        "MATCH (a:Student {name: \"Dikshanta\"})-[r:FRIEND_OF]→(b) RETURN b",
        "MATCH (a)<-[:KNOWS]->(b) RETURN a, b",
        "MATCH (s) WHERE s.name = \u{201C}Rohan\u{201D} RETURN s",
        "MATCH (s) WHERE s.name = \"O\"Brien\" RETURN s",
        "`MATCH (s:Student) RETURN count(s) AS num_students`",
        "MATCH (s:Student) RETURN s;",
        "I cannot answer that.",
        "MATCH (s {name: \"Rohan}) RETURN s",
        "MATCH ((s) RETURN s",
        "MATCH (s:Student) RETURN s.name\nThis query lists all students.",
        "MATCH (s:Student)\n\nRETURN s.name",
    ];

    #[test]
    fn test_prose_and_missing_delimiter() {
        let candidate = CandidateQuery {
            text: "Here is the Cypher query you asked for:\n\nMATCH (s:Student {name: \"Rohan\"}\nRETURN s.name\n\nThis returns Rohan's name.".to_string(),
            source_question: "What is Rohan's name?".to_string(),
        };

        let sanitized = sanitize(&candidate);

        assert!(sanitized.valid, "{:?}", sanitized);
        assert!(sanitized.stripped_wrapper);
        assert_eq!(sanitized.text, "MATCH (s:Student {name: \"Rohan\"})\nRETURN s.name");
        assert_eq!(sanitized.repairs_applied.len(), 1);
        assert_eq!(sanitized.repairs_applied[0], "balanced delimiters: inserted ')'");
    }

    #[test]
    fn test_clean_query_passes_untouched() {
        let sanitized = sanitize_text("MATCH (s:Student)-[:SAME_COLLEGE]-(t) RETURN t.name");
        assert!(sanitized.valid);
        assert!(!sanitized.stripped_wrapper);
        assert!(sanitized.repairs_applied.is_empty());
        assert_eq!(sanitized.failure, None);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for output in MODEL_OUTPUTS {
            let once = sanitize_text(output);
            let twice = sanitize_text(&once.text);
            assert_eq!(once.text, twice.text, "output {:?}", output);
            assert_eq!(once.valid, twice.valid, "output {:?}", output);
            if once.valid {
                assert!(twice.repairs_applied.is_empty(), "output {:?}: {:?}", output, twice);
            }
        }
    }

    #[test]
    fn test_mutating_queries_always_rejected() {
        let corpus = [
            "MATCH (s:Student {name: \"Rohan\"}) DETACH DELETE s",
            "```cypher\nMATCH (s) SET s.college = \"KU\" RETURN s\n```",
            "CREATE (s:Student {name: \"Ghost\"}) RETURN s",
            "MERGE (s:Student {name: \"Ghost\"}) RETURN s",
            "MATCH (s) REMOVE s.stream RETURN s",
            "MATCH (s) RETURN s // then DELETE s",
            "MATCH (s:Student {name: \"Rohan\"} DELETE s",
            "CALL apoc.periodic.iterate('MATCH (n) RETURN n', 'DELETE n', {}) YIELD batches RETURN batches",
            "CALL apoc.cypher.doIt(\"MATCH (n) DETACH DELETE n\", {}) YIELD value RETURN value",
            "CALL apoc.cypher.runWrite(\"CREATE (s:Student)\", {}) YIELD value RETURN value",
            "CALL apoc.export.csv.all(\"students.csv\", {}) YIELD file RETURN file",
        ];
        for query in corpus {
            let sanitized = sanitize_text(query);
            assert!(!sanitized.valid, "query {:?}", query);
            assert!(sanitized.is_forbidden(), "query {:?}", query);
            assert!(sanitized.repairs_applied.is_empty(), "query {:?}", query);
        }
    }

    #[test]
    fn test_prose_on_following_lines() {
        let sanitized = sanitize_text("MATCH (s:Student) RETURN s.name\nThis query lists all students.");
        assert!(sanitized.valid, "{:?}", sanitized);
        assert!(sanitized.stripped_wrapper);
        assert_eq!(sanitized.text, "MATCH (s:Student) RETURN s.name");

        let sanitized = sanitize_text("MATCH (s:Student)\n\nRETURN s.name");
        assert!(sanitized.valid, "{:?}", sanitized);
        assert!(!sanitized.stripped_wrapper);
        assert!(sanitized.repairs_applied.is_empty());
    }

    #[test]
    fn test_invalid_query_explains_failed_check() {
        let sanitized = sanitize_text("MATCH (s:Student)");
        assert!(!sanitized.valid);
        assert_eq!(sanitized.failure, Some(SanitizeFailure::Invalid("missing RETURN clause".to_string())));
        assert_eq!(sanitized.repairs_applied.last().unwrap(), "validation failed: missing RETURN clause");
    }

    #[test]
    fn test_unterminated_literal_is_rejected() {
        let sanitized = sanitize_text("MATCH (s {name: \"Rohan}) RETURN s");
        assert!(!sanitized.valid);
        assert_eq!(
            sanitized.failure,
            Some(SanitizeFailure::Invalid("unterminated string literal".to_string()))
        );
    }

    #[test]
    fn test_arrow_and_quote_repairs() {
        let sanitized = sanitize_text("MATCH (a {name: \u{201C}Dikshanta\u{201D}})-[:KNOWS]\u{2192}(b) RETURN b");
        assert!(sanitized.valid, "{:?}", sanitized);
        assert_eq!(sanitized.text, "MATCH (a {name: \"Dikshanta\"})-[:KNOWS]->(b) RETURN b");
        assert_eq!(sanitized.repairs_applied.len(), 2);
    }
}
