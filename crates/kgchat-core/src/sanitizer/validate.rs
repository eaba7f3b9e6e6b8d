//! Structural validation and the read-only policy.

use crate::catalog::CatalogSnapshot;

use super::lexer::{self, SegmentKind};
use super::rules;

/// Keywords that write to the graph or its schema.
pub const MUTATING_KEYWORDS: &[&str] = &[
    "CREATE", "MERGE", "DELETE", "DETACH", "SET", "REMOVE", "DROP", "FOREACH", "LOAD",
];

/// Procedure namespaces that write, administer, touch the filesystem or
/// run Cypher passed in as a string.
pub const WRITE_PROCEDURES: &[&str] = &[
    "apoc.cypher.doit",
    "apoc.cypher.runwrite",
    "apoc.cypher.runfile",
    "apoc.cypher.runschema",
    "apoc.export",
    "apoc.import",
    "apoc.load",
    "apoc.atomic",
    "apoc.create",
    "apoc.merge",
    "apoc.refactor",
    "apoc.periodic",
    "apoc.trigger",
    "apoc.schema",
    "apoc.nodes.delete",
    "apoc.do",
    "db.create",
    "db.index.fulltext.create",
    "dbms.",
];

const READ_START: &[&str] = &["MATCH", "OPTIONAL", "WITH", "UNWIND", "CALL", "RETURN"];

/// First mutating keyword or write procedure outside string literals.
///
/// Comments are scanned too, so a write cannot hide behind `//`.
pub fn forbidden_keyword(text: &str) -> Option<String> {
    lexer::words(text)
        .into_iter()
        .filter(|w| w.is_keyword_position())
        .find_map(|w| {
            let upper = w.text.to_ascii_uppercase();
            if MUTATING_KEYWORDS.contains(&upper.as_str()) {
                return Some(upper);
            }
            let lower = w.text.to_ascii_lowercase();
            WRITE_PROCEDURES
                .iter()
                .any(|p| lower.starts_with(p))
                .then(|| w.text.to_string())
        })
}

/// Structural checks a query must pass before execution.
pub fn validate(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("empty query".to_string());
    }

    let segments = lexer::segments(text);
    for seg in &segments {
        match seg.kind {
            SegmentKind::Literal { terminated: false, .. } => {
                return Err("unterminated string literal".to_string());
            }
            SegmentKind::Identifier if !seg.text(text).ends_with('`') || seg.end - seg.start < 2 => {
                return Err("unterminated identifier".to_string());
            }
            _ => {}
        }
    }

    match rules::unclosed(text) {
        Some(open) if open.is_empty() => {}
        _ => return Err("unbalanced delimiters".to_string()),
    }

    let terminator = segments
        .iter()
        .filter(|s| s.is_code())
        .any(|s| s.text(text).contains(';'));
    if terminator {
        return Err("multiple statements".to_string());
    }

    let keywords = lexer::keywords(text);
    match keywords.first() {
        Some((_, first)) if READ_START.contains(&first.as_str()) => {}
        _ => return Err("query must start with a read clause".to_string()),
    }
    if !keywords.iter().any(|(_, k)| k == "RETURN") {
        return Err("missing RETURN clause".to_string());
    }

    Ok(())
}

/// Name literals bound to `name_property`, as in `{name: "X"}` or `.name = "X"`.
pub fn name_literals(text: &str, name_property: &str) -> Vec<String> {
    let map_key = format!("{}:", name_property);
    let property = format!(".{}", name_property);

    lexer::segments(text)
        .into_iter()
        .filter(|s| matches!(s.kind, SegmentKind::Literal { terminated: true, .. }))
        .filter(|s| {
            let before = text[..s.start].trim_end();
            let is_map_entry = before
                .strip_suffix(&map_key)
                .is_some_and(|rest| !rest.ends_with(|c: char| c.is_alphanumeric() || c == '_'));
            let is_comparison = before
                .strip_suffix('=')
                .map(str::trim_end)
                .is_some_and(|rest| rest.ends_with(&property));
            is_map_entry || is_comparison
        })
        .map(|s| unescape(&text[s.start + 1..s.end - 1]))
        .collect()
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Name literals that appear neither in the question nor in the catalog.
pub fn unknown_entity_references(
    text: &str,
    name_property: &str,
    question: &str,
    catalog: &CatalogSnapshot,
) -> Vec<String> {
    let question = question.to_lowercase();
    name_literals(text, name_property)
        .into_iter()
        .filter(|name| {
            !question.contains(&name.to_lowercase()) && catalog.find_ignore_case(name).is_none()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutating_keywords_are_forbidden() {
        let corpus = [
            ("MATCH (s) DETACH DELETE s", "DETACH"),
            ("MATCH (s) DELETE s RETURN count(s)", "DELETE"),
            ("CREATE (s:Student {name: 'X'}) RETURN s", "CREATE"),
            ("MERGE (s:Student {name: 'X'}) RETURN s", "MERGE"),
            ("MATCH (s) SET s.name = 'X' RETURN s", "SET"),
            ("match (s) remove s.college return s", "REMOVE"),
            ("DROP INDEX student_name", "DROP"),
            ("LOAD CSV FROM 'file:///x.csv' AS row RETURN row", "LOAD"),
            ("MATCH (s) FOREACH (x IN [1] | SET s.n = x) RETURN s", "FOREACH"),
            ("MATCH (s) RETURN s // DELETE s", "DELETE"),
            ("CALL apoc.create.node(['Student'], {}) YIELD node RETURN node", "apoc.create.node"),
            ("CALL dbms.killQuery('q-1') YIELD queryId RETURN queryId", "dbms.killQuery"),
            (
                "CALL apoc.cypher.doIt(\"MATCH (n) DETACH DELETE n\", {}) YIELD value RETURN value",
                "apoc.cypher.doIt",
            ),
            (
                "CALL apoc.cypher.runWrite('CREATE (s:Student)', {}) YIELD value RETURN value",
                "apoc.cypher.runWrite",
            ),
            ("CALL apoc.cypher.runFile('wipe.cypher') YIELD result RETURN result", "apoc.cypher.runFile"),
            ("CALL apoc.export.csv.all('out.csv', {}) YIELD file RETURN file", "apoc.export.csv.all"),
            ("CALL apoc.import.json('in.json') YIELD nodes RETURN nodes", "apoc.import.json"),
            ("CALL apoc.load.json('http://x/y') YIELD value RETURN value", "apoc.load.json"),
            ("CALL apoc.atomic.add(s, 'n', 1) YIELD newValue RETURN newValue", "apoc.atomic.add"),
            (
                "CALL db.index.fulltext.createNodeIndex('idx', ['Student'], ['name']) RETURN 1",
                "db.index.fulltext.createNodeIndex",
            ),
        ];
        for (query, keyword) in corpus {
            assert_eq!(forbidden_keyword(query).as_deref(), Some(keyword), "query {:?}", query);
        }
    }

    #[test]
    fn test_read_queries_are_allowed() {
        let corpus = [
            "MATCH (s:Student) RETURN s",
            "MATCH (s) WHERE s.name = 'Delete Me' RETURN s",
            "MATCH (s:Create) RETURN s.set, s.remove",
            "MATCH (s) WHERE s.stream = $set RETURN s",
            "MATCH (s)-[:SAME_COLLEGE]->(t) RETURN t.name",
            "CALL db.labels() YIELD label RETURN label",
            "CALL apoc.cypher.run('MATCH (s) RETURN s', {}) YIELD value RETURN value",
            "MATCH (s) RETURN apoc.text.join([s.name], ', ')",
        ];
        for query in corpus {
            assert_eq!(forbidden_keyword(query), None, "query {:?}", query);
        }
    }

    #[test]
    fn test_validate_accepts_read_query() {
        assert_eq!(
            validate("MATCH p = shortestPath((a:Student {name: \"Dikshanta\"})-[*]-(b:Student {name: \"Rohan\"}))\nRETURN p"),
            Ok(())
        );
        assert_eq!(validate("OPTIONAL MATCH (s)-[:KNOWS]-(t) RETURN t"), Ok(()));
    }

    #[test]
    fn test_validate_failures() {
        let cases = [
            ("", "empty query"),
            ("MATCH (s {name: \"Rohan}) RETURN s", "unterminated string literal"),
            ("MATCH (`s) RETURN s", "unterminated identifier"),
            ("MATCH ((s) RETURN s", "unbalanced delimiters"),
            ("MATCH (s) RETURN s; MATCH (t) RETURN t", "multiple statements"),
            ("Sorry, I cannot help with that", "query must start with a read clause"),
            ("MATCH (s:Student)", "missing RETURN clause"),
        ];
        for (query, reason) in cases {
            assert_eq!(validate(query), Err(reason.to_string()), "query {:?}", query);
        }
    }

    #[test]
    fn test_name_literals() {
        let query = r#"MATCH (a:Student {name: "Dikshanta"}), (b:Student) WHERE b.name = 'Rohan' AND b.nickname = "Ro" RETURN a, b"#;
        assert_eq!(name_literals(query, "name"), vec!["Dikshanta", "Rohan"]);
    }

    #[test]
    fn test_unknown_entity_references() {
        let catalog = CatalogSnapshot::from_names(["Dikshanta", "Rohan"]);
        let query = r#"MATCH (a {name: "Dikshanta"}), (b {name: "Sita"}), (c {name: "Gita"}) RETURN a, b, c"#;
        let unknown = unknown_entity_references(query, "name", "Is Sita friends with Dikshanta?", &catalog);
        assert_eq!(unknown, vec!["Gita"]);
    }
}
