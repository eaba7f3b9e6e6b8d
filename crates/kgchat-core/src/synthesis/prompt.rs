//! Prompt construction for Cypher generation.

use super::schema::SchemaDescription;

/// Build the full generation prompt.
pub fn build_prompt(question: &str, schema: &SchemaDescription, entities: &[String]) -> String {
    let name = &schema.name_property;
    let mut prompt = String::from("You are an expert Neo4j Cypher developer.\n\n");

    prompt.push_str("Schema:\n");
    prompt.push_str(&schema.render());

    prompt.push_str(&format!(
        r#"
Rules:
- Return exactly one read-only Cypher query and nothing else.
- Do NOT add explanations, comments or markdown fences.
- Never use CREATE, MERGE, DELETE, DETACH, SET, REMOVE, DROP or LOAD CSV.
- Match `{name}` with exact, case-preserving equality (e.g. `s.{name} = "Aashish"`); never wrap `{name}` in `toLower()`.
- Compare other text properties case-insensitively with `toLower()` (e.g. `toLower(s.address) = toLower("Kathmandu")`).
- Use `OPTIONAL MATCH` for optional relationships or properties, but always end with a `RETURN` clause.
- Alias counts (e.g. `RETURN count(s) AS num_students`).
- Return clear fields (e.g. `RETURN s.{name}` or `RETURN s`).
- Prefer `toLower(...) = toLower(...)` or `CONTAINS` over regex `=~`.
- To connect two people, use `shortestPath` between their nodes.
"#
    ));

    if !entities.is_empty() {
        prompt.push_str("\nKnown entities mentioned (use these exact spellings):\n");
        for entity in entities {
            prompt.push_str(&format!("- {}\n", entity));
        }
    }

    prompt.push_str(&format!("\nQuestion:\n{}\n\nCypher:\n", question));
    prompt
}

/// Build the shortened prompt used for the single retry.
pub fn build_short_prompt(question: &str, schema: &SchemaDescription, entities: &[String]) -> String {
    let mut prompt = format!(
        "Write one read-only Neo4j Cypher query, no prose. {}\n",
        schema.render_compact()
    );
    if !entities.is_empty() {
        prompt.push_str(&format!("Entities: {}.\n", entities.join(", ")));
    }
    prompt.push_str(&format!("Question: {}\nCypher:\n", question));
    prompt
}

/// Rephrase a bare entity name as a describe request.
pub fn describe_entity_question(name: &str) -> String {
    format!("Describe \"{}\": return the node with all of its properties and its direct relationships.", name)
}
