//! Intent classification.
//!
//! A deterministic rule pass that runs before synthesis so small talk never
//! costs a model call.

use serde::Serialize;

use crate::catalog::CatalogSnapshot;

/// Kind of small talk a lexicon entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Greeting,
    Thanks,
    Farewell,
    Identity,
    SmallTalk,
}

impl ChatKind {
    /// Canned reply used when the model is not asked to chat.
    pub fn canned_reply(&self) -> &'static str {
        match self {
            Self::Greeting => "Hello! Ask me about the students in the graph and how they are connected.",
            Self::Thanks => "You're welcome! Anything else you'd like to know?",
            Self::Farewell => "Goodbye!",
            Self::Identity => "I'm a chatbot that answers questions about the student graph by turning them into Cypher queries.",
            Self::SmallTalk => "I'm doing well, thanks. What would you like to know about the students?",
        }
    }
}

const LEXICON: &[(&str, ChatKind)] = &[
    ("hi", ChatKind::Greeting),
    ("hello", ChatKind::Greeting),
    ("hey", ChatKind::Greeting),
    ("hey there", ChatKind::Greeting),
    ("hi there", ChatKind::Greeting),
    ("hello there", ChatKind::Greeting),
    ("yo", ChatKind::Greeting),
    ("namaste", ChatKind::Greeting),
    ("good morning", ChatKind::Greeting),
    ("good afternoon", ChatKind::Greeting),
    ("good evening", ChatKind::Greeting),
    ("thanks", ChatKind::Thanks),
    ("thank you", ChatKind::Thanks),
    ("thx", ChatKind::Thanks),
    ("bye", ChatKind::Farewell),
    ("goodbye", ChatKind::Farewell),
    ("see you", ChatKind::Farewell),
    ("good night", ChatKind::Farewell),
    ("who are you", ChatKind::Identity),
    ("what are you", ChatKind::Identity),
    ("what can you do", ChatKind::Identity),
    ("how are you", ChatKind::SmallTalk),
    ("how are you doing", ChatKind::SmallTalk),
    ("how is it going", ChatKind::SmallTalk),
    ("what's up", ChatKind::SmallTalk),
    ("whats up", ChatKind::SmallTalk),
    ("nice to meet you", ChatKind::SmallTalk),
    ("ok", ChatKind::SmallTalk),
    ("okay", ChatKind::SmallTalk),
    ("cool", ChatKind::SmallTalk),
];

/// Words that mark a question as being about the data even after a greeting.
const DOMAIN_HINTS: &[&str] = &[
    "student", "students", "relationship", "relationships", "database", "graph",
    "friend", "friends", "classmate", "classmates", "college", "board", "stream",
    "interest", "interests", "address", "connection", "connected", "know", "knows",
    "count", "list", "show", "find", "who", "which", "how many",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Chat { kind: ChatKind },
    Query {
        /// Set when the question is a bare entity name: describe that entity.
        focus: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub intent: Intent,
    pub confidence: Option<f32>,
}

impl ClassificationResult {
    pub fn is_chat(&self) -> bool {
        matches!(self.intent, Intent::Chat { .. })
    }

    pub fn is_query(&self) -> bool {
        !self.is_chat()
    }

    fn chat(kind: ChatKind, confidence: f32) -> Self {
        Self {
            intent: Intent::Chat { kind },
            confidence: Some(confidence),
        }
    }

    fn query(focus: Option<String>, confidence: f32) -> Self {
        Self {
            intent: Intent::Query { focus },
            confidence: Some(confidence),
        }
    }
}

/// Lower-case, trim trailing punctuation and collapse whitespace.
fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(|c: char| matches!(c, '!' | '?' | '.' | ',' | '~'))
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn strip_punctuation(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn mentions_domain(text: &str) -> bool {
    let words = words(text);
    DOMAIN_HINTS.iter().any(|hint| {
        if hint.contains(' ') {
            text.contains(hint)
        } else {
            words.contains(hint)
        }
    })
}

/// Whether a catalog name appears in `text` as a run of whole words.
fn mentions_entity(text: &str, catalog: &CatalogSnapshot) -> bool {
    let text_words = words(text);
    catalog.names().any(|name| {
        let name = name.to_lowercase();
        let name_words = words(&name);
        !name_words.is_empty()
            && text_words
                .windows(name_words.len())
                .any(|window| window == name_words.as_slice())
    })
}

/// Classify a resolved question as small talk or a database request.
pub fn classify(resolved_question: &str, catalog: &CatalogSnapshot) -> ClassificationResult {
    let normalized = normalize(resolved_question);

    if let Some((_, kind)) = LEXICON.iter().find(|(pattern, _)| *pattern == normalized) {
        return ClassificationResult::chat(*kind, 1.0);
    }

    if let Some(name) = catalog.find_ignore_case(strip_punctuation(resolved_question)) {
        return ClassificationResult::query(Some(name.to_string()), 1.0);
    }

    let prefix = LEXICON
        .iter()
        .filter(|(pattern, _)| {
            normalized
                .strip_prefix(pattern)
                .is_some_and(|rest| rest.starts_with(|c: char| !c.is_alphanumeric()))
        })
        .max_by_key(|(pattern, _)| pattern.len());

    if let Some((pattern, kind)) = prefix {
        let rest = &normalized[pattern.len()..];
        if !mentions_domain(rest) && !mentions_entity(rest, catalog) {
            return ClassificationResult::chat(*kind, 0.7);
        }
    }

    let confidence = if mentions_domain(&normalized) || mentions_entity(&normalized, catalog) {
        0.9
    } else {
        0.5
    };
    ClassificationResult::query(None, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn students() -> CatalogSnapshot {
        CatalogSnapshot::from_names(["Dikshanta", "Rohan", "Ram Sharma"])
    }

    #[test]
    fn test_lexicon_is_always_chat() {
        let adversarial = CatalogSnapshot::from_names(["Hello", "Thanks", "Hi"]);
        for catalog in [CatalogSnapshot::empty(), students(), adversarial] {
            for (pattern, kind) in LEXICON {
                let result = classify(pattern, &catalog);
                assert_eq!(result.intent, Intent::Chat { kind: *kind }, "pattern {:?}", pattern);
                assert_eq!(result.confidence, Some(1.0));
            }
        }
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        assert!(classify("  HELLO!! ", &students()).is_chat());
        assert!(classify("Thank   you.", &students()).is_chat());
        assert!(classify("How are you?", &students()).is_chat());
    }

    #[test]
    fn test_greeting_prefix() {
        let result = classify("hello, nice weather today", &students());
        assert_eq!(result.intent, Intent::Chat { kind: ChatKind::Greeting });
        assert_eq!(result.confidence, Some(0.7));
    }

    #[test]
    fn test_greeting_prefix_with_question_is_query() {
        assert!(classify("hi, who are Rohan's friends?", &students()).is_query());
        assert!(classify("hello, how many students study science?", &students()).is_query());
    }

    #[test]
    fn test_prefix_needs_word_boundary() {
        // "history" starts with "hi" but is not a greeting.
        assert!(classify("history students in Kathmandu", &students()).is_query());
    }

    #[test]
    fn test_greeting_prefix_matches_whole_entity_names() {
        let catalog = CatalogSnapshot::from_names(["Ed", "Ram Sharma"]);
        let result = classify("hi, I need a break", &catalog);
        assert_eq!(result.intent, Intent::Chat { kind: ChatKind::Greeting });

        assert!(classify("hi, what about Ed?", &catalog).is_query());
        assert!(classify("hello, is ram sharma around", &catalog).is_query());
        assert!(classify("hello, the ram is sharp", &catalog).is_chat());
    }

    #[test]
    fn test_bare_entity_name() {
        let result = classify("Rohan", &students());
        assert_eq!(result.intent, Intent::Query { focus: Some("Rohan".to_string()) });

        let result = classify("ram sharma?", &students());
        assert_eq!(result.intent, Intent::Query { focus: Some("Ram Sharma".to_string()) });
    }

    #[test]
    fn test_default_is_query() {
        let result = classify("What is the connection between Dikshanta and Rohan?", &students());
        assert_eq!(result.intent, Intent::Query { focus: None });
        assert_eq!(result.confidence, Some(0.9));

        let result = classify("tell me something", &CatalogSnapshot::empty());
        assert!(result.is_query());
        assert_eq!(result.confidence, Some(0.5));
    }
}
