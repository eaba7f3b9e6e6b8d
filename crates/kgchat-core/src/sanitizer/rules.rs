//! Deterministic repair rules.
//!
//! Each rule is idempotent: applied to its own output it reports
//! `Unchanged`.

use std::sync::LazyLock;

use regex::Regex;

use super::lexer::{self, SegmentKind};
use super::validate::MUTATING_KEYWORDS;

/// Result of applying one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Unchanged,
    Repaired { text: String, note: String },
    Failed(String),
}

/// A named repair rule.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&str) -> RuleOutcome,
}

/// Structural repairs, in the order they run.
pub const RULES: &[Rule] = &[
    Rule { name: "relationship_arrows", apply: normalize_arrows },
    Rule { name: "delimiter_balance", apply: balance_delimiters },
    Rule { name: "string_literals", apply: escape_literals },
];

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").unwrap());

static OPEN_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z]*[ \t]*\r?\n?").unwrap());

static LINE_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:(?i:optional\s+match|match|unwind)\b|(?:WITH|CALL|RETURN)\b)").unwrap()
});

static INLINE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:OPTIONAL MATCH|MATCH|UNWIND|CALL|WITH|RETURN)\b").unwrap());

static RIGHT_ARROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\s*(?:-+|=+)\s*>").unwrap());

static LEFT_ARROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*(?:-+|=+)\s*\[").unwrap());

static BIDIRECTIONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<-(\[[^\]]*\])->").unwrap());

/// Words that begin a Cypher clause.
pub const CLAUSE_KEYWORDS: &[&str] = &[
    "MATCH", "OPTIONAL", "WHERE", "WITH", "RETURN", "ORDER", "SKIP", "LIMIT",
    "UNWIND", "UNION", "CALL",
];

fn starts_with_clause(text: &str) -> bool {
    let first = text
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    CLAUSE_KEYWORDS.contains(&first.as_str())
}

/// Words that may open a line continuing the previous clause.
const CONTINUATION_KEYWORDS: &[&str] = &[
    "AND", "OR", "XOR", "NOT", "AS", "YIELD", "DISTINCT", "ASC", "DESC", "CASE", "WHEN",
    "THEN", "ELSE", "END", "IN", "IS", "ON", "BY", "STARTS", "ENDS", "CONTAINS", "EXISTS",
];

fn leading_word(line: &str) -> &str {
    let line = line.trim_start();
    let end = line
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(line.len());
    &line[..end]
}

/// Upper-case keywords always count. Lower-case ones count only in a query
/// written in lower case, except the unambiguous `match`, `optional` and
/// `unwind`.
fn is_query_keyword(word: &str, lowercase_query: bool) -> bool {
    let upper = word.to_ascii_uppercase();
    let known = CLAUSE_KEYWORDS.contains(&upper.as_str())
        || CONTINUATION_KEYWORDS.contains(&upper.as_str())
        || MUTATING_KEYWORDS.contains(&upper.as_str());
    known && (lowercase_query || word == upper || matches!(upper.as_str(), "MATCH" | "OPTIONAL" | "UNWIND"))
}

/// A line opening with two plain words, neither of them a keyword.
fn is_prose(line: &str, lowercase_query: bool) -> bool {
    let line = line.trim_start();
    let first = leading_word(line);
    if first.is_empty() || is_query_keyword(first, lowercase_query) {
        return false;
    }
    let rest = &line[first.len()..];
    if !rest.starts_with(char::is_whitespace) {
        return false;
    }
    let second = leading_word(rest);
    !second.is_empty() && !is_query_keyword(second, lowercase_query)
}

fn has_open_literal(text: &str) -> bool {
    lexer::segments(text)
        .iter()
        .any(|s| matches!(s.kind, SegmentKind::Literal { terminated: false, .. }))
}

/// The query lines of `body`, which starts at a clause keyword.
///
/// A line of prose ends the block unless a string literal is still open. A
/// blank line ends it unless the next non-blank line opens with a keyword.
fn query_block(body: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let Some((first, rest)) = lines.split_first() else {
        return String::new();
    };
    let lowercase_query = leading_word(first).chars().all(|c| c.is_ascii_lowercase());

    let mut block = first.to_string();
    let mut i = 0;
    while i < rest.len() {
        let line = rest[i];
        if line.trim().is_empty() {
            let next = rest[i..].iter().position(|l| !l.trim().is_empty());
            match next {
                Some(gap) if is_query_keyword(leading_word(rest[i + gap]), lowercase_query) => {
                    for l in &rest[i..=i + gap] {
                        block.push('\n');
                        block.push_str(l);
                    }
                    i += gap + 1;
                    continue;
                }
                _ => break,
            }
        }
        if is_prose(line, lowercase_query) && !has_open_literal(&block) {
            break;
        }
        block.push('\n');
        block.push_str(line);
        i += 1;
    }
    block
}

/// Extract the query from surrounding prose, markdown fences and inline
/// backticks. Also drops trailing statement terminators.
pub fn strip_wrapper(text: &str) -> String {
    let mut query = text.trim().to_string();

    if let Some(caps) = FENCE_RE.captures(&query) {
        query = caps[1].trim().to_string();
    } else if OPEN_FENCE_RE.is_match(&query) {
        query = OPEN_FENCE_RE.replace(&query, "").trim().to_string();
    }

    if query.len() > 1 && query.starts_with('`') && query.ends_with('`') {
        let inner = query[1..query.len() - 1].trim();
        if starts_with_clause(inner) && !inner.contains('`') {
            query = inner.to_string();
        }
    }

    let start = LINE_START_RE
        .find(&query)
        .map(|m| m.start() + (m.as_str().len() - m.as_str().trim_start().len()))
        .or_else(|| INLINE_START_RE.find(&query).map(|m| m.start()));

    if let Some(start) = start {
        query = query_block(&query[start..]);
    }

    // Prose after a terminator ends the query; another clause does not.
    let cut = lexer::segments(&query)
        .into_iter()
        .filter(|s| s.is_code())
        .find_map(|s| s.text(&query).find(';').map(|p| s.start + p));
    if let Some(cut) = cut {
        if !starts_with_clause(&query[cut + 1..]) {
            query.truncate(cut);
        }
    }

    query.trim().trim_end_matches(';').trim_end().to_string()
}

/// Rewrite every code segment with `f`, leaving literals, identifiers and
/// comments untouched.
fn map_code(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    for seg in lexer::segments(text) {
        let body = seg.text(text);
        if seg.is_code() {
            out.push_str(&f(body));
        } else {
            out.push_str(body);
        }
    }
    out
}

const ARROW_FIXES: &[(&str, &str)] = &[
    ("→", "->"),
    ("⟶", "->"),
    ("←", "<-"),
    ("⟵", "<-"),
    ("—", "-"),
    ("–", "-"),
    ("−", "-"),
];

fn fix_arrows(code: &str) -> String {
    let mut current = code.to_string();
    loop {
        let mut next = current.clone();
        for (from, to) in ARROW_FIXES {
            next = next.replace(from, to);
        }
        next = RIGHT_ARROW_RE.replace_all(&next, "]->").into_owned();
        next = LEFT_ARROW_RE.replace_all(&next, "<-[").into_owned();
        next = BIDIRECTIONAL_RE.replace_all(&next, "-$1-").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Rule 2: canonical relationship arrows.
pub fn normalize_arrows(text: &str) -> RuleOutcome {
    let fixed = map_code(text, fix_arrows);
    if fixed == text {
        RuleOutcome::Unchanged
    } else {
        RuleOutcome::Repaired {
            text: fixed,
            note: "normalized relationship arrows".to_string(),
        }
    }
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Unclosed openers in code, or `None` when a closer is mismatched or stray.
pub fn unclosed(text: &str) -> Option<Vec<(char, usize)>> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    for seg in lexer::segments(text).into_iter().filter(|s| s.is_code()) {
        for (i, c) in seg.text(text).char_indices() {
            match c {
                '(' | '[' | '{' => stack.push((c, seg.start + i)),
                ')' | ']' | '}' => match stack.last() {
                    Some((open, _)) if closer(*open) == c => {
                        stack.pop();
                    }
                    _ => return None,
                },
                _ => {}
            }
        }
    }
    Some(stack)
}

/// Rule 3: close a single unclosed delimiter at the end of its clause.
///
/// Only one opener may be missing its closer; anything else has no single
/// unambiguous fix and is left for validation to reject.
pub fn balance_delimiters(text: &str) -> RuleOutcome {
    if has_open_literal(text) {
        return RuleOutcome::Unchanged;
    }

    let (open, pos) = match unclosed(text).as_deref() {
        Some([single]) => *single,
        _ => return RuleOutcome::Unchanged,
    };

    let next_clause = lexer::keywords(text)
        .into_iter()
        .find(|(offset, word)| *offset > pos && CLAUSE_KEYWORDS.contains(&word.as_str()))
        .map(|(offset, _)| offset);
    let insert_at = match next_clause {
        Some(offset) => text[..offset].trim_end().len(),
        None => text.trim_end().len(),
    };

    let close = closer(open);
    let mut fixed = String::with_capacity(text.len() + 1);
    fixed.push_str(&text[..insert_at]);
    fixed.push(close);
    fixed.push_str(&text[insert_at..]);

    RuleOutcome::Repaired {
        text: fixed,
        note: format!("balanced delimiters: inserted '{}'", close),
    }
}

fn replace_curly_quotes(code: &str) -> String {
    code.replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Escape a closing quote that is glued to a following word, e.g. the
/// middle quote of `"O"Brien"`, when a later quote can close the literal.
fn escape_embedded_quote(text: &str) -> Option<String> {
    let segs = lexer::segments(text);
    segs.iter().find_map(|seg| {
        let SegmentKind::Literal { quote, terminated: true } = seg.kind else {
            return None;
        };
        let glued = text[seg.end..].chars().next().is_some_and(|c| c.is_alphanumeric());
        let closes_later = text[seg.end..].contains(quote);
        if !glued || !closes_later {
            return None;
        }
        let quote_at = seg.end - 1;
        Some(format!("{}\\{}", &text[..quote_at], &text[quote_at..]))
    })
}

fn escape_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for seg in lexer::segments(text) {
        let body = seg.text(text);
        if matches!(seg.kind, SegmentKind::Literal { .. }) {
            out.push_str(&body.replace("\r\n", "\\n").replace('\n', "\\n").replace('\r', "\\n"));
        } else {
            out.push_str(body);
        }
    }
    out
}

/// Rule 4: make string literals safe.
///
/// Typographic quotes in code become ASCII quotes, quotes glued inside a
/// word are escaped, and raw line breaks in literals become `\n`. A literal
/// that still does not terminate is rejected.
pub fn escape_literals(text: &str) -> RuleOutcome {
    let mut notes = Vec::new();

    let mut fixed = map_code(text, replace_curly_quotes);
    if fixed != text {
        notes.push("replaced typographic quotes");
    }

    let mut escaped = false;
    for _ in 0..text.len() {
        match escape_embedded_quote(&fixed) {
            Some(next) => {
                fixed = next;
                escaped = true;
            }
            None => break,
        }
    }
    if escaped {
        notes.push("escaped embedded quotes");
    }

    let with_newlines = escape_newlines(&fixed);
    if with_newlines != fixed {
        notes.push("escaped line breaks in literals");
        fixed = with_newlines;
    }

    let open_literal = lexer::segments(&fixed)
        .iter()
        .any(|s| matches!(s.kind, SegmentKind::Literal { terminated: false, .. }));
    if open_literal {
        return RuleOutcome::Failed("unterminated string literal".to_string());
    }

    if notes.is_empty() {
        RuleOutcome::Unchanged
    } else {
        RuleOutcome::Repaired {
            text: fixed,
            note: format!("string literals: {}", notes.join(", ")),
        }
    }
}
