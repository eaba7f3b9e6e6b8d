//! Fuzzy entity resolution.
//!
//! Rewrites misspelled entity names in a question to their canonical
//! catalog spelling. Matching is deterministic: candidates are ranked by
//! similarity, then edit distance, then name. Two leaders that agree on both
//! similarity and edit distance are a true tie and the span is left alone.

pub mod model;
pub mod spans;

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::catalog::CatalogSnapshot;
use crate::config::ResolverConfig;
use crate::error::KgError;
pub use model::{Resolution, ResolutionCandidate};
use spans::Word;

const SCORE_EPSILON: f64 = 1e-9;

/// A catalog name scored against one span.
#[derive(Debug, Clone)]
struct Scored<'a> {
    name: &'a str,
    score: f64,
    distance: usize,
}

fn rank(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(a.distance.cmp(&b.distance))
        .then(a.name.cmp(b.name))
}

enum SpanMatch<'a> {
    Exact(&'a str),
    Accepted(Scored<'a>),
    Tied(Vec<Scored<'a>>),
}

/// Normalized similarity and raw edit distance between two names.
pub fn similarity(a: &str, b: &str) -> (f64, usize) {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    (
        strsim::normalized_damerau_levenshtein(&a, &b),
        strsim::damerau_levenshtein(&a, &b),
    )
}

/// Resolves misspelled entity references against a catalog snapshot.
#[derive(Debug, Clone, Default)]
pub struct FuzzyResolver {
    config: ResolverConfig,
}

impl FuzzyResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Rewrite `question` so every confidently matched span uses its
    /// canonical name. Text outside accepted spans is preserved verbatim.
    pub fn resolve(&self, question: &str, catalog: &CatalogSnapshot) -> Resolution {
        if catalog.is_empty() {
            return Resolution::unchanged(question);
        }

        let mut resolution = Resolution::unchanged(question);
        let mut replacements: Vec<(usize, usize, String)> = Vec::new();

        for run in spans::runs(question, self.config.span_heuristic) {
            let mut i = 0;
            while i < run.len() {
                let longest = self.config.max_span_words.min(run.len() - i);
                let mut consumed = 1;

                for len in (1..=longest).rev() {
                    let span = span_range(&run[i..i + len]);
                    let text = &question[span.0..span.1];
                    if text.chars().count() < self.config.min_span_chars {
                        continue;
                    }

                    match self.match_span(text, catalog) {
                        None => continue,
                        Some(SpanMatch::Exact(name)) => {
                            resolution.mentioned.push(name.to_string());
                        }
                        Some(SpanMatch::Accepted(best)) => {
                            debug!(span = text, matched = best.name, score = best.score, "Resolved entity span");
                            resolution.mentioned.push(best.name.to_string());
                            resolution.candidates.push(candidate(text, &best, true));
                            replacements.push((span.0, span.1, best.name.to_string()));
                        }
                        Some(SpanMatch::Tied(tied)) => {
                            let err = KgError::AmbiguousEntity {
                                span: text.to_string(),
                                candidates: tied.iter().map(|s| s.name.to_string()).collect(),
                            };
                            warn!(error = %err, "Leaving ambiguous span unresolved");
                            resolution
                                .candidates
                                .extend(tied.iter().map(|s| candidate(text, s, false)));
                        }
                    }
                    consumed = len;
                    break;
                }

                i += consumed;
            }
        }

        resolution.resolved_question = rewrite(question, &replacements);
        resolution
    }

    fn match_span<'a>(&self, span: &str, catalog: &'a CatalogSnapshot) -> Option<SpanMatch<'a>> {
        if let Some(name) = catalog.names().find(|n| *n == span) {
            return Some(SpanMatch::Exact(name));
        }

        let mut scored: Vec<Scored<'a>> = catalog
            .names()
            .map(|name| {
                let (score, distance) = similarity(span, name);
                Scored { name, score, distance }
            })
            .filter(|s| s.score + SCORE_EPSILON >= self.config.threshold)
            .collect();
        if scored.is_empty() {
            return None;
        }
        scored.sort_by(rank);

        let leader = scored[0].clone();
        let tied: Vec<Scored<'a>> = scored
            .into_iter()
            .take_while(|s| (s.score - leader.score).abs() < SCORE_EPSILON && s.distance == leader.distance)
            .collect();

        if tied.len() > 1 {
            Some(SpanMatch::Tied(tied))
        } else {
            Some(SpanMatch::Accepted(leader))
        }
    }
}

fn span_range(words: &[Word]) -> (usize, usize) {
    (words[0].start, words[words.len() - 1].end)
}

fn candidate(raw: &str, scored: &Scored<'_>, accepted: bool) -> ResolutionCandidate {
    ResolutionCandidate {
        raw_token: raw.to_string(),
        matched_name: scored.name.to_string(),
        similarity_score: scored.score,
        edit_distance: scored.distance,
        accepted,
    }
}

/// Apply non-overlapping, ordered byte-range replacements.
fn rewrite(text: &str, replacements: &[(usize, usize, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end, replacement) in replacements {
        out.push_str(&text[cursor..*start]);
        out.push_str(replacement);
        cursor = *end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpanHeuristic;

    fn catalog(names: &[&str]) -> CatalogSnapshot {
        CatalogSnapshot::from_names(names.iter().copied())
    }

    #[test]
    fn test_connection_question() {
        let resolver = FuzzyResolver::default();
        let resolution = resolver.resolve(
            "What is the connection between Dikshant and Rohen?",
            &catalog(&["Dikshanta", "Rohan"]),
        );

        assert_eq!(
            resolution.resolved_question,
            "What is the connection between Dikshanta and Rohan?"
        );
        assert_eq!(resolution.mentioned, vec!["Dikshanta", "Rohan"]);
        let accepted: Vec<_> = resolution.accepted().map(|c| c.matched_name.as_str()).collect();
        assert_eq!(accepted, vec!["Dikshanta", "Rohan"]);
        assert!(resolution.was_rewritten());
    }

    #[test]
    fn test_single_edit_misspellings() {
        let names = ["Dikshanta", "Rohan", "Aashish", "Prakriti", "Sushant", "Bibek Thapa"];
        let snapshot = catalog(&names);
        let resolver = FuzzyResolver::default();

        for name in names {
            let chars: Vec<char> = name.chars().collect();
            let last = chars.len() - 1;
            let variants = [
                // substitution
                chars[..last].iter().collect::<String>() + "x",
                // deletion
                chars[..last].iter().collect::<String>(),
                // insertion
                format!("{}e", name),
            ];
            for misspelled in variants {
                let question = format!("Who is friends with {}?", misspelled);
                let resolution = resolver.resolve(&question, &snapshot);
                assert_eq!(
                    resolution.resolved_question,
                    format!("Who is friends with {}?", name),
                    "misspelling {:?} of {:?}",
                    misspelled,
                    name
                );
            }
        }
    }

    #[test]
    fn test_transposition_counts_as_one_edit() {
        let resolution = FuzzyResolver::default().resolve("Where does Rhoan live?", &catalog(&["Rohan"]));
        assert_eq!(resolution.resolved_question, "Where does Rohan live?");
    }

    #[test]
    fn test_exact_name_is_not_a_candidate() {
        let resolution = FuzzyResolver::default().resolve("Where does Rohan live?", &catalog(&["Rohan", "Rohana"]));
        assert_eq!(resolution.resolved_question, "Where does Rohan live?");
        assert!(resolution.candidates.is_empty());
        assert_eq!(resolution.mentioned, vec!["Rohan"]);
    }

    #[test]
    fn test_below_threshold_is_untouched() {
        let resolution = FuzzyResolver::default().resolve("Where does Rakesh live?", &catalog(&["Rohan"]));
        assert_eq!(resolution.resolved_question, "Where does Rakesh live?");
        assert!(resolution.candidates.is_empty());
    }

    #[test]
    fn test_true_tie_is_rejected() {
        // "Sitar" is one substitution away from both names, which share a length.
        let resolution = FuzzyResolver::default().resolve("Does Sitar know Gita?", &catalog(&["Sitam", "Sitax"]));
        assert_eq!(resolution.resolved_question, "Does Sitar know Gita?");
        assert_eq!(resolution.accepted().count(), 0);

        let rejected: Vec<_> = resolution.rejected().map(|c| c.matched_name.as_str()).collect();
        assert_eq!(rejected, vec!["Sitam", "Sitax"]);
    }

    #[test]
    fn test_closest_name_wins() {
        let resolution = FuzzyResolver::default().resolve("Is Rohen here?", &catalog(&["Rohan", "Rohit"]));
        assert_eq!(resolution.resolved_question, "Is Rohan here?");
        assert_eq!(resolution.accepted().count(), 1);
    }

    #[test]
    fn test_rank_order() {
        let mut scored = vec![
            Scored { name: "Zed", score: 0.9, distance: 2 },
            Scored { name: "Bob", score: 0.9, distance: 1 },
            Scored { name: "Amy", score: 0.9, distance: 1 },
            Scored { name: "Top", score: 0.95, distance: 3 },
        ];
        scored.sort_by(rank);
        let order: Vec<_> = scored.iter().map(|s| s.name).collect();
        assert_eq!(order, vec!["Top", "Amy", "Bob", "Zed"]);
    }

    #[test]
    fn test_multi_word_name() {
        let resolution = FuzzyResolver::default().resolve("Does Ram Sharme know Sita?", &catalog(&["Ram Sharma", "Sita"]));
        assert_eq!(resolution.resolved_question, "Does Ram Sharma know Sita?");
        assert_eq!(resolution.mentioned, vec!["Ram Sharma", "Sita"]);
    }

    #[test]
    fn test_empty_catalog() {
        let resolution = FuzzyResolver::default().resolve("Who knows Rohen?", &CatalogSnapshot::empty());
        assert_eq!(resolution.resolved_question, "Who knows Rohen?");
        assert!(resolution.candidates.is_empty());
    }

    #[test]
    fn test_lowercase_needs_all_words_heuristic() {
        let snapshot = catalog(&["Rohan"]);
        let capitalized = FuzzyResolver::default().resolve("who knows rohen?", &snapshot);
        assert_eq!(capitalized.resolved_question, "who knows rohen?");

        let all_words = FuzzyResolver::new(ResolverConfig {
            span_heuristic: SpanHeuristic::AllWords,
            ..ResolverConfig::default()
        })
        .resolve("who knows rohen?", &snapshot);
        assert_eq!(all_words.resolved_question, "who knows Rohan?");
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("Rohan", "rohan"), (1.0, 0));
        let (score, distance) = similarity("Rohen", "Rohan");
        assert_eq!(distance, 1);
        assert!((score - 0.8).abs() < 1e-9);
    }
}
