//! Candidate name spans.
//!
//! A word is a maximal run of alphanumeric characters. A run is a sequence
//! of words separated only by whitespace; under the capitalized heuristic
//! only capitalized words take part in runs.

use crate::config::SpanHeuristic;

/// A word with its byte range in the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word {
    pub start: usize,
    pub end: usize,
}

pub fn words(text: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        let in_word = c.is_alphanumeric() || c == '_';
        match (start, in_word) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                words.push(Word { start: s, end: i });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push(Word { start: s, end: text.len() });
    }

    words
}

fn is_capitalized(text: &str, word: &Word) -> bool {
    text[word.start..word.end]
        .chars()
        .next()
        .is_some_and(char::is_uppercase)
}

/// Group the question's words into runs eligible for matching.
pub fn runs(text: &str, heuristic: SpanHeuristic) -> Vec<Vec<Word>> {
    let mut runs: Vec<Vec<Word>> = Vec::new();
    let mut current: Vec<Word> = Vec::new();

    for word in words(text) {
        let eligible = match heuristic {
            SpanHeuristic::Capitalized => is_capitalized(text, &word),
            SpanHeuristic::AllWords => true,
        };

        if !eligible {
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
            continue;
        }

        let joined = current.last().is_some_and(|prev| {
            let gap = &text[prev.end..word.start];
            !gap.is_empty() && gap.chars().all(char::is_whitespace)
        });
        if !joined && !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
        current.push(word);
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_texts(text: &str, heuristic: SpanHeuristic) -> Vec<String> {
        runs(text, heuristic)
            .into_iter()
            .map(|run| {
                let start = run[0].start;
                let end = run[run.len() - 1].end;
                text[start..end].to_string()
            })
            .collect()
    }

    #[test]
    fn test_capitalized_runs() {
        assert_eq!(
            run_texts("What is the connection between Dikshant and Rohen?", SpanHeuristic::Capitalized),
            vec!["What", "Dikshant", "Rohen"]
        );
    }

    #[test]
    fn test_multi_word_run() {
        assert_eq!(
            run_texts("Does Ram Sharme know Sita?", SpanHeuristic::Capitalized),
            vec!["Does Ram Sharme", "Sita"]
        );
    }

    #[test]
    fn test_punctuation_breaks_runs() {
        assert_eq!(
            run_texts("Rohan, Sita and Gita", SpanHeuristic::Capitalized),
            vec!["Rohan", "Sita", "Gita"]
        );
    }

    #[test]
    fn test_all_words() {
        assert_eq!(
            run_texts("who knows rohen?", SpanHeuristic::AllWords),
            vec!["who knows rohen"]
        );
    }

    #[test]
    fn test_unicode_words() {
        let found = words("Zoë knows Ådne");
        assert_eq!(found.len(), 3);
        assert_eq!(found[2].end, "Zoë knows Ådne".len());
    }
}
