//! Resolution models.

use serde::Serialize;

/// One fuzzy match considered for a span of the question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionCandidate {
    pub raw_token: String,
    pub matched_name: String,
    /// Normalized similarity in `[0, 1]`.
    pub similarity_score: f64,
    /// Raw edit distance, used to break score ties.
    pub edit_distance: usize,
    pub accepted: bool,
}

/// Output of the resolver.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Resolution {
    pub resolved_question: String,
    pub candidates: Vec<ResolutionCandidate>,
    /// Canonical names the resolved question refers to, in order of appearance.
    pub mentioned: Vec<String>,
}

impl Resolution {
    /// The question passed through untouched.
    pub fn unchanged(question: &str) -> Self {
        Self {
            resolved_question: question.to_string(),
            candidates: Vec::new(),
            mentioned: Vec::new(),
        }
    }

    pub fn accepted(&self) -> impl Iterator<Item = &ResolutionCandidate> {
        self.candidates.iter().filter(|c| c.accepted)
    }

    pub fn rejected(&self) -> impl Iterator<Item = &ResolutionCandidate> {
        self.candidates.iter().filter(|c| !c.accepted)
    }

    pub fn was_rewritten(&self) -> bool {
        self.accepted().any(|c| c.raw_token != c.matched_name)
    }
}
