//! Cypher synthesis through a language model.
//!
//! One bounded completion, plus at most one retry with a shortened prompt.
//! The synthesizer only guarantees non-empty text; structure is the
//! sanitizer's job.

pub mod prompt;
pub mod schema;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SynthesisConfig;
use crate::error::{KgError, KgResult};
pub use schema::{NodeSchema, PropertyKind, PropertySchema, SchemaDescription};

/// A text-completion model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt`. Fails with `ModelTimeout` or `ModelError`.
    async fn complete(&self, prompt: &str, timeout: Duration) -> KgResult<String>;
}

/// Unsanitized model output for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateQuery {
    pub text: String,
    pub source_question: String,
}

pub struct QuerySynthesizer {
    model: Arc<dyn LanguageModel>,
    config: SynthesisConfig,
}

impl QuerySynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, config: SynthesisConfig) -> Self {
        Self { model, config }
    }

    /// Generate a candidate query for `question`.
    ///
    /// `entities` are canonical names the question refers to; they are listed
    /// in the prompt so the model keeps their exact spelling.
    pub async fn synthesize(
        &self,
        question: &str,
        schema: &SchemaDescription,
        entities: &[String],
    ) -> KgResult<CandidateQuery> {
        let first = prompt::build_prompt(question, schema, entities);
        let err = match self.attempt(&first).await {
            Ok(text) => return Ok(self.candidate(text, question)),
            Err(e) => e,
        };

        if !self.config.retry {
            return Err(KgError::SynthesisFailure(err.to_string()));
        }

        warn!(error = %err, "Synthesis failed, retrying with shortened prompt");
        let short = prompt::build_short_prompt(question, schema, entities);
        match self.attempt(&short).await {
            Ok(text) => Ok(self.candidate(text, question)),
            Err(e) => Err(KgError::SynthesisFailure(e.to_string())),
        }
    }

    async fn attempt(&self, prompt: &str) -> KgResult<String> {
        let timeout = self.config.timeout();
        debug!(prompt_len = prompt.len(), ?timeout, "Requesting completion");

        let text = tokio::time::timeout(timeout, self.model.complete(prompt, timeout))
            .await
            .map_err(|_| KgError::ModelTimeout(timeout))??;

        if text.trim().is_empty() {
            return Err(KgError::model("empty completion"));
        }
        Ok(text)
    }

    fn candidate(&self, text: String, question: &str) -> CandidateQuery {
        info!(len = text.len(), "Candidate query generated");
        CandidateQuery {
            text,
            source_question: question.to_string(),
        }
    }
}
