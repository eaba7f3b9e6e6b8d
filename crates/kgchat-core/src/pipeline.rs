//! Pipeline orchestrator.
//!
//! `START -> RESOLVE -> CLASSIFY -> {CHAT | SYNTHESIZE -> SANITIZE -> {READY | REJECTED}}`
//!
//! Every failure is folded into an [`Outcome`]; nothing escapes to the
//! caller as an error. The orchestrator never executes queries.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::catalog::{CatalogSnapshot, EntityCatalog};
use crate::config::{ChatConfig, PipelineConfig, SynthesisConfig};
use crate::error::KgError;
use crate::intent::{self, ChatKind, Intent};
use crate::resolver::{FuzzyResolver, Resolution};
use crate::sanitizer::{self, SanitizeFailure, SanitizedQuery};
use crate::synthesis::prompt::describe_entity_question;
use crate::synthesis::{LanguageModel, QuerySynthesizer, SchemaDescription};

/// Result of handling one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    ChatReply(String),
    ExecutableQuery(SanitizedQuery),
    Rejected(String),
}

impl Outcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

pub struct Pipeline {
    catalog: Arc<EntityCatalog>,
    resolver: FuzzyResolver,
    synthesizer: QuerySynthesizer,
    model: Arc<dyn LanguageModel>,
    schema: SchemaDescription,
    chat: ChatConfig,
    synthesis: SynthesisConfig,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<EntityCatalog>,
        model: Arc<dyn LanguageModel>,
        schema: SchemaDescription,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            catalog,
            resolver: FuzzyResolver::new(config.resolver.clone()),
            synthesizer: QuerySynthesizer::new(Arc::clone(&model), config.synthesis.clone()),
            model,
            schema,
            chat: config.chat.clone(),
            synthesis: config.synthesis.clone(),
        }
    }

    pub fn catalog(&self) -> &Arc<EntityCatalog> {
        &self.catalog
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    /// Handle one question end to end.
    ///
    /// Dropping the returned future cancels any in-flight model call.
    pub async fn handle(&self, question: &str) -> Outcome {
        let request_id = Uuid::new_v4();
        let span = info_span!("pipeline", %request_id);
        self.run(question).instrument(span).await
    }

    async fn run(&self, question: &str) -> Outcome {
        let question = question.trim();
        if question.is_empty() {
            return Outcome::Rejected("empty question".to_string());
        }

        let catalog = self.catalog.snapshot().await;

        let resolution = self.resolver.resolve(question, &catalog);
        if resolution.was_rewritten() {
            info!(resolved = %resolution.resolved_question, "Question rewritten");
        }

        let classification = intent::classify(&resolution.resolved_question, &catalog);
        info!(intent = ?classification.intent, confidence = ?classification.confidence, "Classified");

        let focus = match classification.intent {
            Intent::Chat { kind } => {
                return Outcome::ChatReply(self.chat_reply(question, kind).await);
            }
            Intent::Query { focus } => focus,
        };

        let prompt_question = match &focus {
            Some(name) => describe_entity_question(name),
            None => resolution.resolved_question.clone(),
        };
        let entities = entity_hints(&resolution, focus.as_deref());

        let candidate = match self
            .synthesizer
            .synthesize(&prompt_question, &self.schema, &entities)
            .await
        {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(error = %e, "Synthesis failed");
                return Outcome::Rejected("synthesis failure".to_string());
            }
        };

        let sanitized = sanitizer::sanitize(&candidate);
        self.review(sanitized, &resolution.resolved_question, &catalog)
    }

    /// Turn a sanitized query into a terminal outcome.
    fn review(&self, sanitized: SanitizedQuery, question: &str, catalog: &CatalogSnapshot) -> Outcome {
        match &sanitized.failure {
            Some(SanitizeFailure::Forbidden(keyword)) => {
                let err = KgError::ForbiddenOperation(keyword.clone());
                warn!(policy_violation = true, error = %err, query = %sanitized.text, "Refusing mutating query");
                return Outcome::Rejected(format!("forbidden operation: {}", keyword));
            }
            Some(SanitizeFailure::Invalid(reason)) => {
                let err = KgError::SanitizationRejected(reason.clone());
                warn!(error = %err, repairs = ?sanitized.repairs_applied, "Query failed validation");
                return Outcome::Rejected(format!("invalid query: {}", reason));
            }
            None => {}
        }

        let unknown = sanitizer::validate::unknown_entity_references(
            &sanitized.text,
            &self.schema.name_property,
            question,
            catalog,
        );
        if let Some(name) = unknown.first() {
            warn!(unknown = ?unknown, "Query references entities outside the question and catalog");
            return Outcome::Rejected(format!("unknown entity reference: {}", name));
        }

        info!(repairs = sanitized.repairs_applied.len(), "Query ready");
        Outcome::ExecutableQuery(sanitized)
    }

    async fn chat_reply(&self, question: &str, kind: ChatKind) -> String {
        if !self.chat.use_model {
            return kind.canned_reply().to_string();
        }

        let prompt = format!("You are a friendly chatbot. Answer this: {}", question);
        let timeout = self.synthesis.timeout();
        match tokio::time::timeout(timeout, self.model.complete(&prompt, timeout)).await {
            Ok(Ok(reply)) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(Ok(_)) => kind.canned_reply().to_string(),
            Ok(Err(e)) => {
                warn!(error = %e, "Chat reply failed, using canned reply");
                kind.canned_reply().to_string()
            }
            Err(_) => {
                warn!(?timeout, "Chat reply timed out, using canned reply");
                kind.canned_reply().to_string()
            }
        }
    }
}

/// Canonical names to list in the prompt, focus first, without repeats.
fn entity_hints(resolution: &Resolution, focus: Option<&str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in focus.into_iter().chain(resolution.mentioned.iter().map(String::as_str)) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
