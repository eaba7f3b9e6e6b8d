//! KGChat Core Library
//!
//! Natural-language to Cypher pipeline: entity catalog, fuzzy resolver,
//! intent classifier, query synthesizer, query sanitizer and orchestrator.
//! Network collaborators live in `kgchat-graph` and `kgchat-llm`.

pub mod catalog;
pub mod config;
pub mod error;
pub mod explain;
pub mod intent;
pub mod pipeline;
pub mod resolver;
pub mod sanitizer;
pub mod synthesis;

pub use catalog::{CatalogSnapshot, EntityCatalog, EntityRecord, EntitySource};
pub use config::PipelineConfig;
pub use error::{KgError, KgResult};
pub use explain::ResultExplainer;
pub use intent::{classify, ClassificationResult, Intent};
pub use pipeline::{Outcome, Pipeline};
pub use resolver::{FuzzyResolver, Resolution, ResolutionCandidate};
pub use sanitizer::{sanitize, sanitize_text, SanitizeFailure, SanitizedQuery};
pub use synthesis::{CandidateQuery, LanguageModel, QuerySynthesizer, SchemaDescription};
