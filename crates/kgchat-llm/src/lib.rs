//! # KGChat LLM
//!
//! Ollama-backed [`LanguageModel`](kgchat_core::LanguageModel) for the KGChat pipeline.

pub mod ollama;

pub use ollama::{OllamaClient, OllamaConfig, DEFAULT_GEN_MODEL, DEFAULT_OLLAMA_URL};
