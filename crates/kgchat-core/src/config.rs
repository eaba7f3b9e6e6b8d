//! Pipeline configuration.
//!
//! Every section has defaults, so an empty TOML document is a valid config.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{KgError, KgResult};

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub resolver: ResolverConfig,
    pub synthesis: SynthesisConfig,
    pub catalog: CatalogConfig,
    pub chat: ChatConfig,
}

/// How the resolver finds candidate name spans in a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanHeuristic {
    /// Runs of capitalized words.
    Capitalized,
    /// Every word, regardless of case.
    AllWords,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Minimum normalized similarity for a match to be accepted.
    pub threshold: f64,
    pub span_heuristic: SpanHeuristic,
    /// Longest multi-word window tried inside a span run.
    pub max_span_words: usize,
    /// Spans shorter than this are never fuzzy-matched.
    pub min_span_chars: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            span_heuristic: SpanHeuristic::Capitalized,
            max_span_words: 3,
            min_span_chars: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub timeout_secs: u64,
    /// Retry once with the shortened prompt after a failed completion.
    pub retry: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            retry: true,
        }
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Age after which a snapshot is refreshed on the next read.
    pub staleness_secs: u64,
    /// Background refresh period; 0 disables the background task.
    pub refresh_interval_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            staleness_secs: 300,
            refresh_interval_secs: 0,
        }
    }
}

impl CatalogConfig {
    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Generate chat replies with the language model instead of canned text.
    pub use_model: bool,
}

impl PipelineConfig {
    /// Parse a configuration from a TOML document and validate it.
    pub fn from_toml_str(source: &str) -> KgResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| KgError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> KgResult<()> {
        if !(0.0..=1.0).contains(&self.resolver.threshold) {
            return Err(KgError::config(format!(
                "resolver.threshold must be within [0, 1], got {}",
                self.resolver.threshold
            )));
        }
        if self.resolver.max_span_words == 0 {
            return Err(KgError::config("resolver.max_span_words must be at least 1"));
        }
        if self.synthesis.timeout_secs == 0 {
            return Err(KgError::config("synthesis.timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}
