//! Application configuration: TOML file plus environment overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kgchat_core::PipelineConfig;
use kgchat_graph::GraphConfig;
use kgchat_llm::OllamaConfig;
use serde::Deserialize;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "kgchat.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub graph: GraphConfig,
    pub ollama: OllamaConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load from `path`, or from `kgchat.toml` when present, then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.pipeline.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Override connection settings from the environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides: [(&str, &mut String); 6] = [
            ("NEO4J_URI", &mut self.graph.uri),
            ("NEO4J_USERNAME", &mut self.graph.user),
            ("NEO4J_PASSWORD", &mut self.graph.password),
            ("NEO4J_DATABASE", &mut self.graph.database),
            ("OLLAMA_URL", &mut self.ollama.url),
            ("OLLAMA_GEN_MODEL", &mut self.ollama.model),
        ];
        for (key, field) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
        }
    }
}
