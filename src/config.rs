use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ArborBotError, Result};

pub const DEFAULT_SQLITE_PATH: &str = "./data/arbor-bot.db";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub embedding_model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    pub sqlite_path: Option<String>,
    pub lancedb_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub top_k: Option<usize>,
    pub context_char_budget: Option<usize>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub llm_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub openai: Option<OpenAiConfig>,
    pub storage: Option<StorageConfig>,
    pub pipeline: Option<PipelineConfig>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ArborBotError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ArborBotError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn sqlite_path(&self) -> String {
        self.storage
            .as_ref()
            .and_then(|s| s.sqlite_path.as_deref())
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_SQLITE_PATH)
            .to_string()
    }

    pub fn lancedb_path(&self) -> Option<String> {
        self.storage
            .as_ref()
            .and_then(|s| s.lancedb_path.as_deref())
            .filter(|p| !p.trim().is_empty())
            .map(|p| p.to_string())
    }
}
