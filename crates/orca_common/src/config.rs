//! Configuration management for orca.
//!
//! Loads settings from a TOML file or uses defaults. Lookup order:
//! 1. Explicit path (`orcactl --config`)
//! 2. `$ORCA_CONFIG`
//! 3. `<config dir>/orca/config.toml` (`~/.config/orca/config.toml` on Linux)

use crate::llm::LlmConfig;
use crate::runner::RunnerConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the config path
pub const CONFIG_ENV: &str = "ORCA_CONFIG";

/// A selectable model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPreset {
    pub label: String,
    pub id: String,
}

impl ModelPreset {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

/// Result summary settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Ask the model for a plain-language conclusion after a run
    pub enabled: bool,
    /// Language of the conclusion
    pub language: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "English".to_string(),
        }
    }
}

fn default_models() -> Vec<ModelPreset> {
    vec![
        ModelPreset::new("DeepSeek-V3.2 (recommended)", "deepseek-ai/DeepSeek-V3.2"),
        ModelPreset::new("Qwen3-0.6B (fast)", "Qwen/Qwen3-0.6B"),
    ]
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrcaConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default = "default_models")]
    pub models: Vec<ModelPreset>,
}

impl Default for OrcaConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            runner: RunnerConfig::default(),
            summary: SummaryConfig::default(),
            models: default_models(),
        }
    }
}

impl OrcaConfig {
    /// Default config location for this user, if one can be determined
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        dirs::config_dir().map(|dir| dir.join("orca").join("config.toml"))
    }

    /// Load config from `path` (or the default location), or return defaults
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Self::default(),
        };

        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        Self::load_from_path(&path).unwrap_or_else(|e| {
            warn!("Config unusable, using defaults: {:#}", e);
            Self::default()
        })
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: OrcaConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the default config to `path`, creating parent directories
    pub fn save_default(path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(&Self::default())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved default config to {}", path.display());
        Ok(())
    }

    /// Resolve a model argument: a preset label, a preset id, or a raw id
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
            return self.llm.model.clone();
        };
        self.models
            .iter()
            .find(|m| m.id == requested || m.label.eq_ignore_ascii_case(requested))
            .map(|m| m.id.clone())
            .unwrap_or_else(|| requested.to_string())
    }
}
