use std::collections::HashMap;
use std::path::{Path, PathBuf};

use paperverify_common::config::SystemConfig;

use super::validation;

/// Complete engine configuration loaded from the config directory.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Parsed system.toml.
    pub system: SystemConfig,
    /// Prompt templates keyed by filename stem (e.g. "claim_extraction", "answer").
    pub prompts: HashMap<String, String>,
    pub config_dir: PathBuf,
}

/// Load all configuration from the given config directory.
///
/// Fails loudly with clear error messages if anything is misconfigured.
/// The server refuses to start on validation failure.
pub fn load_config(config_dir: &Path) -> Result<EngineConfig, ConfigError> {
    tracing::info!(config_dir = %config_dir.display(), "Loading configuration");

    // 1. Load and parse system.toml
    let system = load_system_config(&config_dir.join("system.toml"))?;

    // 2. Load prompt templates from config/prompts/*.md
    let prompts = load_prompts(&config_dir.join("prompts"))?;

    let config = EngineConfig {
        system,
        prompts,
        config_dir: config_dir.to_path_buf(),
    };

    // 3. Validate everything
    validation::validate(&config)?;

    tracing::info!(
        prompts = config.prompts.len(),
        metric = ?config.system.consistency.metric,
        "Configuration loaded successfully"
    );

    Ok(config)
}

fn load_system_config(path: &Path) -> Result<SystemConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_system_config(&content).map_err(|detail| ConfigError::Parse {
        path: path.to_path_buf(),
        detail,
    })
}

/// Parse system.toml contents.
pub fn parse_system_config(content: &str) -> Result<SystemConfig, String> {
    toml::from_str(content).map_err(|e| e.to_string())
}

fn load_prompts(prompts_dir: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let mut prompts = HashMap::new();

    if !prompts_dir.exists() {
        tracing::warn!(
            path = %prompts_dir.display(),
            "Prompts directory does not exist, no prompts loaded"
        );
        return Ok(prompts);
    }

    let entries = std::fs::read_dir(prompts_dir).map_err(|e| ConfigError::FileRead {
        path: prompts_dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::FileRead {
            path: prompts_dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();
        if path
            .extension()
            .is_some_and(|ext| ext == "md" || ext == "txt")
        {
            let Some(name) = path.file_stem().and_then(|n| n.to_str()) else {
                continue;
            };

            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileRead {
                path: path.clone(),
                source: e,
            })?;

            tracing::debug!(prompt = %name, "Loaded prompt template");
            prompts.insert(name.to_string(), content);
        }
    }

    Ok(prompts)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("Invalid component weights: {0}")]
    InvalidWeights(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<ConfigError> for paperverify_common::PaperVerifyError {
    fn from(e: ConfigError) -> Self {
        paperverify_common::PaperVerifyError::Config(e.to_string())
    }
}
