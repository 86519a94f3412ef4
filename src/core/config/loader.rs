#![allow(clippy::result_large_err)]

use super::{ConfigValidator, PipelineConfig};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "tierflow.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/tierflow.toml).
    /// Environment variables override file values; a missing file means
    /// defaults plus env vars. The result is validated.
    pub fn load_from_workspace(workspace_path: &Path) -> Result<PipelineConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let mut config = Self::load_from_file(&config_path)?.unwrap_or_default();

        Self::apply_env_overrides(&mut config);
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load config from specific file path.
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<PipelineConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::with_source(
                ErrorCategory::IoError,
                format!("Failed to read config file {}", path.display()),
                Box::new(e),
            )
            .with_code("TF-IO-001")
        })?;

        let config: PipelineConfig = toml::from_str(&content).map_err(|e| {
            AppError::with_source(
                ErrorCategory::ConfigurationError,
                format!("Failed to parse config file {}", path.display()),
                Box::new(e),
            )
            .with_code("TF-CONFIG-003")
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration.
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(config: &mut PipelineConfig) {
        if let Ok(raw) = env::var("TIERFLOW_MAX_STEPS_PER_ITEM") {
            match raw.trim().parse::<usize>() {
                Ok(value) => config.execution.max_steps_per_item = value,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid TIERFLOW_MAX_STEPS_PER_ITEM"),
            }
        }

        if let Ok(raw) = env::var("TIERFLOW_CONTINUE_ON_ERROR") {
            match raw.trim().parse::<bool>() {
                Ok(value) => config.execution.continue_on_error = value,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid TIERFLOW_CONTINUE_ON_ERROR"),
            }
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "TIERFLOW_MAX_STEPS_PER_ITEM - Override the per-item step cap (default: 1024)",
            "TIERFLOW_CONTINUE_ON_ERROR - Keep executing a collection after an item fails (true/false, default: true)",
        ]
    }
}
