#![allow(clippy::result_large_err)]

use super::PipelineConfig;
use crate::core::error::AppError;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &PipelineConfig) -> Result<(), AppError> {
        if config.execution.max_steps_per_item == 0 {
            return Err(AppError::new(
                crate::core::types::ErrorCategory::ValidationError,
                "execution.max_steps_per_item must be at least 1",
            )
            .with_code("TF-CONFIG-003"));
        }

        Ok(())
    }
}
