pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

use serde::{Deserialize, Serialize};

/// Pipeline configuration loaded from tierflow.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Execution limits and failure handling
    #[serde(default)]
    pub execution: ExecutionSettings,
}

/// Execution configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionSettings {
    /// Upper bound on steps one item may take before the traversal is
    /// aborted; guards against cyclic custom policies.
    #[serde(default = "default_max_steps_per_item")]
    pub max_steps_per_item: usize,

    /// Keep processing the remaining items of a collection after one fails
    #[serde(default = "default_continue_on_error")]
    pub continue_on_error: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_steps_per_item: default_max_steps_per_item(),
            continue_on_error: default_continue_on_error(),
        }
    }
}

fn default_max_steps_per_item() -> usize {
    1024
}

fn default_continue_on_error() -> bool {
    true
}
