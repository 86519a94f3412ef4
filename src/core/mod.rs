pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

pub use config::{ConfigLoader, PipelineConfig};
pub use error::AppError;
pub use pipeline::{PipelineManager, Scheme, StepMetadata};
pub use types::*;
