use crate::core::error::AppError;
use crate::core::pipeline::metadata::StepMetadata;
use crate::core::types::ManagerState;
use serde::Serialize;
use std::fmt;

/// Result of trying to bind one scheme entry during a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StepBuildOutcome {
    Completed,
    MethodNotFound,
    ObjectNotRequired,
    Cancelled,
}

impl fmt::Display for StepBuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One record per attempted scheme entry, or one per provider whose type
/// had no bucket (`metadata` is then `None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepInsertionResult {
    pub provider_type: String,
    pub metadata: Option<StepMetadata>,
    pub outcome: StepBuildOutcome,
}

impl StepInsertionResult {
    pub fn for_step(metadata: StepMetadata, outcome: StepBuildOutcome) -> Self {
        Self {
            provider_type: metadata.provider_type().to_string(),
            metadata: Some(metadata),
            outcome,
        }
    }

    pub fn not_required(provider_type: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            metadata: None,
            outcome: StepBuildOutcome::ObjectNotRequired,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == StepBuildOutcome::Completed
    }
}

impl fmt::Display for StepInsertionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.metadata {
            Some(metadata) => write!(f, "{} {}", self.outcome, metadata),
            None => write!(f, "{} {}", self.outcome, self.provider_type),
        }
    }
}

/// Per-item failure captured during collection execution.
#[derive(Debug)]
pub struct ItemFailure {
    pub index: usize,
    pub error: AppError,
}

/// Aggregated outcome of executing a collection.
#[derive(Debug, Default)]
pub struct CollectionReport {
    pub completed: usize,
    pub failures: Vec<ItemFailure>,
    pub cancelled: usize,
    pub skipped: usize,
}

impl CollectionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.cancelled == 0 && self.skipped == 0
    }

    pub fn total(&self) -> usize {
        self.completed + self.failures.len() + self.cancelled + self.skipped
    }

    /// Manager state after the run: cancellation wins over item failures.
    pub fn final_state(&self) -> ManagerState {
        if self.cancelled > 0 {
            ManagerState::Cancelled
        } else if !self.failures.is_empty() {
            ManagerState::Failed
        } else {
            ManagerState::Completed
        }
    }
}

/// Count outcomes of a build, mostly for log summaries and tests.
pub fn count_outcomes(results: &[StepInsertionResult], outcome: StepBuildOutcome) -> usize {
    results.iter().filter(|result| result.outcome == outcome).count()
}
