use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    ConfigurationError,
    ParseError,
    ExecutionStateError,
    TypeMismatch,
    StructuralError,
    ValidationError,
    IoError,
    InternalError,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Error,
    Warning,
    Info,
    Debug,
}

/// Lifecycle of a pipeline manager instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ManagerState {
    #[default]
    Unbuilt,
    Building,
    Ready,
    Executing,
    Completed,
    Cancelled,
    /// The last execution stopped on an item error; the pipeline stays built.
    Failed,
}

/// Traversal stage of a single item moving through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProcessingStage {
    #[default]
    Unstarted,
    Processing,
    Completed,
    Cancelled,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Unstarted => write!(f, "unstarted"),
            ProcessingStage::Processing => write!(f, "processing"),
            ProcessingStage::Completed => write!(f, "completed"),
            ProcessingStage::Cancelled => write!(f, "cancelled"),
        }
    }
}
