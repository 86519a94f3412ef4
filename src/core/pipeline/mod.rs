//! Runtime pipeline construction and execution.
//!
//! A [`Scheme`] lists the steps a pipeline needs, each addressed by a
//! `(branch, tier)` [`Location`]. A [`PipelineManager`] binds those steps
//! against [`Provider`] instances and then drives data through the chain.

pub mod binding;
pub mod capability;
pub mod context;
pub mod explain;
pub mod lint;
pub mod location;
pub mod manager;
pub mod metadata;
pub mod outcome;
pub mod policy;
pub mod progress;
pub mod resolver;
pub mod scheme;

pub use binding::{Binding, Piece};
pub use capability::{Capability, Provider, TypeTag};
pub use context::ExecutionContext;
pub use explain::SchemeLayout;
pub use lint::{LintRegistry, LintResult, LintSeverity};
pub use location::{Location, LocationParseError};
pub use manager::PipelineManager;
pub use metadata::{MetadataParseError, StepMetadata};
pub use outcome::{
    CollectionReport, ItemFailure, StepBuildOutcome, StepInsertionResult,
};
pub use policy::{FnPolicy, LinearPolicy, LocationIndex, NextLocationPolicy};
pub use progress::{ProgressSink, RunControl, ThresholdProgress};
pub use resolver::{CapabilityResolver, IntrospectionResolver, RegistrationTable};
pub use scheme::{ParsedScheme, Scheme, SchemeDiagnostic};
pub use tokio_util::sync::CancellationToken;
