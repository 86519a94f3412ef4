#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::pipeline::binding::Binding;
use crate::core::pipeline::context::ExecutionContext;
use crate::core::pipeline::location::Location;
use crate::core::pipeline::metadata::StepMetadata;
use crate::core::types::ErrorCategory;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Bound step stored at one location of a finalized pipeline.
#[derive(Debug, Clone)]
pub(crate) struct IndexedStep {
    pub(crate) metadata: StepMetadata,
    pub(crate) binding: Binding,
}

/// Location-addressed view of the steps bound by one build generation.
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    steps: BTreeMap<Location, IndexedStep>,
}

impl LocationIndex {
    /// Index bound steps by location. Two steps claiming one location make
    /// the traversal ambiguous and are rejected.
    pub(crate) fn from_steps<'a, I>(steps: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (&'a StepMetadata, &'a Binding)>,
    {
        let mut index: BTreeMap<Location, IndexedStep> = BTreeMap::new();
        for (metadata, binding) in steps {
            let location = metadata.location();
            if let Some(existing) = index.get(&location) {
                return Err(AppError::new(
                    ErrorCategory::ConfigurationError,
                    format!(
                        "steps {} and {} share location {}",
                        existing.metadata, metadata, location
                    ),
                )
                .with_code("TF-CONFIG-002")
                .with_context("location", location.to_string()));
            }
            index.insert(
                location,
                IndexedStep {
                    metadata: metadata.clone(),
                    binding: binding.clone(),
                },
            );
        }
        Ok(Self { steps: index })
    }

    pub fn contains(&self, location: Location) -> bool {
        self.steps.contains_key(&location)
    }

    pub fn get(&self, location: Location) -> Option<&StepMetadata> {
        self.steps.get(&location).map(|step| &step.metadata)
    }

    pub(crate) fn binding(&self, location: Location) -> Option<&Binding> {
        self.steps.get(&location).map(|step| &step.binding)
    }

    /// Occupied locations in `(branch, tier)` order.
    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.steps.keys().copied()
    }

    pub fn branches(&self) -> BTreeSet<i16> {
        self.steps.keys().map(Location::branch).collect()
    }

    pub fn tiers_on(&self, branch: i16) -> Vec<i16> {
        self.steps
            .keys()
            .filter(|location| location.branch() == branch)
            .map(Location::tier)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Chooses where the piece goes after the step at `ctx.location()` ran.
/// Returning [`Location::INVALID`] ends the traversal.
pub trait NextLocationPolicy: Send + Sync {
    fn next_location(&self, ctx: &ExecutionContext, index: &LocationIndex) -> Location;
}

/// Default topology: next tier on the same branch, while a step exists there.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearPolicy;

impl NextLocationPolicy for LinearPolicy {
    fn next_location(&self, ctx: &ExecutionContext, index: &LocationIndex) -> Location {
        let next = ctx.location().next_tier();
        if next.is_valid() && index.contains(next) {
            next
        } else {
            Location::INVALID
        }
    }
}

/// Policy backed by a closure, for branching or merging topologies.
pub struct FnPolicy<F> {
    f: F,
}

impl<F> FnPolicy<F>
where
    F: Fn(&ExecutionContext, &LocationIndex) -> Location + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> NextLocationPolicy for FnPolicy<F>
where
    F: Fn(&ExecutionContext, &LocationIndex) -> Location + Send + Sync,
{
    fn next_location(&self, ctx: &ExecutionContext, index: &LocationIndex) -> Location {
        (self.f)(ctx, index)
    }
}

impl<F> fmt::Debug for FnPolicy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnPolicy")
    }
}
