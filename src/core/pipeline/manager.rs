#![allow(clippy::result_large_err)] // Manager operations return AppError directly so callers keep category, code and context.

use crate::core::config::PipelineConfig;
use crate::core::error::AppError;
use crate::core::pipeline::binding::{Binding, Piece};
use crate::core::pipeline::capability::Provider;
use crate::core::pipeline::context::ExecutionContext;
use crate::core::pipeline::metadata::StepMetadata;
use crate::core::pipeline::outcome::{
    count_outcomes, CollectionReport, ItemFailure, StepBuildOutcome, StepInsertionResult,
};
use crate::core::pipeline::policy::{LinearPolicy, LocationIndex, NextLocationPolicy};
use crate::core::pipeline::progress::{percent_of, RunControl};
use crate::core::pipeline::resolver::{CapabilityResolver, IntrospectionResolver};
use crate::core::pipeline::scheme::Scheme;
use crate::core::pipeline::location::Location;
use crate::core::types::{ErrorCategory, ManagerState, ProcessingStage};
use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Concrete Rust type behind a provider instance. Two instances of one
/// type are the same provider as far as a build generation is concerned.
fn runtime_type(provider: &Arc<dyn Provider>) -> TypeId {
    let any = Arc::clone(provider).into_any();
    (*any).type_id()
}

/// Builds a step chain from a scheme and provider instances, then drives
/// data through it.
///
/// Building needs `&mut self`; executing only needs `&self`, so a built
/// manager can be shared behind an `Arc` and executed concurrently. Each
/// execution carries its own [`ExecutionContext`].
pub struct PipelineManager {
    template: Option<Scheme>,
    scheme: Option<Scheme>,
    steps: IndexMap<StepMetadata, Binding>,
    unused: HashMap<StepMetadata, Binding>,
    index: Mutex<Option<Arc<LocationIndex>>>,
    output: Mutex<VecDeque<Piece>>,
    state: Mutex<ManagerState>,
    resolver: Arc<dyn CapabilityResolver>,
    policy: Arc<dyn NextLocationPolicy>,
    config: PipelineConfig,
}

impl Default for PipelineManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineManager {
    pub fn new() -> Self {
        Self {
            template: None,
            scheme: None,
            steps: IndexMap::new(),
            unused: HashMap::new(),
            index: Mutex::new(None),
            output: Mutex::new(VecDeque::new()),
            state: Mutex::new(ManagerState::Unbuilt),
            resolver: Arc::new(IntrospectionResolver),
            policy: Arc::new(LinearPolicy),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_scheme(mut self, scheme: &Scheme) -> Self {
        self.insert_scheme(scheme);
        self
    }

    pub fn with_resolver<R: CapabilityResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_policy<P: NextLocationPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> ManagerState {
        *lock(&self.state)
    }

    fn set_state(&self, state: ManagerState) {
        *lock(&self.state) = state;
    }

    /// Replace the working scheme with a copy of `scheme`. The caller's
    /// scheme is never consumed.
    pub fn insert_scheme(&mut self, scheme: &Scheme) {
        self.template = Some(scheme.clone());
        self.scheme = Some(scheme.clone());
        self.invalidate();
        tracing::debug!(steps = scheme.len(), "Inserted pipeline scheme");
    }

    fn invalidate(&mut self) {
        *self
            .index
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Start a build generation: restore the working scheme from the last
    /// inserted one and drop (or, when rebuilding, cache) the bound steps.
    fn begin_generation(&mut self, cache_current: bool) -> Result<usize, AppError> {
        let template = self.template.as_ref().ok_or_else(|| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                "Cannot build a pipeline without a scheme; insert one before or with the build call",
            )
            .with_code("TF-CONFIG-001")
        })?;
        let total = template.len();
        self.scheme = Some(template.clone());

        let previous = std::mem::take(&mut self.steps);
        if cache_current {
            for (metadata, binding) in previous {
                self.unused.entry(metadata).or_insert(binding);
            }
        }
        self.invalidate();
        self.set_state(ManagerState::Building);
        Ok(total)
    }

    fn finish_generation(&mut self, results: &[StepInsertionResult], cancelled: bool) {
        let state = if cancelled {
            ManagerState::Cancelled
        } else if self.steps.is_empty() {
            ManagerState::Unbuilt
        } else {
            ManagerState::Ready
        };
        self.set_state(state);
        tracing::info!(
            bound = count_outcomes(results, StepBuildOutcome::Completed),
            missing = count_outcomes(results, StepBuildOutcome::MethodNotFound),
            not_required = count_outcomes(results, StepBuildOutcome::ObjectNotRequired),
            cancelled = count_outcomes(results, StepBuildOutcome::Cancelled),
            cached = self.unused.len(),
            "Pipeline build finished"
        );
    }

    fn claim(&mut self, provider_type: &str) -> Option<Vec<StepMetadata>> {
        self.scheme
            .as_mut()
            .and_then(|scheme| scheme.try_remove(provider_type))
    }

    fn bind_entry(
        &mut self,
        provider: &Arc<dyn Provider>,
        metadata: StepMetadata,
        use_cache: bool,
    ) -> Result<StepInsertionResult, AppError> {
        let binding = match use_cache.then(|| self.unused.remove(&metadata)).flatten() {
            Some(cached) => {
                tracing::debug!(step = %metadata, "Reusing cached step");
                Some(cached)
            }
            None => self.resolver.resolve(provider, &metadata)?,
        };
        match binding {
            Some(binding) => {
                tracing::debug!(step = %metadata, "Bound pipeline step");
                self.steps.insert(metadata.clone(), binding);
                Ok(StepInsertionResult::for_step(
                    metadata,
                    StepBuildOutcome::Completed,
                ))
            }
            None => {
                tracing::debug!(step = %metadata, "No capability matches step");
                // Unsatisfied entries stay pending for later providers and missing_steps().
                if let Some(scheme) = self.scheme.as_mut() {
                    scheme.try_add(metadata.clone());
                }
                Ok(StepInsertionResult::for_step(
                    metadata,
                    StepBuildOutcome::MethodNotFound,
                ))
            }
        }
    }

    /// Drop a generation that failed partway. Entries bound so far are
    /// discarded (or cached when rebuilding) and the working scheme is
    /// restored, so nothing from the failed generation can be executed.
    fn abort_generation(&mut self, use_cache: bool, error: &AppError) {
        let partial = std::mem::take(&mut self.steps);
        if use_cache {
            for (metadata, binding) in partial {
                self.unused.entry(metadata).or_insert(binding);
            }
        }
        self.scheme = self.template.clone();
        self.invalidate();
        self.set_state(ManagerState::Unbuilt);
        tracing::warn!(code = %error.code, "Pipeline build aborted: {}", error.message);
    }

    fn run_generation(
        &mut self,
        providers: &[Arc<dyn Provider>],
        use_cache: bool,
    ) -> Result<Vec<StepInsertionResult>, AppError> {
        self.begin_generation(use_cache)?;
        let mut results = Vec::new();
        let mut seen = HashSet::new();
        for provider in providers {
            let provider_type = provider.provider_type().to_string();
            if !seen.insert(runtime_type(provider)) {
                results.push(StepInsertionResult::not_required(provider_type));
                continue;
            }
            match self.claim(&provider_type) {
                Some(entries) => {
                    for metadata in entries {
                        match self.bind_entry(provider, metadata, use_cache) {
                            Ok(result) => results.push(result),
                            Err(error) => {
                                self.abort_generation(use_cache, &error);
                                return Err(error);
                            }
                        }
                    }
                }
                None => results.push(StepInsertionResult::not_required(provider_type)),
            }
        }
        self.finish_generation(&results, false);
        Ok(results)
    }

    async fn run_generation_async(
        &mut self,
        providers: &[Arc<dyn Provider>],
        use_cache: bool,
        control: &RunControl,
    ) -> Result<Vec<StepInsertionResult>, AppError> {
        let total = self.begin_generation(use_cache)?;
        tokio::task::yield_now().await;

        let mut results = Vec::new();
        let mut processed = 0usize;
        let mut cancelled = false;
        let mut seen = HashSet::new();
        for provider in providers {
            let provider_type = provider.provider_type().to_string();
            if !seen.insert(runtime_type(provider)) {
                results.push(StepInsertionResult::not_required(provider_type));
                continue;
            }
            if cancelled {
                // Unreached buckets stay pending in the scheme.
                if let Some(entries) = self.scheme.as_ref().and_then(|s| s.try_get(&provider_type)) {
                    results.extend(entries.iter().cloned().map(|metadata| {
                        StepInsertionResult::for_step(metadata, StepBuildOutcome::Cancelled)
                    }));
                }
                continue;
            }
            let Some(entries) = self.claim(&provider_type) else {
                results.push(StepInsertionResult::not_required(provider_type));
                continue;
            };
            let mut pending = entries.into_iter();
            while let Some(metadata) = pending.next() {
                tokio::task::yield_now().await;
                if control.is_cancelled() {
                    cancelled = true;
                    let remaining: Vec<StepMetadata> =
                        std::iter::once(metadata).chain(pending.by_ref()).collect();
                    results.extend(remaining.iter().cloned().map(|metadata| {
                        StepInsertionResult::for_step(metadata, StepBuildOutcome::Cancelled)
                    }));
                    if let Some(scheme) = self.scheme.as_mut() {
                        scheme.try_add_all(remaining);
                    }
                    break;
                }
                match self.bind_entry(provider, metadata, use_cache) {
                    Ok(result) => results.push(result),
                    Err(error) => {
                        self.abort_generation(use_cache, &error);
                        control.report(100);
                        return Err(error);
                    }
                }
                processed += 1;
                control.report(percent_of(processed, total).min(99));
            }
        }
        if cancelled {
            tracing::warn!(processed, total, "Pipeline build cancelled");
        }
        self.finish_generation(&results, cancelled);
        control.report(100);
        Ok(results)
    }

    /// Bind the working scheme against `providers`, in call order.
    ///
    /// Each provider claims the bucket of its provider type; a provider
    /// whose type has no (remaining) bucket yields one `ObjectNotRequired`.
    pub fn build(
        &mut self,
        providers: &[Arc<dyn Provider>],
    ) -> Result<Vec<StepInsertionResult>, AppError> {
        self.run_generation(providers, false)
    }

    pub fn build_with_scheme(
        &mut self,
        scheme: &Scheme,
        providers: &[Arc<dyn Provider>],
    ) -> Result<Vec<StepInsertionResult>, AppError> {
        self.insert_scheme(scheme);
        self.build(providers)
    }

    /// Cancellable build. Entries not attempted when cancellation is seen
    /// are reported `Cancelled`; progress always ends at 100.
    pub async fn build_async(
        &mut self,
        providers: &[Arc<dyn Provider>],
        control: RunControl,
    ) -> Result<Vec<StepInsertionResult>, AppError> {
        self.run_generation_async(providers, false, &control).await
    }

    /// Build again, reusing steps bound by earlier generations when their
    /// metadata is requested unchanged.
    pub fn rebuild(
        &mut self,
        scheme: Option<&Scheme>,
        providers: &[Arc<dyn Provider>],
    ) -> Result<Vec<StepInsertionResult>, AppError> {
        if let Some(scheme) = scheme {
            self.insert_scheme(scheme);
        }
        self.run_generation(providers, true)
    }

    pub async fn rebuild_async(
        &mut self,
        scheme: Option<&Scheme>,
        providers: &[Arc<dyn Provider>],
        control: RunControl,
    ) -> Result<Vec<StepInsertionResult>, AppError> {
        if let Some(scheme) = scheme {
            self.insert_scheme(scheme);
        }
        self.run_generation_async(providers, true, &control).await
    }

    /// Bind a closure directly to the first entry of the `provider_type`
    /// bucket that matches `name` and the closure's signature.
    pub fn insert_step<TIn, TOut, F>(
        &mut self,
        provider_type: &str,
        name: &str,
        f: F,
    ) -> StepInsertionResult
    where
        TIn: Any + Send,
        TOut: Any + Send,
        F: Fn(TIn) -> TOut + Send + Sync + 'static,
    {
        let matched = self
            .scheme
            .as_ref()
            .and_then(|scheme| scheme.try_get(provider_type))
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|metadata| metadata.matches_signature::<TIn, TOut>(provider_type, name))
                    .cloned()
            });
        let Some(metadata) = matched else {
            return StepInsertionResult::not_required(provider_type);
        };
        if let Some(scheme) = self.scheme.as_mut() {
            scheme.remove_step(&metadata);
        }
        tracing::debug!(step = %metadata, "Inserted step directly");
        self.steps.insert(metadata.clone(), Binding::typed(f));
        self.invalidate();
        self.set_state(ManagerState::Ready);
        StepInsertionResult::for_step(metadata, StepBuildOutcome::Completed)
    }

    fn not_built_error(&self) -> AppError {
        let message = match &self.scheme {
            Some(scheme) if !scheme.is_empty() => "Pipeline has not been built",
            _ => "Pipeline has not been built and no scheme has been inserted",
        };
        AppError::new(ErrorCategory::ExecutionStateError, message).with_code("TF-EXEC-001")
    }

    /// Location index of the current generation, built on first use.
    fn finalized(&self) -> Result<Arc<LocationIndex>, AppError> {
        if self.steps.is_empty() {
            return Err(self.not_built_error());
        }
        let mut slot = lock(&self.index);
        if let Some(index) = slot.as_ref() {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(LocationIndex::from_steps(self.steps.iter())?);
        lock(&self.output).clear();
        *slot = Some(Arc::clone(&index));
        tracing::debug!(steps = index.len(), "Finalized pipeline");
        Ok(index)
    }

    /// Drive one piece from `(0,0)` until the policy ends the traversal or
    /// `control` is cancelled. Completed pieces are queued as output.
    fn traverse(
        &self,
        index: &LocationIndex,
        piece: Piece,
        control: Option<&RunControl>,
    ) -> Result<ProcessingStage, AppError> {
        let cap = self.config.execution.max_steps_per_item;
        let mut ctx = ExecutionContext::start(piece);
        while ctx.stage() != ProcessingStage::Completed
            && !control.is_some_and(RunControl::is_cancelled)
        {
            let location = ctx.location();
            let binding = index.binding(location).ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ExecutionStateError,
                    format!("no bound step at location {}", location),
                )
                .with_code("TF-EXEC-002")
                .with_context("location", location.to_string())
            })?;
            if ctx.steps_taken() >= cap {
                return Err(AppError::new(
                    ErrorCategory::ExecutionStateError,
                    format!("item exceeded {} steps without completing", cap),
                )
                .with_code("TF-EXEC-004")
                .with_context("location", location.to_string()));
            }
            let input = ctx.take_piece().ok_or_else(|| {
                AppError::new(ErrorCategory::InternalError, "execution context lost its piece")
            })?;
            let output = binding
                .execute(input)
                .map_err(|err| err.with_context("location", location.to_string()))?;
            ctx.record_step(output);

            let next = self.policy.next_location(&ctx, index);
            if next == Location::INVALID {
                ctx.finish(ProcessingStage::Completed);
            } else {
                ctx.move_to(next);
            }
            if let Some(control) = control {
                control.report(percent_of(ctx.steps_taken(), index.len()).min(99));
            }
        }

        if ctx.stage() != ProcessingStage::Completed {
            ctx.finish(ProcessingStage::Cancelled);
            return Ok(ProcessingStage::Cancelled);
        }
        if let Some(piece) = ctx.take_piece() {
            lock(&self.output).push_back(piece);
        }
        Ok(ProcessingStage::Completed)
    }

    /// Run one item through the pipeline and queue the result.
    pub fn execute_on_data<T: Any + Send>(&self, data: T) -> Result<(), AppError> {
        let index = self.finalized()?;
        self.set_state(ManagerState::Executing);
        let outcome = self.traverse(&index, Box::new(data), None);
        self.set_state(match outcome {
            Ok(_) => ManagerState::Completed,
            Err(_) => ManagerState::Failed,
        });
        outcome.map(|_| ())
    }

    /// Cancellable single-item execution. Returns the stage the item ended
    /// in; a cancelled item produces no output.
    pub async fn execute_on_data_async<T: Any + Send>(
        &self,
        data: T,
        control: RunControl,
    ) -> Result<ProcessingStage, AppError> {
        tokio::task::yield_now().await;
        let index = self.finalized()?;
        if control.is_cancelled() {
            self.set_state(ManagerState::Cancelled);
            control.report(100);
            return Ok(ProcessingStage::Cancelled);
        }
        self.set_state(ManagerState::Executing);
        let outcome = self.traverse(&index, Box::new(data), Some(&control));
        self.set_state(match outcome {
            Ok(ProcessingStage::Cancelled) => ManagerState::Cancelled,
            Ok(_) => ManagerState::Completed,
            Err(_) => ManagerState::Failed,
        });
        if let Ok(ProcessingStage::Cancelled) = outcome {
            tracing::warn!("Pipeline execution cancelled");
        }
        control.report(100);
        outcome
    }

    fn record_failure(report: &mut CollectionReport, index: usize, error: AppError) {
        tracing::warn!(item = index, code = %error.code, "Pipeline item failed: {}", error.message);
        report.failures.push(ItemFailure { index, error });
    }

    /// Execute every item independently, each starting at `(0,0)`.
    ///
    /// Item failures are collected in the report; with
    /// `continue_on_error = false` the first failure stops the run and the
    /// remaining items are counted as skipped.
    pub fn execute_on_collection<T, I>(&self, items: I) -> Result<CollectionReport, AppError>
    where
        T: Any + Send,
        I: IntoIterator<Item = T>,
    {
        let index = self.finalized()?;
        let items: Vec<T> = items.into_iter().collect();
        let total = items.len();
        let mut report = CollectionReport::default();
        self.set_state(ManagerState::Executing);
        for (position, item) in items.into_iter().enumerate() {
            match self.traverse(&index, Box::new(item), None) {
                Ok(_) => report.completed += 1,
                Err(error) => {
                    Self::record_failure(&mut report, position, error);
                    if !self.config.execution.continue_on_error {
                        report.skipped = total - position - 1;
                        break;
                    }
                }
            }
        }
        self.set_state(report.final_state());
        Ok(report)
    }

    /// Cancellable collection execution; yields before each item and
    /// counts unprocessed items as cancelled once cancellation is seen.
    pub async fn execute_on_collection_async<T, I>(
        &self,
        items: I,
        control: RunControl,
    ) -> Result<CollectionReport, AppError>
    where
        T: Any + Send,
        I: IntoIterator<Item = T>,
    {
        let index = self.finalized()?;
        let items: Vec<T> = items.into_iter().collect();
        let total = items.len();
        let mut report = CollectionReport::default();
        self.set_state(ManagerState::Executing);
        for (position, item) in items.into_iter().enumerate() {
            tokio::task::yield_now().await;
            if control.is_cancelled() {
                report.cancelled = total - position;
                break;
            }
            match self.traverse(&index, Box::new(item), Some(&control)) {
                Ok(ProcessingStage::Cancelled) => {
                    report.cancelled = total - position;
                    break;
                }
                Ok(_) => report.completed += 1,
                Err(error) => {
                    Self::record_failure(&mut report, position, error);
                    if !self.config.execution.continue_on_error {
                        report.skipped = total - position - 1;
                        break;
                    }
                }
            }
            control.report(percent_of(position + 1, total).min(99));
        }
        if report.cancelled > 0 {
            tracing::warn!(
                completed = report.completed,
                cancelled = report.cancelled,
                "Collection execution cancelled"
            );
        }
        self.set_state(report.final_state());
        control.report(100);
        Ok(report)
    }

    /// Queued outputs of type `T`, in completion order.
    pub fn results<T: Any + Clone>(&self) -> Vec<T> {
        lock(&self.output)
            .iter()
            .filter_map(|piece| piece.downcast_ref::<T>().cloned())
            .collect()
    }

    pub fn clear_results(&self) {
        lock(&self.output).clear();
    }

    pub fn output_len(&self) -> usize {
        lock(&self.output).len()
    }

    /// Scheme entries no provider or inserted step has claimed.
    pub fn missing_steps(&self) -> Vec<StepMetadata> {
        self.scheme
            .as_ref()
            .map(|scheme| scheme.steps().cloned().collect())
            .unwrap_or_default()
    }

    /// Every scheme entry is bound and at least one step exists.
    pub fn is_ready(&self) -> bool {
        self.scheme.as_ref().is_some_and(Scheme::is_empty) && !self.steps.is_empty()
    }

    pub fn bound_steps(&self) -> impl Iterator<Item = &StepMetadata> {
        self.steps.keys()
    }

    pub fn cached_step_count(&self) -> usize {
        self.unused.len()
    }

    #[cfg(test)]
    pub(crate) fn binding_for(&self, metadata: &StepMetadata) -> Option<&Binding> {
        self.steps.get(metadata)
    }
}

impl fmt::Debug for PipelineManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineManager")
            .field("state", &self.state())
            .field("bound", &self.steps.len())
            .field("missing", &self.scheme.as_ref().map_or(0, Scheme::len))
            .field("cached", &self.unused.len())
            .field("output", &self.output_len())
            .finish()
    }
}
