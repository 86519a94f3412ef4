#![allow(clippy::result_large_err)] // Resolvers surface structural failures as AppError so the build can abort with context.

use crate::core::error::AppError;
use crate::core::pipeline::binding::Binding;
use crate::core::pipeline::capability::{Provider, TypeTag};
use crate::core::pipeline::metadata::StepMetadata;
use crate::core::types::ErrorCategory;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Looks up the binding a provider offers for one scheme step.
///
/// `Ok(None)` means the provider has nothing matching; errors are reserved
/// for structural problems that must abort the whole build.
pub trait CapabilityResolver: Send + Sync {
    fn resolve(
        &self,
        provider: &Arc<dyn Provider>,
        metadata: &StepMetadata,
    ) -> Result<Option<Binding>, AppError>;
}

/// Default resolver: asks the provider to describe its capabilities and
/// binds the first one that matches the step structurally.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntrospectionResolver;

impl CapabilityResolver for IntrospectionResolver {
    fn resolve(
        &self,
        provider: &Arc<dyn Provider>,
        metadata: &StepMetadata,
    ) -> Result<Option<Binding>, AppError> {
        let declaring_type = provider.provider_type().to_string();
        for capability in Arc::clone(provider).capabilities() {
            if capability.name() != metadata.capability() {
                continue;
            }
            if capability.arity() != 1 {
                return Err(AppError::new(
                    ErrorCategory::StructuralError,
                    format!(
                        "capability {} on {} takes {} parameters; steps accept exactly one",
                        capability.name(),
                        declaring_type,
                        capability.arity()
                    ),
                )
                .with_code("TF-BIND-001")
                .with_context("provider_type", declaring_type.as_str())
                .with_context("step", metadata.to_string()));
            }
            if metadata.does_capability_match(&declaring_type, &capability) {
                return Binding::bind(&capability).map(Some);
            }
        }
        Ok(None)
    }
}

type Factory = dyn Fn(Arc<dyn Any + Send + Sync>) -> Option<Binding> + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    provider_type: String,
    capability: String,
    input_type: String,
    output_type: String,
}

impl EntryKey {
    fn of(metadata: &StepMetadata) -> Self {
        Self {
            provider_type: metadata.provider_type().to_string(),
            capability: metadata.capability().to_string(),
            input_type: metadata.input_type().to_string(),
            output_type: metadata.output_type().to_string(),
        }
    }
}

/// Builder for a [`RegistrationTable`].
pub struct RegistrationTableBuilder {
    entries: HashMap<EntryKey, Arc<Factory>>,
}

impl Default for RegistrationTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationTableBuilder {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `f` as capability `name` of providers of concrete type `P`
    /// that report `provider_type`.
    pub fn register<P, TIn, TOut, F>(
        &mut self,
        provider_type: impl Into<String>,
        name: impl Into<String>,
        f: F,
    ) -> &mut Self
    where
        P: Provider,
        TIn: Any + Send,
        TOut: Any + Send,
        F: Fn(&P, TIn) -> TOut + Send + Sync + 'static,
    {
        let key = EntryKey {
            provider_type: provider_type.into(),
            capability: name.into(),
            input_type: TypeTag::of::<TIn>().name().to_string(),
            output_type: TypeTag::of::<TOut>().name().to_string(),
        };
        if self.entries.contains_key(&key) {
            panic!(
                "duplicate capability registered: {}::{}",
                key.provider_type, key.capability
            );
        }
        let f = Arc::new(f);
        let factory = move |instance: Arc<dyn Any + Send + Sync>| -> Option<Binding> {
            let instance = instance.downcast::<P>().ok()?;
            let f = Arc::clone(&f);
            Some(Binding::typed(move |value: TIn| (*f)(&*instance, value)))
        };
        self.entries.insert(key, Arc::new(factory));
        self
    }

    pub fn build(self) -> RegistrationTable {
        RegistrationTable {
            inner: Arc::new(self.entries),
        }
    }
}

/// Statically registered capabilities; resolution never consults
/// [`Provider::capabilities`].
#[derive(Clone)]
pub struct RegistrationTable {
    inner: Arc<HashMap<EntryKey, Arc<Factory>>>,
}

impl Default for RegistrationTable {
    fn default() -> Self {
        RegistrationTableBuilder::new().build()
    }
}

impl RegistrationTable {
    pub fn builder() -> RegistrationTableBuilder {
        RegistrationTableBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn lookup(&self, metadata: &StepMetadata) -> Option<&Arc<Factory>> {
        self.inner.get(&EntryKey::of(metadata))
    }
}

impl CapabilityResolver for RegistrationTable {
    fn resolve(
        &self,
        provider: &Arc<dyn Provider>,
        metadata: &StepMetadata,
    ) -> Result<Option<Binding>, AppError> {
        if provider.provider_type() != metadata.provider_type() {
            return Ok(None);
        }
        Ok(self
            .lookup(metadata)
            .and_then(|factory| factory(Arc::clone(provider).into_any())))
    }
}
