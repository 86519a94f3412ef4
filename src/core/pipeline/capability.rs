use crate::core::pipeline::binding::Binding;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Runtime identity of a type flowing through the pipeline.
///
/// The name is what scheme text refers to; the `TypeId` is what the
/// binding checks at execution time.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A method-like callable advertised by a provider.
///
/// Providers list every capability they expose, including ones that take
/// more than one parameter; only single-parameter capabilities carry an
/// invoker and can become pipeline steps.
#[derive(Clone)]
pub struct Capability {
    name: String,
    parameters: Vec<TypeTag>,
    output: TypeTag,
    invoker: Option<Binding>,
}

impl Capability {
    /// Describe a bindable single-parameter capability.
    pub fn unary<TIn, TOut, F>(name: impl Into<String>, f: F) -> Self
    where
        TIn: Any + Send,
        TOut: Any + Send,
        F: Fn(TIn) -> TOut + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parameters: vec![TypeTag::of::<TIn>()],
            output: TypeTag::of::<TOut>(),
            invoker: Some(Binding::typed(f)),
        }
    }

    /// Describe a capability by signature only.
    pub fn signature(name: impl Into<String>, parameters: Vec<TypeTag>, output: TypeTag) -> Self {
        Self {
            name: name.into(),
            parameters,
            output,
            invoker: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[TypeTag] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn output(&self) -> TypeTag {
        self.output
    }

    pub(crate) fn invoker(&self) -> Option<&Binding> {
        self.invoker.as_ref()
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("output", &self.output)
            .field("invocable", &self.invoker.is_some())
            .finish()
    }
}

/// An object instance that may supply capabilities for scheme steps.
///
/// The provider type is the scheme bucket a provider claims during a build.
/// It defaults to the Rust type path; providers usually override it with a
/// shorter, stable name.
pub trait Provider: Send + Sync + 'static {
    fn provider_type(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Capabilities discoverable by the introspection resolver.
    fn capabilities(self: Arc<Self>) -> Vec<Capability> {
        Vec::new()
    }

    /// Type-erased handle used by statically registered capabilities.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
