#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::pipeline::capability::{Capability, TypeTag};
use crate::core::types::ErrorCategory;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased value travelling through a pipeline.
pub type Piece = Box<dyn Any + Send>;

type Invoker = dyn Fn(Piece) -> Result<Piece, Piece> + Send + Sync;

/// A bound, invocable pipeline step.
///
/// Internally typed to a concrete `(TIn, TOut)` pair and exposed through a
/// uniform `Piece -> Piece` call. Clones share the same callable.
#[derive(Clone)]
pub struct Binding {
    input: TypeTag,
    output: TypeTag,
    invoke: Arc<Invoker>,
}

impl Binding {
    /// Wrap a typed closure. The returned piece is handed back unchanged
    /// when its runtime type is not `TIn`.
    pub fn typed<TIn, TOut, F>(f: F) -> Self
    where
        TIn: Any + Send,
        TOut: Any + Send,
        F: Fn(TIn) -> TOut + Send + Sync + 'static,
    {
        let invoke = move |piece: Piece| -> Result<Piece, Piece> {
            match piece.downcast::<TIn>() {
                Ok(value) => Ok(Box::new(f(*value)) as Piece),
                Err(piece) => Err(piece),
            }
        };
        Self {
            input: TypeTag::of::<TIn>(),
            output: TypeTag::of::<TOut>(),
            invoke: Arc::new(invoke),
        }
    }

    /// Bind a provider capability. Only single-parameter capabilities can be
    /// bound.
    pub fn bind(capability: &Capability) -> Result<Binding, AppError> {
        if capability.arity() != 1 {
            return Err(AppError::new(
                ErrorCategory::StructuralError,
                format!(
                    "capability {} takes {} parameters; steps accept exactly one",
                    capability.name(),
                    capability.arity()
                ),
            )
            .with_code("TF-BIND-001"));
        }
        capability.invoker().cloned().ok_or_else(|| {
            AppError::new(
                ErrorCategory::StructuralError,
                format!("capability {} has no invoker", capability.name()),
            )
            .with_code("TF-BIND-001")
        })
    }

    pub fn input(&self) -> TypeTag {
        self.input
    }

    pub fn output(&self) -> TypeTag {
        self.output
    }

    /// Run the step on a piece.
    pub fn execute(&self, piece: Piece) -> Result<Piece, AppError> {
        (self.invoke)(piece).map_err(|_| {
            AppError::new(
                ErrorCategory::TypeMismatch,
                format!(
                    "step expects input of type {} but received a value of another type",
                    self.input.name()
                ),
            )
            .with_code("TF-EXEC-003")
        })
    }

    pub(crate) fn same_callable(&self, other: &Binding) -> bool {
        Arc::ptr_eq(&self.invoke, &other.invoke)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binding<{}, {}>", self.input, self.output)
    }
}
