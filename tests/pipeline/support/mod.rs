#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;
use tierflow::core::pipeline::{Capability, Location, Provider, Scheme, StepMetadata, TypeTag};

/// Integer arithmetic provider used across the pipeline tests.
pub struct Arithmetic;

impl Provider for Arithmetic {
    fn provider_type(&self) -> &str {
        "Arithmetic"
    }

    fn capabilities(self: Arc<Self>) -> Vec<Capability> {
        vec![
            Capability::unary("Square", |v: i16| i32::from(v) * i32::from(v)),
            Capability::unary("Squareroot", |v: i32| f64::from(v).sqrt() as i16),
            Capability::unary("Add3", |v: i16| v + 3),
            Capability::unary("Subtract3", |v: i16| v - 3),
        ]
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Provider whose only capabilities flip or double a value.
pub struct Signs;

impl Provider for Signs {
    fn provider_type(&self) -> &str {
        "Signs"
    }

    fn capabilities(self: Arc<Self>) -> Vec<Capability> {
        vec![
            Capability::unary("Negate", |v: i16| -v),
            Capability::unary("Double", |v: i16| v * 2),
        ]
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Advertises `Mix` with two parameters, which no step can bind.
pub struct Blender;

impl Provider for Blender {
    fn provider_type(&self) -> &str {
        "Blender"
    }

    fn capabilities(self: Arc<Self>) -> Vec<Capability> {
        vec![Capability::signature(
            "Mix",
            vec![TypeTag::of::<i16>(), TypeTag::of::<i16>()],
            TypeTag::of::<i16>(),
        )]
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub fn blender() -> Arc<dyn Provider> {
    Arc::new(Blender)
}

pub fn arithmetic() -> Arc<dyn Provider> {
    Arc::new(Arithmetic)
}

pub fn signs() -> Arc<dyn Provider> {
    Arc::new(Signs)
}

/// Square, Squareroot, Add3, Square, Squareroot, Subtract3 on branch 0.
/// Maps every small positive `x` back to `x`.
pub fn six_step_chain() -> Vec<StepMetadata> {
    vec![
        StepMetadata::typed::<i16, i32>("Arithmetic", "Square", Location::new(0, 0)),
        StepMetadata::typed::<i32, i16>("Arithmetic", "Squareroot", Location::new(0, 1)),
        StepMetadata::typed::<i16, i16>("Arithmetic", "Add3", Location::new(0, 2)),
        StepMetadata::typed::<i16, i32>("Arithmetic", "Square", Location::new(0, 3)),
        StepMetadata::typed::<i32, i16>("Arithmetic", "Squareroot", Location::new(0, 4)),
        StepMetadata::typed::<i16, i16>("Arithmetic", "Subtract3", Location::new(0, 5)),
    ]
}

pub fn six_step_scheme() -> Scheme {
    Scheme::from_steps(six_step_chain())
}

/// The six-step chain plus a `Blender::Mix` step on branch 1.
pub fn six_step_scheme_with_blender() -> Scheme {
    let mut scheme = six_step_scheme();
    scheme.try_add(StepMetadata::typed::<i16, i16>(
        "Blender",
        "Mix",
        Location::new(1, 0),
    ));
    scheme
}

/// The six-step chain in scheme text form.
pub const SIX_STEP_TEXT: &str = "\
# arithmetic round trip
{Type: Arithmetic; Method: Square; Input type name: i16; Output type name: i32; Location: (0,0)}
{Type: Arithmetic; Method: Squareroot; Input type name: i32; Output type name: i16; Location: (0,1)}
{Type: Arithmetic; Method: Add3; Input type name: i16; Output type name: i16; Location: (0,2)}

{Arithmetic; Square; i16; i32; (0,3)}
{Arithmetic; Squareroot; i32; i16; (0,4)}
{Arithmetic; Subtract3; i16; i16; (0,5)}
";
