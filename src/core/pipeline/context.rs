use crate::core::pipeline::binding::Piece;
use crate::core::pipeline::location::Location;
use crate::core::types::ProcessingStage;
use std::any::Any;
use std::fmt;

/// Traversal state of one item travelling through a built pipeline.
///
/// A fresh context is created for every item, so concurrent executions on
/// the same manager never observe each other's position or data.
pub struct ExecutionContext {
    location: Location,
    stage: ProcessingStage,
    steps_taken: usize,
    piece: Option<Piece>,
}

impl ExecutionContext {
    pub(crate) fn start(piece: Piece) -> Self {
        Self {
            location: Location::ORIGIN,
            stage: ProcessingStage::Processing,
            steps_taken: 0,
            piece: Some(piece),
        }
    }

    /// Location of the step that produced the current piece.
    pub fn location(&self) -> Location {
        self.location
    }

    pub fn stage(&self) -> ProcessingStage {
        self.stage
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Output of the step that just ran.
    pub fn piece(&self) -> Option<&dyn Any> {
        self.piece.as_deref().map(|piece| piece as &dyn Any)
    }

    pub fn piece_as<T: Any>(&self) -> Option<&T> {
        self.piece().and_then(|piece| piece.downcast_ref::<T>())
    }

    pub(crate) fn take_piece(&mut self) -> Option<Piece> {
        self.piece.take()
    }

    pub(crate) fn record_step(&mut self, output: Piece) {
        self.piece = Some(output);
        self.steps_taken += 1;
    }

    pub(crate) fn move_to(&mut self, location: Location) {
        self.location = location;
    }

    pub(crate) fn finish(&mut self, stage: ProcessingStage) {
        self.stage = stage;
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("location", &self.location)
            .field("stage", &self.stage)
            .field("steps_taken", &self.steps_taken)
            .field("has_piece", &self.piece.is_some())
            .finish()
    }
}
