use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Receives integer completion percentages from long-running operations.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn report(&self, percent: u8) {
        self(percent)
    }
}

impl ProgressSink for UnboundedSender<u8> {
    fn report(&self, percent: u8) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(percent);
    }
}

/// Cancellation and progress handles passed to async pipeline operations.
#[derive(Clone, Default)]
pub struct RunControl {
    pub cancel: CancellationToken,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress<S: ProgressSink + 'static>(mut self, sink: S) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn report(&self, percent: u8) {
        if let Some(sink) = &self.progress {
            sink.report(percent.min(100));
        }
    }
}

impl fmt::Debug for RunControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunControl")
            .field("cancelled", &self.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

type ThresholdAction = Box<dyn FnOnce() + Send>;

/// Progress sink that runs an action the first time a reported percentage
/// reaches `threshold`, optionally forwarding every report to another sink.
///
/// Typical use is cancelling a build half-way:
/// `ThresholdProgress::new(50, move || token.cancel())`.
pub struct ThresholdProgress {
    threshold: u8,
    action: Mutex<Option<ThresholdAction>>,
    forward: Option<Arc<dyn ProgressSink>>,
}

impl ThresholdProgress {
    pub fn new<A>(threshold: u8, action: A) -> Self
    where
        A: FnOnce() + Send + 'static,
    {
        Self {
            threshold,
            action: Mutex::new(Some(Box::new(action))),
            forward: None,
        }
    }

    pub fn forwarding_to<S: ProgressSink + 'static>(mut self, sink: S) -> Self {
        self.forward = Some(Arc::new(sink));
        self
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn has_fired(&self) -> bool {
        self.action
            .lock()
            .map(|action| action.is_none())
            .unwrap_or(true)
    }
}

impl ProgressSink for ThresholdProgress {
    fn report(&self, percent: u8) {
        if let Some(forward) = &self.forward {
            forward.report(percent);
        }
        if percent < self.threshold {
            return;
        }
        let action = match self.action.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(action) = action {
            action();
        }
    }
}

/// Integer percentage of `done` out of `total`; an empty total counts as done.
pub(crate) fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}
