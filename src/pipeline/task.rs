use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between a caller and a running export.
///
/// Cancelling is advisory: long-running work polls the flag at its yield points.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Return `true` once [`CancelToken::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scheduler hook invoked at yield points.
pub trait Yielder {
    /// Give other work on the host a chance to run.
    fn yield_now(&mut self);
}

/// Yields the current OS thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadYield;

impl Yielder for ThreadYield {
    fn yield_now(&mut self) {
        std::thread::yield_now();
    }
}

impl<F: FnMut()> Yielder for F {
    fn yield_now(&mut self) {
        self()
    }
}

/// Host services available to long-running operations.
pub trait TaskHost {
    /// Report completion of the current operation as a fraction in `[0, 1]`.
    fn report(&mut self, fraction: f64);
    /// Suspension point.
    fn yield_now(&mut self);
    /// Return `true` when the caller asked to stop.
    fn is_cancelled(&self) -> bool;
}

/// Host that ignores progress, never yields, and is never cancelled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHost;

impl TaskHost for NoopHost {
    fn report(&mut self, _fraction: f64) {}

    fn yield_now(&mut self) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/task.rs"]
mod tests;
