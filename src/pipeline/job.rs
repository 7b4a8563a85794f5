use crate::pipeline::progress::{ExportProgress, ExportStage, ProgressSink};
use crate::pipeline::task::{CancelToken, TaskHost, ThreadYield, Yielder};

/// Caller-side handles for one export run: cancellation, progress and scheduling.
pub struct ExportJob<'a> {
    cancel: CancelToken,
    progress: &'a mut dyn ProgressSink,
    yielder: Box<dyn Yielder + 'a>,
}

impl<'a> ExportJob<'a> {
    /// Job polling `cancel` and reporting into `progress`; yields the OS thread between stages.
    pub fn new(cancel: CancelToken, progress: &'a mut dyn ProgressSink) -> Self {
        Self {
            cancel,
            progress,
            yielder: Box::new(ThreadYield),
        }
    }

    /// Replace the scheduler hook invoked at suspension points.
    pub fn with_yielder(mut self, yielder: impl Yielder + 'a) -> Self {
        self.yielder = Box::new(yielder);
        self
    }

    /// Token this job polls.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Return `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn emit(&mut self, stage: ExportStage, fraction: f64, message: impl Into<String>) {
        self.progress
            .send(ExportProgress::new(stage, fraction, message));
    }

    /// Stage boundary: announce `stage`, yield, then poll cancellation.
    pub(crate) fn enter(&mut self, stage: ExportStage) -> bool {
        tracing::info!(stage = %stage, "export stage");
        self.emit(stage, 0.0, format!("{stage} started"));
        self.yielder.yield_now();
        !self.cancel.is_cancelled()
    }

    /// Host mapping operation progress onto `stage`, scaled into `[offset, offset + span]`.
    pub(crate) fn host(&mut self, stage: ExportStage, offset: f64, span: f64) -> StageHost<'_, 'a> {
        StageHost {
            job: self,
            stage,
            offset,
            span,
        }
    }
}

/// [`TaskHost`] that forwards an operation's progress to the job as stage progress.
pub(crate) struct StageHost<'j, 'a> {
    job: &'j mut ExportJob<'a>,
    stage: ExportStage,
    offset: f64,
    span: f64,
}

impl TaskHost for StageHost<'_, '_> {
    fn report(&mut self, fraction: f64) {
        let fraction = self.offset + fraction.clamp(0.0, 1.0) * self.span;
        let stage = self.stage;
        self.job.emit(stage, fraction, stage.as_str());
    }

    fn yield_now(&mut self) {
        self.job.yielder.yield_now();
    }

    fn is_cancelled(&self) -> bool {
        self.job.cancel.is_cancelled()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/job.rs"]
mod tests;
