/// Export stages, in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    /// Decoding clip sources.
    Extracting,
    /// Speed changes.
    Processing,
    /// EQ and volume.
    Effects,
    /// Summing clips.
    Mixing,
    /// Encoding the mix.
    Encoding,
    /// Done.
    Complete,
}

impl ExportStage {
    /// Overall percent span `[start, end]` covered by this stage.
    pub fn percent_range(self) -> (f64, f64) {
        match self {
            Self::Extracting => (0.0, 20.0),
            Self::Processing => (20.0, 45.0),
            Self::Effects => (45.0, 60.0),
            Self::Mixing => (60.0, 75.0),
            Self::Encoding => (75.0, 100.0),
            Self::Complete => (100.0, 100.0),
        }
    }

    /// Lowercase stage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extracting => "extracting",
            Self::Processing => "processing",
            Self::Effects => "effects",
            Self::Mixing => "mixing",
            Self::Encoding => "encoding",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for ExportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress update.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ExportProgress {
    /// Current stage.
    pub stage: ExportStage,
    /// Completion of the current stage in `[0, 1]`.
    pub stage_fraction: f64,
    /// Overall completion in `[0, 100]`.
    pub percent: f64,
    /// Human-readable detail.
    pub message: String,
}

impl ExportProgress {
    /// Update for `stage` at `stage_fraction`; the overall percent follows the stage's span.
    pub fn new(stage: ExportStage, stage_fraction: f64, message: impl Into<String>) -> Self {
        let stage_fraction = if stage_fraction.is_finite() {
            stage_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (lo, hi) = stage.percent_range();
        Self {
            stage,
            stage_fraction,
            percent: lo + (hi - lo) * stage_fraction,
            message: message.into(),
        }
    }
}

/// Receiver for [`ExportProgress`] updates.
pub trait ProgressSink {
    /// Deliver one update.
    fn send(&mut self, progress: ExportProgress);
}

impl ProgressSink for () {
    fn send(&mut self, _progress: ExportProgress) {}
}

impl ProgressSink for Vec<ExportProgress> {
    fn send(&mut self, progress: ExportProgress) {
        self.push(progress);
    }
}

impl ProgressSink for crossbeam_channel::Sender<ExportProgress> {
    fn send(&mut self, progress: ExportProgress) {
        // A dropped receiver only means nobody is listening any more.
        let _ = crossbeam_channel::Sender::send(self, progress);
    }
}

/// Adapts a closure into a [`ProgressSink`].
pub struct FnProgress<F>(pub F);

impl<F: FnMut(ExportProgress)> ProgressSink for FnProgress<F> {
    fn send(&mut self, progress: ExportProgress) {
        (self.0)(progress)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/progress.rs"]
mod tests;
