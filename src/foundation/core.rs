use crate::foundation::error::{MixdownError, MixdownResult};

/// Half-open time window `[start, end)` in timeline seconds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeWindow {
    /// Inclusive window start.
    pub start: f64,
    /// Exclusive window end.
    pub end: f64, // exclusive
}

impl TimeWindow {
    /// Create a validated window with finite bounds and `start <= end`.
    pub fn new(start: f64, end: f64) -> MixdownResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(MixdownError::validation(
                "TimeWindow bounds must be finite",
            ));
        }
        if start > end {
            return Err(MixdownError::validation("TimeWindow start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Length of the window in seconds.
    pub fn duration(self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Return `true` when the window covers no time.
    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    /// Return `true` when `t` is inside `[start, end)`.
    pub fn contains(self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Return `true` when `[start, start + duration)` overlaps this window.
    pub fn intersects(self, start: f64, duration: f64) -> bool {
        let end = start + duration;
        start < self.end && end > self.start
    }
}

/// Number of sample frames needed to cover `seconds` at `sample_rate` (rounded up).
///
/// Non-finite or non-positive durations map to zero frames.
pub fn secs_to_frames(seconds: f64, sample_rate: u32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    let frames = seconds * f64::from(sample_rate);
    // Absorb float noise such as 5.0 * 48000 landing a hair above an integer.
    let rounded = frames.round();
    if (frames - rounded).abs() < 1e-6 {
        rounded as usize
    } else {
        frames.ceil() as usize
    }
}

/// Nearest sample frame for a timeline position in seconds (negative positions clamp to zero).
pub fn secs_to_frame_index(seconds: f64, sample_rate: u32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * f64::from(sample_rate)).round() as usize
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
