/// One scheduled change on an [`AudioParam`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue {
        /// Event time in seconds.
        time: f64,
        /// New value.
        value: f64,
    },
    /// Ramp linearly from the previous event so that `value` is reached at `time`.
    LinearRamp {
        /// Ramp end time in seconds.
        time: f64,
        /// Target value.
        value: f64,
    },
    /// Ramp exponentially from the previous event so that `value` is reached at `time`.
    ExponentialRamp {
        /// Ramp end time in seconds.
        time: f64,
        /// Target value.
        value: f64,
    },
}

impl AutomationEvent {
    /// Time at which the event's value is reached.
    pub fn time(&self) -> f64 {
        match *self {
            Self::SetValue { time, .. }
            | Self::LinearRamp { time, .. }
            | Self::ExponentialRamp { time, .. } => time,
        }
    }

    /// Value held once the event completes.
    pub fn value(&self) -> f64 {
        match *self {
            Self::SetValue { value, .. }
            | Self::LinearRamp { value, .. }
            | Self::ExponentialRamp { value, .. } => value,
        }
    }
}

/// Automatable scalar parameter with ramp events, sampled at render time.
///
/// Events are kept sorted by time; an event inserted at the same time as an existing one goes
/// after it.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioParam {
    default: f64,
    events: Vec<AutomationEvent>, // sorted by time
}

impl AudioParam {
    /// Parameter with a fixed value and no automation.
    pub fn new(default: f64) -> Self {
        Self {
            default,
            events: Vec::new(),
        }
    }

    /// Value used before the first event.
    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// Scheduled events in time order.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Return `true` when no automation is scheduled.
    pub fn is_static(&self) -> bool {
        self.events.is_empty()
    }

    /// Jump to `value` at `time`.
    pub fn set_value_at(&mut self, value: f64, time: f64) {
        self.insert(AutomationEvent::SetValue { time, value });
    }

    /// Linear ramp reaching `value` at `time`.
    pub fn linear_ramp_to(&mut self, value: f64, time: f64) {
        self.insert(AutomationEvent::LinearRamp { time, value });
    }

    /// Exponential ramp reaching `value` at `time`.
    pub fn exponential_ramp_to(&mut self, value: f64, time: f64) {
        self.insert(AutomationEvent::ExponentialRamp { time, value });
    }

    fn insert(&mut self, ev: AutomationEvent) {
        let t = ev.time();
        let idx = self.events.partition_point(|e| e.time() <= t);
        self.events.insert(idx, ev);
    }

    /// Parameter value at `time` seconds.
    pub fn value_at(&self, time: f64) -> f64 {
        let idx = self.events.partition_point(|e| e.time() <= time);
        if idx < self.events.len() {
            let next = self.events[idx];
            let (t0, v0) = if idx == 0 {
                (0.0f64.min(next.time()), self.default)
            } else {
                let prev = self.events[idx - 1];
                (prev.time(), prev.value())
            };
            return ramp_value(next, t0, v0, time);
        }
        self.events.last().map_or(self.default, AutomationEvent::value)
    }

    /// Fill `out` with per-sample values, sample `i` sitting at `(start_frame + i) / sample_rate`.
    pub fn fill(&self, out: &mut [f32], start_frame: usize, sample_rate: u32) {
        if self.events.is_empty() {
            out.fill(self.default as f32);
            return;
        }
        let sr = f64::from(sample_rate);
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.value_at((start_frame + i) as f64 / sr) as f32;
        }
    }
}

fn ramp_value(next: AutomationEvent, t0: f64, v0: f64, time: f64) -> f64 {
    match next {
        // A pending set-value holds the previous value until its time.
        AutomationEvent::SetValue { .. } => v0,
        AutomationEvent::LinearRamp { time: t1, value: v1 } => {
            let span = t1 - t0;
            if span <= 0.0 {
                return v1;
            }
            let u = ((time - t0) / span).clamp(0.0, 1.0);
            v0 + (v1 - v0) * u
        }
        AutomationEvent::ExponentialRamp { time: t1, value: v1 } => {
            // Exponential ramps are undefined through zero or across a sign change.
            if v0 <= 0.0 || v1 <= 0.0 {
                return v0;
            }
            let span = t1 - t0;
            if span <= 0.0 {
                return v1;
            }
            let u = ((time - t0) / span).clamp(0.0, 1.0);
            v0 * (v1 / v0).powf(u)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/param.rs"]
mod tests;
