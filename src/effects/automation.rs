use crate::animation::ease::Easing;
use crate::animation::keyframe::{Keyframe, bezier_interpolate, linear_value_at};
use crate::audio::param::AudioParam;

/// Smallest value a gain parameter is scheduled at.
pub const GAIN_FLOOR: f64 = 0.0001;
/// Linear ramps used to approximate one bezier segment.
pub const BEZIER_SUBSTEPS: usize = 10;

/// How scheduled values are conditioned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamScale {
    /// Linear gain; values are floored at [`GAIN_FLOOR`].
    Gain,
    /// Decibels; values pass through.
    Decibels,
}

impl ParamScale {
    fn condition(self, value: f64) -> f64 {
        match self {
            Self::Gain => value.max(GAIN_FLOOR),
            Self::Decibels => value,
        }
    }
}

/// Schedule time-sorted `keyframes` onto `param`.
///
/// A curve that starts after zero gets a value pinned at zero from the linearly interpolated
/// curve. Each later keyframe's easing decides how its incoming segment is scheduled: linear
/// ramp, exponential ramp for the ease family (linear when an endpoint is not positive), ten
/// linear sub-ramps along the bezier, or a jump for step. The final value holds until
/// `clip_duration`.
pub fn schedule_keyframes(
    param: &mut AudioParam,
    keyframes: &[Keyframe],
    clip_duration: f64,
    scale: ParamScale,
) {
    let Some(first) = keyframes.first() else {
        return;
    };

    let (mut prev, rest) = if first.time > 0.0 {
        let start = linear_value_at(keyframes, 0.0, first.value);
        let anchor = Keyframe::new(first.property.clone(), 0.0, start);
        (anchor, keyframes)
    } else {
        (first.clone(), &keyframes[1..])
    };
    let mut last_value = scale.condition(prev.value);
    param.set_value_at(last_value, prev.time.max(0.0));

    for key in rest {
        let value = scale.condition(key.value);
        match key.easing {
            Easing::Linear => param.linear_ramp_to(value, key.time),
            Easing::EaseIn | Easing::EaseOut | Easing::EaseInOut => {
                if last_value > 0.0 && value > 0.0 {
                    param.exponential_ramp_to(value, key.time);
                } else {
                    param.linear_ramp_to(value, key.time);
                }
            }
            Easing::Bezier => {
                let span = key.time - prev.time;
                for step in 1..=BEZIER_SUBSTEPS {
                    let u = step as f64 / BEZIER_SUBSTEPS as f64;
                    let v = scale.condition(bezier_interpolate(&prev, key, u));
                    param.linear_ramp_to(v, prev.time + span * u);
                }
            }
            Easing::Step | Easing::Unknown => param.set_value_at(value, key.time),
        }
        last_value = value;
        prev = key.clone();
    }

    if prev.time < clip_duration {
        param.set_value_at(last_value, clip_duration);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/automation.rs"]
mod tests;
