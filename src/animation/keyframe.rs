use crate::animation::ease::Easing;
use crate::foundation::math::lerp;

/// Default outgoing handle used when a bezier segment only has one handle set.
pub const DEFAULT_HANDLE_OUT: BezierHandle = BezierHandle { x: 0.33, y: 0.0 };
/// Default incoming handle used when a bezier segment only has one handle set.
pub const DEFAULT_HANDLE_IN: BezierHandle = BezierHandle { x: -0.33, y: 0.0 };

/// Bezier control point relative to its keyframe.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BezierHandle {
    /// Time offset in seconds.
    pub x: f64,
    /// Value offset, as a fraction of the segment's value change.
    pub y: f64,
}

/// One automation point on a named property.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe {
    /// Property path, e.g. `speed` or `effect.<id>.volume`.
    pub property: String,
    /// Clip-local time in seconds.
    pub time: f64,
    /// Value at `time`.
    pub value: f64,
    /// Shape of the segment arriving at this keyframe.
    #[serde(default)]
    pub easing: Easing,
    /// Incoming bezier handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_in: Option<BezierHandle>,
    /// Outgoing bezier handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_out: Option<BezierHandle>,
}

impl Keyframe {
    /// Keyframe with linear easing and no handles.
    pub fn new(property: impl Into<String>, time: f64, value: f64) -> Self {
        Self {
            property: property.into(),
            time,
            value,
            easing: Easing::Linear,
            handle_in: None,
            handle_out: None,
        }
    }

    /// Builder-style easing override.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Builder-style handle override.
    pub fn with_handles(
        mut self,
        handle_in: Option<BezierHandle>,
        handle_out: Option<BezierHandle>,
    ) -> Self {
        self.handle_in = handle_in;
        self.handle_out = handle_out;
        self
    }
}

/// Keyframes targeting `property`, sorted by time; keyframes with non-finite time are dropped.
pub fn keyframes_for(keyframes: &[Keyframe], property: &str) -> Vec<Keyframe> {
    let mut out = keyframes
        .iter()
        .filter(|k| k.property == property && k.time.is_finite())
        .cloned()
        .collect::<Vec<_>>();
    out.sort_by(|a, b| a.time.total_cmp(&b.time));
    out
}

/// Return `true` when any keyframe targets `property`.
pub fn has_keyframes(keyframes: &[Keyframe], property: &str) -> bool {
    keyframes.iter().any(|k| k.property == property)
}

/// Cubic bezier value between two keyframes at normalized `t`.
///
/// Handles are value-space offsets scaled by the segment's value change, so `t = 0` and `t = 1`
/// land exactly on the keyframe values whatever the handles are.
pub fn bezier_interpolate(prev: &Keyframe, next: &Keyframe, t: f64) -> f64 {
    if prev.handle_out.is_none() && next.handle_in.is_none() {
        return lerp(prev.value, next.value, t);
    }
    let out = prev.handle_out.unwrap_or(DEFAULT_HANDLE_OUT);
    let inn = next.handle_in.unwrap_or(DEFAULT_HANDLE_IN);

    let p0 = prev.value;
    let p3 = next.value;
    let value_diff = p3 - p0;
    let p1 = p0 + out.y * value_diff;
    let p2 = p3 + inn.y * value_diff;

    let mt = 1.0 - t;
    mt * mt * mt * p0 + 3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t * p3
}

/// Evaluate sorted `keyframes` at `t`, honouring each segment's easing.
///
/// Before the first and after the last keyframe the nearest value is held; an empty set yields
/// `default`.
pub fn interpolate(keyframes: &[Keyframe], t: f64, default: f64) -> f64 {
    let Some((a, b, u)) = segment_at(keyframes, t) else {
        return edge_value(keyframes, t, default);
    };
    match b.easing {
        Easing::Step | Easing::Unknown => a.value,
        Easing::Bezier => bezier_interpolate(a, b, u),
        e => lerp(a.value, b.value, e.apply(u)),
    }
}

/// Evaluate sorted `keyframes` at `t` with straight-line segments, ignoring easing.
pub fn linear_value_at(keyframes: &[Keyframe], t: f64, default: f64) -> f64 {
    match segment_at(keyframes, t) {
        Some((a, b, u)) => lerp(a.value, b.value, u),
        None => edge_value(keyframes, t, default),
    }
}

fn segment_at(keyframes: &[Keyframe], t: f64) -> Option<(&Keyframe, &Keyframe, f64)> {
    let idx = keyframes.partition_point(|k| k.time <= t);
    if idx == 0 || idx >= keyframes.len() {
        return None;
    }
    let a = &keyframes[idx - 1];
    let b = &keyframes[idx];
    let span = b.time - a.time;
    if span <= 0.0 {
        return None;
    }
    Some((a, b, ((t - a.time) / span).clamp(0.0, 1.0)))
}

fn edge_value(keyframes: &[Keyframe], t: f64, default: f64) -> f64 {
    match (keyframes.first(), keyframes.last()) {
        (Some(first), _) if t < first.time => first.value,
        (_, Some(last)) => last.value,
        _ => default,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/keyframe.rs"]
mod tests;
