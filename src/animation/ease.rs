/// Keyframe easing names as stored on timeline keyframes.
///
/// The easing of a keyframe shapes the segment that arrives at it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    /// Hold the previous value, jump at the keyframe.
    Step,
    /// Straight-line interpolation.
    #[default]
    Linear,
    /// Quadratic ease-in.
    EaseIn,
    /// Quadratic ease-out.
    EaseOut,
    /// Quadratic ease-in/out.
    EaseInOut,
    /// Cubic bezier shaped by the neighbouring keyframes' handles.
    Bezier,
    /// Any easing name this crate does not know; behaves like [`Easing::Step`].
    #[serde(other)]
    Unknown,
}

impl Easing {
    /// Apply this easing to normalized progress `t` in `[0, 1]`.
    ///
    /// Step-like easings return 0 until the segment ends. Bezier segments are evaluated against
    /// handles instead and map `t` linearly here.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear | Self::Bezier => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::Step | Self::Unknown => {
                if t >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Return `true` for the three named ease curves.
    pub fn is_ease(self) -> bool {
        matches!(self, Self::EaseIn | Self::EaseOut | Self::EaseInOut)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
