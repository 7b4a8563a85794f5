//! Constant and keyframed playback-speed processing.

pub(crate) mod vocoder;

use crate::animation::keyframe::{Keyframe, interpolate, keyframes_for};
use crate::audio::buffer::{PcmBuffer, SharedPcm};
use crate::foundation::core::{secs_to_frame_index, secs_to_frames};
use crate::pipeline::task::TaskHost;
use crate::stretch::vocoder::{PhaseVocoder, VocoderPlan};
use std::sync::Arc;

/// Keyframe property carrying playback speed.
pub const SPEED_PROPERTY: &str = "speed";
/// Slowest supported playback speed.
pub const MIN_SPEED: f64 = 0.1;
/// Fastest supported playback speed.
pub const MAX_SPEED: f64 = 10.0;
/// Timeline length of one variable-speed segment, in seconds.
pub const SEGMENT_SECONDS: f64 = 0.1;
/// Trapezoid count used to integrate speed over one interval.
pub const INTEGRATION_STEPS: usize = 20;
/// Variable-speed processing yields after this many segments.
pub const YIELD_EVERY_SEGMENTS: usize = 10;

const UNITY_EPSILON: f64 = 0.001;
const SEGMENT_UNITY_EPSILON: f64 = 0.01;

/// Advisory quality level; selects the vocoder frame size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StretchQuality {
    /// 1024-sample frames.
    Fast,
    /// 2048-sample frames.
    #[default]
    Normal,
    /// 4096-sample frames.
    High,
}

impl StretchQuality {
    /// Vocoder frame size for this quality.
    pub fn fft_size(self) -> usize {
        match self {
            Self::Fast => 1024,
            Self::Normal => 2048,
            Self::High => 4096,
        }
    }
}

/// Time-stretch configuration.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimeStretchSettings {
    /// Keep pitch constant when the speed changes.
    pub preserve_pitch: bool,
    /// Stretch engine quality.
    pub quality: StretchQuality,
}

impl Default for TimeStretchSettings {
    fn default() -> Self {
        Self {
            preserve_pitch: true,
            quality: StretchQuality::Normal,
        }
    }
}

/// Applies playback-speed changes to clip audio.
#[derive(Clone, Debug)]
pub struct TimeStretchProcessor {
    settings: TimeStretchSettings,
    plan: VocoderPlan,
}

impl Default for TimeStretchProcessor {
    fn default() -> Self {
        Self::new(TimeStretchSettings::default())
    }
}

impl TimeStretchProcessor {
    /// Processor for `settings`; plans the vocoder FFTs up front.
    pub fn new(settings: TimeStretchSettings) -> Self {
        Self {
            plan: VocoderPlan::new(settings.quality.fft_size()),
            settings,
        }
    }

    /// Active settings.
    pub fn settings(&self) -> TimeStretchSettings {
        self.settings
    }

    /// Play `buffer` at a constant `speed` (clamped to `[0.1, 10]`).
    ///
    /// A speed within 0.001 of 1 returns the same handle.
    #[tracing::instrument(level = "debug", skip(self, buffer), fields(frames = buffer.len()))]
    pub fn process_constant_speed(
        &self,
        buffer: &SharedPcm,
        speed: f64,
        preserve_pitch: bool,
    ) -> SharedPcm {
        if !speed.is_finite() || buffer.is_empty() {
            return Arc::clone(buffer);
        }
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        if (speed - 1.0).abs() < UNITY_EPSILON {
            return Arc::clone(buffer);
        }
        let out = if preserve_pitch {
            self.stretch(buffer, speed)
        } else {
            resample_for_speed(buffer, speed)
        };
        Arc::new(out)
    }

    /// Play `buffer` following the `speed` keyframes in `keyframes`.
    ///
    /// With fewer than two speed keyframes this is [`Self::process_constant_speed`]. Otherwise the
    /// output is exactly `clip_duration` long and is built from 100 ms segments, each fed by the
    /// source range the integrated speed curve consumes over it. Returns `None` when the host
    /// cancels.
    #[tracing::instrument(
        level = "debug",
        skip(self, buffer, keyframes, host),
        fields(frames = buffer.len())
    )]
    pub fn process_with_keyframes(
        &self,
        buffer: &SharedPcm,
        keyframes: &[Keyframe],
        default_speed: f64,
        clip_duration: f64,
        preserve_pitch: bool,
        host: &mut dyn TaskHost,
    ) -> Option<SharedPcm> {
        let speed_keys = keyframes_for(keyframes, SPEED_PROPERTY);
        match speed_keys.as_slice() {
            [] => {
                return Some(self.process_constant_speed(buffer, default_speed, preserve_pitch));
            }
            [only] => {
                return Some(self.process_constant_speed(buffer, only.value, preserve_pitch));
            }
            _ => {}
        }

        let sr = buffer.sample_rate();
        let out_len = secs_to_frames(clip_duration, sr);
        let mut out = PcmBuffer::silent(sr, buffer.channel_count(), out_len);
        if out_len == 0 {
            host.report(1.0);
            return Some(Arc::new(out));
        }

        let segments = segment_bounds(clip_duration);
        let positions = source_positions(&speed_keys, default_speed, &segments);
        // Shift so the lowest visited source position is the start of the buffer; clips that
        // open in reverse then read backwards from the end.
        let origin = -positions.iter().copied().fold(0.0f64, f64::min);
        tracing::debug!(segments = segments.len(), origin, "variable-speed render");

        let last = segments.len() - 1;
        for (i, &(t0, t1)) in segments.iter().enumerate() {
            let mid_speed = interpolate(&speed_keys, (t0 + t1) / 2.0, default_speed);
            let a = origin + positions[i];
            let b = origin + positions[i + 1];
            let src_start = (a.min(b) * f64::from(sr)).floor() as i64;
            let src_end = (a.max(b) * f64::from(sr)).floor() as i64;
            let segment = buffer.slice_frames(src_start, src_end);

            let magnitude = mid_speed.abs();
            let mut processed = if (magnitude - 1.0).abs() > SEGMENT_UNITY_EPSILON
                && !segment.is_empty()
            {
                let magnitude = magnitude.clamp(MIN_SPEED, MAX_SPEED);
                if preserve_pitch {
                    self.stretch(&segment, magnitude)
                } else {
                    resample_for_speed(&segment, magnitude)
                }
            } else {
                segment
            };
            if mid_speed < 0.0 {
                processed.reverse();
            }

            let dst_start = secs_to_frame_index(t0, sr).min(out_len);
            let dst_end = if i == last {
                out_len
            } else {
                secs_to_frame_index(t1, sr).min(out_len)
            };
            for (c, dst) in out.channels_mut().enumerate() {
                nearest_fill(processed.channel(c), &mut dst[dst_start..dst_end]);
            }

            host.report(dst_end as f64 / out_len as f64);
            if (i + 1) % YIELD_EVERY_SEGMENTS == 0 {
                host.yield_now();
                if host.is_cancelled() {
                    tracing::debug!(segment = i, "variable-speed render cancelled");
                    return None;
                }
            }
        }
        Some(Arc::new(out))
    }

    fn stretch(&self, buffer: &PcmBuffer, speed: f64) -> PcmBuffer {
        let vocoder = PhaseVocoder::new(self.plan.clone(), speed);
        let channels = vocoder.process_planar(buffer.channels());
        PcmBuffer::new(buffer.sample_rate(), channels).unwrap_or_else(|_| {
            PcmBuffer::silent(buffer.sample_rate(), buffer.channel_count(), 0)
        })
    }
}

/// Source seconds consumed while the timeline advances over `[t0, t1)`.
///
/// Trapezoidal rule with [`INTEGRATION_STEPS`] sub-steps over the eased speed curve; negative
/// speeds give negative consumption, and an empty or inverted interval consumes nothing.
pub fn integrate_speed(keyframes: &[Keyframe], default_speed: f64, t0: f64, t1: f64) -> f64 {
    if t0.is_nan() || t1.is_nan() || t1 <= t0 {
        return 0.0;
    }
    let dt = (t1 - t0) / INTEGRATION_STEPS as f64;
    let mut sum = 0.0;
    let mut prev = interpolate(keyframes, t0, default_speed);
    for step in 1..=INTEGRATION_STEPS {
        let t = if step == INTEGRATION_STEPS {
            t1
        } else {
            t0 + dt * step as f64
        };
        let cur = interpolate(keyframes, t, default_speed);
        sum += (prev + cur) * 0.5 * dt;
        prev = cur;
    }
    sum
}

/// Plain rate change: `ceil(len / speed)` frames, each linearly interpolated at `i * speed`.
pub fn resample_for_speed(buffer: &PcmBuffer, speed: f64) -> PcmBuffer {
    let len = buffer.len();
    if len == 0 || speed.is_nan() || speed <= 0.0 {
        return buffer.clone();
    }
    let out_len = (len as f64 / speed).ceil() as usize;
    let channels = buffer
        .channels()
        .iter()
        .map(|src| {
            (0..out_len)
                .map(|i| {
                    let pos = i as f64 * speed;
                    let i0 = (pos.floor() as usize).min(len - 1);
                    let i1 = (i0 + 1).min(len - 1);
                    let frac = (pos - i0 as f64).clamp(0.0, 1.0) as f32;
                    src[i0] + (src[i1] - src[i0]) * frac
                })
                .collect()
        })
        .collect();
    PcmBuffer::new(buffer.sample_rate(), channels)
        .unwrap_or_else(|_| PcmBuffer::silent(buffer.sample_rate(), buffer.channel_count(), 0))
}

/// Fill `dst` from `src` by nearest-index lookup; an empty `src` leaves `dst` untouched.
pub fn nearest_fill(src: &[f32], dst: &mut [f32]) {
    if src.is_empty() || dst.is_empty() {
        return;
    }
    let (p, l) = (src.len(), dst.len());
    for (i, d) in dst.iter_mut().enumerate() {
        *d = src[(i * p / l).min(p - 1)];
    }
}

/// Source offset, relative to the clip's in-point, read at clip-local time `t`.
///
/// Uses the same segmenting and origin as [`TimeStretchProcessor::process_with_keyframes`], so
/// a clip that opens in reverse reports offsets counting down from the far end of its range.
/// `keyframes` may hold any properties; only speed keyframes are considered.
pub fn source_offset_at(
    keyframes: &[Keyframe],
    default_speed: f64,
    clip_duration: f64,
    t: f64,
) -> f64 {
    let speed_keys = keyframes_for(keyframes, SPEED_PROPERTY);
    if speed_keys.len() < 2 {
        let speed = speed_keys.first().map_or(default_speed, |k| k.value);
        return speed.abs() * t.max(0.0);
    }
    let segments = segment_bounds(clip_duration);
    let positions = source_positions(&speed_keys, default_speed, &segments);
    let origin = -positions.iter().copied().fold(0.0f64, f64::min);
    let t = t.clamp(0.0, clip_duration.max(0.0));
    let idx = ((t / SEGMENT_SECONDS).floor() as usize).min(segments.len() - 1);
    let (t0, _) = segments[idx];
    origin + positions[idx] + integrate_speed(&speed_keys, default_speed, t0, t)
}

/// Length of source material, in seconds, a keyframed clip reads over `clip_duration`.
///
/// Spans the lowest to the highest visited source position, so direction changes are covered.
pub fn source_extent(keyframes: &[Keyframe], default_speed: f64, clip_duration: f64) -> f64 {
    let speed_keys = keyframes_for(keyframes, SPEED_PROPERTY);
    if speed_keys.len() < 2 {
        let speed = speed_keys.first().map_or(default_speed, |k| k.value);
        return speed.abs() * clip_duration.max(0.0);
    }
    let positions = source_positions(&speed_keys, default_speed, &segment_bounds(clip_duration));
    let (lo, hi) = positions
        .iter()
        .fold((0.0f64, 0.0f64), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    hi - lo
}

fn segment_bounds(clip_duration: f64) -> Vec<(f64, f64)> {
    let count = ((clip_duration / SEGMENT_SECONDS) - 1e-9).ceil().max(1.0) as usize;
    (0..count)
        .map(|i| {
            let t0 = i as f64 * SEGMENT_SECONDS;
            let t1 = ((i + 1) as f64 * SEGMENT_SECONDS).min(clip_duration);
            (t0, t1)
        })
        .collect()
}

fn source_positions(
    keyframes: &[Keyframe],
    default_speed: f64,
    segments: &[(f64, f64)],
) -> Vec<f64> {
    let mut positions = Vec::with_capacity(segments.len() + 1);
    let mut pos = 0.0;
    positions.push(pos);
    for &(t0, t1) in segments {
        pos += integrate_speed(keyframes, default_speed, t0, t1);
        positions.push(pos);
    }
    positions
}

#[cfg(test)]
#[path = "../../tests/unit/stretch/mod.rs"]
mod tests;
