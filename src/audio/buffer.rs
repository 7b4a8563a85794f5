use crate::foundation::core::secs_to_frames;
use crate::foundation::error::{MixdownError, MixdownResult};
use std::sync::Arc;

/// Shared, immutable-by-convention PCM handle passed between stages.
///
/// Stages that have nothing to do hand back a clone of the same `Arc`, so callers can detect the
/// pass-through with [`Arc::ptr_eq`].
pub type SharedPcm = Arc<PcmBuffer>;

/// Planar multichannel `f32` PCM at a fixed sample rate.
#[derive(Clone, Debug, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>, // planar, equal lengths
}

impl PcmBuffer {
    /// Build a buffer from planar channel data.
    ///
    /// All channels must have the same length and at least one channel is required.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> MixdownResult<Self> {
        if sample_rate == 0 {
            return Err(MixdownError::validation("sample_rate must be non-zero"));
        }
        if channels.is_empty() {
            return Err(MixdownError::validation(
                "PCM buffer needs at least one channel",
            ));
        }
        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return Err(MixdownError::validation(
                "PCM buffer channels must have equal length",
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Silent buffer with `frames` samples per channel.
    pub fn silent(sample_rate: u32, channel_count: usize, frames: usize) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            channels: vec![vec![0.0; frames]; channel_count.max(1)],
        }
    }

    /// Silent buffer covering `duration` seconds (rounded up to whole frames).
    pub fn silent_for(duration: f64, sample_rate: u32, channel_count: usize) -> Self {
        Self::silent(
            sample_rate,
            channel_count,
            secs_to_frames(duration, sample_rate.max(1)),
        )
    }

    /// Build a buffer from interleaved samples; a trailing partial frame is dropped.
    pub fn from_interleaved(
        sample_rate: u32,
        channel_count: usize,
        interleaved: &[f32],
    ) -> MixdownResult<Self> {
        if channel_count == 0 {
            return Err(MixdownError::validation("channel count must be non-zero"));
        }
        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        Self::new(sample_rate, channels)
    }

    /// Interleave all channels frame by frame.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let n_ch = self.channels.len();
        let mut out = Vec::with_capacity(self.len() * n_ch);
        for i in 0..self.len() {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Length in frames (samples per channel).
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Return `true` when the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.len() as f64 / f64::from(self.sample_rate)
    }

    /// Borrow one channel.
    pub fn channel(&self, idx: usize) -> &[f32] {
        &self.channels[idx]
    }

    /// Mutably borrow one channel.
    pub fn channel_mut(&mut self, idx: usize) -> &mut [f32] {
        &mut self.channels[idx]
    }

    /// Borrow all channels.
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Mutably iterate over channels.
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Vec<f32>> {
        self.channels.iter_mut()
    }

    /// Consume the buffer and return its planar channel data.
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Multiply every sample by `gain` in place.
    pub fn scale(&mut self, gain: f32) {
        for ch in &mut self.channels {
            for s in ch.iter_mut() {
                *s *= gain;
            }
        }
    }

    /// Copy of frames `[start, end)`; frames outside the buffer read as silence.
    pub fn slice_frames(&self, start: i64, end: i64) -> Self {
        let len = end.saturating_sub(start).max(0) as usize;
        let src_len = self.len() as i64;
        let channels = self
            .channels
            .iter()
            .map(|ch| {
                let mut out = vec![0.0f32; len];
                let lo = start.max(0);
                let hi = end.min(src_len);
                if lo < hi {
                    let dst = (lo - start) as usize;
                    out[dst..dst + (hi - lo) as usize]
                        .copy_from_slice(&ch[lo as usize..hi as usize]);
                }
                out
            })
            .collect();
        Self {
            sample_rate: self.sample_rate,
            channels,
        }
    }

    /// Reverse sample order in every channel.
    pub fn reverse(&mut self) {
        for ch in &mut self.channels {
            ch.reverse();
        }
    }
}

/// Trim `buffer` to `[start, end)` seconds; a zero or inverted span yields an empty buffer.
pub fn trim(buffer: &PcmBuffer, start: f64, end: f64) -> PcmBuffer {
    let sr = f64::from(buffer.sample_rate());
    let start = if start.is_finite() { start.max(0.0) } else { 0.0 };
    let end = if end.is_finite() {
        end
    } else {
        buffer.duration()
    };
    let lo = ((start * sr).round() as usize).min(buffer.len());
    let hi = ((end.max(0.0) * sr).round() as usize).min(buffer.len());
    if hi <= lo {
        return PcmBuffer::silent(buffer.sample_rate(), buffer.channel_count(), 0);
    }
    buffer.slice_frames(lo as i64, hi as i64)
}

/// Remap `buffer` to `target` channels.
///
/// Mono fans out to every output channel, multichannel to mono averages, other layouts copy the
/// overlapping channels and wrap the rest.
pub fn remix_channels(buffer: &PcmBuffer, target: usize) -> PcmBuffer {
    let target = target.max(1);
    let src = buffer.channels();
    let channels = if src.len() == target {
        src.to_vec()
    } else if target == 1 {
        let scale = 1.0 / src.len() as f32;
        let mut mono = vec![0.0f32; buffer.len()];
        for ch in src {
            for (m, s) in mono.iter_mut().zip(ch) {
                *m += s * scale;
            }
        }
        vec![mono]
    } else {
        (0..target).map(|i| src[i % src.len()].clone()).collect()
    };
    PcmBuffer {
        sample_rate: buffer.sample_rate(),
        channels,
    }
}

/// Stereo view of `buffer`; stereo input is returned as the same handle.
pub fn to_stereo(buffer: &SharedPcm) -> SharedPcm {
    if buffer.channel_count() == 2 {
        return Arc::clone(buffer);
    }
    Arc::new(remix_channels(buffer, 2))
}

#[cfg(test)]
#[path = "../../tests/unit/audio/buffer.rs"]
mod tests;
