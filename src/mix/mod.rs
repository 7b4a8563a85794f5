//! Multi-track mixdown of positioned clip buffers.

use crate::audio::buffer::{PcmBuffer, SharedPcm, to_stereo};
use crate::audio::graph::{Node, RenderGraph};
use crate::audio::param::AudioParam;
use crate::audio::resample::resample;
use crate::foundation::core::{secs_to_frame_index, secs_to_frames};
use crate::foundation::error::{MixdownError, MixdownResult};
use crate::foundation::math::{SILENCE_DB, db_to_gain, gain_to_db};

/// Mixer output format and normalization policy.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: usize,
    /// Peak-normalize the mix (attenuation only).
    pub normalize: bool,
    /// Normalization target below full scale, in dB.
    pub headroom_db: f64,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            normalize: false,
            headroom_db: -1.0,
        }
    }
}

impl MixerSettings {
    /// Check the output format and headroom.
    pub fn validate(&self) -> MixdownResult<()> {
        if self.sample_rate == 0 {
            return Err(MixdownError::validation("mixer sample_rate must be > 0"));
        }
        if self.channels == 0 {
            return Err(MixdownError::validation("mixer channels must be > 0"));
        }
        if !self.headroom_db.is_finite() {
            return Err(MixdownError::validation("mixer headroom_db must be finite"));
        }
        Ok(())
    }
}

/// One clip's processed audio, positioned on the mix timeline.
#[derive(Clone, Debug)]
pub struct AudioTrackData {
    /// Source clip id.
    pub clip_id: String,
    /// Processed audio; `None` or empty buffers are skipped.
    pub buffer: Option<SharedPcm>,
    /// Start in seconds relative to the mix start; negative values clamp to zero.
    pub start_time: f64,
    /// Owning track id.
    pub track_id: String,
    /// Track mute flag.
    pub track_muted: bool,
    /// Track solo flag.
    pub track_solo: bool,
    /// Clip gain, clamped to `[0, 2]`; `None` means unity.
    pub clip_volume: Option<f64>,
}

/// Entries allowed to sound in the mix.
///
/// Muted entries are dropped. When any entry is soloed, only soloed entries remain. Entries
/// without audio are dropped last.
pub fn resolve_active_tracks(tracks: &[AudioTrackData]) -> Vec<&AudioTrackData> {
    let any_solo = tracks.iter().any(|t| t.track_solo);
    tracks
        .iter()
        .filter(|t| !t.track_muted)
        .filter(|t| !any_solo || t.track_solo)
        .filter(|t| t.buffer.as_ref().is_some_and(|b| !b.is_empty()))
        .collect()
}

/// Combines positioned clip buffers into one buffer.
#[derive(Clone, Debug, Default)]
pub struct AudioMixer {
    settings: MixerSettings,
}

impl AudioMixer {
    /// Create a mixer after validating `settings`.
    pub fn new(settings: MixerSettings) -> MixdownResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Active settings.
    pub fn settings(&self) -> MixerSettings {
        self.settings
    }

    /// Mix `tracks` into a buffer of `duration` seconds at the mixer's format.
    ///
    /// Overlapping tracks add. With nothing to play the result is silence of the requested
    /// length. `on_progress` receives fractions in `[0, 1]`.
    #[tracing::instrument(level = "debug", skip(self, tracks, on_progress), fields(tracks = tracks.len()))]
    pub fn mix_tracks(
        &self,
        tracks: &[AudioTrackData],
        duration: f64,
        on_progress: &mut dyn FnMut(f64),
    ) -> MixdownResult<PcmBuffer> {
        let MixerSettings {
            sample_rate,
            channels,
            ..
        } = self.settings;
        let frames = secs_to_frames(duration, sample_rate);
        let active = resolve_active_tracks(tracks);
        if active.is_empty() {
            tracing::debug!("no active tracks, mixing silence");
            on_progress(1.0);
            return Ok(PcmBuffer::silent(sample_rate, channels, frames));
        }

        let mut graph = RenderGraph::new(sample_rate, channels);
        let sink = graph.add(Node::Sink);
        let total = active.len();
        for (i, track) in active.into_iter().enumerate() {
            let Some(buffer) = track.buffer.as_ref() else {
                continue;
            };
            let mut buffer = resample(buffer, sample_rate)?;
            if channels == 2 {
                buffer = to_stereo(&buffer);
            }
            let source = graph.add(Node::Source {
                buffer,
                start_frame: secs_to_frame_index(track.start_time.max(0.0), sample_rate),
            });
            let volume = track.clip_volume.unwrap_or(1.0).clamp(0.0, 2.0);
            if volume != 1.0 {
                let gain = graph.add(Node::Gain {
                    gain: AudioParam::new(volume),
                });
                graph.chain(&[source, gain, sink])?;
            } else {
                graph.connect(source, sink)?;
            }
            on_progress(0.5 * (i + 1) as f64 / total as f64);
        }

        let mut mixed = graph.render(frames)?;
        on_progress(0.9);
        if self.settings.normalize {
            let gain = normalize_peak(&mut mixed, self.settings.headroom_db);
            tracing::debug!(gain, "peak normalization");
        }
        on_progress(1.0);
        Ok(mixed)
    }
}

/// Gain that brings `peak` down to `headroom_db`, or `None` when no attenuation is needed.
pub fn normalization_gain(peak: f64, headroom_db: f64) -> Option<f64> {
    if peak <= 0.0 || !peak.is_finite() {
        return None;
    }
    let gain = db_to_gain(headroom_db) / peak;
    (gain < 1.0).then_some(gain)
}

/// Attenuate `buffer` in place so its peak sits at `headroom_db`; returns the applied gain.
///
/// Silent buffers and buffers already below the target are left untouched (gain `1.0`).
pub fn normalize_peak(buffer: &mut PcmBuffer, headroom_db: f64) -> f64 {
    match normalization_gain(f64::from(buffer.peak()), headroom_db) {
        Some(gain) => {
            buffer.scale(gain as f32);
            gain
        }
        None => 1.0,
    }
}

/// Peak level in dBFS over all channels; silence is `-inf`.
pub fn peak_level_db(buffer: &PcmBuffer) -> f64 {
    gain_to_db(f64::from(buffer.peak()))
}

/// RMS level in dBFS over all channels and samples; silence is `-inf`.
pub fn rms_level_db(buffer: &PcmBuffer) -> f64 {
    let count = buffer.len() * buffer.channel_count();
    if count == 0 {
        return SILENCE_DB;
    }
    let sum: f64 = buffer
        .channels()
        .iter()
        .flatten()
        .map(|&s| f64::from(s) * f64::from(s))
        .sum();
    gain_to_db((sum / count as f64).sqrt())
}

#[cfg(test)]
#[path = "../../tests/unit/mix/mod.rs"]
mod tests;
