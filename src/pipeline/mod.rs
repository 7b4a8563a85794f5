//! Staged, cancellable export of a timeline window.
//!
//! [`AudioExportPipeline`] runs `extracting -> processing -> effects -> mixing -> encoding ->
//! complete` over every clip that contributes audio to the window. Stage boundaries are
//! suspension points: the pipeline reports progress, yields to the host and stops with
//! [`ExportOutcome::Cancelled`] if the job's token was cancelled. Per-clip extraction failures
//! degrade to silence; codec negotiation failures are fatal.

pub(crate) mod job;
pub(crate) mod progress;
pub(crate) mod settings;
pub(crate) mod task;

use crate::animation::keyframe::keyframes_for;
use crate::audio::buffer::{PcmBuffer, SharedPcm, to_stereo, trim};
use crate::audio::resample::resample;
use crate::effects::AudioEffectRenderer;
use crate::foundation::core::TimeWindow;
use crate::foundation::error::{MixdownError, MixdownResult};
use crate::media::Extractor;
use crate::media::encode::{EncodedAudio, Encoder, EncoderConfig};
use crate::mix::{AudioMixer, AudioTrackData};
use crate::pipeline::job::ExportJob;
use crate::pipeline::progress::ExportStage;
use crate::pipeline::settings::ExportSettings;
use crate::pipeline::task::TaskHost;
use crate::stretch::{SPEED_PROPERTY, TimeStretchProcessor, source_extent};
use crate::timeline::model::{Clip, Timeline};
use crate::timeline::query::contributing_clips;
use std::sync::Arc;

/// Static speeds closer to 1 than this play the source untouched.
pub const STATIC_SPEED_EPSILON: f64 = 0.01;

/// Non-error result of an export.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportOutcome<T> {
    /// The export ran to completion.
    Complete(T),
    /// The job was cancelled; no partial result is produced.
    Cancelled,
    /// No clip in the window carries audio.
    NothingToExport,
}

impl<T> ExportOutcome<T> {
    /// The finished value, if any.
    pub fn into_complete(self) -> Option<T> {
        match self {
            Self::Complete(v) => Some(v),
            Self::Cancelled | Self::NothingToExport => None,
        }
    }

    /// Return `true` for [`ExportOutcome::Complete`].
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Return `true` for [`ExportOutcome::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Transform the finished value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExportOutcome<U> {
        match self {
            Self::Complete(v) => ExportOutcome::Complete(f(v)),
            Self::Cancelled => ExportOutcome::Cancelled,
            Self::NothingToExport => ExportOutcome::NothingToExport,
        }
    }
}

/// One contributing clip and its audio as it moves through the stages.
struct StagedClip<'t> {
    clip: &'t Clip,
    buffer: SharedPcm,
    // Stand-in silence for a failed extraction; already final.
    substituted: bool,
}

/// Orchestrates stretch, effects, mixing and encoding for a timeline window.
#[derive(Debug)]
pub struct AudioExportPipeline {
    settings: ExportSettings,
    stretcher: TimeStretchProcessor,
    effects: AudioEffectRenderer,
    mixer: AudioMixer,
}

impl AudioExportPipeline {
    /// Build a pipeline after validating `settings`.
    pub fn new(settings: ExportSettings) -> MixdownResult<Self> {
        settings.validate()?;
        Ok(Self {
            stretcher: TimeStretchProcessor::new(settings.time_stretch),
            effects: AudioEffectRenderer::new(),
            mixer: AudioMixer::new(settings.mixer_settings())?,
            settings,
        })
    }

    /// Active settings.
    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Render `window` of `timeline` and encode the mix.
    ///
    /// The extractor's cache is cleared before returning, whatever the outcome. An encoder
    /// session left open by a failure or cancellation is aborted.
    #[tracing::instrument(skip_all, fields(start = window.start, end = window.end))]
    pub fn export(
        &self,
        timeline: &Timeline,
        window: TimeWindow,
        extractor: &mut dyn Extractor,
        encoder: &mut dyn Encoder,
        job: &mut ExportJob<'_>,
    ) -> MixdownResult<ExportOutcome<EncodedAudio>> {
        let result = self.run_export(timeline, window, extractor, encoder, job);
        if !matches!(result, Ok(ExportOutcome::Complete(_))) {
            encoder.abort();
        }
        extractor.clear_cache();
        result
    }

    /// Render `window` of `timeline` and return the raw mix at the export rate, in stereo.
    ///
    /// The extractor's cache is cleared before returning, whatever the outcome.
    #[tracing::instrument(skip_all, fields(start = window.start, end = window.end))]
    pub fn export_raw(
        &self,
        timeline: &Timeline,
        window: TimeWindow,
        extractor: &mut dyn Extractor,
        job: &mut ExportJob<'_>,
    ) -> MixdownResult<ExportOutcome<PcmBuffer>> {
        let result = self.mix_window(timeline, window, extractor, job);
        extractor.clear_cache();
        if let Ok(ExportOutcome::Complete(mix)) = &result {
            job.emit(ExportStage::Complete, 1.0, "mix complete");
            tracing::info!(frames = mix.len(), "raw mix complete");
        }
        result
    }

    fn run_export(
        &self,
        timeline: &Timeline,
        window: TimeWindow,
        extractor: &mut dyn Extractor,
        encoder: &mut dyn Encoder,
        job: &mut ExportJob<'_>,
    ) -> MixdownResult<ExportOutcome<EncodedAudio>> {
        let mixed = match self.mix_window(timeline, window, extractor, job)? {
            ExportOutcome::Complete(mixed) => mixed,
            ExportOutcome::Cancelled => return Ok(ExportOutcome::Cancelled),
            ExportOutcome::NothingToExport => return Ok(ExportOutcome::NothingToExport),
        };

        if !job.enter(ExportStage::Encoding) {
            return Ok(ExportOutcome::Cancelled);
        }
        let preference = &self.settings.codec_preference;
        let codec = encoder.is_supported(preference).ok_or_else(|| {
            let tried = preference
                .iter()
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join(", ");
            MixdownError::CodecUnavailable(tried)
        })?;

        let sample_rate = self.settings.sample_rate;
        let mixed = to_stereo(&resample(&Arc::new(mixed), sample_rate)?);
        encoder.configure(&EncoderConfig {
            codec,
            sample_rate,
            channels: 2,
            bitrate: self.settings.bitrate,
        })?;
        encoder.encode(&mixed, &mut job.host(ExportStage::Encoding, 0.0, 0.95))?;
        if job.is_cancelled() {
            tracing::info!("export cancelled while encoding");
            return Ok(ExportOutcome::Cancelled);
        }
        let encoded = encoder.finalize()?;
        job.emit(ExportStage::Complete, 1.0, "export complete");
        tracing::info!(
            codec = %codec,
            bytes = encoded.byte_len(),
            duration = encoded.duration,
            "export complete"
        );
        Ok(ExportOutcome::Complete(encoded))
    }

    fn mix_window(
        &self,
        timeline: &Timeline,
        window: TimeWindow,
        extractor: &mut dyn Extractor,
        job: &mut ExportJob<'_>,
    ) -> MixdownResult<ExportOutcome<PcmBuffer>> {
        let clips = contributing_clips(timeline, window);
        if clips.is_empty() {
            tracing::info!("no clips contribute audio to the window");
            return Ok(ExportOutcome::NothingToExport);
        }
        let count = clips.len();

        if !job.enter(ExportStage::Extracting) {
            return Ok(ExportOutcome::Cancelled);
        }
        let mut staged = Vec::with_capacity(count);
        for (i, clip) in clips.into_iter().enumerate() {
            let item = match self.extract_clip(extractor, clip) {
                Ok(buffer) => StagedClip {
                    clip,
                    buffer,
                    substituted: false,
                },
                Err(err) => {
                    if err.is_recoverable_per_clip() {
                        tracing::warn!(clip = %clip.id, error = %err, "extraction failed, using silence");
                    } else {
                        tracing::error!(clip = %clip.id, error = %err, "extractor error, using silence");
                    }
                    StagedClip {
                        clip,
                        buffer: extractor.silent_buffer(clip.duration, self.settings.sample_rate),
                        substituted: true,
                    }
                }
            };
            staged.push(item);
            job.emit(
                ExportStage::Extracting,
                (i + 1) as f64 / count as f64,
                format!("extracted clip '{}'", clip.id),
            );
        }

        if !job.enter(ExportStage::Processing) {
            return Ok(ExportOutcome::Cancelled);
        }
        let span = 1.0 / count as f64;
        for (i, item) in staged.iter_mut().enumerate() {
            if item.substituted {
                continue;
            }
            let mut host = job.host(ExportStage::Processing, i as f64 * span, span);
            match self.resolve_speed(item.clip, &item.buffer, &mut host) {
                Some(buffer) => item.buffer = buffer,
                None => {
                    tracing::info!(clip = %item.clip.id, "export cancelled while stretching");
                    return Ok(ExportOutcome::Cancelled);
                }
            }
        }

        if !job.enter(ExportStage::Effects) {
            return Ok(ExportOutcome::Cancelled);
        }
        for (i, item) in staged.iter_mut().enumerate() {
            if !item.substituted {
                let clip = item.clip;
                item.buffer = self.effects.render_effects(
                    &item.buffer,
                    &clip.effects,
                    &clip.keyframes,
                    clip.duration,
                )?;
            }
            job.emit(
                ExportStage::Effects,
                (i + 1) as f64 / count as f64,
                format!("effects for clip '{}'", item.clip.id),
            );
        }

        if !job.enter(ExportStage::Mixing) {
            return Ok(ExportOutcome::Cancelled);
        }
        let tracks = staged
            .iter()
            .map(|item| track_data(timeline, window, item))
            .collect::<Vec<_>>();
        drop(staged);
        let mixed = self.mixer.mix_tracks(&tracks, window.duration(), &mut |f| {
            job.emit(ExportStage::Mixing, f, "mixing")
        })?;
        tracing::info!(clips = count, frames = mixed.len(), "mix rendered");
        Ok(ExportOutcome::Complete(mixed))
    }

    fn extract_clip(&self, extractor: &mut dyn Extractor, clip: &Clip) -> MixdownResult<SharedPcm> {
        let Some(path) = clip.source.audio_path() else {
            return Err(MixdownError::extraction(format!(
                "clip '{}' has no audio source",
                clip.id
            )));
        };
        let key = path.to_string_lossy();
        let raw = extractor.extract(path, Some(key.as_ref()))?;
        let span = if keyframes_for(&clip.keyframes, SPEED_PROPERTY).len() >= 2 {
            let extent = source_extent(&clip.keyframes, clip.speed, clip.duration);
            clip.out_point
                .map_or(extent, |out| (out - clip.in_point).max(extent))
        } else {
            clip.source_out() - clip.in_point
        };
        tracing::debug!(clip = %clip.id, in_point = clip.in_point, span, "trimming source");
        Ok(extractor.trim(&raw, clip.in_point, clip.in_point + span))
    }

    /// Apply the clip's speed to its trimmed source; `None` when the host cancels.
    fn resolve_speed(
        &self,
        clip: &Clip,
        buffer: &SharedPcm,
        host: &mut dyn TaskHost,
    ) -> Option<SharedPcm> {
        let preserve_pitch = clip
            .preserve_pitch
            .unwrap_or(self.settings.time_stretch.preserve_pitch);
        let speed_keys = keyframes_for(&clip.keyframes, SPEED_PROPERTY);
        if speed_keys.len() >= 2 {
            return self.stretcher.process_with_keyframes(
                buffer,
                &speed_keys,
                clip.speed,
                clip.duration,
                preserve_pitch,
                host,
            );
        }

        let speed = speed_keys.first().map_or(clip.speed, |k| k.value);
        host.report(1.0);
        if (speed - 1.0).abs() <= STATIC_SPEED_EPSILON {
            tracing::debug!(clip = %clip.id, "unity speed, passing through");
            return Some(Arc::clone(buffer));
        }
        let out = self
            .stretcher
            .process_constant_speed(buffer, speed.abs(), preserve_pitch);
        if speed < 0.0 {
            let mut reversed = (*out).clone();
            reversed.reverse();
            return Some(Arc::new(reversed));
        }
        Some(out)
    }
}

fn track_data(timeline: &Timeline, window: TimeWindow, item: &StagedClip<'_>) -> AudioTrackData {
    let clip = item.clip;
    let track = timeline.track(&clip.track_id);
    let offset = clip.start_time - window.start;
    // Clips that begin before the window start mid-way through their audio.
    let (buffer, start_time) = if offset < 0.0 {
        (Arc::new(trim(&item.buffer, -offset, f64::INFINITY)), 0.0)
    } else {
        (Arc::clone(&item.buffer), offset)
    };
    AudioTrackData {
        clip_id: clip.id.clone(),
        buffer: Some(buffer),
        start_time,
        track_id: clip.track_id.clone(),
        track_muted: track.is_some_and(|t| t.muted),
        track_solo: track.is_some_and(|t| t.solo),
        clip_volume: Some(clip.volume),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/mod.rs"]
mod tests;
