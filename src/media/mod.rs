//! Decode and encode collaborators consumed by the export pipeline.

pub(crate) mod encode;
pub(crate) mod extract;
pub(crate) mod ffmpeg;
pub(crate) mod wav;

use crate::audio::buffer::{PcmBuffer, SharedPcm, to_stereo, trim};
use crate::audio::resample::resample;
use crate::foundation::error::MixdownResult;
use std::path::Path;
use std::sync::Arc;

/// Decodes sources into PCM and offers the buffer conversions the pipeline needs.
pub trait Extractor {
    /// Decode `source` to PCM; `cache_key` lets implementations reuse earlier decodes.
    ///
    /// Sources without audio yield a short silent buffer rather than an error.
    fn extract(&mut self, source: &Path, cache_key: Option<&str>) -> MixdownResult<SharedPcm>;

    /// Cut `buffer` to `[start, end)` seconds.
    fn trim(&self, buffer: &SharedPcm, start: f64, end: f64) -> SharedPcm {
        if start <= 0.0 && end >= buffer.duration() {
            return Arc::clone(buffer);
        }
        Arc::new(trim(buffer, start, end))
    }

    /// Convert `buffer` to `target_rate`.
    fn resample(&self, buffer: &SharedPcm, target_rate: u32) -> MixdownResult<SharedPcm> {
        resample(buffer, target_rate)
    }

    /// Stereo version of `buffer`.
    fn to_stereo(&self, buffer: &SharedPcm) -> SharedPcm {
        to_stereo(buffer)
    }

    /// Stereo silence lasting `duration` seconds.
    fn silent_buffer(&self, duration: f64, sample_rate: u32) -> SharedPcm {
        Arc::new(PcmBuffer::silent_for(duration, sample_rate, 2))
    }

    /// Drop any cached decodes.
    fn clear_cache(&mut self) {}
}

#[cfg(test)]
#[path = "../../tests/unit/media/mod.rs"]
mod tests;
