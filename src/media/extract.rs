use crate::audio::buffer::SharedPcm;
use crate::foundation::error::MixdownResult;
use crate::media::Extractor;
use crate::media::ffmpeg::decode_audio;
use crate::media::wav::{is_wav_path, read_wav};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Extractor reading media files from disk.
///
/// WAV files are decoded at their native rate and layout; other formats go through ffmpeg at
/// `decode_rate` in stereo (feature `media-ffmpeg`).
#[derive(Debug)]
pub struct FileExtractor {
    decode_rate: u32,
    cache: HashMap<String, SharedPcm>,
}

impl Default for FileExtractor {
    fn default() -> Self {
        Self::new(48_000)
    }
}

impl FileExtractor {
    /// Extractor decoding non-WAV media at `decode_rate`.
    pub fn new(decode_rate: u32) -> Self {
        Self {
            decode_rate: decode_rate.max(1),
            cache: HashMap::new(),
        }
    }

    /// Number of cached decodes.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl Extractor for FileExtractor {
    fn extract(&mut self, source: &Path, cache_key: Option<&str>) -> MixdownResult<SharedPcm> {
        if let Some(hit) = cache_key.and_then(|k| self.cache.get(k)) {
            return Ok(Arc::clone(hit));
        }
        let pcm = if is_wav_path(source) {
            read_wav(source)?
        } else {
            decode_audio(source, self.decode_rate, 2)?
        };
        tracing::debug!(
            path = %source.display(),
            frames = pcm.len(),
            sample_rate = pcm.sample_rate(),
            "decoded source"
        );
        let pcm = Arc::new(pcm);
        if let Some(key) = cache_key {
            self.cache.insert(key.to_string(), Arc::clone(&pcm));
        }
        Ok(pcm)
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/extract.rs"]
mod tests;
