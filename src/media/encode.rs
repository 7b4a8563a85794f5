use crate::audio::buffer::PcmBuffer;
use crate::foundation::error::{MixdownError, MixdownResult};
use crate::pipeline::task::TaskHost;

/// Samples per channel handed to an encoder in one write.
pub const ENCODE_FRAME_SIZE: usize = 1024;
/// Encoders yield to the host after this many frame writes.
pub const YIELD_EVERY_FRAMES: usize = 100;

/// Delivery codecs, in the order they are usually preferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// AAC-LC in ADTS framing.
    Aac,
    /// Opus in Ogg pages.
    Opus,
}

impl AudioCodec {
    /// Widely compatible codec first, open fallback second.
    pub const DEFAULT_PREFERENCE: [AudioCodec; 2] = [AudioCodec::Aac, AudioCodec::Opus];

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Opus => "opus",
        }
    }

    /// Conventional file extension for the raw stream.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Opus => "ogg",
        }
    }
}

impl std::fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Output format handed to [`Encoder::configure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Negotiated codec.
    pub codec: AudioCodec,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: usize,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
}

/// Description of an encoded stream.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct EncodedMetadata {
    /// Codec used.
    pub codec: AudioCodec,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: usize,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
}

/// Finalized encoder output.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedAudio {
    /// Codec frames (ADTS) or pages (Ogg), in stream order.
    pub chunks: Vec<Vec<u8>>,
    /// Stream description.
    pub metadata: EncodedMetadata,
    /// Encoded duration in seconds.
    pub duration: f64,
    /// Codec used.
    pub codec: AudioCodec,
}

impl EncodedAudio {
    /// Concatenated stream bytes, ready to write to a file.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.chunks.concat()
    }

    /// Total encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

/// Perceptual encoder for the final mix.
pub trait Encoder: Send {
    /// First codec in `preference` this encoder can produce, if any.
    fn is_supported(&mut self, preference: &[AudioCodec]) -> Option<AudioCodec>;

    /// Prepare an encode session.
    fn configure(&mut self, config: &EncoderConfig) -> MixdownResult<()>;

    /// Encode `buffer` in [`ENCODE_FRAME_SIZE`] frames, yielding to `host` every
    /// [`YIELD_EVERY_FRAMES`] frames and stopping early once it reports cancellation.
    fn encode(&mut self, buffer: &PcmBuffer, host: &mut dyn TaskHost) -> MixdownResult<()>;

    /// Finish the session and return the encoded stream.
    fn finalize(&mut self) -> MixdownResult<EncodedAudio>;

    /// Discard any open session without producing output. A no-op when nothing is open.
    fn abort(&mut self) {}
}

/// In-memory encoder for tests and debugging.
///
/// "Encodes" to raw interleaved `f32le` chunks of [`ENCODE_FRAME_SIZE`] frames and keeps the PCM
/// it received.
#[derive(Debug, Clone)]
pub struct InMemoryEncoder {
    supported: Vec<AudioCodec>,
    config: Option<EncoderConfig>,
    chunks: Vec<Vec<u8>>,
    frames: usize,
    received: Vec<Vec<f32>>,
}

impl Default for InMemoryEncoder {
    fn default() -> Self {
        Self::with_codecs(&AudioCodec::DEFAULT_PREFERENCE)
    }
}

impl InMemoryEncoder {
    /// Encoder supporting both codecs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder supporting only `codecs`; an empty list makes negotiation fail.
    pub fn with_codecs(codecs: &[AudioCodec]) -> Self {
        Self {
            supported: codecs.to_vec(),
            config: None,
            chunks: Vec::new(),
            frames: 0,
            received: Vec::new(),
        }
    }

    /// Configuration captured by `configure`, if any.
    pub fn config(&self) -> Option<EncoderConfig> {
        self.config
    }

    /// Planar PCM received since `configure`.
    pub fn received(&self) -> &[Vec<f32>] {
        &self.received
    }
}

impl Encoder for InMemoryEncoder {
    fn is_supported(&mut self, preference: &[AudioCodec]) -> Option<AudioCodec> {
        preference
            .iter()
            .copied()
            .find(|c| self.supported.contains(c))
    }

    fn configure(&mut self, config: &EncoderConfig) -> MixdownResult<()> {
        if !self.supported.contains(&config.codec) {
            return Err(MixdownError::CodecUnavailable(config.codec.to_string()));
        }
        self.config = Some(*config);
        self.chunks.clear();
        self.frames = 0;
        self.received = vec![Vec::new(); config.channels];
        Ok(())
    }

    fn encode(&mut self, buffer: &PcmBuffer, host: &mut dyn TaskHost) -> MixdownResult<()> {
        let Some(config) = self.config else {
            return Err(MixdownError::encoding("encoder is not configured"));
        };
        if buffer.channel_count() != config.channels {
            return Err(MixdownError::validation("channel count does not match encoder"));
        }
        let total = buffer.len();
        for (n, start) in (0..total).step_by(ENCODE_FRAME_SIZE).enumerate() {
            let end = (start + ENCODE_FRAME_SIZE).min(total);
            let mut chunk = Vec::with_capacity((end - start) * config.channels * 4);
            for i in start..end {
                for ch in buffer.channels() {
                    chunk.extend_from_slice(&ch[i].to_le_bytes());
                }
            }
            for (dst, src) in self.received.iter_mut().zip(buffer.channels()) {
                dst.extend_from_slice(&src[start..end]);
            }
            self.chunks.push(chunk);
            self.frames += end - start;
            host.report(end as f64 / total as f64);
            if (n + 1) % YIELD_EVERY_FRAMES == 0 {
                host.yield_now();
                if host.is_cancelled() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn finalize(&mut self) -> MixdownResult<EncodedAudio> {
        let Some(config) = self.config.take() else {
            return Err(MixdownError::encoding("encoder is not configured"));
        };
        Ok(EncodedAudio {
            chunks: std::mem::take(&mut self.chunks),
            metadata: EncodedMetadata {
                codec: config.codec,
                sample_rate: config.sample_rate,
                channels: config.channels,
                bitrate: config.bitrate,
            },
            duration: self.frames as f64 / f64::from(config.sample_rate),
            codec: config.codec,
        })
    }

    fn abort(&mut self) {
        self.config = None;
        self.chunks.clear();
        self.frames = 0;
        self.received.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/encode.rs"]
mod tests;
