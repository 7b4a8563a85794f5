use std::io::{Read as _, Write as _};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::audio::buffer::PcmBuffer;
use crate::foundation::error::{MixdownError, MixdownResult};
use crate::media::encode::{
    AudioCodec, ENCODE_FRAME_SIZE, EncodedAudio, EncodedMetadata, Encoder, EncoderConfig,
    YIELD_EVERY_FRAMES,
};
use crate::pipeline::task::TaskHost;

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> MixdownResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Decode any ffmpeg-readable file to `channels` channels at `sample_rate`.
///
/// Files without an audio stream decode to a one-frame silent buffer.
#[cfg(feature = "media-ffmpeg")]
pub fn decode_audio(path: &Path, sample_rate: u32, channels: usize) -> MixdownResult<PcmBuffer> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            &channels.to_string(),
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| {
            MixdownError::extraction(format!("failed to run ffmpeg for audio decode: {e}"))
        })?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // ffmpeg reports a missing audio stream as an error; treat it as a silent source.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
            || msg.contains("does not contain any stream")
        {
            return Ok(PcmBuffer::silent(sample_rate, channels, 1));
        }
        return Err(MixdownError::extraction(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(MixdownError::extraction(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let pcm = out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect::<Vec<_>>();
    if pcm.is_empty() {
        return Ok(PcmBuffer::silent(sample_rate, channels, 1));
    }
    PcmBuffer::from_interleaved(sample_rate, channels, &pcm)
}

/// Decode any ffmpeg-readable file; unavailable without the `media-ffmpeg` feature.
#[cfg(not(feature = "media-ffmpeg"))]
pub fn decode_audio(path: &Path, _sample_rate: u32, _channels: usize) -> MixdownResult<PcmBuffer> {
    Err(MixdownError::extraction(format!(
        "decoding '{}' requires the 'media-ffmpeg' feature",
        path.display()
    )))
}

/// ffmpeg encoder names able to produce `codec`, most preferred first.
pub fn encoder_names(codec: AudioCodec) -> &'static [&'static str] {
    match codec {
        AudioCodec::Aac => &["aac", "libfdk_aac"],
        AudioCodec::Opus => &["libopus", "opus"],
    }
}

/// Audio encoder names from `ffmpeg -encoders` output.
pub fn parse_encoder_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            // Capability column is six characters wide; audio encoders start with 'A'.
            (flags.len() == 6 && flags.starts_with('A') && name != "=").then(|| name.to_string())
        })
        .collect()
}

/// Split an ADTS stream into frames using each header's 13-bit frame length.
pub fn split_adts_frames(data: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut pos = 0usize;
    while pos + 7 <= data.len() {
        let h = &data[pos..];
        if h[0] != 0xFF || h[1] & 0xF0 != 0xF0 {
            pos += 1;
            continue;
        }
        let len = (usize::from(h[3] & 0x03) << 11)
            | (usize::from(h[4]) << 3)
            | usize::from(h[5] >> 5);
        if len < 7 || pos + len > data.len() {
            break;
        }
        frames.push(data[pos..pos + len].to_vec());
        pos += len;
    }
    frames
}

/// Split an Ogg stream into pages.
pub fn split_ogg_pages(data: &[u8]) -> Vec<Vec<u8>> {
    const HEADER: usize = 27;
    let mut pages = Vec::new();
    let mut pos = 0usize;
    while pos + HEADER <= data.len() {
        if &data[pos..pos + 4] != b"OggS" {
            pos += 1;
            continue;
        }
        let segments = usize::from(data[pos + 26]);
        let table_end = pos + HEADER + segments;
        if table_end > data.len() {
            break;
        }
        let body: usize = data[pos + HEADER..table_end]
            .iter()
            .map(|&b| usize::from(b))
            .sum();
        let end = table_end + body;
        if end > data.len() {
            break;
        }
        pages.push(data[pos..end].to_vec());
        pos = end;
    }
    pages
}

type Reader = JoinHandle<std::io::Result<Vec<u8>>>;

struct Session {
    config: EncoderConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<Reader>,
    stderr_drain: Option<Reader>,
    frames_written: usize,
    reaped: bool,
}

/// Tears down a session that never reached a clean `finalize`.
impl Drop for Session {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if !self.reaped {
            if let Err(e) = self.child.kill() {
                tracing::debug!(error = %e, "ffmpeg already exited");
            }
            if let Err(e) = self.child.wait() {
                tracing::warn!(error = %e, "failed to reap ffmpeg");
            }
        }
        for reader in [self.stdout.take(), self.stderr_drain.take()]
            .into_iter()
            .flatten()
        {
            let _ = reader.join();
        }
    }
}

fn join_reader(reader: Option<Reader>, stream: &str) -> MixdownResult<Vec<u8>> {
    let Some(reader) = reader else {
        return Err(MixdownError::encoding(format!("ffmpeg {stream} was already read")));
    };
    reader
        .join()
        .map_err(|_| MixdownError::encoding(format!("ffmpeg {stream} reader panicked")))?
        .map_err(|e| MixdownError::encoding(format!("failed to read ffmpeg {stream}: {e}")))
}

/// Encoder driving the system `ffmpeg` binary through stdin/stdout pipes.
#[derive(Default)]
pub struct FfmpegEncoder {
    available: Option<Vec<String>>,
    session: Option<Session>,
}

impl std::fmt::Debug for FfmpegEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegEncoder")
            .field("available", &self.available)
            .field("configured", &self.session.as_ref().map(|s| s.config))
            .finish()
    }
}

impl FfmpegEncoder {
    /// Encoder that probes `ffmpeg -encoders` on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `true` when ffmpeg lists an encoder for `codec`.
    pub fn supports(&mut self, codec: AudioCodec) -> bool {
        self.encoder_for(codec).is_some()
    }

    fn available(&mut self) -> &[String] {
        self.available.get_or_insert_with(|| {
            Command::new("ffmpeg")
                .args(["-hide_banner", "-encoders"])
                .stderr(Stdio::null())
                .output()
                .ok()
                .filter(|o| o.status.success())
                .map(|o| parse_encoder_list(&String::from_utf8_lossy(&o.stdout)))
                .unwrap_or_default()
        })
    }

    fn encoder_for(&mut self, codec: AudioCodec) -> Option<&'static str> {
        let available = self.available();
        encoder_names(codec)
            .iter()
            .copied()
            .find(|name| available.iter().any(|a| a == name))
    }
}

impl Encoder for FfmpegEncoder {
    fn is_supported(&mut self, preference: &[AudioCodec]) -> Option<AudioCodec> {
        preference
            .iter()
            .copied()
            .find(|&codec| self.encoder_for(codec).is_some())
    }

    fn configure(&mut self, config: &EncoderConfig) -> MixdownResult<()> {
        if config.sample_rate == 0 || config.channels == 0 {
            return Err(MixdownError::validation(
                "encoder sample_rate and channels must be non-zero",
            ));
        }
        let encoder = self
            .encoder_for(config.codec)
            .ok_or_else(|| MixdownError::CodecUnavailable(config.codec.to_string()))?;
        let format = match config.codec {
            AudioCodec::Aac => "adts",
            AudioCodec::Opus => "ogg",
        };

        let mut child = Command::new("ffmpeg")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .args(["-loglevel", "error", "-f", "f32le", "-ar"])
            .arg(config.sample_rate.to_string())
            .arg("-ac")
            .arg(config.channels.to_string())
            .args(["-i", "pipe:0", "-c:a", encoder, "-b:a"])
            .arg(config.bitrate.to_string())
            .args(["-f", format, "pipe:1"])
            .spawn()
            .map_err(|e| {
                MixdownError::encoding(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MixdownError::encoding("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| MixdownError::encoding("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| MixdownError::encoding("failed to open ffmpeg stderr (unexpected)"))?;
        let stdout = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stdout.read_to_end(&mut bytes)?;
            Ok::<_, std::io::Error>(bytes)
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok::<_, std::io::Error>(bytes)
        });

        tracing::debug!(codec = %config.codec, encoder, "ffmpeg encoder configured");
        self.session = Some(Session {
            config: *config,
            child,
            stdin: Some(stdin),
            stdout: Some(stdout),
            stderr_drain: Some(stderr_drain),
            frames_written: 0,
            reaped: false,
        });
        Ok(())
    }

    fn encode(&mut self, buffer: &PcmBuffer, host: &mut dyn TaskHost) -> MixdownResult<()> {
        let Some(session) = self.session.as_mut() else {
            return Err(MixdownError::encoding("encoder is not configured"));
        };
        if buffer.channel_count() != session.config.channels
            || buffer.sample_rate() != session.config.sample_rate
        {
            return Err(MixdownError::validation(format!(
                "buffer format {} Hz x{} does not match encoder {} Hz x{}",
                buffer.sample_rate(),
                buffer.channel_count(),
                session.config.sample_rate,
                session.config.channels
            )));
        }
        let Some(stdin) = session.stdin.as_mut() else {
            return Err(MixdownError::encoding("ffmpeg encoder is already finalized"));
        };

        let total = buffer.len();
        let mut bytes = Vec::with_capacity(ENCODE_FRAME_SIZE * buffer.channel_count() * 4);
        for (n, start) in (0..total).step_by(ENCODE_FRAME_SIZE).enumerate() {
            let end = (start + ENCODE_FRAME_SIZE).min(total);
            bytes.clear();
            for i in start..end {
                for ch in buffer.channels() {
                    bytes.extend_from_slice(&ch[i].to_le_bytes());
                }
            }
            stdin.write_all(&bytes).map_err(|e| {
                MixdownError::encoding(format!("failed to write audio to ffmpeg stdin: {e}"))
            })?;
            session.frames_written += end - start;
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
        let Some(mut session) = self.session.take() else {
            return Err(MixdownError::encoding("encoder is not configured"));
        };
        drop(session.stdin.take());

        let data = join_reader(session.stdout.take(), "stdout")?;
        let status = session.child.wait().map_err(|e| {
            MixdownError::encoding(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        session.reaped = true;
        let stderr_bytes = join_reader(session.stderr_drain.take(), "stderr")?;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(MixdownError::encoding(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        let config = session.config;
        let chunks = match config.codec {
            AudioCodec::Aac => split_adts_frames(&data),
            AudioCodec::Opus => split_ogg_pages(&data),
        };
        Ok(EncodedAudio {
            chunks,
            metadata: EncodedMetadata {
                codec: config.codec,
                sample_rate: config.sample_rate,
                channels: config.channels,
                bitrate: config.bitrate,
            },
            duration: session.frames_written as f64 / f64::from(config.sample_rate),
            codec: config.codec,
        })
    }

    fn abort(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!(
                frames = session.frames_written,
                "discarding unfinished ffmpeg session"
            );
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/ffmpeg.rs"]
mod tests;
