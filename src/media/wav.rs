//! WAV file IO via `hound`.

use crate::audio::buffer::PcmBuffer;
use crate::foundation::error::{MixdownError, MixdownResult};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Return `true` when `path` has a `.wav` extension.
pub fn is_wav_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

/// Decode a WAV file into planar float PCM.
///
/// Integer formats are scaled to `[-1, 1)`.
pub fn read_wav(path: &Path) -> MixdownResult<PcmBuffer> {
    let read_err = |e: hound::Error| {
        MixdownError::extraction(format!("failed to read wav '{}': {e}", path.display()))
    };
    let reader = WavReader::open(path).map_err(read_err)?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(MixdownError::extraction(format!(
            "wav '{}' declares zero channels",
            path.display()
        )));
    }

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(read_err)?
        }
    };

    PcmBuffer::from_interleaved(spec.sample_rate, usize::from(spec.channels), &samples)
        .map_err(|e| MixdownError::extraction(format!("wav '{}': {e}", path.display())))
}

/// Write `buffer` as a 32-bit float WAV file, creating parent directories.
pub fn write_wav(path: &Path, buffer: &PcmBuffer) -> MixdownResult<()> {
    let channels = u16::try_from(buffer.channel_count())
        .map_err(|_| MixdownError::validation("too many channels for wav output"))?;
    super::ffmpeg::ensure_parent_dir(path)?;

    let write_err = |e: hound::Error| {
        MixdownError::encoding(format!("failed to write wav '{}': {e}", path.display()))
    };
    let spec = WavSpec {
        channels,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).map_err(write_err)?;
    for sample in buffer.to_interleaved() {
        writer.write_sample(sample).map_err(write_err)?;
    }
    writer.finalize().map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/media/wav.rs"]
mod tests;
