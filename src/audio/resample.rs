use crate::audio::buffer::{PcmBuffer, SharedPcm};
use crate::foundation::error::{MixdownError, MixdownResult};
use rubato::{FftFixedInOut, Resampler};
use std::sync::Arc;

const RESAMPLE_CHUNK: usize = 1024;

/// Band-limited sample-rate conversion of `buffer` to `target_rate`.
///
/// Matching rates return the same handle. The output has exactly
/// `ceil(len * target_rate / source_rate)` frames and is aligned with the input (the resampler's
/// group delay is removed).
pub fn resample(buffer: &SharedPcm, target_rate: u32) -> MixdownResult<SharedPcm> {
    if target_rate == 0 {
        return Err(MixdownError::validation("target sample rate must be non-zero"));
    }
    let source_rate = buffer.sample_rate();
    if source_rate == target_rate {
        return Ok(Arc::clone(buffer));
    }

    let frames = buffer.len();
    let n_ch = buffer.channel_count();
    let expected = expected_len(frames, source_rate, target_rate);
    if frames == 0 {
        return Ok(Arc::new(PcmBuffer::silent(target_rate, n_ch, 0)));
    }

    let mut resampler = FftFixedInOut::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        RESAMPLE_CHUNK,
        n_ch,
    )
    .map_err(|e| MixdownError::processing(format!("resampler setup failed: {e}")))?;

    let chunk = resampler.input_frames_next();
    let delay = resampler.output_delay();
    let wanted = expected + delay;

    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted); n_ch];
    let mut scratch: Vec<Vec<f32>> = vec![vec![0.0; chunk]; n_ch];
    let mut pos = 0usize;
    while output[0].len() < wanted {
        // Past the end of the input the chunk is zero padded, which also flushes the delay line.
        for (dst, src) in scratch.iter_mut().zip(buffer.channels()) {
            dst.fill(0.0);
            if pos < frames {
                let end = (pos + chunk).min(frames);
                dst[..end - pos].copy_from_slice(&src[pos..end]);
            }
        }
        let resampled = resampler
            .process(&scratch, None)
            .map_err(|e| MixdownError::processing(format!("resampling failed: {e}")))?;
        for (out, data) in output.iter_mut().zip(resampled) {
            out.extend(data);
        }
        pos += chunk;
    }

    let channels = output
        .into_iter()
        .map(|mut ch| {
            ch.drain(..delay.min(ch.len()));
            ch.truncate(expected);
            ch
        })
        .collect();
    Ok(Arc::new(PcmBuffer::new(target_rate, channels)?))
}

/// Output length produced by [`resample`] for `frames` input frames.
pub fn expected_len(frames: usize, source_rate: u32, target_rate: u32) -> usize {
    let num = frames as u128 * u128::from(target_rate);
    let den = u128::from(source_rate.max(1));
    num.div_ceil(den) as usize
}

#[cfg(test)]
#[path = "../../tests/unit/audio/resample.rs"]
mod tests;
