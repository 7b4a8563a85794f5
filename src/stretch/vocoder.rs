//! Phase vocoder used for pitch-preserving time-stretch.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

const TWO_PI: f64 = 2.0 * PI;

/// Pre-planned FFTs and analysis window for one frame size.
///
/// Plans are immutable and can be shared by any number of vocoder runs.
#[derive(Clone)]
pub struct VocoderPlan {
    fft_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    window: Arc<[f32]>,
}

impl std::fmt::Debug for VocoderPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VocoderPlan")
            .field("fft_size", &self.fft_size)
            .finish_non_exhaustive()
    }
}

impl VocoderPlan {
    /// Plan forward/inverse FFTs of `fft_size` (rounded up to a power of two, minimum 64).
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(64).next_power_of_two();
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        // Periodic Hann window; at 75% overlap its squared sum is constant.
        let window = (0..fft_size)
            .map(|i| (0.5 - 0.5 * (TWO_PI * i as f64 / fft_size as f64).cos()) as f32)
            .collect::<Vec<_>>();
        Self {
            fft_size,
            forward,
            inverse,
            window: window.into(),
        }
    }

    /// Frame size in samples.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Synthesis hop (a quarter frame).
    pub fn hop_size(&self) -> usize {
        self.fft_size / 4
    }
}

/// Time-scales audio by `tempo` while keeping pitch constant.
///
/// An instance carries no signal state between [`PhaseVocoder::process_planar`] calls.
#[derive(Clone, Debug)]
pub struct PhaseVocoder {
    plan: VocoderPlan,
    tempo: f64,
}

impl PhaseVocoder {
    /// Vocoder running at `tempo` (clamped to `[0.1, 10]`; `2.0` halves the duration).
    pub fn new(plan: VocoderPlan, tempo: f64) -> Self {
        let tempo = if tempo.is_finite() {
            tempo.clamp(0.1, 10.0)
        } else {
            1.0
        };
        Self { plan, tempo }
    }

    /// Current tempo ratio.
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Output frame count for `input_frames` input frames.
    pub fn output_len(&self, input_frames: usize) -> usize {
        (input_frames as f64 / self.tempo).round() as usize
    }

    /// Stretch planar channels independently.
    pub fn process_planar(&self, channels: &[Vec<f32>]) -> Vec<Vec<f32>> {
        channels.iter().map(|ch| self.stretch_channel(ch)).collect()
    }

    fn stretch_channel(&self, input: &[f32]) -> Vec<f32> {
        let out_len = self.output_len(input.len());
        if input.is_empty() || out_len == 0 {
            return vec![0.0; out_len];
        }

        let n = self.plan.fft_size;
        let half = n / 2;
        let hop_s = self.plan.hop_size();
        let hop_a = hop_s as f64 * self.tempo;
        let window = &self.plan.window;

        let frames = out_len / hop_s + 1;
        let mut out = vec![0.0f32; frames * hop_s + n];
        let mut norm = vec![0.0f32; out.len()];

        let mut prev_phase = vec![0.0f64; half + 1];
        let mut accum = vec![0.0f64; half + 1];
        let mut prev_pos: Option<i64> = None;
        let mut spectrum = vec![Complex::new(0.0f32, 0.0); n];

        for m in 0..frames {
            let pos = (m as f64 * hop_a).round() as i64;
            for (k, bin) in spectrum.iter_mut().enumerate() {
                let idx = pos + k as i64;
                let x = if idx >= 0 && (idx as usize) < input.len() {
                    input[idx as usize]
                } else {
                    0.0
                };
                *bin = Complex::new(x * window[k], 0.0);
            }
            self.plan.forward.process(&mut spectrum);

            let delta = prev_pos.map(|p| (pos - p) as f64);
            for k in 0..=half {
                let bin = spectrum[k];
                let mag = bin.norm();
                let phase = f64::from(bin.arg());
                let omega = TWO_PI * k as f64 / n as f64;
                accum[k] = match delta {
                    None => phase,
                    Some(d) if d > 0.0 => {
                        let dev = wrap_phase(phase - prev_phase[k] - omega * d);
                        accum[k] + (omega + dev / d) * hop_s as f64
                    }
                    Some(_) => accum[k] + omega * hop_s as f64,
                };
                prev_phase[k] = phase;
                spectrum[k] = Complex::from_polar(mag, accum[k] as f32);
            }
            for k in 1..half {
                spectrum[n - k] = spectrum[k].conj();
            }
            self.plan.inverse.process(&mut spectrum);

            let base = m * hop_s;
            let scale = 1.0 / n as f32;
            for k in 0..n {
                out[base + k] += spectrum[k].re * scale * window[k];
                norm[base + k] += window[k] * window[k];
            }
            prev_pos = Some(pos);
        }

        out.truncate(out_len);
        for (s, w) in out.iter_mut().zip(&norm) {
            if *w > 1e-3 {
                *s /= w;
            }
        }
        out
    }
}

fn wrap_phase(p: f64) -> f64 {
    p - TWO_PI * (p / TWO_PI).round()
}

#[cfg(test)]
#[path = "../../tests/unit/stretch/vocoder.rs"]
mod tests;
