use std::f64::consts::PI;

/// Normalized biquad coefficients (`a0` folded into the others).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Pass-through filter.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// RBJ cookbook peaking filter centered at `frequency` Hz.
    ///
    /// Flat bands, bands at or above Nyquist, and non-finite inputs pass through unchanged.
    pub fn peaking(frequency: f64, q: f64, gain_db: f64, sample_rate: u32) -> Self {
        let nyquist = f64::from(sample_rate) / 2.0;
        if !(frequency > 0.0 && frequency < nyquist)
            || !gain_db.is_finite()
            || gain_db == 0.0
            || q <= 0.0
        {
            return Self::IDENTITY;
        }
        let a = 10f64.powf(gain_db / 40.0);
        let omega = 2.0 * PI * frequency / f64::from(sample_rate);
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * q);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_omega) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_omega) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }

    /// Linear magnitude response at `frequency` Hz.
    pub fn magnitude_at(&self, frequency: f64, sample_rate: u32) -> f64 {
        let w = 2.0 * PI * frequency / f64::from(sample_rate);
        let (s1, c1) = w.sin_cos();
        let (s2, c2) = (2.0 * w).sin_cos();
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);
        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

/// Direct-form I state for one channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, input: f32, c: &BiquadCoeffs) -> f32 {
        let x = f64::from(input);
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y as f32
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/biquad.rs"]
mod tests;
