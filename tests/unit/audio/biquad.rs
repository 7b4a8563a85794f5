use super::*;
use approx::assert_abs_diff_eq;

#[test]
fn peaking_hits_gain_at_center() {
    let c = BiquadCoeffs::peaking(1000.0, 1.4, 6.0, 48_000);
    let db = 20.0 * c.magnitude_at(1000.0, 48_000).log10();
    assert_abs_diff_eq!(db, 6.0, epsilon = 0.05);
    let far = 20.0 * c.magnitude_at(60.0, 48_000).log10();
    assert!(far.abs() < 0.5, "far-band response {far}");
}

#[test]
fn zero_gain_is_transparent() {
    let c = BiquadCoeffs::peaking(250.0, 1.4, 0.0, 48_000);
    assert_eq!(c, BiquadCoeffs::IDENTITY);
    let mut st = BiquadState::default();
    for x in [0.5f32, -0.25, 0.125, 1.0, 0.0] {
        assert_abs_diff_eq!(st.process(x, &c), x, epsilon = 1e-6);
    }
}

#[test]
fn band_above_nyquist_passes_through() {
    let c = BiquadCoeffs::peaking(16_000.0, 1.4, 12.0, 22_050);
    assert_eq!(c, BiquadCoeffs::IDENTITY);
}

#[test]
fn cut_attenuates_a_tone_at_center() {
    let sr = 48_000;
    let c = BiquadCoeffs::peaking(1000.0, 1.4, -12.0, sr);
    let mut st = BiquadState::default();
    let mut peak = 0.0f32;
    for i in 0..sr as usize {
        let x = (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sr as f32).sin();
        let y = st.process(x, &c);
        if i > 4_800 {
            peak = peak.max(y.abs());
        }
    }
    assert_abs_diff_eq!(peak, 0.251, epsilon = 0.01);
}
