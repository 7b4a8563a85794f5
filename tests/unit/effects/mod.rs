use super::*;
use crate::audio::buffer::PcmBuffer;
use crate::foundation::math::db_to_gain;
use approx::assert_abs_diff_eq;

fn sine(freq: f64, rate: u32, frames: usize, amp: f32) -> SharedPcm {
    let data = (0..frames)
        .map(|i| amp * (2.0 * std::f64::consts::PI * freq * i as f64 / f64::from(rate)).sin() as f32)
        .collect::<Vec<_>>();
    Arc::new(PcmBuffer::new(rate, vec![data.clone(), data]).unwrap())
}

fn ones(rate: u32, frames: usize) -> SharedPcm {
    Arc::new(PcmBuffer::new(rate, vec![vec![1.0; frames]]).unwrap())
}

fn rms(samples: &[f32]) -> f64 {
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt()
}

#[test]
fn neutral_effects_return_the_same_buffer() {
    let r = AudioEffectRenderer::new();
    let buf = ones(1000, 100);
    assert!(Arc::ptr_eq(&buf, &r.render_effects(&buf, &[], &[], 0.1).unwrap()));

    let effects = [
        Effect::new("eq", EffectKind::AudioEq).with_param("band1k", 0.005),
        Effect::new("vol", EffectKind::AudioVolume).with_param(VOLUME_PARAM, 1.0),
        Effect::new("blur", EffectKind::Other).with_param("radius", 4.0),
    ];
    let unrelated = [Keyframe::new("effect.blur.radius", 0.0, 1.0)];
    let out = r.render_effects(&buf, &effects, &unrelated, 0.1).unwrap();
    assert!(Arc::ptr_eq(&buf, &out));
}

#[test]
fn disabled_effects_are_ignored() {
    let r = AudioEffectRenderer::new();
    let buf = ones(1000, 100);
    let mut vol = Effect::new("vol", EffectKind::AudioVolume).with_param(VOLUME_PARAM, 0.25);
    vol.enabled = false;
    let out = r.render_effects(&buf, &[vol], &[], 0.1).unwrap();
    assert!(Arc::ptr_eq(&buf, &out));
}

#[test]
fn static_volume_scales_samples() {
    let r = AudioEffectRenderer::new();
    let buf = ones(1000, 100);
    let vol = Effect::new("vol", EffectKind::AudioVolume).with_param(VOLUME_PARAM, 0.5);
    let out = r.render_effects(&buf, &[vol], &[], 0.1).unwrap();
    assert!(!Arc::ptr_eq(&buf, &out));
    assert!(out.channel(0).iter().all(|&s| s == 0.5));
}

#[test]
fn volume_keyframes_ramp_the_gain() {
    let r = AudioEffectRenderer::new();
    let buf = ones(1000, 1000);
    let vol = Effect::new("vol", EffectKind::AudioVolume);
    let keys = [
        Keyframe::new(effect_property("vol", VOLUME_PARAM), 0.0, 0.0),
        Keyframe::new(effect_property("vol", VOLUME_PARAM), 1.0, 1.0),
    ];
    let out = r.render_effects(&buf, &[vol], &keys, 1.0).unwrap();
    let ch = out.channel(0);
    assert_abs_diff_eq!(ch[0], automation::GAIN_FLOOR as f32, epsilon = 1e-6);
    assert_abs_diff_eq!(ch[500], 0.5, epsilon = 1e-3);
    assert_abs_diff_eq!(ch[999], 1.0, epsilon = 2e-3);
}

#[test]
fn eq_boost_lifts_its_band() {
    let r = AudioEffectRenderer::new();
    let buf = sine(1000.0, 48_000, 48_000, 0.1);
    let eq = Effect::new("eq", EffectKind::AudioEq).with_param("band1k", 12.0);
    let out = r.render_effects(&buf, &[eq], &[], 1.0).unwrap();
    assert_eq!(out.len(), buf.len());
    assert_eq!(out.channel_count(), 2);
    let ratio = rms(&out.channel(0)[24_000..]) / rms(&buf.channel(0)[24_000..]);
    assert_abs_diff_eq!(ratio, db_to_gain(12.0), epsilon = 0.1);
}

#[test]
fn eq_keyframes_force_rendering() {
    let r = AudioEffectRenderer::new();
    let buf = sine(1000.0, 48_000, 4_800, 0.1);
    let eq = Effect::new("eq", EffectKind::AudioEq);
    let keys = [
        Keyframe::new(effect_property("eq", "band1k"), 0.0, 0.0),
        Keyframe::new(effect_property("eq", "band1k"), 0.1, 12.0),
    ];
    let out = r.render_effects(&buf, &[eq], &keys, 0.1).unwrap();
    assert!(!Arc::ptr_eq(&buf, &out));
    assert!(out.peak() > buf.peak());
}

#[test]
fn standalone_gain_and_eq() {
    let buf = sine(1000.0, 48_000, 48_000, 0.5);
    assert!(Arc::ptr_eq(&buf, &apply_gain(&buf, 1.0)));
    let doubled = apply_gain(&buf, 2.0);
    assert_abs_diff_eq!(doubled.channel(1)[123], buf.channel(1)[123] * 2.0);

    assert!(Arc::ptr_eq(&buf, &apply_eq(&buf, &[0.0; 10]).unwrap()));
    let mut bands = [0.0; 10];
    bands[5] = -12.0;
    let cut = apply_eq(&buf, &bands).unwrap();
    let ratio = rms(&cut.channel(0)[24_000..]) / rms(&buf.channel(0)[24_000..]);
    assert_abs_diff_eq!(ratio, db_to_gain(-12.0), epsilon = 0.02);
}

#[test]
fn eq_default_detection_uses_band_names() {
    let mut params = BTreeMap::new();
    assert!(!eq_is_non_default(&params));
    params.insert("band1k".to_string(), 0.005);
    params.insert("presence".to_string(), 6.0);
    assert!(!eq_is_non_default(&params));
    params.insert("band16k".to_string(), -0.02);
    assert!(eq_is_non_default(&params));
    assert_eq!(eq_band_gains(&params)[9], -0.02);
}

#[test]
fn property_names_and_defaults() {
    assert_eq!(effect_property("eq1", "band1k"), "effect.eq1.band1k");
    assert_eq!(param_default(EffectKind::AudioVolume, VOLUME_PARAM), 1.0);
    assert_eq!(param_default(EffectKind::AudioEq, "band31"), 0.0);
}
