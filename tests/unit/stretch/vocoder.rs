use super::*;

fn sine(freq: f32, rate: f32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin() * 0.5)
        .collect()
}

fn zero_crossings(x: &[f32]) -> usize {
    x.windows(2)
        .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
        .count()
}

#[test]
fn output_length_tracks_tempo() {
    let plan = VocoderPlan::new(1024);
    let input = sine(440.0, 48_000.0, 4_800);
    assert_eq!(
        PhaseVocoder::new(plan.clone(), 2.0).process_planar(&[input.clone()])[0].len(),
        2_400
    );
    assert_eq!(
        PhaseVocoder::new(plan, 0.5).process_planar(&[input])[0].len(),
        9_600
    );
}

#[test]
fn slowing_down_keeps_the_pitch() {
    let rate = 48_000.0;
    let input = sine(440.0, rate, 48_000);
    let out = PhaseVocoder::new(VocoderPlan::new(2048), 0.5).process_planar(&[input])[0].clone();
    assert_eq!(out.len(), 96_000);
    let mid = &out[9_600..86_400];
    let secs = mid.len() as f32 / rate;
    let freq = zero_crossings(mid) as f32 / 2.0 / secs;
    assert!((freq - 440.0).abs() < 440.0 * 0.05, "estimated {freq} Hz");
}

#[test]
fn unity_tempo_preserves_level() {
    let input = sine(1000.0, 48_000.0, 24_000);
    let out = PhaseVocoder::new(VocoderPlan::new(1024), 1.0).process_planar(&[input])[0].clone();
    let peak = out[4_800..19_200].iter().fold(0.0f32, |a, s| a.max(s.abs()));
    assert!((peak - 0.5).abs() < 0.05, "peak {peak}");
}

#[test]
fn planar_keeps_channels_apart() {
    let l = sine(440.0, 48_000.0, 4_800);
    let r = vec![0.0; 4_800];
    let out = PhaseVocoder::new(VocoderPlan::new(1024), 2.0).process_planar(&[l, r]);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].len(), 2_400);
    assert_eq!(out[1].len(), 2_400);
    assert!(out[1].iter().all(|&s| s == 0.0));
}

#[test]
fn empty_input_and_odd_plan_sizes_are_safe() {
    let plan = VocoderPlan::new(1000);
    assert_eq!(plan.fft_size(), 1024);
    assert_eq!(plan.hop_size(), 256);
    let voc = PhaseVocoder::new(plan, f64::NAN);
    assert_eq!(voc.tempo(), 1.0);
    assert!(voc.process_planar(&[Vec::new()])[0].is_empty());
}
