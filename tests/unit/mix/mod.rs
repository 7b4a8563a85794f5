use super::*;
use approx::assert_abs_diff_eq;
use std::sync::Arc;

fn mono(rate: u32, data: Vec<f32>) -> SharedPcm {
    Arc::new(PcmBuffer::new(rate, vec![data]).unwrap())
}

fn constant(rate: u32, frames: usize, value: f32) -> SharedPcm {
    mono(rate, vec![value; frames])
}

fn track(id: &str, buffer: Option<SharedPcm>, start_time: f64) -> AudioTrackData {
    AudioTrackData {
        clip_id: id.to_string(),
        buffer,
        start_time,
        track_id: format!("t-{id}"),
        track_muted: false,
        track_solo: false,
        clip_volume: None,
    }
}

fn mixer(settings: MixerSettings) -> AudioMixer {
    AudioMixer::new(settings).unwrap()
}

fn no_progress() -> impl FnMut(f64) {
    |_| {}
}

#[test]
fn default_settings() {
    let s = MixerSettings::default();
    assert_eq!(s.sample_rate, 48_000);
    assert_eq!(s.channels, 2);
    assert!(!s.normalize);
    assert_eq!(s.headroom_db, -1.0);
    assert!(AudioMixer::new(MixerSettings {
        channels: 0,
        ..s
    })
    .is_err());
}

#[test]
fn solo_is_exclusive_and_mute_wins() {
    let buf = constant(48_000, 10, 0.1);
    let mut tracks = vec![
        track("a", Some(Arc::clone(&buf)), 0.0),
        track("b", Some(Arc::clone(&buf)), 0.0),
        track("c", Some(Arc::clone(&buf)), 0.0),
    ];
    tracks[1].track_solo = true;
    let active = resolve_active_tracks(&tracks);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].clip_id, "b");

    tracks[1].track_muted = true;
    assert!(resolve_active_tracks(&tracks).is_empty());
}

#[test]
fn missing_and_empty_buffers_are_inactive() {
    let tracks = vec![
        track("none", None, 0.0),
        track("empty", Some(constant(48_000, 0, 0.0)), 0.0),
        track("ok", Some(constant(48_000, 4, 0.1)), 0.0),
    ];
    let active = resolve_active_tracks(&tracks);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].clip_id, "ok");
}

#[test]
fn nothing_active_mixes_silence() {
    let mut progress = Vec::new();
    let out = mixer(MixerSettings::default())
        .mix_tracks(&[track("none", None, 0.0)], 1.0, &mut |p| progress.push(p))
        .unwrap();
    assert_eq!(out.len(), 48_000);
    assert_eq!(out.channel_count(), 2);
    assert_eq!(out.peak(), 0.0);
    assert_eq!(progress.last().copied(), Some(1.0));
}

#[test]
fn single_stereo_track_is_bit_exact() {
    let left = (0..480).map(|i| (i as f32 / 480.0) - 0.5).collect::<Vec<_>>();
    let right = left.iter().map(|s| -s).collect::<Vec<_>>();
    let buf = Arc::new(PcmBuffer::new(48_000, vec![left, right]).unwrap());
    let out = mixer(MixerSettings::default())
        .mix_tracks(&[track("a", Some(Arc::clone(&buf)), 0.0)], 0.01, &mut no_progress())
        .unwrap();
    assert_eq!(out.channels(), buf.channels());
}

#[test]
fn overlapping_tracks_add_at_their_offsets() {
    let tracks = vec![
        track("a", Some(constant(1000, 500, 0.25)), 0.0),
        track("b", Some(constant(1000, 500, 0.25)), 0.25),
        track("early", Some(constant(1000, 100, 0.125)), -1.0),
    ];
    let settings = MixerSettings {
        sample_rate: 1000,
        ..MixerSettings::default()
    };
    let out = mixer(settings)
        .mix_tracks(&tracks, 1.0, &mut no_progress())
        .unwrap();
    assert_eq!(out.len(), 1000);
    for ch in out.channels() {
        assert_eq!(ch[50], 0.375);
        assert_eq!(ch[200], 0.25);
        assert_eq!(ch[300], 0.5);
        assert_eq!(ch[600], 0.25);
        assert_eq!(ch[800], 0.0);
    }
}

#[test]
fn clip_volume_is_clamped() {
    let mut loud = track("loud", Some(constant(1000, 10, 0.25)), 0.0);
    loud.clip_volume = Some(3.0);
    let mut neg = track("neg", Some(constant(1000, 10, 0.25)), 0.0);
    neg.clip_volume = Some(-1.0);
    let settings = MixerSettings {
        sample_rate: 1000,
        channels: 1,
        ..MixerSettings::default()
    };
    let out = mixer(settings)
        .mix_tracks(&[loud, neg], 0.01, &mut no_progress())
        .unwrap();
    assert!(out.channel(0).iter().all(|&s| s == 0.5));
}

#[test]
fn tracks_are_resampled_to_the_output_rate() {
    let tracks = vec![track("low", Some(constant(24_000, 12_000, 0.5)), 0.0)];
    let out = mixer(MixerSettings::default())
        .mix_tracks(&tracks, 1.0, &mut no_progress())
        .unwrap();
    assert_eq!(out.len(), 48_000);
    assert_abs_diff_eq!(out.channel(0)[12_000], 0.5, epsilon = 0.01);
    assert_abs_diff_eq!(out.channel(1)[12_000], 0.5, epsilon = 0.01);
    assert_eq!(out.channel(0)[40_000], 0.0);
}

#[test]
fn normalization_only_attenuates() {
    let settings = MixerSettings {
        sample_rate: 1000,
        channels: 1,
        normalize: true,
        ..MixerSettings::default()
    };
    let hot = vec![track("hot", Some(constant(1000, 10, 1.5)), 0.0)];
    let out = mixer(settings)
        .mix_tracks(&hot, 0.01, &mut no_progress())
        .unwrap();
    assert_abs_diff_eq!(f64::from(out.peak()), db_to_gain(-1.0), epsilon = 1e-6);

    let quiet = vec![track("quiet", Some(constant(1000, 10, 0.3)), 0.0)];
    let out = mixer(settings)
        .mix_tracks(&quiet, 0.01, &mut no_progress())
        .unwrap();
    assert_eq!(out.peak(), 0.3);
}

#[test]
fn normalization_gain_thresholds() {
    assert!(normalization_gain(0.95, -1.0).is_some_and(|g| g < 1.0));
    assert_eq!(normalization_gain(0.3, -1.0), None);
    assert_eq!(normalization_gain(0.0, -1.0), None);

    let mut silent = PcmBuffer::silent(1000, 2, 10);
    assert_eq!(normalize_peak(&mut silent, -1.0), 1.0);
    assert_eq!(silent.peak(), 0.0);
}

#[test]
fn level_literals() {
    let b = mono(1000, vec![0.0, 0.5, 1.0, -0.5, 0.0]);
    assert_abs_diff_eq!(peak_level_db(&b), 0.0, epsilon = 0.1);
    let b = mono(1000, vec![0.5, -0.25, 0.1]);
    assert_abs_diff_eq!(peak_level_db(&b), -6.02, epsilon = 0.01);
}

#[test]
fn rms_never_exceeds_peak() {
    let b = mono(1000, vec![1.0, 0.0, -0.5, 0.3, 0.0]);
    assert!(rms_level_db(&b) <= peak_level_db(&b));
    let c = mono(1000, vec![0.4; 4]);
    assert_abs_diff_eq!(rms_level_db(&c), peak_level_db(&c), epsilon = 1e-9);

    let silent = PcmBuffer::silent(1000, 2, 8);
    assert_eq!(peak_level_db(&silent), f64::NEG_INFINITY);
    assert_eq!(rms_level_db(&silent), f64::NEG_INFINITY);
}

#[test]
fn progress_is_monotonic_and_completes() {
    let tracks = vec![
        track("a", Some(constant(48_000, 480, 0.1)), 0.0),
        track("b", Some(constant(48_000, 480, 0.1)), 0.005),
    ];
    let mut progress = Vec::new();
    mixer(MixerSettings::default())
        .mix_tracks(&tracks, 0.02, &mut |p| progress.push(p))
        .unwrap();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last().copied(), Some(1.0));
}
