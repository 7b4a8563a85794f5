use super::*;
use crate::animation::keyframe::Keyframe;
use crate::timeline::model::{ClipSource, EffectKind, Track};
use approx::assert_abs_diff_eq;
use std::path::PathBuf;

fn track(id: &str, kind: TrackKind) -> Track {
    Track {
        id: id.to_string(),
        kind,
        muted: false,
        solo: false,
        visible: true,
    }
}

fn audio_clip(id: &str, track_id: &str, start: f64, duration: f64) -> Clip {
    Clip::new(
        id,
        track_id,
        ClipSource::Audio {
            path: PathBuf::from(format!("{id}.wav")),
        },
        start,
        duration,
    )
}

fn timeline() -> Timeline {
    Timeline {
        tracks: vec![
            track("a1", TrackKind::Audio),
            track("a2", TrackKind::Audio),
            track("v1", TrackKind::Video),
        ],
        clips: vec![
            audio_clip("late", "a1", 4.0, 2.0),
            audio_clip("early", "a2", 0.0, 2.0),
            Clip::new(
                "nested",
                "v1",
                ClipSource::Nested {
                    mixdown: Some(PathBuf::from("n.wav")),
                },
                1.0,
                1.0,
            ),
        ],
    }
}

fn ids<'a>(clips: &[&'a Clip]) -> Vec<&'a str> {
    clips.iter().map(|c| c.id.as_str()).collect()
}

#[test]
fn mute_and_solo_resolution() {
    let mut t = timeline();
    assert_eq!(active_track_ids(&t).len(), 3);

    t.tracks[0].muted = true;
    assert!(!active_track_ids(&t).contains("a1"));

    t.tracks[1].solo = true;
    assert_eq!(active_track_ids(&t).into_iter().collect::<Vec<_>>(), ["a2"]);

    // Mute wins over solo, and the solo still excludes everything else.
    t.tracks[1].muted = true;
    assert!(active_track_ids(&t).is_empty());
}

#[test]
fn contributing_clips_are_windowed_and_ordered() {
    let t = timeline();
    let window = TimeWindow::new(0.0, 10.0).unwrap();
    assert_eq!(ids(&contributing_clips(&t, window)), ["early", "nested", "late"]);

    let window = TimeWindow::new(2.0, 4.0).unwrap();
    assert!(contributing_clips(&t, window).is_empty());

    let window = TimeWindow::new(1.5, 4.5).unwrap();
    assert_eq!(ids(&contributing_clips(&t, window)), ["early", "nested", "late"]);
}

#[test]
fn nested_mixdowns_need_a_visible_host_even_on_audio_tracks() {
    let mut t = timeline();
    t.clips.push(Clip::new(
        "nested-audio",
        "a2",
        ClipSource::Nested {
            mixdown: Some(PathBuf::from("m.wav")),
        },
        3.0,
        1.0,
    ));
    let window = TimeWindow::new(0.0, 10.0).unwrap();
    assert_eq!(
        ids(&contributing_clips(&t, window)),
        ["early", "nested", "nested-audio", "late"]
    );

    t.tracks[1].visible = false;
    assert_eq!(ids(&contributing_clips(&t, window)), ["early", "nested", "late"]);
}

#[test]
fn hidden_video_tracks_and_silent_sources_drop_out() {
    let mut t = timeline();
    t.tracks[2].visible = false;
    t.clips.push(Clip::new(
        "mute-video",
        "a1",
        ClipSource::Video {
            path: PathBuf::from("v.mp4"),
            has_audio: false,
        },
        0.0,
        1.0,
    ));
    let window = TimeWindow::new(0.0, 10.0).unwrap();
    assert_eq!(ids(&contributing_clips(&t, window)), ["early", "late"]);
}

#[test]
fn speed_and_source_time_queries() {
    let mut clip = audio_clip("c", "a1", 0.0, 4.0);
    clip.in_point = 1.0;
    clip.speed = 2.0;
    assert_eq!(speed_at(&clip, 1.0), 2.0);
    assert_abs_diff_eq!(source_time_at(&clip, 1.5), 4.0, epsilon = 1e-12);

    clip.keyframes = vec![
        Keyframe::new(SPEED_PROPERTY, 0.0, 1.0),
        Keyframe::new(SPEED_PROPERTY, 4.0, 3.0),
    ];
    assert_abs_diff_eq!(speed_at(&clip, 2.0), 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(source_time_at(&clip, 4.0), 1.0 + 8.0, epsilon = 1e-9);
}

#[test]
fn effect_params_prefer_keyframes() {
    let mut clip = audio_clip("c", "a1", 0.0, 2.0);
    let vol = Effect::new("vol", EffectKind::AudioVolume);
    let eq = Effect::new("eq", EffectKind::AudioEq).with_param("band1k", 4.0);
    assert_eq!(effect_param_at(&clip, &vol, "volume", 1.0), 1.0);
    assert_eq!(effect_param_at(&clip, &eq, "band1k", 1.0), 4.0);
    assert_eq!(effect_param_at(&clip, &eq, "band31", 1.0), 0.0);

    clip.keyframes = vec![
        Keyframe::new("effect.vol.volume", 0.0, 0.0),
        Keyframe::new("effect.vol.volume", 2.0, 2.0),
    ];
    assert_abs_diff_eq!(effect_param_at(&clip, &vol, "volume", 0.5), 0.5, epsilon = 1e-12);
}
