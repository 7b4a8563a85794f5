use super::*;
use crate::animation::ease::Easing;

const SAMPLE: &str = r#"{
  "tracks": [
    { "id": "a1", "kind": "audio" },
    { "id": "v1", "kind": "video", "muted": true, "visible": false }
  ],
  "clips": [
    {
      "id": "c1",
      "track_id": "a1",
      "start_time": 1.0,
      "duration": 4.0,
      "in_point": 0.5,
      "source": { "kind": "audio", "path": "music.wav" },
      "effects": [
        { "id": "eq", "type": "audio-eq", "params": { "band1k": 3.0 } },
        { "id": "glow", "type": "video-glow" }
      ],
      "keyframes": [
        { "property": "speed", "time": 0.0, "value": 1.0 },
        { "property": "speed", "time": 4.0, "value": 2.0, "easing": "ease-in-out" }
      ]
    },
    {
      "id": "c2",
      "track_id": "v1",
      "start_time": 0.0,
      "duration": 2.0,
      "speed": -1.0,
      "source": { "kind": "video", "path": "shot.mp4", "has_audio": false }
    }
  ]
}"#;

#[test]
fn parses_with_defaults() {
    let t = Timeline::from_json_str(SAMPLE).unwrap();
    let a1 = t.track("a1").unwrap();
    assert!(!a1.muted && !a1.solo && a1.visible);
    assert!(!t.track("v1").unwrap().visible);

    let c1 = &t.clips[0];
    assert_eq!(c1.speed, 1.0);
    assert_eq!(c1.volume, 1.0);
    assert_eq!(c1.preserve_pitch, None);
    assert_eq!(c1.effects[0].kind, EffectKind::AudioEq);
    assert!(c1.effects[0].enabled);
    assert_eq!(c1.effects[0].param("band1k", 0.0), 3.0);
    assert_eq!(c1.effects[1].kind, EffectKind::Other);
    assert_eq!(c1.keyframes[1].easing, Easing::EaseInOut);
    assert_eq!(c1.end_time(), 5.0);
    assert_eq!(c1.source_out(), 4.5);
    assert_eq!(c1.source.audio_path(), Some(Path::new("music.wav")));

    let c2 = &t.clips[1];
    assert_eq!(c2.source.audio_path(), None);
    assert_eq!(c2.source_out(), 2.0);
    assert_eq!(t.duration(), 5.0);
}

#[test]
fn nested_clip_uses_its_mixdown() {
    let with = ClipSource::Nested {
        mixdown: Some(PathBuf::from("nested.wav")),
    };
    let without = ClipSource::Nested { mixdown: None };
    assert_eq!(with.audio_path(), Some(Path::new("nested.wav")));
    assert_eq!(without.audio_path(), None);
}

#[test]
fn rejects_dangling_and_duplicate_ids() {
    let mut t = Timeline::from_json_str(SAMPLE).unwrap();
    t.clips[1].track_id = "missing".to_string();
    assert!(matches!(t.validate(), Err(MixdownError::Validation(_))));

    let mut t = Timeline::from_json_str(SAMPLE).unwrap();
    t.clips[1].id = "c1".to_string();
    assert!(t.validate().is_err());

    let mut t = Timeline::from_json_str(SAMPLE).unwrap();
    t.tracks[1].id = "a1".to_string();
    assert!(t.validate().is_err());
}

#[test]
fn rejects_bad_numbers() {
    let mut t = Timeline::from_json_str(SAMPLE).unwrap();
    t.clips[0].duration = -1.0;
    assert!(t.validate().is_err());

    let mut t = Timeline::from_json_str(SAMPLE).unwrap();
    t.clips[0].speed = f64::NAN;
    assert!(t.validate().is_err());

    let mut t = Timeline::from_json_str(SAMPLE).unwrap();
    t.clips[0].out_point = Some(0.1);
    assert!(t.validate().is_err());
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = Timeline::from_json_str("{ \"tracks\": 3 }").unwrap_err();
    assert!(matches!(err, MixdownError::Serde(_)));
}

#[test]
fn loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeline.json");
    std::fs::write(&path, SAMPLE).unwrap();
    let t = Timeline::from_path(&path).unwrap();
    assert_eq!(t.clips.len(), 2);

    let err = Timeline::from_path(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, MixdownError::Other(_)));
}
