use super::*;
use crate::audio::buffer::PcmBuffer;
use crate::media::wav::write_wav;

fn write_tone(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let buf = PcmBuffer::new(22_050, vec![vec![0.25; 2205]]).unwrap();
    write_wav(&path, &buf).unwrap();
    path
}

#[test]
fn wav_sources_decode_at_native_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_tone(dir.path(), "tone.wav");
    let mut ex = FileExtractor::default();
    let pcm = ex.extract(&path, None).unwrap();
    assert_eq!(pcm.sample_rate(), 22_050);
    assert_eq!(pcm.channel_count(), 1);
    assert_eq!(pcm.len(), 2205);
    assert_eq!(ex.cached(), 0);
}

#[test]
fn cache_hits_share_the_decode_until_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_tone(dir.path(), "tone.wav");
    let mut ex = FileExtractor::new(48_000);
    let a = ex.extract(&path, Some("tone")).unwrap();
    let b = ex.extract(&path, Some("tone")).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(ex.cached(), 1);

    ex.clear_cache();
    assert_eq!(ex.cached(), 0);
    let c = ex.extract(&path, Some("tone")).unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(a, c);
}

#[test]
fn unreadable_sources_fail_per_clip() {
    let mut ex = FileExtractor::default();
    let err = ex.extract(Path::new("/missing/file.wav"), Some("k")).unwrap_err();
    assert!(err.is_recoverable_per_clip());
    assert_eq!(ex.cached(), 0);
}

#[cfg(not(feature = "media-ffmpeg"))]
#[test]
fn non_wav_needs_the_ffmpeg_feature() {
    let mut ex = FileExtractor::default();
    let err = ex.extract(Path::new("song.mp3"), None).unwrap_err();
    assert!(err.is_recoverable_per_clip());
    assert!(err.to_string().contains("media-ffmpeg"));
}
