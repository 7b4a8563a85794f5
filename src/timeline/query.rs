use crate::animation::keyframe::{interpolate, keyframes_for};
use crate::effects::{effect_property, param_default};
use crate::foundation::core::TimeWindow;
use crate::stretch::{SPEED_PROPERTY, source_offset_at};
use crate::timeline::model::{Clip, ClipSource, Effect, Timeline, TrackKind};
use std::collections::BTreeSet;

/// Ids of tracks allowed to contribute audio.
///
/// Muted tracks never contribute. When any track is soloed, only soloed tracks do.
pub fn active_track_ids(timeline: &Timeline) -> BTreeSet<&str> {
    let any_solo = timeline.tracks.iter().any(|t| t.solo);
    timeline
        .tracks
        .iter()
        .filter(|t| !t.muted && (!any_solo || t.solo))
        .map(|t| t.id.as_str())
        .collect()
}

/// Clips whose audio lands inside `window`, in timeline order.
///
/// A clip contributes when its track is active, its source carries audio, and its span
/// intersects the window. Nested clips need a visible host track of either kind, and
/// clips on hidden video tracks are skipped.
pub fn contributing_clips(timeline: &Timeline, window: TimeWindow) -> Vec<&Clip> {
    let active = active_track_ids(timeline);
    let mut clips: Vec<&Clip> = timeline
        .clips
        .iter()
        .filter(|c| active.contains(c.track_id.as_str()))
        .filter(|c| c.source.audio_path().is_some())
        .filter(|c| {
            timeline
                .track(&c.track_id)
                .is_some_and(|t| match (&c.source, t.kind) {
                    (ClipSource::Nested { .. }, _) | (_, TrackKind::Video) => t.visible,
                    (_, TrackKind::Audio) => true,
                })
        })
        .filter(|c| window.intersects(c.start_time, c.duration))
        .collect();
    clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    clips
}

/// Eased playback speed at clip-local time `t`.
pub fn speed_at(clip: &Clip, t: f64) -> f64 {
    let keys = keyframes_for(&clip.keyframes, SPEED_PROPERTY);
    interpolate(&keys, t, clip.speed)
}

/// Source media time read at clip-local time `t`.
pub fn source_time_at(clip: &Clip, t: f64) -> f64 {
    clip.in_point + source_offset_at(&clip.keyframes, clip.speed, clip.duration, t)
}

/// Value of `param` on `effect` at clip-local time `t`, keyframes taking precedence.
pub fn effect_param_at(clip: &Clip, effect: &Effect, param: &str, t: f64) -> f64 {
    let fallback = effect.param(param, param_default(effect.kind, param));
    let keys = keyframes_for(&clip.keyframes, &effect_property(&effect.id, param));
    interpolate(&keys, t, fallback)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/query.rs"]
mod tests;
