use crate::animation::keyframe::Keyframe;
use crate::foundation::error::{MixdownError, MixdownResult};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

fn default_unit() -> f64 {
    1.0
}

/// Snapshot of the editor timeline consumed by the export pipeline.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    /// Tracks, in display order.
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// Clips on any track.
    #[serde(default)]
    pub clips: Vec<Clip>,
}

/// Track category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Audio track.
    Audio,
    /// Video track; may host nested timelines with an audio mixdown.
    Video,
}

/// One timeline track.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Track {
    /// Unique track id.
    pub id: String,
    /// Track category.
    pub kind: TrackKind,
    /// Muted tracks never contribute audio.
    #[serde(default)]
    pub muted: bool,
    /// When any track is soloed, only soloed tracks contribute.
    #[serde(default)]
    pub solo: bool,
    /// Hidden video tracks do not contribute nested mixdowns.
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl Track {
    /// Visible, unmuted, non-solo track.
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            kind,
            muted: false,
            solo: false,
            visible: true,
        }
    }
}

/// Where a clip's audio comes from.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClipSource {
    /// Audio file.
    Audio {
        /// Media path.
        path: PathBuf,
    },
    /// Video file; audio is only used when it has an audio stream.
    Video {
        /// Media path.
        path: PathBuf,
        /// Whether the file carries audio.
        #[serde(default = "default_true")]
        has_audio: bool,
    },
    /// Nested timeline; contributes its pre-rendered mixdown when one is attached.
    Nested {
        /// Path to the rendered mixdown.
        #[serde(default)]
        mixdown: Option<PathBuf>,
    },
}

impl ClipSource {
    /// Path to decode for this source, if it carries audio at all.
    pub fn audio_path(&self) -> Option<&Path> {
        match self {
            Self::Audio { path } => Some(path),
            Self::Video {
                path,
                has_audio: true,
            } => Some(path),
            Self::Video { .. } => None,
            Self::Nested { mixdown } => mixdown.as_deref(),
        }
    }
}

/// Kind of clip effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    /// 10-band parametric EQ.
    AudioEq,
    /// Linear gain.
    AudioVolume,
    /// Any non-audio effect; ignored by the audio pipeline.
    #[serde(other)]
    Other,
}

/// One effect instance on a clip.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Effect {
    /// Effect id, unique within its clip; keyframes address it as `effect.<id>.<param>`.
    pub id: String,
    /// Effect kind.
    #[serde(rename = "type")]
    pub kind: EffectKind,
    /// Disabled effects are ignored.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Static parameter values.
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl Effect {
    /// Enabled effect of `kind` with no parameters set.
    pub fn new(id: impl Into<String>, kind: EffectKind) -> Self {
        Self {
            id: id.into(),
            kind,
            enabled: true,
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter override.
    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Static value of `name`, or `default` when unset.
    pub fn param(&self, name: &str, default: f64) -> f64 {
        self.params.get(name).copied().unwrap_or(default)
    }
}

/// A placed piece of media on a track.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Clip {
    /// Unique clip id.
    pub id: String,
    /// Owning track id.
    pub track_id: String,
    /// Timeline start in seconds.
    pub start_time: f64,
    /// Timeline duration in seconds.
    pub duration: f64,
    /// Source in-point in seconds.
    #[serde(default)]
    pub in_point: f64,
    /// Source out-point in seconds; defaults to the range the static speed consumes.
    #[serde(default)]
    pub out_point: Option<f64>,
    /// Media source.
    pub source: ClipSource,
    /// Static playback speed; negative plays in reverse.
    #[serde(default = "default_unit")]
    pub speed: f64,
    /// Per-clip pitch preservation override.
    #[serde(default)]
    pub preserve_pitch: Option<bool>,
    /// Clip gain in `[0, 2]`.
    #[serde(default = "default_unit")]
    pub volume: f64,
    /// Effects applied in the audio pipeline.
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// Keyframes for speed and effect parameters, clip-local time.
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

impl Clip {
    /// Clip with speed 1, full volume, no effects and no keyframes.
    pub fn new(
        id: impl Into<String>,
        track_id: impl Into<String>,
        source: ClipSource,
        start_time: f64,
        duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            track_id: track_id.into(),
            start_time,
            duration,
            in_point: 0.0,
            out_point: None,
            source,
            speed: 1.0,
            preserve_pitch: None,
            volume: 1.0,
            effects: Vec::new(),
            keyframes: Vec::new(),
        }
    }

    /// Timeline end in seconds (exclusive).
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Source out-point, derived from the static speed when not set.
    pub fn source_out(&self) -> f64 {
        self.out_point
            .unwrap_or(self.in_point + self.duration * self.speed.abs())
    }
}

impl Timeline {
    /// Parse and validate a timeline from JSON text.
    pub fn from_json_str(s: &str) -> MixdownResult<Self> {
        let timeline: Self = serde_json::from_str(s)
            .map_err(|e| MixdownError::serde(format!("timeline json: {e}")))?;
        timeline.validate()?;
        Ok(timeline)
    }

    /// Load and validate a timeline JSON file.
    pub fn from_path(path: &Path) -> MixdownResult<Self> {
        use anyhow::Context as _;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read timeline '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Look up a track by id.
    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// End of the last clip in seconds.
    pub fn duration(&self) -> f64 {
        self.clips
            .iter()
            .map(Clip::end_time)
            .fold(0.0, f64::max)
    }

    /// Check ids, references and numeric ranges.
    pub fn validate(&self) -> MixdownResult<()> {
        let mut track_ids = BTreeSet::new();
        for t in &self.tracks {
            if !track_ids.insert(t.id.as_str()) {
                return Err(MixdownError::validation(format!(
                    "duplicate track id '{}'",
                    t.id
                )));
            }
        }
        let mut clip_ids = BTreeSet::new();
        for c in &self.clips {
            if !clip_ids.insert(c.id.as_str()) {
                return Err(MixdownError::validation(format!(
                    "duplicate clip id '{}'",
                    c.id
                )));
            }
            if !track_ids.contains(c.track_id.as_str()) {
                return Err(MixdownError::validation(format!(
                    "clip '{}' references unknown track '{}'",
                    c.id, c.track_id
                )));
            }
            let finite = [c.start_time, c.duration, c.in_point, c.speed, c.volume]
                .iter()
                .all(|v| v.is_finite());
            if !finite {
                return Err(MixdownError::validation(format!(
                    "clip '{}' has non-finite timing, speed or volume",
                    c.id
                )));
            }
            if c.duration < 0.0 || c.in_point < 0.0 {
                return Err(MixdownError::validation(format!(
                    "clip '{}' duration and in_point must be >= 0",
                    c.id
                )));
            }
            if let Some(out) = c.out_point
                && !(out.is_finite() && out >= c.in_point)
            {
                return Err(MixdownError::validation(format!(
                    "clip '{}' out_point must be finite and >= in_point",
                    c.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/model.rs"]
mod tests;
