//! Mixdown renders the audio of a timeline window offline.
//!
//! Every clip that contributes audio to the window is decoded, played at its (possibly
//! keyframed) speed, run through its EQ and volume automation, positioned and summed into one
//! stereo mix, and finally handed to an encoder:
//!
//! - Load a [`Timeline`] and [`ExportSettings`]
//! - Create an [`AudioExportPipeline`]
//! - Run [`AudioExportPipeline::export`] with an [`Extractor`] and an [`Encoder`], or
//!   [`AudioExportPipeline::export_raw`] for the unencoded mix
//!
//! Exports are cooperative: progress flows into a [`ProgressSink`], the pipeline yields at
//! bounded intervals, and a [`CancelToken`] stops it with [`ExportOutcome::Cancelled`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod audio;
pub(crate) mod effects;
pub(crate) mod media;
pub(crate) mod mix;
pub(crate) mod pipeline;
pub(crate) mod stretch;
pub(crate) mod timeline;

pub use crate::foundation::core::{TimeWindow, secs_to_frame_index, secs_to_frames};
pub use crate::foundation::error::{MixdownError, MixdownResult};
pub use crate::foundation::math::{SILENCE_DB, db_to_gain, gain_to_db};

pub use crate::animation::ease::Easing;
pub use crate::animation::keyframe::{
    BezierHandle, Keyframe, bezier_interpolate, interpolate, keyframes_for, linear_value_at,
};

pub use crate::audio::biquad::BiquadCoeffs;
pub use crate::audio::buffer::{PcmBuffer, SharedPcm, remix_channels, to_stereo, trim};
pub use crate::audio::graph::{Node, NodeId, RenderGraph};
pub use crate::audio::param::{AudioParam, AutomationEvent};
pub use crate::audio::resample::resample;

pub use crate::stretch::{
    SPEED_PROPERTY, StretchQuality, TimeStretchProcessor, TimeStretchSettings, integrate_speed,
    source_extent, source_offset_at,
};

pub use crate::effects::automation::{GAIN_FLOOR, ParamScale, schedule_keyframes};
pub use crate::effects::{
    AudioEffectRenderer, EQ_BAND_PARAMS, EQ_FREQUENCIES, EQ_Q, VOLUME_PARAM, apply_eq,
    apply_gain, effect_property,
};

pub use crate::mix::{
    AudioMixer, AudioTrackData, MixerSettings, normalization_gain, normalize_peak,
    peak_level_db, resolve_active_tracks, rms_level_db,
};

pub use crate::timeline::model::{Clip, ClipSource, Effect, EffectKind, Timeline, Track, TrackKind};
pub use crate::timeline::query::{
    active_track_ids, contributing_clips, effect_param_at, source_time_at, speed_at,
};

pub use crate::media::Extractor;
pub use crate::media::encode::{
    AudioCodec, EncodedAudio, EncodedMetadata, Encoder, EncoderConfig, InMemoryEncoder,
};
pub use crate::media::extract::FileExtractor;
pub use crate::media::ffmpeg::{FfmpegEncoder, is_ffmpeg_on_path};
pub use crate::media::wav::{read_wav, write_wav};

pub use crate::pipeline::job::ExportJob;
pub use crate::pipeline::progress::{ExportProgress, ExportStage, FnProgress, ProgressSink};
pub use crate::pipeline::settings::ExportSettings;
pub use crate::pipeline::task::{CancelToken, NoopHost, TaskHost, ThreadYield, Yielder};
pub use crate::pipeline::{AudioExportPipeline, ExportOutcome};
