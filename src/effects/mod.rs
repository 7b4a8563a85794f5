//! Clip effect rendering: 10-band EQ followed by volume, with keyframe automation.

pub(crate) mod automation;

use crate::animation::keyframe::{Keyframe, has_keyframes, keyframes_for};
use crate::audio::buffer::SharedPcm;
use crate::audio::graph::{Node, RenderGraph};
use crate::audio::param::AudioParam;
use crate::effects::automation::{ParamScale, schedule_keyframes};
use crate::foundation::error::MixdownResult;
use crate::timeline::model::{Effect, EffectKind};
use std::collections::BTreeMap;
use std::sync::Arc;

/// EQ band center frequencies in Hz.
pub const EQ_FREQUENCIES: [f64; 10] = [
    31.0, 62.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];
/// EQ band parameter names, aligned with [`EQ_FREQUENCIES`].
pub const EQ_BAND_PARAMS: [&str; 10] = [
    "band31", "band62", "band125", "band250", "band500", "band1k", "band2k", "band4k", "band8k",
    "band16k",
];
/// Quality factor shared by every EQ band.
pub const EQ_Q: f64 = 1.4;
/// Volume effect parameter name.
pub const VOLUME_PARAM: &str = "volume";

const EQ_FLAT_EPSILON_DB: f64 = 0.01;

/// Keyframe property addressing `param` on the effect with id `effect_id`.
pub fn effect_property(effect_id: &str, param: &str) -> String {
    format!("effect.{effect_id}.{param}")
}

/// Neutral value of `param` for an effect of `kind`.
pub fn param_default(kind: EffectKind, param: &str) -> f64 {
    match (kind, param) {
        (EffectKind::AudioVolume, VOLUME_PARAM) => 1.0,
        _ => 0.0,
    }
}

/// Static band gains in dB; missing bands read as flat.
pub fn eq_band_gains(params: &BTreeMap<String, f64>) -> [f64; 10] {
    EQ_BAND_PARAMS.map(|name| params.get(name).copied().unwrap_or(0.0))
}

/// Return `true` when any band is boosted or cut by more than 0.01 dB.
pub fn eq_is_non_default(params: &BTreeMap<String, f64>) -> bool {
    eq_band_gains(params)
        .iter()
        .any(|g| g.abs() > EQ_FLAT_EPSILON_DB)
}

/// Offline renderer for a clip's EQ and volume effects.
#[derive(Clone, Copy, Debug, Default)]
pub struct AudioEffectRenderer;

impl AudioEffectRenderer {
    /// Create a renderer.
    pub fn new() -> Self {
        Self
    }

    /// Render the enabled EQ and volume effects over `buffer`.
    ///
    /// Returns the very same buffer handle when neither effect has keyframes and both are at
    /// their neutral settings. Otherwise the buffer runs through ten peaking filters and a gain
    /// stage, with keyframes on `effect.<id>.<param>` scheduled against clip-local time.
    #[tracing::instrument(level = "debug", skip_all, fields(frames = buffer.len(), effects = effects.len()))]
    pub fn render_effects(
        &self,
        buffer: &SharedPcm,
        effects: &[Effect],
        keyframes: &[Keyframe],
        clip_duration: f64,
    ) -> MixdownResult<SharedPcm> {
        let find = |kind| effects.iter().find(|e| e.enabled && e.kind == kind);
        let eq = find(EffectKind::AudioEq);
        let volume = find(EffectKind::AudioVolume);

        let eq_animated = eq.is_some_and(|e| {
            EQ_BAND_PARAMS
                .iter()
                .any(|p| has_keyframes(keyframes, &effect_property(&e.id, p)))
        });
        let volume_animated = volume
            .is_some_and(|e| has_keyframes(keyframes, &effect_property(&e.id, VOLUME_PARAM)));
        let eq_active = eq.is_some_and(|e| eq_is_non_default(&e.params));
        let volume_active = volume.is_some_and(|e| e.param(VOLUME_PARAM, 1.0) != 1.0);

        if buffer.is_empty() || !(eq_animated || volume_animated || eq_active || volume_active) {
            return Ok(Arc::clone(buffer));
        }

        let static_bands = eq.map_or([0.0; 10], |e| eq_band_gains(&e.params));
        let bands = EQ_BAND_PARAMS
            .iter()
            .zip(static_bands)
            .map(|(name, static_db)| {
                let mut param = AudioParam::new(static_db);
                if let Some(e) = eq {
                    let keys = keyframes_for(keyframes, &effect_property(&e.id, name));
                    schedule_keyframes(&mut param, &keys, clip_duration, ParamScale::Decibels);
                }
                param
            })
            .collect::<Vec<_>>();

        let mut gain = AudioParam::new(volume.map_or(1.0, |e| e.param(VOLUME_PARAM, 1.0)));
        if let Some(e) = volume {
            let keys = keyframes_for(keyframes, &effect_property(&e.id, VOLUME_PARAM));
            schedule_keyframes(&mut gain, &keys, clip_duration, ParamScale::Gain);
        }

        tracing::debug!(eq_animated, volume_animated, "rendering clip effects");
        render_chain(buffer, bands, gain)
    }
}

/// Scale `buffer` by a linear gain; unity returns the same handle.
pub fn apply_gain(buffer: &SharedPcm, gain: f64) -> SharedPcm {
    if gain == 1.0 {
        return Arc::clone(buffer);
    }
    let mut out = (**buffer).clone();
    out.scale(gain as f32);
    Arc::new(out)
}

/// Apply a static 10-band EQ; a flat curve returns the same handle.
pub fn apply_eq(buffer: &SharedPcm, bands_db: &[f64; 10]) -> MixdownResult<SharedPcm> {
    if buffer.is_empty() || bands_db.iter().all(|g| g.abs() <= EQ_FLAT_EPSILON_DB) {
        return Ok(Arc::clone(buffer));
    }
    let bands = bands_db.iter().map(|&db| AudioParam::new(db)).collect();
    render_chain(buffer, bands, AudioParam::new(1.0))
}

fn render_chain(
    buffer: &SharedPcm,
    bands: Vec<AudioParam>,
    gain: AudioParam,
) -> MixdownResult<SharedPcm> {
    let mut graph = RenderGraph::new(buffer.sample_rate(), buffer.channel_count());
    let mut chain = vec![graph.add(Node::Source {
        buffer: Arc::clone(buffer),
        start_frame: 0,
    })];
    for (frequency, gain_db) in EQ_FREQUENCIES.into_iter().zip(bands) {
        chain.push(graph.add(Node::Peaking {
            frequency,
            q: EQ_Q,
            gain_db,
        }));
    }
    chain.push(graph.add(Node::Gain { gain }));
    chain.push(graph.add(Node::Sink));
    graph.chain(&chain)?;
    Ok(Arc::new(graph.render(buffer.len())?))
}

#[cfg(test)]
#[path = "../../tests/unit/effects/mod.rs"]
mod tests;
