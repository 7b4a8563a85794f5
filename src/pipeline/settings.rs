use crate::foundation::error::{MixdownError, MixdownResult};
use crate::media::encode::AudioCodec;
use crate::mix::MixerSettings;
use crate::stretch::TimeStretchSettings;
use std::path::Path;

/// Sample rates accepted for export.
pub const SUPPORTED_SAMPLE_RATES: [u32; 2] = [44_100, 48_000];
/// Lowest accepted bitrate in bits per second.
pub const MIN_BITRATE: u32 = 128_000;
/// Highest accepted bitrate in bits per second.
pub const MAX_BITRATE: u32 = 320_000;

/// Settings for one export.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Output sample rate in Hz; 44100 or 48000.
    pub sample_rate: u32,
    /// Encoder bitrate in bits per second.
    pub bitrate: u32,
    /// Peak-normalize the mix before encoding.
    pub normalize: bool,
    /// Normalization target below full scale, in dB.
    pub headroom_db: f64,
    /// Speed processing settings.
    pub time_stretch: TimeStretchSettings,
    /// Codecs to try, most preferred first.
    pub codec_preference: Vec<AudioCodec>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            bitrate: 192_000,
            normalize: false,
            headroom_db: -1.0,
            time_stretch: TimeStretchSettings::default(),
            codec_preference: AudioCodec::DEFAULT_PREFERENCE.to_vec(),
        }
    }
}

impl ExportSettings {
    /// Check sample rate, bitrate, headroom and codec list.
    pub fn validate(&self) -> MixdownResult<()> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(MixdownError::validation(format!(
                "sample_rate must be one of {SUPPORTED_SAMPLE_RATES:?}, got {}",
                self.sample_rate
            )));
        }
        if !(MIN_BITRATE..=MAX_BITRATE).contains(&self.bitrate) {
            return Err(MixdownError::validation(format!(
                "bitrate must be in [{MIN_BITRATE}, {MAX_BITRATE}], got {}",
                self.bitrate
            )));
        }
        if !self.headroom_db.is_finite() || self.headroom_db > 0.0 {
            return Err(MixdownError::validation(
                "headroom_db must be finite and <= 0",
            ));
        }
        if self.codec_preference.is_empty() {
            return Err(MixdownError::validation("codec preference list is empty"));
        }
        Ok(())
    }

    /// Parse and validate settings from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> MixdownResult<Self> {
        let settings: Self = serde_json::from_str(s)
            .map_err(|e| MixdownError::serde(format!("settings json: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate a settings JSON file.
    pub fn from_path(path: &Path) -> MixdownResult<Self> {
        use anyhow::Context as _;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Stereo mixer settings at the export rate.
    pub fn mixer_settings(&self) -> MixerSettings {
        MixerSettings {
            sample_rate: self.sample_rate,
            channels: 2,
            normalize: self.normalize,
            headroom_db: self.headroom_db,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/settings.rs"]
mod tests;
