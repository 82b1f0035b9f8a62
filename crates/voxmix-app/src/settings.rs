//! Player settings file.
//!
//! ```json
//! {
//!   "mixer": { "output_rate": 48000, "stereo": true, "output_buffer_size": 1024 },
//!   "sound_types": { "music": { "mute": false, "volume": 192 } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use voxmix_audio::{Mixer, MixerConfig, SoundType, SoundTypeSettings};
use voxmix_core::{Result, VoxmixError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mixer: MixerConfig,
    /// Types missing here keep the mixer defaults.
    pub sound_types: HashMap<SoundType, SoundTypeSettings>,
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(text).map_err(|e| VoxmixError::Config(e.to_string()))?;
        settings.mixer.validate()?;
        Ok(settings)
    }

    /// Push the per-type volume and mute settings into `mixer`.
    pub fn apply(&self, mixer: &Mixer) {
        for (&sound_type, settings) in &self.sound_types {
            mixer.set_volume_for_sound_type(sound_type, settings.volume as i32);
            mixer.mute_sound_type(sound_type, settings.mute);
        }
    }
}
