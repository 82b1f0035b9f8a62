//! Output format the mixer is configured with.

use serde::{Deserialize, Serialize};
use voxmix_core::{Result, VoxmixError};

/// Fixed output format of a [`Mixer`](crate::Mixer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Output sample rate in Hz.
    pub output_rate: u32,
    /// Interleaved stereo output when true, mono otherwise.
    pub stereo: bool,
    /// Frames per backend callback the host is asked for.
    pub output_buffer_size: u32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            output_rate: 44100,
            stereo: true,
            output_buffer_size: 2048,
        }
    }
}

impl MixerConfig {
    pub fn new(output_rate: u32, stereo: bool, output_buffer_size: u32) -> Self {
        Self {
            output_rate,
            stereo,
            output_buffer_size,
        }
    }

    /// Check the format is usable.
    pub fn validate(&self) -> Result<()> {
        if self.output_rate == 0 {
            return Err(VoxmixError::Config(
                "output sample rate must be non-zero".into(),
            ));
        }
        if self.output_buffer_size == 0 {
            return Err(VoxmixError::Config(
                "output buffer size must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Interleaved samples per frame.
    pub fn output_channels(&self) -> u16 {
        if self.stereo {
            2
        } else {
            1
        }
    }
}
