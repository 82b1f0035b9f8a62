//! Voxmix Core - Foundation types for the software mixer
//!
//! This crate provides the types shared by every Voxmix crate:
//! - Error handling (`VoxmixError`, `Result`)
//! - Playback time representation (`Timestamp`)
//! - Volume scale constants

pub mod error;
pub mod time;

pub use error::{Result, VoxmixError};
pub use time::Timestamp;

/// Volume scales used by the mixer and the rate converter.
pub mod volume {
    /// Maximum per-channel volume (and fader level).
    pub const MAX_CHANNEL_VOLUME: u8 = 255;

    /// Maximum volume of a sound type. Also the divisor applied by the
    /// rate converter, so a gain of exactly this value passes samples
    /// through unchanged.
    pub const MAX_MIXER_VOLUME: u16 = 256;

    /// Balance extremes: -127 is fully left, 127 fully right.
    pub const MAX_BALANCE: i8 = 127;
}
