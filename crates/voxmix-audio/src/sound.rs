//! Handles, sound categories and play-time options.

use serde::{Deserialize, Serialize};
use std::fmt;
use voxmix_core::volume::{MAX_CHANNEL_VOLUME, MAX_MIXER_VOLUME};

/// Number of channel slots in the mixer.
pub const NUM_CHANNELS: usize = 32;

/// Opaque reference to a playing sound.
///
/// Encodes the slot index plus a generation counter
/// (`slot + generation * NUM_CHANNELS`), so a handle to a finished sound
/// never matches a newer sound that reused the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundHandle(u32);

impl SoundHandle {
    /// Placeholder for "no channel", e.g. a rejected play request.
    pub const INVALID: Self = Self(u32::MAX);

    pub(crate) fn new(slot: usize, generation: u32) -> Self {
        Self((slot as u32).wrapping_add(generation.wrapping_mul(NUM_CHANNELS as u32)))
    }

    /// Slot index this handle points into.
    #[inline]
    pub fn slot(self) -> usize {
        self.0 as usize % NUM_CHANNELS
    }

    #[inline]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for SoundHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Category used for bulk volume and mute control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundType {
    Plain,
    Music,
    Sfx,
    Speech,
}

impl SoundType {
    pub const COUNT: usize = 4;

    pub const ALL: [SoundType; Self::COUNT] = [
        SoundType::Plain,
        SoundType::Music,
        SoundType::Sfx,
        SoundType::Speech,
    ];

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Process-wide settings of one [`SoundType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundTypeSettings {
    pub mute: bool,
    /// 0 to [`MAX_MIXER_VOLUME`].
    pub volume: u16,
}

impl Default for SoundTypeSettings {
    fn default() -> Self {
        Self {
            mute: false,
            volume: MAX_MIXER_VOLUME,
        }
    }
}

/// Who gets rid of a stream once the mixer is done with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposeAfterUse {
    /// The mixer drops the stream.
    #[default]
    Yes,
    /// The stream is handed back through the mixer's release queue.
    No,
}

/// Per-play parameters for [`Mixer::play_stream`](crate::Mixer::play_stream).
#[derive(Debug, Clone)]
pub struct PlayOptions {
    /// At most one live channel may carry a given id.
    pub id: Option<i32>,
    pub volume: u8,
    /// -127 (left) to 127 (right).
    pub balance: i8,
    pub dispose: DisposeAfterUse,
    /// Permanent channels survive [`Mixer::stop_all`](crate::Mixer::stop_all).
    pub permanent: bool,
    pub reverse_stereo: bool,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            id: None,
            volume: MAX_CHANNEL_VOLUME,
            balance: 0,
            dispose: DisposeAfterUse::Yes,
            permanent: false,
            reverse_stereo: false,
        }
    }
}
