//! Voxmix Audio - Real-time software mixer
//!
//! Mixes any number of independently playing streams, each with its own
//! rate, layout, volume, balance and pause state, into one fixed-format
//! 16-bit output buffer filled from the audio device callback.
//!
//! Architecture:
//! - `AudioStream`: Source of interleaved PCM, optionally rewindable
//! - `RateConverter`: Rate/layout conversion plus gain, mixed additively
//! - `Channel`: One playing sound with its volume, balance and pause state
//! - `Mixer`: Fixed slot table, generation-tagged handles, the mix callback
//! - `CpalOutput`: Drives the mixer from the default output device

pub mod backend;
pub mod channel;
pub mod clock;
pub mod config;
pub mod mixer;
pub mod rate;
pub mod sound;
pub mod stream;

pub use backend::{BackendError, BackendResult, CpalOutput};
pub use channel::{Channel, ReleasedStream};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MixerConfig;
pub use mixer::Mixer;
pub use rate::{make_rate_converter, RateConverter};
pub use sound::{
    DisposeAfterUse, PlayOptions, SoundHandle, SoundType, SoundTypeSettings, NUM_CHANNELS,
};
pub use stream::{AudioStream, LoopingStream, MemoryStream, SineStream};
