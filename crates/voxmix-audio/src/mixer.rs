//! Audio mixer: mixes every playing channel into the backend buffer.
//!
//! The mixer owns a fixed table of [`NUM_CHANNELS`] slots. A single lock
//! guards the table, the sound type settings and the handle counter; the
//! real-time [`Mixer::mix_callback`] takes the same lock as every control
//! call, so each control call lands entirely before or after a mix pass.
//!
//! Control calls never fail loudly. A stale handle or an unknown id is a
//! normal race with a sound that just ended and is ignored.

use crate::channel::{Channel, ChannelEnv, ReleasedStream};
use crate::clock::{Clock, SystemClock};
use crate::config::MixerConfig;
use crate::sound::{
    PlayOptions, SoundHandle, SoundType, SoundTypeSettings, NUM_CHANNELS,
};
use crate::stream::AudioStream;
use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use voxmix_core::volume::MAX_MIXER_VOLUME;
use voxmix_core::{Result, Timestamp};

/// Capacity of the queue handing caller-owned streams back.
const RELEASE_QUEUE_CAPACITY: usize = NUM_CHANNELS * 4;

struct MixerState {
    ready: bool,
    handle_seed: u32,
    channels: [Option<Channel>; NUM_CHANNELS],
    sound_types: [SoundTypeSettings; SoundType::COUNT],
}

impl MixerState {
    /// The live channel `handle` refers to, if it is still the occupant.
    fn channel(&self, handle: SoundHandle) -> Option<&Channel> {
        self.channels[handle.slot()]
            .as_ref()
            .filter(|c| c.handle() == handle)
    }

    fn channel_mut(&mut self, handle: SoundHandle) -> Option<&mut Channel> {
        self.channels[handle.slot()]
            .as_mut()
            .filter(|c| c.handle() == handle)
    }

    fn live(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().flatten()
    }

    fn notify_type(&mut self, sound_type: SoundType) {
        let settings = self.sound_types[sound_type.index()];
        for channel in self.channels.iter_mut().flatten() {
            if channel.sound_type() == sound_type {
                channel.notify_global_vol_change(settings);
            }
        }
    }
}

/// Software mixer with a fixed number of channel slots.
///
/// Share it between the audio callback and control threads with an `Arc`.
pub struct Mixer {
    config: MixerConfig,
    env: ChannelEnv,
    released: Receiver<ReleasedStream>,
    state: Mutex<MixerState>,
}

impl Mixer {
    /// Create a mixer for the given output format.
    pub fn new(config: MixerConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a mixer that reads wall-clock time from `clock`.
    pub fn with_clock(config: MixerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        info!(
            rate = config.output_rate,
            stereo = config.stereo,
            buffer = config.output_buffer_size,
            "Initializing mixer"
        );

        let (release, released) = bounded(RELEASE_QUEUE_CAPACITY);
        Ok(Self {
            config,
            env: ChannelEnv {
                output_rate: config.output_rate,
                output_stereo: config.stereo,
                clock,
                release,
            },
            released,
            state: Mutex::new(MixerState {
                ready: false,
                handle_seed: 0,
                channels: std::array::from_fn(|_| None),
                sound_types: [SoundTypeSettings::default(); SoundType::COUNT],
            }),
        })
    }

    /// Output format this mixer was created with.
    pub fn config(&self) -> MixerConfig {
        self.config
    }

    /// Output sample rate in Hz.
    pub fn output_rate(&self) -> u32 {
        self.config.output_rate
    }

    /// Whether the output buffer is interleaved stereo.
    pub fn output_stereo(&self) -> bool {
        self.config.stereo
    }

    /// Frames requested per backend callback.
    pub fn output_buffer_size(&self) -> u32 {
        self.config.output_buffer_size
    }

    /// Mark whether the backend is driving [`mix_callback`](Self::mix_callback).
    pub fn set_ready(&self, ready: bool) {
        self.state.lock().ready = ready;
    }

    /// Whether a backend has been attached or has called the mix callback.
    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    /// Receiving end for streams played with
    /// [`DisposeAfterUse::No`](crate::DisposeAfterUse::No). Each such stream
    /// arrives exactly once, after its channel is gone or its play request
    /// was turned down.
    pub fn release_receiver(&self) -> Receiver<ReleasedStream> {
        self.released.clone()
    }

    /// Start playing `stream`.
    ///
    /// Returns `None` without playing when the mixer is not ready, when a
    /// live channel already carries `options.id`, or when every slot is
    /// taken. The stream is disposed of per `options.dispose` in that case.
    pub fn play_stream(
        &self,
        sound_type: SoundType,
        stream: Box<dyn AudioStream>,
        options: PlayOptions,
    ) -> Option<SoundHandle> {
        let mut state = self.state.lock();

        if !state.ready {
            warn!("play_stream called before the mixer is ready");
            self.env.release(SoundHandle::INVALID, stream, options.dispose);
            return None;
        }

        // Prevent duplicate sounds; negative ids never collide
        if let Some(id) = options.id.filter(|id| *id >= 0) {
            if state.live().any(|c| c.id() == Some(id)) {
                self.env.release(SoundHandle::INVALID, stream, options.dispose);
                return None;
            }
        }

        let Some(slot) = state.channels.iter().position(Option::is_none) else {
            warn!("Out of mixer slots");
            self.env.release(SoundHandle::INVALID, stream, options.dispose);
            return None;
        };

        let reverse_stereo = options.reverse_stereo ^ cfg!(feature = "reverse-stereo");
        let mut channel = Channel::new(
            sound_type,
            stream,
            options.dispose,
            reverse_stereo,
            options.id,
            options.permanent,
            state.sound_types[sound_type.index()],
            self.env.clone(),
        );
        channel.set_volume(options.volume);
        channel.set_balance(options.balance);

        let mut handle = SoundHandle::new(slot, state.handle_seed);
        state.handle_seed = state.handle_seed.wrapping_add(1);
        if handle == SoundHandle::INVALID {
            handle = SoundHandle::new(slot, state.handle_seed);
            state.handle_seed = state.handle_seed.wrapping_add(1);
        }
        channel.set_handle(handle);
        state.channels[slot] = Some(channel);

        debug!(%handle, slot, ?sound_type, "Playing stream");
        Some(handle)
    }

    /// Fill `buf` (interleaved, output layout) with the mix of every
    /// unpaused channel, evicting channels that have finished.
    ///
    /// Returns the largest number of frames any single channel produced,
    /// not the buffer length; frames past that point are silence.
    pub fn mix_callback(&self, buf: &mut [i16]) -> usize {
        let mut state = self.state.lock();

        // Being called proves a backend is driving us
        state.ready = true;

        buf.fill(0);

        let channels = self.config.output_channels() as usize;
        if buf.len() % channels != 0 {
            warn!(len = buf.len(), "Output buffer ends in a partial frame");
        }
        let frames = buf.len() / channels;

        let mut produced = 0;
        for slot in state.channels.iter_mut() {
            let finished = match slot {
                Some(channel) => channel.is_finished(),
                None => continue,
            };
            if finished {
                if let Some(channel) = slot.take() {
                    debug!(handle = %channel.handle(), "Channel finished");
                }
                continue;
            }
            if let Some(channel) = slot.as_mut().filter(|c| !c.is_paused()) {
                produced = produced.max(channel.mix(buf, frames));
            }
        }

        produced
    }

    /// [`mix_callback`](Self::mix_callback) on a raw byte buffer of native
    /// endian 16-bit samples. Returns 0 without mixing if the buffer is not
    /// aligned for `i16`.
    pub fn mix_callback_bytes(&self, bytes: &mut [u8]) -> usize {
        bytes.fill(0);
        let usable = bytes.len() - bytes.len() % 2;
        match bytemuck::try_cast_slice_mut::<u8, i16>(&mut bytes[..usable]) {
            Ok(samples) => self.mix_callback(samples),
            Err(err) => {
                warn!(?err, "Output byte buffer is not usable as 16-bit samples");
                0
            }
        }
    }

    /// Stop every channel except permanent ones.
    pub fn stop_all(&self) {
        let mut state = self.state.lock();
        for slot in state.channels.iter_mut() {
            if slot.as_ref().is_some_and(|c| !c.is_permanent()) {
                *slot = None;
            }
        }
    }

    /// Stop every channel carrying `id`, permanent or not.
    pub fn stop_id(&self, id: i32) {
        let mut state = self.state.lock();
        for slot in state.channels.iter_mut() {
            if slot.as_ref().is_some_and(|c| c.id() == Some(id)) {
                *slot = None;
            }
        }
    }

    /// Stop the sound `handle` refers to, permanent or not.
    pub fn stop_handle(&self, handle: SoundHandle) {
        let mut state = self.state.lock();
        // Simply ignore stop requests for sounds that already terminated
        if state.channel(handle).is_some() {
            state.channels[handle.slot()] = None;
        }
    }

    /// Pause or unpause every channel. Pauses nest.
    pub fn pause_all(&self, paused: bool) {
        let mut state = self.state.lock();
        for channel in state.channels.iter_mut().flatten() {
            channel.pause(paused);
        }
    }

    /// Pause or unpause the first channel carrying `id`.
    pub fn pause_id(&self, id: i32, paused: bool) {
        let mut state = self.state.lock();
        if let Some(channel) = state
            .channels
            .iter_mut()
            .flatten()
            .find(|c| c.id() == Some(id))
        {
            channel.pause(paused);
        }
    }

    /// Pause or unpause one sound. Pauses nest.
    pub fn pause_handle(&self, handle: SoundHandle, paused: bool) {
        self.with_channel(handle, |c| c.pause(paused));
    }

    /// Mute or unmute every present and future sound of `sound_type`.
    pub fn mute_sound_type(&self, sound_type: SoundType, mute: bool) {
        let mut state = self.state.lock();
        state.sound_types[sound_type.index()].mute = mute;
        state.notify_type(sound_type);
    }

    /// Whether `sound_type` is muted.
    pub fn is_sound_type_muted(&self, sound_type: SoundType) -> bool {
        self.state.lock().sound_types[sound_type.index()].mute
    }

    /// Set the volume of a sound type, clamped to `0..=MAX_MIXER_VOLUME`.
    pub fn set_volume_for_sound_type(&self, sound_type: SoundType, volume: i32) {
        let volume = volume.clamp(0, MAX_MIXER_VOLUME as i32) as u16;
        let mut state = self.state.lock();
        state.sound_types[sound_type.index()].volume = volume;
        state.notify_type(sound_type);
    }

    /// Current volume of `sound_type`, 0 to 256.
    pub fn volume_for_sound_type(&self, sound_type: SoundType) -> u16 {
        self.state.lock().sound_types[sound_type.index()].volume
    }

    /// Set the per-channel volume, 0 to 255.
    pub fn set_channel_volume(&self, handle: SoundHandle, volume: u8) {
        self.with_channel(handle, |c| c.set_volume(volume));
    }

    /// Stored channel volume, 0 for a dead handle.
    pub fn channel_volume(&self, handle: SoundHandle) -> u8 {
        self.with_channel(handle, |c| c.volume()).unwrap_or(0)
    }

    /// Set the balance, -127 (left) to 127 (right).
    pub fn set_channel_balance(&self, handle: SoundHandle, balance: i8) {
        self.with_channel(handle, |c| c.set_balance(balance));
    }

    /// Stored balance, 0 for a dead handle.
    pub fn channel_balance(&self, handle: SoundHandle) -> i8 {
        self.with_channel(handle, |c| c.balance()).unwrap_or(0)
    }

    /// Set the left fader, applied after volume and balance.
    pub fn set_channel_fader_l(&self, handle: SoundHandle, fader: u8) {
        self.with_channel(handle, |c| c.set_fader_l(fader));
    }

    /// Left fader level, 0 for a dead handle.
    pub fn channel_fader_l(&self, handle: SoundHandle) -> u8 {
        self.with_channel(handle, |c| c.fader_l()).unwrap_or(0)
    }

    /// Set the right fader, applied after volume and balance.
    pub fn set_channel_fader_r(&self, handle: SoundHandle, fader: u8) {
        self.with_channel(handle, |c| c.set_fader_r(fader));
    }

    /// Right fader level, 0 for a dead handle.
    pub fn channel_fader_r(&self, handle: SoundHandle) -> u8 {
        self.with_channel(handle, |c| c.fader_r()).unwrap_or(0)
    }

    /// Override the rate the channel's stream is played at.
    pub fn set_channel_rate(&self, handle: SoundHandle, rate: u32) {
        self.with_channel(handle, |c| c.set_rate(rate));
    }

    /// Rate the stream is currently played at, 0 for a dead handle.
    pub fn channel_rate(&self, handle: SoundHandle) -> u32 {
        self.with_channel(handle, |c| c.rate()).unwrap_or(0)
    }

    /// Go back to the stream's native rate.
    pub fn reset_channel_rate(&self, handle: SoundHandle) {
        self.with_channel(handle, |c| c.reset_rate());
    }

    /// How long the sound has been playing. Zero for a dead handle.
    pub fn elapsed_time(&self, handle: SoundHandle) -> Timestamp {
        self.with_channel(handle, |c| c.elapsed_time())
            .unwrap_or_else(|| Timestamp::new(0, self.config.output_rate))
    }

    /// [`elapsed_time`](Self::elapsed_time) in milliseconds.
    pub fn sound_elapsed_time(&self, handle: SoundHandle) -> u32 {
        self.elapsed_time(handle).msecs().clamp(0, u32::MAX as i64) as u32
    }

    /// Make the sound loop forever if its stream can rewind.
    pub fn loop_channel(&self, handle: SoundHandle) {
        self.with_channel(handle, |c| c.loop_stream());
    }

    /// Whether any live channel carries `id`.
    pub fn is_sound_id_active(&self, id: i32) -> bool {
        self.state.lock().live().any(|c| c.id() == Some(id))
    }

    /// Id the sound was started with, if it is live and had one.
    pub fn sound_id(&self, handle: SoundHandle) -> Option<i32> {
        self.state.lock().channel(handle).and_then(|c| c.id())
    }

    /// Whether `handle` still names a live channel.
    pub fn is_sound_handle_active(&self, handle: SoundHandle) -> bool {
        self.state.lock().channel(handle).is_some()
    }

    /// Whether any live channel is of `sound_type`.
    pub fn has_active_channel_of_type(&self, sound_type: SoundType) -> bool {
        self.state
            .lock()
            .live()
            .any(|c| c.sound_type() == sound_type)
    }

    /// Number of occupied slots, including finished channels not yet evicted.
    pub fn active_channel_count(&self) -> usize {
        self.state.lock().live().count()
    }

    fn with_channel<R>(&self, handle: SoundHandle, f: impl FnOnce(&mut Channel) -> R) -> Option<R> {
        let mut state = self.state.lock();
        state.channel_mut(handle).map(f)
    }
}
