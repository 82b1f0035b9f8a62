//! A single playing sound and its mixing state.

use crate::clock::Clock;
use crate::rate::{make_rate_converter, RateConverter};
use crate::sound::{DisposeAfterUse, SoundHandle, SoundType, SoundTypeSettings};
use crate::stream::{AudioStream, LoopingStream};
use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;
use tracing::warn;
use voxmix_core::volume::{MAX_BALANCE, MAX_CHANNEL_VOLUME};
use voxmix_core::Timestamp;

/// A caller-owned stream returned by the mixer, with the handle it played
/// under ([`SoundHandle::INVALID`] if it never got a channel).
pub type ReleasedStream = (SoundHandle, Box<dyn AudioStream>);

/// Mixer-wide context every channel needs.
#[derive(Clone)]
pub struct ChannelEnv {
    pub output_rate: u32,
    pub output_stereo: bool,
    pub clock: Arc<dyn Clock>,
    pub release: Sender<ReleasedStream>,
}

impl ChannelEnv {
    /// Dispose of a stream according to `dispose`.
    pub(crate) fn release(
        &self,
        handle: SoundHandle,
        stream: Box<dyn AudioStream>,
        dispose: DisposeAfterUse,
    ) {
        if dispose == DisposeAfterUse::Yes {
            return;
        }
        match self.release.try_send((handle, stream)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%handle, "Release queue full, dropping caller-owned stream");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(%handle, "Release queue closed, dropping caller-owned stream");
            }
        }
    }
}

enum ChannelStream {
    Plain(Box<dyn AudioStream>),
    Looping(LoopingStream),
}

impl ChannelStream {
    fn get(&self) -> &dyn AudioStream {
        match self {
            ChannelStream::Plain(s) => s.as_ref(),
            ChannelStream::Looping(s) => s,
        }
    }

    fn get_mut(&mut self) -> &mut dyn AudioStream {
        match self {
            ChannelStream::Plain(s) => s.as_mut(),
            ChannelStream::Looping(s) => s,
        }
    }

    fn into_inner(self) -> Box<dyn AudioStream> {
        match self {
            ChannelStream::Plain(s) => s,
            ChannelStream::Looping(s) => s.into_inner(),
        }
    }
}

/// Stand-in left behind while the real stream is moved out.
struct Detached;

impl AudioStream for Detached {
    fn read_buffer(&mut self, _buf: &mut [i16]) -> usize {
        0
    }
    fn is_stereo(&self) -> bool {
        false
    }
    fn rate(&self) -> u32 {
        1
    }
    fn end_of_data(&self) -> bool {
        true
    }
}

fn detached() -> ChannelStream {
    ChannelStream::Plain(Box::new(Detached))
}

/// One sound instance being mixed.
pub struct Channel {
    sound_type: SoundType,
    handle: SoundHandle,
    permanent: bool,
    pause_level: u32,
    id: Option<i32>,

    volume: u8,
    balance: i8,
    fader_l: u8,
    fader_r: u8,
    type_settings: SoundTypeSettings,
    vol_l: u16,
    vol_r: u16,

    samples_consumed: u32,
    samples_decoded: u32,
    /// Clock reading at the last mix call, `None` before the first one.
    mixer_time_stamp: Option<u32>,
    pause_start_time: u32,
    pause_time: u32,

    converter: Box<dyn RateConverter>,
    stream: ChannelStream,
    dispose: DisposeAfterUse,
    env: ChannelEnv,
}

impl Channel {
    /// Create a channel at full volume, centred, not yet holding a handle.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sound_type: SoundType,
        stream: Box<dyn AudioStream>,
        dispose: DisposeAfterUse,
        reverse_stereo: bool,
        id: Option<i32>,
        permanent: bool,
        type_settings: SoundTypeSettings,
        env: ChannelEnv,
    ) -> Self {
        let converter = make_rate_converter(
            stream.rate(),
            env.output_rate,
            stream.is_stereo(),
            env.output_stereo,
            reverse_stereo,
        );
        let mut channel = Self {
            sound_type,
            handle: SoundHandle::INVALID,
            permanent,
            pause_level: 0,
            id,
            volume: MAX_CHANNEL_VOLUME,
            balance: 0,
            fader_l: 255,
            fader_r: 255,
            type_settings,
            vol_l: 0,
            vol_r: 0,
            samples_consumed: 0,
            samples_decoded: 0,
            mixer_time_stamp: None,
            pause_start_time: 0,
            pause_time: 0,
            converter,
            stream: ChannelStream::Plain(stream),
            dispose,
            env,
        };
        channel.update_channel_volumes();
        channel
    }

    /// Mix up to `frames` frames into `data`. Returns the frames produced,
    /// which may be fewer than asked for without the channel being done.
    pub fn mix(&mut self, data: &mut [i16], frames: usize) -> usize {
        let mut produced = 0;
        if !self.stream.get().end_of_data() || self.converter.needs_draining() {
            self.samples_consumed = self.samples_decoded;
            self.mixer_time_stamp = Some(self.env.clock.millis());
            self.pause_time = 0;
            produced = self.converter.convert(
                self.stream.get_mut(),
                data,
                frames,
                self.vol_l,
                self.vol_r,
            );
            self.samples_decoded = self.samples_decoded.wrapping_add(produced as u32);
        }
        produced
    }

    /// The stream will never produce more data and the converter has
    /// nothing left to drain.
    pub fn is_finished(&self) -> bool {
        self.stream.get().end_of_stream() && !self.converter.needs_draining()
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub fn sound_type(&self) -> SoundType {
        self.sound_type
    }

    pub fn handle(&self) -> SoundHandle {
        self.handle
    }

    pub fn set_handle(&mut self, handle: SoundHandle) {
        self.handle = handle;
    }

    /// Nested pause: each `pause(true)` needs a matching `pause(false)`.
    pub fn pause(&mut self, paused: bool) {
        if paused {
            self.pause_level += 1;
            if self.pause_level == 1 {
                self.pause_start_time = self.env.clock.millis();
            }
        } else if self.pause_level > 0 {
            self.pause_level -= 1;
            if self.pause_level == 0 {
                let paused_for = self.env.clock.millis().wrapping_sub(self.pause_start_time);
                self.pause_time = self.pause_time.wrapping_add(paused_for);
                self.pause_start_time = 0;
            }
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_level != 0
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
        self.update_channel_volumes();
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Set the balance; -128 is treated as -127.
    pub fn set_balance(&mut self, balance: i8) {
        self.balance = balance.max(-MAX_BALANCE);
        self.update_channel_volumes();
    }

    pub fn balance(&self) -> i8 {
        self.balance
    }

    pub fn set_fader_l(&mut self, fader: u8) {
        self.fader_l = fader;
        self.update_channel_volumes();
    }

    pub fn fader_l(&self) -> u8 {
        self.fader_l
    }

    pub fn set_fader_r(&mut self, fader: u8) {
        self.fader_r = fader;
        self.update_channel_volumes();
    }

    pub fn fader_r(&self) -> u8 {
        self.fader_r
    }

    /// Play the stream as if it had been recorded at `rate`.
    pub fn set_rate(&mut self, rate: u32) {
        self.converter.set_input_rate(rate);
    }

    pub fn rate(&self) -> u32 {
        self.converter.input_rate()
    }

    /// Undo [`set_rate`](Self::set_rate).
    pub fn reset_rate(&mut self) {
        let native = self.stream.get().rate();
        self.converter.set_input_rate(native);
    }

    /// The sound type's settings changed.
    pub fn notify_global_vol_change(&mut self, settings: SoundTypeSettings) {
        self.type_settings = settings;
        self.update_channel_volumes();
    }

    /// Effective left/right gain handed to the converter.
    pub fn gains(&self) -> (u16, u16) {
        (self.vol_l, self.vol_r)
    }

    /// Approximate playback position at the output rate.
    ///
    /// Counts the frames consumed up to the last mix call and extrapolates
    /// from the wall clock since then, frozen while paused. It can run
    /// slightly ahead of what has actually been heard.
    pub fn elapsed_time(&self) -> Timestamp {
        let ts = Timestamp::new(0, self.env.output_rate);
        let Some(stamp) = self.mixer_time_stamp else {
            return ts;
        };

        let delta = if self.is_paused() {
            self.pause_start_time.wrapping_sub(stamp)
        } else {
            self.env
                .clock
                .millis()
                .wrapping_sub(stamp)
                .wrapping_sub(self.pause_time)
        };

        ts.add_frames(self.samples_consumed as i64)
            .add_msecs(delta as i32 as i64)
    }

    /// Loop the stream forever if it can be rewound.
    pub fn loop_stream(&mut self) {
        if matches!(self.stream, ChannelStream::Looping(_)) || !self.stream.get().is_rewindable() {
            return;
        }
        let ChannelStream::Plain(inner) = std::mem::replace(&mut self.stream, detached()) else {
            return;
        };
        self.stream = match LoopingStream::new(inner, 0) {
            Ok(looping) => ChannelStream::Looping(looping),
            Err(inner) => ChannelStream::Plain(inner),
        };
    }

    /// Recompute the converter gains from volume, balance, faders and the
    /// sound type settings. Integer arithmetic throughout; the rounding is
    /// part of the output format.
    fn update_channel_volumes(&mut self) {
        if self.type_settings.mute {
            self.vol_l = 0;
            self.vol_r = 0;
            return;
        }

        let max = MAX_CHANNEL_VOLUME as i32;
        let side = MAX_BALANCE as i32;
        let vol = self.type_settings.volume as i32 * self.volume as i32;
        let balance = self.balance as i32;

        let (vol_l, vol_r) = if balance == 0 {
            (vol / max, vol / max)
        } else if balance < 0 {
            (vol / max, ((side + balance) * vol) / (max * side))
        } else {
            (((side - balance) * vol) / (max * side), vol / max)
        };

        self.vol_l = (vol_l * self.fader_l as i32 / 255) as u16;
        self.vol_r = (vol_r * self.fader_r as i32 / 255) as u16;
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        let stream = std::mem::replace(&mut self.stream, detached()).into_inner();
        self.env.release(self.handle, stream, self.dispose);
    }
}
