//! Sample rate and channel layout conversion.
//!
//! A converter pulls frames from an [`AudioStream`], converts them to the
//! mixer's output rate and layout, applies a left/right gain and adds the
//! result into the output buffer. Input frames are read in blocks into an
//! internal buffer, so a converter can still hold data after its source
//! has reported the end; see [`RateConverter::needs_draining`].
//!
//! When interpolating, the last input frame is still emitted after the
//! source runs dry, so N input frames at ratio R yield about N * R output
//! frames.

use crate::stream::AudioStream;
use tracing::warn;
use voxmix_core::volume::MAX_MIXER_VOLUME;

/// Input rates must stay below this for the 16.16 position arithmetic.
pub const MAX_INPUT_RATE: u32 = 131_072;

const FRAC_BITS: u32 = 16;
const FRAC_ONE: u32 = 1 << FRAC_BITS;

/// Samples pulled from the source per refill.
const INTERMEDIATE_BUFFER_SIZE: usize = 512;

/// Converts one stream into the mixer's output format.
pub trait RateConverter: Send {
    /// Produce up to `frames` output frames from `input`, scaled by
    /// `vol_l`/`vol_r` (out of [`MAX_MIXER_VOLUME`]) and added with
    /// saturation into `out`. Returns the number of frames produced.
    fn convert(
        &mut self,
        input: &mut dyn AudioStream,
        out: &mut [i16],
        frames: usize,
        vol_l: u16,
        vol_r: u16,
    ) -> usize;

    /// Whether input remains, buffered or held for interpolation, that has
    /// not been converted yet.
    fn needs_draining(&self) -> bool;

    /// Change the rate the input is interpreted at.
    fn set_input_rate(&mut self, rate: u32);

    fn input_rate(&self) -> u32;
}

/// Create the converter for a stream with the given format.
pub fn make_rate_converter(
    in_rate: u32,
    out_rate: u32,
    in_stereo: bool,
    out_stereo: bool,
    reverse_stereo: bool,
) -> Box<dyn RateConverter> {
    Box::new(LinearRateConverter::new(
        in_rate,
        out_rate,
        in_stereo,
        out_stereo,
        reverse_stereo,
    ))
}

/// Copies frames when input and output rates match and interpolates
/// linearly otherwise. The choice is made on every call, so a rate change
/// applies to the very next conversion.
pub struct LinearRateConverter {
    in_rate: u32,
    out_rate: u32,
    in_stereo: bool,
    out_stereo: bool,
    reverse_stereo: bool,
    buf: Box<[i16]>,
    buf_pos: usize,
    buf_len: usize,
    /// Left half of a stereo frame split across two reads.
    carry: Option<i16>,
    /// 16.16 position between `last` and `cur`.
    opos: u32,
    last: [i16; 2],
    cur: [i16; 2],
    /// `cur` holds an input frame that has not been emitted yet.
    held: bool,
}

impl LinearRateConverter {
    pub fn new(
        in_rate: u32,
        out_rate: u32,
        in_stereo: bool,
        out_stereo: bool,
        reverse_stereo: bool,
    ) -> Self {
        let in_rate = if (1..MAX_INPUT_RATE).contains(&in_rate) {
            in_rate
        } else {
            warn!(in_rate, "Unsupported input rate, using output rate");
            out_rate
        };
        Self {
            in_rate,
            out_rate: out_rate.max(1),
            in_stereo,
            out_stereo,
            reverse_stereo,
            buf: vec![0i16; INTERMEDIATE_BUFFER_SIZE].into_boxed_slice(),
            buf_pos: 0,
            buf_len: 0,
            carry: None,
            // Two steps in: the first output lands exactly on input frame 0
            opos: FRAC_ONE * 2,
            last: [0; 2],
            cur: [0; 2],
            held: false,
        }
    }

    /// Next input frame, refilling from the stream when the buffer is empty.
    fn next_frame(&mut self, input: &mut dyn AudioStream) -> Option<[i16; 2]> {
        if self.buf_pos >= self.buf_len {
            let start = match self.carry.take() {
                Some(sample) => {
                    self.buf[0] = sample;
                    1
                }
                None => 0,
            };
            let mut len = start + input.read_buffer(&mut self.buf[start..]);
            if self.in_stereo && len % 2 != 0 {
                len -= 1;
                self.carry = Some(self.buf[len]);
            }
            self.buf_pos = 0;
            self.buf_len = len;
            if len == 0 {
                return None;
            }
        }

        let frame = if self.in_stereo {
            [self.buf[self.buf_pos], self.buf[self.buf_pos + 1]]
        } else {
            [self.buf[self.buf_pos]; 2]
        };
        self.buf_pos += if self.in_stereo { 2 } else { 1 };
        Some(frame)
    }

    fn mix_frame(&self, out: &mut [i16], index: usize, frame: [i16; 2], vol_l: u16, vol_r: u16) {
        if self.out_stereo {
            let (left, right) = if self.reverse_stereo {
                (index * 2 + 1, index * 2)
            } else {
                (index * 2, index * 2 + 1)
            };
            clamped_add(&mut out[left], scale(frame[0] as i32, vol_l));
            clamped_add(&mut out[right], scale(frame[1] as i32, vol_r));
        } else {
            let sample = (frame[0] as i32 + frame[1] as i32) / 2;
            let vol = (vol_l as u32 + vol_r as u32) / 2;
            clamped_add(&mut out[index], scale(sample, vol as u16));
        }
    }

    fn copy_convert(
        &mut self,
        input: &mut dyn AudioStream,
        out: &mut [i16],
        frames: usize,
        vol_l: u16,
        vol_r: u16,
    ) -> usize {
        let mut produced = 0;
        // Coming from the interpolating path
        if self.held && frames > 0 {
            self.mix_frame(out, 0, self.cur, vol_l, vol_r);
            self.held = false;
            produced = 1;
        }
        self.opos = FRAC_ONE * 2;

        while produced < frames {
            let Some(frame) = self.next_frame(input) else {
                break;
            };
            self.mix_frame(out, produced, frame, vol_l, vol_r);
            produced += 1;
        }
        produced
    }

    fn interpolate_convert(
        &mut self,
        input: &mut dyn AudioStream,
        out: &mut [i16],
        frames: usize,
        vol_l: u16,
        vol_r: u16,
    ) -> usize {
        let step = ((self.in_rate as u64) << FRAC_BITS) / self.out_rate as u64;
        let step = step as u32;
        let mut produced = 0;

        while produced < frames {
            while self.opos >= FRAC_ONE {
                match self.next_frame(input) {
                    Some(frame) => {
                        self.last = self.cur;
                        self.cur = frame;
                        self.held = true;
                    }
                    // Source is dry: hold the final frame for one input step
                    None if self.held => {
                        self.last = self.cur;
                        self.held = false;
                    }
                    None => return produced,
                }
                self.opos -= FRAC_ONE;
            }

            let frac = self.opos as i64;
            let mut frame = [0i16; 2];
            for (ch, sample) in frame.iter_mut().enumerate() {
                let last = self.last[ch] as i64;
                let cur = self.cur[ch] as i64;
                *sample = (last + (((cur - last) * frac) >> FRAC_BITS)) as i16;
            }
            self.mix_frame(out, produced, frame, vol_l, vol_r);
            produced += 1;
            self.opos += step;
        }
        produced
    }
}

impl RateConverter for LinearRateConverter {
    fn convert(
        &mut self,
        input: &mut dyn AudioStream,
        out: &mut [i16],
        frames: usize,
        vol_l: u16,
        vol_r: u16,
    ) -> usize {
        let out_channels = if self.out_stereo { 2 } else { 1 };
        let frames = frames.min(out.len() / out_channels);
        if self.in_rate == self.out_rate {
            self.copy_convert(input, out, frames, vol_l, vol_r)
        } else {
            self.interpolate_convert(input, out, frames, vol_l, vol_r)
        }
    }

    fn needs_draining(&self) -> bool {
        self.buf_pos < self.buf_len || self.held
    }

    fn set_input_rate(&mut self, rate: u32) {
        if rate == 0 || rate >= MAX_INPUT_RATE {
            warn!(rate, "Ignoring out-of-range input rate");
            return;
        }
        self.in_rate = rate;
    }

    fn input_rate(&self) -> u32 {
        self.in_rate
    }
}

#[inline]
fn scale(sample: i32, vol: u16) -> i32 {
    sample * vol as i32 / MAX_MIXER_VOLUME as i32
}

#[inline]
fn clamped_add(a: &mut i16, b: i32) {
    *a = (*a as i32 + b).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
}
