//! Sound sources the mixer pulls samples from.
//!
//! Decoders live outside this crate; anything that can hand out interleaved
//! 16-bit PCM implements [`AudioStream`]. Rewinding is an optional
//! capability, queried at runtime through [`AudioStream::is_rewindable`].

/// A source of interleaved signed 16-bit samples.
pub trait AudioStream: Send {
    /// Fill `buf` with up to `buf.len()` samples (not frames). For stereo
    /// streams the samples are interleaved left/right. Returns the number
    /// of samples written.
    fn read_buffer(&mut self, buf: &mut [i16]) -> usize;

    /// Whether the stream produces two interleaved channels.
    fn is_stereo(&self) -> bool;

    /// Native sample rate in Hz.
    fn rate(&self) -> u32;

    /// No more data is available right now.
    fn end_of_data(&self) -> bool;

    /// No more data will ever become available.
    fn end_of_stream(&self) -> bool {
        self.end_of_data()
    }

    /// Whether [`rewind`](Self::rewind) is supported.
    fn is_rewindable(&self) -> bool {
        false
    }

    /// Seek back to the first sample. Returns `false` if unsupported or the
    /// seek failed.
    fn rewind(&mut self) -> bool {
        false
    }
}

/// In-memory PCM data, played once.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    samples: Vec<i16>,
    pos: usize,
    rate: u32,
    stereo: bool,
}

impl MemoryStream {
    /// Wrap interleaved samples. A trailing half frame of a stereo buffer is
    /// discarded.
    pub fn new(mut samples: Vec<i16>, rate: u32, stereo: bool) -> Self {
        if stereo && samples.len() % 2 != 0 {
            samples.pop();
        }
        Self {
            samples,
            pos: 0,
            rate,
            stereo,
        }
    }

    /// Number of frames (sample pairs for stereo data) held.
    pub fn frame_count(&self) -> usize {
        if self.stereo {
            self.samples.len() / 2
        } else {
            self.samples.len()
        }
    }
}

impl AudioStream for MemoryStream {
    fn read_buffer(&mut self, buf: &mut [i16]) -> usize {
        let count = buf.len().min(self.samples.len() - self.pos);
        buf[..count].copy_from_slice(&self.samples[self.pos..self.pos + count]);
        self.pos += count;
        count
    }

    fn is_stereo(&self) -> bool {
        self.stereo
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn end_of_data(&self) -> bool {
        self.pos >= self.samples.len()
    }

    fn is_rewindable(&self) -> bool {
        true
    }

    fn rewind(&mut self) -> bool {
        self.pos = 0;
        true
    }
}

/// Mono sine tone generator.
#[derive(Debug, Clone)]
pub struct SineStream {
    rate: u32,
    frequency: f32,
    amplitude: i16,
    /// Remaining samples, `None` for an endless tone.
    length: Option<usize>,
    remaining: Option<usize>,
    phase: f32,
}

impl SineStream {
    /// A tone lasting `frames` samples.
    pub fn new(frequency: f32, amplitude: i16, rate: u32, frames: usize) -> Self {
        Self {
            rate,
            frequency,
            amplitude,
            length: Some(frames),
            remaining: Some(frames),
            phase: 0.0,
        }
    }

    /// A tone that never ends.
    pub fn endless(frequency: f32, amplitude: i16, rate: u32) -> Self {
        Self {
            length: None,
            remaining: None,
            ..Self::new(frequency, amplitude, rate, 0)
        }
    }
}

impl AudioStream for SineStream {
    fn read_buffer(&mut self, buf: &mut [i16]) -> usize {
        let count = match self.remaining {
            Some(remaining) => buf.len().min(remaining),
            None => buf.len(),
        };
        let step = std::f32::consts::TAU * self.frequency / self.rate.max(1) as f32;
        for s in buf[..count].iter_mut() {
            *s = (self.phase.sin() * self.amplitude as f32) as i16;
            self.phase = (self.phase + step) % std::f32::consts::TAU;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= count;
        }
        count
    }

    fn is_stereo(&self) -> bool {
        false
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn end_of_data(&self) -> bool {
        self.remaining == Some(0)
    }

    fn is_rewindable(&self) -> bool {
        true
    }

    fn rewind(&mut self) -> bool {
        self.remaining = self.length;
        self.phase = 0.0;
        true
    }
}

/// Replays a rewindable stream whenever it runs out.
pub struct LoopingStream {
    inner: Box<dyn AudioStream>,
    /// Total number of plays, `0` for forever.
    loops: u32,
    completed: u32,
    /// Set once the inner stream fails to rewind or yields nothing.
    stalled: bool,
}

impl LoopingStream {
    /// Loop `inner` `loops` times in total; `0` loops forever.
    ///
    /// Returns the stream back if it cannot be rewound.
    pub fn new(inner: Box<dyn AudioStream>, loops: u32) -> Result<Self, Box<dyn AudioStream>> {
        if !inner.is_rewindable() {
            return Err(inner);
        }
        Ok(Self {
            inner,
            loops,
            completed: 0,
            stalled: false,
        })
    }

    /// Number of times the inner stream has played through.
    pub fn completed_iterations(&self) -> u32 {
        self.completed
    }

    /// Unwrap the looped stream.
    pub fn into_inner(self) -> Box<dyn AudioStream> {
        self.inner
    }

    fn loops_left(&self) -> bool {
        self.loops == 0 || self.completed < self.loops
    }
}

impl AudioStream for LoopingStream {
    fn read_buffer(&mut self, buf: &mut [i16]) -> usize {
        let mut filled = 0;
        while filled < buf.len() && !self.stalled {
            let read = self.inner.read_buffer(&mut buf[filled..]);
            filled += read;
            if !self.inner.end_of_data() {
                if read == 0 {
                    break;
                }
                continue;
            }

            self.completed = self.completed.saturating_add(1);
            if !self.loops_left() {
                break;
            }
            if !self.inner.rewind() || self.inner.end_of_data() {
                // Empty or broken source: stop instead of spinning.
                self.stalled = true;
            }
        }
        filled
    }

    fn is_stereo(&self) -> bool {
        self.inner.is_stereo()
    }

    fn rate(&self) -> u32 {
        self.inner.rate()
    }

    fn end_of_data(&self) -> bool {
        self.stalled || (!self.loops_left() && self.inner.end_of_data())
    }

    fn end_of_stream(&self) -> bool {
        self.end_of_data()
    }
}
