//! Shared fixtures.

use std::sync::Arc;
use voxmix_audio::{AudioStream, ManualClock, MemoryStream, Mixer, MixerConfig};

pub const RATE: u32 = 44100;

/// A ready stereo mixer at 44.1 kHz.
pub fn ready_mixer() -> Mixer {
    let mixer = Mixer::new(MixerConfig::new(RATE, true, 1024)).unwrap();
    mixer.set_ready(true);
    mixer
}

/// A ready stereo mixer reading time from a manual clock.
pub fn mixer_with_clock(start_ms: u32) -> (Mixer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_ms));
    let mixer = Mixer::with_clock(MixerConfig::new(RATE, true, 1024), clock.clone()).unwrap();
    mixer.set_ready(true);
    (mixer, clock)
}

/// Stereo stream at the output rate holding `frames` frames of a ramp.
pub fn stereo_ramp(frames: usize) -> Box<dyn AudioStream> {
    let samples = (0..frames * 2).map(|i| ((i % 1000) as i16) + 1).collect();
    Box::new(MemoryStream::new(samples, RATE, true))
}

/// Stereo stream at the output rate holding `frames` frames of `value`.
pub fn constant(value: i16, frames: usize) -> Box<dyn AudioStream> {
    Box::new(MemoryStream::new(vec![value; frames * 2], RATE, true))
}

/// Mono stream that cannot be rewound.
pub struct OneShot {
    left: usize,
}

impl OneShot {
    pub fn boxed(frames: usize) -> Box<dyn AudioStream> {
        Box::new(Self { left: frames })
    }
}

impl AudioStream for OneShot {
    fn read_buffer(&mut self, buf: &mut [i16]) -> usize {
        let count = buf.len().min(self.left);
        buf[..count].fill(100);
        self.left -= count;
        count
    }

    fn is_stereo(&self) -> bool {
        false
    }

    fn rate(&self) -> u32 {
        RATE
    }

    fn end_of_data(&self) -> bool {
        self.left == 0
    }
}
