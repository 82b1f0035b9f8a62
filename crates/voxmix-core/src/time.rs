//! Playback time measured against a sample rate.
//!
//! Positions are kept as exact rational seconds so that adding frame
//! counts at one rate and milliseconds on top never accumulates rounding
//! error. The frame rate only matters when converting back to frames.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A point in time expressed in seconds, tagged with the frame rate it is
/// measured against (usually the mixer output rate).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timestamp {
    /// Time value as a rational number (seconds)
    value: Rational64,
    framerate: u32,
}

impl Timestamp {
    /// Create a timestamp `msecs` milliseconds in, measured at `framerate`.
    ///
    /// A zero frame rate is bumped to 1 so frame conversions stay defined.
    pub fn new(msecs: u32, framerate: u32) -> Self {
        Self {
            value: Rational64::new(msecs as i64, 1000),
            framerate: framerate.max(1),
        }
    }

    /// Advance by `frames` frames at this timestamp's frame rate.
    #[inline]
    pub fn add_frames(self, frames: i64) -> Self {
        Self {
            value: self.value + Rational64::new(frames, self.framerate as i64),
            framerate: self.framerate,
        }
    }

    /// Advance by `msecs` milliseconds.
    #[inline]
    pub fn add_msecs(self, msecs: i64) -> Self {
        Self {
            value: self.value + Rational64::new(msecs, 1000),
            framerate: self.framerate,
        }
    }

    /// Whole milliseconds, rounded towards negative infinity.
    #[inline]
    pub fn msecs(self) -> i64 {
        (self.value * 1000).floor().to_integer()
    }

    #[inline]
    pub fn framerate(self) -> u32 {
        self.framerate
    }

    /// Check if this time is zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        *self.value.numer() == 0
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.msecs();
        let sign = if total < 0 { "-" } else { "" };
        let total = total.abs();
        write!(
            f,
            "{}{:02}:{:02}.{:03}",
            sign,
            total / 60_000,
            (total / 1000) % 60,
            total % 1000
        )
    }
}
