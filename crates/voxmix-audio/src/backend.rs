//! CPAL output backend.
//!
//! Opens the default output device in the mixer's format and calls
//! [`Mixer::mix_callback`] from the device's audio thread. Dropping the
//! returned [`CpalOutput`] stops playback.

use crate::mixer::Mixer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, Stream, StreamConfig, SupportedBufferSize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Errors that can occur while opening the audio device.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),
}

/// Upper bound on the float conversion buffer, in frames.
const MAX_SCRATCH_FRAMES: u32 = 16384;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// A running output stream feeding from a [`Mixer`].
pub struct CpalOutput {
    _stream: Stream,
    device_name: String,
    sample_format: SampleFormat,
}

impl CpalOutput {
    /// Open the default output device and start pulling from `mixer`.
    pub fn start(mixer: Arc<Mixer>) -> BackendResult<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(BackendError::NoDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!(device = %device_name, "Using audio device");

        let supported = device
            .default_output_config()
            .map_err(|e| BackendError::ConfigError(e.to_string()))?;
        let sample_format = supported.sample_format();

        // Largest callback the device may ask for
        let requested = mixer.output_buffer_size();
        let max_frames = match supported.buffer_size() {
            SupportedBufferSize::Range { max, .. } => {
                (*max).clamp(requested, MAX_SCRATCH_FRAMES.max(requested))
            }
            SupportedBufferSize::Unknown => requested,
        };

        let config = StreamConfig {
            channels: mixer.config().output_channels(),
            sample_rate: SampleRate(mixer.output_rate()),
            buffer_size: BufferSize::Fixed(mixer.output_buffer_size()),
        };

        let stream = match sample_format {
            SampleFormat::I16 => build_i16_stream(&device, &config, Arc::clone(&mixer))?,
            SampleFormat::F32 => {
                build_f32_stream(&device, &config, Arc::clone(&mixer), max_frames)?
            }
            other => return Err(BackendError::UnsupportedFormat(format!("{other:?}"))),
        };

        mixer.set_ready(true);
        stream
            .play()
            .map_err(|e| BackendError::StreamPlayError(e.to_string()))?;

        info!(
            channels = config.channels,
            rate = config.sample_rate.0,
            frames = mixer.output_buffer_size(),
            format = ?sample_format,
            "Audio output started"
        );

        Ok(Self {
            _stream: stream,
            device_name,
            sample_format,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }
}

fn build_i16_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mixer: Arc<Mixer>,
) -> BackendResult<Stream> {
    device
        .build_output_stream(
            config,
            move |data: &mut [i16], _info: &cpal::OutputCallbackInfo| {
                mixer.mix_callback(data);
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| BackendError::StreamBuildError(e.to_string()))
}

/// Devices that only take floats mix into an `i16` scratch buffer first.
fn build_f32_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mixer: Arc<Mixer>,
    max_frames: u32,
) -> BackendResult<Stream> {
    let mut scratch = vec![0i16; max_frames as usize * config.channels as usize];
    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                mix_to_f32(&mixer, &mut scratch, data);
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| BackendError::StreamBuildError(e.to_string()))
}

/// Mix into `data` through `scratch`, one scratch-sized block at a time.
/// `scratch` must hold a whole number of frames; it is never resized.
fn mix_to_f32(mixer: &Mixer, scratch: &mut [i16], data: &mut [f32]) {
    if scratch.is_empty() {
        data.fill(0.0);
        return;
    }
    for block in data.chunks_mut(scratch.len()) {
        let samples = &mut scratch[..block.len()];
        mixer.mix_callback(samples);
        for (out, &s) in block.iter_mut().zip(samples.iter()) {
            *out = s as f32 / 32768.0;
        }
    }
}
