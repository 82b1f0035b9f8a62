//! Voxmix - demo player
//!
//! Opens the default output device and plays a short arrangement of
//! generated tones through the mixer.
//!
//! Usage: `voxmix [settings.json]`

mod settings;

use anyhow::Result;
use settings::Settings;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use voxmix_audio::{
    CpalOutput, DisposeAfterUse, LoopingStream, MemoryStream, Mixer, PlayOptions, SineStream,
    SoundType,
};

const BEEP_ID: i32 = 1;

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Voxmix starting...");

    let settings = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("Loading settings: {:?}", path);
            Settings::load(&path)?
        }
        None => Settings::default(),
    };

    let mixer = Arc::new(Mixer::new(settings.mixer)?);
    settings.apply(&mixer);

    let output = CpalOutput::start(Arc::clone(&mixer))?;
    info!(device = output.device_name(), "Output running");

    play_demo(&mixer);

    mixer.stop_all();
    info!("Voxmix finished");
    Ok(())
}

fn play_demo(mixer: &Mixer) {
    let released = mixer.release_receiver();

    // Music bed at half rate so it goes through the resampler
    let bed = SineStream::new(110.0, 3000, 22050, 22050);
    let music = match LoopingStream::new(Box::new(bed), 0) {
        Ok(looped) => mixer.play_stream(
            SoundType::Music,
            Box::new(looped),
            PlayOptions {
                volume: 160,
                ..Default::default()
            },
        ),
        Err(_) => None,
    };

    // Speech stand-in: a mono clip that comes back to us when done
    let clip = MemoryStream::new(tone(330.0, 6000, 16000, 16000 * 2), 16000, false);
    let speech = mixer.play_stream(
        SoundType::Speech,
        Box::new(clip),
        PlayOptions {
            dispose: DisposeAfterUse::No,
            ..Default::default()
        },
    );

    // Beeps bouncing between the speakers
    for step in 0..8i32 {
        let beep = SineStream::new(880.0, 5000, mixer.output_rate(), 4410);
        let balance = if step % 2 == 0 { -127 } else { 127 };
        let handle = mixer.play_stream(
            SoundType::Sfx,
            Box::new(beep),
            PlayOptions {
                id: Some(BEEP_ID),
                balance,
                ..Default::default()
            },
        );
        if handle.is_none() {
            warn!(step, "Previous beep still playing");
        }

        if step == 4 {
            mixer.pause_all(true);
            thread::sleep(Duration::from_millis(300));
            mixer.pause_all(false);
        }

        thread::sleep(Duration::from_millis(500));

        if let Some(handle) = music {
            info!(elapsed = %mixer.elapsed_time(handle), "Music position");
        }
    }

    if let Some(handle) = speech {
        if mixer.is_sound_handle_active(handle) {
            mixer.stop_handle(handle);
        }
    }

    while let Ok((handle, _stream)) = released.try_recv() {
        info!(%handle, "Stream handed back");
    }
}

/// A mono sine clip as raw samples.
fn tone(frequency: f32, amplitude: i16, rate: u32, frames: usize) -> Vec<i16> {
    let step = std::f32::consts::TAU * frequency / rate as f32;
    (0..frames)
        .map(|n| ((n as f32 * step).sin() * amplitude as f32) as i16)
        .collect()
}
