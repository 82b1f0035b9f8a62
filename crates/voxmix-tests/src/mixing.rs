//! What ends up in the output buffer.

use crate::support::{constant, ready_mixer, stereo_ramp, OneShot, RATE};
use voxmix_audio::{MemoryStream, PlayOptions, SoundType};

fn frames(buf: &[i16]) -> impl Iterator<Item = (i16, i16)> + '_ {
    buf.chunks_exact(2).map(|f| (f[0], f[1]))
}

#[test]
fn unity_gain_copies_samples() {
    let mixer = ready_mixer();
    let samples: Vec<i16> = (0..128).map(|i| (i * 37 - 2000) as i16).collect();
    mixer.play_stream(
        SoundType::Plain,
        Box::new(MemoryStream::new(samples.clone(), RATE, true)),
        PlayOptions::default(),
    );

    let mut buf = vec![0i16; 128];
    assert_eq!(mixer.mix_callback(&mut buf), 64);
    assert_eq!(buf, samples);
}

#[test]
fn two_channels_sum() {
    let mixer = ready_mixer();
    mixer.play_stream(SoundType::Sfx, constant(1000, 64), PlayOptions::default());
    mixer.play_stream(SoundType::Music, constant(-300, 64), PlayOptions::default());

    let mut buf = vec![0i16; 128];
    mixer.mix_callback(&mut buf);
    assert!(buf.iter().all(|&s| s == 700));
}

#[test]
fn sum_saturates_instead_of_wrapping() {
    let mixer = ready_mixer();
    for _ in 0..3 {
        mixer.play_stream(SoundType::Sfx, constant(20000, 32), PlayOptions::default());
    }

    let mut buf = vec![0i16; 64];
    mixer.mix_callback(&mut buf);
    assert!(buf.iter().all(|&s| s == i16::MAX));
}

#[test]
fn full_balance_silences_the_other_side() {
    let mixer = ready_mixer();
    mixer.play_stream(
        SoundType::Sfx,
        constant(1000, 32),
        PlayOptions {
            balance: -127,
            ..Default::default()
        },
    );

    let mut buf = vec![0i16; 64];
    mixer.mix_callback(&mut buf);
    assert!(frames(&buf).all(|f| f == (1000, 0)));

    let mixer = ready_mixer();
    mixer.play_stream(
        SoundType::Sfx,
        constant(1000, 32),
        PlayOptions {
            balance: 127,
            ..Default::default()
        },
    );
    mixer.mix_callback(&mut buf);
    assert!(frames(&buf).all(|f| f == (0, 1000)));
}

#[test]
fn mono_source_feeds_both_sides() {
    let mixer = ready_mixer();
    mixer.play_stream(SoundType::Speech, OneShot::boxed(40), PlayOptions::default());

    let mut buf = vec![0i16; 80];
    assert_eq!(mixer.mix_callback(&mut buf), 40);
    assert!(frames(&buf).all(|f| f == (100, 100)));
}

#[test]
fn reverse_stereo_swaps_sides() {
    let mixer = ready_mixer();
    let samples: Vec<i16> = [10, 20].repeat(16);
    mixer.play_stream(
        SoundType::Sfx,
        Box::new(MemoryStream::new(samples, RATE, true)),
        PlayOptions {
            reverse_stereo: true,
            ..Default::default()
        },
    );

    let mut buf = vec![0i16; 32];
    mixer.mix_callback(&mut buf);
    let expected = if cfg!(feature = "reverse-stereo") {
        (10, 20)
    } else {
        (20, 10)
    };
    assert!(frames(&buf).all(|f| f == expected));
}

#[test]
fn muted_type_is_silent_but_keeps_playing() {
    let mixer = ready_mixer();
    mixer.mute_sound_type(SoundType::Music, true);
    let music = mixer
        .play_stream(SoundType::Music, stereo_ramp(32), PlayOptions::default())
        .unwrap();

    let mut buf = vec![0i16; 64];
    assert_eq!(mixer.mix_callback(&mut buf), 32);
    assert!(buf.iter().all(|&s| s == 0));

    mixer.mix_callback(&mut buf);
    assert!(!mixer.is_sound_handle_active(music));
}

#[test]
fn unmuting_restores_level_on_live_channel() {
    let mixer = ready_mixer();
    mixer.mute_sound_type(SoundType::Sfx, true);
    mixer.play_stream(SoundType::Sfx, constant(500, 64), PlayOptions::default());

    let mut buf = vec![0i16; 64];
    mixer.mix_callback(&mut buf);
    assert!(buf.iter().all(|&s| s == 0));

    mixer.mute_sound_type(SoundType::Sfx, false);
    mixer.mix_callback(&mut buf);
    assert!(buf.iter().all(|&s| s == 500));
}

#[test]
fn channel_settings_round_trip() {
    let mixer = ready_mixer();
    let handle = mixer
        .play_stream(SoundType::Sfx, constant(1, 4096), PlayOptions::default())
        .unwrap();

    mixer.set_channel_volume(handle, 77);
    mixer.set_channel_balance(handle, -40);
    mixer.set_channel_fader_l(handle, 12);
    mixer.set_channel_fader_r(handle, 200);
    mixer.set_channel_rate(handle, 22050);

    assert_eq!(mixer.channel_volume(handle), 77);
    assert_eq!(mixer.channel_balance(handle), -40);
    assert_eq!(mixer.channel_fader_l(handle), 12);
    assert_eq!(mixer.channel_fader_r(handle), 200);
    assert_eq!(mixer.channel_rate(handle), 22050);

    mixer.reset_channel_rate(handle);
    assert_eq!(mixer.channel_rate(handle), RATE);
}

#[test]
fn invalid_handle_reads_defaults() {
    let mixer = ready_mixer();
    let handle = mixer
        .play_stream(SoundType::Sfx, constant(1, 4096), PlayOptions::default())
        .unwrap();
    mixer.stop_handle(handle);

    assert_eq!(mixer.channel_volume(handle), 0);
    assert_eq!(mixer.channel_balance(handle), 0);
    assert_eq!(mixer.channel_rate(handle), 0);
    assert_eq!(mixer.sound_id(handle), None);
    assert_eq!(mixer.sound_elapsed_time(handle), 0);
}

#[test]
fn rate_change_takes_effect_mid_stream() {
    let mixer = ready_mixer();
    let handle = mixer
        .play_stream(SoundType::Sfx, constant(800, 4096), PlayOptions::default())
        .unwrap();

    let mut buf = vec![0i16; 256];
    assert_eq!(mixer.mix_callback(&mut buf), 128);

    // Doubling the rate consumes input twice as fast
    mixer.set_channel_rate(handle, RATE * 2);
    assert_eq!(mixer.mix_callback(&mut buf), 128);
    assert!(buf[16..].iter().all(|&s| s == 800));
}

#[test]
fn nested_pause_needs_matching_resumes() {
    let mixer = ready_mixer();
    let handle = mixer
        .play_stream(SoundType::Sfx, constant(300, 4096), PlayOptions::default())
        .unwrap();

    mixer.pause_handle(handle, true);
    mixer.pause_all(true);

    let mut buf = vec![0i16; 64];
    assert_eq!(mixer.mix_callback(&mut buf), 0);

    mixer.pause_handle(handle, false);
    assert_eq!(mixer.mix_callback(&mut buf), 0);
    assert!(buf.iter().all(|&s| s == 0));

    mixer.pause_all(false);
    assert_eq!(mixer.mix_callback(&mut buf), 32);
    assert!(buf.iter().all(|&s| s == 300));

    // Extra resumes are ignored
    mixer.pause_handle(handle, false);
    assert_eq!(mixer.mix_callback(&mut buf), 32);
}
