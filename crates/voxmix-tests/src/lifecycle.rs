//! Channel lifecycle: handles, ids, eviction and stream hand-back.

use crate::support::{constant, ready_mixer, stereo_ramp};
use voxmix_audio::{DisposeAfterUse, PlayOptions, SoundHandle, SoundType, NUM_CHANNELS};

#[test]
fn short_stream_plays_then_is_evicted() {
    let mixer = ready_mixer();
    let handle = mixer
        .play_stream(
            SoundType::Sfx,
            stereo_ramp(100),
            PlayOptions {
                id: Some(7),
                ..Default::default()
            },
        )
        .unwrap();

    let mut buf = vec![0i16; 100];
    assert_eq!(mixer.mix_callback(&mut buf), 50);
    assert!(mixer.is_sound_handle_active(handle));
    assert!(mixer.is_sound_id_active(7));

    assert!(mixer.mix_callback(&mut buf) <= 50);

    assert_eq!(mixer.mix_callback(&mut buf), 0);
    assert!(!mixer.is_sound_handle_active(handle));
    assert!(!mixer.is_sound_id_active(7));
    assert!(buf.iter().all(|&s| s == 0));

    // Handle is stale now; nothing to stop
    mixer.stop_handle(handle);
    assert_eq!(mixer.active_channel_count(), 0);
}

#[test]
fn stale_handle_does_not_reach_new_occupant() {
    let mixer = ready_mixer();
    let old = mixer
        .play_stream(SoundType::Music, constant(1000, 4096), PlayOptions::default())
        .unwrap();
    mixer.stop_handle(old);

    let new = mixer
        .play_stream(SoundType::Music, constant(1000, 4096), PlayOptions::default())
        .unwrap();
    assert_eq!(old.slot(), new.slot());
    assert_ne!(old, new);
    assert!(!mixer.is_sound_handle_active(old));

    mixer.set_channel_volume(old, 0);
    mixer.pause_handle(old, true);
    mixer.stop_handle(old);

    assert!(mixer.is_sound_handle_active(new));
    assert_eq!(mixer.channel_volume(new), 255);
    let mut buf = vec![0i16; 64];
    assert_eq!(mixer.mix_callback(&mut buf), 32);
    assert!(buf.iter().all(|&s| s == 1000));
}

#[test]
fn at_most_one_channel_per_id() {
    let mixer = ready_mixer();
    let opts = PlayOptions {
        id: Some(42),
        ..Default::default()
    };
    let first = mixer.play_stream(SoundType::Speech, constant(1, 512), opts.clone());
    assert!(first.is_some());
    assert!(mixer
        .play_stream(SoundType::Sfx, constant(1, 512), opts.clone())
        .is_none());
    assert_eq!(mixer.active_channel_count(), 1);
    assert_eq!(mixer.sound_id(first.unwrap()), Some(42));

    mixer.stop_id(42);
    assert!(mixer.play_stream(SoundType::Sfx, constant(1, 512), opts).is_some());
}

#[test]
fn full_table_rejects_then_recovers() {
    let mixer = ready_mixer();
    let handles: Vec<SoundHandle> = (0..NUM_CHANNELS)
        .map(|_| {
            mixer
                .play_stream(SoundType::Sfx, constant(1, 64), PlayOptions::default())
                .unwrap()
        })
        .collect();
    assert!(mixer
        .play_stream(SoundType::Sfx, constant(1, 64), PlayOptions::default())
        .is_none());

    mixer.stop_handle(handles[5]);
    let handle = mixer
        .play_stream(SoundType::Sfx, constant(1, 64), PlayOptions::default())
        .unwrap();
    assert_eq!(handle.slot(), handles[5].slot());
}

#[test]
fn caller_owned_stream_comes_back_after_it_finishes() {
    let mixer = ready_mixer();
    let released = mixer.release_receiver();
    let handle = mixer
        .play_stream(
            SoundType::Speech,
            constant(5, 16),
            PlayOptions {
                dispose: DisposeAfterUse::No,
                ..Default::default()
            },
        )
        .unwrap();

    let mut buf = vec![0i16; 64];
    mixer.mix_callback(&mut buf);
    assert!(released.try_recv().is_err());

    mixer.mix_callback(&mut buf);
    let (returned, stream) = released.try_recv().unwrap();
    assert_eq!(returned, handle);
    assert!(stream.end_of_data());
}

#[test]
fn caller_owned_stream_comes_back_when_stopped_or_rejected() {
    let mixer = ready_mixer();
    let released = mixer.release_receiver();
    let owned = PlayOptions {
        id: Some(3),
        dispose: DisposeAfterUse::No,
        ..Default::default()
    };

    let handle = mixer
        .play_stream(SoundType::Sfx, constant(5, 4096), owned.clone())
        .unwrap();
    assert!(mixer
        .play_stream(SoundType::Sfx, constant(5, 4096), owned)
        .is_none());
    let (rejected, _) = released.try_recv().unwrap();
    assert_eq!(rejected, SoundHandle::INVALID);

    mixer.stop_handle(handle);
    let (stopped, stream) = released.try_recv().unwrap();
    assert_eq!(stopped, handle);
    assert!(!stream.end_of_data());
}

#[test]
fn mixer_owned_streams_are_not_handed_back() {
    let mixer = ready_mixer();
    let released = mixer.release_receiver();
    let handle = mixer
        .play_stream(SoundType::Sfx, constant(5, 64), PlayOptions::default())
        .unwrap();
    mixer.stop_handle(handle);
    assert!(released.try_recv().is_err());
}

#[test]
fn permanent_channels_survive_stop_all() {
    let mixer = ready_mixer();
    let keep = mixer
        .play_stream(
            SoundType::Music,
            constant(1, 4096),
            PlayOptions {
                permanent: true,
                ..Default::default()
            },
        )
        .unwrap();
    let drop = mixer
        .play_stream(SoundType::Sfx, constant(1, 4096), PlayOptions::default())
        .unwrap();

    mixer.stop_all();
    assert!(mixer.is_sound_handle_active(keep));
    assert!(!mixer.is_sound_handle_active(drop));
    assert!(mixer.has_active_channel_of_type(SoundType::Music));
    assert!(!mixer.has_active_channel_of_type(SoundType::Sfx));
}

#[test]
fn control_thread_and_mix_thread_share_mixer() {
    use std::sync::Arc;
    use std::thread;

    let mixer = Arc::new(ready_mixer());

    let mix = {
        let mixer = Arc::clone(&mixer);
        thread::spawn(move || {
            let mut buf = vec![0i16; 256];
            for _ in 0..500 {
                mixer.mix_callback(&mut buf);
            }
        })
    };

    for i in 0..500 {
        if let Some(handle) = mixer.play_stream(
            SoundType::Sfx,
            constant(10, 64),
            PlayOptions {
                balance: (i % 255 - 127) as i8,
                ..Default::default()
            },
        ) {
            mixer.set_channel_volume(handle, (i % 256) as u8);
            if i % 3 == 0 {
                mixer.stop_handle(handle);
            }
        }
    }

    mix.join().unwrap();
    assert!(mixer.active_channel_count() <= NUM_CHANNELS);
}
