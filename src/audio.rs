// Background music - one looping track, paused until the user asks for it
use bevy::audio::AudioSinkPlayback;
use bevy::prelude::*;

use crate::constants::*;
use crate::types::MusicStatusText;

#[derive(Component)]
pub struct BackgroundMusic;

pub fn music_label(playing: bool) -> &'static str {
    if playing {
        "MUSIC: ON"
    } else {
        "MUSIC: OFF"
    }
}

/// Startup: queue the track paused; nothing plays before the first toggle
pub fn spawn_background_music(mut commands: Commands, asset_server: Res<AssetServer>) {
    commands.spawn((
        AudioPlayer::new(asset_server.load(MUSIC_PATH)),
        PlaybackSettings::LOOP.paused(),
        BackgroundMusic,
        Name::new("BackgroundMusic"),
    ));
}

/// M toggles playback. Until the decoder has produced a sink there is nothing to
/// toggle and the key press is dropped.
pub fn toggle_music_input(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    sinks: Query<&AudioSink, With<BackgroundMusic>>,
) {
    if !keyboard_input.just_pressed(KeyCode::KeyM) {
        return;
    }
    let Ok(sink) = sinks.single() else {
        warn!("Music toggle ignored: track not loaded yet");
        return;
    };
    if sink.is_paused() {
        sink.play();
    } else {
        sink.pause();
    }
    info!("{}", music_label(!sink.is_paused()));
}

/// The label tracks the sink itself, not the last key press
pub fn update_music_status_text(
    sinks: Query<&AudioSink, With<BackgroundMusic>>,
    mut texts: Query<&mut Text, With<MusicStatusText>>,
) {
    let playing = sinks.single().map(|sink| !sink.is_paused()).unwrap_or(false);
    let label = music_label(playing);
    for mut text in texts.iter_mut() {
        if text.0 != label {
            **text = label.to_string();
        }
    }
}
