use bevy::prelude::*;

mod animator;
mod audio;
mod constants;
mod drive;
mod gesture;
mod instancing;
mod intro;
mod layout;
mod logo;
mod movement;
mod particles;
mod procedural_meshes;
mod rotation;
mod setup;
mod shockwave;
mod snow;
mod star;
mod types;

use animator::animate_tree_groups;
use audio::{spawn_background_music, toggle_music_input, update_music_status_text};
use drive::{explode_toggle_input, update_drive_signals, update_form_toggle_text, DriveState, FrameDrive};
use gesture::{
    feed_pointer_tracker, sample_gestures, start_hand_tracker, update_gesture_status_text,
    GestureInput, PointerFeed, PointerHandTracker,
};
use instancing::upload_instance_batches;
use intro::{replay_intro_input, run_intro_sequence, start_intro, IntroFinished, IntroSequencer};
use layout::generate_tree_layout;
use logo::{animate_logo, build_logo_when_ready, load_logo_image};
use movement::{orbit_camera_movement, unlock_orbit_camera};
use particles::{setup_particle_effects, ParticleEffectsPlugin};
use rotation::{apply_scene_rotation, RotationIntegrator};
use setup::{setup_camera_and_lights, setup_hud, spawn_tree, toggle_hud_input};
use snow::{init_snow_field, update_snow};
use star::animate_tree_star;
use types::TreeConfig;

fn main() {
    let pointer_feed = PointerFeed::default();
    let gesture_input = GestureInput::new(PointerHandTracker::new(pointer_feed.0.clone()));

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Crystal Tree".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(ParticleEffectsPlugin)
        .add_event::<IntroFinished>()
        .init_resource::<TreeConfig>()
        .init_resource::<DriveState>()
        .init_resource::<FrameDrive>()
        .init_resource::<RotationIntegrator>()
        .init_resource::<IntroSequencer>()
        .insert_resource(pointer_feed)
        .insert_resource(gesture_input)
        .add_systems(Startup, (
            (
                generate_tree_layout,
                init_snow_field,
                spawn_tree.after(setup_particle_effects),
            ).chain(),
            setup_camera_and_lights,
            setup_hud,
            load_logo_image,
            spawn_background_music,
            start_intro,
            start_hand_tracker,
        ))
        .add_systems(Update, (
            (
                explode_toggle_input,
                replay_intro_input,
                toggle_music_input,
                toggle_hud_input,
                feed_pointer_tracker,
            ),
            sample_gestures,
            run_intro_sequence,
            unlock_orbit_camera,
            orbit_camera_movement,
            update_drive_signals,
            animate_tree_groups,
            apply_scene_rotation,
            update_snow,
            (animate_tree_star, build_logo_when_ready, animate_logo),
            (update_gesture_status_text, update_music_status_text, update_form_toggle_text),
            upload_instance_batches,
        ).chain())
        .run();
}
