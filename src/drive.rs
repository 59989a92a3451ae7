// Drive signal aggregation - the small set of global inputs that steer every particle
use bevy::prelude::*;
use crate::constants::*;
use crate::shockwave::Wavefront;
use crate::types::{FormToggleText, TreeConfig};

/// Immutable per-tick snapshot threaded into the animators
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriveSignals {
    pub is_formed: bool,
    pub manual_wave_y: f32,
    pub intro_wave_y: f32,
    pub elapsed: f32,
    pub rotation_velocity: f32,
}

impl Default for DriveSignals {
    fn default() -> Self {
        Self {
            is_formed: true,
            manual_wave_y: WAVE_INACTIVE,
            intro_wave_y: WAVE_INACTIVE,
            elapsed: 0.0,
            rotation_velocity: 0.0,
        }
    }
}

/// The snapshot for the current frame, rebuilt once per tick
#[derive(Resource, Default, Deref)]
pub struct FrameDrive(pub DriveSignals);

/// Mutable side of the drive signals: everything user input and the intro write to
#[derive(Resource)]
pub struct DriveState {
    pub formed: bool,
    was_formed: bool,
    pub manual_wave: Wavefront,
    pub intro_wave_y: f32,
}

impl Default for DriveState {
    fn default() -> Self {
        Self {
            formed: true,
            was_formed: true,
            manual_wave: Wavefront::default(),
            intro_wave_y: WAVE_INACTIVE,
        }
    }
}

impl DriveState {
    pub fn set_formed(&mut self, formed: bool) {
        self.formed = formed;
    }

    pub fn toggle(&mut self) {
        self.formed = !self.formed;
    }

    /// Back to a formed tree with no waves in flight
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance the manual wavefront. A dispersed -> formed transition restarts
    /// it from the crown; returns true on that frame.
    pub fn update(&mut self, dt: f32, tree_height: f32) -> bool {
        let recrystallized = self.formed && !self.was_formed;
        self.was_formed = self.formed;
        if recrystallized {
            self.manual_wave.trigger(tree_height);
        } else {
            self.manual_wave.advance(dt, tree_height);
        }
        recrystallized
    }

    pub fn snapshot(&self, elapsed: f32, rotation_velocity: f32) -> DriveSignals {
        DriveSignals {
            is_formed: self.formed,
            manual_wave_y: self.manual_wave.y,
            intro_wave_y: self.intro_wave_y,
            elapsed,
            rotation_velocity,
        }
    }
}

/// System: Space flips between formed and dispersed
pub fn explode_toggle_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut drive: ResMut<DriveState>,
) {
    if keyboard.just_pressed(KeyCode::Space) {
        drive.toggle();
        info!("{}", if drive.formed { "Re-crystallize" } else { "Dissolve form" });
    }
}

/// Label of the explode/form toggle for the current state
pub fn form_toggle_label(formed: bool) -> &'static str {
    if formed {
        "Dissolve Form"
    } else {
        "Re-crystallize"
    }
}

pub fn update_form_toggle_text(
    drive: Res<DriveState>,
    mut texts: Query<&mut Text, With<FormToggleText>>,
) {
    let label = form_toggle_label(drive.formed);
    for mut text in texts.iter_mut() {
        if text.0 != label {
            **text = label.to_string();
        }
    }
}

/// System: fold this frame's inputs into the immutable snapshot
pub fn update_drive_signals(
    time: Res<Time>,
    config: Res<TreeConfig>,
    rotation: Res<crate::rotation::RotationIntegrator>,
    mut drive: ResMut<DriveState>,
    mut frame: ResMut<FrameDrive>,
) {
    if drive.update(time.delta_secs(), config.height) {
        debug!("Manual shockwave triggered at y={:.1}", drive.manual_wave.y);
    }
    frame.0 = drive.snapshot(time.elapsed_secs(), rotation.velocity);
}
