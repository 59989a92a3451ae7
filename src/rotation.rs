// Rotation impulse integrator - gesture flicks spin the tree, then decay back to idle drift
use bevy::prelude::*;
use crate::constants::*;
use crate::drive::DriveState;
use crate::types::TreeRoot;

#[derive(Resource, Default, Debug)]
pub struct RotationIntegrator {
    pub velocity: f32,
    pending_impulse: f32,
}

impl RotationIntegrator {
    /// Latest impulse wins; it is consumed by the next step
    pub fn push_impulse(&mut self, impulse: f32) {
        if impulse.is_finite() {
            self.pending_impulse = impulse;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Integrate one frame and return the yaw delta to apply to the tree
    pub fn step(&mut self, dt: f32, formed: bool) -> f32 {
        self.velocity += std::mem::take(&mut self.pending_impulse) * IMPULSE_SENSITIVITY;

        let delta = if formed && self.velocity.abs() < ROTATION_IDLE_THRESHOLD {
            dt * IDLE_ROTATION_SPEED
        } else {
            self.velocity
        };

        self.velocity *= ROTATION_DAMPING;
        if self.velocity.abs() < ROTATION_SNAP_EPSILON {
            self.velocity = 0.0;
        }
        delta
    }
}

/// System: spin the tree root by this frame's integrated delta
pub fn apply_scene_rotation(
    time: Res<Time>,
    drive: Res<DriveState>,
    mut rotation: ResMut<RotationIntegrator>,
    mut root_query: Query<&mut Transform, With<TreeRoot>>,
) {
    let delta = rotation.step(time.delta_secs(), drive.formed);
    if let Ok(mut transform) = root_query.single_mut() {
        transform.rotate_y(delta);
    }
}
