// Orbit camera controls - drag to circle the tree, wheel to zoom, with damping
use bevy::prelude::*;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel, MouseMotion};
use crate::types::*;
use crate::constants::*;
use crate::intro::IntroFinished;

/// Keeps the camera off the pole where looking_at loses its up vector
const POLE_MARGIN: f32 = 0.01;

/// Pitch range that keeps the polar angle inside [0, CAMERA_MAX_POLAR]
pub fn pitch_limits() -> (f32, f32) {
    let half_pi = std::f32::consts::FRAC_PI_2;
    (-half_pi + POLE_MARGIN, CAMERA_MAX_POLAR - half_pi)
}

pub fn clamp_pitch(pitch: f32) -> f32 {
    let (min, max) = pitch_limits();
    pitch.clamp(min, max)
}

pub fn clamp_distance(distance: f32) -> f32 {
    distance.clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE)
}

/// Camera position on the orbit sphere around the origin
pub fn orbit_position(yaw: f32, pitch: f32, distance: f32) -> Vec3 {
    let elevation = -pitch;
    Vec3::new(
        yaw.sin() * elevation.cos(),
        elevation.sin(),
        yaw.cos() * elevation.cos(),
    ) * distance
}

/// Per-frame damping tuned at 60 Hz, scaled to the actual frame time
pub fn damping_factor(dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 0.0;
    }
    1.0 - (1.0 - CAMERA_DAMPING).powf(dt * 60.0)
}

pub fn zoom_delta(scroll: &MouseWheel) -> f32 {
    match scroll.unit {
        MouseScrollUnit::Line => scroll.y * CAMERA_ZOOM_SPEED,
        MouseScrollUnit::Pixel => scroll.y * CAMERA_ZOOM_SPEED * 0.1,
    }
}

impl OrbitCamera {
    /// Ease current angles and distance toward their targets
    pub fn settle(&mut self, factor: f32) {
        self.yaw += (self.target_yaw - self.yaw) * factor;
        self.pitch += (self.target_pitch - self.pitch) * factor;
        self.distance += (self.target_distance - self.distance) * factor;
    }
}

/// Hand the camera to the orbit controls from wherever the intro left it
pub fn unlock_orbit_camera(
    mut finished_events: EventReader<IntroFinished>,
    mut camera_query: Query<(&Transform, &mut OrbitCamera)>,
) {
    if finished_events.read().last().is_none() {
        return;
    }
    for (transform, mut camera) in camera_query.iter_mut() {
        *camera = OrbitCamera::from_position(transform.translation);
        camera.enabled = true;
        camera.target_pitch = clamp_pitch(camera.target_pitch);
        camera.target_distance = clamp_distance(camera.target_distance);
        info!("Orbit controls enabled");
    }
}

pub fn orbit_camera_movement(
    time: Res<Time>,
    mouse_button_input: Res<ButtonInput<MouseButton>>,
    mut scroll_events: EventReader<MouseWheel>,
    mut mouse_motion_events: EventReader<MouseMotion>,
    mut camera_query: Query<(&mut Transform, &mut OrbitCamera)>,
) {
    let Ok((mut transform, mut camera)) = camera_query.single_mut() else {
        return;
    };
    if !camera.enabled {
        // The intro owns the camera; drop input so it doesn't pile up
        mouse_motion_events.clear();
        scroll_events.clear();
        return;
    }

    if mouse_button_input.pressed(MouseButton::Left) {
        for motion in mouse_motion_events.read() {
            camera.target_yaw -= motion.delta.x * CAMERA_ROTATION_SPEED;
            camera.target_pitch = clamp_pitch(camera.target_pitch - motion.delta.y * CAMERA_ROTATION_SPEED);
        }
    } else {
        mouse_motion_events.clear();
    }

    for scroll in scroll_events.read() {
        camera.target_distance = clamp_distance(camera.target_distance - zoom_delta(scroll));
    }

    camera.settle(damping_factor(time.delta_secs()));

    transform.translation = orbit_position(camera.yaw, camera.pitch, camera.distance);
    transform.look_at(Vec3::ZERO, Vec3::Y);
}
