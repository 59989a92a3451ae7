// Shockwave engine - traveling horizontal wavefronts that flash nearby particles
use bevy::prelude::*;
use crate::constants::*;

/// Shape of one wavefront's falloff
#[derive(Clone, Copy, Debug)]
pub struct WaveProfile {
    /// Vertical skew per radian of azimuth, makes the wave twist as it passes
    pub spiral: f32,
    /// Gaussian falloff sharpness, larger = thinner band
    pub sharpness: f32,
    pub gain: f32,
}

pub const MANUAL_WAVE: WaveProfile = WaveProfile {
    spiral: MANUAL_WAVE_SPIRAL,
    sharpness: MANUAL_WAVE_SHARPNESS,
    gain: 1.0,
};

pub const INTRO_WAVE: WaveProfile = WaveProfile {
    spiral: INTRO_WAVE_SPIRAL,
    sharpness: INTRO_WAVE_SHARPNESS,
    gain: INTRO_WAVE_GAIN,
};

#[inline]
pub fn is_wave_active(wave_y: f32) -> bool {
    wave_y.is_finite() && wave_y > WAVE_ACTIVE_MIN
}

/// Signed distance from a particle to the (skewed) wave plane
#[inline]
pub fn wave_distance(position: Vec3, wave_y: f32, spiral: f32) -> f32 {
    let angle = position.x.atan2(position.z);
    position.y + angle * spiral - wave_y
}

/// Gaussian bump centered on the wave plane, always in [0, 1]
pub fn intensity(position: Vec3, wave_y: f32, profile: &WaveProfile) -> f32 {
    if !is_wave_active(wave_y) {
        return 0.0;
    }
    let dist = wave_distance(position, wave_y, profile.spiral);
    let value = profile.gain * (-(dist * dist) * profile.sharpness).exp();
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Manual and intro waves combined by maximum so they never stack
pub fn combined_intensity(position: Vec3, manual_y: f32, intro_y: f32) -> f32 {
    intensity(position, manual_y, &MANUAL_WAVE).max(intensity(position, intro_y, &INTRO_WAVE))
}

/// The re-crystallize wavefront: sweeps top to bottom once per trigger
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wavefront {
    pub y: f32,
}

impl Default for Wavefront {
    fn default() -> Self {
        Self { y: WAVE_INACTIVE }
    }
}

impl Wavefront {
    pub fn is_active(&self) -> bool {
        is_wave_active(self.y)
    }

    pub fn start_height(tree_height: f32) -> f32 {
        tree_height / 2.0 + MANUAL_WAVE_START_PAD
    }

    pub fn end_height(tree_height: f32) -> f32 {
        -tree_height / 2.0 - MANUAL_WAVE_END_PAD
    }

    /// Restart from above the crown, even if a previous sweep is still running
    pub fn trigger(&mut self, tree_height: f32) {
        self.y = Self::start_height(tree_height);
    }

    pub fn advance(&mut self, dt: f32, tree_height: f32) {
        if !self.is_active() {
            return;
        }
        if self.y > Self::end_height(tree_height) {
            self.y -= dt.max(0.0) * MANUAL_WAVE_SPEED;
        } else {
            self.y = WAVE_INACTIVE;
        }
    }
}
