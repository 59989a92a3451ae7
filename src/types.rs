use bevy::prelude::*;
use crate::constants::*;

/// Which particle group a descriptor belongs to
#[derive(Component, Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ParticleKind {
    FineLeaf,
    CrystalLeaf,
    Ribbon,
    Nebula,
    Snow,
}

/// Static per-particle data, produced once by the layout generator
#[derive(Clone, Debug)]
pub struct ParticleDescriptor {
    pub id: u32,
    pub kind: ParticleKind,
    pub tree_position: Vec3,   // Where the particle sits when the tree is formed
    pub random_position: Vec3, // Where it drifts to when dispersed
    pub base_color: Vec3,      // Linear RGB, may exceed 1.0 for bloom
    pub scale: f32,
    pub rotation: Vec3,        // Euler XYZ baseline
}

/// The four tree groups, each a flat array indexed by stable particle index
#[derive(Resource, Default, Clone)]
pub struct TreeLayout {
    pub fine_leaves: Vec<ParticleDescriptor>,
    pub crystal_leaves: Vec<ParticleDescriptor>,
    pub ribbon: Vec<ParticleDescriptor>,
    pub nebula: Vec<ParticleDescriptor>,
}

impl TreeLayout {
    pub fn group(&self, kind: ParticleKind) -> &[ParticleDescriptor] {
        match kind {
            ParticleKind::FineLeaf => &self.fine_leaves,
            ParticleKind::CrystalLeaf => &self.crystal_leaves,
            ParticleKind::Ribbon => &self.ribbon,
            ParticleKind::Nebula => &self.nebula,
            ParticleKind::Snow => &[],
        }
    }

    pub fn total(&self) -> usize {
        self.fine_leaves.len() + self.crystal_leaves.len() + self.ribbon.len() + self.nebula.len()
    }
}

/// Per-frame rendered state of one particle.
///
/// Recomputed every tick. The position doubles as the one-frame memory that
/// the leaf and nebula groups blend from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiveParticle {
    pub position: Vec3,
    pub euler: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub color: Vec3,
}

impl LiveParticle {
    pub fn from_descriptor(descriptor: &ParticleDescriptor) -> Self {
        Self {
            position: descriptor.tree_position,
            euler: descriptor.rotation,
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                descriptor.rotation.x,
                descriptor.rotation.y,
                descriptor.rotation.z,
            ),
            scale: Vec3::splat(descriptor.scale),
            color: descriptor.base_color,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.rotation.is_finite()
            && self.scale.is_finite()
            && self.color.is_finite()
    }
}

/// Session configuration for the tree layout
#[derive(Resource, Clone, Debug)]
pub struct TreeConfig {
    pub leaf_count: usize,
    pub ribbon_count: usize,
    pub nebula_count: usize,
    pub snow_count: usize,
    pub height: f32,
    pub base_radius: f32,
    pub gradient: Vec<Vec3>,
    /// Fixed seed for reproducible layouts; None draws from entropy
    pub seed: Option<u64>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            leaf_count: LEAF_COUNT,
            ribbon_count: RIBBON_COUNT,
            nebula_count: NEBULA_COUNT,
            snow_count: SNOW_COUNT,
            height: TREE_HEIGHT,
            base_radius: TREE_BASE_RADIUS,
            gradient: GRADIENT_STOPS_HEX.iter().map(|&hex| hex_color(hex)).collect(),
            seed: None,
        }
    }
}

/// Root of everything that spins with the tree
#[derive(Component)]
pub struct TreeRoot;

#[derive(Component)]
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub target_yaw: f32,
    pub target_pitch: f32,
    pub target_distance: f32,
    pub enabled: bool,
}

impl OrbitCamera {
    /// Derive orbit angles from a camera position looking at the origin
    pub fn from_position(position: Vec3) -> Self {
        let distance = position.length().max(CAMERA_MIN_DISTANCE);
        let yaw = position.x.atan2(position.z);
        let pitch = -(position.y / distance).clamp(-1.0, 1.0).asin();
        Self {
            yaw,
            pitch,
            distance,
            target_yaw: yaw,
            target_pitch: pitch,
            target_distance: distance,
            enabled: false,
        }
    }
}

// UI markers
#[derive(Component)]
pub struct HudRoot;

#[derive(Component)]
pub struct ControlsText;

#[derive(Component)]
pub struct GestureStatusText;

#[derive(Component)]
pub struct MusicStatusText;

/// Shows what Space will do next
#[derive(Component)]
pub struct FormToggleText;

/// Convert a packed sRGB hex value to linear RGB
pub fn hex_color(hex: u32) -> Vec3 {
    let color = Color::srgb_u8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8);
    linear_rgb(color)
}

pub fn linear_rgb(color: Color) -> Vec3 {
    let linear = color.to_linear();
    Vec3::new(linear.red, linear.green, linear.blue)
}

/// Shift saturation/lightness in sRGB-space HSL, keeping hue
pub fn offset_hsl(color: Vec3, saturation: f32, lightness: f32) -> Vec3 {
    let hsla = Hsla::from(Color::linear_rgb(color.x, color.y, color.z));
    let hue = if hsla.hue.is_finite() { hsla.hue } else { 0.0 };
    linear_rgb(Color::hsl(
        hue,
        (hsla.saturation + saturation).clamp(0.0, 1.0),
        (hsla.lightness + lightness).clamp(0.0, 1.0),
    ))
}

/// HSL with hue given as a 0..1 fraction of the color wheel
pub fn hsl_color(hue: f32, saturation: f32, lightness: f32) -> Vec3 {
    linear_rgb(Color::hsl(
        hue.rem_euclid(1.0) * 360.0,
        saturation.clamp(0.0, 1.0),
        lightness.clamp(0.0, 1.0),
    ))
}
