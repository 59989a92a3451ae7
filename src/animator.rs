//! Per-group particle animator
//!
//! Maps (descriptor, previous live state, drive signals, dt) to the next live
//! state for every particle of a group. Leaves and nebula ease toward their
//! formed or dispersed target; the ribbon rides a flowing helix around the
//! cone while formed. Shockwaves flash and inflate whatever they pass.

use bevy::prelude::*;
use rayon::prelude::*;
use std::f32::consts::{PI, TAU};

use crate::constants::*;
use crate::drive::{DriveSignals, FrameDrive};
use crate::shockwave::{combined_intensity, intensity, INTRO_WAVE};
use crate::types::*;

/// Live transform/color buffer for one rendered group
#[derive(Component, Default)]
pub struct InstanceBuffer {
    pub particles: Vec<LiveParticle>,
}

impl InstanceBuffer {
    pub fn from_descriptors(descriptors: &[ParticleDescriptor]) -> Self {
        Self {
            particles: descriptors.iter().map(LiveParticle::from_descriptor).collect(),
        }
    }
}

/// Everything constant across one group's pass over its particles
#[derive(Clone, Copy, Debug)]
pub struct GroupFrame {
    pub kind: ParticleKind,
    pub count: usize,
    pub drive: DriveSignals,
    pub dt: f32,
    pub height: f32,
    pub base_radius: f32,
    pub flash: Vec3,
}

impl GroupFrame {
    pub fn new(kind: ParticleKind, count: usize, drive: DriveSignals, dt: f32, config: &TreeConfig) -> Self {
        Self {
            kind,
            count,
            drive,
            dt,
            height: config.height,
            base_radius: config.base_radius,
            flash: hex_color(FLASH_HEX),
        }
    }
}

/// Where a ribbon particle sits on the helix this frame
#[derive(Clone, Copy, Debug)]
pub struct RibbonSample {
    pub progress: f32,
    pub position: Vec3,
    pub look_target: Vec3,
    pub scale: Vec3,
    /// Width multiplier of the glitter spike, 0.6 at rest
    pub width: f32,
    /// Brightness multiplier while the spike is high
    pub sparkle: f32,
}

pub fn ribbon_sample(index: usize, count: usize, time: f32, height: f32, base_radius: f32, base_scale: f32) -> RibbonSample {
    let i = index as f32;
    let progress = (i / count.max(1) as f32 + time * RIBBON_FLOW_SPEED).rem_euclid(1.0);

    let wobble = (time * 0.5 + i * 0.1).sin() * 0.15;
    let y = height * progress - height / 2.0 + wobble;
    let ripple = (progress * PI * 4.0 + time * 0.2).sin() * 0.2;
    let radius = base_radius * (1.0 - progress) + ripple + RIBBON_RADIUS_PAD;
    let theta = progress * RIBBON_SWEEP;
    let position = Vec3::new(radius * theta.cos(), y, radius * theta.sin());

    // Look slightly ahead along the helix for orientation
    let next = progress + RIBBON_LOOK_AHEAD;
    let next_y = height * next - height / 2.0 + wobble;
    let next_radius = base_radius * (1.0 - next) + RIBBON_RADIUS_PAD;
    let next_theta = next * RIBBON_SWEEP;
    let look_target = Vec3::new(next_radius * next_theta.cos(), next_y, next_radius * next_theta.sin());

    // Pulse peaks mid-ribbon, glitter rides on the travelling waviness
    let pulse = (progress * PI).sin().max(0.0).powf(2.5);
    let waviness = (progress * 12.0 - time * 1.5).sin();
    let glitter = (progress * 80.0 - time * 5.0).sin();
    let boost = waviness.max(0.0) * (glitter * 0.5 + 0.5);

    let width = 0.6 + boost * 12.0 * pulse;
    let depth = 1.0 + boost * 0.5 * pulse;
    let scale = Vec3::new(base_scale * 10.0 * depth, base_scale * width, base_scale * 2.5 * depth);

    let sparkle = if boost > 0.5 { 1.5 + (time * 30.0 + i).sin() * 0.5 } else { 1.0 };

    RibbonSample { progress, position, look_target, scale, width, sparkle }
}

/// Rotation whose +Z axis points from `from` toward `to`
fn facing_rotation(from: Vec3, to: Vec3, fallback: Quat) -> Quat {
    let dir = to - from;
    if dir.length_squared() < 1e-12 || !dir.is_finite() {
        return fallback;
    }
    Transform::IDENTITY.looking_to(-dir, Vec3::Y).rotation
}

/// Ambient drift added to a formed nebula target
pub fn nebula_drift(index: usize, time: f32) -> Vec3 {
    let i = index as f32;
    Vec3::new(
        (time * 0.3 + i * 0.3).cos() * 0.6,
        (time * 0.5 + i * 0.2).sin() * 1.2,
        (time * 0.4 + i * 0.1).sin() * 0.6,
    )
}

/// Brightness multiplier for nebula point `index`, each on its own cycle
pub fn nebula_pulse(index: usize, time: f32) -> f32 {
    let frequency = 0.5 + ((index * 1337) % 200) as f32 / 100.0;
    let phase = ((index * 991) as f32).rem_euclid(TAU);
    let level = ((time * frequency + phase).sin() + 1.0) / 2.0;
    0.1 + level.powi(3) * 4.0
}

/// Frame-rate independent blend factor toward the target
#[inline]
pub fn blend_factor(dt: f32) -> f32 {
    (dt * POSITION_BLEND_RATE).clamp(0.0, 1.0)
}

pub fn animate_particle(
    frame: &GroupFrame,
    index: usize,
    descriptor: &ParticleDescriptor,
    previous: &LiveParticle,
) -> LiveParticle {
    let drive = &frame.drive;
    let time = drive.elapsed;
    let mut next = *previous;
    let mut ribbon_width = 1.0;
    let mut ribbon_sparkle = 1.0;

    if frame.kind == ParticleKind::Ribbon && drive.is_formed {
        let sample = ribbon_sample(index, frame.count, time, frame.height, frame.base_radius, descriptor.scale);
        next.position = sample.position;
        next.rotation = facing_rotation(sample.position, sample.look_target, previous.rotation);
        let (x, y, z) = next.rotation.to_euler(EulerRot::XYZ);
        next.euler = Vec3::new(x, y, z);
        next.scale = sample.scale;
        ribbon_width = sample.width;
        ribbon_sparkle = sample.sparkle;
    } else {
        let mut target = if drive.is_formed {
            descriptor.tree_position
        } else {
            descriptor.random_position
        };
        if frame.kind == ParticleKind::Nebula && drive.is_formed {
            target += nebula_drift(index, time);
        }
        next.position = previous.position.lerp(target, blend_factor(frame.dt));

        if frame.kind == ParticleKind::Nebula {
            next.euler.x += frame.dt * NEBULA_SPIN_RATE;
            next.euler.y += frame.dt * NEBULA_SPIN_RATE;
        } else {
            next.euler.z += frame.dt * LEAF_SPIN_RATE;
        }
        next.euler = Vec3::new(
            next.euler.x.rem_euclid(TAU),
            next.euler.y.rem_euclid(TAU),
            next.euler.z.rem_euclid(TAU),
        );
        next.rotation = Quat::from_euler(EulerRot::XYZ, next.euler.x, next.euler.y, next.euler.z);
        next.scale = Vec3::splat(descriptor.scale);
    }

    // Shockwaves only sweep the formed tree; the nebula ignores the manual wave
    let shock = if drive.is_formed {
        if frame.kind == ParticleKind::Nebula {
            intensity(next.position, drive.intro_wave_y, &INTRO_WAVE)
        } else {
            combined_intensity(next.position, drive.manual_wave_y, drive.intro_wave_y)
        }
    } else {
        0.0
    };

    if frame.kind != ParticleKind::Ribbon && shock > SHOCK_SCALE_THRESHOLD {
        next.scale *= 1.0 + shock;
    }

    next.color = if shock > SHOCK_COLOR_THRESHOLD {
        descriptor.base_color.lerp(frame.flash, shock.min(SHOCK_FLASH_MIX_MAX)) * (1.0 + shock * SHOCK_LUMINANCE_GAIN)
    } else {
        match frame.kind {
            ParticleKind::Ribbon => {
                let hue_shift = ((ribbon_width - 0.2) / 8.0).min(1.0);
                hsl_color(0.85 + hue_shift * 0.15, 0.9, 0.6 + hue_shift * 0.4) * 1.5 * ribbon_sparkle
            }
            ParticleKind::Nebula => descriptor.base_color * nebula_pulse(index, time),
            _ => descriptor.base_color,
        }
    };

    if next.is_finite() {
        next
    } else {
        *previous
    }
}

/// Recompute every particle of one group in place
pub fn animate_group(frame: &GroupFrame, descriptors: &[ParticleDescriptor], live: &mut Vec<LiveParticle>) {
    if live.len() != descriptors.len() {
        *live = descriptors.iter().map(LiveParticle::from_descriptor).collect();
    }
    live.par_iter_mut()
        .zip(descriptors.par_iter())
        .enumerate()
        .for_each(|(index, (particle, descriptor))| {
            *particle = animate_particle(frame, index, descriptor, particle);
        });
}

/// System: run the animator for every tree group
pub fn animate_tree_groups(
    time: Res<Time>,
    config: Res<TreeConfig>,
    layout: Res<TreeLayout>,
    drive: Res<FrameDrive>,
    mut groups: Query<(&ParticleKind, &mut InstanceBuffer)>,
) {
    let dt = time.delta_secs();
    for (kind, mut buffer) in groups.iter_mut() {
        if *kind == ParticleKind::Snow {
            continue;
        }
        let descriptors = layout.group(*kind);
        let frame = GroupFrame::new(*kind, descriptors.len(), drive.0, dt, &config);
        animate_group(&frame, descriptors, &mut buffer.particles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::DriveState;
    use crate::layout::generate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    fn small_layout() -> (TreeConfig, TreeLayout) {
        let config = TreeConfig { leaf_count: 400, ribbon_count: 50, nebula_count: 20, ..default() };
        let mut rng = StdRng::seed_from_u64(42);
        let layout = generate(&config, &mut rng);
        (config, layout)
    }

    fn leaf(position: Vec3) -> ParticleDescriptor {
        ParticleDescriptor {
            id: 0,
            kind: ParticleKind::FineLeaf,
            tree_position: position,
            random_position: Vec3::new(50.0, 2.0, -40.0),
            base_color: Vec3::new(0.1, 0.2, 0.4),
            scale: 0.05,
            rotation: Vec3::ZERO,
        }
    }

    #[test]
    fn leaf_blends_toward_scatter_when_dispersed() {
        let config = TreeConfig::default();
        let descriptor = leaf(Vec3::new(1.0, 0.0, 1.0));
        let drive = DriveSignals { is_formed: false, ..default() };
        let frame = GroupFrame::new(ParticleKind::FineLeaf, 1, drive, 0.1, &config);
        let start = LiveParticle::from_descriptor(&descriptor);
        let next = animate_particle(&frame, 0, &descriptor, &start);
        let expected = start.position.lerp(descriptor.random_position, 0.25);
        assert!((next.position - expected).length() < 1e-5);
        assert!((next.euler.z - 0.01).abs() < 1e-6);
    }

    #[test]
    fn large_dt_never_overshoots() {
        let config = TreeConfig::default();
        let descriptor = leaf(Vec3::ZERO);
        let drive = DriveSignals { is_formed: false, ..default() };
        let frame = GroupFrame::new(ParticleKind::FineLeaf, 1, drive, 5.0, &config);
        let next = animate_particle(&frame, 0, &descriptor, &LiveParticle::from_descriptor(&descriptor));
        assert!((next.position - descriptor.random_position).length() < 1e-4);
    }

    #[test]
    fn ribbon_follows_helix_inside_tree_bounds() {
        let height = TREE_HEIGHT;
        for index in 0..600 {
            let sample = ribbon_sample(index, 600, 3.7, height, TREE_BASE_RADIUS, 0.08);
            assert!((0.0..1.0).contains(&sample.progress));
            assert!(sample.position.y.abs() <= height / 2.0 + 0.2);
            let radial = Vec2::new(sample.position.x, sample.position.z).length();
            assert!(radial <= TREE_BASE_RADIUS + RIBBON_RADIUS_PAD + 0.21);
            assert!(sample.scale.is_finite() && sample.scale.min_element() > 0.0);
            assert!(sample.width >= 0.6);
        }
    }

    #[test]
    fn ribbon_flows_over_time() {
        let a = ribbon_sample(10, 600, 0.0, TREE_HEIGHT, TREE_BASE_RADIUS, 0.08);
        let b = ribbon_sample(10, 600, 4.0, TREE_HEIGHT, TREE_BASE_RADIUS, 0.08);
        assert!((b.progress - a.progress - 0.1).abs() < 1e-4);
    }

    #[test]
    fn ribbon_faces_along_its_path() {
        let (config, layout) = small_layout();
        let drive = DriveSignals { elapsed: 2.0, ..default() };
        let frame = GroupFrame::new(ParticleKind::Ribbon, layout.ribbon.len(), drive, DT, &config);
        let descriptor = &layout.ribbon[7];
        let next = animate_particle(&frame, 7, descriptor, &LiveParticle::from_descriptor(descriptor));
        let sample = ribbon_sample(7, layout.ribbon.len(), 2.0, config.height, config.base_radius, descriptor.scale);
        let forward = next.rotation * Vec3::Z;
        let wanted = (sample.look_target - sample.position).normalize();
        assert!(forward.dot(wanted) > 0.999);
        assert_eq!(next.position, sample.position);
    }

    #[test]
    fn dispersed_ribbon_drifts_to_scatter() {
        let (config, layout) = small_layout();
        let descriptor = &layout.ribbon[3];
        let mut previous = LiveParticle::from_descriptor(descriptor);
        previous.position = Vec3::new(4.0, 1.0, -2.0);
        previous.scale = Vec3::new(0.8, 0.05, 0.2);
        let drive = DriveSignals { is_formed: false, ..default() };
        let frame = GroupFrame::new(ParticleKind::Ribbon, layout.ribbon.len(), drive, DT, &config);

        let next = animate_particle(&frame, 3, descriptor, &previous);
        let expected = previous.position.lerp(descriptor.random_position, blend_factor(DT));
        assert!((next.position - expected).length() < 1e-5);
        assert_eq!(next.scale, Vec3::splat(descriptor.scale));
    }

    #[test]
    fn formed_nebula_settles_on_drifting_target() {
        let (config, layout) = small_layout();
        let index = 5;
        let descriptor = &layout.nebula[index];
        let elapsed = 3.3;
        let drive = DriveSignals { elapsed, ..default() };
        // dt large enough that the blend reaches the target in one step
        let frame = GroupFrame::new(ParticleKind::Nebula, layout.nebula.len(), drive, 1.0, &config);

        let next = animate_particle(&frame, index, descriptor, &LiveParticle::from_descriptor(descriptor));
        let target = descriptor.tree_position + nebula_drift(index, elapsed);
        assert!((next.position - target).length() < 1e-4, "{:?} vs {:?}", next.position, target);
        assert!(nebula_drift(index, elapsed).length() > 0.0);
    }

    #[test]
    fn formed_ribbon_shimmers_pink_to_magenta() {
        let (config, layout) = small_layout();
        let elapsed = 1.25;
        let count = layout.ribbon.len();
        let mut checked = 0;
        for (index, descriptor) in layout.ribbon.iter().enumerate() {
            let sample = ribbon_sample(index, count, elapsed, config.height, config.base_radius, descriptor.scale);
            // Wide glitter spikes wash out to white; only judge the hue below that
            if sample.width > 4.0 {
                continue;
            }
            let drive = DriveSignals { elapsed, ..default() };
            let frame = GroupFrame::new(ParticleKind::Ribbon, count, drive, DT, &config);
            let color = animate_particle(&frame, index, descriptor, &LiveParticle::from_descriptor(descriptor)).color;

            assert_ne!(color, descriptor.base_color);
            // Hue between 300 and 360 degrees: red strongest, green weakest
            assert!(color.x >= color.z && color.z >= color.y, "{color:?}");
            assert!(color.x > color.y);
            checked += 1;
        }
        assert!(checked > 0);
    }

    #[test]
    fn shockwave_inflates_and_brightens_leaves() {
        let config = TreeConfig::default();
        let descriptor = leaf(Vec3::new(0.0, 2.0, 4.0));
        let live = LiveParticle::from_descriptor(&descriptor);
        let drive = DriveSignals { manual_wave_y: 2.0, ..default() };
        let frame = GroupFrame::new(ParticleKind::FineLeaf, 1, drive, 0.0, &config);
        let next = animate_particle(&frame, 0, &descriptor, &live);
        assert!((next.scale.x - descriptor.scale * 2.0).abs() < 1e-5);
        assert!(next.color.length() > descriptor.base_color.length() * 2.0);
    }

    #[test]
    fn shockwave_ignored_while_dispersed() {
        let config = TreeConfig::default();
        let descriptor = leaf(Vec3::new(0.0, 2.0, 4.0));
        let live = LiveParticle::from_descriptor(&descriptor);
        let drive = DriveSignals { is_formed: false, manual_wave_y: 2.0, intro_wave_y: 2.0, ..default() };
        let frame = GroupFrame::new(ParticleKind::FineLeaf, 1, drive, 0.0, &config);
        let next = animate_particle(&frame, 0, &descriptor, &live);
        assert_eq!(next.scale, Vec3::splat(descriptor.scale));
        assert_eq!(next.color, descriptor.base_color);
    }

    #[test]
    fn nebula_ignores_manual_wave_but_not_intro() {
        let (config, layout) = small_layout();
        let descriptor = &layout.nebula[0];
        let live = LiveParticle::from_descriptor(descriptor);
        let at = |drive: DriveSignals| {
            let frame = GroupFrame::new(ParticleKind::Nebula, layout.nebula.len(), drive, 0.0, &config);
            animate_particle(&frame, 0, descriptor, &live)
        };
        let manual = at(DriveSignals { manual_wave_y: live.position.y, ..default() });
        assert_eq!(manual.scale, Vec3::splat(descriptor.scale));
        let intro = at(DriveSignals { intro_wave_y: live.position.y, ..default() });
        assert!(intro.scale.x > descriptor.scale);
    }

    #[test]
    fn nebula_pulse_stays_in_range() {
        for index in 0..60 {
            for step in 0..50 {
                let value = nebula_pulse(index, step as f32 * 0.37);
                assert!((0.1..=4.1).contains(&value));
            }
        }
    }

    #[test]
    fn outputs_are_always_finite() {
        let (config, layout) = small_layout();
        let drive = DriveSignals { manual_wave_y: 0.0, intro_wave_y: 5.0, elapsed: 1e6, ..default() };
        for kind in [ParticleKind::FineLeaf, ParticleKind::CrystalLeaf, ParticleKind::Ribbon, ParticleKind::Nebula] {
            let descriptors = layout.group(kind);
            let mut live = Vec::new();
            let frame = GroupFrame::new(kind, descriptors.len(), drive, DT, &config);
            animate_group(&frame, descriptors, &mut live);
            assert_eq!(live.len(), descriptors.len());
            assert!(live.iter().all(LiveParticle::is_finite));
        }
    }

    #[test]
    fn explode_then_reform_converges_and_sweeps_wave() {
        let (config, layout) = small_layout();
        let mut drive_state = DriveState::default();
        let mut fine = InstanceBuffer::from_descriptors(&layout.fine_leaves).particles;
        let mut crystals = InstanceBuffer::from_descriptors(&layout.crystal_leaves).particles;
        let mut elapsed = 0.0;

        let tick = |drive_state: &mut DriveState, fine: &mut Vec<LiveParticle>, crystals: &mut Vec<LiveParticle>, elapsed: &mut f32| {
            drive_state.update(DT, config.height);
            *elapsed += DT;
            let signals = drive_state.snapshot(*elapsed, 0.0);
            let frame = GroupFrame::new(ParticleKind::FineLeaf, fine.len(), signals, DT, &config);
            animate_group(&frame, &layout.fine_leaves, fine);
            let frame = GroupFrame::new(ParticleKind::CrystalLeaf, crystals.len(), signals, DT, &config);
            animate_group(&frame, &layout.crystal_leaves, crystals);
        };

        drive_state.set_formed(false);
        for _ in 0..600 {
            tick(&mut drive_state, &mut fine, &mut crystals, &mut elapsed);
        }
        for (live, descriptor) in fine.iter().zip(&layout.fine_leaves) {
            assert!((live.position - descriptor.random_position).length() < 1e-2);
        }

        drive_state.set_formed(true);
        tick(&mut drive_state, &mut fine, &mut crystals, &mut elapsed);
        let mut wave_y = drive_state.manual_wave.y;
        assert_eq!(wave_y, config.height / 2.0 + 5.0);
        let mut lowest = wave_y;

        for _ in 0..900 {
            tick(&mut drive_state, &mut fine, &mut crystals, &mut elapsed);
            if drive_state.manual_wave.is_active() {
                assert!(drive_state.manual_wave.y < wave_y);
                wave_y = drive_state.manual_wave.y;
                lowest = lowest.min(wave_y);
            }
        }
        assert!(lowest <= -config.height / 2.0 - 10.0);
        assert!(!drive_state.manual_wave.is_active());

        for (live, descriptor) in fine.iter().zip(&layout.fine_leaves).chain(crystals.iter().zip(&layout.crystal_leaves)) {
            assert!((live.position - descriptor.tree_position).length() < 1e-2);
            // Wave has passed, colors are back to base
            assert!((live.color - descriptor.base_color).abs().max_element() < 1e-5);
        }
    }
}
