//! Layout generator for the crystal tree
//!
//! Builds the static particle field once per session: a golden-angle leaf
//! spiral split into fine and crystal leaves, color/scale placeholders for the
//! ribbon (its path is computed live), and a loose nebula around the cone.
//! Every particle also gets a scatter position on a flattened spherical shell.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{PI, TAU};

use crate::constants::*;
use crate::types::*;

/// Angle between successive leaves, π(3 - √5)
pub fn golden_angle() -> f32 {
    PI * (3.0 - 5.0_f32.sqrt())
}

pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Piecewise-linear gradient lookup, t in [0, 1]
pub fn sample_gradient(stops: &[Vec3], t: f32) -> Vec3 {
    match stops.len() {
        0 => Vec3::ONE,
        1 => stops[0],
        len => {
            let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
            let step = 1.0 / (len - 1) as f32;
            let index = ((t / step).floor() as usize).min(len - 2);
            let alpha = ((t - index as f32 * step) / step).clamp(0.0, 1.0);
            stops[index].lerp(stops[index + 1], alpha)
        }
    }
}

/// Uniform point on a spherical shell, squashed vertically into a disc-like cloud
pub fn random_scatter_position(rng: &mut impl Rng) -> Vec3 {
    let theta = rng.gen::<f32>() * TAU;
    let phi = (rng.gen::<f32>() * 2.0 - 1.0).acos();
    let radius = rng.gen_range(SCATTER_RADIUS_MIN..SCATTER_RADIUS_MAX);
    Vec3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.sin() * theta.sin() * SCATTER_Y_SQUASH,
        radius * phi.cos(),
    )
}

fn random_euler(rng: &mut impl Rng) -> Vec3 {
    Vec3::new(
        rng.gen::<f32>() * PI,
        rng.gen::<f32>() * PI,
        rng.gen::<f32>() * PI,
    )
}

/// Formed position of leaf `index` out of `count`, before radius noise
pub fn leaf_spiral_position(index: usize, count: usize, config: &TreeConfig, noise: f32) -> Vec3 {
    let t = index as f32 / count.max(1) as f32;
    let radius = config.base_radius * (1.0 - t) * noise;
    let theta = index as f32 * golden_angle();
    Vec3::new(
        radius * theta.cos(),
        config.height * t - config.height / 2.0,
        radius * theta.sin(),
    )
}

pub fn generate(config: &TreeConfig, rng: &mut impl Rng) -> TreeLayout {
    let mut layout = TreeLayout::default();

    // Leaves
    for i in 0..config.leaf_count {
        let t = i as f32 / config.leaf_count as f32;
        let noise = rng.gen_range(LEAF_RADIUS_NOISE_MIN..=1.0);
        let tree_position = leaf_spiral_position(i, config.leaf_count, config, noise);

        // Lower leaves stay dark, the crown glows
        let color = offset_hsl(sample_gradient(&config.gradient, t), LEAF_SATURATION_BOOST, 0.0)
            * (LEAF_BRIGHTNESS_BASE + t * LEAF_BRIGHTNESS_SLOPE);

        let is_fine = rng.gen::<f32>() < FINE_LEAF_FRACTION;
        let (kind, scale) = if is_fine {
            (ParticleKind::FineLeaf, rng.gen_range(FINE_LEAF_SCALE_MIN..FINE_LEAF_SCALE_MAX))
        } else {
            (ParticleKind::CrystalLeaf, rng.gen_range(CRYSTAL_LEAF_SCALE_MIN..CRYSTAL_LEAF_SCALE_MAX))
        };

        let descriptor = ParticleDescriptor {
            id: i as u32,
            kind,
            tree_position,
            random_position: random_scatter_position(rng),
            base_color: color,
            scale,
            rotation: random_euler(rng),
        };

        if is_fine {
            layout.fine_leaves.push(descriptor);
        } else {
            layout.crystal_leaves.push(descriptor);
        }
    }

    // Ribbon placeholders: position is computed every frame
    let white = Vec3::ONE;
    for i in 0..config.ribbon_count {
        let t = i as f32 / config.ribbon_count as f32;
        let color = sample_gradient(&config.gradient, t).lerp(white, RIBBON_WHITE_MIX) * RIBBON_EMISSIVE_BOOST;
        layout.ribbon.push(ParticleDescriptor {
            id: i as u32,
            kind: ParticleKind::Ribbon,
            tree_position: Vec3::ZERO,
            random_position: random_scatter_position(rng),
            base_color: color,
            scale: rng.gen_range(RIBBON_SCALE_MIN..RIBBON_SCALE_MAX),
            rotation: Vec3::ZERO,
        });
    }

    // Nebula: loose cloud slightly wider than the cone
    for i in 0..config.nebula_count {
        let t = rng.gen::<f32>();
        let radius_base = config.base_radius * (1.0 - t) + 4.0;
        let radius = 2.0 + rng.gen::<f32>() * radius_base;
        let theta = rng.gen::<f32>() * TAU;
        let color = offset_hsl(
            sample_gradient(&config.gradient, t),
            NEBULA_SATURATION_BOOST,
            NEBULA_LIGHTNESS_BOOST,
        ) * NEBULA_EMISSIVE_BOOST;

        layout.nebula.push(ParticleDescriptor {
            id: i as u32 + NEBULA_ID_OFFSET,
            kind: ParticleKind::Nebula,
            tree_position: Vec3::new(
                radius * theta.cos(),
                t * config.height - config.height / 2.0,
                radius * theta.sin(),
            ),
            random_position: random_scatter_position(rng),
            base_color: color,
            scale: rng.gen_range(NEBULA_SCALE_MIN..NEBULA_SCALE_MAX),
            rotation: random_euler(rng),
        });
    }

    layout
}

/// Startup system: generate the layout once and publish it as a resource
pub fn generate_tree_layout(mut commands: Commands, config: Res<TreeConfig>) {
    let mut rng = make_rng(config.seed);
    let layout = generate(&config, &mut rng);
    info!(
        "Generated crystal tree: {} fine leaves, {} crystals, {} ribbon, {} nebula",
        layout.fine_leaves.len(),
        layout.crystal_leaves.len(),
        layout.ribbon.len(),
        layout.nebula.len()
    );
    commands.insert_resource(layout);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(config: &TreeConfig, seed: u64) -> TreeLayout {
        let mut rng = StdRng::seed_from_u64(seed);
        generate(config, &mut rng)
    }

    #[test]
    fn leaf_groups_partition_leaf_count() {
        for count in [0, 1, 2, 17, 500, 9000] {
            let config = TreeConfig { leaf_count: count, ..default() };
            let layout = seeded(&config, 7);
            assert_eq!(layout.fine_leaves.len() + layout.crystal_leaves.len(), count);
        }
    }

    #[test]
    fn leaves_are_tagged_by_their_group() {
        let layout = seeded(&TreeConfig::default(), 1);
        assert!(layout.fine_leaves.iter().all(|p| p.kind == ParticleKind::FineLeaf));
        assert!(layout.crystal_leaves.iter().all(|p| p.kind == ParticleKind::CrystalLeaf));
        assert!(layout.fine_leaves.iter().all(|p| p.scale >= FINE_LEAF_SCALE_MIN && p.scale < FINE_LEAF_SCALE_MAX));
        assert!(layout.crystal_leaves.iter().all(|p| p.scale >= CRYSTAL_LEAF_SCALE_MIN && p.scale < CRYSTAL_LEAF_SCALE_MAX));
    }

    #[test]
    fn crystal_share_is_roughly_fifteen_percent() {
        let layout = seeded(&TreeConfig::default(), 3);
        let share = layout.crystal_leaves.len() as f32 / LEAF_COUNT as f32;
        assert!((share - 0.15).abs() < 0.03, "crystal share {share}");
    }

    #[test]
    fn heights_stay_inside_tree() {
        let config = TreeConfig::default();
        let layout = seeded(&config, 11);
        let half = config.height / 2.0;
        for particle in layout.fine_leaves.iter().chain(&layout.crystal_leaves).chain(&layout.nebula) {
            let y = particle.tree_position.y;
            assert!(y >= -half - 1e-4 && y <= half + 1e-4, "y = {y}");
        }
    }

    #[test]
    fn leaf_radius_shrinks_toward_apex() {
        let config = TreeConfig::default();
        let bottom = leaf_spiral_position(0, 100, &config, 1.0);
        let top = leaf_spiral_position(99, 100, &config, 1.0);
        let radial = |p: Vec3| Vec2::new(p.x, p.z).length();
        assert!((radial(bottom) - config.base_radius).abs() < 1e-4);
        assert!(radial(top) < 0.2);
    }

    #[test]
    fn gradient_endpoints_match_stops() {
        let stops = TreeConfig::default().gradient;
        let first = sample_gradient(&stops, 0.0);
        let last = sample_gradient(&stops, 1.0);
        assert!((first - stops[0]).abs().max_element() < 1e-5);
        assert!((last - stops[4]).abs().max_element() < 1e-5);
    }

    #[test]
    fn gradient_is_monotonic_within_each_segment() {
        let stops = TreeConfig::default().gradient;
        let segments = stops.len() - 1;
        for segment in 0..segments {
            let from = stops[segment];
            let to = stops[segment + 1];
            let mut previous = from;
            for step in 1..=20 {
                let t = (segment as f32 + step as f32 / 20.0) / segments as f32;
                let color = sample_gradient(&stops, t);
                for channel in 0..3 {
                    let direction = (to[channel] - from[channel]).signum();
                    assert!((color[channel] - previous[channel]) * direction >= -1e-5);
                }
                previous = color;
            }
        }
    }

    #[test]
    fn gradient_degenerate_stop_counts_are_finite() {
        assert_eq!(sample_gradient(&[], 0.5), Vec3::ONE);
        let single = [Vec3::new(0.2, 0.3, 0.4)];
        assert_eq!(sample_gradient(&single, 0.9), single[0]);
        let pair = [Vec3::ZERO, Vec3::ONE];
        assert!(sample_gradient(&pair, f32::NAN).is_finite());
    }

    #[test]
    fn adjacent_leaves_never_share_an_angle() {
        let step = golden_angle();
        for i in 0..9000_u32 {
            let a = (i as f64 * step as f64).rem_euclid(std::f64::consts::TAU);
            let b = ((i + 1) as f64 * step as f64).rem_euclid(std::f64::consts::TAU);
            assert!((a - b).abs() > 1e-3);
        }
    }

    #[test]
    fn scatter_positions_lie_on_flattened_shell() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..2000 {
            let p = random_scatter_position(&mut rng);
            let unsquashed = Vec3::new(p.x, p.y / SCATTER_Y_SQUASH, p.z).length();
            assert!(unsquashed >= SCATTER_RADIUS_MIN - 1e-3 && unsquashed <= SCATTER_RADIUS_MAX + 1e-3);
            assert!(p.y.abs() <= SCATTER_RADIUS_MAX * SCATTER_Y_SQUASH + 1e-3);
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let config = TreeConfig { leaf_count: 300, ..default() };
        let a = seeded(&config, 99);
        let b = seeded(&config, 99);
        assert_eq!(a.fine_leaves.len(), b.fine_leaves.len());
        for (x, y) in a.fine_leaves.iter().zip(&b.fine_leaves) {
            assert_eq!(x.tree_position, y.tree_position);
            assert_eq!(x.random_position, y.random_position);
        }
    }

    #[test]
    fn nebula_ids_are_offset_and_colors_boosted() {
        let layout = seeded(&TreeConfig::default(), 2);
        assert_eq!(layout.nebula.len(), NEBULA_COUNT);
        assert_eq!(layout.nebula[0].id, NEBULA_ID_OFFSET);
        assert_eq!(layout.ribbon.len(), RIBBON_COUNT);
        assert!(layout.ribbon.iter().all(|p| p.base_color.is_finite() && p.base_color.min_element() > 0.0));
    }
}
