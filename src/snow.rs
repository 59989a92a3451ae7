// Ambient snow - independent falling flakes with sway, wrapped back to the top
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;
use std::f32::consts::TAU;

use crate::animator::InstanceBuffer;
use crate::constants::*;
use crate::layout::make_rng;
use crate::types::{LiveParticle, ParticleKind, TreeConfig};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Flake {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub speed: f32,
    pub scale: f32,
    pub sway_speed: f32,
    pub sway_offset: f32,
}

impl Flake {
    pub fn sample(rng: &mut impl Rng) -> Self {
        Self {
            x: (rng.gen::<f32>() - 0.5) * SNOW_SPREAD_XZ,
            y: (rng.gen::<f32>() - 0.5) * SNOW_SPREAD_Y + SNOW_CENTER_Y,
            z: (rng.gen::<f32>() - 0.5) * SNOW_SPREAD_XZ + SNOW_CENTER_Z,
            speed: rng.gen_range(SNOW_SPEED_MIN..SNOW_SPEED_MAX),
            scale: rng.gen_range(SNOW_SCALE_MIN..SNOW_SCALE_MAX),
            sway_speed: rng.gen_range(SNOW_SWAY_SPEED_MIN..SNOW_SWAY_SPEED_MAX),
            sway_offset: rng.gen::<f32>() * TAU,
        }
    }

    /// Fall by one step; below the floor the flake respawns at the top with new x/z
    pub fn fall(&mut self, dt: f32, rng: &mut impl Rng) {
        self.y -= self.speed * dt;
        if self.y < SNOW_FLOOR_Y || !self.y.is_finite() {
            self.y = SNOW_RESPAWN_Y;
            self.x = (rng.gen::<f32>() - 0.5) * SNOW_SPREAD_XZ;
            self.z = (rng.gen::<f32>() - 0.5) * SNOW_SPREAD_XZ + SNOW_CENTER_Z;
        }
    }

    /// Rendered position: the falling column plus a circular sway
    pub fn position(&self, time: f32) -> Vec3 {
        let phase = time * self.sway_speed + self.sway_offset;
        Vec3::new(
            self.x + phase.sin() * SNOW_SWAY_AMPLITUDE,
            self.y,
            self.z + phase.cos() * SNOW_SWAY_AMPLITUDE,
        )
    }
}

#[derive(Resource)]
pub struct SnowField {
    pub flakes: Vec<Flake>,
    rng: StdRng,
}

impl SnowField {
    pub fn new(count: usize, mut rng: StdRng) -> Self {
        let flakes = (0..count).map(|_| Flake::sample(&mut rng)).collect();
        Self { flakes, rng }
    }

    pub fn step(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        for flake in &mut self.flakes {
            flake.fall(dt, &mut self.rng);
        }
    }

    /// Write this frame's flakes into a render buffer
    pub fn write_live(&self, time: f32, live: &mut Vec<LiveParticle>) {
        let color = Vec3::splat(SNOW_BRIGHTNESS);
        live.clear();
        live.extend(self.flakes.iter().map(|flake| LiveParticle {
            position: flake.position(time),
            euler: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(flake.scale),
            color,
        }));
    }
}

/// Startup system: sample the flakes once
pub fn init_snow_field(mut commands: Commands, config: Res<TreeConfig>) {
    // Offset the seed so snow doesn't mirror the tree's random stream
    let rng = make_rng(config.seed.map(|seed| seed.wrapping_add(1)));
    commands.insert_resource(SnowField::new(config.snow_count, rng));
    info!("Snow field: {} flakes", config.snow_count);
}

/// System: let it snow
pub fn update_snow(
    time: Res<Time>,
    mut snow: ResMut<SnowField>,
    mut groups: Query<(&ParticleKind, &mut InstanceBuffer)>,
) {
    snow.step(time.delta_secs());
    for (kind, mut buffer) in groups.iter_mut() {
        if *kind == ParticleKind::Snow {
            snow.write_live(time.elapsed_secs(), &mut buffer.particles);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn field(count: usize) -> SnowField {
        SnowField::new(count, StdRng::seed_from_u64(7))
    }

    #[test]
    fn initial_flakes_fill_the_volume() {
        let snow = field(500);
        assert_eq!(snow.flakes.len(), 500);
        for flake in &snow.flakes {
            assert!(flake.x.abs() <= SNOW_SPREAD_XZ / 2.0);
            assert!((flake.y - SNOW_CENTER_Y).abs() <= SNOW_SPREAD_Y / 2.0);
            assert!((flake.z - SNOW_CENTER_Z).abs() <= SNOW_SPREAD_XZ / 2.0);
            assert!((SNOW_SPEED_MIN..SNOW_SPEED_MAX).contains(&flake.speed));
            assert!((SNOW_SCALE_MIN..SNOW_SCALE_MAX).contains(&flake.scale));
        }
    }

    #[test]
    fn flakes_fall_by_speed() {
        let mut snow = field(10);
        let before = snow.flakes.clone();
        snow.step(0.1);
        for (old, new) in before.iter().zip(&snow.flakes) {
            if new.y != SNOW_RESPAWN_Y {
                assert!((old.y - new.y - old.speed * 0.1).abs() < 1e-5);
                assert_eq!(old.x, new.x);
            }
        }
    }

    #[test]
    fn flakes_wrap_to_the_top() {
        let mut snow = field(1);
        snow.flakes[0].y = SNOW_FLOOR_Y + 0.01;
        snow.flakes[0].speed = 2.0;
        snow.step(0.1);
        let flake = snow.flakes[0];
        assert_eq!(flake.y, SNOW_RESPAWN_Y);
        assert!(flake.x.abs() <= SNOW_SPREAD_XZ / 2.0);
        assert!((flake.z - SNOW_CENTER_Z).abs() <= SNOW_SPREAD_XZ / 2.0);
    }

    #[test]
    fn long_run_stays_in_bounds() {
        let mut snow = field(200);
        for _ in 0..3000 {
            snow.step(1.0 / 30.0);
            for flake in &snow.flakes {
                assert!(flake.y >= SNOW_FLOOR_Y - SNOW_SPEED_MAX / 30.0);
                assert!(flake.y <= SNOW_CENTER_Y + SNOW_SPREAD_Y / 2.0);
            }
        }
    }

    #[test]
    fn sway_is_bounded() {
        let snow = field(50);
        for flake in &snow.flakes {
            for step in 0..100 {
                let p = flake.position(step as f32 * 0.37);
                assert!((p.x - flake.x).abs() <= SNOW_SWAY_AMPLITUDE + 1e-5);
                assert!((p.z - flake.z).abs() <= SNOW_SWAY_AMPLITUDE + 1e-5);
                assert_eq!(p.y, flake.y);
            }
        }
    }

    #[test]
    fn write_live_matches_flake_count() {
        let snow = field(64);
        let mut live = Vec::new();
        snow.write_live(1.0, &mut live);
        assert_eq!(live.len(), 64);
        assert!(live.iter().all(LiveParticle::is_finite));
    }
}
