// Tree star - glowing apex ornament that rides up and away when the tree disperses
use bevy::prelude::*;

use crate::constants::*;
use crate::drive::FrameDrive;
use crate::particles::{sparkle_emitter, SparkleEffects};
use crate::procedural_meshes::icosahedron;
use crate::types::{hex_color, TreeConfig};

#[derive(Component, Debug)]
pub struct TreeStar {
    pub position: Vec3,
}

/// Where the star sits for the current formation state
pub fn star_target(formed: bool, tree_height: f32) -> Vec3 {
    if formed {
        Vec3::new(0.0, tree_height / 2.0 + STAR_TOP_PAD, 0.0)
    } else {
        Vec3::new(0.0, STAR_DISPERSED_HEIGHT, 0.0)
    }
}

/// Frame-rate independent version of a fixed per-frame lerp factor tuned at 60 Hz
pub fn follow_factor(dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 0.0;
    }
    1.0 - (1.0 - STAR_FOLLOW_FACTOR).powf(dt * 60.0)
}

/// Spawn the star (core, halo, light, sparkles) under the tree root
pub fn spawn_tree_star(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    sparkles: Option<&SparkleEffects>,
    root: Entity,
    tree_height: f32,
) {
    let star_color = hex_color(STAR_HEX);
    let core = star_color * STAR_CORE_BRIGHTNESS;

    let core_material = materials.add(StandardMaterial {
        base_color: Color::linear_rgb(core.x, core.y, core.z),
        emissive: LinearRgba::rgb(core.x, core.y, core.z),
        unlit: true,
        ..default()
    });
    let halo_material = materials.add(StandardMaterial {
        base_color: Color::linear_rgba(star_color.x, star_color.y, star_color.z, STAR_HALO_OPACITY),
        unlit: true,
        alpha_mode: AlphaMode::Add,
        cull_mode: None,
        ..default()
    });

    let position = star_target(true, tree_height);
    let star = commands
        .spawn((
            TreeStar { position },
            Transform::from_translation(position),
            Visibility::default(),
            Name::new("TreeStar"),
        ))
        .with_children(|parent| {
            parent.spawn((
                Mesh3d(meshes.add(icosahedron(STAR_CORE_RADIUS).to_mesh())),
                MeshMaterial3d(core_material),
            ));
            parent.spawn((
                Mesh3d(meshes.add(icosahedron(STAR_HALO_RADIUS).to_mesh())),
                MeshMaterial3d(halo_material),
            ));
            parent.spawn(PointLight {
                color: Color::linear_rgb(star_color.x, star_color.y, star_color.z),
                intensity: STAR_LIGHT_INTENSITY,
                range: STAR_LIGHT_RANGE,
                shadows_enabled: false,
                ..default()
            });
            if let Some(effects) = sparkles {
                parent.spawn(sparkle_emitter(effects));
            }
        })
        .id();
    commands.entity(root).add_child(star);
}

/// System: ease the star toward its target, spin and wobble it
pub fn animate_tree_star(
    time: Res<Time>,
    config: Res<TreeConfig>,
    drive: Res<FrameDrive>,
    mut stars: Query<(&mut TreeStar, &mut Transform)>,
) {
    let dt = time.delta_secs();
    let elapsed = time.elapsed_secs();
    let target = star_target(drive.is_formed, config.height);
    let factor = follow_factor(dt);

    for (mut star, mut transform) in stars.iter_mut() {
        star.position = star.position.lerp(target, factor);
        transform.translation = star.position;

        let (yaw, _, _) = transform.rotation.to_euler(EulerRot::YXZ);
        transform.rotation = Quat::from_euler(
            EulerRot::YXZ,
            yaw + dt,
            0.0,
            (elapsed * 2.0).sin() * STAR_TILT_AMPLITUDE,
        );
    }
}
