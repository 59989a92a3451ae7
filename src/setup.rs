// Scene setup - camera, lights, the rotating tree root with its particle batches, and the HUD
use bevy::prelude::*;
use bevy::core_pipeline::bloom::{Bloom, BloomPrefilter};
use bevy::core_pipeline::tonemapping::Tonemapping;
use crate::animator::InstanceBuffer;
use crate::constants::*;
use crate::drive::form_toggle_label;
use crate::instancing::{batch_bundle, InstanceBatch};
use crate::particles::SparkleEffects;
use crate::procedural_meshes::template_for;
use crate::snow::SnowField;
use crate::star::spawn_tree_star;
use crate::types::*;

/// Scene fill lights: position, sRGB hex, intensity (lumens), range
const FILL_LIGHTS: [([f32; 3], u32, f32, f32); 4] = [
    ([0.0, 25.0, 0.0], 0xF8D6E5, 800_000.0, 60.0),
    ([20.0, 10.0, 20.0], 0x99BCEC, 400_000.0, 60.0),
    ([-20.0, -10.0, -20.0], 0x034C8C, 400_000.0, 60.0),
    ([0.0, -20.0, 10.0], 0x012340, 300_000.0, 60.0),
];

pub const CONTROLS_HELP: &str = "SPACE  dissolve / re-crystallize\nR  replay intro\nM  music\nF7  hide UI\nLMB drag  orbit   wheel  zoom\nRMB hold  hand   + SHIFT  pinch";

/// Material for a group: how the baked vertex alpha is read
pub fn group_material(kind: ParticleKind) -> StandardMaterial {
    let alpha_mode = match kind {
        ParticleKind::FineLeaf | ParticleKind::CrystalLeaf | ParticleKind::Snow => AlphaMode::Opaque,
        ParticleKind::Ribbon => AlphaMode::Blend,
        ParticleKind::Nebula => AlphaMode::Add,
    };
    StandardMaterial {
        base_color: Color::WHITE,
        unlit: true,
        alpha_mode,
        cull_mode: None,
        ..default()
    }
}

/// Opacity baked into a group's vertex alpha
pub fn group_opacity(kind: ParticleKind) -> f32 {
    match kind {
        ParticleKind::Ribbon => 0.9,
        ParticleKind::Nebula => 0.8,
        _ => 1.0,
    }
}

pub fn setup_camera_and_lights(mut commands: Commands) {
    let background = hex_color(BACKGROUND_HEX);
    commands.insert_resource(ClearColor(Color::linear_rgb(background.x, background.y, background.z)));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 50.0,
        affects_lightmapped_meshes: false,
    });

    for (position, hex, intensity, range) in FILL_LIGHTS {
        let color = hex_color(hex);
        commands.spawn((
            PointLight {
                color: Color::linear_rgb(color.x, color.y, color.z),
                intensity,
                range,
                shadows_enabled: false,
                ..default()
            },
            Transform::from_translation(Vec3::from(position)),
        ));
    }

    // Camera starts high above the crown; the intro flies it down
    let start = Vec3::from(INTRO_CAMERA_START);
    commands.spawn((
        Camera3d::default(),
        Camera {
            hdr: true,
            ..default()
        },
        Projection::from(PerspectiveProjection {
            fov: CAMERA_FOV_DEGREES.to_radians(),
            ..default()
        }),
        Tonemapping::AcesFitted,
        Bloom {
            intensity: 0.25,
            prefilter: BloomPrefilter {
                threshold: 0.2,
                threshold_softness: 0.2,
            },
            ..Bloom::NATURAL
        },
        Transform::from_translation(start).looking_at(Vec3::ZERO, Vec3::Y),
        OrbitCamera::from_position(start),
    ));
}

/// Tree root with one batch per group, the snow and the star underneath it
pub fn spawn_tree(
    mut commands: Commands,
    layout: Res<TreeLayout>,
    snow: Res<SnowField>,
    config: Res<TreeConfig>,
    sparkles: Option<Res<SparkleEffects>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let root = commands
        .spawn((
            TreeRoot,
            Transform::from_translation(Vec3::from(TREE_ROOT_OFFSET)),
            Visibility::default(),
            Name::new("TreeRoot"),
        ))
        .id();

    let groups = [
        ParticleKind::FineLeaf,
        ParticleKind::CrystalLeaf,
        ParticleKind::Ribbon,
        ParticleKind::Nebula,
    ];
    for kind in groups {
        let descriptors = layout.group(kind);
        let batch = InstanceBatch::new(template_for(kind)).with_opacity(group_opacity(kind));
        let material = materials.add(group_material(kind));
        let group = commands
            .spawn((
                batch_bundle(batch, InstanceBuffer::from_descriptors(descriptors), &mut meshes, material),
                kind,
                Name::new(format!("{kind:?}")),
            ))
            .id();
        commands.entity(root).add_child(group);
        debug!("{kind:?}: {} particles", descriptors.len());
    }

    let mut snow_buffer = InstanceBuffer::default();
    snow.write_live(0.0, &mut snow_buffer.particles);
    let snow_group = commands
        .spawn((
            batch_bundle(
                InstanceBatch::new(template_for(ParticleKind::Snow)),
                snow_buffer,
                &mut meshes,
                materials.add(group_material(ParticleKind::Snow)),
            ),
            ParticleKind::Snow,
            Name::new("Snow"),
        ))
        .id();
    commands.entity(root).add_child(snow_group);

    spawn_tree_star(
        &mut commands,
        &mut meshes,
        &mut materials,
        sparkles.as_deref(),
        root,
        config.height,
    );

    info!(
        "Tree spawned: {} tree particles, {} flakes",
        layout.total(),
        snow.flakes.len()
    );
}

pub fn setup_hud(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                ..default()
            },
            HudRoot,
        ))
        .with_children(|hud| {
            hud.spawn((
                Text::new(CONTROLS_HELP),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::srgba(0.97, 0.84, 0.9, 0.8)),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(10.0),
                    left: Val::Px(10.0),
                    ..default()
                },
                ControlsText,
            ));
            hud.spawn((
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(10.0),
                    right: Val::Px(10.0),
                    flex_direction: FlexDirection::Column,
                    align_items: AlignItems::FlexEnd,
                    ..default()
                },
                BackgroundColor(Color::NONE),
            ))
            .with_children(|status| {
                status.spawn((
                    Text::new("GESTURE: OFF"),
                    TextFont {
                        font_size: 14.0,
                        ..default()
                    },
                    TextColor(Color::srgb(0.6, 0.74, 0.93)),
                    GestureStatusText,
                ));
                status.spawn((
                    Text::new(form_toggle_label(true)),
                    TextFont {
                        font_size: 14.0,
                        ..default()
                    },
                    TextColor(Color::srgb(0.97, 0.84, 0.9)),
                    FormToggleText,
                ));
                status.spawn((
                    Text::new("MUSIC: OFF"),
                    TextFont {
                        font_size: 14.0,
                        ..default()
                    },
                    TextColor(Color::srgb(0.6, 0.74, 0.93)),
                    MusicStatusText,
                ));
            });
        });
}

/// F7 shows or hides the whole HUD
pub fn toggle_hud_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut huds: Query<&mut Visibility, With<HudRoot>>,
) {
    if !keyboard.just_pressed(KeyCode::F7) {
        return;
    }
    for mut visibility in huds.iter_mut() {
        *visibility = match *visibility {
            Visibility::Hidden => Visibility::Inherited,
            _ => Visibility::Hidden,
        };
    }
}
