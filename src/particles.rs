// GPU sparkle effects using Bevy Hanabi
// Provides the continuous glitter that trails around the tree star
use bevy::prelude::*;
use bevy_hanabi::prelude::*;

use crate::constants::*;
use crate::types::hex_color;

pub struct ParticleEffectsPlugin;

impl Plugin for ParticleEffectsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(HanabiPlugin)
            .add_systems(Startup, setup_particle_effects);
    }
}

// Resource to store particle effect templates
#[derive(Resource)]
pub struct SparkleEffects {
    pub star_sparkles: Handle<EffectAsset>,
}

pub fn setup_particle_effects(
    mut commands: Commands,
    mut effects: ResMut<Assets<EffectAsset>>,
) {
    let star = hex_color(STAR_HEX) * STAR_SPARKLE_BRIGHTNESS;

    // Hot HDR pink at birth, fading out while it cools towards white
    let mut color_gradient = bevy_hanabi::Gradient::new();
    color_gradient.add_key(0.0, star.extend(1.0));
    color_gradient.add_key(0.4, (star * 0.6 + Vec3::splat(0.4 * STAR_SPARKLE_BRIGHTNESS)).extend(0.8));
    color_gradient.add_key(1.0, Vec3::ONE.extend(0.0));

    let mut size_gradient = bevy_hanabi::Gradient::new();
    size_gradient.add_key(0.0, Vec3::splat(0.02));
    size_gradient.add_key(0.2, Vec3::splat(STAR_SPARKLE_SIZE));
    size_gradient.add_key(1.0, Vec3::splat(0.0));

    let writer = ExprWriter::new();

    let init_pos = SetPositionSphereModifier {
        center: writer.lit(Vec3::ZERO).expr(),
        radius: writer.lit(STAR_SPARKLE_RADIUS).expr(),
        dimension: ShapeDimension::Surface,
    };

    // Slow outward drift
    let init_vel = SetVelocitySphereModifier {
        center: writer.lit(Vec3::ZERO).expr(),
        speed: writer.lit(0.3).uniform(writer.lit(1.2)).expr(),
    };

    let init_age = SetAttributeModifier::new(Attribute::AGE, writer.lit(0.0).expr());
    let init_lifetime = SetAttributeModifier::new(
        Attribute::LIFETIME,
        writer.lit(0.6).uniform(writer.lit(1.4)).expr(),
    );
    let init_size = SetAttributeModifier::new(Attribute::SIZE, writer.lit(STAR_SPARKLE_SIZE).expr());

    // Sparkles sink a little, like falling glitter
    let update_accel = AccelModifier::new(writer.lit(Vec3::new(0.0, -0.6, 0.0)).expr());
    let update_drag = LinearDragModifier::new(writer.lit(1.5).expr());

    let sparkle_module = writer.finish();

    // SpawnerSettings::new(count, spawn_duration, period, cycle_count)
    // A short burst every period, repeated forever (cycle_count 0)
    let star_sparkles = effects.add(
        EffectAsset::new(
            256,
            SpawnerSettings::new(
                STAR_SPARKLE_BURST.into(),
                STAR_SPARKLE_PERIOD.into(),
                STAR_SPARKLE_PERIOD.into(),
                0,
            ),
            sparkle_module,
        )
            .with_name("star_sparkles")
            .with_alpha_mode(bevy_hanabi::AlphaMode::Add)
            .init(init_pos)
            .init(init_vel)
            .init(init_age)
            .init(init_lifetime)
            .init(init_size)
            .update(update_accel)
            .update(update_drag)
            .render(OrientModifier::new(OrientMode::FaceCameraPosition))
            .render(ColorOverLifetimeModifier::new(color_gradient))
            .render(SizeOverLifetimeModifier { gradient: size_gradient, screen_space_size: false })
    );

    commands.insert_resource(SparkleEffects { star_sparkles });
    info!("Star sparkle effect ready");
}

/// Emitter bundle, parented under whatever it should follow
pub fn sparkle_emitter(effects: &SparkleEffects) -> impl Bundle {
    (
        ParticleEffect::new(effects.star_sparkles.clone()),
        Transform::default(),
        Visibility::Visible,
        Name::new("StarSparkles"),
    )
}
