// Floating logo - glyph image sampled into a cloud of colored points
use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy::render::render_resource::TextureFormat;
use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;

use crate::animator::InstanceBuffer;
use crate::constants::*;
use crate::drive::FrameDrive;
use crate::instancing::{batch_bundle, InstanceBatch};
use crate::layout::make_rng;
use crate::procedural_meshes::octahedron;
use crate::types::{hex_color, LiveParticle, TreeConfig};

#[derive(Error, Debug, PartialEq)]
pub enum GlyphError {
    #[error("Glyph image failed to load: {0}")]
    LoadFailed(String),

    #[error("Glyph image has no pixel data")]
    MissingData,

    #[error("Glyph image is empty ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    #[error("Unsupported glyph image format {0}")]
    UnsupportedFormat(String),

    #[error("Nothing drawable in {0:?}")]
    NoGlyphs(String),
}

/// One sampled logo point, local to the logo anchor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphPoint {
    pub position: Vec3,
    pub color: Vec3,
}

/// Anything that can turn a rendered glyph into a point cloud
pub trait GlyphRasterizer {
    fn rasterize(&self, palette: &[Vec3], rng: &mut StdRng) -> Result<Vec<GlyphPoint>, GlyphError>;
}

/// Walk a lit/unlit mask on the sampling grid and emit one point per lit cell,
/// centered on the mask and flipped so image rows grow downward
pub fn sample_glyph_mask(
    width: usize,
    height: usize,
    lit: impl Fn(usize, usize) -> bool,
    palette: &[Vec3],
    rng: &mut impl Rng,
) -> Vec<GlyphPoint> {
    let mut points = Vec::new();
    let half_w = width as f32 / 2.0;
    let half_h = height as f32 / 2.0;

    for y in (0..height).step_by(LOGO_SAMPLE_STEP) {
        for x in (0..width).step_by(LOGO_SAMPLE_STEP) {
            if !lit(x, y) {
                continue;
            }
            let position = Vec3::new(
                (x as f32 - half_w) * LOGO_PIXEL_SCALE,
                -(y as f32 - half_h) * LOGO_PIXEL_SCALE,
                (rng.gen::<f32>() - 0.5) * LOGO_DEPTH_JITTER,
            );
            let color = if palette.is_empty() {
                Vec3::ONE
            } else {
                palette[rng.gen_range(0..palette.len())]
            };
            points.push(GlyphPoint { position, color });
        }
    }
    points
}

/// Samples a loaded RGBA image, keeping pixels whose red channel is bright
pub struct ImageGlyphRasterizer<'a> {
    pub image: &'a Image,
}

impl GlyphRasterizer for ImageGlyphRasterizer<'_> {
    fn rasterize(&self, palette: &[Vec3], rng: &mut StdRng) -> Result<Vec<GlyphPoint>, GlyphError> {
        let width = self.image.width() as usize;
        let height = self.image.height() as usize;
        if width == 0 || height == 0 {
            return Err(GlyphError::EmptyImage { width, height });
        }

        let bytes_per_pixel = match self.image.texture_descriptor.format {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rg8Unorm => 2,
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => 4,
            TextureFormat::Bgra8Unorm | TextureFormat::Bgra8UnormSrgb => 4,
            other => return Err(GlyphError::UnsupportedFormat(format!("{other:?}"))),
        };
        // BGRA keeps red in the third byte
        let red_offset = match self.image.texture_descriptor.format {
            TextureFormat::Bgra8Unorm | TextureFormat::Bgra8UnormSrgb => 2,
            _ => 0,
        };

        let data = self.image.data.as_ref().ok_or(GlyphError::MissingData)?;
        let lit = |x: usize, y: usize| {
            let index = (y * width + x) * bytes_per_pixel + red_offset;
            data.get(index).is_some_and(|&red| red > LOGO_BRIGHTNESS_CUTOFF)
        };
        Ok(sample_glyph_mask(width, height, lit, palette, rng))
    }
}

// 5x7 bitmap font, one row per byte, bit 4 = leftmost column
const FONT_ROWS: usize = 7;
const FONT_COLUMNS: usize = 5;

fn font_glyph(c: char) -> Option<[u8; FONT_ROWS]> {
    let rows = match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        ' ' => [0; FONT_ROWS],
        _ => return None,
    };
    Some(rows)
}

/// Built-in fallback: renders text with a tiny bitmap font, no assets needed
pub struct BitmapTextRasterizer<'a> {
    pub text: &'a str,
    pub cell: usize,
}

impl BitmapTextRasterizer<'_> {
    fn glyphs(&self) -> Vec<[u8; FONT_ROWS]> {
        self.text.chars().filter_map(font_glyph).collect()
    }
}

impl GlyphRasterizer for BitmapTextRasterizer<'_> {
    fn rasterize(&self, palette: &[Vec3], rng: &mut StdRng) -> Result<Vec<GlyphPoint>, GlyphError> {
        let glyphs = self.glyphs();
        if self.cell == 0 || glyphs.iter().all(|rows| rows.iter().all(|&row| row == 0)) {
            return Err(GlyphError::NoGlyphs(self.text.to_string()));
        }

        // One blank font column between letters, one blank row above and below
        let advance = (FONT_COLUMNS + 1) * self.cell;
        let width = glyphs.len() * advance;
        let height = (FONT_ROWS + 2) * self.cell;
        let cell = self.cell;

        let lit = |x: usize, y: usize| {
            let (column, row) = (x % advance / cell, y / cell);
            if column >= FONT_COLUMNS || row == 0 || row > FONT_ROWS {
                return false;
            }
            let rows = glyphs[x / advance];
            rows[row - 1] & (1 << (FONT_COLUMNS - 1 - column)) != 0
        };
        Ok(sample_glyph_mask(width, height, lit, palette, rng))
    }
}

/// Ribbon, star, then the five gradient stops
pub fn logo_palette(config: &TreeConfig) -> Vec<Vec3> {
    let mut palette = vec![hex_color(RIBBON_HEX), hex_color(STAR_HEX)];
    palette.extend(config.gradient.iter().copied());
    palette
}

#[derive(Component, Debug)]
pub struct FloatingLogo {
    pub opacity: f32,
}

/// Logo image we're waiting on; cleared once the logo is built
#[derive(Resource, Default)]
pub struct LogoAssets {
    pub pending_image: Option<Handle<Image>>,
}

pub fn load_logo_image(mut commands: Commands, asset_server: Res<AssetServer>) {
    commands.insert_resource(LogoAssets {
        pending_image: Some(asset_server.load(LOGO_IMAGE_PATH)),
    });
}

fn rasterize_logged(rasterizer: &dyn GlyphRasterizer, palette: &[Vec3], rng: &mut StdRng) -> Result<Vec<GlyphPoint>, GlyphError> {
    let points = rasterizer.rasterize(palette, rng)?;
    debug!("Rasterized {} logo points", points.len());
    Ok(points)
}

/// Resolve the logo points: the image when it loads, bitmap text when it can't
pub fn resolve_logo_points(
    image: Result<&Image, GlyphError>,
    palette: &[Vec3],
    rng: &mut StdRng,
) -> Vec<GlyphPoint> {
    let from_image = image.and_then(|image| rasterize_logged(&ImageGlyphRasterizer { image }, palette, rng));
    match from_image {
        Ok(points) if !points.is_empty() => points,
        Ok(_) => {
            warn!("Logo image has no bright pixels, using built-in text");
            fallback_text_points(palette, rng)
        }
        Err(err) => {
            warn!("Logo rasterization failed: {err}, using built-in text");
            fallback_text_points(palette, rng)
        }
    }
}

fn fallback_text_points(palette: &[Vec3], rng: &mut StdRng) -> Vec<GlyphPoint> {
    let text = BitmapTextRasterizer { text: LOGO_TEXT, cell: LOGO_FONT_CELL };
    rasterize_logged(&text, palette, rng).unwrap_or_else(|err| {
        warn!("Logo disabled: {err}");
        Vec::new()
    })
}

/// System: build the logo once its image has loaded (or definitely failed)
pub fn build_logo_when_ready(
    mut commands: Commands,
    mut logo_assets: ResMut<LogoAssets>,
    asset_server: Res<AssetServer>,
    images: Res<Assets<Image>>,
    config: Res<TreeConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(handle) = logo_assets.pending_image.clone() else {
        return;
    };

    let image = match images.get(&handle) {
        Some(image) => Ok(image),
        None => match asset_server.load_state(&handle) {
            LoadState::Failed(err) => Err(GlyphError::LoadFailed(err.to_string())),
            // Still loading
            _ => return,
        },
    };
    logo_assets.pending_image = None;

    let palette = logo_palette(&config);
    let mut rng = make_rng(config.seed.map(|seed| seed.wrapping_add(2)));
    let points = resolve_logo_points(image, &palette, &mut rng);

    let particles: Vec<LiveParticle> = points
        .iter()
        .map(|point| LiveParticle {
            position: point.position,
            euler: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(LOGO_POINT_SIZE),
            color: point.color,
        })
        .collect();

    let material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        unlit: true,
        alpha_mode: AlphaMode::Add,
        ..default()
    });

    info!("Logo built with {} points", particles.len());
    commands.spawn((
        batch_bundle(
            InstanceBatch::new(octahedron(0.5)).with_opacity(0.0),
            InstanceBuffer { particles },
            &mut meshes,
            material,
        ),
        FloatingLogo { opacity: 0.0 },
        Name::new("FloatingLogo"),
    ))
    .insert((
        Transform::from_translation(logo_translation(0.0)).with_rotation(logo_rotation(0.0)),
        Visibility::Hidden,
    ));
}

pub fn logo_translation(elapsed: f32) -> Vec3 {
    Vec3::from(LOGO_ANCHOR)
        + Vec3::Y * (LOGO_FLOAT_HEIGHT + (elapsed * LOGO_FLOAT_SPEED).sin() * LOGO_FLOAT_AMPLITUDE)
}

pub fn logo_rotation(elapsed: f32) -> Quat {
    Quat::from_rotation_y(LOGO_BASE_YAW + (elapsed * LOGO_YAW_SPEED).sin() * LOGO_YAW_SWAY)
}

/// Ease opacity toward its target; shown while the tree is formed
pub fn step_logo_opacity(opacity: f32, formed: bool, dt: f32) -> f32 {
    let target = if formed { 1.0 } else { 0.0 };
    let t = (dt * LOGO_FADE_RATE).clamp(0.0, 1.0);
    let next = opacity + (target - opacity) * t;
    if next.is_finite() { next.clamp(0.0, 1.0) } else { target }
}

/// System: fade and float the logo
pub fn animate_logo(
    time: Res<Time>,
    drive: Res<FrameDrive>,
    mut logos: Query<(&mut FloatingLogo, &mut InstanceBatch, &mut Transform, &mut Visibility)>,
) {
    let elapsed = time.elapsed_secs();
    for (mut logo, mut batch, mut transform, mut visibility) in logos.iter_mut() {
        logo.opacity = step_logo_opacity(logo.opacity, drive.is_formed, time.delta_secs());
        batch.opacity = logo.opacity;
        transform.translation = logo_translation(elapsed);
        transform.rotation = logo_rotation(elapsed);
        *visibility = if logo.opacity > 0.005 { Visibility::Inherited } else { Visibility::Hidden };
    }
}
