// Tunables for the crystal tree scene, grouped by concern

// ===== TREE SHAPE =====

pub const LEAF_COUNT: usize = 9_000;
pub const RIBBON_COUNT: usize = 600;
pub const NEBULA_COUNT: usize = 60;
pub const TREE_HEIGHT: f32 = 26.0;
pub const TREE_BASE_RADIUS: f32 = 10.0;

/// Fraction of leaves tagged as fine leaves (the rest become crystals)
pub const FINE_LEAF_FRACTION: f32 = 0.85;
pub const FINE_LEAF_SCALE_MIN: f32 = 0.03;
pub const FINE_LEAF_SCALE_MAX: f32 = 0.06;
pub const CRYSTAL_LEAF_SCALE_MIN: f32 = 0.08;
pub const CRYSTAL_LEAF_SCALE_MAX: f32 = 0.14;
pub const LEAF_RADIUS_NOISE_MIN: f32 = 0.8;

pub const RIBBON_SCALE_MIN: f32 = 0.06;
pub const RIBBON_SCALE_MAX: f32 = 0.10;
pub const NEBULA_SCALE_MIN: f32 = 0.15;
pub const NEBULA_SCALE_MAX: f32 = 0.40;
/// Nebula ids start here so they never collide with leaf ids
pub const NEBULA_ID_OFFSET: u32 = 30_000;

/// Dispersal cloud: spherical shell radius range and vertical squash
pub const SCATTER_RADIUS_MIN: f32 = 35.0;
pub const SCATTER_RADIUS_MAX: f32 = 90.0;
pub const SCATTER_Y_SQUASH: f32 = 0.2;

/// Tree group offset inside the world
pub const TREE_ROOT_OFFSET: [f32; 3] = [0.0, -2.0, 0.0];

// ===== COLORS (sRGB hex) =====

pub const GRADIENT_STOPS_HEX: [u32; 5] = [0x012340, 0x034C8C, 0x03588C, 0x99BCEC, 0xF8D6E5];
pub const RIBBON_HEX: u32 = 0xF8D6E5;
pub const STAR_HEX: u32 = 0xF8D6E5;
pub const FLASH_HEX: u32 = 0xFFFAF0;
pub const BACKGROUND_HEX: u32 = 0x020205;

pub const LEAF_SATURATION_BOOST: f32 = 0.25;
pub const LEAF_BRIGHTNESS_BASE: f32 = 0.8;
pub const LEAF_BRIGHTNESS_SLOPE: f32 = 2.5;
pub const RIBBON_WHITE_MIX: f32 = 0.5;
pub const RIBBON_EMISSIVE_BOOST: f32 = 2.0;
pub const NEBULA_SATURATION_BOOST: f32 = 0.2;
pub const NEBULA_LIGHTNESS_BOOST: f32 = 0.1;
pub const NEBULA_EMISSIVE_BOOST: f32 = 3.0;

// ===== PARTICLE MOTION =====

/// Exponential approach rate toward the formed/dispersed target
pub const POSITION_BLEND_RATE: f32 = 2.5;
pub const LEAF_SPIN_RATE: f32 = 0.1;
pub const NEBULA_SPIN_RATE: f32 = 0.05;

pub const RIBBON_FLOW_SPEED: f32 = 0.025;
/// Angle swept by the ribbon from bottom to top (four full turns)
pub const RIBBON_SWEEP: f32 = 8.0 * std::f32::consts::PI;
pub const RIBBON_RADIUS_PAD: f32 = 1.8;
pub const RIBBON_LOOK_AHEAD: f32 = 0.005;

// ===== SHOCKWAVE =====

/// Wave heights at or below this are treated as inactive
pub const WAVE_ACTIVE_MIN: f32 = -900.0;
pub const WAVE_INACTIVE: f32 = -1000.0;
pub const MANUAL_WAVE_SPEED: f32 = 19.0;
pub const MANUAL_WAVE_START_PAD: f32 = 5.0;
pub const MANUAL_WAVE_END_PAD: f32 = 10.0;
pub const MANUAL_WAVE_SPIRAL: f32 = 2.0;
pub const MANUAL_WAVE_SHARPNESS: f32 = 0.3;
pub const INTRO_WAVE_SPIRAL: f32 = 0.5;
pub const INTRO_WAVE_SHARPNESS: f32 = 0.1;
pub const INTRO_WAVE_GAIN: f32 = 1.2;
pub const SHOCK_SCALE_THRESHOLD: f32 = 0.01;
pub const SHOCK_COLOR_THRESHOLD: f32 = 0.05;
pub const SHOCK_FLASH_MIX_MAX: f32 = 0.6;
pub const SHOCK_LUMINANCE_GAIN: f32 = 2.5;

// ===== INTRO SEQUENCE =====

pub const INTRO_DURATION: f32 = 2.5;
pub const INTRO_DROP_FRACTION: f32 = 0.6;
pub const INTRO_CAMERA_START: [f32; 3] = [0.0, 55.0, 0.1];
pub const INTRO_CAMERA_MID: [f32; 3] = [0.0, 35.0, 0.1];
pub const INTRO_CAMERA_CONTROL: [f32; 3] = [0.0, 25.0, 30.0];
pub const INTRO_CAMERA_FINAL: [f32; 3] = [0.0, 0.0, 54.0];
pub const INTRO_WAVE_PAD: f32 = 5.0;

// ===== ROTATION =====

pub const IMPULSE_SENSITIVITY: f32 = 0.005;
pub const ROTATION_DAMPING: f32 = 0.95;
pub const ROTATION_SNAP_EPSILON: f32 = 0.0001;
pub const ROTATION_IDLE_THRESHOLD: f32 = 0.001;
pub const IDLE_ROTATION_SPEED: f32 = 0.1;

// ===== GESTURES =====

pub const GESTURE_SAMPLE_INTERVAL: f32 = 1.0 / 30.0;
pub const PINCH_DISTANCE: f32 = 0.08;
pub const GESTURE_DEAD_ZONE: f32 = 0.001;
pub const GESTURE_IMPULSE_GAIN: f32 = 12.0;

// ===== SNOW =====

pub const SNOW_COUNT: usize = 2_500;
pub const SNOW_SPREAD_XZ: f32 = 120.0;
pub const SNOW_SPREAD_Y: f32 = 80.0;
pub const SNOW_CENTER_Y: f32 = 20.0;
pub const SNOW_CENTER_Z: f32 = -20.0;
pub const SNOW_FLOOR_Y: f32 = -30.0;
pub const SNOW_RESPAWN_Y: f32 = 50.0;
pub const SNOW_SWAY_AMPLITUDE: f32 = 1.5;
pub const SNOW_SPEED_MIN: f32 = 0.5;
pub const SNOW_SPEED_MAX: f32 = 2.5;
pub const SNOW_SCALE_MIN: f32 = 0.05;
pub const SNOW_SCALE_MAX: f32 = 0.17;
pub const SNOW_SWAY_SPEED_MIN: f32 = 0.2;
pub const SNOW_SWAY_SPEED_MAX: f32 = 1.0;
pub const SNOW_BRIGHTNESS: f32 = 1.4;   // White, pushed a little past 1.0 for bloom

// ===== STAR =====

pub const STAR_TOP_PAD: f32 = 0.5;
pub const STAR_DISPERSED_HEIGHT: f32 = 30.0;
pub const STAR_FOLLOW_FACTOR: f32 = 0.1;     // Per 60 Hz frame
pub const STAR_CORE_RADIUS: f32 = 0.3;
pub const STAR_HALO_RADIUS: f32 = 0.5;
pub const STAR_CORE_BRIGHTNESS: f32 = 4.0;
pub const STAR_HALO_OPACITY: f32 = 0.3;
pub const STAR_TILT_AMPLITUDE: f32 = 0.2;
pub const STAR_LIGHT_INTENSITY: f32 = 60_000.0;
pub const STAR_LIGHT_RANGE: f32 = 8.0;
pub const STAR_SPARKLE_BRIGHTNESS: f32 = 6.0;
pub const STAR_SPARKLE_SIZE: f32 = 0.08;
pub const STAR_SPARKLE_RADIUS: f32 = 0.6;
pub const STAR_SPARKLE_BURST: f32 = 4.0;
pub const STAR_SPARKLE_PERIOD: f32 = 0.1;

// ===== LOGO =====

pub const LOGO_IMAGE_PATH: &str = "textures/logo.png";
pub const LOGO_SAMPLE_STEP: usize = 4;
pub const LOGO_BRIGHTNESS_CUTOFF: u8 = 100;
pub const LOGO_PIXEL_SCALE: f32 = 0.04;
pub const LOGO_DEPTH_JITTER: f32 = 0.2;
pub const LOGO_ANCHOR: [f32; 3] = [15.0, 5.0, -20.0];
pub const LOGO_POINT_SIZE: f32 = 0.12;
pub const LOGO_FADE_RATE: f32 = 2.0;
pub const LOGO_TEXT: &str = "MERRY CHRISTMAS";
pub const LOGO_FONT_CELL: usize = 12;        // Image pixels per bitmap-font pixel
pub const LOGO_FLOAT_HEIGHT: f32 = 10.0;
pub const LOGO_FLOAT_AMPLITUDE: f32 = 0.5;
pub const LOGO_FLOAT_SPEED: f32 = 0.5;
pub const LOGO_BASE_YAW: f32 = -0.2;
pub const LOGO_YAW_SWAY: f32 = 0.05;
pub const LOGO_YAW_SPEED: f32 = 0.2;

// ===== AUDIO =====

pub const MUSIC_PATH: &str = "audio/bgm.ogg";

// ===== CAMERA =====

pub const CAMERA_FOV_DEGREES: f32 = 35.0;
pub const CAMERA_MIN_DISTANCE: f32 = 10.0;
pub const CAMERA_MAX_DISTANCE: f32 = 120.0;
pub const CAMERA_MAX_POLAR: f32 = std::f32::consts::PI / 1.6;
pub const CAMERA_ROTATION_SPEED: f32 = 0.005;
pub const CAMERA_ZOOM_SPEED: f32 = 4.0;
pub const CAMERA_DAMPING: f32 = 0.05;
