// Intro sequence - camera drop from above, then a swoop to the front view while a
// slow wavefront sweeps the tree
use bevy::prelude::*;
use crate::constants::*;
use crate::drive::DriveState;
use crate::rotation::RotationIntegrator;
use crate::types::{OrbitCamera, TreeConfig};

/// Fired once when an intro run reaches the end
#[derive(Event, Debug, Clone, Copy)]
pub struct IntroFinished;

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum IntroState {
    #[default]
    Idle,
    Running { start: f32 },
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntroPhase {
    Drop,
    Impact,
}

/// Output of one intro tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntroFrame {
    pub progress: f32,
    pub phase: IntroPhase,
    pub camera_position: Vec3,
    pub wave_y: f32,
    pub finished: bool,
}

#[derive(Resource, Default, Debug)]
pub struct IntroSequencer {
    state: IntroState,
}

impl IntroSequencer {
    pub fn state(&self) -> IntroState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, IntroState::Running { .. })
    }

    /// Start (or restart) the sequence from the beginning
    pub fn activate(&mut self, now: f32) {
        self.state = IntroState::Running { start: now };
    }

    /// Sample the sequence at `now`. Returns None unless running; the frame that
    /// reaches full progress carries `finished` and leaves the sequencer Done.
    pub fn tick(&mut self, now: f32, tree_height: f32) -> Option<IntroFrame> {
        let IntroState::Running { start } = self.state else {
            return None;
        };
        let progress = intro_progress(now - start);
        let mut frame = sample_intro(progress, tree_height);
        if progress >= 1.0 {
            self.state = IntroState::Done;
            frame.wave_y = WAVE_INACTIVE;
            frame.finished = true;
        }
        Some(frame)
    }
}

/// Normalized progress, clamped to [0, 1]
pub fn intro_progress(elapsed: f32) -> f32 {
    if !elapsed.is_finite() {
        return 0.0;
    }
    (elapsed / INTRO_DURATION).clamp(0.0, 1.0)
}

fn sine_in_out(t: f32) -> f32 {
    -(t * std::f32::consts::PI).cos() / 2.0 + 0.5
}

fn cubic_out(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

fn quadratic_bezier(p0: Vec3, p1: Vec3, p2: Vec3, t: f32) -> Vec3 {
    let u = 1.0 - t;
    p0 * (u * u) + p1 * (2.0 * u * t) + p2 * (t * t)
}

/// Camera position and wave height for a given progress value
pub fn sample_intro(progress: f32, tree_height: f32) -> IntroFrame {
    let start = Vec3::from(INTRO_CAMERA_START);
    let mid = Vec3::from(INTRO_CAMERA_MID);
    let control = Vec3::from(INTRO_CAMERA_CONTROL);
    let end = Vec3::from(INTRO_CAMERA_FINAL);

    if progress < INTRO_DROP_FRACTION {
        let t = progress / INTRO_DROP_FRACTION;
        IntroFrame {
            progress,
            phase: IntroPhase::Drop,
            camera_position: start.lerp(mid, sine_in_out(t)),
            wave_y: WAVE_INACTIVE,
            finished: false,
        }
    } else {
        let t = ((progress - INTRO_DROP_FRACTION) / (1.0 - INTRO_DROP_FRACTION)).clamp(0.0, 1.0);
        let top = tree_height / 2.0 + INTRO_WAVE_PAD;
        let bottom = -tree_height / 2.0 - INTRO_WAVE_PAD;
        IntroFrame {
            progress,
            phase: IntroPhase::Impact,
            camera_position: quadratic_bezier(mid, control, end, cubic_out(t)),
            // The wave tracks raw phase time, only the camera is eased
            wave_y: top + (bottom - top) * t,
            finished: false,
        }
    }
}

/// Startup system: the intro plays once on launch
pub fn start_intro(time: Res<Time>, mut intro: ResMut<IntroSequencer>) {
    intro.activate(time.elapsed_secs());
    info!("Intro sequence started");
}

/// System: R replays the intro with a clean drive state
pub fn replay_intro_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut intro: ResMut<IntroSequencer>,
    mut drive: ResMut<DriveState>,
    mut rotation: ResMut<RotationIntegrator>,
) {
    if keyboard.just_pressed(KeyCode::KeyR) {
        if intro.is_running() {
            debug!("Intro restarted mid-flight");
        }
        drive.reset();
        rotation.reset();
        intro.activate(time.elapsed_secs());
        info!("Replaying intro");
    }
}

/// System: fly the camera along the intro path and publish the intro wave
pub fn run_intro_sequence(
    time: Res<Time>,
    config: Res<TreeConfig>,
    mut intro: ResMut<IntroSequencer>,
    mut drive: ResMut<DriveState>,
    mut camera_query: Query<(&mut Transform, &mut OrbitCamera), With<Camera3d>>,
    mut finished_events: EventWriter<IntroFinished>,
) {
    let Some(frame) = intro.tick(time.elapsed_secs(), config.height) else {
        return;
    };
    drive.intro_wave_y = frame.wave_y;

    if let Ok((mut transform, mut orbit)) = camera_query.single_mut() {
        *transform = Transform::from_translation(frame.camera_position).looking_at(Vec3::ZERO, Vec3::Y);
        orbit.enabled = false;
    }

    if frame.finished {
        finished_events.write(IntroFinished);
        info!("Intro finished");
    }
}
