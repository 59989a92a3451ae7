// Gesture input - hand landmarks in, formed/dispersed and rotation impulses out
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::constants::*;
use crate::drive::DriveState;
use crate::rotation::RotationIntegrator;
use crate::types::GestureStatusText;

#[derive(Error, Debug)]
pub enum GestureError {
    #[error("Hand tracking backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Fingertips in normalized image coordinates (0..1, origin top-left, camera-mirrored)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandLandmarks {
    pub index_tip: Vec2,
    pub thumb_tip: Vec2,
}

/// External hand tracking capability. Implementations sample on their own
/// clock; `landmarks` returns the latest hand seen, if any.
pub trait HandTracker: Send + Sync + 'static {
    fn start(&mut self) -> Result<(), GestureError>;
    fn landmarks(&mut self) -> Option<HandLandmarks>;
}

/// What one observation means for the scene
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureObservation {
    pub pinch: bool,
    /// Mirrored horizontal position, 0..1 left to right on screen
    pub x: f32,
    pub impulse: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GestureStatus {
    #[default]
    Initializing,
    TrackingActive,
    NoHand,
    Pinch,
    Open,
    Unavailable,
}

impl GestureStatus {
    pub fn label(self) -> &'static str {
        match self {
            GestureStatus::Initializing => "Initializing...",
            GestureStatus::TrackingActive => "Tracking Active",
            GestureStatus::NoHand => "No Hand Detected",
            GestureStatus::Pinch => "PINCH: Converge",
            GestureStatus::Open => "OPEN: Explode",
            GestureStatus::Unavailable => "Gesture Unavailable",
        }
    }
}

/// Turns raw landmarks into observations, remembering the last x for deltas
#[derive(Default, Debug)]
pub struct GestureInterpreter {
    last_x: Option<f32>,
}

impl GestureInterpreter {
    pub fn observe(&mut self, landmarks: Option<HandLandmarks>) -> Option<GestureObservation> {
        let Some(hand) = landmarks.filter(|h| h.index_tip.is_finite() && h.thumb_tip.is_finite()) else {
            self.last_x = None;
            return None;
        };

        let x = 1.0 - hand.index_tip.x;
        let pinch = hand.index_tip.distance(hand.thumb_tip) < PINCH_DISTANCE;
        let impulse = self
            .last_x
            .map(|last| x - last)
            .filter(|delta| delta.abs() > GESTURE_DEAD_ZONE)
            .map(|delta| delta * GESTURE_IMPULSE_GAIN);
        self.last_x = Some(x);

        Some(GestureObservation { pinch, x, impulse })
    }
}

#[derive(Resource)]
pub struct GestureInput {
    tracker: Box<dyn HandTracker>,
    interpreter: GestureInterpreter,
    sample_timer: Timer,
    pub status: GestureStatus,
    available: bool,
}

impl GestureInput {
    pub fn new(tracker: impl HandTracker) -> Self {
        Self {
            tracker: Box::new(tracker),
            interpreter: GestureInterpreter::default(),
            sample_timer: Timer::from_seconds(GESTURE_SAMPLE_INTERVAL, TimerMode::Repeating),
            status: GestureStatus::Initializing,
            available: false,
        }
    }

    pub fn start(&mut self) -> Result<(), GestureError> {
        match self.tracker.start() {
            Ok(()) => {
                self.available = true;
                self.status = GestureStatus::TrackingActive;
                Ok(())
            }
            Err(err) => {
                self.available = false;
                self.status = GestureStatus::Unavailable;
                Err(err)
            }
        }
    }

    /// Take one observation from the tracker and update the status
    pub fn sample(&mut self) -> Option<GestureObservation> {
        if !self.available {
            return None;
        }
        let observation = self.interpreter.observe(self.tracker.landmarks());
        self.status = match observation {
            Some(obs) if obs.pinch => GestureStatus::Pinch,
            Some(_) => GestureStatus::Open,
            None => GestureStatus::NoHand,
        };
        observation
    }
}

/// Pinch forms the tree, an open hand disperses it; horizontal flicks spin it
pub fn apply_observation(observation: &GestureObservation, drive: &mut DriveState, rotation: &mut RotationIntegrator) {
    drive.set_formed(observation.pinch);
    if let Some(impulse) = observation.impulse {
        rotation.push_impulse(impulse);
    }
}

/// Startup system: bring the tracker up, degrade to keyboard-only on failure
pub fn start_hand_tracker(mut gesture: ResMut<GestureInput>) {
    match gesture.start() {
        Ok(()) => info!("Hand tracking started"),
        Err(err) => warn!("Gesture control disabled: {err}"),
    }
}

/// System: sample the tracker at its own rate, latest value wins
pub fn sample_gestures(
    time: Res<Time>,
    mut gesture: ResMut<GestureInput>,
    mut drive: ResMut<DriveState>,
    mut rotation: ResMut<RotationIntegrator>,
) {
    if !gesture.sample_timer.tick(time.delta()).just_finished() {
        return;
    }
    let previous = gesture.status;
    if let Some(observation) = gesture.sample() {
        apply_observation(&observation, &mut drive, &mut rotation);
    }
    if gesture.status != previous {
        debug!("Gesture status: {}", gesture.status.label());
    }
}

pub fn update_gesture_status_text(
    gesture: Res<GestureInput>,
    mut texts: Query<&mut Text, With<GestureStatusText>>,
) {
    // The resource is touched every frame by the sampler; only write real changes
    let label = gesture.status.label();
    for mut text in texts.iter_mut() {
        if text.0 != label {
            **text = label.to_string();
        }
    }
}

/// Latest landmarks shared between the feeder and the tracker
pub type LandmarkCell = Arc<Mutex<Option<HandLandmarks>>>;

/// Pointer-driven stand-in for a camera tracker: right mouse held is a hand
/// in view, Shift closes the pinch
pub struct PointerHandTracker {
    cell: LandmarkCell,
    started: bool,
}

impl PointerHandTracker {
    pub fn new(cell: LandmarkCell) -> Self {
        Self { cell, started: false }
    }
}

impl HandTracker for PointerHandTracker {
    fn start(&mut self) -> Result<(), GestureError> {
        // Make sure the cell is usable before declaring the tracker live
        drop(
            self.cell
                .lock()
                .map_err(|_| GestureError::BackendUnavailable("landmark cell poisoned".into()))?,
        );
        self.started = true;
        Ok(())
    }

    fn landmarks(&mut self) -> Option<HandLandmarks> {
        if !self.started {
            return None;
        }
        self.cell.lock().ok().and_then(|latest| *latest)
    }
}

/// Feeder handle for the pointer tracker
#[derive(Resource, Clone, Default)]
pub struct PointerFeed(pub LandmarkCell);

/// Synthesize landmarks as a mirrored camera would see the pointer
pub fn pointer_landmarks(cursor: Vec2, window_size: Vec2, pinch: bool) -> Option<HandLandmarks> {
    if window_size.x <= 0.0 || window_size.y <= 0.0 {
        return None;
    }
    let normalized = cursor / window_size;
    let index_tip = Vec2::new(1.0 - normalized.x, normalized.y);
    let spread = if pinch { PINCH_DISTANCE * 0.25 } else { PINCH_DISTANCE * 2.5 };
    Some(HandLandmarks {
        index_tip,
        thumb_tip: index_tip + Vec2::new(spread, 0.0),
    })
}

/// System: publish the pointer as the latest hand observation
pub fn feed_pointer_tracker(
    feed: Res<PointerFeed>,
    mouse: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let landmarks = windows.single().ok().and_then(|window| {
        if !mouse.pressed(MouseButton::Right) {
            return None;
        }
        let cursor = window.cursor_position()?;
        let pinch = keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight);
        pointer_landmarks(cursor, window.size(), pinch)
    });
    if let Ok(mut latest) = feed.0.lock() {
        *latest = landmarks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingTracker;

    impl HandTracker for FailingTracker {
        fn start(&mut self) -> Result<(), GestureError> {
            Err(GestureError::BackendUnavailable("no camera".into()))
        }

        fn landmarks(&mut self) -> Option<HandLandmarks> {
            Some(hand(0.5, 0.0))
        }
    }

    /// Replays a fixed script of observations
    struct ScriptedTracker {
        frames: Vec<Option<HandLandmarks>>,
    }

    impl HandTracker for ScriptedTracker {
        fn start(&mut self) -> Result<(), GestureError> {
            self.frames.reverse();
            Ok(())
        }

        fn landmarks(&mut self) -> Option<HandLandmarks> {
            self.frames.pop().flatten()
        }
    }

    fn hand(index_x: f32, thumb_offset: f32) -> HandLandmarks {
        HandLandmarks {
            index_tip: Vec2::new(index_x, 0.5),
            thumb_tip: Vec2::new(index_x + thumb_offset, 0.5),
        }
    }

    #[test]
    fn pinch_threshold() {
        let mut interpreter = GestureInterpreter::default();
        assert!(interpreter.observe(Some(hand(0.5, 0.05))).unwrap().pinch);
        assert!(!interpreter.observe(Some(hand(0.5, 0.2))).unwrap().pinch);
    }

    #[test]
    fn x_is_mirrored() {
        let mut interpreter = GestureInterpreter::default();
        let obs = interpreter.observe(Some(hand(0.2, 0.3))).unwrap();
        assert!((obs.x - 0.8).abs() < 1e-6);
    }

    #[test]
    fn impulse_needs_a_previous_sample_and_clears_dead_zone() {
        let mut interpreter = GestureInterpreter::default();
        assert_eq!(interpreter.observe(Some(hand(0.5, 0.3))).unwrap().impulse, None);
        // Tiny jitter is ignored
        assert_eq!(interpreter.observe(Some(hand(0.5005, 0.3))).unwrap().impulse, None);
        // Moving the index tip left in camera space moves right on screen
        let impulse = interpreter.observe(Some(hand(0.4005, 0.3))).unwrap().impulse.unwrap();
        assert!((impulse - 0.1 * GESTURE_IMPULSE_GAIN).abs() < 1e-4);
    }

    #[test]
    fn losing_the_hand_resets_delta_tracking() {
        let mut interpreter = GestureInterpreter::default();
        interpreter.observe(Some(hand(0.9, 0.3)));
        assert!(interpreter.observe(None).is_none());
        assert_eq!(interpreter.observe(Some(hand(0.1, 0.3))).unwrap().impulse, None);
    }

    #[test]
    fn failing_tracker_degrades_to_unavailable() {
        let mut gesture = GestureInput::new(FailingTracker);
        assert!(gesture.start().is_err());
        assert_eq!(gesture.status, GestureStatus::Unavailable);
        assert_eq!(gesture.sample(), None);
        assert_eq!(gesture.status.label(), "Gesture Unavailable");
    }

    #[test]
    fn observations_drive_formation_and_rotation() {
        let mut gesture = GestureInput::new(ScriptedTracker {
            frames: vec![Some(hand(0.6, 0.3)), Some(hand(0.5, 0.3)), Some(hand(0.5, 0.01)), None],
        });
        gesture.start().unwrap();
        assert_eq!(gesture.status, GestureStatus::TrackingActive);

        let mut drive = DriveState::default();
        let mut rotation = RotationIntegrator::default();

        let obs = gesture.sample().unwrap();
        apply_observation(&obs, &mut drive, &mut rotation);
        assert!(!drive.formed, "open hand disperses");
        assert_eq!(gesture.status, GestureStatus::Open);

        let obs = gesture.sample().unwrap();
        apply_observation(&obs, &mut drive, &mut rotation);
        let delta = rotation.step(1.0 / 60.0, drive.formed);
        assert!((delta - 0.1 * GESTURE_IMPULSE_GAIN * IMPULSE_SENSITIVITY).abs() < 1e-5);

        let obs = gesture.sample().unwrap();
        apply_observation(&obs, &mut drive, &mut rotation);
        assert!(drive.formed, "pinch forms");
        assert_eq!(gesture.status, GestureStatus::Pinch);

        assert!(gesture.sample().is_none());
        assert_eq!(gesture.status, GestureStatus::NoHand);
    }

    #[test]
    fn pointer_tracker_reads_latest_value() {
        let feed = PointerFeed::default();
        let mut tracker = PointerHandTracker::new(feed.0.clone());
        *feed.0.lock().unwrap() = Some(hand(0.3, 0.01));
        assert_eq!(tracker.landmarks(), None, "not started yet");
        tracker.start().unwrap();
        assert_eq!(tracker.landmarks(), Some(hand(0.3, 0.01)));
        *feed.0.lock().unwrap() = None;
        assert_eq!(tracker.landmarks(), None);
    }

    #[test]
    fn pointer_landmarks_mirror_and_pinch() {
        let size = Vec2::new(800.0, 600.0);
        let open = pointer_landmarks(Vec2::new(200.0, 300.0), size, false).unwrap();
        let mut interpreter = GestureInterpreter::default();
        let obs = interpreter.observe(Some(open)).unwrap();
        assert!((obs.x - 0.25).abs() < 1e-6, "screen x survives the mirror");
        assert!(!obs.pinch);

        let closed = pointer_landmarks(Vec2::new(200.0, 300.0), size, true).unwrap();
        assert!(interpreter.observe(Some(closed)).unwrap().pinch);
        assert!(pointer_landmarks(Vec2::ZERO, Vec2::ZERO, false).is_none());
    }

    #[test]
    fn status_text_written_only_on_change() {
        let mut app = App::new();
        app.insert_resource(GestureInput::new(FailingTracker))
            .add_systems(Update, update_gesture_status_text);
        let text = app.world_mut().spawn((Text::new(""), GestureStatusText)).id();

        app.update();
        assert_eq!(app.world().get::<Text>(text).map(|t| t.0.as_str()), Some("Initializing..."));

        // Same status again: the text component is left untouched
        app.world_mut().resource_mut::<GestureInput>().status = GestureStatus::Initializing;
        let tick = app.world().read_change_tick();
        app.update();
        let changed = app.world().entity(text).get_ref::<Text>().map(|t| t.last_changed());
        assert!(changed.is_some_and(|last| !last.is_newer_than(tick, app.world().read_change_tick())));

        app.world_mut().resource_mut::<GestureInput>().status = GestureStatus::Pinch;
        app.update();
        assert_eq!(app.world().get::<Text>(text).map(|t| t.0.as_str()), Some("PINCH: Converge"));
    }
}
