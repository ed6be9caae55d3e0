//! Boundary to the render loop, HUD, and audio layer.
use serde::{Deserialize, Serialize};

use crate::backend::Prediction;
use crate::session::SessionState;
use crate::zones::DecisionZone;

/// Snapshot of the car's position, owned by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CarPosition {
    /// Distance travelled along the track.
    pub distance: f64,
    /// Offset from the road centre, positive to the right.
    pub lateral: f64,
}

impl CarPosition {
    #[must_use]
    pub const fn new(distance: f64, lateral: f64) -> Self {
        Self { distance, lateral }
    }
}

/// Audio cue requested by the session. Playback belongs to the presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundCue {
    Click,
    Answer,
    Thinking,
    Win,
}

/// Render loop and HUD as seen from the session machine.
///
/// The machine only reads the car position and emits semantic events; it
/// never holds rendering objects.
pub trait PresentationPort {
    /// Polled once per tick.
    fn car_position(&self) -> CarPosition;

    /// `current_question` is `None` once every zone is resolved.
    fn on_progress(&mut self, resolved: usize, total: usize, current_question: Option<&str>);

    fn on_state_changed(&mut self, state: SessionState);

    /// New zones were placed; the presenter builds walls and signs for them.
    fn on_zones_added(&mut self, _zones: &[DecisionZone]) {}

    fn on_prediction(&mut self, _prediction: &Prediction) {}

    /// User-visible error or status text.
    fn on_message(&mut self, _message: &str) {}

    fn on_cue(&mut self, _cue: SoundCue) {}
}
