//! Text and layout helpers for the HUD overlays and the JS scene.
//!
//! Everything here is pure so it can be tested without a browser.

use minddrift_game::{DecisionZone, Ending, SessionState, SoundCue};
use serde::Serialize;

pub const QUESTION_TEXT: &str = "question-text";
pub const PROGRESS_TEXT: &str = "progress-text";
pub const STATUS_TEXT: &str = "status-text";
pub const LOADING_SCREEN: &str = "loading-screen";
pub const LOADING_MESSAGE: &str = "loading-message";
pub const PREDICTION_MODAL: &str = "prediction-modal";
pub const PREDICTION_TITLE: &str = "prediction-title";
pub const PREDICTION_IFRAME: &str = "prediction-iframe";
pub const GAME_OVER_MODAL: &str = "game-over-modal";
pub const GAME_OVER_MESSAGE: &str = "game-over-message";

const READING_MIND: &str = "Reading your mind...";

/// Where a wall and its question sign go on the track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneMarker {
    pub distance: f64,
    pub sign_distance: f64,
    pub text: String,
    pub resolved: bool,
}

#[must_use]
pub fn zone_markers(zones: &[DecisionZone], sign_lead: f64) -> Vec<ZoneMarker> {
    zones
        .iter()
        .map(|zone| ZoneMarker {
            distance: zone.position,
            sign_distance: (zone.position - sign_lead).max(0.0),
            text: zone.question.text.clone(),
            resolved: zone.resolved,
        })
        .collect()
}

/// `"Question 2 / 5"` while a zone is pending, empty once all are answered.
#[must_use]
pub fn progress_text(resolved: usize, total: usize) -> String {
    if resolved < total {
        format!("Question {} / {total}", resolved + 1)
    } else {
        String::new()
    }
}

#[must_use]
pub fn question_text(current: Option<&str>) -> &str {
    current.unwrap_or(READING_MIND)
}

/// Message for the loading overlay, `None` when it should be hidden.
#[must_use]
pub const fn loading_text(state: SessionState) -> Option<&'static str> {
    match state {
        SessionState::Loading => Some("Loading questions..."),
        SessionState::Predicting => Some(READING_MIND),
        SessionState::Extending => Some("Fetching more questions..."),
        SessionState::Idle
        | SessionState::Playing
        | SessionState::ResultShown
        | SessionState::Ended => None,
    }
}

#[must_use]
pub fn prediction_title(label: &str) -> String {
    format!("Guess: {label}")
}

#[must_use]
pub fn game_over_message(ending: &Ending) -> String {
    match ending {
        Ending::Guessed { questions, .. } => format!("Guessed it in {questions} questions!"),
        Ending::OutOfQuestions { questions } => {
            format!("Out of questions after {questions} answers. You win this one!")
        }
        Ending::Failed { reason } => format!("Game over: {reason}"),
    }
}

/// Name handed to the JS audio callback.
#[must_use]
pub const fn cue_name(cue: SoundCue) -> &'static str {
    match cue {
        SoundCue::Click => "click",
        SoundCue::Answer => "answer",
        SoundCue::Thinking => "thinking",
        SoundCue::Win => "win",
    }
}
