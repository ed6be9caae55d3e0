//! Centralized tuning constants for the MindDrift session core.
//!
//! Track geometry and timing defaults live here so that `GameConfig`
//! defaults and the tests agree on a single set of numbers.

// Track geometry -----------------------------------------------------------
/// Lateral offset past which a gate crossing counts as Yes (right) or No (left).
pub const ANSWER_THRESHOLD: f64 = 3.0;
/// Distance from the road centre to the centre of an outer lane.
pub const LANE_HALF_WIDTH: f64 = 7.5;
/// Window around a zone inside which the car counts as having reached it.
pub const PROXIMITY_RADIUS: f64 = 2.0;
/// Gap between two consecutive decision zones.
pub const QUESTION_SPACING: f64 = 180.0;
/// Distance from the start line to the first decision zone.
pub const FIRST_QUESTION_DISTANCE: f64 = 150.0;
/// How far ahead of its zone the question sign is placed.
pub const SIGN_LEAD_DISTANCE: f64 = 20.0;

// Backend ------------------------------------------------------------------
pub const REQUEST_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
/// Separator used to key a verified prediction by its answers.
pub const ANSWER_KEY_SEPARATOR: &str = "|";

// Labels -------------------------------------------------------------------
pub const LABEL_YES: &str = "Yes";
pub const LABEL_NO: &str = "No";
pub const LABEL_PARTIAL: &str = "Partial";

// User-facing messages -----------------------------------------------------
pub(crate) const MSG_EMPTY_BATCH: &str = "No questions were received from the server.";
pub(crate) const MSG_LOAD_FAILED: &str = "Could not reach the question server.";
pub(crate) const MSG_PREDICTION_FAILED: &str = "The guess could not be made.";
pub(crate) const MSG_NO_MORE_QUESTIONS: &str = "No more questions could be fetched.";
pub(crate) const MSG_TIMED_OUT: &str = "The server took too long to answer.";
