//! Tunable session configuration.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::answer::AnswerLabels;
use crate::constants;
use crate::resolver::SpatialAnswerResolver;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive and finite (got {value:.2})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("answer threshold {threshold:.2} must be below the lane half-width {half_width:.2}")]
    ThresholdOutsideLanes { threshold: f64, half_width: f64 },
    #[error("proximity radius {radius:.2} must be under half the question spacing {spacing:.2}")]
    RadiusOverlapsSpacing { radius: f64, spacing: f64 },
    #[error("request timeout must be at least 1 ms")]
    ZeroTimeout,
    #[error("answer label for {answer} must not be empty")]
    EmptyLabel { answer: &'static str },
    #[error("could not parse configuration: {0}")]
    Parse(String),
}

/// Track geometry, timing, and answer labels for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "GameConfig::default_answer_threshold")]
    pub answer_threshold: f64,
    #[serde(default = "GameConfig::default_lane_half_width")]
    pub lane_half_width: f64,
    #[serde(default = "GameConfig::default_proximity_radius")]
    pub proximity_radius: f64,
    #[serde(default = "GameConfig::default_question_spacing")]
    pub question_spacing: f64,
    #[serde(default = "GameConfig::default_first_question_distance")]
    pub first_question_distance: f64,
    #[serde(default = "GameConfig::default_sign_lead_distance")]
    pub sign_lead_distance: f64,
    #[serde(default = "GameConfig::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub labels: AnswerLabels,
}

impl GameConfig {
    const fn default_answer_threshold() -> f64 {
        constants::ANSWER_THRESHOLD
    }

    const fn default_lane_half_width() -> f64 {
        constants::LANE_HALF_WIDTH
    }

    const fn default_proximity_radius() -> f64 {
        constants::PROXIMITY_RADIUS
    }

    const fn default_question_spacing() -> f64 {
        constants::QUESTION_SPACING
    }

    const fn default_first_question_distance() -> f64 {
        constants::FIRST_QUESTION_DISTANCE
    }

    const fn default_sign_lead_distance() -> f64 {
        constants::SIGN_LEAD_DISTANCE
    }

    const fn default_request_timeout_ms() -> u64 {
        constants::REQUEST_TIMEOUT_MS
    }

    #[must_use]
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every invariant the session relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("answer_threshold", self.answer_threshold),
            ("lane_half_width", self.lane_half_width),
            ("proximity_radius", self.proximity_radius),
            ("question_spacing", self.question_spacing),
            ("first_question_distance", self.first_question_distance),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if !self.sign_lead_distance.is_finite() || self.sign_lead_distance < 0.0 {
            return Err(ConfigError::NotPositive {
                field: "sign_lead_distance",
                value: self.sign_lead_distance,
            });
        }
        if self.answer_threshold >= self.lane_half_width {
            return Err(ConfigError::ThresholdOutsideLanes {
                threshold: self.answer_threshold,
                half_width: self.lane_half_width,
            });
        }
        if self.proximity_radius * 2.0 >= self.question_spacing {
            return Err(ConfigError::RadiusOverlapsSpacing {
                radius: self.proximity_radius,
                spacing: self.question_spacing,
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let labels = [
            ("yes", &self.labels.yes),
            ("no", &self.labels.no),
            ("partial", &self.labels.partial),
        ];
        for (answer, label) in labels {
            if label.trim().is_empty() {
                return Err(ConfigError::EmptyLabel { answer });
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn resolver(&self) -> SpatialAnswerResolver {
        SpatialAnswerResolver::new(self.answer_threshold)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            answer_threshold: Self::default_answer_threshold(),
            lane_half_width: Self::default_lane_half_width(),
            proximity_radius: Self::default_proximity_radius(),
            question_spacing: Self::default_question_spacing(),
            first_question_distance: Self::default_first_question_distance(),
            sign_lead_distance: Self::default_sign_lead_distance(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            labels: AnswerLabels::default(),
        }
    }
}
