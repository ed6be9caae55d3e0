//! JSON bodies exchanged with the HTTP guessing backend.
//!
//! | Endpoint | Request | Response |
//! |---|---|---|
//! | `GET /start-game` | - | [`QuestionBatch`] |
//! | `POST /predict` | [`AnswersBody`] | [`PredictResponse`] |
//! | `POST /continue-game` | [`AnswersBody`] | [`QuestionBatch`] |
//! | `POST /confirm-success` | [`ConfirmBody`] | [`ConfirmResponse`] |

use serde::{Deserialize, Serialize};

use crate::backend::{GatewayError, Prediction, PredictionArtifact, PredictionSource, Question};

pub const START_GAME_PATH: &str = "/start-game";
pub const PREDICT_PATH: &str = "/predict";
pub const CONTINUE_GAME_PATH: &str = "/continue-game";
pub const CONFIRM_SUCCESS_PATH: &str = "/confirm-success";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBatch {
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswersBody {
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PredictionSource>,
}

impl PredictResponse {
    #[must_use]
    pub fn from_prediction(prediction: &Prediction) -> Self {
        Self {
            prediction: prediction.label.clone(),
            url: prediction.artifact.url().map(str::to_string),
            html_code: prediction.artifact.html().map(str::to_string),
            source: Some(prediction.source),
        }
    }

    /// Convert into a [`Prediction`]. A page URL and inline HTML sent together
    /// are both kept: the URL for display, the HTML for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidResponse`] if the label is blank or no
    /// renderable artifact is present.
    pub fn into_prediction(self) -> Result<Prediction, GatewayError> {
        if self.prediction.trim().is_empty() {
            return Err(GatewayError::InvalidResponse(
                "prediction label is empty".to_string(),
            ));
        }
        let url = self.url.filter(|url| !url.is_empty());
        let html = self.html_code.filter(|html| !html.is_empty());
        let artifact = match (url, html) {
            (Some(url), Some(html)) => PredictionArtifact::Page { url, html },
            (Some(url), None) => PredictionArtifact::Url(url),
            (None, Some(html)) => PredictionArtifact::Html(html),
            (None, None) => {
                return Err(GatewayError::InvalidResponse(
                    "prediction has neither url nor html_code".to_string(),
                ));
            }
        };
        Ok(Prediction {
            label: self.prediction,
            artifact,
            source: self.source.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmBody {
    pub answers: Vec<String>,
    pub prediction: String,
    pub html_content: String,
}

impl ConfirmBody {
    /// Body persisting `prediction` with its markup, or `None` when the guess
    /// carries only a page URL (a cache hit the backend already stores).
    #[must_use]
    pub fn new(answers: &[String], prediction: &Prediction) -> Option<Self> {
        let html = prediction.artifact.html()?;
        Some(Self {
            answers: answers.to_vec(),
            prediction: prediction.label.clone(),
            html_content: html.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub status: String,
}

/// Join a backend base URL and an endpoint path.
#[must_use]
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

/// Decode a JSON body into `T`, mapping failures to [`GatewayError::Decode`].
///
/// # Errors
///
/// Returns an error if `body` is not valid JSON for `T`.
pub fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, GatewayError> {
    serde_json::from_str(body).map_err(|err| GatewayError::Decode(err.to_string()))
}
