//! Browser `fetch` implementation of [`BackendGateway`].
use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;

use minddrift_game::constants::DEFAULT_BACKEND_URL;
use minddrift_game::wire::{
    self, AnswersBody, CONFIRM_SUCCESS_PATH, CONTINUE_GAME_PATH, ConfirmBody, ConfirmResponse,
    PREDICT_PATH, PredictResponse, QuestionBatch, START_GAME_PATH,
};
use minddrift_game::{BackendGateway, GatewayError, Prediction, Question};

use crate::dom::{fetch_text, js_error_message};

pub struct FetchGateway {
    base_url: String,
}

impl FetchGateway {
    #[must_use]
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[allow(clippy::future_not_send)]
    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<String>,
    ) -> Result<T, GatewayError> {
        let url = wire::endpoint_url(&self.base_url, path);
        debug!("fetch {url}");
        let (status, text) = fetch_text(&url, body.as_deref())
            .await
            .map_err(|err| GatewayError::Transport(js_error_message(&err)))?;
        if !(200..300).contains(&status) {
            return Err(GatewayError::Status { status });
        }
        wire::decode(&text)
    }

    #[allow(clippy::future_not_send)]
    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let json =
            serde_json::to_string(body).map_err(|err| GatewayError::Decode(err.to_string()))?;
        self.call(path, Some(json)).await
    }
}

#[async_trait(?Send)]
impl BackendGateway for FetchGateway {
    async fn fetch_initial_questions(&self) -> Result<Vec<Question>, GatewayError> {
        let batch: QuestionBatch = self.call(START_GAME_PATH, None).await?;
        Ok(batch.questions)
    }

    async fn fetch_prediction(&self, answers: &[String]) -> Result<Prediction, GatewayError> {
        let body = AnswersBody {
            answers: answers.to_vec(),
        };
        let response: PredictResponse = self.post(PREDICT_PATH, &body).await?;
        response.into_prediction()
    }

    async fn fetch_continuation(&self, answers: &[String]) -> Result<Vec<Question>, GatewayError> {
        let body = AnswersBody {
            answers: answers.to_vec(),
        };
        let batch: QuestionBatch = self.post(CONTINUE_GAME_PATH, &body).await?;
        Ok(batch.questions)
    }

    async fn report_success(
        &self,
        answers: &[String],
        prediction: &Prediction,
    ) -> Result<(), GatewayError> {
        let Some(body) = ConfirmBody::new(answers, prediction) else {
            debug!("'{}' has no markup to persist", prediction.label);
            return Ok(());
        };
        let response: ConfirmResponse = self.post(CONFIRM_SUCCESS_PATH, &body).await?;
        debug!("confirm-success answered '{}'", response.status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_base_url_falls_back_to_default() {
        assert_eq!(FetchGateway::new(None).base_url(), DEFAULT_BACKEND_URL);
        assert_eq!(
            FetchGateway::new(Some("  ".into())).base_url(),
            DEFAULT_BACKEND_URL
        );
        assert_eq!(
            FetchGateway::new(Some("https://minddrift.example".into())).base_url(),
            "https://minddrift.example"
        );
    }
}
