//! [`BackendGateway`] over a live HTTP backend.
use async_trait::async_trait;
use log::debug;
use minddrift_game::wire::{
    self, AnswersBody, CONFIRM_SUCCESS_PATH, CONTINUE_GAME_PATH, ConfirmBody, ConfirmResponse,
    PREDICT_PATH, PredictResponse, QuestionBatch, START_GAME_PATH,
};
use minddrift_game::{BackendGateway, GatewayError, Prediction, Question};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read<T: DeserializeOwned>(
        response: reqwest::Result<reqwest::Response>,
    ) -> Result<T, GatewayError> {
        let response = response.map_err(|err| GatewayError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        wire::decode(&body)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let url = wire::endpoint_url(&self.base_url, path);
        debug!("GET {url}");
        Self::read(self.client.get(&url).send().await).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let url = wire::endpoint_url(&self.base_url, path);
        debug!("POST {url}");
        Self::read(self.client.post(&url).json(body).send().await).await
    }
}

#[async_trait(?Send)]
impl BackendGateway for HttpGateway {
    async fn fetch_initial_questions(&self) -> Result<Vec<Question>, GatewayError> {
        let batch: QuestionBatch = self.get(START_GAME_PATH).await?;
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

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let gateway = HttpGateway::new("http://127.0.0.1:9");
        let result = gateway.fetch_initial_questions().await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }
}
