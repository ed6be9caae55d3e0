//! Boundary to the guessing backend.
//!
//! The session machine never awaits anything itself. Every call it needs is
//! handed to the host as a [`PendingRequest`]; the host runs it through
//! [`dispatch`] on whatever executor it owns and feeds the resulting
//! [`BackendReply`] back with the same [`Ticket`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque question identifier as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for QuestionId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// A single yes/no/partial question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
}

impl Question {
    #[must_use]
    pub fn new(id: impl Into<QuestionId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Where the backend found its guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    /// Previously confirmed guess for the same answers.
    Cache,
    #[default]
    Ai,
}

/// Renderable payload accompanying a guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionArtifact {
    /// Link to a page generated by the backend.
    Url(String),
    /// Inline HTML document.
    Html(String),
    /// Generated page together with the markup it was written from.
    Page { url: String, html: String },
}

impl PredictionArtifact {
    /// Address to display, if the backend published the page.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url(url) | Self::Page { url, .. } => Some(url),
            Self::Html(_) => None,
        }
    }

    /// Inline markup; the only content worth persisting with a confirmed guess.
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Html(html) | Self::Page { html, .. } => Some(html),
            Self::Url(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub artifact: PredictionArtifact,
    #[serde(default)]
    pub source: PredictionSource,
}

/// Failures raised by a [`BackendGateway`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("backend answered with HTTP {status}")]
    Status { status: u16 },
    #[error("could not decode backend response: {0}")]
    Decode(String),
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Supplier of question batches and guesses.
///
/// Futures are not required to be `Send`; browser fetch futures are not.
#[async_trait(?Send)]
pub trait BackendGateway {
    /// Fetch the opening batch of questions.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or answers garbage.
    async fn fetch_initial_questions(&self) -> Result<Vec<Question>, GatewayError>;

    /// Ask for a guess based on the answers so far.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable guess could be obtained.
    async fn fetch_prediction(&self, answers: &[String]) -> Result<Prediction, GatewayError>;

    /// Ask for follow-up questions after a rejected guess.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or answers garbage.
    async fn fetch_continuation(&self, answers: &[String]) -> Result<Vec<Question>, GatewayError>;

    /// Persist a confirmed guess.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend did not store the result.
    async fn report_success(
        &self,
        answers: &[String],
        prediction: &Prediction,
    ) -> Result<(), GatewayError>;
}

/// Identifies one issued backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticket(u64);

impl Ticket {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Backend work requested by the session machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    InitialQuestions,
    Prediction {
        answers: Vec<String>,
    },
    Continuation {
        answers: Vec<String>,
    },
    ReportSuccess {
        answers: Vec<String>,
        prediction: Prediction,
    },
}

impl BackendRequest {
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::InitialQuestions => RequestKind::InitialQuestions,
            Self::Prediction { .. } => RequestKind::Prediction,
            Self::Continuation { .. } => RequestKind::Continuation,
            Self::ReportSuccess { .. } => RequestKind::ReportSuccess,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    InitialQuestions,
    Prediction,
    Continuation,
    ReportSuccess,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InitialQuestions => "initial-questions",
            Self::Prediction => "prediction",
            Self::Continuation => "continuation",
            Self::ReportSuccess => "report-success",
        };
        f.write_str(name)
    }
}

/// A request the host must run and answer with [`BackendReply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub ticket: Ticket,
    pub request: BackendRequest,
}

/// Outcome of a dispatched [`BackendRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    Questions(Result<Vec<Question>, GatewayError>),
    Prediction(Result<Prediction, GatewayError>),
    Reported(Result<(), GatewayError>),
}

/// Run `request` against `gateway`, capturing failures in the reply.
pub async fn dispatch<G>(gateway: &G, request: &BackendRequest) -> BackendReply
where
    G: BackendGateway + ?Sized,
{
    match request {
        BackendRequest::InitialQuestions => {
            BackendReply::Questions(gateway.fetch_initial_questions().await)
        }
        BackendRequest::Prediction { answers } => {
            BackendReply::Prediction(gateway.fetch_prediction(answers).await)
        }
        BackendRequest::Continuation { answers } => {
            BackendReply::Questions(gateway.fetch_continuation(answers).await)
        }
        BackendRequest::ReportSuccess {
            answers,
            prediction,
        } => BackendReply::Reported(gateway.report_success(answers, prediction).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingGateway {
        calls: RefCell<Vec<String>>,
    }

    #[async_trait(?Send)]
    impl BackendGateway for RecordingGateway {
        async fn fetch_initial_questions(&self) -> Result<Vec<Question>, GatewayError> {
            self.calls.borrow_mut().push("initial".into());
            Ok(vec![Question::new(1, "Alive?")])
        }

        async fn fetch_prediction(&self, answers: &[String]) -> Result<Prediction, GatewayError> {
            self.calls
                .borrow_mut()
                .push(format!("predict:{}", answers.len()));
            Err(GatewayError::Status { status: 500 })
        }

        async fn fetch_continuation(
            &self,
            answers: &[String],
        ) -> Result<Vec<Question>, GatewayError> {
            self.calls
                .borrow_mut()
                .push(format!("continue:{}", answers.len()));
            Ok(Vec::new())
        }

        async fn report_success(
            &self,
            _answers: &[String],
            prediction: &Prediction,
        ) -> Result<(), GatewayError> {
            self.calls
                .borrow_mut()
                .push(format!("report:{}", prediction.label));
            Ok(())
        }
    }

    #[test]
    fn dispatch_routes_each_request_kind() {
        let gateway = RecordingGateway::default();
        let answers = vec!["Alive?: Yes".to_string()];
        let prediction = Prediction {
            label: "Cat".into(),
            artifact: PredictionArtifact::Url("http://x/cat.html".into()),
            source: PredictionSource::Ai,
        };

        let initial = block_on(dispatch(&gateway, &BackendRequest::InitialQuestions));
        assert_eq!(
            initial,
            BackendReply::Questions(Ok(vec![Question::new(1, "Alive?")]))
        );

        let predicted = block_on(dispatch(
            &gateway,
            &BackendRequest::Prediction {
                answers: answers.clone(),
            },
        ));
        assert_eq!(
            predicted,
            BackendReply::Prediction(Err(GatewayError::Status { status: 500 }))
        );

        let continued = block_on(dispatch(
            &gateway,
            &BackendRequest::Continuation {
                answers: answers.clone(),
            },
        ));
        assert_eq!(continued, BackendReply::Questions(Ok(Vec::new())));

        let reported = block_on(dispatch(
            &gateway,
            &BackendRequest::ReportSuccess {
                answers,
                prediction,
            },
        ));
        assert_eq!(reported, BackendReply::Reported(Ok(())));

        assert_eq!(
            gateway.calls.borrow().as_slice(),
            ["initial", "predict:1", "continue:1", "report:Cat"]
        );
    }

    #[test]
    fn question_ids_accept_numbers_and_strings() {
        let questions: Vec<Question> =
            serde_json::from_str(r#"[{"id":3,"text":"Alive?"},{"id":"q-9","text":"Red?"}]"#)
                .unwrap();
        assert_eq!(questions[0].id, QuestionId::Number(3));
        assert_eq!(questions[1].id, QuestionId::Text("q-9".into()));
        assert_eq!(questions[1].id.to_string(), "q-9");
    }

    #[test]
    fn tickets_advance_and_render() {
        let ticket = Ticket::new(41).next();
        assert_eq!(ticket.get(), 42);
        assert_eq!(ticket.to_string(), "#42");
        assert_eq!(
            BackendRequest::InitialQuestions.kind().to_string(),
            "initial-questions"
        );
    }
}
