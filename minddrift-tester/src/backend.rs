//! In-process guessing backend with a verified-guess cache and fault
//! injection.
use async_trait::async_trait;
use log::{debug, info};
use minddrift_game::constants::DEFAULT_BACKEND_URL;
use minddrift_game::{
    BackendGateway, GatewayError, Prediction, PredictionArtifact, PredictionSource, Question,
    answers_key,
};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Questions in every follow-up batch.
pub const CONTINUATION_BATCH: usize = 5;

const OPENING_QUESTIONS: [&str; 15] = [
    "Is it alive?",
    "Is it bigger than a microwave?",
    "Can you hold it in one hand?",
    "Is it found indoors?",
    "Is it made by people?",
    "Does it use electricity?",
    "Can you eat it?",
    "Is it an animal?",
    "Does it have wheels?",
    "Is it soft?",
    "Is it mostly one colour?",
    "Would you find it in an office?",
    "Is it older than a hundred years?",
    "Can it make a sound?",
    "Is it used for fun?",
];

const FOLLOW_UP_QUESTIONS: [&str; 10] = [
    "Does it have a screen?",
    "Is it heavier than a person?",
    "Is it found in a kitchen?",
    "Does it have legs?",
    "Is it worn by people?",
    "Does it need batteries?",
    "Is it made of metal?",
    "Is it a tool?",
    "Does it grow?",
    "Is it found outdoors?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    StartGame,
    Predict,
    ContinueGame,
    ConfirmSuccess,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = match self {
            Self::StartGame => "start-game",
            Self::Predict => "predict",
            Self::ContinueGame => "continue-game",
            Self::ConfirmSuccess => "confirm-success",
        };
        f.write_str(path)
    }
}

/// Injected misbehaviour for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fault {
    /// Answer with a server error.
    Fail,
    /// Answer successfully with nothing usable.
    Empty,
    /// Never answer.
    Hang,
}

#[derive(Debug, Clone)]
struct VerifiedGuess {
    label: String,
    artifact: PredictionArtifact,
}

pub struct MemoryBackend {
    opening: Vec<Question>,
    guesses: RefCell<VecDeque<String>>,
    fallback_guess: String,
    faults: HashMap<Endpoint, Fault>,
    cache: RefCell<HashMap<String, VerifiedGuess>>,
    calls: RefCell<Vec<Endpoint>>,
    next_id: Cell<i64>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        let opening: Vec<Question> = OPENING_QUESTIONS
            .iter()
            .zip(1_i64..)
            .map(|(text, id)| Question::new(id, *text))
            .collect();
        let next_id = i64::try_from(opening.len()).unwrap_or(0) + 1;
        Self {
            opening,
            guesses: RefCell::new(VecDeque::new()),
            fallback_guess: "Bicycle".to_string(),
            faults: HashMap::new(),
            cache: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
            next_id: Cell::new(next_id),
        }
    }

    /// Use the first `count` opening questions.
    #[must_use]
    pub fn with_opening_count(mut self, count: usize) -> Self {
        self.opening.truncate(count);
        self
    }

    /// Guesses handed out in order before falling back to the default.
    #[must_use]
    pub fn with_guesses(self, guesses: &[&str]) -> Self {
        self.guesses
            .borrow_mut()
            .extend(guesses.iter().map(|g| (*g).to_string()));
        self
    }

    #[must_use]
    pub fn with_fault(mut self, endpoint: Endpoint, fault: Fault) -> Self {
        self.faults.insert(endpoint, fault);
        self
    }

    #[must_use]
    pub fn cached_guesses(&self) -> usize {
        self.cache.borrow().len()
    }

    #[must_use]
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.calls.borrow().iter().filter(|c| **c == endpoint).count()
    }

    /// Record the call and apply any injected fault. `Ok(true)` means the
    /// endpoint should answer with an empty payload.
    async fn enter(&self, endpoint: Endpoint) -> Result<bool, GatewayError> {
        self.calls.borrow_mut().push(endpoint);
        match self.faults.get(&endpoint) {
            None => Ok(false),
            Some(Fault::Empty) => Ok(true),
            Some(Fault::Fail) => Err(GatewayError::Status { status: 500 }),
            Some(Fault::Hang) => {
                debug!("{endpoint} hangs");
                std::future::pending().await
            }
        }
    }

    fn follow_ups(&self, answered: usize) -> Vec<Question> {
        (0..CONTINUATION_BATCH)
            .map(|offset| {
                let id = self.next_id.get();
                self.next_id.set(id + 1);
                let text = FOLLOW_UP_QUESTIONS[(answered + offset) % FOLLOW_UP_QUESTIONS.len()];
                Question::new(id, text)
            })
            .collect()
    }

    fn page_url(label: &str) -> String {
        format!("{DEFAULT_BACKEND_URL}/generated_pages/{label}.html")
    }
}

#[async_trait(?Send)]
impl BackendGateway for MemoryBackend {
    async fn fetch_initial_questions(&self) -> Result<Vec<Question>, GatewayError> {
        if self.enter(Endpoint::StartGame).await? {
            return Ok(Vec::new());
        }
        Ok(self.opening.clone())
    }

    async fn fetch_prediction(&self, answers: &[String]) -> Result<Prediction, GatewayError> {
        if self.enter(Endpoint::Predict).await? {
            return Err(GatewayError::InvalidResponse(
                "prediction label is empty".to_string(),
            ));
        }
        let key = answers_key(answers);
        if let Some(hit) = self.cache.borrow().get(&key) {
            info!("verified guess '{}' served from cache", hit.label);
            // Inline pages are published under generated_pages/ on a hit.
            let artifact = match &hit.artifact {
                PredictionArtifact::Url(url) => PredictionArtifact::Url(url.clone()),
                PredictionArtifact::Html(_) | PredictionArtifact::Page { .. } => {
                    PredictionArtifact::Url(Self::page_url(&hit.label))
                }
            };
            return Ok(Prediction {
                artifact,
                label: hit.label.clone(),
                source: PredictionSource::Cache,
            });
        }
        let label = self
            .guesses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| self.fallback_guess.clone());
        Ok(Prediction {
            artifact: PredictionArtifact::Html(format!(
                "<html><body><h1>{label}</h1></body></html>"
            )),
            label,
            source: PredictionSource::Ai,
        })
    }

    async fn fetch_continuation(&self, answers: &[String]) -> Result<Vec<Question>, GatewayError> {
        if self.enter(Endpoint::ContinueGame).await? {
            return Ok(Vec::new());
        }
        Ok(self.follow_ups(answers.len()))
    }

    async fn report_success(
        &self,
        answers: &[String],
        prediction: &Prediction,
    ) -> Result<(), GatewayError> {
        if self.enter(Endpoint::ConfirmSuccess).await? {
            return Ok(());
        }
        debug!(
            "storing verified guess '{}' ({} bytes)",
            prediction.label,
            prediction.artifact.html().map_or(0, str::len)
        );
        self.cache.borrow_mut().insert(
            answers_key(answers),
            VerifiedGuess {
                label: prediction.label.clone(),
                artifact: prediction.artifact.clone(),
            },
        );
        Ok(())
    }
}
