//! DOM-backed [`PresentationPort`].
//!
//! The JS scene owns the car and pushes its position in through
//! [`DomPresenter::set_car`] every frame. HUD writes that hit a missing
//! element are logged and skipped so a trimmed page still plays.

use log::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, HtmlIFrameElement, Url};

use minddrift_game::{
    CarPosition, DecisionZone, Prediction, PredictionArtifact, PresentationPort, SessionState,
    SoundCue,
};

use crate::dom::{self, DomError};
use crate::hud;

#[derive(Debug, Default)]
pub struct DomPresenter {
    car: CarPosition,
    cues: Vec<SoundCue>,
    blob_url: Option<String>,
    game_over_shown: bool,
}

impl DomPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn set_car(&mut self, car: CarPosition) {
        self.car = car;
    }

    /// Cues queued since the last call, oldest first.
    pub fn take_cues(&mut self) -> Vec<SoundCue> {
        std::mem::take(&mut self.cues)
    }

    pub fn close_prediction(&self) {
        apply("hide prediction", dom::set_visible(hud::PREDICTION_MODAL, false));
    }

    pub fn show_game_over(&mut self, message: &str) {
        if self.game_over_shown {
            return;
        }
        self.game_over_shown = true;
        apply("game over text", dom::set_text(hud::GAME_OVER_MESSAGE, message));
        apply("show game over", dom::set_visible(hud::GAME_OVER_MODAL, true));
    }

    fn show_artifact(&mut self, artifact: &PredictionArtifact) -> Result<(), DomError> {
        let frame: HtmlIFrameElement = dom::element(hud::PREDICTION_IFRAME)?
            .dyn_into()
            .map_err(|_| DomError::MissingElement(hud::PREDICTION_IFRAME))?;
        self.release_blob();
        match artifact {
            PredictionArtifact::Url(url) | PredictionArtifact::Page { url, .. } => {
                frame.set_src(url);
            }
            PredictionArtifact::Html(html) => {
                let parts = js_sys::Array::of1(&JsValue::from_str(html));
                let options = BlobPropertyBag::new();
                options.set_type("text/html");
                let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
                let url = Url::create_object_url_with_blob(&blob)?;
                frame.set_src(&url);
                self.blob_url = Some(url);
            }
        }
        Ok(())
    }

    fn release_blob(&mut self) {
        if let Some(url) = self.blob_url.take()
            && let Err(err) = Url::revoke_object_url(&url)
        {
            debug!("could not revoke {url}: {}", dom::js_error_message(&err));
        }
    }
}

fn apply(what: &str, result: Result<(), DomError>) {
    if let Err(err) = result {
        warn!("{what}: {err}");
    }
}

impl PresentationPort for DomPresenter {
    fn car_position(&self) -> CarPosition {
        self.car
    }

    fn on_progress(&mut self, resolved: usize, total: usize, current_question: Option<&str>) {
        apply(
            "question text",
            dom::set_text(hud::QUESTION_TEXT, hud::question_text(current_question)),
        );
        apply(
            "progress text",
            dom::set_text(hud::PROGRESS_TEXT, &hud::progress_text(resolved, total)),
        );
    }

    fn on_state_changed(&mut self, state: SessionState) {
        let loading = hud::loading_text(state);
        if let Some(message) = loading {
            apply("loading text", dom::set_text(hud::LOADING_MESSAGE, message));
        }
        apply("loading screen", dom::set_visible(hud::LOADING_SCREEN, loading.is_some()));
        if state != SessionState::ResultShown {
            self.close_prediction();
        }
        if state == SessionState::Loading {
            apply("clear status", dom::set_text(hud::STATUS_TEXT, ""));
        }
        if state == SessionState::Idle {
            self.game_over_shown = false;
            self.release_blob();
            apply("hide game over", dom::set_visible(hud::GAME_OVER_MODAL, false));
        }
    }

    fn on_zones_added(&mut self, zones: &[DecisionZone]) {
        debug!("{} zones ready for the scene", zones.len());
    }

    fn on_prediction(&mut self, prediction: &Prediction) {
        apply(
            "prediction title",
            dom::set_text(hud::PREDICTION_TITLE, &hud::prediction_title(&prediction.label)),
        );
        let shown = self.show_artifact(&prediction.artifact);
        apply("prediction artifact", shown);
        apply("show prediction", dom::set_visible(hud::PREDICTION_MODAL, true));
    }

    fn on_message(&mut self, message: &str) {
        apply("status text", dom::set_text(hud::STATUS_TEXT, message));
    }

    fn on_cue(&mut self, cue: SoundCue) {
        self.cues.push(cue);
    }
}
