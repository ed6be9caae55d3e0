//! The `MindDrift` handle exported to the JS road scene.
//!
//! JS drives the render loop and calls [`MindDrift::frame`] once per
//! animation frame with the car's position. Backend calls run on the
//! browser microtask queue through `spawn_local` and are delivered back to
//! the shared machine when they settle.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use js_sys::Function;
use log::{info, warn};
use wasm_bindgen::prelude::*;

use minddrift_game::{
    CarPosition, GameConfig, GameSessionMachine, PendingRequest, SessionState, TickOutcome,
    dispatch,
};

use crate::gateway::FetchGateway;
use crate::hud;
use crate::presenter::DomPresenter;

type Machine = GameSessionMachine<DomPresenter>;

#[wasm_bindgen]
pub struct MindDrift {
    machine: Rc<RefCell<Machine>>,
    gateway: Rc<FetchGateway>,
    on_cue: Option<Function>,
}

#[wasm_bindgen]
impl MindDrift {
    /// Create a session bound to the backend at `base_url`.
    ///
    /// `on_cue` receives `"click"`, `"answer"`, `"thinking"` or `"win"`.
    #[wasm_bindgen(constructor)]
    pub fn new(base_url: Option<String>, on_cue: Option<Function>) -> Result<Self, JsValue> {
        Self::with_config(base_url, on_cue, None)
    }

    /// Like [`MindDrift::new`], with a JSON `GameConfig` override.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(
        base_url: Option<String>,
        on_cue: Option<Function>,
        config_json: Option<String>,
    ) -> Result<Self, JsValue> {
        let config = match config_json {
            Some(json) => GameConfig::from_json(&json),
            None => Ok(GameConfig::default_config()),
        }
        .map_err(to_js)?;
        let machine = GameSessionMachine::new(config, DomPresenter::new()).map_err(to_js)?;
        let gateway = FetchGateway::new(base_url);
        info!("MindDrift ready against {}", gateway.base_url());
        Ok(Self {
            machine: Rc::new(RefCell::new(machine)),
            gateway: Rc::new(gateway),
            on_cue,
        })
    }

    /// # Errors
    /// Throws unless the session is idle.
    pub fn start(&self) -> Result<(), JsValue> {
        let pending = self.machine.borrow_mut().start().map_err(to_js)?;
        self.settle();
        self.send(pending);
        Ok(())
    }

    /// Feed one animation frame. Returns the session state name.
    pub fn frame(&self, distance: f64, lateral: f64, elapsed_ms: f64) -> String {
        let (outcome, state) = {
            let mut machine = self.machine.borrow_mut();
            machine
                .port_mut()
                .set_car(CarPosition::new(distance, lateral));
            if machine.advance_clock(frame_duration(elapsed_ms)) {
                warn!("backend request timed out");
            }
            let outcome = machine.tick();
            (outcome, machine.state())
        };
        self.settle();
        match outcome {
            Ok(TickOutcome::Finished { request, .. }) => self.send(request),
            Ok(_) => {}
            Err(err) => warn!("tick failed: {err}"),
        }
        state.to_string()
    }

    /// # Errors
    /// Throws unless a guess is on screen.
    #[wasm_bindgen(js_name = confirmCorrect)]
    pub fn confirm_correct(&self) -> Result<(), JsValue> {
        let report = self.machine.borrow_mut().confirm_correct().map_err(to_js)?;
        self.settle();
        self.send(report);
        Ok(())
    }

    /// # Errors
    /// Throws unless a guess is on screen.
    #[wasm_bindgen(js_name = confirmIncorrect)]
    pub fn confirm_incorrect(&self) -> Result<(), JsValue> {
        let pending = self
            .machine
            .borrow_mut()
            .confirm_incorrect()
            .map_err(to_js)?;
        self.settle();
        self.send(pending);
        Ok(())
    }

    /// Hide the guess overlay without answering it.
    #[wasm_bindgen(js_name = closeResult)]
    pub fn close_result(&self) {
        self.machine.borrow().port().close_prediction();
    }

    /// Start over after a session ended.
    ///
    /// # Errors
    /// Throws while a session is still running.
    pub fn restart(&self) -> Result<(), JsValue> {
        self.machine.borrow_mut().reset().map_err(to_js)?;
        self.start()
    }

    pub fn state(&self) -> String {
        self.machine.borrow().state().to_string()
    }

    pub fn answers(&self) -> Vec<String> {
        self.machine.borrow().answers().to_vec()
    }

    /// `[{distance, sign_distance, text, resolved}]` for every zone.
    ///
    /// # Errors
    /// Throws if the layout cannot be converted to a JS value.
    #[wasm_bindgen(js_name = zoneLayout)]
    pub fn zone_layout(&self) -> Result<JsValue, JsValue> {
        let machine = self.machine.borrow();
        let markers = hud::zone_markers(machine.zones().zones(), machine.config().sign_lead_distance);
        serde_wasm_bindgen::to_value(&markers).map_err(|err| JsValue::from_str(&err.to_string()))
    }
}

impl MindDrift {
    /// Run `pending` in the background and hand the reply to the machine.
    fn send(&self, pending: PendingRequest) {
        let machine = Rc::clone(&self.machine);
        let gateway = Rc::clone(&self.gateway);
        let on_cue = self.on_cue.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let reply = dispatch(gateway.as_ref(), &pending.request).await;
            let delivered = machine.borrow_mut().deliver(pending.ticket, reply);
            if let Err(err) = delivered {
                warn!("reply for {} rejected: {err}", pending.ticket);
            }
            settle_machine(&machine, on_cue.as_ref());
        });
    }

    fn settle(&self) {
        settle_machine(&self.machine, self.on_cue.as_ref());
    }
}

/// Show the game-over overlay if the session just ended, then play queued
/// cues with the machine released so the callback may call back in.
fn settle_machine(machine: &RefCell<Machine>, on_cue: Option<&Function>) {
    let cues = {
        let mut machine = machine.borrow_mut();
        if machine.state() == SessionState::Ended
            && let Some(message) = machine.ending().map(hud::game_over_message)
        {
            machine.port_mut().show_game_over(&message);
        }
        machine.port_mut().take_cues()
    };
    let Some(callback) = on_cue else {
        return;
    };
    for cue in cues {
        if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(hud::cue_name(cue))) {
            warn!("sound cue callback failed: {}", crate::dom::js_error_message(&err));
        }
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Convert a JS frame delta to a duration, treating garbage as no time.
fn frame_duration(elapsed_ms: f64) -> Duration {
    if elapsed_ms.is_finite() && elapsed_ms > 0.0 {
        Duration::from_secs_f64(elapsed_ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_duration_ignores_bad_deltas() {
        assert_eq!(frame_duration(250.0), Duration::from_millis(250));
        assert_eq!(frame_duration(-5.0), Duration::ZERO);
        assert_eq!(frame_duration(f64::NAN), Duration::ZERO);
        assert_eq!(frame_duration(f64::INFINITY), Duration::ZERO);
    }
}
