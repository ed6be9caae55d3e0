#![forbid(unsafe_code)]
//! Browser adapter for MindDrift.
//!
//! The JS scene renders the road and moves the car; this crate owns the
//! session and talks to the guessing backend over `fetch`.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub mod app;
pub mod dom;
pub mod gateway;
pub mod hud;
pub mod logger;
pub mod presenter;

pub use app::MindDrift;
pub use gateway::FetchGateway;
pub use presenter::DomPresenter;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logger::init(log::LevelFilter::Info);
}
