use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, HtmlElement, Request, RequestInit, RequestMode, Response, Window};

/// CSS class that hides an overlay.
pub const HIDDEN_CLASS: &str = "hidden";

#[derive(Debug, Error)]
pub enum DomError {
    #[error("element #{0} not found")]
    MissingElement(&'static str),
    #[error("{0}")]
    Js(String),
}

impl From<JsValue> for DomError {
    fn from(value: JsValue) -> Self {
        Self::Js(js_error_message(&value))
    }
}

/// Retrieve the global `window` object.
///
/// # Panics
/// Panics if executed outside of a browser context where `window` is unavailable.
#[must_use]
pub fn window() -> Window {
    web_sys::window().expect("`window` should be available in web context")
}

/// Retrieve the document object for DOM interactions.
///
/// # Panics
/// Panics when the document cannot be accessed from the current browser window.
#[must_use]
pub fn document() -> Document {
    window()
        .document()
        .expect("`document` should exist in browser context")
}

/// Convert a JavaScript value into a readable string for error reporting.
#[must_use]
pub fn js_error_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|err| err.message().into())
        })
        .unwrap_or_else(|| format!("{value:?}"))
}

/// Look up an HTML element by id.
///
/// # Errors
/// Returns [`DomError::MissingElement`] if no matching `HtmlElement` exists.
pub fn element(id: &'static str) -> Result<HtmlElement, DomError> {
    document()
        .get_element_by_id(id)
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        .ok_or(DomError::MissingElement(id))
}

/// Replace the text content of `#id`.
///
/// # Errors
/// Returns an error if the element does not exist.
pub fn set_text(id: &'static str, text: &str) -> Result<(), DomError> {
    element(id)?.set_inner_text(text);
    Ok(())
}

/// Show or hide `#id` by toggling [`HIDDEN_CLASS`].
///
/// # Errors
/// Returns an error if the element does not exist or its class list rejects the change.
pub fn set_visible(id: &'static str, visible: bool) -> Result<(), DomError> {
    element(id)?
        .class_list()
        .toggle_with_force(HIDDEN_CLASS, !visible)?;
    Ok(())
}

/// Perform a fetch and return the HTTP status with the body text.
///
/// `body` switches the request to a JSON `POST`.
///
/// # Errors
/// Returns an error if the request cannot be built, the network call fails,
/// or the body cannot be read.
#[allow(clippy::future_not_send)] // Wasm futures rely on `JsFuture`, which is not `Send`.
pub async fn fetch_text(url: &str, body: Option<&str>) -> Result<(u16, String), JsValue> {
    let init = RequestInit::new();
    init.set_mode(RequestMode::Cors);
    match body {
        Some(body) => {
            init.set_method("POST");
            init.set_body(&JsValue::from_str(body));
        }
        None => init.set_method("GET"),
    }
    let request = Request::new_with_str_and_init(url, &init)?;
    if body.is_some() {
        request.headers().set("Content-Type", "application/json")?;
    }

    let resp_value = JsFuture::from(window().fetch_with_request(&request)).await?;
    let response: Response = resp_value.dyn_into()?;
    let text = JsFuture::from(response.text()?).await?;
    Ok((response.status(), text.as_string().unwrap_or_default()))
}
