//! Error type shared by every effect component.
//!
//! Failures only happen while wiring components to the page (missing canvas,
//! missing container, rejected JS calls). The shell logs them and skips the
//! affected component; exported functions surface them as `JsValue`.

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EffectsError {
    #[error("no global window")]
    NoWindow,
    #[error("no document on window")]
    NoDocument,
    #[error("element not found: {0}")]
    MissingElement(String),
    #[error("2d context unavailable on canvas")]
    NoContext,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("javascript error: {0}")]
    Js(String),
}

pub type Result<T> = std::result::Result<T, EffectsError>;

impl From<JsValue> for EffectsError {
    fn from(value: JsValue) -> Self {
        EffectsError::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

impl From<EffectsError> for JsValue {
    fn from(err: EffectsError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
