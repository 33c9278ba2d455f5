//! Error conversion for WASM boundary.

use wasm_bindgen::{JsCast, JsValue};

/// Convert any error with Display into a JsValue error.
pub fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Message text of a thrown JS value.
pub fn js_error_message(e: &JsValue) -> String {
    if let Some(s) = e.as_string() {
        s
    } else if let Some(err) = e.dyn_ref::<js_sys::Error>() {
        String::from(err.message())
    } else {
        format!("{e:?}")
    }
}
