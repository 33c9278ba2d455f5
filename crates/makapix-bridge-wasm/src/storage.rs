use makapix_bridge::{BridgeError, KeyValueStore, Result};
use wasm_bindgen::JsValue;

use crate::error::js_error_message;

/// `KeyValueStore` over a browser `Storage` object.
pub struct BrowserStorage {
    inner: web_sys::Storage,
}

// SAFETY: WASM is single-threaded.
unsafe impl Send for BrowserStorage {}
unsafe impl Sync for BrowserStorage {}

impl BrowserStorage {
    /// The window's `sessionStorage`.
    pub fn session() -> std::result::Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let inner = window
            .session_storage()?
            .ok_or_else(|| JsValue::from_str("sessionStorage is unavailable"))?;
        Ok(Self { inner })
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .set_item(key, value)
            .map_err(|e| BridgeError::Storage(js_error_message(&e)))
    }

    fn remove(&self, key: &str) {
        let _ = self.inner.remove_item(key);
    }
}
