//! WASM bindings for makapix-bridge.
//!
//! Binds the bridge to the browser: the window `message` event, the editor
//! iframe's `contentWindow`, `sessionStorage` for the export hand-off, and
//! host-supplied JS objects for tokens, backend calls and navigation.

#![cfg(target_arch = "wasm32")]

mod blob;
mod bridge;
mod collaborators;
mod error;
mod port;
mod storage;

use wasm_bindgen::prelude::*;

pub use bridge::{take_export_handoff, WasmEditorBridge};
pub use collaborators::{JsArtworkService, JsFrameDecoder, JsHost, JsTokenStore};

/// Route `tracing` output to the browser console and install the panic hook.
#[wasm_bindgen(js_name = "initLogging")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = tracing_wasm::try_set_as_global_default();
}
