//! `EditorBridge` JS class.

use std::cell::RefCell;
use std::sync::Arc;

use gloo_events::EventListener;
use js_sys::{Object, Reflect};
use makapix_bridge::{
    take_export, BridgeCollaborators, BridgeOptions, EditorBridge, FrameDecoder, MessageEvent,
    Origin,
};
use serde::Serialize;
use serde_json::Value;
use tracing::trace;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::HtmlIFrameElement;

use crate::blob::from_js_blob;
use crate::collaborators::{
    JsArtwork, JsArtworkService, JsDecoder, JsFrameDecoder, JsHost, JsHostController, JsTokenStore,
    JsTokens,
};
use crate::error::to_js_error;
use crate::port::IframePort;
use crate::storage::BrowserStorage;

fn parse_options(options: JsValue) -> Result<BridgeOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(BridgeOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(to_js_error)
    }
}

/// Split a window `message` event into JSON data and the optional `blob`.
fn to_message_event(event: &web_sys::MessageEvent) -> Result<MessageEvent, JsValue> {
    let raw = event.data();
    let blob = Reflect::get(&raw, &JsValue::from_str("blob"))
        .ok()
        .and_then(|b| b.dyn_into::<web_sys::Blob>().ok());

    let data: Value = if raw.is_object() {
        let copy = Object::assign(&Object::new(), raw.unchecked_ref());
        Reflect::delete_property(&copy, &JsValue::from_str("blob"))?;
        serde_wasm_bindgen::from_value(copy.into()).map_err(to_js_error)?
    } else {
        serde_wasm_bindgen::from_value(raw).unwrap_or(Value::Null)
    };

    let message = MessageEvent::new(event.origin(), data);
    Ok(match blob {
        Some(blob) => message.with_blob(from_js_blob(blob)),
        None => message,
    })
}

#[wasm_bindgen(js_name = "EditorBridge")]
pub struct WasmEditorBridge {
    bridge: EditorBridge,
    listener: RefCell<Option<EventListener>>,
}

#[wasm_bindgen(js_class = "EditorBridge")]
impl WasmEditorBridge {
    /// `options` is an optional `{ handoffKey, handoffTtlSecs, maxHandoffBytes,
    /// retryOnUnauthorized }` object.
    #[wasm_bindgen(constructor)]
    pub fn new(
        tokens: JsTokenStore,
        artwork: JsArtworkService,
        host: JsHost,
        frame: HtmlIFrameElement,
        decoder: Option<JsFrameDecoder>,
        options: JsValue,
    ) -> Result<WasmEditorBridge, JsValue> {
        console_error_panic_hook::set_once();

        let collaborators = BridgeCollaborators {
            tokens: Arc::new(JsTokens::new(tokens)),
            artwork: Arc::new(JsArtwork::new(artwork)),
            host: Arc::new(JsHostController::new(host)),
            port: Arc::new(IframePort::new(frame)),
            handoff_store: Arc::new(BrowserStorage::session()?),
            decoder: decoder.map(|d| Arc::new(JsDecoder::new(d)) as Arc<dyn FrameDecoder>),
        };
        Ok(Self {
            bridge: EditorBridge::new(collaborators, parse_options(options)?),
            listener: RefCell::new(None),
        })
    }

    /// Mount for a fresh canvas. Call before pointing the iframe at the editor.
    /// Returns the session id.
    pub fn mount(&self, editor_origin: &str) -> Result<String, JsValue> {
        let origin = Origin::parse(editor_origin).map_err(to_js_error)?;
        self.listen()?;
        Ok(self.bridge.mount(origin, None).to_string())
    }

    /// Mount for editing an existing post. Resolves to the session id once
    /// the artwork is staged; rejects if loading failed or the session was
    /// unmounted first.
    #[wasm_bindgen(js_name = "mountPost")]
    pub fn mount_post(&self, editor_origin: &str, post_sqid: String) -> Result<js_sys::Promise, JsValue> {
        let origin = Origin::parse(editor_origin).map_err(to_js_error)?;
        self.listen()?;
        let bridge = self.bridge.clone();
        Ok(future_to_promise(async move {
            let id = bridge
                .mount_post(origin, &post_sqid)
                .await
                .map_err(to_js_error)?;
            Ok(JsValue::from_str(&id.to_string()))
        }))
    }

    /// Remove the message listener and close the session.
    pub fn unmount(&self) {
        self.listener.borrow_mut().take();
        self.bridge.unmount();
    }

    pub fn state(&self) -> String {
        format!("{:?}", self.bridge.state())
    }

    #[wasm_bindgen(js_name = "sessionId")]
    pub fn session_id(&self) -> Option<String> {
        self.bridge.session_id().map(|id| id.to_string())
    }
}

impl WasmEditorBridge {
    /// Attach the window `message` listener once; it lives until `unmount`.
    fn listen(&self) -> Result<(), JsValue> {
        let mut slot = self.listener.borrow_mut();
        if slot.is_some() {
            return Ok(());
        }
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let bridge = self.bridge.clone();
        *slot = Some(EventListener::new(&window, "message", move |event| {
            let Some(event) = event.dyn_ref::<web_sys::MessageEvent>() else {
                return;
            };
            let message = match to_message_event(event) {
                Ok(message) => message,
                Err(_) => {
                    trace!(origin = %event.origin(), "dropping unreadable message event");
                    return;
                }
            };
            let bridge = bridge.clone();
            spawn_local(async move {
                bridge.on_message(message).await;
            });
        }));
        Ok(())
    }
}

/// For the upload page: remove and return the export hand-off record, or
/// `null` when there is none or it has gone stale.
#[wasm_bindgen(js_name = "takeExportHandoff")]
pub fn take_export_handoff(options: JsValue) -> Result<JsValue, JsValue> {
    let options = parse_options(options)?;
    let store = BrowserStorage::session()?;
    match take_export(&store, &options, chrono::Utc::now()) {
        Some(handoff) => handoff
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(to_js_error),
        None => Ok(JsValue::NULL),
    }
}
