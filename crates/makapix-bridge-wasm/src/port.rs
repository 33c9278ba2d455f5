use js_sys::{Array, ArrayBuffer, Reflect, Uint8Array};
use makapix_bridge::{EditorPort, Origin, OutboundMessage, PortError, Transfer};
use serde::Serialize;
use wasm_bindgen::JsValue;
use web_sys::HtmlIFrameElement;

use crate::error::js_error_message;

/// Posts into the editor iframe's `contentWindow`.
///
/// Payload buffers are copied once into fresh `ArrayBuffer`s which are then
/// listed as transferables, so the host keeps no reference after the post.
pub struct IframePort {
    frame: HtmlIFrameElement,
}

// SAFETY: WASM is single-threaded.
unsafe impl Send for IframePort {}
unsafe impl Sync for IframePort {}

impl IframePort {
    pub fn new(frame: HtmlIFrameElement) -> Self {
        Self { frame }
    }
}

fn post_err(e: JsValue) -> PortError {
    PortError::PostFailed(js_error_message(&e))
}

fn to_array_buffer(bytes: &[u8]) -> ArrayBuffer {
    Uint8Array::from(bytes).buffer()
}

impl EditorPort for IframePort {
    fn post(&self, message: OutboundMessage, target_origin: &Origin) -> Result<(), PortError> {
        let window = self
            .frame
            .content_window()
            .ok_or(PortError::WindowUnavailable)?;

        let (body, transfer) = message
            .into_parts()
            .map_err(|e| PortError::PostFailed(e.to_string()))?;
        let js_body = body
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| PortError::PostFailed(e.to_string()))?;

        let transferables = Array::new();
        match transfer {
            Transfer::None => {}
            Transfer::Single { field, buffer } => {
                let buffer = to_array_buffer(&buffer);
                Reflect::set(&js_body, &JsValue::from_str(field), &buffer).map_err(post_err)?;
                transferables.push(&buffer);
            }
            Transfer::List { field, buffers } => {
                let list = Array::new();
                for bytes in &buffers {
                    let buffer = to_array_buffer(bytes);
                    list.push(&buffer);
                    transferables.push(&buffer);
                }
                Reflect::set(&js_body, &JsValue::from_str(field), &list).map_err(post_err)?;
            }
        }

        window
            .post_message_with_transfer(&js_body, target_origin.as_str(), &transferables)
            .map_err(post_err)
    }
}
