use std::sync::Arc;

use async_trait::async_trait;
use makapix_bridge::{Blob, BlobSource, BridgeError, Result};
use wasm_bindgen_futures::JsFuture;

use crate::error::js_error_message;

/// Reads a JS `Blob` through `Blob.arrayBuffer()`.
struct JsBlobSource {
    blob: web_sys::Blob,
}

// SAFETY: WASM is single-threaded.
unsafe impl Send for JsBlobSource {}
unsafe impl Sync for JsBlobSource {}

#[async_trait(?Send)]
impl BlobSource for JsBlobSource {
    async fn read(&self) -> Result<Vec<u8>> {
        let buffer = JsFuture::from(self.blob.array_buffer())
            .await
            .map_err(|e| BridgeError::BlobRead(js_error_message(&e)))?;
        Ok(js_sys::Uint8Array::new(&buffer).to_vec())
    }
}

pub fn from_js_blob(blob: web_sys::Blob) -> Blob {
    let mime_type = blob.type_();
    Blob::from_source(mime_type, Arc::new(JsBlobSource { blob }))
}
