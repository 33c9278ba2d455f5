//! Host-supplied JS objects and their adapters onto the bridge traits.

use async_trait::async_trait;
use js_sys::{Array, Reflect, Uint8Array};
use makapix_bridge::{
    ArtworkService, ArtworkUpload, BridgeError, DecodedAnimation, FrameDecoder, HostController,
    NavigationTarget, Post, ServiceError, TokenStore,
};
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use wasm_bindgen::prelude::*;

use crate::error::js_error_message;

// ============================================================================
// JS extern types
// ============================================================================

#[wasm_bindgen]
extern "C" {
    /// `{ accessToken(), userSqid(), refreshAccessToken(), clearTokens() }`
    pub type JsTokenStore;

    #[wasm_bindgen(method, js_name = "accessToken")]
    fn access_token(this: &JsTokenStore) -> Option<String>;

    #[wasm_bindgen(method, js_name = "userSqid")]
    fn user_sqid(this: &JsTokenStore) -> Option<String>;

    /// Resolves to `true` when a new access token was stored.
    #[wasm_bindgen(method, catch, js_name = "refreshAccessToken")]
    async fn refresh_access_token(this: &JsTokenStore) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, js_name = "clearTokens")]
    fn clear_tokens(this: &JsTokenStore);

    /// Backend client. Rejections may carry an HTTP `status`.
    pub type JsArtworkService;

    #[wasm_bindgen(method, catch, js_name = "fetchPost")]
    async fn fetch_post(this: &JsArtworkService, post_sqid: &str) -> Result<JsValue, JsValue>;

    /// Resolves to an `ArrayBuffer` or `Uint8Array`.
    #[wasm_bindgen(method, catch, js_name = "fetchBinary")]
    async fn fetch_binary(this: &JsArtworkService, url: &str) -> Result<JsValue, JsValue>;

    /// Resolves to a `data:` URI string.
    #[wasm_bindgen(method, catch, js_name = "fetchDataUri")]
    async fn fetch_data_uri(this: &JsArtworkService, url: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = "uploadReplacement")]
    async fn upload_replacement(
        this: &JsArtworkService,
        post_id: &str,
        bytes: Uint8Array,
        mime_type: &str,
        file_name: Option<String>,
    ) -> Result<JsValue, JsValue>;

    /// The page that hosts the editor.
    pub type JsHost;

    #[wasm_bindgen(method, js_name = "currentPath")]
    fn current_path(this: &JsHost) -> String;

    #[wasm_bindgen(method)]
    fn navigate(this: &JsHost, target: JsValue);

    #[wasm_bindgen(method, js_name = "notifyError")]
    fn notify_error(this: &JsHost, message: &str);

    /// Resolves to `{ width, height, frames: Uint8Array[], durationsMs: number[] }`.
    pub type JsFrameDecoder;

    #[wasm_bindgen(method, catch, js_name = "decodeAnimatedWebp")]
    async fn decode_animated_webp(this: &JsFrameDecoder, bytes: Uint8Array) -> Result<JsValue, JsValue>;
}

// ============================================================================
// Tokens
// ============================================================================

pub struct JsTokens {
    inner: JsTokenStore,
}

// SAFETY: WASM is single-threaded.
unsafe impl Send for JsTokens {}
unsafe impl Sync for JsTokens {}

impl JsTokens {
    pub fn new(inner: JsTokenStore) -> Self {
        Self { inner }
    }
}

#[async_trait(?Send)]
impl TokenStore for JsTokens {
    fn access_token(&self) -> Option<String> {
        self.inner.access_token().filter(|t| !t.is_empty())
    }

    fn user_sqid(&self) -> Option<String> {
        self.inner.user_sqid().filter(|s| !s.is_empty())
    }

    async fn refresh_access_token(&self) -> bool {
        match self.inner.refresh_access_token().await {
            Ok(result) => result.as_bool().unwrap_or(false),
            Err(e) => {
                warn!(error = %js_error_message(&e), "refreshAccessToken rejected");
                false
            }
        }
    }

    fn clear_tokens(&self) {
        self.inner.clear_tokens()
    }
}

// ============================================================================
// Artwork service
// ============================================================================

pub struct JsArtwork {
    inner: JsArtworkService,
}

// SAFETY: WASM is single-threaded.
unsafe impl Send for JsArtwork {}
unsafe impl Sync for JsArtwork {}

impl JsArtwork {
    pub fn new(inner: JsArtworkService) -> Self {
        Self { inner }
    }
}

fn service_err(e: JsValue) -> ServiceError {
    let message = js_error_message(&e);
    let status = Reflect::get(&e, &JsValue::from_str("status"))
        .ok()
        .and_then(|s| s.as_f64());
    match status {
        Some(status) => ServiceError::from_status(status as u16, message),
        None => ServiceError::Network(message),
    }
}

#[async_trait(?Send)]
impl ArtworkService for JsArtwork {
    async fn fetch_post(&self, post_sqid: &str) -> Result<Post, ServiceError> {
        let value = self.inner.fetch_post(post_sqid).await.map_err(service_err)?;
        serde_wasm_bindgen::from_value(value)
            .map_err(|e| ServiceError::Network(format!("Failed to parse post: {e}")))
    }

    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        let value = self.inner.fetch_binary(url).await.map_err(service_err)?;
        Ok(Uint8Array::new(&value).to_vec())
    }

    async fn fetch_data_uri(&self, url: &str) -> Result<String, ServiceError> {
        let value = self.inner.fetch_data_uri(url).await.map_err(service_err)?;
        value
            .as_string()
            .ok_or_else(|| ServiceError::Network("fetchDataUri must resolve to a string".to_string()))
    }

    async fn upload_replacement(
        &self,
        post_id: &str,
        artwork: &ArtworkUpload,
    ) -> Result<(), ServiceError> {
        self.inner
            .upload_replacement(
                post_id,
                Uint8Array::from(artwork.bytes.as_slice()),
                &artwork.mime_type,
                artwork.file_name.clone(),
            )
            .await
            .map_err(service_err)?;
        Ok(())
    }
}

// ============================================================================
// Host
// ============================================================================

pub struct JsHostController {
    inner: JsHost,
}

// SAFETY: WASM is single-threaded.
unsafe impl Send for JsHostController {}
unsafe impl Sync for JsHostController {}

impl JsHostController {
    pub fn new(inner: JsHost) -> Self {
        Self { inner }
    }
}

/// `{ kind, ... }` object handed to `host.navigate`.
fn navigation_value(target: &NavigationTarget) -> JsValue {
    let value = match target {
        NavigationTarget::Authenticate { return_to } => {
            json!({ "kind": "authenticate", "returnTo": return_to })
        }
        NavigationTarget::SubmitArtwork => json!({ "kind": "submit" }),
        NavigationTarget::ArtworkView { public_sqid } => {
            json!({ "kind": "artwork", "publicSqid": public_sqid })
        }
    };
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}

impl HostController for JsHostController {
    fn current_path(&self) -> String {
        self.inner.current_path()
    }

    fn navigate(&self, target: NavigationTarget) {
        self.inner.navigate(navigation_value(&target))
    }

    fn notify_error(&self, message: &str) {
        self.inner.notify_error(message)
    }
}

// ============================================================================
// Frame decoder
// ============================================================================

pub struct JsDecoder {
    inner: JsFrameDecoder,
}

// SAFETY: WASM is single-threaded.
unsafe impl Send for JsDecoder {}
unsafe impl Sync for JsDecoder {}

impl JsDecoder {
    pub fn new(inner: JsFrameDecoder) -> Self {
        Self { inner }
    }
}

fn decode_err(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::Decode(e.to_string())
}

fn get_field(value: &JsValue, name: &str) -> Result<JsValue, BridgeError> {
    Reflect::get(value, &JsValue::from_str(name)).map_err(|e| decode_err(js_error_message(&e)))
}

#[async_trait(?Send)]
impl FrameDecoder for JsDecoder {
    async fn decode_animated_webp(&self, bytes: &[u8]) -> Result<DecodedAnimation, BridgeError> {
        let value = self
            .inner
            .decode_animated_webp(Uint8Array::from(bytes))
            .await
            .map_err(|e| decode_err(js_error_message(&e)))?;

        let width: u32 = serde_wasm_bindgen::from_value(get_field(&value, "width")?).map_err(decode_err)?;
        let height: u32 = serde_wasm_bindgen::from_value(get_field(&value, "height")?).map_err(decode_err)?;
        let durations_ms: Vec<u32> =
            serde_wasm_bindgen::from_value(get_field(&value, "durationsMs")?).map_err(decode_err)?;
        let frames = Array::from(&get_field(&value, "frames")?)
            .iter()
            .map(|frame| Uint8Array::new(&frame).to_vec())
            .collect();

        Ok(DecodedAnimation {
            width,
            height,
            frames,
            durations_ms,
        })
    }
}
