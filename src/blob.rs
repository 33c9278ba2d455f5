//! Opaque inbound blobs and `data:` URI conversion.

use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use crate::error::{BridgeError, Result};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Asynchronous access to blob contents (a JS `Blob` in the browser).
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait BlobSource: Send + Sync {
    async fn read(&self) -> Result<Vec<u8>>;
}

struct InMemoryBlob(Vec<u8>);

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl BlobSource for InMemoryBlob {
    async fn read(&self) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }
}

/// A blob attached to an inbound editor message.
#[derive(Clone)]
pub struct Blob {
    mime_type: String,
    source: Arc<dyn BlobSource>,
}

impl Blob {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::from_source(mime_type, Arc::new(InMemoryBlob(bytes)))
    }

    pub fn from_source(mime_type: impl Into<String>, source: Arc<dyn BlobSource>) -> Self {
        Self {
            mime_type: mime_type.into(),
            source,
        }
    }

    /// Declared MIME type, or `application/octet-stream` when the editor sent none.
    pub fn mime_type(&self) -> &str {
        if self.mime_type.is_empty() {
            FALLBACK_MIME
        } else {
            &self.mime_type
        }
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        self.source.read().await
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Encode bytes as a base64 `data:` URI.
pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    let mime = if mime_type.is_empty() {
        FALLBACK_MIME
    } else {
        mime_type
    };
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn data_uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:([^;,]*)((?:;[^;,]+)*);base64,(.*)$").expect("data URI pattern is valid")
    })
}

/// Decode a base64 `data:` URI into `(mime_type, bytes)`.
///
/// Only base64 payloads are accepted; percent-encoded URIs are not artwork.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let caps = data_uri_pattern()
        .captures(uri.trim())
        .ok_or_else(|| BridgeError::InvalidDataUri("expected data:<mime>;base64,<payload>".into()))?;

    let mime = match caps.get(1).map(|m| m.as_str()) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => FALLBACK_MIME.to_string(),
    };
    let payload = caps.get(3).map(|m| m.as_str()).unwrap_or("");
    let bytes = STANDARD.decode(payload)?;
    Ok((mime, bytes))
}
