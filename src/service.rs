//! Backend collaborators: artwork REST calls and the external frame decoder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::BridgeError;

// ============================================================================
// ArtworkService: user-provided REST layer
// ============================================================================

/// Backend calls the bridge needs. Implementations own authentication
/// headers; the bridge only reacts to [`ServiceError::Unauthorized`].
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ArtworkService: Send + Sync {
    /// Resolve a post by its public sqid.
    async fn fetch_post(&self, post_sqid: &str) -> Result<Post, ServiceError>;

    /// Fetch artwork bytes directly from `url`.
    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, ServiceError>;

    /// Fetch artwork through a path that yields a `data:` URI (e.g. a same-origin
    /// proxy). Used when the direct fetch fails.
    async fn fetch_data_uri(&self, url: &str) -> Result<String, ServiceError>;

    /// Replace the artwork of an existing post.
    async fn upload_replacement(
        &self,
        post_id: &str,
        artwork: &ArtworkUpload,
    ) -> Result<(), ServiceError>;
}

/// Post metadata as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub public_sqid: String,
    #[serde(default)]
    pub title: String,
    pub art_url: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Replacement artwork handed to [`ArtworkService::upload_replacement`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

/// Backend failure, classified by how the bridge reacts to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),
}

impl ServiceError {
    /// Map an HTTP status to the matching variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 => Self::Unauthorized,
            404 => Self::NotFound,
            _ => Self::Status {
                status,
                message: message.into(),
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

// ============================================================================
// FrameDecoder: external image-decoding utility
// ============================================================================

/// Decodes animated rasters into RGBA frames. The decoder's internals are
/// outside this crate; only the output contract matters: one RGBA buffer of
/// `width * height * 4` bytes per frame and one duration per frame.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait FrameDecoder: Send + Sync {
    async fn decode_animated_webp(&self, bytes: &[u8]) -> Result<DecodedAnimation, BridgeError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAnimation {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<Vec<u8>>,
    pub durations_ms: Vec<u32>,
}
