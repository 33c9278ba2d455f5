use thiserror::Error;

use crate::service::ServiceError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Invalid editor origin: {0}")]
    InvalidOrigin(String),

    #[error("No editor session is mounted")]
    NotMounted,

    #[error("Editor session was unmounted before the operation completed")]
    Cancelled,

    #[error("No payload is staged for transfer")]
    NoPayloadStaged,

    #[error("Payload has already been transferred to the editor")]
    PayloadAlreadyTransferred,

    #[error("Failed to post message to editor: {0}")]
    Port(#[from] PortError),

    #[error("Failed to read exported blob: {0}")]
    BlobRead(String),

    #[error("Export is too large for hand-off storage: {size} bytes (max {max})")]
    HandoffTooLarge { size: usize, max: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Post has no artwork URL")]
    MissingArtwork,

    #[error("Unsupported artwork format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode artwork: {0}")]
    Decode(String),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to deliver a message into the editor frame.
#[derive(Debug, Clone, Error)]
pub enum PortError {
    #[error("editor window is not available")]
    WindowUnavailable,

    #[error("{0}")]
    PostFailed(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
