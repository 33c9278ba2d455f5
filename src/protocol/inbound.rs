//! Editor → host messages.

use serde::Deserialize;
use serde_json::Value;

use crate::blob::Blob;

pub const EDITOR_READY: &str = "EDITOR_READY";
pub const AUTH_REFRESH_REQUEST: &str = "AUTH_REFRESH_REQUEST";
pub const EXPORT: &str = "EXPORT";
pub const REPLACE: &str = "REPLACE";

/// A raw `message` event as delivered by the window.
///
/// `blob` is lifted out of `data` by the platform layer since a JS `Blob`
/// has no JSON representation.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub origin: String,
    pub data: Value,
    pub blob: Option<Blob>,
}

impl MessageEvent {
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
            blob: None,
        }
    }

    pub fn with_blob(mut self, blob: Blob) -> Self {
        self.blob = Some(blob);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    EditorReady,
    AuthRefreshRequest,
    Export,
    Replace,
}

impl InboundKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            EDITOR_READY => Some(Self::EditorReady),
            AUTH_REFRESH_REQUEST => Some(Self::AuthRefreshRequest),
            EXPORT => Some(Self::Export),
            REPLACE => Some(Self::Replace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EditorReady => EDITOR_READY,
            Self::AuthRefreshRequest => AUTH_REFRESH_REQUEST,
            Self::Export => EXPORT,
            Self::Replace => REPLACE,
        }
    }
}

/// Finished artwork from the editor. Dimensions and counts are untrusted and
/// passed through unmodified; the upload path re-validates them.
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub blob: Blob,
    pub name: String,
    pub width: Value,
    pub height: Value,
    pub frame_count: Option<Value>,
    pub fps: Option<Value>,
}

/// Edited artwork that should replace an existing post's artwork.
#[derive(Debug, Clone)]
pub struct ReplacePayload {
    pub blob: Blob,
    pub name: Option<String>,
    pub original_post_sqid: String,
}

#[derive(Debug, Clone)]
pub enum InboundMessage {
    EditorReady,
    AuthRefreshRequest,
    Export(ExportPayload),
    Replace(ReplacePayload),
}

/// Why an inbound payload could not be turned into an [`InboundMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// `data` is not an object or has no string `type`.
    MissingType,
    /// A `type` outside the known set; ignored for forward compatibility.
    UnknownType(String),
    /// A known `type` whose fields do not match the contract.
    Malformed { kind: InboundKind, reason: String },
    /// `EXPORT`/`REPLACE` without a blob.
    MissingBlob(InboundKind),
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum WireInbound {
    #[serde(rename = "EDITOR_READY")]
    EditorReady,
    #[serde(rename = "AUTH_REFRESH_REQUEST")]
    AuthRefreshRequest,
    #[serde(rename = "EXPORT", rename_all = "camelCase")]
    Export {
        name: String,
        width: Value,
        height: Value,
        #[serde(default)]
        frame_count: Option<Value>,
        #[serde(default)]
        fps: Option<Value>,
    },
    #[serde(rename = "REPLACE", rename_all = "camelCase")]
    Replace {
        #[serde(default)]
        name: Option<String>,
        original_post_sqid: String,
    },
}

impl InboundMessage {
    pub fn kind(&self) -> InboundKind {
        match self {
            Self::EditorReady => InboundKind::EditorReady,
            Self::AuthRefreshRequest => InboundKind::AuthRefreshRequest,
            Self::Export(_) => InboundKind::Export,
            Self::Replace(_) => InboundKind::Replace,
        }
    }

    /// Validate the tag against the known set, then the fields.
    pub fn decode(data: &Value, blob: Option<Blob>) -> Result<Self, DecodeError> {
        let tag = data
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingType)?;
        let kind =
            InboundKind::from_tag(tag).ok_or_else(|| DecodeError::UnknownType(tag.to_string()))?;

        let wire: WireInbound =
            serde_json::from_value(data.clone()).map_err(|e| DecodeError::Malformed {
                kind,
                reason: e.to_string(),
            })?;

        match wire {
            WireInbound::EditorReady => Ok(Self::EditorReady),
            WireInbound::AuthRefreshRequest => Ok(Self::AuthRefreshRequest),
            WireInbound::Export {
                name,
                width,
                height,
                frame_count,
                fps,
            } => Ok(Self::Export(ExportPayload {
                blob: blob.ok_or(DecodeError::MissingBlob(kind))?,
                name,
                width,
                height,
                frame_count,
                fps,
            })),
            WireInbound::Replace {
                name,
                original_post_sqid,
            } => {
                if original_post_sqid.trim().is_empty() {
                    return Err(DecodeError::Malformed {
                        kind,
                        reason: "originalPostSqid is empty".to_string(),
                    });
                }
                Ok(Self::Replace(ReplacePayload {
                    blob: blob.ok_or(DecodeError::MissingBlob(kind))?,
                    name,
                    original_post_sqid,
                }))
            }
        }
    }
}
