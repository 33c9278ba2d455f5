//! Export hand-off between the editor page and the upload page.
//!
//! The editor page writes one serialized record into session storage; the
//! upload page takes it (removing it) and ignores it once it has gone stale.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::blob::to_data_uri;
use crate::error::{BridgeError, Result};
use crate::options::BridgeOptions;
use crate::protocol::ExportPayload;
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportHandoff {
    /// `data:` URI of the exported artwork.
    pub image_data: String,
    pub name: String,
    pub width: Value,
    pub height: Value,
    pub frame_count: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<Value>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ExportHandoff {
    /// Bundle exported bytes with the editor's declared metadata. A missing
    /// `frameCount` is recorded as a single frame.
    pub fn from_export(export: &ExportPayload, bytes: &[u8], now: DateTime<Utc>) -> Self {
        Self {
            image_data: to_data_uri(export.blob.mime_type(), bytes),
            name: export.name.clone(),
            width: export.width.clone(),
            height: export.height.clone(),
            frame_count: export.frame_count.clone().unwrap_or_else(|| Value::from(1)),
            fps: export.fps.clone(),
            timestamp: now.timestamp_millis(),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Older than `ttl`, or dated in the future.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        match self.created_at() {
            Some(created) => {
                let age = now.signed_duration_since(created);
                age < chrono::Duration::zero() || age > ttl
            }
            None => true,
        }
    }
}

/// Write the record, replacing any previous one.
pub fn store_export(
    store: &dyn KeyValueStore,
    options: &BridgeOptions,
    handoff: &ExportHandoff,
) -> Result<()> {
    let serialized = serde_json::to_string(handoff)?;
    if serialized.len() > options.max_handoff_bytes {
        return Err(BridgeError::HandoffTooLarge {
            size: serialized.len(),
            max: options.max_handoff_bytes,
        });
    }
    store.set(&options.handoff_key, &serialized)
}

/// Remove and return the record if it exists, parses and is fresh.
pub fn take_export(
    store: &dyn KeyValueStore,
    options: &BridgeOptions,
    now: DateTime<Utc>,
) -> Option<ExportHandoff> {
    let raw = store.get(&options.handoff_key)?;
    store.remove(&options.handoff_key);

    let handoff: ExportHandoff = match serde_json::from_str(&raw) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, "discarding unreadable export hand-off record");
            return None;
        }
    };

    if handoff.is_stale(now, options.handoff_ttl()) {
        debug!(timestamp = handoff.timestamp, "discarding stale export hand-off record");
        return None;
    }
    Some(handoff)
}
