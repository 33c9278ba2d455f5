use serde::{Deserialize, Serialize};

/// Default session-storage key for the export hand-off record.
pub const DEFAULT_HANDOFF_KEY: &str = "makapix_editor_export";

/// Hand-off records older than this are discarded by the consumer.
pub const DEFAULT_HANDOFF_TTL_SECS: u64 = 5 * 60;

/// `sessionStorage` is typically capped around 5 MiB per origin.
pub const DEFAULT_MAX_HANDOFF_BYTES: usize = 4 * 1024 * 1024;

/// Configuration for [`crate::EditorBridge`].
///
/// Deserializable with per-field defaults so the browser layer can pass a
/// partial JS object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeOptions {
    /// Storage key the export record is written under.
    pub handoff_key: String,
    /// Staleness window for the export record.
    pub handoff_ttl_secs: u64,
    /// Largest serialized export record that will be stored.
    pub max_handoff_bytes: usize,
    /// Refresh and retry once when a backend call answers 401.
    pub retry_on_unauthorized: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            handoff_key: DEFAULT_HANDOFF_KEY.to_string(),
            handoff_ttl_secs: DEFAULT_HANDOFF_TTL_SECS,
            max_handoff_bytes: DEFAULT_MAX_HANDOFF_BYTES,
            retry_on_unauthorized: true,
        }
    }
}

impl BridgeOptions {
    pub fn handoff_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.handoff_ttl_secs.min(i64::MAX as u64) as i64)
    }
}
