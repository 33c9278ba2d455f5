//! Makapix editor bridge: origin-checked handshake with an embedded pixel
//! editor, one-shot artwork transfer, token relay and export hand-off.

pub mod blob;
pub mod bridge;
pub mod edit;
pub mod error;
pub mod handoff;
pub mod host;
pub mod options;
pub mod origin;
pub mod payload;
pub mod protocol;
pub mod service;
pub mod session;
pub mod storage;
pub mod tokens;

pub use blob::{decode_data_uri, to_data_uri, Blob, BlobSource};
pub use bridge::{BridgeCollaborators, Dispatch, DropReason, EditorBridge, InitOutcome};
pub use edit::{fps_from_durations, ArtworkFormat, EditContext, EncodedFormat};
pub use error::{BridgeError, PortError, Result};
pub use handoff::{store_export, take_export, ExportHandoff};
pub use host::{EditorPort, HostController, NavigationTarget};
pub use options::BridgeOptions;
pub use origin::Origin;
pub use payload::{EditPayload, EditTarget, FrameSet, OwnedPayload};
pub use protocol::{
    DecodeError, ExportPayload, InboundKind, InboundMessage, MessageEvent, OutboundMessage,
    ReplacePayload, Transfer,
};
pub use service::{
    ArtworkService, ArtworkUpload, DecodedAnimation, FrameDecoder, Post, ServiceError,
};
pub use session::{EditorSession, Liveness, SessionState};
pub use storage::{KeyValueStore, MemoryStore};
pub use tokens::{RefreshClient, StoredTokens, TokenPair, TokenStore};
