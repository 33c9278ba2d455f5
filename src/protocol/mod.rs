//! The `postMessage` contract between the host page and an embedded editor.

pub mod inbound;
pub mod outbound;

pub use inbound::{
    DecodeError, ExportPayload, InboundKind, InboundMessage, MessageEvent, ReplacePayload,
};
pub use outbound::{OutboundMessage, Transfer};
