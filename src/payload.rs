//! Staged binary payloads and their one-shot hand-off.

use crate::edit::{EditContext, EncodedFormat};
use crate::error::{BridgeError, Result};
use crate::protocol::OutboundMessage;

/// Byte length of one `width` x `height` RGBA frame, or `None` if it does
/// not fit in `usize`.
pub fn rgba_frame_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
}

/// Decoded RGBA frames with one duration per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    width: u32,
    height: u32,
    fps: u32,
    durations_ms: Vec<u32>,
    frames: Vec<Vec<u8>>,
}

impl FrameSet {
    /// # Panics
    /// If `frames` and `durations_ms` differ in length. Callers build both
    /// lists from the same decode; a mismatch is a bug, not bad input.
    pub fn new(width: u32, height: u32, fps: u32, frames: Vec<Vec<u8>>, durations_ms: Vec<u32>) -> Self {
        assert_eq!(
            frames.len(),
            durations_ms.len(),
            "frame buffers and frame durations must have the same length"
        );
        debug_assert!(
            frames
                .iter()
                .all(|f| Some(f.len()) == rgba_frame_len(width, height)),
            "every RGBA frame must be width * height * 4 bytes"
        );
        Self {
            width,
            height,
            fps,
            durations_ms,
            frames,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn durations_ms(&self) -> &[u32] {
        &self.durations_ms
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Binary artwork staged for transfer into the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditPayload {
    Encoded { format: EncodedFormat, bytes: Vec<u8> },
    Frames(FrameSet),
}

impl EditPayload {
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Encoded { bytes, .. } => bytes.len(),
            Self::Frames(set) => set.frames.iter().map(Vec::len).sum(),
        }
    }

    /// Consume the payload into the message that carries it.
    pub fn into_message(self, post_sqid: String) -> OutboundMessage {
        match self {
            Self::Encoded { format, bytes } => OutboundMessage::edit_encoded(format, post_sqid, bytes),
            Self::Frames(set) => OutboundMessage::EditFramesRgba {
                post_sqid,
                width: set.width,
                height: set.height,
                fps: set.fps,
                frame_durations_ms: set.durations_ms,
                frame_rgba_buffers: set.frames,
            },
        }
    }
}

/// Single-use owner of a staged payload.
///
/// [`OwnedPayload::take`] hands the buffer out at most once and clears the
/// local slot; later calls report [`BridgeError::PayloadAlreadyTransferred`].
#[derive(Debug, Default)]
pub struct OwnedPayload {
    slot: Option<EditPayload>,
    transferred: bool,
}

impl OwnedPayload {
    pub fn staged(payload: EditPayload) -> Self {
        Self {
            slot: Some(payload),
            transferred: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_staged(&self) -> bool {
        self.slot.is_some()
    }

    pub fn was_transferred(&self) -> bool {
        self.transferred
    }

    pub fn take(&mut self) -> Result<EditPayload> {
        match self.slot.take() {
            Some(payload) => {
                self.transferred = true;
                Ok(payload)
            }
            None if self.transferred => Err(BridgeError::PayloadAlreadyTransferred),
            None => Err(BridgeError::NoPayloadStaged),
        }
    }

    /// Drop a staged payload without transferring it.
    pub fn release(&mut self) {
        self.slot = None;
    }
}

/// An edit context together with the payload that belongs to it.
#[derive(Debug, Clone, PartialEq)]
pub struct EditTarget {
    pub context: EditContext,
    pub payload: Option<EditPayload>,
}

impl EditTarget {
    pub fn new(context: EditContext, payload: Option<EditPayload>) -> Self {
        Self { context, payload }
    }
}
