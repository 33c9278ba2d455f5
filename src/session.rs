//! Per-mount session state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::edit::EditContext;
use crate::origin::Origin;
use crate::payload::{EditTarget, OwnedPayload};
use crate::protocol::InboundKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created; the frame has not been pointed at the editor yet.
    Idle,
    /// Frame navigating; waiting for `EDITOR_READY`.
    AwaitingReady,
    Ready,
    /// INIT sent; the staged payload is being posted.
    TransferringPayload,
    /// An export or replace is being processed.
    AwaitingExport,
    Closed,
}

impl SessionState {
    /// Whether an inbound message of `kind` is valid in this state.
    pub fn accepts(&self, kind: InboundKind) -> bool {
        use InboundKind::*;
        match self {
            Self::Idle | Self::Closed | Self::TransferringPayload => false,
            Self::AwaitingReady => kind == EditorReady,
            Self::Ready | Self::AwaitingExport => true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == Self::Closed
    }
}

/// Liveness flag shared between a session and the async work it started.
///
/// Cancelling is synchronous and one-way; continuations check
/// [`Liveness::is_alive`] after every await before touching session state.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// One embedded-editor lifecycle instance.
#[derive(Debug)]
pub struct EditorSession {
    pub(crate) id: Uuid,
    pub(crate) origin: Origin,
    pub(crate) state: SessionState,
    pub(crate) edit_context: Option<EditContext>,
    pub(crate) payload: OwnedPayload,
    /// INIT has been attempted for the current readiness signal.
    pub(crate) init_sent: bool,
    /// Exports/replaces currently being processed.
    pub(crate) in_flight: usize,
    pub(crate) liveness: Liveness,
}

impl EditorSession {
    pub(crate) fn new(origin: Origin) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            state: SessionState::Idle,
            edit_context: None,
            payload: OwnedPayload::empty(),
            init_sent: false,
            in_flight: 0,
            liveness: Liveness::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn edit_context(&self) -> Option<&EditContext> {
        self.edit_context.as_ref()
    }

    pub(crate) fn stage(&mut self, target: Option<EditTarget>) {
        match target {
            Some(EditTarget { context, payload }) => {
                self.edit_context = Some(context);
                self.payload = payload.map(OwnedPayload::staged).unwrap_or_default();
            }
            None => {
                self.edit_context = None;
                self.payload = OwnedPayload::empty();
            }
        }
    }

    /// Terminal transition: cancel outstanding work and release buffers.
    pub(crate) fn close(&mut self) {
        self.state = SessionState::Closed;
        self.liveness.cancel();
        self.payload.release();
        self.edit_context = None;
        self.in_flight = 0;
    }
}
