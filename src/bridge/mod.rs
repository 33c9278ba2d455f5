//! Lifecycle of one embedded editor session.
//!
//! The bridge owns at most one [`EditorSession`]. Mounting replaces any
//! previous session (cancelling its in-flight work), so there is never more
//! than one active listener per bridge. All inbound traffic goes through
//! [`EditorBridge::on_message`].

mod auth;
mod export;
mod loader;

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::edit::EditContext;
use crate::error::{BridgeError, Result};
use crate::host::{EditorPort, HostController, NavigationTarget};
use crate::options::BridgeOptions;
use crate::origin::Origin;
use crate::payload::EditTarget;
use crate::protocol::{DecodeError, InboundKind, InboundMessage, MessageEvent, OutboundMessage};
use crate::service::{ArtworkService, FrameDecoder, ServiceError};
use crate::session::{EditorSession, Liveness, SessionState};
use crate::storage::KeyValueStore;
use crate::tokens::TokenStore;

// ============================================================================
// Construction
// ============================================================================

/// Everything the bridge talks to.
#[derive(Clone)]
pub struct BridgeCollaborators {
    pub tokens: Arc<dyn TokenStore>,
    pub artwork: Arc<dyn ArtworkService>,
    pub host: Arc<dyn HostController>,
    pub port: Arc<dyn EditorPort>,
    /// Session-scoped store that receives the export hand-off record.
    pub handoff_store: Arc<dyn KeyValueStore>,
    /// Decoder for animated WebP sources. Without one, animated sources are
    /// sent to the editor encoded.
    pub decoder: Option<Arc<dyn FrameDecoder>>,
}

struct Inner {
    tokens: Arc<dyn TokenStore>,
    artwork: Arc<dyn ArtworkService>,
    host: Arc<dyn HostController>,
    port: Arc<dyn EditorPort>,
    handoff_store: Arc<dyn KeyValueStore>,
    decoder: Option<Arc<dyn FrameDecoder>>,
    options: BridgeOptions,
    session: Mutex<Option<EditorSession>>,
}

/// Cheaply cloneable handle; clones share the same session.
#[derive(Clone)]
pub struct EditorBridge {
    inner: Arc<Inner>,
}

// ============================================================================
// Dispatch outcomes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Handled(InboundKind),
    Dropped(DropReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    NotMounted,
    UntrustedOrigin,
    Decode(DecodeError),
    OutOfState {
        kind: InboundKind,
        state: SessionState,
    },
}

/// Result of one [`EditorBridge::send_init`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// INIT was posted; `payload` tells whether a staged payload followed it.
    Sent { payload: bool },
    /// INIT already went out for the current readiness signal.
    AlreadySent,
    /// No access token; nothing was posted.
    NoAccessToken,
    /// Session is not in a state that can receive INIT.
    NotReady,
    /// Posting INIT failed; the payload stays staged.
    PortFailed,
    /// INIT was posted but the payload message failed. The payload is gone.
    PayloadPortFailed,
}

impl EditorBridge {
    pub fn new(collaborators: BridgeCollaborators, options: BridgeOptions) -> Self {
        let BridgeCollaborators {
            tokens,
            artwork,
            host,
            port,
            handoff_store,
            decoder,
        } = collaborators;
        Self {
            inner: Arc::new(Inner {
                tokens,
                artwork,
                host,
                port,
                handoff_store,
                decoder,
                options,
                session: Mutex::new(None),
            }),
        }
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.inner.options
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start a session for an editor at `origin`, optionally editing an
    /// existing artwork. Nothing is sent until the editor reports ready.
    pub fn mount(&self, origin: Origin, target: Option<EditTarget>) -> Uuid {
        let mut session = EditorSession::new(origin);
        session.stage(target);
        session.state = SessionState::AwaitingReady;
        self.install(session)
    }

    /// Tear down the current session. Safe to call repeatedly.
    pub fn unmount(&self) {
        let mut slot = self.inner.session.lock();
        if let Some(session) = slot.as_mut() {
            if !session.state.is_terminal() {
                session.close();
                info!(session = %session.id, "editor session unmounted");
            }
        }
    }

    fn install(&self, session: EditorSession) -> Uuid {
        let id = session.id;
        let mut slot = self.inner.session.lock();
        if let Some(previous) = slot.as_mut() {
            if !previous.state.is_terminal() {
                debug!(session = %previous.id, replacement = %id, "replacing mounted editor session");
                previous.close();
            }
        }
        info!(session = %id, origin = %session.origin, state = ?session.state, "editor session mounted");
        *slot = Some(session);
        id
    }

    pub fn state(&self) -> SessionState {
        self.inner
            .session
            .lock()
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(SessionState::Idle)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.inner.session.lock().as_ref().map(|s| s.id)
    }

    pub fn edit_context(&self) -> Option<EditContext> {
        self.inner
            .session
            .lock()
            .as_ref()
            .and_then(|s| s.edit_context.clone())
    }

    pub fn has_staged_payload(&self) -> bool {
        self.inner
            .session
            .lock()
            .as_ref()
            .is_some_and(|s| s.payload.is_staged())
    }

    pub fn payload_transferred(&self) -> bool {
        self.inner
            .session
            .lock()
            .as_ref()
            .is_some_and(|s| s.payload.was_transferred())
    }

    // ========================================================================
    // Inbound dispatch
    // ========================================================================

    /// The single entry point for window `message` events.
    ///
    /// Never fails: foreign origins, unknown or malformed messages, and
    /// messages that are not valid in the current state are dropped. Handler
    /// errors are turned into notifications or log lines.
    pub async fn on_message(&self, event: MessageEvent) -> Dispatch {
        let (id, liveness, state) = {
            let slot = self.inner.session.lock();
            let Some(session) = slot.as_ref() else {
                return Dispatch::Dropped(DropReason::NotMounted);
            };
            if !session.origin.matches(&event.origin) {
                trace!(session = %session.id, origin = %event.origin, "dropping message from untrusted origin");
                return Dispatch::Dropped(DropReason::UntrustedOrigin);
            }
            (session.id, session.liveness.clone(), session.state)
        };

        let message = match InboundMessage::decode(&event.data, event.blob) {
            Ok(message) => message,
            Err(e) => {
                match &e {
                    DecodeError::UnknownType(tag) => {
                        debug!(session = %id, tag = %tag, "ignoring unknown editor message type")
                    }
                    DecodeError::Malformed { kind, .. } | DecodeError::MissingBlob(kind) => {
                        warn!(session = %id, kind = kind.as_str(), "dropping malformed editor message");
                        if matches!(kind, InboundKind::Export | InboundKind::Replace) && state.accepts(*kind) {
                            self.inner
                                .host
                                .notify_error("The editor sent artwork the site could not read.");
                        }
                    }
                    DecodeError::MissingType => {
                        debug!(session = %id, "dropping editor message without a type")
                    }
                }
                return Dispatch::Dropped(DropReason::Decode(e));
            }
        };

        let kind = message.kind();
        if !state.accepts(kind) {
            debug!(session = %id, kind = kind.as_str(), state = ?state, "dropping message not valid in current state");
            return Dispatch::Dropped(DropReason::OutOfState { kind, state });
        }

        match message {
            InboundMessage::EditorReady => self.handle_ready(id),
            InboundMessage::AuthRefreshRequest => self.handle_auth_refresh(id, liveness).await,
            InboundMessage::Export(export) => self.handle_export(id, liveness, export).await,
            InboundMessage::Replace(replace) => self.handle_replace(id, liveness, replace).await,
        }
        Dispatch::Handled(kind)
    }

    fn handle_ready(&self, id: Uuid) {
        let ready = self.with_live_session(id, |s| {
            if s.state == SessionState::AwaitingReady {
                s.state = SessionState::Ready;
            }
            s.init_sent = false;
        });
        if ready.is_some() {
            info!(session = %id, "editor ready");
            self.send_init();
        }
    }

    // ========================================================================
    // INIT + payload transfer
    // ========================================================================

    /// Send `MAKAPIX_INIT`, followed by the staged payload if there is one.
    ///
    /// Runs at most once per readiness signal. Without an access token nothing
    /// is posted and the session stays ready; the editor asks for a refresh
    /// when the backend rejects it. A payload that has been taken once is
    /// never sent again.
    pub fn send_init(&self) -> InitOutcome {
        let claimed = {
            let mut slot = self.inner.session.lock();
            match slot.as_mut() {
                Some(s)
                    if s.liveness.is_alive()
                        && matches!(s.state, SessionState::Ready | SessionState::AwaitingExport) =>
                {
                    if s.init_sent {
                        return InitOutcome::AlreadySent;
                    }
                    s.init_sent = true;
                    (s.id, s.origin.clone(), s.edit_context.clone())
                }
                _ => return InitOutcome::NotReady,
            }
        };
        let (id, origin, edit_mode) = claimed;

        let Some(access_token) = self.inner.tokens.access_token() else {
            warn!(session = %id, "no access token available; editor INIT not sent");
            return InitOutcome::NoAccessToken;
        };

        let init = OutboundMessage::Init {
            access_token,
            user_sqid: self.inner.tokens.user_sqid(),
            edit_mode,
        };
        if let Err(e) = self.inner.port.post(init, &origin) {
            error!(session = %id, error = %e, "failed to post INIT");
            return InitOutcome::PortFailed;
        }
        debug!(session = %id, "INIT sent");

        let taken = self
            .with_live_session(id, |s| {
                if !s.payload.is_staged() {
                    return None;
                }
                let post_sqid = s.edit_context.as_ref()?.post_sqid.clone();
                let payload = s.payload.take().ok()?;
                let resume = s.state;
                s.state = SessionState::TransferringPayload;
                Some((payload, post_sqid, resume))
            })
            .flatten();
        let Some((payload, post_sqid, resume)) = taken else {
            return InitOutcome::Sent { payload: false };
        };

        let bytes = payload.byte_len();
        let message = payload.into_message(post_sqid);
        let kind = message.kind();
        let posted = self.inner.port.post(message, &origin);

        self.with_live_session(id, |s| {
            if s.state == SessionState::TransferringPayload {
                s.state = resume;
            }
        });

        match posted {
            Ok(()) => {
                info!(session = %id, kind, bytes, "edit payload transferred");
                InitOutcome::Sent { payload: true }
            }
            Err(e) => {
                error!(session = %id, kind, error = %e, "failed to post edit payload");
                InitOutcome::PayloadPortFailed
            }
        }
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    /// Run `f` against the session only if it is still the one `id` names and
    /// has not been cancelled.
    fn with_live_session<T>(&self, id: Uuid, f: impl FnOnce(&mut EditorSession) -> T) -> Option<T> {
        let mut slot = self.inner.session.lock();
        match slot.as_mut() {
            Some(session) if session.id == id && session.liveness.is_alive() => Some(f(session)),
            _ => None,
        }
    }

    /// Post to the editor of session `id`, if it is still live.
    fn post_to_editor(&self, id: Uuid, message: OutboundMessage) {
        let Some(origin) = self.with_live_session(id, |s| s.origin.clone()) else {
            return;
        };
        let kind = message.kind();
        match self.inner.port.post(message, &origin) {
            Ok(()) => debug!(session = %id, kind, "posted to editor"),
            Err(e) => error!(session = %id, kind, error = %e, "failed to post to editor"),
        }
    }

    /// Unrecoverable authentication failure: close the session, clear tokens
    /// and send the user to sign in, returning to the current path afterwards.
    fn expire_session(&self, id: Uuid) {
        if self.with_live_session(id, EditorSession::close).is_none() {
            return;
        }
        self.inner.tokens.clear_tokens();
        let return_to = self.inner.host.current_path();
        warn!(session = %id, "authentication expired; redirecting to sign-in");
        self.inner
            .host
            .navigate(NavigationTarget::Authenticate { return_to });
    }

    /// Call the backend, refreshing the access token and retrying once on 401.
    async fn call_with_refresh<T, F, Fut>(&self, liveness: &Liveness, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, ServiceError>>,
    {
        match call().await {
            Err(ServiceError::Unauthorized) if self.inner.options.retry_on_unauthorized => {
                debug!("backend answered 401; refreshing access token");
                if !self.inner.tokens.refresh_access_token().await {
                    return Err(ServiceError::Unauthorized.into());
                }
                ensure_alive(liveness)?;
                Ok(call().await?)
            }
            other => Ok(other?),
        }
    }
}

fn ensure_alive(liveness: &Liveness) -> Result<()> {
    if liveness.is_alive() {
        Ok(())
    } else {
        Err(BridgeError::Cancelled)
    }
}
