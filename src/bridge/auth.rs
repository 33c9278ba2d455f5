use tracing::debug;
use uuid::Uuid;

use super::EditorBridge;
use crate::protocol::OutboundMessage;
use crate::session::Liveness;

impl EditorBridge {
    /// `AUTH_REFRESH_REQUEST`: refresh and answer with exactly one
    /// `MAKAPIX_AUTH_REFRESHED`, or expire the session.
    pub(super) async fn handle_auth_refresh(&self, id: Uuid, liveness: Liveness) {
        let refreshed = self.inner.tokens.refresh_access_token().await;
        if !liveness.is_alive() {
            debug!(session = %id, "session closed during token refresh");
            return;
        }

        let access_token = if refreshed {
            self.inner.tokens.access_token()
        } else {
            None
        };
        match access_token {
            Some(access_token) => {
                self.post_to_editor(id, OutboundMessage::AuthRefreshed { access_token })
            }
            None => self.expire_session(id),
        }
    }
}
