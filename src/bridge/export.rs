//! Editor-initiated submissions: `EXPORT` (new post) and `REPLACE`
//! (replace an existing post's artwork).

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ensure_alive, EditorBridge};
use crate::error::{BridgeError, Result};
use crate::handoff::{store_export, ExportHandoff};
use crate::host::NavigationTarget;
use crate::protocol::{ExportPayload, ReplacePayload};
use crate::service::{ArtworkUpload, Post, ServiceError};
use crate::session::{EditorSession, Liveness, SessionState};

impl EditorBridge {
    pub(super) async fn handle_export(&self, id: Uuid, liveness: Liveness, export: ExportPayload) {
        if self.begin_submission(id).is_none() {
            return;
        }

        let result = self.stage_export(&export, &liveness).await;
        if !liveness.is_alive() {
            debug!(session = %id, "session closed while export was processed");
            return;
        }

        match result {
            Ok(()) => {
                self.with_live_session(id, EditorSession::close);
                info!(session = %id, width = %export.width, height = %export.height, "export handed off to upload");
                self.inner.host.navigate(NavigationTarget::SubmitArtwork);
            }
            Err(e) => {
                self.end_failed_submission(id);
                warn!(session = %id, error = %e, "export failed");
                self.inner
                    .host
                    .notify_error(&format!("Failed to process exported artwork: {e}"));
            }
        }
    }

    pub(super) async fn handle_replace(&self, id: Uuid, liveness: Liveness, replace: ReplacePayload) {
        if self.begin_submission(id).is_none() {
            return;
        }

        let result = self.replace_artwork(&replace, &liveness).await;
        if !liveness.is_alive() {
            debug!(session = %id, "session closed while replacement was processed");
            return;
        }

        match result {
            Ok(post) => {
                self.with_live_session(id, EditorSession::close);
                info!(session = %id, post = %post.public_sqid, "artwork replaced");
                self.inner.host.navigate(NavigationTarget::ArtworkView {
                    public_sqid: post.public_sqid,
                });
            }
            Err(BridgeError::Service(ServiceError::Unauthorized)) => self.expire_session(id),
            Err(e) => {
                self.end_failed_submission(id);
                warn!(session = %id, error = %e, "artwork replacement failed");
                self.inner
                    .host
                    .notify_error(&format!("Failed to replace artwork: {e}"));
            }
        }
    }

    async fn stage_export(&self, export: &ExportPayload, liveness: &Liveness) -> Result<()> {
        let bytes = export.blob.read().await?;
        ensure_alive(liveness)?;
        let handoff = ExportHandoff::from_export(export, &bytes, Utc::now());
        store_export(self.inner.handoff_store.as_ref(), &self.inner.options, &handoff)
    }

    async fn replace_artwork(&self, replace: &ReplacePayload, liveness: &Liveness) -> Result<Post> {
        let artwork = &self.inner.artwork;
        let post_sqid = replace.original_post_sqid.as_str();
        let post = self
            .call_with_refresh(liveness, move || artwork.fetch_post(post_sqid))
            .await?;
        ensure_alive(liveness)?;

        let bytes = replace.blob.read().await?;
        ensure_alive(liveness)?;

        let upload = ArtworkUpload {
            bytes,
            mime_type: replace.blob.mime_type().to_string(),
            file_name: replace.name.clone(),
        };
        let post_id = post.id.as_str();
        let upload_ref = &upload;
        self.call_with_refresh(liveness, move || artwork.upload_replacement(post_id, upload_ref))
            .await?;
        Ok(post)
    }

    fn begin_submission(&self, id: Uuid) -> Option<()> {
        self.with_live_session(id, |s| {
            s.in_flight += 1;
            s.state = SessionState::AwaitingExport;
        })
    }

    fn end_failed_submission(&self, id: Uuid) {
        self.with_live_session(id, |s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            if s.in_flight == 0 && s.state == SessionState::AwaitingExport {
                s.state = SessionState::Ready;
            }
        });
    }
}
