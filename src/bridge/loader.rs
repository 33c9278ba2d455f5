//! Loading an existing post into an edit target.

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ensure_alive, EditorBridge};
use crate::blob::decode_data_uri;
use crate::edit::{fps_from_durations, ArtworkFormat, EditContext, EncodedFormat};
use crate::error::{BridgeError, Result};
use crate::origin::Origin;
use crate::payload::{rgba_frame_len, EditPayload, EditTarget, FrameSet};
use crate::service::{DecodedAnimation, ServiceError};
use crate::session::{EditorSession, Liveness, SessionState};

/// Where the artwork ended up after the fetch fallbacks.
enum ArtworkSource {
    Bytes(Vec<u8>),
    /// Nothing fetchable; the editor loads `artworkSourceUrl` itself.
    Url,
}

impl EditorBridge {
    /// Mount an editor session for editing the post `post_sqid`.
    ///
    /// The session exists (in `Idle`) while the post loads, so an unmount in
    /// the meantime cancels the load; the call then returns
    /// [`BridgeError::Cancelled`] without notifying the user.
    pub async fn mount_post(&self, origin: Origin, post_sqid: &str) -> Result<Uuid> {
        let session = EditorSession::new(origin);
        let liveness = session.liveness.clone();
        let id = self.install(session);

        match self.load_edit_target(post_sqid, &liveness).await {
            Ok(target) => self
                .with_live_session(id, |s| {
                    s.stage(Some(target));
                    s.state = SessionState::AwaitingReady;
                })
                .map(|()| id)
                .ok_or(BridgeError::Cancelled),
            Err(e) if !liveness.is_alive() => {
                debug!(session = %id, error = %e, "edit target load abandoned");
                Err(BridgeError::Cancelled)
            }
            Err(BridgeError::Service(ServiceError::Unauthorized)) => {
                self.expire_session(id);
                Err(ServiceError::Unauthorized.into())
            }
            Err(e) => {
                warn!(session = %id, post = post_sqid, error = %e, "failed to load artwork for editing");
                self.with_live_session(id, EditorSession::close);
                self.inner
                    .host
                    .notify_error(&format!("Failed to load artwork for editing: {e}"));
                Err(e)
            }
        }
    }

    /// Resolve a post and prepare what the editor needs to edit it.
    ///
    /// The post metadata must load; the artwork bytes are best effort. When
    /// neither the direct fetch nor the data-URI path works, the target has no
    /// payload and the editor falls back to the source URL.
    pub async fn load_edit_target(&self, post_sqid: &str, liveness: &Liveness) -> Result<EditTarget> {
        let artwork = &self.inner.artwork;
        let post = self
            .call_with_refresh(liveness, move || artwork.fetch_post(post_sqid))
            .await?;
        ensure_alive(liveness)?;

        let format = ArtworkFormat::detect(post.file_format.as_deref(), &post.mime_type, post.frame_count)
            .ok_or_else(|| {
                BridgeError::UnsupportedFormat(
                    post.file_format.clone().unwrap_or_else(|| post.mime_type.clone()),
                )
            })?;
        let mut context = EditContext::for_post(&post, format);

        let payload = match self.fetch_artwork(&post.art_url, liveness).await? {
            ArtworkSource::Bytes(bytes) => {
                ensure_alive(liveness)?;
                Some(self.prepare_payload(format, bytes, &mut context, liveness).await?)
            }
            ArtworkSource::Url => {
                ensure_alive(liveness)?;
                debug!(post = post_sqid, "artwork not fetchable; editor will load the source URL");
                None
            }
        };

        info!(
            post = post_sqid,
            format = format.as_str(),
            bytes = payload.as_ref().map_or(0, EditPayload::byte_len),
            "edit target loaded"
        );
        Ok(EditTarget::new(context, payload))
    }

    async fn fetch_artwork(&self, url: &str, liveness: &Liveness) -> Result<ArtworkSource> {
        if url.is_empty() {
            return Err(BridgeError::MissingArtwork);
        }

        match self.inner.artwork.fetch_binary(url).await {
            Ok(bytes) => return Ok(ArtworkSource::Bytes(bytes)),
            Err(e) => debug!(error = %e, "direct artwork fetch failed; trying data URI"),
        }
        ensure_alive(liveness)?;

        match self.inner.artwork.fetch_data_uri(url).await {
            Ok(uri) => match decode_data_uri(&uri) {
                Ok((_, bytes)) => return Ok(ArtworkSource::Bytes(bytes)),
                Err(e) => debug!(error = %e, "artwork data URI unreadable"),
            },
            Err(e) => debug!(error = %e, "data URI artwork fetch failed"),
        }

        Ok(ArtworkSource::Url)
    }

    /// Animated WebP is decoded into RGBA frames when a decoder is available;
    /// everything else goes to the editor encoded.
    async fn prepare_payload(
        &self,
        format: ArtworkFormat,
        bytes: Vec<u8>,
        context: &mut EditContext,
        liveness: &Liveness,
    ) -> Result<EditPayload> {
        if format != ArtworkFormat::WebpAnimated {
            return Ok(EditPayload::Encoded {
                format: format.encoded(),
                bytes,
            });
        }
        let Some(decoder) = &self.inner.decoder else {
            debug!("no frame decoder configured; sending animated WebP encoded");
            return Ok(EditPayload::Encoded {
                format: EncodedFormat::Webp,
                bytes,
            });
        };

        let decoded = decoder.decode_animated_webp(&bytes).await;
        ensure_alive(liveness)?;
        match decoded {
            Ok(animation) if is_usable(&animation) => {
                let fps = fps_from_durations(&animation.durations_ms);
                context.frame_count = Some(animation.frames.len() as u32);
                context.width = Some(animation.width);
                context.height = Some(animation.height);
                context.frame_durations_ms = Some(animation.durations_ms.clone());
                context.fps = Some(fps);
                Ok(EditPayload::Frames(FrameSet::new(
                    animation.width,
                    animation.height,
                    fps,
                    animation.frames,
                    animation.durations_ms,
                )))
            }
            Ok(_) => {
                warn!("animated WebP decode produced unusable frames; sending encoded bytes");
                Ok(EditPayload::Encoded {
                    format: EncodedFormat::Webp,
                    bytes,
                })
            }
            Err(e) => {
                warn!(error = %e, "animated WebP decode failed; sending encoded bytes");
                Ok(EditPayload::Encoded {
                    format: EncodedFormat::Webp,
                    bytes,
                })
            }
        }
    }
}

/// Decoder output comes from outside the crate; only well-formed frame sets
/// are turned into a [`FrameSet`].
fn is_usable(animation: &DecodedAnimation) -> bool {
    let Some(frame_len) = rgba_frame_len(animation.width, animation.height) else {
        return false;
    };
    !animation.frames.is_empty()
        && frame_len > 0
        && animation.frames.len() == animation.durations_ms.len()
        && animation.frames.iter().all(|f| f.len() == frame_len)
}
