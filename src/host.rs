//! Host-page collaborators: navigation, notifications and the outbound port.

use crate::error::PortError;
use crate::origin::Origin;
use crate::protocol::OutboundMessage;

/// Where the host page should go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationTarget {
    /// Authentication entry point; `return_to` is the path to come back to.
    Authenticate { return_to: String },
    /// Upload/submit surface that consumes the export hand-off record.
    SubmitArtwork,
    /// Canonical view of a post.
    ArtworkView { public_sqid: String },
}

/// The page that mounts the editor.
pub trait HostController: Send + Sync {
    /// Current path (with query) to return to after re-authenticating.
    fn current_path(&self) -> String;

    fn navigate(&self, target: NavigationTarget);

    /// Show a blocking, user-visible error.
    fn notify_error(&self, message: &str);
}

/// Outbound channel into the editor frame (`contentWindow.postMessage`).
///
/// `post` takes the message by value: buffers inside payload messages are
/// moved into the platform's transfer list and are gone afterwards.
pub trait EditorPort: Send + Sync {
    fn post(&self, message: OutboundMessage, target_origin: &Origin) -> Result<(), PortError>;
}
