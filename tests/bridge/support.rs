//! Fakes for the bridge's collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use makapix_bridge::{
    ArtworkFormat, ArtworkService, ArtworkUpload, Blob, BlobSource, BridgeCollaborators, BridgeError,
    BridgeOptions, DecodedAnimation, EditContext, EditPayload, EditTarget, EditorBridge, EditorPort,
    EncodedFormat, FrameDecoder, HostController, MemoryStore, MessageEvent, NavigationTarget, Origin,
    OutboundMessage, PortError, Post, ServiceError, TokenStore, Transfer,
};
use serde_json::{json, Value};
use tokio::sync::Notify;

pub const EDITOR_ORIGIN: &str = "https://editor.example.com";
pub const HOST_PATH: &str = "/editor?post=p-1";

pub fn editor_origin() -> Origin {
    Origin::parse(EDITOR_ORIGIN).unwrap()
}

// ============================================================================
// Messages
// ============================================================================

/// A message event from the trusted editor origin.
pub fn event(data: Value) -> MessageEvent {
    MessageEvent::new(EDITOR_ORIGIN, data)
}

pub fn ready() -> MessageEvent {
    event(json!({ "type": "EDITOR_READY" }))
}

pub fn export_event(name: &str, width: i64, height: i64, frame_count: Option<i64>) -> MessageEvent {
    let mut data = json!({ "type": "EXPORT", "name": name, "width": width, "height": height });
    if let Some(count) = frame_count {
        data["frameCount"] = json!(count);
    }
    event(data).with_blob(Blob::from_bytes("image/png", vec![0x89, b'P', b'N', b'G']))
}

pub fn replace_event(original_post_sqid: &str) -> MessageEvent {
    event(json!({ "type": "REPLACE", "name": "edited.png", "originalPostSqid": original_post_sqid }))
        .with_blob(Blob::from_bytes("image/png", vec![1, 2, 3, 4]))
}

/// Edit target for an existing PNG post with its bytes staged.
pub fn png_target(post_sqid: &str, bytes: Vec<u8>) -> EditTarget {
    EditTarget::new(
        EditContext {
            post_sqid: post_sqid.to_string(),
            artwork_source_url: format!("https://vault.example.com/{post_sqid}"),
            title: "Sunset".to_string(),
            declared_format: ArtworkFormat::Png,
            frame_count: None,
            width: Some(8),
            height: Some(8),
            frame_durations_ms: None,
            fps: None,
        },
        Some(EditPayload::Encoded {
            format: EncodedFormat::Png,
            bytes,
        }),
    )
}

// ============================================================================
// Tokens
// ============================================================================

pub struct FakeTokens {
    pub access: Mutex<Option<String>>,
    pub user_sqid: Option<String>,
    /// Token installed by a successful refresh; `None` makes refresh fail.
    pub refreshed_token: Mutex<Option<String>>,
    pub refresh_calls: AtomicUsize,
    pub cleared: AtomicBool,
}

impl FakeTokens {
    pub fn signed_in(access: &str) -> Self {
        Self {
            access: Mutex::new(Some(access.to_string())),
            user_sqid: Some("u-1".to_string()),
            refreshed_token: Mutex::new(None),
            refresh_calls: AtomicUsize::new(0),
            cleared: AtomicBool::new(false),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            access: Mutex::new(None),
            user_sqid: None,
            ..Self::signed_in("")
        }
    }

    pub fn refreshing_to(self, token: &str) -> Self {
        *self.refreshed_token.lock().unwrap() = Some(token.to_string());
        self
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn was_cleared(&self) -> bool {
        self.cleared.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for FakeTokens {
    fn access_token(&self) -> Option<String> {
        self.access.lock().unwrap().clone()
    }

    fn user_sqid(&self) -> Option<String> {
        self.user_sqid.clone()
    }

    async fn refresh_access_token(&self) -> bool {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let next = self.refreshed_token.lock().unwrap().clone();
        match next {
            Some(token) => {
                *self.access.lock().unwrap() = Some(token);
                true
            }
            None => false,
        }
    }

    fn clear_tokens(&self) {
        self.cleared.store(true, Ordering::SeqCst);
        *self.access.lock().unwrap() = None;
    }
}

// ============================================================================
// Artwork service
// ============================================================================

#[derive(Default)]
pub struct FakeArtwork {
    pub posts: Mutex<HashMap<String, Post>>,
    pub binary: Mutex<HashMap<String, Vec<u8>>>,
    pub data_uris: Mutex<HashMap<String, String>>,
    /// Number of upcoming `fetch_post` calls that answer 401.
    pub unauthorized_fetches: AtomicUsize,
    pub fetch_post_calls: AtomicUsize,
    pub uploads: Mutex<Vec<(String, ArtworkUpload)>>,
    pub data_uri_calls: AtomicUsize,
    /// The gated call signals `started` and waits for `release`.
    pub gate: Mutex<Option<Call>>,
    pub started: Notify,
    pub release: Notify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    FetchPost,
    FetchBinary,
    Upload,
}

impl FakeArtwork {
    pub fn with_post(self, post: Post) -> Self {
        self.posts.lock().unwrap().insert(post.public_sqid.clone(), post);
        self
    }

    pub fn with_binary(self, url: &str, bytes: Vec<u8>) -> Self {
        self.binary.lock().unwrap().insert(url.to_string(), bytes);
        self
    }

    pub fn with_data_uri(self, url: &str, uri: &str) -> Self {
        self.data_uris.lock().unwrap().insert(url.to_string(), uri.to_string());
        self
    }

    pub fn gated(self) -> Self {
        self.gated_on(Call::FetchPost)
    }

    pub fn gated_on(self, call: Call) -> Self {
        *self.gate.lock().unwrap() = Some(call);
        self
    }

    pub fn fetch_post_calls(&self) -> usize {
        self.fetch_post_calls.load(Ordering::SeqCst)
    }

    pub fn data_uri_calls(&self) -> usize {
        self.data_uri_calls.load(Ordering::SeqCst)
    }

    async fn pass_gate(&self, call: Call) {
        let gated = *self.gate.lock().unwrap() == Some(call);
        if gated {
            self.started.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl ArtworkService for FakeArtwork {
    async fn fetch_post(&self, post_sqid: &str) -> Result<Post, ServiceError> {
        self.fetch_post_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(Call::FetchPost).await;
        let pending_401 = self.unauthorized_fetches.load(Ordering::SeqCst);
        if pending_401 > 0 {
            self.unauthorized_fetches.store(pending_401 - 1, Ordering::SeqCst);
            return Err(ServiceError::Unauthorized);
        }
        self.posts
            .lock()
            .unwrap()
            .get(post_sqid)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        self.pass_gate(Call::FetchBinary).await;
        self.binary
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ServiceError::Network("blocked by CORS".to_string()))
    }

    async fn fetch_data_uri(&self, url: &str) -> Result<String, ServiceError> {
        self.data_uri_calls.fetch_add(1, Ordering::SeqCst);
        self.data_uris
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn upload_replacement(&self, post_id: &str, artwork: &ArtworkUpload) -> Result<(), ServiceError> {
        self.pass_gate(Call::Upload).await;
        self.uploads
            .lock()
            .unwrap()
            .push((post_id.to_string(), artwork.clone()));
        Ok(())
    }
}

pub fn post(sqid: &str, mime_type: &str, file_format: Option<&str>, frame_count: Option<u32>) -> Post {
    Post {
        id: format!("id-{sqid}"),
        public_sqid: sqid.to_string(),
        title: format!("Artwork {sqid}"),
        art_url: format!("https://vault.example.com/{sqid}"),
        mime_type: mime_type.to_string(),
        frame_count,
        file_format: file_format.map(str::to_string),
        width: Some(16),
        height: Some(16),
    }
}

// ============================================================================
// Blobs
// ============================================================================

/// Blob whose read signals `started`, waits for `release`, then yields
/// `result`.
pub struct GatedBlob {
    pub started: Notify,
    pub release: Notify,
    result: Result<Vec<u8>, String>,
}

impl GatedBlob {
    pub fn reading(bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            started: Notify::new(),
            release: Notify::new(),
            result: Ok(bytes),
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            started: Notify::new(),
            release: Notify::new(),
            result: Err(reason.to_string()),
        })
    }
}

#[async_trait]
impl BlobSource for GatedBlob {
    async fn read(&self) -> Result<Vec<u8>, BridgeError> {
        self.started.notify_one();
        self.release.notified().await;
        self.result.clone().map_err(BridgeError::BlobRead)
    }
}

/// Blob whose read fails immediately.
pub struct UnreadableBlob;

#[async_trait]
impl BlobSource for UnreadableBlob {
    async fn read(&self) -> Result<Vec<u8>, BridgeError> {
        Err(BridgeError::BlobRead("NotReadableError".to_string()))
    }
}

/// `EXPORT` whose blob is read through `source`.
pub fn export_event_from(name: &str, source: Arc<dyn BlobSource>) -> MessageEvent {
    event(json!({ "type": "EXPORT", "name": name, "width": 32, "height": 32, "frameCount": 1 }))
        .with_blob(Blob::from_source("image/png", source))
}

// ============================================================================
// Frame decoder
// ============================================================================

pub struct FakeDecoder {
    pub result: Result<DecodedAnimation, String>,
}

#[async_trait]
impl FrameDecoder for FakeDecoder {
    async fn decode_animated_webp(&self, _bytes: &[u8]) -> Result<DecodedAnimation, BridgeError> {
        self.result.clone().map_err(BridgeError::Decode)
    }
}

// ============================================================================
// Host + port
// ============================================================================

#[derive(Default)]
pub struct FakeHost {
    pub navigations: Mutex<Vec<NavigationTarget>>,
    pub errors: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn navigations(&self) -> Vec<NavigationTarget> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl HostController for FakeHost {
    fn current_path(&self) -> String {
        HOST_PATH.to_string()
    }

    fn navigate(&self, target: NavigationTarget) {
        self.navigations.lock().unwrap().push(target);
    }

    fn notify_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

#[derive(Debug)]
pub struct Posted {
    pub kind: &'static str,
    pub data: Value,
    pub transfer: Transfer,
    pub target_origin: String,
}

#[derive(Default)]
pub struct RecordingPort {
    pub posted: Mutex<Vec<Posted>>,
    pub fail: AtomicBool,
}

impl RecordingPort {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.posted.lock().unwrap().iter().map(|p| p.kind).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.posted.lock().unwrap().iter().filter(|p| p.kind == kind).count()
    }

    /// JSON body of the first message of `kind`.
    pub fn first(&self, kind: &str) -> Option<Value> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.kind == kind)
            .map(|p| p.data.clone())
    }
}

impl EditorPort for RecordingPort {
    fn post(&self, message: OutboundMessage, target_origin: &Origin) -> Result<(), PortError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::WindowUnavailable);
        }
        let kind = message.kind();
        let (data, transfer) = message
            .into_parts()
            .map_err(|e| PortError::PostFailed(e.to_string()))?;
        self.posted.lock().unwrap().push(Posted {
            kind,
            data,
            transfer,
            target_origin: target_origin.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub bridge: EditorBridge,
    pub tokens: Arc<FakeTokens>,
    pub artwork: Arc<FakeArtwork>,
    pub host: Arc<FakeHost>,
    pub port: Arc<RecordingPort>,
    pub handoff: Arc<MemoryStore>,
}

pub struct HarnessBuilder {
    tokens: FakeTokens,
    artwork: FakeArtwork,
    decoder: Option<FakeDecoder>,
    handoff: MemoryStore,
    options: BridgeOptions,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            tokens: FakeTokens::signed_in("access-1"),
            artwork: FakeArtwork::default(),
            decoder: None,
            handoff: MemoryStore::new(),
            options: BridgeOptions::default(),
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Mount a fresh-canvas session and complete the handshake.
    pub async fn ready_session(&self) {
        self.bridge.mount(editor_origin(), None);
        self.bridge.on_message(ready()).await;
    }
}

impl HarnessBuilder {
    pub fn tokens(mut self, tokens: FakeTokens) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn artwork(mut self, artwork: FakeArtwork) -> Self {
        self.artwork = artwork;
        self
    }

    pub fn decoder(mut self, decoder: FakeDecoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn handoff(mut self, store: MemoryStore) -> Self {
        self.handoff = store;
        self
    }

    pub fn options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Harness {
        let tokens = Arc::new(self.tokens);
        let artwork = Arc::new(self.artwork);
        let host = Arc::new(FakeHost::default());
        let port = Arc::new(RecordingPort::default());
        let handoff = Arc::new(self.handoff);
        let bridge = EditorBridge::new(
            BridgeCollaborators {
                tokens: tokens.clone(),
                artwork: artwork.clone(),
                host: host.clone(),
                port: port.clone(),
                handoff_store: handoff.clone(),
                decoder: self
                    .decoder
                    .map(|d| Arc::new(d) as Arc<dyn FrameDecoder>),
            },
            self.options,
        );
        Harness {
            bridge,
            tokens,
            artwork,
            host,
            port,
            handoff,
        }
    }
}
