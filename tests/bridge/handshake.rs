use std::sync::atomic::Ordering;

use makapix_bridge::protocol::outbound::{MAKAPIX_EDIT_PNG, MAKAPIX_INIT};
use makapix_bridge::{
    Blob, DecodeError, Dispatch, DropReason, InboundKind, InitOutcome, MessageEvent, SessionState,
    Transfer,
};
use serde_json::json;

use crate::support::*;

// ============================================================================
// Origin filtering
// ============================================================================

#[tokio::test]
async fn forged_origin_after_ready_changes_nothing() {
    let h = Harness::new();
    h.ready_session().await;
    assert_eq!(h.bridge.state(), SessionState::Ready);
    let posted_before = h.port.kinds();

    let forged = MessageEvent::new(
        "https://evil.example.com",
        json!({ "type": "EXPORT", "name": "x", "width": 1, "height": 1 }),
    )
    .with_blob(Blob::from_bytes("image/png", vec![1]));
    let outcome = h.bridge.on_message(forged).await;

    assert_eq!(outcome, Dispatch::Dropped(DropReason::UntrustedOrigin));
    assert_eq!(h.bridge.state(), SessionState::Ready);
    assert_eq!(h.port.kinds(), posted_before);
    assert!(h.handoff.is_empty());
    assert!(h.host.navigations().is_empty());

    let forged_ready = MessageEvent::new("https://evil.example.com", json!({ "type": "EDITOR_READY" }));
    h.bridge.on_message(forged_ready).await;
    assert_eq!(h.port.count(MAKAPIX_INIT), 1);
}

#[tokio::test]
async fn origin_comparison_is_exact() {
    let h = Harness::new();
    h.bridge.mount(editor_origin(), None);

    for origin in [
        "http://editor.example.com",
        "https://editor.example.com:8443",
        "https://sub.editor.example.com",
        "null",
    ] {
        let outcome = h
            .bridge
            .on_message(MessageEvent::new(origin, json!({ "type": "EDITOR_READY" })))
            .await;
        assert_eq!(outcome, Dispatch::Dropped(DropReason::UntrustedOrigin), "{origin}");
    }
    assert_eq!(h.bridge.state(), SessionState::AwaitingReady);
    assert!(h.port.kinds().is_empty());
}

#[tokio::test]
async fn messages_without_a_session_are_dropped() {
    let h = Harness::new();
    assert_eq!(h.bridge.on_message(ready()).await, Dispatch::Dropped(DropReason::NotMounted));
}

// ============================================================================
// Tag validation + state gating
// ============================================================================

#[tokio::test]
async fn unknown_and_untyped_messages_are_ignored() {
    let h = Harness::new();
    h.ready_session().await;

    assert_eq!(
        h.bridge.on_message(event(json!({ "type": "PING" }))).await,
        Dispatch::Dropped(DropReason::Decode(DecodeError::UnknownType("PING".into())))
    );
    assert_eq!(
        h.bridge.on_message(event(json!("EDITOR_READY"))).await,
        Dispatch::Dropped(DropReason::Decode(DecodeError::MissingType))
    );
    assert_eq!(h.bridge.state(), SessionState::Ready);
}

#[tokio::test]
async fn export_before_ready_is_out_of_state() {
    let h = Harness::new();
    h.bridge.mount(editor_origin(), None);

    let outcome = h.bridge.on_message(export_event("early", 8, 8, None)).await;
    assert_eq!(
        outcome,
        Dispatch::Dropped(DropReason::OutOfState {
            kind: InboundKind::Export,
            state: SessionState::AwaitingReady,
        })
    );
    assert!(h.handoff.is_empty());
}

// ============================================================================
// INIT
// ============================================================================

#[tokio::test]
async fn ready_sends_init_with_token_and_user() {
    let h = Harness::new();
    h.ready_session().await;

    assert_eq!(h.port.kinds(), vec![MAKAPIX_INIT]);
    let init = h.port.first(MAKAPIX_INIT).unwrap();
    assert_eq!(
        init,
        json!({ "type": "MAKAPIX_INIT", "accessToken": "access-1", "userSqid": "u-1" })
    );
    let posted = h.port.posted.lock().unwrap();
    assert_eq!(posted[0].target_origin, EDITOR_ORIGIN);
    assert_eq!(posted[0].transfer, Transfer::None);
}

#[tokio::test]
async fn token_less_mount_sends_no_init() {
    let h = Harness::builder().tokens(FakeTokens::signed_out()).build();
    h.bridge.mount(editor_origin(), Some(png_target("p-1", vec![1, 2, 3])));

    let outcome = h.bridge.on_message(ready()).await;

    assert_eq!(outcome, Dispatch::Handled(InboundKind::EditorReady));
    assert!(h.port.kinds().is_empty());
    assert_eq!(h.bridge.state(), SessionState::Ready);
    assert!(h.bridge.has_staged_payload());
}

#[tokio::test]
async fn missing_user_sqid_serializes_as_null() {
    let mut tokens = FakeTokens::signed_in("access-1");
    tokens.user_sqid = None;
    let h = Harness::builder().tokens(tokens).build();
    h.ready_session().await;

    let init = h.port.first(MAKAPIX_INIT).unwrap();
    assert_eq!(init["userSqid"], serde_json::Value::Null);
}

#[tokio::test]
async fn send_init_requires_ready_and_runs_once_per_ready() {
    let h = Harness::new();
    h.bridge.mount(editor_origin(), None);
    assert_eq!(h.bridge.send_init(), InitOutcome::NotReady);

    h.bridge.on_message(ready()).await;
    assert_eq!(h.bridge.send_init(), InitOutcome::AlreadySent);
    assert_eq!(h.port.count(MAKAPIX_INIT), 1);
}

// ============================================================================
// One-shot payload transfer
// ============================================================================

#[tokio::test]
async fn init_is_followed_by_edit_payload() {
    let h = Harness::new();
    h.bridge.mount(editor_origin(), Some(png_target("p-1", vec![7; 64])));
    h.bridge.on_message(ready()).await;

    assert_eq!(h.port.kinds(), vec![MAKAPIX_INIT, MAKAPIX_EDIT_PNG]);

    let init = h.port.first(MAKAPIX_INIT).unwrap();
    assert_eq!(init["editMode"]["postSqid"], "p-1");
    assert_eq!(init["editMode"]["declaredFormat"], "png");

    let posted = h.port.posted.lock().unwrap();
    assert_eq!(
        posted[1].data,
        json!({ "type": "MAKAPIX_EDIT_PNG", "postSqid": "p-1", "pngDataSize": 64 })
    );
    assert_eq!(
        posted[1].transfer,
        Transfer::Single {
            field: "pngData",
            buffer: vec![7; 64],
        }
    );
    drop(posted);

    assert!(!h.bridge.has_staged_payload());
    assert!(h.bridge.payload_transferred());
    assert_eq!(h.bridge.state(), SessionState::Ready);
}

#[tokio::test]
async fn second_ready_does_not_resend_payload() {
    let h = Harness::new();
    h.bridge.mount(editor_origin(), Some(png_target("p-1", vec![1, 2, 3])));

    h.bridge.on_message(ready()).await;
    h.bridge.on_message(ready()).await;

    assert_eq!(h.port.count(MAKAPIX_INIT), 2);
    assert_eq!(h.port.count(MAKAPIX_EDIT_PNG), 1);
}

#[tokio::test]
async fn failed_init_post_keeps_payload_for_next_ready() {
    let h = Harness::new();
    h.bridge.mount(editor_origin(), Some(png_target("p-1", vec![1, 2, 3])));

    h.port.fail.store(true, Ordering::SeqCst);
    h.bridge.on_message(ready()).await;
    assert!(h.bridge.has_staged_payload());

    h.port.fail.store(false, Ordering::SeqCst);
    h.bridge.on_message(ready()).await;
    assert_eq!(h.port.kinds(), vec![MAKAPIX_INIT, MAKAPIX_EDIT_PNG]);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn unmount_is_idempotent_and_silences_the_session() {
    let h = Harness::new();
    h.bridge.mount(editor_origin(), Some(png_target("p-1", vec![1])));

    h.bridge.unmount();
    h.bridge.unmount();
    assert_eq!(h.bridge.state(), SessionState::Closed);
    assert!(!h.bridge.has_staged_payload());

    let outcome = h.bridge.on_message(ready()).await;
    assert_eq!(
        outcome,
        Dispatch::Dropped(DropReason::OutOfState {
            kind: InboundKind::EditorReady,
            state: SessionState::Closed,
        })
    );
    assert!(h.port.kinds().is_empty());
}

#[tokio::test]
async fn remount_replaces_the_previous_session() {
    let h = Harness::new();
    let first = h.bridge.mount(editor_origin(), Some(png_target("p-1", vec![1])));
    let second = h.bridge.mount(editor_origin(), None);

    assert_ne!(first, second);
    assert_eq!(h.bridge.session_id(), Some(second));
    assert_eq!(h.bridge.state(), SessionState::AwaitingReady);
    assert!(h.bridge.edit_context().is_none());

    h.bridge.on_message(ready()).await;
    assert_eq!(h.port.kinds(), vec![MAKAPIX_INIT]);
}
