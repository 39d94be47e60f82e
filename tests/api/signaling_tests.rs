//! WebSocket Signaling Tests
//!
//! End-to-end scenarios against a server bound to an ephemeral port.

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite};

use crate::common::{self, TestApp};

#[tokio::test]
async fn test_handshake_without_token_is_unauthorized() {
    let app = TestApp::spawn().await;

    let err = connect_async(app.socket_url()).await.unwrap_err();

    match err {
        tungstenite::Error::Http(response) => assert_eq!(response.status(), 401),
        other => panic!("expected HTTP rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_with_bad_tokens_is_unauthorized() {
    let app = TestApp::spawn().await;
    let expired = common::token_with_exp("u1", chrono::Utc::now().timestamp() - 3600);

    for token in [expired.as_str(), "not-a-jwt"] {
        let url = format!("{}?token={}", app.socket_url(), token);
        match connect_async(url).await {
            Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
            Err(other) => panic!("expected HTTP rejection, got {other:?}"),
            Ok(_) => panic!("handshake with {token} should fail"),
        }
    }
}

#[tokio::test]
async fn test_room_message_reaches_peer_and_acks_sender() {
    let app = TestApp::spawn().await;
    let mut x = app.connect("alice").await;
    let mut y = app.connect_with_query("bob").await;

    x.emit("join_room", json!({"roomId": "r1"})).await;
    assert_eq!(
        x.expect_event("room_joined").await,
        json!({"status": "success", "roomId": "r1", "message": "Successfully joined room"})
    );
    y.emit("join_room", json!({"roomId": "r1"})).await;
    y.expect_event("room_joined").await;

    x.emit_with_ack("send_message", json!({"roomId": "r1", "text": "hi"}), 1)
        .await;

    let received = y.expect_event("receive_message").await;
    assert_eq!(received["text"], "hi");
    assert_eq!(received["roomId"], "r1");
    assert!(received["timestamp"].as_str().is_some_and(|t| !t.is_empty()));

    assert_eq!(
        x.next_event().await,
        json!({"event": "ack", "data": {"id": 1, "status": "success"}})
    );
    x.expect_silence().await;
}

#[tokio::test]
async fn test_typing_reaches_other_members_only() {
    let app = TestApp::spawn().await;
    let mut x = app.connect("alice").await;
    let mut y = app.connect("bob").await;
    for client in [&mut x, &mut y] {
        client.emit("join_room", json!({"roomId": "r1"})).await;
        client.expect_event("room_joined").await;
    }

    x.emit("typing", json!({"roomId": "r1", "isTyping": true})).await;

    assert_eq!(
        y.expect_event("typing").await,
        json!({"roomId": "r1", "isTyping": true})
    );
    x.expect_silence().await;
}

#[tokio::test]
async fn test_third_participant_join_and_signal_relay() {
    let app = TestApp::spawn().await;
    let mut p1 = app.connect("p1").await;
    let mut p2 = app.connect("p2").await;
    let mut p3 = app.connect("p3").await;

    p1.emit("join_call", json!({"channelId": "c1", "userId": "P1"})).await;
    p1.expect_event("channel_joined").await;
    p2.emit("join_call", json!({"channelId": "c1", "userId": "P2"})).await;
    p2.expect_event("channel_joined").await;
    assert_eq!(p1.expect_event("user_joined").await, json!({"userId": "P2"}));

    p3.emit("join_call", json!({"channelId": "c1", "userId": "P3"})).await;

    assert_eq!(
        p3.expect_event("channel_joined").await,
        json!({"participants": ["P1", "P2", "P3"]})
    );
    assert_eq!(p1.expect_event("user_joined").await, json!({"userId": "P3"}));
    assert_eq!(p2.expect_event("user_joined").await, json!({"userId": "P3"}));
    p1.expect_silence().await;
    p2.expect_silence().await;

    p3.emit(
        "call_signal",
        json!({"channelId": "c1", "targetId": "P1", "type": "offer", "payload": {"sdp": "v=0"}}),
    )
    .await;
    assert_eq!(
        p1.expect_event("call_signal").await,
        json!({"type": "offer", "payload": {"sdp": "v=0"}, "senderId": "P3"})
    );
    p2.expect_silence().await;

    // absent target: no event for anyone, no error for the sender
    p3.emit(
        "call_signal",
        json!({"channelId": "c1", "targetId": "ghost", "type": "offer", "payload": {}}),
    )
    .await;
    p3.expect_silence().await;
    p1.expect_silence().await;
}

#[tokio::test]
async fn test_disconnect_announces_user_left() {
    let app = TestApp::spawn().await;
    let mut x = app.connect("x").await;
    let mut y = app.connect("y").await;

    x.emit("join_call", json!({"channelId": "c1", "userId": "u1"})).await;
    x.expect_event("channel_joined").await;
    y.emit("join_call", json!({"channelId": "c1", "userId": "u2"})).await;
    assert_eq!(
        y.expect_event("channel_joined").await,
        json!({"participants": ["u1", "u2"]})
    );

    x.close().await;

    assert_eq!(y.expect_event("user_left").await, json!({"userId": "u1"}));

    // u1 is gone: a new joiner does not see it
    let mut z = app.connect("z").await;
    z.emit("join_call", json!({"channelId": "c1", "userId": "u3"})).await;
    assert_eq!(
        z.expect_event("channel_joined").await,
        json!({"participants": ["u2", "u3"]})
    );
}

#[tokio::test]
async fn test_malformed_frames_keep_connection_open() {
    let app = TestApp::spawn().await;
    let mut x = app.connect("x").await;

    x.send(json!({"no_event": true})).await;
    let reply = x.next_event().await;
    assert_eq!(reply["event"], "error");

    x.emit("unknown_event", json!({})).await;
    assert_eq!(
        x.expect_event("error").await,
        json!({"message": "Malformed event: Unknown event: unknown_event"})
    );

    x.emit_with_ack("send_message", json!({"text": "no room"}), 7).await;
    assert_eq!(
        x.next_event().await,
        json!({"event": "ack", "data": {"id": 7, "error": "Failed to send message"}})
    );

    x.emit("join_room", json!({"roomId": "r1"})).await;
    x.expect_event("room_joined").await;
}

#[tokio::test]
async fn test_silent_client_times_out_and_peers_see_user_left() {
    let mut settings = common::test_settings();
    settings.websocket.ping_interval_ms = 100;
    settings.websocket.idle_timeout_ms = 500;
    let app = TestApp::spawn_with(settings).await;
    let mut x = app.connect("x").await;
    let mut y = app.connect("y").await;

    x.emit("join_call", json!({"channelId": "c1", "userId": "u1"})).await;
    x.expect_event("channel_joined").await;
    y.emit("join_call", json!({"channelId": "c1", "userId": "u2"})).await;
    y.expect_event("channel_joined").await;

    // x stops reading, so it never answers pings; y keeps reading and does
    assert_eq!(y.expect_event("user_left").await, json!({"userId": "u1"}));

    let mut z = app.connect("z").await;
    z.emit("join_call", json!({"channelId": "c1", "userId": "u3"})).await;
    assert_eq!(
        z.expect_event("channel_joined").await,
        json!({"participants": ["u2", "u3"]})
    );
    drop(x);
}

#[tokio::test]
async fn test_stopped_server_refuses_connections() {
    let app = TestApp::spawn().await;
    let url = app.socket_url();
    let client = app.connect("x").await;
    client.close().await;

    app.stop().await;

    assert!(connect_async(url).await.is_err());
}
