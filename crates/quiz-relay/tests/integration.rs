use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use quiz_core::protocol::{LeaderboardEntry, ServerMessage};
use quiz_relay::config::Config;
use quiz_relay::state::AppState;
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

fn test_config() -> Config {
    let mut config = Config::default();
    config.leaderboard.broadcast_interval_ms = 50;
    config
}

/// Spin up a test server on a random port, return the base URL and state.
async fn start_server(config: Config) -> (String, Arc<AppState>) {
    let (app, state, _tasks) = quiz_relay::build_app(config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{}", port), state)
}

async fn ws_connect(base: &str) -> (WsSink, WsStream) {
    let url = format!("{}/ws", base.replace("http://", "ws://"));
    let (stream, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    stream.split()
}

async fn ws_send(sink: &mut WsSink, msg: serde_json::Value) {
    sink.send(Message::Text(msg.to_string().into())).await.unwrap();
}

async fn join(sink: &mut WsSink, username: &str, avatar: &str) {
    ws_send(
        sink,
        json!({"event": "join", "data": {"username": username, "avatarUrl": avatar}}),
    )
    .await;
}

/// Receive leaderboard snapshots until one satisfies `pred`.
async fn recv_leaderboard_until(
    stream: &mut WsStream,
    pred: impl Fn(&[LeaderboardEntry]) -> bool,
) -> Vec<LeaderboardEntry> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            panic!("Timed out waiting for leaderboard");
        }
        let msg = tokio::time::timeout(remaining, stream.next())
            .await
            .expect("Timed out waiting for leaderboard")
            .unwrap()
            .unwrap();

        if let Message::Text(text) = msg {
            let ServerMessage::LeaderboardUpdate(entries) =
                serde_json::from_str::<ServerMessage>(&text).unwrap();
            if pred(&entries) {
                return entries;
            }
        }
    }
}

/// Poll until `cond` holds or five seconds pass.
async fn wait_for(cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("Condition not met in time");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let (base, _state) = start_server(test_config()).await;
    let resp = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(resp, "ok");
}

#[tokio::test]
async fn test_leaderboard_starts_empty() {
    let (base, _state) = start_server(test_config()).await;
    let entries: Vec<LeaderboardEntry> = reqwest::get(format!("{}/leaderboard", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_join_and_progress_are_broadcast() {
    let (base, _state) = start_server(test_config()).await;
    let (mut sink, mut stream) = ws_connect(&base).await;

    join(&mut sink, "alice", "A1").await;
    let entries = recv_leaderboard_until(&mut stream, |e| !e.is_empty()).await;
    assert_eq!(entries[0].username, "alice");
    assert_eq!(entries[0].avatar_url, "A1");
    assert_eq!(entries[0].status, "Just Joined");
    assert_eq!(entries[0].rank, 1);

    ws_send(
        &mut sink,
        json!({"event": "update_progress", "data": {"score": 40, "status": "Round 1"}}),
    )
    .await;
    let entries = recv_leaderboard_until(&mut stream, |e| e.first().is_some_and(|p| p.score == 40)).await;
    assert_eq!(entries[0].status, "Round 1");
}

#[tokio::test]
async fn test_observer_sees_ranked_players() {
    let (base, _state) = start_server(test_config()).await;
    let (mut sink1, _stream1) = ws_connect(&base).await;
    let (mut sink2, _stream2) = ws_connect(&base).await;
    let (_observer_sink, mut observer) = ws_connect(&base).await;

    join(&mut sink1, "alice", "").await;
    join(&mut sink2, "bob", "").await;
    ws_send(&mut sink1, json!({"event": "update_progress", "data": {"score": 10}})).await;
    ws_send(&mut sink2, json!({"event": "update_progress", "data": {"score": 90}})).await;

    let entries = recv_leaderboard_until(&mut observer, |e| {
        e.len() == 2 && e[0].score == 90 && e[1].score == 10
    })
    .await;
    assert_eq!(entries[0].username, "bob");
    assert_eq!(entries[0].rank, 1);
    assert_eq!(entries[1].username, "alice");
    assert_eq!(entries[1].rank, 2);
}

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    let (base, state) = start_server(test_config()).await;
    let (mut sink, mut stream) = ws_connect(&base).await;

    sink.send(Message::Text("not json".into())).await.unwrap();
    ws_send(&mut sink, json!({"event": "join", "data": {"username": ""}})).await;
    ws_send(&mut sink, json!({"event": "update_progress", "data": {"score": 5}})).await;

    join(&mut sink, "carol", "").await;
    ws_send(&mut sink, json!({"event": "update_progress", "data": {"score": -3}})).await;
    ws_send(&mut sink, json!({"event": "update_progress", "data": {"status": "Round 2"}})).await;

    let entries = recv_leaderboard_until(&mut stream, |e| {
        e.first().is_some_and(|p| p.status == "Round 2")
    })
    .await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].username, "carol");
    assert_eq!(entries[0].score, 0);
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn test_no_broadcast_without_players() {
    let (base, _state) = start_server(test_config()).await;
    let (_sink, mut stream) = ws_connect(&base).await;

    let got = tokio::time::timeout(Duration::from_millis(300), stream.next()).await;
    assert!(got.is_err(), "expected no snapshot while the registry is empty");
}

#[tokio::test]
async fn test_disconnect_keeps_player_until_rejoin() {
    let (base, state) = start_server(test_config()).await;

    {
        let (mut sink, _stream) = ws_connect(&base).await;
        join(&mut sink, "dave", "D1").await;
        ws_send(
            &mut sink,
            json!({"event": "update_progress", "data": {"score": 55, "status": "Round 3"}}),
        )
        .await;
        wait_for(|| state.registry.get("dave").is_some_and(|r| r.score == 55)).await;
        sink.send(Message::Close(None)).await.unwrap();
    }

    wait_for(|| state.registry.get("dave").is_some_and(|r| !r.is_active())).await;
    assert_eq!(state.connections.len(), 0);

    let (mut sink, mut stream) = ws_connect(&base).await;
    join(&mut sink, "dave", "").await;
    wait_for(|| state.registry.get("dave").is_some_and(|r| r.is_active())).await;

    let entries = recv_leaderboard_until(&mut stream, |e| !e.is_empty()).await;
    assert_eq!(entries[0].score, 55);
    assert_eq!(entries[0].status, "Round 3");
    assert_eq!(entries[0].avatar_url, "D1");
}

#[tokio::test]
async fn test_evicted_player_starts_over() {
    let mut config = test_config();
    config.retention.player_ttl_secs = 0;
    config.retention.sweep_interval_secs = 1;
    let (base, state) = start_server(config).await;

    {
        let (mut sink, _stream) = ws_connect(&base).await;
        join(&mut sink, "alice", "A1").await;
        ws_send(
            &mut sink,
            json!({"event": "update_progress", "data": {"score": 40, "status": "Round 1"}}),
        )
        .await;
        wait_for(|| state.registry.get("alice").is_some_and(|r| r.score == 40)).await;
        sink.send(Message::Close(None)).await.unwrap();
    }

    wait_for(|| state.registry.get("alice").is_none()).await;

    let (mut sink, _stream) = ws_connect(&base).await;
    join(&mut sink, "alice", "A1").await;
    wait_for(|| state.registry.get("alice").is_some()).await;

    let record = state.registry.get("alice").unwrap();
    assert_eq!(record.score, 0);
    assert_eq!(record.status, "Just Joined");
}

#[tokio::test]
async fn test_connection_limit() {
    let mut config = test_config();
    config.server.max_connections = 1;
    let (base, state) = start_server(config).await;

    let (_sink, _stream) = ws_connect(&base).await;
    wait_for(|| state.connection_count() == 1).await;

    let url = format!("{}/ws", base.replace("http://", "ws://"));
    assert!(tokio_tungstenite::connect_async(&url).await.is_err());
}

#[tokio::test]
async fn test_seeded_bots_are_listed() {
    let mut config = test_config();
    config.bots.push(quiz_relay::config::BotSeed {
        username: "PromptBot".into(),
        avatar_url: "bot.png".into(),
        score: 80,
        status: "Finished".into(),
    });
    let (base, _state) = start_server(config).await;

    let entries: Vec<LeaderboardEntry> = reqwest::get(format!("{}/leaderboard", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_bot);
    assert_eq!(entries[0].score, 80);
}
