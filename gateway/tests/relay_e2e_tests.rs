//! End-to-end relay tests
//!
//! Spins up the real router on an ephemeral port and drives it with a
//! WebSocket client, using a mock completion provider.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use relay_gateway::{
    CompletionError, CompletionProvider, CompletionResult, Role, ServerConfig, Turn,
    config::{DEFAULT_SYSTEM_PROMPT, DEFAULT_WELCOME_GREETING},
    handlers::relay::MAX_CONSECUTIVE_VIOLATIONS,
    routes,
    state::AppState,
};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const FALLBACK: &str = "Sorry, please try again.";

// =============================================================================
// Mock provider
// =============================================================================

/// Replies "Hi there" (or fails on demand) and records every transcript
#[derive(Default)]
struct MockProvider {
    fail: bool,
    delay: Option<Duration>,
    seen: Mutex<Vec<Vec<Turn>>>,
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, turns: &[Turn]) -> CompletionResult<String> {
        self.seen.lock().unwrap().push(turns.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(CompletionError::ProviderError("mock outage".to_string()));
        }
        Ok("Hi there".to_string())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        domain: "example.com".to_string(),
        openai_api_key: "sk-test".to_string(),
        openai_base_url: "http://127.0.0.1:9".to_string(),
        openai_model: "gpt-4o-mini".to_string(),
        completion_timeout_seconds: 30,
        completion_max_retries: 0,
        system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        welcome_greeting: DEFAULT_WELCOME_GREETING.to_string(),
        fallback_message: FALLBACK.to_string(),
    }
}

async fn start_server(provider: Arc<MockProvider>) -> (SocketAddr, Arc<AppState>) {
    let state = AppState::with_provider(test_config(), provider);
    let app = routes::create_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

async fn connect(addr: SocketAddr) -> WsClient {
    let url = format!("ws://{addr}/ws");
    let (ws, _) = timeout(Duration::from_secs(5), connect_async(&url))
        .await
        .expect("Connect timed out")
        .expect("Failed to connect");
    ws
}

async fn send_json(ws: &mut WsClient, value: serde_json::Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("Failed to send frame");
}

/// Next text frame, skipping control frames
async fn next_text(ws: &mut WsClient) -> String {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Stream ended")
            .expect("WebSocket error");
        match msg {
            Message::Text(text) => return text.as_str().to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Unexpected frame: {other:?}"),
        }
    }
}

async fn wait_for_session_removal(state: &AppState, call_sid: &str) {
    for _ in 0..100 {
        if !state.sessions.contains(call_sid) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Session {call_sid} was not destroyed");
}

fn setup(call_sid: &str) -> serde_json::Value {
    serde_json::json!({"type": "setup", "callSid": call_sid})
}

fn prompt(text: &str) -> serde_json::Value {
    serde_json::json!({"type": "prompt", "voicePrompt": text})
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_prompt_receives_reply_and_session_is_destroyed() {
    let provider = Arc::new(MockProvider::default());
    let (addr, state) = start_server(provider.clone()).await;
    let mut ws = connect(addr).await;

    send_json(&mut ws, setup("CA123")).await;
    send_json(&mut ws, prompt("Hello")).await;

    let reply = next_text(&mut ws).await;
    assert_eq!(reply, r#"{"type":"text","token":"Hi there","last":true}"#);

    let transcript = state.sessions.transcript("CA123").unwrap();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[0].role, Role::System);
    assert_eq!(transcript[1], Turn::user("Hello"));
    assert_eq!(transcript[2], Turn::assistant("Hi there"));

    ws.close(None).await.unwrap();
    wait_for_session_removal(&state, "CA123").await;
}

#[tokio::test]
async fn test_transcript_grows_across_prompts() {
    let provider = Arc::new(MockProvider::default());
    let (addr, state) = start_server(provider.clone()).await;
    let mut ws = connect(addr).await;

    send_json(&mut ws, setup("CA200")).await;
    for text in ["One", "Two", "Three"] {
        send_json(&mut ws, prompt(text)).await;
        next_text(&mut ws).await;
    }

    let lengths: Vec<usize> = provider
        .seen
        .lock()
        .unwrap()
        .iter()
        .map(Vec::len)
        .collect();
    assert_eq!(lengths, vec![2, 4, 6]);
    assert_eq!(state.sessions.transcript("CA200").unwrap().len(), 7);

    drop(ws);
    wait_for_session_removal(&state, "CA200").await;
}

#[tokio::test]
async fn test_provider_failure_sends_fallback() {
    let provider = Arc::new(MockProvider {
        fail: true,
        ..Default::default()
    });
    let (addr, state) = start_server(provider).await;
    let mut ws = connect(addr).await;

    send_json(&mut ws, setup("CA300")).await;
    send_json(&mut ws, prompt("Hello")).await;

    let reply: serde_json::Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();
    assert_eq!(
        reply,
        serde_json::json!({"type": "text", "token": FALLBACK, "last": true})
    );

    // The user turn stays; the fallback is not recorded
    let transcript = state.sessions.transcript("CA300").unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1], Turn::user("Hello"));
}

#[tokio::test]
async fn test_prompt_before_setup_keeps_connection_open() {
    let provider = Arc::new(MockProvider::default());
    let (addr, state) = start_server(provider.clone()).await;
    let mut ws = connect(addr).await;

    send_json(&mut ws, prompt("Too early")).await;
    send_json(&mut ws, serde_json::json!({"type": "interrupt"})).await;
    ws.send(Message::text("not json")).await.unwrap();

    send_json(&mut ws, setup("CA400")).await;
    send_json(&mut ws, prompt("Hello")).await;
    let reply = next_text(&mut ws).await;
    assert!(reply.contains("Hi there"));

    // Only the prompt sent after setup reached the provider
    assert_eq!(provider.seen.lock().unwrap().len(), 1);
    assert_eq!(state.sessions.transcript("CA400").unwrap().len(), 3);
}

#[tokio::test]
async fn test_interrupt_cancels_pending_reply() {
    let provider = Arc::new(MockProvider {
        delay: Some(Duration::from_millis(500)),
        ..Default::default()
    });
    let (addr, state) = start_server(provider.clone()).await;
    let mut ws = connect(addr).await;

    send_json(&mut ws, setup("CA500")).await;
    send_json(&mut ws, prompt("Tell me a long story")).await;

    // Wait until the completion is in flight, then cut in
    for _ in 0..100 {
        if !provider.seen.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    send_json(
        &mut ws,
        serde_json::json!({"type": "interrupt", "utteranceUntilInterrupt": ""}),
    )
    .await;

    // No reply arrives for the cancelled prompt
    let nothing = timeout(Duration::from_millis(800), ws.next()).await;
    assert!(nothing.is_err(), "Expected no frame, got {nothing:?}");

    let transcript = state.sessions.transcript("CA500").unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1], Turn::user("Tell me a long story"));

    // Prompts after the interrupt are answered normally
    send_json(&mut ws, prompt("Short one")).await;
    assert!(next_text(&mut ws).await.contains("Hi there"));
}

#[tokio::test]
async fn test_repeated_violations_close_connection() {
    let provider = Arc::new(MockProvider::default());
    let (addr, _state) = start_server(provider).await;
    let mut ws = connect(addr).await;

    for _ in 0..MAX_CONSECUTIVE_VIOLATIONS {
        ws.send(Message::text("{\"type\":\"bogus\"}")).await.unwrap();
    }

    let closed = timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "Server did not close the connection");
}

#[tokio::test]
async fn test_concurrent_calls_are_isolated() {
    let provider = Arc::new(MockProvider::default());
    let (addr, state) = start_server(provider).await;

    let mut first = connect(addr).await;
    let mut second = connect(addr).await;

    send_json(&mut first, setup("CA601")).await;
    send_json(&mut second, setup("CA602")).await;
    send_json(&mut first, prompt("From first")).await;
    next_text(&mut first).await;
    send_json(&mut second, prompt("From second")).await;
    next_text(&mut second).await;

    assert_eq!(
        state.sessions.transcript("CA601").unwrap()[1],
        Turn::user("From first")
    );
    assert_eq!(
        state.sessions.transcript("CA602").unwrap()[1],
        Turn::user("From second")
    );

    first.close(None).await.unwrap();
    wait_for_session_removal(&state, "CA601").await;
    assert!(state.sessions.contains("CA602"));
}

#[tokio::test]
async fn test_oversized_frame_ends_connection_and_session() {
    let provider = Arc::new(MockProvider::default());
    let (addr, state) = start_server(provider.clone()).await;
    let mut ws = connect(addr).await;

    send_json(&mut ws, setup("CA700")).await;
    for _ in 0..100 {
        if state.sessions.contains("CA700") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(state.sessions.contains("CA700"));

    // Over the 64 KiB WebSocket message limit
    let oversized = prompt(&"a".repeat(70 * 1024));
    let _ = ws.send(Message::text(oversized.to_string())).await;

    let ended = timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "Server kept the connection open");

    wait_for_session_removal(&state, "CA700").await;
    assert!(provider.seen.lock().unwrap().is_empty());
}
