//! ConversationRelay WebSocket handler
//!
//! One connection carries one call. The handler walks a small state machine:
//!
//! - **uninitialized** until a `setup` message creates the call's session
//! - **active** while prompts are answered and interrupts are observed
//! - **closed** once the socket ends; the session is destroyed on every exit
//!   path
//!
//! Prompts are answered by a per-connection worker task fed through a FIFO
//! queue, so transcript order always matches arrival order while the receive
//! loop keeps reading (an `interrupt` can cancel an in-flight completion).

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::core::completion::CompletionProvider;
use crate::core::session::SessionStore;
use crate::state::AppState;

use super::messages::{
    IncomingMessage, InterruptMessage, MessageError, MessageRoute, OutgoingMessage,
    PromptMessage, SetupMessage,
};

/// Buffer size for outgoing frames and queued prompts
const CHANNEL_BUFFER_SIZE: usize = 64;

/// Maximum WebSocket frame size (64 KB)
const MAX_WS_FRAME_SIZE: usize = 64 * 1024;

/// Maximum WebSocket message size (64 KB)
const MAX_WS_MESSAGE_SIZE: usize = 64 * 1024;

/// Consecutive protocol violations tolerated before the connection is closed
pub const MAX_CONSECUTIVE_VIOLATIONS: u32 = 5;

/// How long the sender task may keep flushing after the receive loop ends
const SENDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Relay WebSocket handler
///
/// Upgrades the HTTP connection to the ConversationRelay protocol.
pub async fn relay_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    debug!("Relay WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_relay_socket(socket, state))
}

/// Drive one relay connection to completion
async fn handle_relay_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    let span = info_span!("relay", %connection_id);
    run_connection(socket, app_state).instrument(span).await
}

async fn run_connection(socket: WebSocket, app_state: Arc<AppState>) {
    info!("Relay WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<MessageRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing messages
    let mut sender_task = tokio::spawn(
        async move {
            while let Some(route) = message_rx.recv().await {
                let result = match route {
                    MessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                        Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                        Err(e) => {
                            error!("Failed to serialize outgoing message: {}", e);
                            continue;
                        }
                    },
                    MessageRoute::Close => {
                        info!("Closing relay WebSocket connection");
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                };

                if let Err(e) = result {
                    warn!("Failed to send WebSocket message: {}", e);
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let mut connection = RelayConnection::new(app_state, message_tx);

    while let Some(msg_result) = receiver.next().await {
        let flow = match msg_result {
            Ok(msg) => connection.handle_frame(msg).await,
            Err(e) => {
                warn!("Relay WebSocket error: {}", e);
                Flow::Close
            }
        };

        if flow == Flow::Close {
            break;
        }
    }

    // Destroys the session and releases this connection's sender handle
    drop(connection);

    // Let queued frames (including a Close) drain, then stop the sender
    if tokio::time::timeout(SENDER_DRAIN_TIMEOUT, &mut sender_task)
        .await
        .is_err()
    {
        sender_task.abort();
    }

    info!("Relay WebSocket connection terminated");
}

/// Whether the receive loop should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Close,
}

/// Connection lifecycle
#[derive(Debug)]
enum Phase {
    Uninitialized,
    Active(ActiveCall),
    Closed,
}

/// Resources owned while a call is active
#[derive(Debug)]
struct ActiveCall {
    call_sid: String,
    prompt_tx: mpsc::Sender<PromptJob>,
    worker: JoinHandle<()>,
    /// Cancelled by the next interrupt; every queued prompt holds a clone
    interrupt: CancellationToken,
}

/// One queued caller utterance
#[derive(Debug)]
pub(crate) struct PromptJob {
    pub text: String,
    pub cancel: CancellationToken,
}

/// Per-connection state machine
pub(crate) struct RelayConnection {
    app_state: Arc<AppState>,
    message_tx: mpsc::Sender<MessageRoute>,
    phase: Phase,
    consecutive_violations: u32,
}

impl RelayConnection {
    pub(crate) fn new(app_state: Arc<AppState>, message_tx: mpsc::Sender<MessageRoute>) -> Self {
        Self {
            app_state,
            message_tx,
            phase: Phase::Uninitialized,
            consecutive_violations: 0,
        }
    }

    /// Call identifier, once setup succeeded
    pub(crate) fn call_sid(&self) -> Option<&str> {
        match &self.phase {
            Phase::Active(call) => Some(&call.call_sid),
            _ => None,
        }
    }

    async fn handle_frame(&mut self, msg: Message) -> Flow {
        match msg {
            Message::Text(text) => match IncomingMessage::parse(&text) {
                Ok(message) => self.handle_message(message).await,
                Err(e) => self.violation(&e.to_string()).await,
            },
            Message::Binary(data) => {
                debug!("Received binary frame: {} bytes", data.len());
                self.violation(&MessageError::UnexpectedBinary.to_string())
                    .await
            }
            Message::Ping(_) | Message::Pong(_) => Flow::Continue,
            Message::Close(_) => {
                info!("Relay WebSocket close received");
                Flow::Close
            }
        }
    }

    /// Dispatch a validated message according to the current phase
    pub(crate) async fn handle_message(&mut self, message: IncomingMessage) -> Flow {
        debug!(kind = message.kind(), "Received relay message");

        let active = match self.phase {
            Phase::Uninitialized => false,
            Phase::Active(_) => true,
            Phase::Closed => return Flow::Close,
        };

        match (active, message) {
            (false, IncomingMessage::Setup(setup)) => self.handle_setup(setup).await,
            (true, IncomingMessage::Setup(setup)) => {
                let reason = format!(
                    "Duplicate setup for call {} on connection already serving {}",
                    setup.call_sid,
                    self.call_sid().unwrap_or_default()
                );
                self.violation(&reason).await
            }
            (true, IncomingMessage::Prompt(prompt)) => self.handle_prompt(prompt).await,
            (true, IncomingMessage::Interrupt(interrupt)) => self.handle_interrupt(interrupt),
            (false, message) => {
                let reason = format!("Received {} before setup", message.kind());
                self.violation(&reason).await
            }
        }
    }

    async fn handle_setup(&mut self, setup: SetupMessage) -> Flow {
        let call_sid = setup.call_sid;
        if let Err(e) = self.app_state.sessions.create(&call_sid) {
            return self.violation(&e.to_string()).await;
        }

        info!(
            call_sid = %call_sid,
            from = setup.from.as_deref().unwrap_or("unknown"),
            to = setup.to.as_deref().unwrap_or("unknown"),
            "Call session started"
        );

        let (prompt_tx, prompt_rx) = mpsc::channel::<PromptJob>(CHANNEL_BUFFER_SIZE);
        let context = PromptContext {
            call_sid: call_sid.clone(),
            sessions: self.app_state.sessions.clone(),
            completion: self.app_state.completion.clone(),
            fallback_message: self.app_state.config.fallback_message.clone(),
            message_tx: self.message_tx.clone(),
        };
        let worker = tokio::spawn(run_prompt_worker(context, prompt_rx).in_current_span());

        self.phase = Phase::Active(ActiveCall {
            call_sid,
            prompt_tx,
            worker,
            interrupt: CancellationToken::new(),
        });
        self.consecutive_violations = 0;
        Flow::Continue
    }

    async fn handle_prompt(&mut self, prompt: PromptMessage) -> Flow {
        let Phase::Active(call) = &self.phase else {
            return Flow::Continue;
        };

        debug!(chars = prompt.voice_prompt.len(), "Queueing caller prompt");
        let job = PromptJob {
            text: prompt.voice_prompt,
            cancel: call.interrupt.clone(),
        };

        // The receive loop must never block on the prompt queue
        match call.prompt_tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let reason =
                    format!("Prompt queue full ({CHANNEL_BUFFER_SIZE} pending), prompt dropped");
                return self.violation(&reason).await;
            }
            Err(TrySendError::Closed(_)) => {
                error!(call_sid = %call.call_sid, "Prompt worker stopped unexpectedly");
                return Flow::Close;
            }
        }

        self.consecutive_violations = 0;
        Flow::Continue
    }

    fn handle_interrupt(&mut self, interrupt: InterruptMessage) -> Flow {
        if let Phase::Active(call) = &mut self.phase {
            info!(
                call_sid = %call.call_sid,
                heard = interrupt.utterance_until_interrupt.as_deref().unwrap_or(""),
                "Call interrupted"
            );
            call.interrupt.cancel();
            call.interrupt = CancellationToken::new();
        }
        self.consecutive_violations = 0;
        Flow::Continue
    }

    /// Log a rejected frame; close after too many in a row
    async fn violation(&mut self, reason: &str) -> Flow {
        self.consecutive_violations += 1;
        warn!(
            call_sid = self.call_sid().unwrap_or("none"),
            violations = self.consecutive_violations,
            "Ignoring relay message: {}",
            reason
        );

        if self.consecutive_violations >= MAX_CONSECUTIVE_VIOLATIONS {
            warn!("Too many consecutive protocol violations, closing connection");
            let _ = self.message_tx.send(MessageRoute::Close).await;
            return Flow::Close;
        }
        Flow::Continue
    }

    /// Tear down the call: stop pending work and destroy the session
    pub(crate) fn close(&mut self) {
        if let Phase::Active(call) = std::mem::replace(&mut self.phase, Phase::Closed) {
            call.interrupt.cancel();
            call.worker.abort();
            self.app_state.sessions.destroy(&call.call_sid);
            info!(call_sid = %call.call_sid, "Call session ended");
        }
    }
}

impl Drop for RelayConnection {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Prompt worker
// =============================================================================

/// Everything the worker needs to answer prompts for one call
pub(crate) struct PromptContext {
    pub call_sid: String,
    pub sessions: SessionStore,
    pub completion: Arc<dyn CompletionProvider>,
    pub fallback_message: String,
    pub message_tx: mpsc::Sender<MessageRoute>,
}

/// How a prompt was finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromptOutcome {
    Replied,
    Fallback,
    Cancelled,
    SessionMissing,
}

async fn run_prompt_worker(context: PromptContext, mut jobs: mpsc::Receiver<PromptJob>) {
    while let Some(job) = jobs.recv().await {
        let outcome = process_prompt(&context, job).await;
        debug!(?outcome, "Prompt finished");
    }
}

/// Answer one prompt: user turn, completion, assistant turn, reply.
///
/// Provider failures are answered with the fallback message, which is not
/// recorded in the transcript.
pub(crate) async fn process_prompt(context: &PromptContext, job: PromptJob) -> PromptOutcome {
    let call_sid = context.call_sid.as_str();

    if let Err(e) = context.sessions.append_user_turn(call_sid, job.text) {
        warn!("Dropping prompt: {}", e);
        return PromptOutcome::SessionMissing;
    }

    if job.cancel.is_cancelled() {
        return PromptOutcome::Cancelled;
    }

    let transcript = match context.sessions.transcript(call_sid) {
        Ok(transcript) => transcript,
        Err(e) => {
            warn!("Dropping prompt: {}", e);
            return PromptOutcome::SessionMissing;
        }
    };

    let result = tokio::select! {
        biased;
        _ = job.cancel.cancelled() => {
            info!(call_sid, "Completion cancelled by interrupt");
            return PromptOutcome::Cancelled;
        }
        result = context.completion.complete(&transcript) => result,
    };

    match result {
        Ok(reply) => {
            if let Err(e) = context.sessions.append_assistant_turn(call_sid, reply.clone()) {
                warn!("Dropping reply: {}", e);
                return PromptOutcome::SessionMissing;
            }
            send(context, OutgoingMessage::reply(reply)).await;
            PromptOutcome::Replied
        }
        Err(e) => {
            error!(
                call_sid,
                provider = context.completion.name(),
                "Completion failed: {}",
                e
            );
            send(context, OutgoingMessage::reply(context.fallback_message.clone())).await;
            PromptOutcome::Fallback
        }
    }
}

async fn send(context: &PromptContext, message: OutgoingMessage) {
    if context
        .message_tx
        .send(MessageRoute::Outgoing(message))
        .await
        .is_err()
    {
        debug!("Connection sender closed, reply dropped");
    }
}
