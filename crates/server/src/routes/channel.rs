//! WebSocket channel: many concurrent requests per connection.
//!
//! Every text frame is a JSON request carrying an `op` and a client-chosen
//! `requestId`. Each request runs in its own task and the reply is written
//! as soon as it is ready, so replies arrive in completion order. The
//! `requestId` is echoed verbatim so the client can correlate them.
//!
//! ```json
//! { "op": "generate-embedding", "text": "hello", "requestId": "a1" }
//! { "op": "generate-embedding-result", "embedding": [...], "model": "...", "requestId": "a1" }
//!
//! { "op": "find-similar", "query": "q", "candidates": ["x"], "requestId": 7 }
//! { "op": "find-similar-error", "error": "...", "code": "PROVIDER_ERROR", "requestId": 7 }
//! ```
//!
//! At most `channel_max_in_flight` requests of one connection execute at
//! once; further requests are not read until one finishes. Closing the
//! connection aborts everything still in flight, saturated or not.

use crate::ops::{self, GenerateRequest, SimilarityRequest};
use crate::state::ServerState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use embedding::{EmbeddingError, EmbeddingGateway};
use futures::stream::Peekable;
use futures::{SinkExt, Stream, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

pub const OP_GENERATE: &str = "generate-embedding";
pub const OP_FIND_SIMILAR: &str = "find-similar";
pub const OP_ERROR: &str = "error";

/// Transport-independent view of an incoming frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary,
    Close,
}

/// `GET /ws` upgrade handler
pub async fn upgrade(State(state): State<Arc<ServerState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_socket(state, socket))
}

async fn serve_socket(state: Arc<ServerState>, socket: WebSocket) {
    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(session_id = %session_id, "channel connected");

    let (mut sink, stream) = socket.split();
    let max_in_flight = state.config.channel_max_in_flight;
    let (replies, mut outbox) = mpsc::channel::<String>(max_in_flight.max(1));

    let writer = tokio::spawn(async move {
        while let Some(reply) = outbox.recv().await {
            if sink.send(Message::Text(reply.into())).await.is_err() {
                break;
            }
        }
    });

    // Pings are answered by the WebSocket layer itself.
    let frames = stream.filter_map(|message| {
        futures::future::ready(match message {
            Ok(Message::Text(text)) => Some(Frame::Text(text.as_str().to_owned())),
            Ok(Message::Binary(_)) => Some(Frame::Binary),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
            Ok(Message::Close(_)) | Err(_) => Some(Frame::Close),
        })
    });

    run_session(state.gateway.clone(), Box::pin(frames), replies, max_in_flight).await;

    // Session dropped its sender; the writer drains and exits.
    let _ = writer.await;
    tracing::info!(session_id = %session_id, "channel disconnected");
}

/// Drives one connection until the frame stream ends or a close frame arrives.
///
/// Replies are pushed to `replies` as serialized JSON. A new request is taken
/// only while fewer than `max_in_flight` requests are executing. While the
/// session is saturated the stream is still watched for a close frame or its
/// end, with at most one request frame buffered ahead. Requests still
/// running when the session ends are aborted.
pub async fn run_session<S>(
    gateway: Arc<EmbeddingGateway>,
    frames: S,
    replies: mpsc::Sender<String>,
    max_in_flight: usize,
) where
    S: Stream<Item = Frame> + Unpin,
{
    let slots = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut tasks = JoinSet::new();
    let mut frames = frames.peekable();

    loop {
        let slot = tokio::select! {
            biased;
            slot = slots.clone().acquire_owned() => match slot {
                Ok(slot) => slot,
                Err(_) => break,
            },
            () = hangup(&mut frames) => break,
        };
        let Some(frame) = frames.next().await else {
            break;
        };

        match frame {
            Frame::Text(text) => {
                tasks.spawn(handle_request(gateway.clone(), text, replies.clone(), slot));
            }
            Frame::Binary => {
                tracing::warn!("rejected binary channel frame");
                let reply = error_reply(
                    OP_ERROR,
                    "binary frames are not supported; send JSON text",
                    "INVALID_MESSAGE",
                    Value::Null,
                );
                if replies.send(reply.to_string()).await.is_err() {
                    break;
                }
            }
            Frame::Close => break,
        }

        while let Some(finished) = tasks.try_join_next() {
            if let Err(err) = finished {
                tracing::error!(error = %err, "channel request task failed");
            }
        }
    }

    if !tasks.is_empty() {
        tracing::debug!(in_flight = tasks.len(), "aborting in-flight channel requests");
    }
    tasks.shutdown().await;
}

/// Resolves once the peer is gone, without consuming a request frame.
async fn hangup<S>(frames: &mut Peekable<S>)
where
    S: Stream<Item = Frame> + Unpin,
{
    match Pin::new(frames).peek().await {
        None | Some(Frame::Close) => {}
        // A buffered request waits for a free slot.
        Some(_) => std::future::pending().await,
    }
}

async fn handle_request(
    gateway: Arc<EmbeddingGateway>,
    text: String,
    replies: mpsc::Sender<String>,
    _slot: OwnedSemaphorePermit,
) {
    let reply = dispatch(&gateway, &text).await;
    // The receiver is gone only when the connection is closing.
    let _ = replies.send(reply.to_string()).await;
}

/// Decodes one request frame, runs it and builds the reply.
pub async fn dispatch(gateway: &EmbeddingGateway, frame: &str) -> Value {
    let envelope: Value = match serde_json::from_str(frame) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "unparseable channel frame");
            return error_reply(
                OP_ERROR,
                &format!("invalid message: {err}"),
                "INVALID_MESSAGE",
                Value::Null,
            );
        }
    };

    let request_id = envelope.get("requestId").cloned().unwrap_or(Value::Null);
    let op = envelope
        .get("op")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match op.as_str() {
        OP_GENERATE => {
            let outcome = match decode::<GenerateRequest>(envelope) {
                Ok(request) => ops::generate(gateway, request).await,
                Err(err) => Err(err),
            };
            reply(OP_GENERATE, outcome, request_id)
        }
        OP_FIND_SIMILAR => {
            let outcome = match decode::<SimilarityRequest>(envelope) {
                Ok(request) => ops::find_similar(gateway, request).await,
                Err(err) => Err(err),
            };
            reply(OP_FIND_SIMILAR, outcome, request_id)
        }
        "" => error_reply(OP_ERROR, "missing `op`", "INVALID_MESSAGE", request_id),
        other => {
            tracing::warn!(op = other, "unknown channel op");
            error_reply(
                OP_ERROR,
                &format!("unknown op `{other}`"),
                "UNKNOWN_OP",
                request_id,
            )
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(envelope: Value) -> Result<T, EmbeddingError> {
    serde_json::from_value(envelope).map_err(|err| EmbeddingError::InvalidInput(err.to_string()))
}

fn reply<T: Serialize>(op: &str, outcome: Result<T, EmbeddingError>, request_id: Value) -> Value {
    match outcome {
        Ok(body) => match serde_json::to_value(body) {
            Ok(Value::Object(mut fields)) => {
                fields.insert("op".into(), Value::from(format!("{op}-result")));
                fields.insert("requestId".into(), request_id);
                Value::Object(fields)
            }
            _ => error_reply(
                &format!("{op}-error"),
                "failed to encode reply",
                "INTERNAL_ERROR",
                request_id,
            ),
        },
        Err(err) => {
            tracing::debug!(op, code = err.code(), error = %err, "channel request failed");
            error_reply(&format!("{op}-error"), &err.to_string(), err.code(), request_id)
        }
    }
}

fn error_reply(op: &str, message: &str, code: &str, request_id: Value) -> Value {
    json!({
        "op": op,
        "error": message,
        "code": code,
        "requestId": request_id,
    })
}
