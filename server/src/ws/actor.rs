use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, timeout};

use crate::relay::Disposition;
use crate::state::{AppState, Heartbeat};
use crate::ws::broadcast::close_connection;
use crate::ws::protocol::{self, InboundEvent, ProtocolError};
use crate::ws::{ConnectionId, ConnectionSender};

/// How long the writer gets to flush queued frames once the reader has stopped.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Run the actor-per-connection pattern for one WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader task: decodes incoming frames and hands them to the relay
///
/// The mpsc sender is stored in the connection table so the relay can reach this
/// client from any other connection's task.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::new();
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Listed before the announcement so the new client receives it too.
    state.connections.insert(connection_id, tx.clone());
    tracing::info!(conn_id = %connection_id, "Client connected");

    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    state.relay.on_connect(&*state.connections, connection_id);

    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
    let (lost_tx, mut heartbeat_lost) = oneshot::channel::<()>();
    let ping_handle = tokio::spawn(heartbeat_task(
        connection_id,
        tx.clone(),
        pong_rx,
        state.heartbeat,
        lost_tx,
    ));

    loop {
        // The pong deadline ends the session even when the peer never sends again.
        let next = tokio::select! {
            next = ws_receiver.next() => next,
            _ = &mut heartbeat_lost => {
                tracing::warn!(conn_id = %connection_id, "Heartbeat lost, dropping connection");
                break;
            }
        };

        let decoded = match next {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => protocol::decode_text(text.as_str()),
                Message::Binary(data) => protocol::decode_binary(&data),
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                    continue;
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                    continue;
                }
                Message::Close(frame) => {
                    tracing::info!(
                        conn_id = %connection_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    conn_id = %connection_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                tracing::info!(conn_id = %connection_id, "WebSocket stream ended");
                break;
            }
        };

        if handle_frame(&state, connection_id, decoded) == Disposition::Close {
            close_connection(&state.connections, connection_id);
            break;
        }
    }

    ping_handle.abort();

    state.connections.remove(&connection_id);
    state.relay.on_disconnect(connection_id);

    // Once every sender is gone the writer drains what is queued and exits.
    drop(tx);
    if timeout(WRITER_DRAIN_TIMEOUT, writer_handle).await.is_err() {
        tracing::debug!(conn_id = %connection_id, "Writer did not drain in time");
    }

    tracing::info!(conn_id = %connection_id, "Client disconnected");
}

/// Ping the client every `ping_interval` and give it `pong_timeout` to answer.
///
/// On a missed pong this queues a close frame and fires `lost`, which makes the reader
/// loop give up on the socket. Dropping `lost` without firing it (the writer went away)
/// has the same effect.
async fn heartbeat_task(
    connection_id: ConnectionId,
    ping_tx: ConnectionSender,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
    heartbeat: Heartbeat,
    lost: oneshot::Sender<()>,
) {
    let mut ping_timer = interval(heartbeat.ping_interval);
    // Skip the first immediate tick
    ping_timer.tick().await;

    loop {
        ping_timer.tick().await;

        // Unsolicited pongs from earlier rounds must not satisfy this one.
        while pong_rx.try_recv().is_ok() {}

        if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
            return;
        }

        match timeout(heartbeat.pong_timeout, pong_rx.recv()).await {
            Ok(Some(())) => {}
            _ => {
                tracing::warn!(conn_id = %connection_id, "Pong timeout, closing connection");
                let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                    code: 1001,
                    reason: "Pong timeout".into(),
                })));
                let _ = lost.send(());
                return;
            }
        }
    }
}

/// Dispatch one decoded frame. Malformed frames are logged and ignored.
fn handle_frame(
    state: &AppState,
    connection_id: ConnectionId,
    decoded: Result<InboundEvent, ProtocolError>,
) -> Disposition {
    match decoded {
        Ok(event) => {
            tracing::debug!(conn_id = %connection_id, event = event.name(), "Inbound event");
            state
                .relay
                .on_event(&*state.connections, connection_id, event)
        }
        Err(e) => {
            tracing::warn!(
                conn_id = %connection_id,
                error = %e,
                "Ignoring malformed frame"
            );
            Disposition::Continue
        }
    }
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, Message::Close(_));
        if ws_sender.send(msg).await.is_err() || closing {
            break;
        }
    }
}
