use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::ws::events::BroadcastEvent;
use crate::ws::registry::MAILBOX_CAPACITY;

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one peer connection: register it, push the current level so a
/// fresh client is synchronized immediately, then run the outbound and
/// inbound loops until either side fails.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4();
    info!(peer = %peer_id, "WebSocket connection established");

    // Split the socket; the write half is funneled through the mailbox so
    // only the outbound loop ever touches it.
    let (mut sink, mut stream) = socket.split();
    let (mailbox, mut outbound) = mpsc::channel::<Arc<BroadcastEvent>>(MAILBOX_CAPACITY);

    state.registry.register(peer_id, mailbox.clone()).await;

    // Initial snapshot. The mailbox is empty at this point, so the only
    // way this fails is the peer racing to disconnect.
    let snapshot = BroadcastEvent::level_update(state.level.current());
    if mailbox.try_send(Arc::new(snapshot)).is_err() {
        debug!(peer = %peer_id, "peer went away before the initial snapshot");
    }

    // Outbound loop: drain the mailbox, serialize, write.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let payload = match serde_json::to_string(event.as_ref()) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "failed to serialize event, skipping");
                    continue;
                }
            };
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    // Inbound loop: this protocol has no client messages beyond the
    // handshake, so frames are logged and otherwise ignored.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    debug!(peer = %peer_id, "message from peer: {text}");
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Either loop ending tears the connection down; abort the survivor so
    // it is never left blocked on a dead socket.
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    state.registry.unregister(&peer_id).await;
    info!(peer = %peer_id, "WebSocket connection terminated");
}
