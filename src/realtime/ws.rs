use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, instrument};

use crate::state::AppState;

/// Upgrade handler for viewer connections.
#[instrument(skip(ws, state))]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_connection(socket, state))
}

/// Pump events from the registry to the socket until either side hangs up.
/// Inbound frames are drained and ignored except for close.
async fn client_connection(socket: WebSocket, state: AppState) {
    let (conn_id, mut rx) = state.notifier.connect();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if sender.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.notifier.disconnect(conn_id);
    debug!(
        conn_id,
        remaining = state.notifier.subscriber_count(),
        "websocket closed"
    );
}
