//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::MatchEvent;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Replies queued for one session before the writer catches up
const REPLY_BUFFER: usize = 32;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let session_id = Uuid::new_v4();
    debug!(session_id = %session_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, session_id: Uuid, state: AppState) {
    info!(session_id = %session_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Subscribe before the welcome so no event published after it is missed
    let events_rx = state.events.subscribe();

    let welcome = ServerMsg::Welcome {
        session_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(session_id = %session_id, error = %e, "Failed to send welcome");
        return;
    }

    run_session(session_id, state, ws_sink, ws_stream, events_rx).await;

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    session_id: Uuid,
    state: AppState,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut events_rx: broadcast::Receiver<MatchEvent>,
) {
    let rate_limiter = ConnectionRateLimiter::new();
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMsg>(REPLY_BUFFER);

    // Spawn writer task: match events and direct replies -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                reply = reply_rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
                event = events_rx.recv() => match event {
                    Ok(event) => ServerMsg::from(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            session_id = %session_id,
                            lagged_count = n,
                            "Client lagged, skipping {} events", n
                        );
                        // Continue - don't disconnect for lag
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(session_id = %session_id, "Event channel closed");
                        break;
                    }
                },
            };

            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> arena
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(session_id = %session_id, "Rate limited input message");
                    continue;
                }

                let reply = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => dispatch(&state, session_id, client_msg),
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Failed to parse client message");
                        Some(ServerMsg::Error {
                            code: "bad_request".to_string(),
                            message: e.to_string(),
                        })
                    }
                };

                if let Some(reply) = reply {
                    if reply_tx.send(reply).await.is_err() {
                        debug!(session_id = %session_id, "Writer task gone");
                        break;
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(session_id = %session_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(session_id = %session_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Apply one client request. Successes reach every session through the
/// event channel, so only failures and pongs are answered directly.
fn dispatch(state: &AppState, session_id: Uuid, msg: ClientMsg) -> Option<ServerMsg> {
    let outcome = match msg {
        ClientMsg::Move { tank_id, request } => state.arena.move_tank(&tank_id, request).map(|_| ()),
        ClientMsg::Shoot { tank_id, shot_id } => state.arena.fire(&tank_id, &shot_id).map(|_| ()),
        ClientMsg::Ping { t } => return Some(ServerMsg::Pong { t }),
    };

    match outcome {
        Ok(()) => None,
        Err(e) => {
            debug!(session_id = %session_id, error = %e, "Request rejected");
            Some(ServerMsg::from(&e))
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}
