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
use crate::game::registry::JoinedRoom;
use crate::game::{JoinRejection, Outbound, PlayerInput, RoomHandle};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Longest accepted display name, in characters, after trimming
pub const MAX_DISPLAY_NAME_LEN: usize = 16;

/// How a joined session ended
enum SessionEnd {
    /// Player left the room but kept the connection open
    Left,
    Disconnected,
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let player_id = Uuid::new_v4();
    info!(player_id = %player_id, "New WebSocket connection");

    let (ws_sink, mut ws_stream) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<ServerMsg>(256);
    let writer_handle = tokio::spawn(write_loop(player_id, ws_sink, out_rx));

    let rate_limiter = PlayerRateLimiter::new();
    let _ = out_tx
        .send(ServerMsg::Welcome {
            player_id,
            server_time: unix_millis(),
        })
        .await;

    while let Some(joined) =
        await_join(player_id, &state, &mut ws_stream, &out_tx, &rate_limiter).await
    {
        let JoinedRoom { handle, events_rx } = joined;
        let _ = out_tx
            .send(ServerMsg::Joined {
                room_code: handle.code.clone(),
                player_id,
            })
            .await;

        let forwarder = tokio::spawn(forward_room_events(player_id, events_rx, out_tx.clone()));
        let end = run_session(player_id, &handle, &mut ws_stream, &out_tx, &rate_limiter).await;
        forwarder.abort();

        if let SessionEnd::Disconnected = end {
            // Signal disconnect to the room
            let _ = handle
                .send(PlayerInput {
                    player_id,
                    msg: ClientMsg::Leave,
                    received_at: unix_millis(),
                })
                .await;
            break;
        }
    }

    drop(out_tx);
    let _ = writer_handle.await;
    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Read messages until the client joins a room or disconnects
async fn await_join(
    player_id: Uuid,
    state: &AppState,
    ws_stream: &mut SplitStream<WebSocket>,
    out_tx: &mpsc::Sender<ServerMsg>,
    rate_limiter: &PlayerRateLimiter,
) -> Option<JoinedRoom> {
    while let Some(msg) = next_client_msg(player_id, ws_stream, rate_limiter).await {
        match msg {
            ClientMsg::Join {
                display_name,
                room_code,
            } => {
                let result = match validate_display_name(&display_name) {
                    Ok(name) => state.rooms.join(player_id, name, room_code.as_deref()).await,
                    Err(reason) => Err(reason),
                };
                match result {
                    Ok(joined) => return Some(joined),
                    Err(reason) => {
                        debug!(player_id = %player_id, %reason, "Join rejected");
                        let _ = out_tx
                            .send(ServerMsg::JoinRejected {
                                reason: reason.code().to_string(),
                            })
                            .await;
                    }
                }
            }
            ClientMsg::Ping { t } => {
                let _ = out_tx.send(ServerMsg::Pong { t }).await;
            }
            _ => {
                let _ = out_tx
                    .send(ServerMsg::Error {
                        code: "not_in_room".to_string(),
                        message: "Join a room first".to_string(),
                    })
                    .await;
            }
        }
    }
    None
}

/// Forward client messages to the room until the player leaves or the
/// socket closes
async fn run_session(
    player_id: Uuid,
    room: &RoomHandle,
    ws_stream: &mut SplitStream<WebSocket>,
    out_tx: &mpsc::Sender<ServerMsg>,
    rate_limiter: &PlayerRateLimiter,
) -> SessionEnd {
    while let Some(msg) = next_client_msg(player_id, ws_stream, rate_limiter).await {
        if !is_well_formed(&msg) {
            warn!(player_id = %player_id, "Dropping malformed input");
            let _ = out_tx
                .send(ServerMsg::Error {
                    code: "invalid_input".to_string(),
                    message: "Aim must be a finite number".to_string(),
                })
                .await;
            continue;
        }

        let leaving = matches!(msg, ClientMsg::Leave);
        let input = PlayerInput {
            player_id,
            msg,
            received_at: unix_millis(),
        };
        if !room.send(input).await {
            debug!(player_id = %player_id, room = %room.code, "Room channel closed");
            return SessionEnd::Left;
        }
        if leaving {
            info!(player_id = %player_id, room = %room.code, "Player left room");
            return SessionEnd::Left;
        }
    }
    SessionEnd::Disconnected
}

/// Next parsed client message, or None once the socket is closed. Rate
/// limited, unparseable and non-text frames are skipped.
async fn next_client_msg(
    player_id: Uuid,
    ws_stream: &mut SplitStream<WebSocket>,
    rate_limiter: &PlayerRateLimiter,
) -> Option<ClientMsg> {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "Rate limited client message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => return Some(msg),
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                return None;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                return None;
            }
        }
    }
    None
}

/// Room broadcasts addressed to this player -> outgoing queue
async fn forward_room_events(
    player_id: Uuid,
    mut events_rx: broadcast::Receiver<Outbound>,
    out_tx: mpsc::Sender<ServerMsg>,
) {
    loop {
        match events_rx.recv().await {
            Ok(out) => {
                if !out.is_for(player_id) {
                    continue;
                }
                if out_tx.send(out.msg).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    player_id = %player_id,
                    lagged_count = n,
                    "Client lagged, skipping {} messages", n
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(player_id = %player_id, "Room channel closed");
                break;
            }
        }
    }
}

/// Outgoing queue -> WebSocket
async fn write_loop(
    player_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::Receiver<ServerMsg>,
) {
    while let Some(msg) = out_rx.recv().await {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(player_id = %player_id, error = %e, "WebSocket send failed");
            break;
        }
    }
    let _ = ws_sink.close().await;
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

/// Trim and bound a requested display name
pub fn validate_display_name(raw: &str) -> Result<String, JoinRejection> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_DISPLAY_NAME_LEN {
        return Err(JoinRejection::InvalidName);
    }
    Ok(name.to_string())
}

/// Edge check for values serde accepts but the simulation must not see
fn is_well_formed(msg: &ClientMsg) -> bool {
    match msg {
        ClientMsg::Input { aim, .. } => aim.is_finite(),
        _ => true,
    }
}
