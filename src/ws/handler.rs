//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{InputEvent, PlayerId, PlayerInput};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler. Every connection gets a fresh player id.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let player_id = Uuid::new_v4();
    ws.on_upgrade(move |socket| handle_socket(socket, player_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, player_id: PlayerId, state: AppState) {
    info!(player_id = %player_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        player_id,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(player_id = %player_id, error = %e, "Failed to send welcome");
        return;
    }

    // Register with matchmaking to get channels
    let (input_tx, outbound) = state.matchmaking.register_player(player_id);
    let outbound_rx = outbound.subscribe();

    run_session(player_id, &state, ws_sink, ws_stream, input_tx, outbound, outbound_rx).await;

    // Cleanup on disconnect; an active match drops the player without a status change
    state.matchmaking.unregister_player(player_id).await;

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: PlayerId,
    state: &AppState,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: mpsc::Sender<PlayerInput>,
    outbound: broadcast::Sender<ServerMsg>,
    mut outbound_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = PlayerRateLimiter::new();

    // Writer task: outbound channel -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match outbound_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Stale stage updates are superseded by the next one
                    warn!(player_id = %player_id, lagged_count = n, "Client lagged, skipping messages");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(player_id = %player_id, "Outbound channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> matchmaking / match
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                        let _ = outbound.send(ServerMsg::Error {
                            code: "bad_message".to_string(),
                            message: e.to_string(),
                        });
                        continue;
                    }
                };

                if client_msg.is_gameplay() && !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "Rate limited input message");
                    continue;
                }

                match client_msg {
                    ClientMsg::JoinQueue => {
                        let reply = if !rate_limiter.check_join() {
                            ServerMsg::Error {
                                code: "rate_limited".to_string(),
                                message: "Too many queue requests".to_string(),
                            }
                        } else {
                            match state.matchmaking.join_queue(player_id).await {
                                Ok(position) => ServerMsg::Queued { position },
                                Err(e) => ServerMsg::Error {
                                    code: "join_failed".to_string(),
                                    message: e.to_string(),
                                },
                            }
                        };
                        let _ = outbound.send(reply);
                    }
                    ClientMsg::Ping { t } => {
                        let _ = outbound.send(ServerMsg::Pong { t });
                    }
                    ClientMsg::LeaveMatch if state.matchmaking.get_player_match(&player_id).is_none() => {
                        state.matchmaking.leave_queue(player_id).await;
                    }
                    msg => {
                        let input = PlayerInput {
                            player_id,
                            event: InputEvent::Client(msg),
                            received_at: unix_millis(),
                        };
                        if input_tx.send(input).await.is_err() {
                            debug!(player_id = %player_id, "Input channel closed");
                            break;
                        }
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(msg)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}
