//! Session Gateway.
//!
//! Bridges one WebSocket connection to a game room. On connect it verifies
//! the game exists in the Durable Store (closing with 4004 otherwise),
//! materializes the game's live state on the very first connection to a
//! room, and sends a `connection_established` handshake. From then on it
//! dispatches inbound `ClientMessage`s to the round state machine and fans
//! the resulting broadcasts out to every other connection in the room
//! (SPEC_FULL.md §4.4/§5). One `tokio::task` per connection, mirroring the
//! per-consumer-instance model of the original Django Channels gateway this
//! module replaces.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use dashmap::{DashMap, DashSet};
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};

use crate::audit::{self, ActionKind};
use crate::buzzer;
use crate::error::{GameError, GatewayError};
use crate::game::{select_daily_doubles, GameCoordinator};
use crate::protocol::types::{ErrorCode, LiveGameState, Seat};
use crate::protocol::{framing, ClientMessage, ServerMessage, CLOSE_GAME_NOT_FOUND};

const LOG_TARGET: &str = "jeopardy::gateway";
const ROOM_CHANNEL_CAPACITY: usize = 256;
const CLIENT_CHANNEL_CAPACITY: usize = 64;

/// One game room's fan-out channel plus the set of seats that have already
/// had their `player_joined` broadcast fired, so a reconnect doesn't repeat
/// it.
struct Room {
    sender: broadcast::Sender<ServerMessage>,
    seen_seats: DashSet<Seat>,
}

/// Shared application state handed to every axum handler.
pub struct AppState {
    pub coordinator: Arc<GameCoordinator>,
    rooms: DashMap<String, Arc<Room>>,
}

impl AppState {
    pub fn new(coordinator: Arc<GameCoordinator>) -> Self {
        Self {
            coordinator,
            rooms: DashMap::new(),
        }
    }

    fn room(&self, game_id: &str) -> Arc<Room> {
        self.rooms
            .entry(game_id.to_string())
            .or_insert_with(|| {
                Arc::new(Room {
                    sender: broadcast::channel(ROOM_CHANNEL_CAPACITY).0,
                    seen_seats: DashSet::new(),
                })
            })
            .clone()
    }
}

/// Query parameters a client supplies on connect to identify its role:
/// `seat` for a seated contestant, `host=true` for the host's controller
/// connection. Neither set means a read-only spectator.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ConnectQuery {
    #[serde(default)]
    pub seat: Option<Seat>,
    #[serde(default)]
    pub host: bool,
}

/// The coordinator's single WebSocket route, `/ws/:game_id`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws/:game_id", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(
    Path(game_id): Path<String>,
    Query(query): Query<ConnectQuery>,
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, game_id, query, state))
}

async fn handle_socket(mut socket: WebSocket, game_id: String, query: ConnectQuery, state: Arc<AppState>) {
    let game_row = match state.coordinator.durable.load_game(&game_id).await {
        Ok(row) => row,
        Err(err) => {
            tracing::info!(target: LOG_TARGET, game_id = %game_id, error = %err, "closing connection: unknown game");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_GAME_NOT_FOUND,
                    reason: "game not found".into(),
                })))
                .await;
            return;
        }
    };

    let participants = state
        .coordinator
        .durable
        .load_participants(&game_id)
        .await
        .unwrap_or_default();
    let names: HashMap<Seat, String> = participants.iter().map(|p| (p.seat, p.name.clone())).collect();

    if !state.coordinator.ephemeral.exists(&game_id) {
        match state.coordinator.catalog.get_episode(game_row.episode_id).await {
            Ok(episode) => {
                let mut fresh = LiveGameState::new(game_row.episode_id);
                fresh.status = game_row.status;
                fresh.current_round = game_row.current_round;
                fresh.daily_doubles = select_daily_doubles(&episode);
                for participant in &participants {
                    fresh.scores.insert(participant.seat, participant.score);
                }
                state.coordinator.ephemeral.create_if_absent(&game_id, fresh);
            }
            Err(err) => {
                tracing::warn!(target: LOG_TARGET, game_id = %game_id, error = %err, "failed to materialize live state");
                let _ = socket
                    .send(Message::Text(
                        serde_json::to_string(&ServerMessage::error(err.to_string())).unwrap_or_default(),
                    ))
                    .await;
                let _ = socket.close().await;
                return;
            }
        }
    }

    let snapshot = match state.coordinator.ephemeral.snapshot(&game_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            tracing::warn!(target: LOG_TARGET, game_id = %game_id, error = %err, "live state missing right after materialization");
            let _ = socket.close().await;
            return;
        }
    };

    let room = state.room(&game_id);
    let mut broadcast_rx = room.sender.subscribe();
    let (client_tx, mut client_rx) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);

    let established = ServerMessage::ConnectionEstablished {
        scores: snapshot.scores.clone(),
        current_player: snapshot.current_player,
        names: names.clone(),
        live_state: snapshot,
    };
    let _ = client_tx.send(established).await;

    if let Some(seat) = query.seat {
        if room.seen_seats.insert(seat) {
            let name = names.get(&seat).cloned().unwrap_or_else(|| format!("Player {seat}"));
            let _ = room.sender.send(ServerMessage::PlayerJoined { seat, name });
        }
    }

    let (mut ws_sink, mut ws_stream) = socket.split();

    let mut writer_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                direct = client_rx.recv() => {
                    let Some(msg) = direct else { break };
                    if !write_frame(&mut ws_sink, &msg).await {
                        break;
                    }
                }
                broadcast_msg = broadcast_rx.recv() => {
                    let msg = match broadcast_msg {
                        Ok(msg) => msg,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    };
                    if !write_frame(&mut ws_sink, &msg).await {
                        break;
                    }
                }
            }
        }
    });

    let is_host = query.host;
    let seat = query.seat;

    while let Some(frame) = ws_stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match framing::parse_client_message(&text) {
                Ok((msg, _seq, _ack)) => {
                    dispatch(&state.coordinator, &room.sender, &client_tx, &game_id, msg, is_host, seat).await;
                }
                Err(err) => {
                    tracing::debug!(target: LOG_TARGET, game_id = %game_id, error = %err, "unrecognized client frame");
                    let _ = client_tx
                        .send(ServerMessage::error_with_code(ErrorCode::UnknownMessageType))
                        .await;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong/binary carry no protocol meaning here
            Err(err) => {
                tracing::debug!(target: LOG_TARGET, game_id = %game_id, error = %err, "websocket read error");
                break;
            }
        }
    }

    writer_task.abort();
    tracing::info!(target: LOG_TARGET, game_id = %game_id, seat = ?seat, is_host, "connection closed");
}

async fn write_frame(sink: &mut (impl Sink<Message, Error = axum::Error> + Unpin), msg: &ServerMessage) -> bool {
    match framing::serialize_server_message(msg, None, None) {
        Ok(json) => sink.send(Message::Text(json)).await.is_ok(),
        Err(_) => true, // a message that fails to serialize is dropped, not a fatal transport error
    }
}

/// Checks `requires_host`/`requires_seat` before a message ever reaches the
/// round state machine, so a non-host or wrong-seat sender gets a per-client
/// rejection instead of the handler running on their behalf.
fn authorize(msg: &ClientMessage, is_host: bool, seat: Option<Seat>) -> Result<(), GatewayError> {
    if msg.requires_host() && !is_host {
        return Err(GatewayError::NotHost);
    }
    if let Some(expected) = msg.requires_seat() {
        if seat != Some(expected) {
            return Err(GatewayError::WrongSeat(expected));
        }
    }
    Ok(())
}

/// Authorize, dispatch, and fan out or reject. Every outcome — success,
/// handler error, or authorization failure — is handled here so a bad
/// command never terminates the connection (SPEC_FULL.md §4.4).
async fn dispatch(
    coordinator: &GameCoordinator,
    room: &broadcast::Sender<ServerMessage>,
    client_tx: &mpsc::Sender<ServerMessage>,
    game_id: &str,
    msg: ClientMessage,
    is_host: bool,
    seat: Option<Seat>,
) {
    if let Err(err) = authorize(&msg, is_host, seat) {
        let _ = client_tx.send(ServerMessage::error(err.to_string())).await;
        return;
    }

    match handle_message(coordinator, game_id, msg).await {
        Ok(messages) => {
            for message in messages {
                let _ = room.send(message);
            }
        }
        Err(err) => {
            let _ = client_tx.send(ServerMessage::error_with_code(err.error_code())).await;
        }
    }
}

/// The fixed dispatch table over every client message type, each routed to
/// its round state machine operation. `end_game`/`abandon_game` are wired in
/// here alongside every other host command (SPEC_FULL.md §10.3 calls this
/// out explicitly as a gap a prior gateway implementation left open).
async fn handle_message(
    coordinator: &GameCoordinator,
    game_id: &str,
    msg: ClientMessage,
) -> Result<Vec<ServerMessage>, GameError> {
    match msg {
        ClientMessage::Buzz {
            player_number,
            unlock_token,
            ..
        } => {
            let result = buzzer::handle_buzz(&coordinator.ephemeral, game_id, player_number, unlock_token.as_deref())
                .await
                .map_err(GameError::from)?;
            audit::record(
                coordinator.durable.as_ref(),
                game_id,
                Some(player_number),
                ActionKind::Buzz,
                serde_json::json!({"result": result.message_type()}),
            )
            .await;
            Ok(vec![result])
        }
        ClientMessage::RevealClue { clue_id } => coordinator.reveal_clue(game_id, clue_id).await,
        ClientMessage::EnableBuzzer {} => coordinator.enable_buzzer(game_id).await.map(|m| vec![m]),
        ClientMessage::JudgeAnswer {
            player_number,
            correct,
            value,
        } => coordinator.judge_answer(game_id, player_number, correct, value).await,
        ClientMessage::NextClue {} => coordinator.next_clue(game_id).await.map(|m| vec![m]),
        ClientMessage::ResetGame {} => coordinator.reset_game(game_id).await.map(|m| vec![m]),
        ClientMessage::AdjustScore {
            player_number,
            adjustment,
        } => coordinator.adjust_score(game_id, player_number, adjustment).await.map(|m| vec![m]),
        ClientMessage::StartRound { round } => coordinator.start_round(game_id, round).await.map(|m| vec![m]),
        ClientMessage::RevealDailyDouble {} => coordinator.reveal_daily_double(game_id).await.map(|m| vec![m]),
        ClientMessage::SubmitWager { player_number, wager } => {
            coordinator.submit_wager(game_id, player_number, wager).await.map(|m| vec![m])
        }
        ClientMessage::ShowDdClue {} => coordinator.show_dd_clue(game_id).await.map(|m| vec![m]),
        ClientMessage::SubmitDdAnswer { player_number, answer } => coordinator
            .submit_dd_answer(game_id, player_number, answer)
            .await
            .map(|m| vec![m]),
        ClientMessage::JudgeDdAnswer { player_number, correct } => {
            coordinator.judge_dd_answer(game_id, player_number, correct).await.map(|m| vec![m])
        }
        ClientMessage::StartFinalJeopardy {} => coordinator.start_final_jeopardy(game_id).await.map(|m| vec![m]),
        ClientMessage::SubmitFjWager { player_number, wager } => coordinator
            .submit_fj_wager(game_id, player_number, wager)
            .await
            .map(|m| vec![m]),
        ClientMessage::RevealFjClue {} => coordinator.reveal_fj_clue(game_id).await.map(|m| vec![m]),
        ClientMessage::StartFjTimer {} => coordinator.start_fj_timer(game_id).await.map(|m| vec![m]),
        ClientMessage::SubmitFjAnswer { player_number, answer } => coordinator
            .submit_fj_answer(game_id, player_number, answer)
            .await
            .map(|m| vec![m]),
        ClientMessage::JudgeFjAnswer { player_number, correct } => {
            coordinator.judge_fj_answer(game_id, player_number, correct).await
        }
        ClientMessage::EndGame {} => coordinator.end_game(game_id).await.map(|opt| opt.into_iter().collect()),
        ClientMessage::AbandonGame {} => coordinator.abandon_game(game_id).await.map(|opt| opt.into_iter().collect()),
    }
}
