//! Buzzer Arbitrator.
//!
//! Resolves contention when multiple seats buzz within microseconds of
//! each other. The entire decision — attempted-seat check, cooldown check,
//! lock check, unlock-token check, per-seat dedup, then acceptance — runs
//! as a single closure passed to `EphemeralStore::with_game`, which is the
//! store's scripted atomic execution primitive (SPEC_FULL.md §4.1/§4.2):
//! no other `handle_buzz` call on the same game id can interleave with it.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::StoreError;
use crate::protocol::server_messages::ServerMessage;
use crate::protocol::types::{LiveGameState, Seat};
use crate::store::EphemeralStore;

/// Premature buzzes and repeated buzzes after rejection all serve the same
/// 2-second penalty.
pub const BUZZ_COOLDOWN_SECONDS: f64 = 2.0;

/// Rejection reason codes carried as negative `position` values.
mod position {
    pub const ALREADY_ATTEMPTED: i32 = -3;
    pub const COOLDOWN: i32 = -2;
    pub const LOCKED_OR_STALE_TOKEN: i32 = -1;
}

fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Arbitrate one buzz attempt. `unlock_token` is the token the client
/// believes is current, as a string (client frames may send it as a
/// string or a bare int; the gateway normalizes it before calling in).
pub async fn handle_buzz(
    store: &EphemeralStore,
    game_id: &str,
    seat: Seat,
    unlock_token: Option<&str>,
) -> Result<ServerMessage, StoreError> {
    // Captured before entering the transaction; this is the sole ordering
    // authority regardless of accept/reject (SPEC_FULL.md §9).
    let server_timestamp_us = now_micros();
    let client_token: Option<i64> = unlock_token.and_then(|t| t.parse().ok());

    store
        .with_game(game_id, move |state| {
            resolve_buzz(state, seat, client_token, server_timestamp_us)
        })
        .await
}

fn resolve_buzz(
    state: &mut LiveGameState,
    seat: Seat,
    client_token: Option<i64>,
    server_timestamp_us: i64,
) -> ServerMessage {
    let reject = |state: &mut LiveGameState, pos: i32, start_cooldown: bool| {
        if start_cooldown {
            state.cooldowns.insert(seat, now_secs());
        }
        let cooldown_remaining = state
            .cooldowns
            .get(&seat)
            .map(|last| (BUZZ_COOLDOWN_SECONDS - (now_secs() - last)).max(0.0))
            .unwrap_or(0.0);
        ServerMessage::BuzzResult {
            accepted: false,
            position: pos,
            winner: state.buzzer.winner,
            cooldown: true,
            cooldown_remaining,
            server_timestamp_us,
        }
    };

    if state.attempted_players.contains(&seat) {
        return reject(state, position::ALREADY_ATTEMPTED, false);
    }

    if let Some(&last) = state.cooldowns.get(&seat) {
        let elapsed = now_secs() - last;
        if elapsed < BUZZ_COOLDOWN_SECONDS {
            return reject(state, position::COOLDOWN, false);
        }
    }

    if state.buzzer.locked {
        return reject(state, position::LOCKED_OR_STALE_TOKEN, true);
    }

    // Absence of any server-side token means this session hasn't gone
    // through the unlock protocol yet; accept as a backward-compatible
    // first unlock rather than rejecting every buzz forever.
    if let Some(server_token) = state.buzzer.unlock_token {
        if client_token != Some(server_token) {
            return reject(state, position::LOCKED_OR_STALE_TOKEN, true);
        }
    }

    if state.buzzer.order.contains(&seat) {
        return reject(state, position::LOCKED_OR_STALE_TOKEN, false);
    }

    state.buzzer.count += 1;
    state.buzzer.order.push(seat);
    state.buzzer.timestamps.insert(seat, server_timestamp_us);
    state.cooldowns.insert(seat, now_secs());

    if state.buzzer.count == 1 {
        state.buzzer.locked = true;
        state.buzzer.winner = Some(seat);
    }

    ServerMessage::BuzzResult {
        accepted: true,
        position: state.buzzer.count as i32,
        winner: state.buzzer.winner,
        cooldown: false,
        cooldown_remaining: 0.0,
        server_timestamp_us,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::BuzzerState;

    fn unlocked_state() -> LiveGameState {
        let mut state = LiveGameState::new(1);
        state.buzzer = BuzzerState {
            locked: false,
            unlock_token: Some(999),
            ..Default::default()
        };
        state
    }

    #[tokio::test]
    async fn scenario_s1_first_buzz_wins_second_sees_same_winner() {
        let store = EphemeralStore::new();
        store.create_if_absent("g1", unlocked_state());

        let first = handle_buzz(&store, "g1", 1, Some("999")).await.unwrap();
        let second = handle_buzz(&store, "g1", 2, Some("999")).await.unwrap();

        match (first, second) {
            (
                ServerMessage::BuzzResult { accepted: true, position: 1, winner: w1, .. },
                ServerMessage::BuzzResult { accepted: true, position: 2, winner: w2, .. },
            ) => {
                assert_eq!(w1, Some(1));
                assert_eq!(w2, Some(1));
            }
            other => panic!("unexpected results: {other:?}"),
        }
    }

    #[tokio::test]
    async fn scenario_s2_stale_token_rejected_with_cooldown() {
        let store = EphemeralStore::new();
        store.create_if_absent("g1", unlocked_state());

        // seat 2 holds the old token while the buzzer gets re-locked with a
        // new token (simulating judge_answer minting token T').
        store
            .with_game("g1", |state| {
                state.buzzer.locked = true;
                state.buzzer.unlock_token = Some(111);
                state.attempted_players.insert(1);
            })
            .await
            .unwrap();

        let result = handle_buzz(&store, "g1", 2, Some("999")).await.unwrap();
        match result {
            ServerMessage::BuzzResult {
                accepted,
                position,
                cooldown,
                ..
            } => {
                assert!(!accepted);
                assert_eq!(position, -1);
                assert!(cooldown);
            }
            other => panic!("expected BuzzResult, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn already_attempted_seat_is_rejected_even_when_unlocked() {
        let store = EphemeralStore::new();
        store.create_if_absent("g1", unlocked_state());
        store
            .with_game("g1", |state| {
                state.attempted_players.insert(3);
            })
            .await
            .unwrap();

        let result = handle_buzz(&store, "g1", 3, Some("999")).await.unwrap();
        match result {
            ServerMessage::BuzzResult { accepted, position, .. } => {
                assert!(!accepted);
                assert_eq!(position, -3);
            }
            other => panic!("expected BuzzResult, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_token_is_accepted_when_no_server_token_set_yet() {
        let store = EphemeralStore::new();
        let mut state = LiveGameState::new(1);
        state.buzzer.locked = false; // pre-token session, no unlock_token ever set
        store.create_if_absent("g1", state);

        let result = handle_buzz(&store, "g1", 1, None).await.unwrap();
        match result {
            ServerMessage::BuzzResult { accepted, .. } => assert!(accepted),
            other => panic!("expected BuzzResult, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_buzz_from_the_same_seat_is_rejected() {
        // A second buzz from the seat that already won lands on the
        // cooldown the first buzz itself set, before the dedup check is
        // ever reached.
        let store = EphemeralStore::new();
        store.create_if_absent("g1", unlocked_state());

        let _ = handle_buzz(&store, "g1", 1, Some("999")).await.unwrap();
        let result = handle_buzz(&store, "g1", 1, Some("999")).await.unwrap();
        match result {
            ServerMessage::BuzzResult { accepted, position, cooldown, .. } => {
                assert!(!accepted);
                assert_eq!(position, -2);
                assert!(cooldown);
            }
            other => panic!("expected BuzzResult, got {other:?}"),
        }
    }
}
