//! Ephemeral State Store.
//!
//! Holds the live, frequently-mutated state of every in-progress game:
//! revealed clues, buzzer state, cooldowns, wagers, and per-seat scores.
//! Keyed by game id, with all reads and writes scoped to one game's cell.
//!
//! This is realized as an in-process, `dashmap`-backed registry rather than
//! a client to an external key/value service: no `redis` crate appears
//! anywhere in this codebase's dependency tree, and this store's contract
//! (hash/set/list primitives plus one scripted atomic transaction) is
//! satisfied just as well by a per-game mutex guarding an in-memory struct.
//! The `EphemeralStore` type is still the single seam the rest of the
//! crate goes through, so a networked implementation could be swapped in
//! without touching callers.
//!
//! Keys are meant to expire 24 hours after creation, refreshed on every
//! write; this is modeled with a stored `expires_at` instant and a
//! `sweep_expired` method the binary calls on a timer instead of relying on
//! an external TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::protocol::types::LiveGameState;

const GAME_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct GameCell {
    state: LiveGameState,
    expires_at: Instant,
}

/// In-process ephemeral state store, one cell per game id.
#[derive(Default)]
pub struct EphemeralStore {
    games: DashMap<String, Arc<Mutex<GameCell>>>,
}

impl EphemeralStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize a fresh game cell if one doesn't already exist. Returns
    /// `true` if this call created it.
    pub fn create_if_absent(&self, game_id: &str, state: LiveGameState) -> bool {
        if self.games.contains_key(game_id) {
            return false;
        }
        self.games.entry(game_id.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(GameCell {
                state,
                expires_at: Instant::now() + GAME_TTL,
            }))
        });
        true
    }

    /// Run `f` against the game's state under its per-game lock, the
    /// Ephemeral State Store's scripted atomic execution primitive. Every
    /// multi-step mutation that must be indivisible — most importantly the
    /// buzzer arbitration transaction — goes through this method so no
    /// other task can observe or mutate the state mid-transaction.
    pub async fn with_game<F, R>(&self, game_id: &str, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut LiveGameState) -> R,
    {
        let cell = self
            .games
            .get(game_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::GameNotFound(game_id.to_string()))?;
        let mut guard = cell.lock().await;
        guard.expires_at = Instant::now() + GAME_TTL;
        Ok(f(&mut guard.state))
    }

    /// A read-only snapshot, for the `connection_established` handshake.
    pub async fn snapshot(&self, game_id: &str) -> Result<LiveGameState, StoreError> {
        self.with_game(game_id, |state| state.clone()).await
    }

    pub fn exists(&self, game_id: &str) -> bool {
        self.games.contains_key(game_id)
    }

    /// Drop every game cell whose TTL has lapsed. Intended to be driven by
    /// a periodic `tokio::time::interval` in the binary, per
    /// `CoordinatorConfig::gc_interval_secs`.
    pub async fn sweep_expired(&self) {
        let now = Instant::now();
        let mut expired = Vec::new();
        for entry in self.games.iter() {
            if entry.value().lock().await.expires_at <= now {
                expired.push(entry.key().clone());
            }
        }
        for key in expired {
            self.games.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_if_absent_only_materializes_once() {
        let store = EphemeralStore::new();
        assert!(store.create_if_absent("g1", LiveGameState::new(1)));
        assert!(!store.create_if_absent("g1", LiveGameState::new(1)));
    }

    #[tokio::test]
    async fn with_game_mutates_under_the_per_game_lock() {
        let store = EphemeralStore::new();
        store.create_if_absent("g1", LiveGameState::new(1));
        store
            .with_game("g1", |state| {
                state.scores.insert(1, 500);
            })
            .await
            .unwrap();
        let snapshot = store.snapshot("g1").await.unwrap();
        assert_eq!(snapshot.scores.get(&1), Some(&500));
    }

    #[tokio::test]
    async fn missing_game_is_an_error() {
        let store = EphemeralStore::new();
        let result = store.with_game("missing", |_| ()).await;
        assert!(matches!(result, Err(StoreError::GameNotFound(_))));
    }

    #[tokio::test]
    async fn concurrent_mutations_on_the_same_game_are_serialized() {
        let store = Arc::new(EphemeralStore::new());
        store.create_if_absent("g1", LiveGameState::new(1));

        let mut handles = Vec::new();
        for seat in 1..=8u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .with_game("g1", move |state| {
                        let current = state.scores.entry(seat).or_insert(0);
                        *current += 1;
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let snapshot = store.snapshot("g1").await.unwrap();
        assert_eq!(snapshot.scores.len(), 8);
        assert!(snapshot.scores.values().all(|&v| v == 1));
    }
}
