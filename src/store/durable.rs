//! Durable Store.
//!
//! Persists everything that must survive a coordinator restart: game
//! session rows, participant scores, the append-only audit log, and
//! per-clue reveal records. Session creation and the episode/category/clue
//! catalog themselves are owned by an external REST layer (see
//! SPEC_FULL.md §1/§6); this store only reads and updates what the
//! coordinator itself is authoritative for.
//!
//! `sqlx` backs the production implementation. It was chosen over
//! `sea_orm` because it's the more broadly grounded Postgres crate across
//! this codebase's surrounding ecosystem (see DESIGN.md).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::protocol::types::{GameStatus, RankedScore, Round, Seat};

/// The durable fields of a game session (see SPEC_FULL.md §3's Game Session).
#[derive(Debug, Clone)]
pub struct GameRow {
    pub id: String,
    pub episode_id: i64,
    pub host_id: i64,
    pub status: GameStatus,
    pub current_round: Round,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// One participant's durable row: their seat, player, and current score.
#[derive(Debug, Clone)]
pub struct ParticipantRow {
    pub game_id: String,
    pub seat: Seat,
    pub player_id: i64,
    pub name: String,
    pub score: i64,
}

/// One append-only audit event.
#[derive(Debug, Clone)]
pub struct AuditEventRow {
    pub game_id: String,
    pub seat: Option<Seat>,
    pub action: String,
    pub payload: serde_json::Value,
    pub server_timestamp_us: i64,
}

/// One clue's reveal outcome, for historical reporting independent of the
/// audit log.
#[derive(Debug, Clone)]
pub struct ClueRevealRow {
    pub game_id: String,
    pub clue_id: i64,
    pub revealer_seat: Option<Seat>,
    pub buzz_winner_seat: Option<Seat>,
    pub correct: Option<bool>,
}

#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn load_game(&self, game_id: &str) -> Result<GameRow, StoreError>;
    async fn load_participants(&self, game_id: &str) -> Result<Vec<ParticipantRow>, StoreError>;
    async fn set_status(
        &self,
        game_id: &str,
        status: GameStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;
    async fn set_current_round(&self, game_id: &str, round: Round) -> Result<(), StoreError>;
    async fn upsert_score(&self, game_id: &str, seat: Seat, score: i64) -> Result<(), StoreError>;
    async fn append_audit_event(&self, event: AuditEventRow) -> Result<(), StoreError>;
    async fn append_clue_reveal(&self, reveal: ClueRevealRow) -> Result<(), StoreError>;

    /// Participants ordered by score descending, with standard competition
    /// ranking (ties share a rank; the next distinct score's rank skips the
    /// tied count). Supplements the distilled spec with the original
    /// source's leaderboard computation (see DESIGN.md §10.5).
    async fn ranked_scores(&self, game_id: &str) -> Result<Vec<RankedScore>, StoreError> {
        let mut rows = self.load_participants(game_id).await?;
        rows.sort_by(|a, b| b.score.cmp(&a.score));
        let mut ranked = Vec::with_capacity(rows.len());
        let mut rank = 0u32;
        let mut previous_score: Option<i64> = None;
        for (index, row) in rows.into_iter().enumerate() {
            if previous_score != Some(row.score) {
                rank = index as u32 + 1;
                previous_score = Some(row.score);
            }
            ranked.push(RankedScore {
                rank,
                seat: row.seat,
                name: row.name,
                score: row.score,
            });
        }
        Ok(ranked)
    }
}

/// Postgres-backed implementation.
pub struct PgDurableStore {
    pool: PgPool,
}

impl PgDurableStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DurableStore for PgDurableStore {
    async fn load_game(&self, game_id: &str) -> Result<GameRow, StoreError> {
        sqlx::query_as!(
            GameRowRecord,
            r#"
            SELECT id, episode_id, host_id, status as "status: _",
                   current_round as "current_round: _",
                   created_at, started_at, ended_at
            FROM games WHERE id = $1
            "#,
            game_id
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Persistence(e.to_string()))?
        .map(GameRow::from)
        .ok_or_else(|| StoreError::GameNotFound(game_id.to_string()))
    }

    async fn load_participants(&self, game_id: &str) -> Result<Vec<ParticipantRow>, StoreError> {
        let rows = sqlx::query_as!(
            ParticipantRowRecord,
            r#"
            SELECT game_id, seat, player_id, name, score
            FROM game_participants WHERE game_id = $1 ORDER BY seat
            "#,
            game_id
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(rows.into_iter().map(ParticipantRow::from).collect())
    }

    async fn set_status(
        &self,
        game_id: &str,
        status: GameStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        sqlx::query!(
            "UPDATE games SET status = $2, ended_at = $3 WHERE id = $1",
            game_id,
            status as GameStatus,
            ended_at
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn set_current_round(&self, game_id: &str, round: Round) -> Result<(), StoreError> {
        sqlx::query!(
            "UPDATE games SET current_round = $2 WHERE id = $1",
            game_id,
            round as Round
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn upsert_score(&self, game_id: &str, seat: Seat, score: i64) -> Result<(), StoreError> {
        sqlx::query!(
            "UPDATE game_participants SET score = $3 WHERE game_id = $1 AND seat = $2",
            game_id,
            seat as i32,
            score
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn append_audit_event(&self, event: AuditEventRow) -> Result<(), StoreError> {
        sqlx::query!(
            r#"
            INSERT INTO game_actions (game_id, seat, action, payload, server_timestamp_us)
            VALUES ($1, $2, $3, $4, $5)
            "#,
            event.game_id,
            event.seat.map(|s| s as i32),
            event.action,
            event.payload,
            event.server_timestamp_us
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn append_clue_reveal(&self, reveal: ClueRevealRow) -> Result<(), StoreError> {
        sqlx::query!(
            r#"
            INSERT INTO clue_reveals (game_id, clue_id, revealer_seat, buzz_winner_seat, correct)
            VALUES ($1, $2, $3, $4, $5)
            "#,
            reveal.game_id,
            reveal.clue_id,
            reveal.revealer_seat.map(|s| s as i32),
            reveal.buzz_winner_seat.map(|s| s as i32),
            reveal.correct
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(())
    }
}

// sqlx's compile-time-checked query macros bind to concrete row structs;
// these mirror the shapes above with the raw column types sqlx produces.
struct GameRowRecord {
    id: String,
    episode_id: i64,
    host_id: i64,
    status: GameStatus,
    current_round: Round,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl From<GameRowRecord> for GameRow {
    fn from(r: GameRowRecord) -> Self {
        GameRow {
            id: r.id,
            episode_id: r.episode_id,
            host_id: r.host_id,
            status: r.status,
            current_round: r.current_round,
            created_at: r.created_at,
            started_at: r.started_at,
            ended_at: r.ended_at,
        }
    }
}

struct ParticipantRowRecord {
    game_id: String,
    seat: i32,
    player_id: i64,
    name: String,
    score: i64,
}

impl From<ParticipantRowRecord> for ParticipantRow {
    fn from(r: ParticipantRowRecord) -> Self {
        ParticipantRow {
            game_id: r.game_id,
            seat: r.seat as Seat,
            player_id: r.player_id,
            name: r.name,
            score: r.score,
        }
    }
}

/// In-memory fake used by tests so the game/buzzer/gateway test suites
/// don't need a live Postgres instance.
#[derive(Default)]
pub struct InMemoryDurableStore {
    games: Mutex<HashMap<String, GameRow>>,
    participants: Mutex<HashMap<String, Vec<ParticipantRow>>>,
    audit_log: Mutex<Vec<AuditEventRow>>,
    clue_reveals: Mutex<Vec<ClueRevealRow>>,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_game(&self, game: GameRow, participants: Vec<ParticipantRow>) {
        self.games.lock().unwrap().insert(game.id.clone(), game.clone());
        self.participants.lock().unwrap().insert(game.id, participants);
    }

    /// Snapshot of every clue reveal record appended so far, for test assertions.
    pub fn clue_reveals(&self) -> Vec<ClueRevealRow> {
        self.clue_reveals.lock().unwrap().clone()
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn load_game(&self, game_id: &str) -> Result<GameRow, StoreError> {
        self.games
            .lock()
            .unwrap()
            .get(game_id)
            .cloned()
            .ok_or_else(|| StoreError::GameNotFound(game_id.to_string()))
    }

    async fn load_participants(&self, game_id: &str) -> Result<Vec<ParticipantRow>, StoreError> {
        Ok(self
            .participants
            .lock()
            .unwrap()
            .get(game_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_status(
        &self,
        game_id: &str,
        status: GameStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut games = self.games.lock().unwrap();
        let game = games
            .get_mut(game_id)
            .ok_or_else(|| StoreError::GameNotFound(game_id.to_string()))?;
        game.status = status;
        game.ended_at = ended_at;
        Ok(())
    }

    async fn set_current_round(&self, game_id: &str, round: Round) -> Result<(), StoreError> {
        let mut games = self.games.lock().unwrap();
        let game = games
            .get_mut(game_id)
            .ok_or_else(|| StoreError::GameNotFound(game_id.to_string()))?;
        game.current_round = round;
        Ok(())
    }

    async fn upsert_score(&self, game_id: &str, seat: Seat, score: i64) -> Result<(), StoreError> {
        let mut participants = self.participants.lock().unwrap();
        let rows = participants
            .get_mut(game_id)
            .ok_or_else(|| StoreError::GameNotFound(game_id.to_string()))?;
        let row = rows
            .iter_mut()
            .find(|p| p.seat == seat)
            .ok_or(StoreError::SeatNotFound(seat))?;
        row.score = score;
        Ok(())
    }

    async fn append_audit_event(&self, event: AuditEventRow) -> Result<(), StoreError> {
        self.audit_log.lock().unwrap().push(event);
        Ok(())
    }

    async fn append_clue_reveal(&self, reveal: ClueRevealRow) -> Result<(), StoreError> {
        self.clue_reveals.lock().unwrap().push(reveal);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_game() -> GameRow {
        GameRow {
            id: "g1".into(),
            episode_id: 1,
            host_id: 1,
            status: GameStatus::Active,
            current_round: Round::Single,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            ended_at: None,
        }
    }

    fn sample_participants() -> Vec<ParticipantRow> {
        vec![
            ParticipantRow { game_id: "g1".into(), seat: 1, player_id: 1, name: "Alice".into(), score: 1000 },
            ParticipantRow { game_id: "g1".into(), seat: 2, player_id: 2, name: "Bob".into(), score: 1000 },
            ParticipantRow { game_id: "g1".into(), seat: 3, player_id: 3, name: "Cara".into(), score: 400 },
        ]
    }

    #[tokio::test]
    async fn ranked_scores_gives_ties_the_same_rank_and_skips_the_next() {
        let store = InMemoryDurableStore::new();
        store.seed_game(sample_game(), sample_participants());
        let ranked = store.ranked_scores("g1").await.unwrap();
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[tokio::test]
    async fn upsert_score_updates_the_matching_seat_only() {
        let store = InMemoryDurableStore::new();
        store.seed_game(sample_game(), sample_participants());
        store.upsert_score("g1", 3, 900).await.unwrap();
        let participants = store.load_participants("g1").await.unwrap();
        let cara = participants.iter().find(|p| p.seat == 3).unwrap();
        assert_eq!(cara.score, 900);
        let alice = participants.iter().find(|p| p.seat == 1).unwrap();
        assert_eq!(alice.score, 1000);
    }

    #[tokio::test]
    async fn unknown_game_load_is_an_error() {
        let store = InMemoryDurableStore::new();
        assert!(store.load_game("missing").await.is_err());
    }

    #[tokio::test]
    async fn set_status_records_ended_at() {
        let store = InMemoryDurableStore::new();
        store.seed_game(sample_game(), sample_participants());
        let now = Utc::now();
        store.set_status("g1", GameStatus::Completed, Some(now)).await.unwrap();
        let game = store.load_game("g1").await.unwrap();
        assert_eq!(game.status, GameStatus::Completed);
        assert_eq!(game.ended_at, Some(now));
    }
}
