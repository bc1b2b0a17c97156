//! Score & Audit Writer.
//!
//! Every authoritative score change and every state-mutating command gets
//! an append-only audit event with a microsecond server timestamp
//! (SPEC_FULL.md §4.5). Audit writes must never block a broadcast and a
//! failure to persist one is logged, not surfaced to the handler's caller.
//!
//! `ActionKind` is an explicit enum rather than a free string — a
//! supplement over the distilled spec (see DESIGN.md §10.5) so audit
//! consumers get exhaustive matching instead of string comparison.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::protocol::types::Seat;
use crate::store::{AuditEventRow, DurableStore};

const LOG_TARGET: &str = "jeopardy::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Buzz,
    RevealClue,
    JudgeAnswer,
    JudgeDdAnswer,
    JudgeFjAnswer,
    AdjustScore,
    ResetGame,
    StartRound,
    EndGame,
    AbandonGame,
}

impl ActionKind {
    fn as_str(self) -> &'static str {
        match self {
            ActionKind::Buzz => "buzz",
            ActionKind::RevealClue => "reveal_clue",
            ActionKind::JudgeAnswer => "judge_answer",
            ActionKind::JudgeDdAnswer => "judge_dd_answer",
            ActionKind::JudgeFjAnswer => "judge_fj_answer",
            ActionKind::AdjustScore => "adjust_score",
            ActionKind::ResetGame => "reset_game",
            ActionKind::StartRound => "start_round",
            ActionKind::EndGame => "end_game",
            ActionKind::AbandonGame => "abandon_game",
        }
    }
}

fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

/// Append one audit event. Best-effort: a persistence failure is logged
/// and swallowed so the caller's broadcast is never blocked on it.
pub async fn record(
    store: &dyn DurableStore,
    game_id: &str,
    seat: Option<Seat>,
    action: ActionKind,
    payload: Value,
) {
    let event = AuditEventRow {
        game_id: game_id.to_string(),
        seat,
        action: action.as_str().to_string(),
        payload,
        server_timestamp_us: now_micros(),
    };
    if let Err(err) = store.append_audit_event(event).await {
        tracing::warn!(target: LOG_TARGET, game_id, action = action.as_str(), error = %err, "failed to persist audit event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GameRow, InMemoryDurableStore, ParticipantRow};
    use crate::protocol::types::{GameStatus, Round};
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn record_is_a_no_op_failure_when_game_unknown() {
        // append_audit_event on InMemoryDurableStore never fails regardless
        // of whether the game exists (it just appends to a flat log), so
        // this exercises that `record` doesn't panic on an arbitrary payload.
        let store = InMemoryDurableStore::new();
        record(&store, "missing", Some(1), ActionKind::Buzz, json!({"seat": 1})).await;
    }

    #[tokio::test]
    async fn record_persists_the_action_kind_as_its_wire_string() {
        let store = InMemoryDurableStore::new();
        store.seed_game(
            GameRow {
                id: "g1".into(),
                episode_id: 1,
                host_id: 1,
                status: GameStatus::Active,
                current_round: Round::Single,
                created_at: Utc::now(),
                started_at: None,
                ended_at: None,
            },
            vec![ParticipantRow {
                game_id: "g1".into(),
                seat: 1,
                player_id: 1,
                name: "Alice".into(),
                score: 0,
            }],
        );
        record(&store, "g1", Some(1), ActionKind::JudgeAnswer, json!({"correct": true})).await;
        assert_eq!(ActionKind::JudgeAnswer.as_str(), "judge_answer");
    }
}
