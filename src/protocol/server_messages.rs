//! Server-to-client messages.
//!
//! All frames the coordinator sends to connected clients: one connect-time
//! handshake reply, a broadcast for every authoritative state transition,
//! and a per-client `error` frame for rejected requests. Messages are
//! tagged with a `type` field for JSON serialization.
//!
//! # Categories
//!
//! - **Connection**: the `connection_established` handshake reply
//! - **Board flow**: `clue_revealed`, `buzzer_enabled`, `buzz_result`,
//!   `answer_judged`, `clue_exhausted`, `return_to_board`, `round_changed`
//! - **Daily Double**: `daily_double_detected`, `daily_double_revealed`,
//!   `wager_submitted`, `dd_clue_shown`, `dd_answer_submitted`, `dd_answer_judged`
//! - **Final Jeopardy**: `fj_category_shown`, `fj_wager_submitted`,
//!   `fj_clue_revealed`, `fj_timer_started`, `fj_answer_submitted`, `fj_answer_judged`
//! - **Session lifecycle**: `player_joined`, `game_reset`, `score_adjusted`,
//!   `game_completed`, `game_abandoned`
//! - **Errors**: `error`

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use super::types::{LiveGameState, Round, Seat};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once to a newly connected client after its live state is
    /// materialized (or found already materialized).
    ConnectionEstablished {
        live_state: LiveGameState,
        scores: HashMap<Seat, i64>,
        names: HashMap<Seat, String>,
        current_player: Option<Seat>,
    },

    /// A clue moved from idle into the locked `revealed` micro-state.
    ClueRevealed {
        #[serde_as(as = "DisplayFromStr")]
        clue_id: i64,
        category: String,
        value: i64,
        question: String,
        answer: String,
    },

    /// The host finished reading; the buzzer opened with a fresh token.
    BuzzerEnabled { unlock_token: String },

    /// Outcome of one client's `buzz` attempt. Rejections are ordinary
    /// outcomes here, not errors — see `position` for the reason code.
    BuzzResult {
        accepted: bool,
        position: i32,
        winner: Option<Seat>,
        cooldown: bool,
        cooldown_remaining: f64,
        server_timestamp_us: i64,
    },

    /// The host judged the buzzer winner's spoken answer.
    AnswerJudged {
        player_number: Seat,
        correct: bool,
        value: i64,
        new_score: i64,
    },

    /// Every seat attempted the current clue without a correct answer.
    /// Fired immediately before `return_to_board` so clients can render
    /// "nobody got it" distinctly from an ordinary board return.
    ClueExhausted {
        #[serde_as(as = "DisplayFromStr")]
        clue_id: i64,
        answer: String,
    },

    /// The board returned to idle; carries a full scoreboard refresh.
    ReturnToBoard {
        scores: HashMap<Seat, i64>,
        #[serde_as(as = "HashSet<DisplayFromStr>")]
        revealed_clues: HashSet<i64>,
    },

    /// A new participant took a seat that had no prior connection.
    PlayerJoined { seat: Seat, name: String },

    /// The host wiped the board back to its initial state.
    GameReset {
        scores: HashMap<Seat, i64>,
        names: HashMap<Seat, String>,
    },

    /// The host applied a manual score adjustment.
    ScoreAdjusted {
        player_number: Seat,
        adjustment: i64,
        new_score: i64,
    },

    /// The macro round advanced.
    RoundChanged {
        round: Round,
        current_player: Option<Seat>,
    },

    /// A Daily Double clue was revealed; no clue content is included.
    DailyDoubleDetected { player_number: Seat },

    /// The host confirmed the Daily Double is in play; wager is now open.
    DailyDoubleRevealed { player_number: Seat },

    /// The Daily Double wagerer's wager was accepted.
    WagerSubmitted { player_number: Seat, wager: i64 },

    /// Daily Double clue text, shown after the wager is recorded.
    DdClueShown { question: String, answer: String },

    /// The wagerer's spoken answer, recorded for host judgment.
    DdAnswerSubmitted { player_number: Seat, answer: String },

    /// The host judged the Daily Double answer.
    DdAnswerJudged {
        player_number: Seat,
        correct: bool,
        new_score: i64,
    },

    /// Final Jeopardy began; only the category name is revealed.
    FjCategoryShown { category: String },

    /// One contestant's Final Jeopardy wager was accepted.
    FjWagerSubmitted { player_number: Seat },

    /// Final Jeopardy clue text, revealed without starting the timer.
    FjClueRevealed { question: String, answer: String },

    /// The host started the (client-rendered) answer timer.
    FjTimerStarted { duration_secs: u32 },

    /// One contestant's Final Jeopardy written answer was recorded.
    FjAnswerSubmitted { player_number: Seat },

    /// The host judged one contestant's Final Jeopardy answer.
    FjAnswerJudged {
        player_number: Seat,
        correct: bool,
        new_score: i64,
    },

    /// All Final Jeopardy judgments landed (or the host ended the game);
    /// scores are now persisted and the session is `completed`.
    GameCompleted { scores: HashMap<Seat, i64> },

    /// The host abandoned the game without declaring a winner.
    GameAbandoned {},

    /// A per-client rejection: validation failure, conflict, or unknown
    /// message type. Never broadcast to the rest of the room.
    Error { message: String },
}

impl ServerMessage {
    /// Build a plain error frame.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Build an error frame from an `ErrorCode`, using its canonical message.
    pub fn error_with_code(code: super::types::ErrorCode) -> Self {
        ServerMessage::Error {
            message: code.message().to_string(),
        }
    }

    /// The wire `type` discriminant, for logging without re-serializing.
    pub fn message_type(&self) -> &'static str {
        match self {
            ServerMessage::ConnectionEstablished { .. } => "connection_established",
            ServerMessage::ClueRevealed { .. } => "clue_revealed",
            ServerMessage::BuzzerEnabled { .. } => "buzzer_enabled",
            ServerMessage::BuzzResult { .. } => "buzz_result",
            ServerMessage::AnswerJudged { .. } => "answer_judged",
            ServerMessage::ClueExhausted { .. } => "clue_exhausted",
            ServerMessage::ReturnToBoard { .. } => "return_to_board",
            ServerMessage::PlayerJoined { .. } => "player_joined",
            ServerMessage::GameReset { .. } => "game_reset",
            ServerMessage::ScoreAdjusted { .. } => "score_adjusted",
            ServerMessage::RoundChanged { .. } => "round_changed",
            ServerMessage::DailyDoubleDetected { .. } => "daily_double_detected",
            ServerMessage::DailyDoubleRevealed { .. } => "daily_double_revealed",
            ServerMessage::WagerSubmitted { .. } => "wager_submitted",
            ServerMessage::DdClueShown { .. } => "dd_clue_shown",
            ServerMessage::DdAnswerSubmitted { .. } => "dd_answer_submitted",
            ServerMessage::DdAnswerJudged { .. } => "dd_answer_judged",
            ServerMessage::FjCategoryShown { .. } => "fj_category_shown",
            ServerMessage::FjWagerSubmitted { .. } => "fj_wager_submitted",
            ServerMessage::FjClueRevealed { .. } => "fj_clue_revealed",
            ServerMessage::FjTimerStarted { .. } => "fj_timer_started",
            ServerMessage::FjAnswerSubmitted { .. } => "fj_answer_submitted",
            ServerMessage::FjAnswerJudged { .. } => "fj_answer_judged",
            ServerMessage::GameCompleted { .. } => "game_completed",
            ServerMessage::GameAbandoned {} => "game_abandoned",
            ServerMessage::Error { .. } => "error",
        }
    }

    /// Whether this frame is a per-client error rather than a broadcast.
    pub fn is_error(&self) -> bool {
        matches!(self, ServerMessage::Error { .. })
    }
}

impl From<ServerMessage> for serde_json::Value {
    fn from(msg: ServerMessage) -> Self {
        serde_json::to_value(msg).unwrap_or(serde_json::Value::Null)
    }
}

impl TryFrom<serde_json::Value> for ServerMessage {
    type Error = serde_json::Error;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn buzz_result_round_trips() {
        let msg = ServerMessage::BuzzResult {
            accepted: true,
            position: 1,
            winner: Some(1),
            cooldown: false,
            cooldown_remaining: 0.0,
            server_timestamp_us: 1_000_000,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"buzz_result\""));
        let back: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn scenario_s1_first_buzz_wins() {
        let winner = ServerMessage::BuzzResult {
            accepted: true,
            position: 1,
            winner: Some(1),
            cooldown: false,
            cooldown_remaining: 0.0,
            server_timestamp_us: 1_000_000,
        };
        let runner_up = ServerMessage::BuzzResult {
            accepted: true,
            position: 2,
            winner: Some(1),
            cooldown: false,
            cooldown_remaining: 0.0,
            server_timestamp_us: 1_000_050,
        };
        match (&winner, &runner_up) {
            (
                ServerMessage::BuzzResult { winner: w1, .. },
                ServerMessage::BuzzResult { winner: w2, .. },
            ) => assert_eq!(w1, w2),
            _ => panic!("expected BuzzResult variants"),
        }
    }

    #[test]
    fn scenario_s2_stale_token_rejected_with_cooldown() {
        let msg = ServerMessage::BuzzResult {
            accepted: false,
            position: -1,
            winner: None,
            cooldown: true,
            cooldown_remaining: 2.0,
            server_timestamp_us: 2_000_000,
        };
        assert!(!matches!(msg, ServerMessage::BuzzResult { accepted: true, .. }));
        if let ServerMessage::BuzzResult {
            position,
            cooldown_remaining,
            ..
        } = msg
        {
            assert_eq!(position, -1);
            assert_eq!(cooldown_remaining, 2.0);
        }
    }

    #[test]
    fn daily_double_detected_carries_no_clue_content() {
        let msg = ServerMessage::DailyDoubleDetected { player_number: 2 };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("question"));
        assert!(!json.contains("answer"));
    }

    #[test]
    fn error_helper_sets_message() {
        let msg = ServerMessage::error("Wager must be at least $5");
        assert!(msg.is_error());
        assert_eq!(msg.message_type(), "error");
    }

    #[test]
    fn error_with_code_uses_canonical_message() {
        let msg = ServerMessage::error_with_code(super::super::types::ErrorCode::WagerTooLow);
        match msg {
            ServerMessage::Error { message } => assert_eq!(message, "Wager must be at least $5"),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn game_completed_carries_final_scores() {
        let mut scores = HashMap::new();
        scores.insert(1, 5000);
        scores.insert(2, 1200);
        let msg = ServerMessage::GameCompleted { scores };
        let value: serde_json::Value = msg.clone().into();
        assert_eq!(value["type"], "game_completed");
        let back = ServerMessage::try_from(value).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn non_error_messages_report_is_error_false() {
        assert!(!ServerMessage::GameAbandoned {}.is_error());
    }
}
