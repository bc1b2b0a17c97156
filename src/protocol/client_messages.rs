//! Client-to-server messages.
//!
//! All frames a connected client (host, contestant, or spectator) can send
//! to the coordinator. Every frame is tagged with a `type` field for JSON
//! serialization; unrecognized `type` values fail to deserialize into this
//! enum and the Session Gateway reports them as a per-client error instead
//! of panicking.
//!
//! # Categories
//!
//! - **Board control**: `reveal_clue`, `enable_buzzer`, `next_clue`, `start_round`
//! - **Buzzing and judging**: `buzz`, `judge_answer`
//! - **Daily Double**: `reveal_daily_double`, `submit_wager`, `show_dd_clue`,
//!   `submit_dd_answer`, `judge_dd_answer`
//! - **Final Jeopardy**: `start_final_jeopardy`, `submit_fj_wager`,
//!   `reveal_fj_clue`, `start_fj_timer`, `submit_fj_answer`, `judge_fj_answer`
//! - **Host administration**: `reset_game`, `adjust_score`, `end_game`, `abandon_game`

use serde::{Deserialize, Serialize};

use super::types::{Round, Seat};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A contestant attempting to claim the buzzer. `timestamp` is the
    /// client's own clock reading and is advisory only — the server's
    /// microsecond timestamp, captured inside the atomic buzz transaction,
    /// is the only ordering authority.
    Buzz {
        player_number: Seat,
        #[serde(default)]
        timestamp: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unlock_token: Option<String>,
    },

    /// Host reveals a clue by id, moving it from idle into the locked
    /// `revealed` micro-state.
    RevealClue { clue_id: i64 },

    /// Host signals that reading the clue aloud is finished, minting a
    /// fresh unlock token and opening the buzzer.
    EnableBuzzer {},

    /// Host judges the current buzzer winner's spoken answer.
    JudgeAnswer {
        player_number: Seat,
        correct: bool,
        value: i64,
    },

    /// Host returns the board to idle after a clue resolves.
    NextClue {},

    /// Host wipes the board back to its initial state.
    ResetGame {},

    /// Host applies an arbitrary signed score adjustment outside normal play.
    AdjustScore {
        player_number: Seat,
        adjustment: i64,
    },

    /// Host advances the macro round (single → double → final).
    StartRound { round: Round },

    /// Host reveals that the current clue is a Daily Double (clue content
    /// still withheld from contestants).
    RevealDailyDouble {},

    /// The Daily Double wagerer submits their wager.
    SubmitWager { player_number: Seat, wager: i64 },

    /// Host reveals the Daily Double clue text after a wager is recorded.
    ShowDdClue {},

    /// The Daily Double wagerer submits their spoken answer as text.
    SubmitDdAnswer { player_number: Seat, answer: String },

    /// Host judges the Daily Double answer.
    JudgeDdAnswer { player_number: Seat, correct: bool },

    /// Host begins the Final Jeopardy round.
    StartFinalJeopardy {},

    /// A contestant submits their Final Jeopardy wager.
    SubmitFjWager { player_number: Seat, wager: i64 },

    /// Host reveals the Final Jeopardy clue text.
    RevealFjClue {},

    /// Host starts the (client-rendered, non-authoritative) answer timer.
    StartFjTimer {},

    /// A contestant submits their Final Jeopardy written answer.
    SubmitFjAnswer { player_number: Seat, answer: String },

    /// Host judges one contestant's Final Jeopardy answer.
    JudgeFjAnswer { player_number: Seat, correct: bool },

    /// Host ends the game, persisting scores and closing the session.
    EndGame {},

    /// Host abandons the game without declaring a winner.
    AbandonGame {},
}

impl ClientMessage {
    /// The wire `type` discriminant for this message, for logging without
    /// re-serializing the whole frame.
    pub fn message_type(&self) -> &'static str {
        match self {
            ClientMessage::Buzz { .. } => "buzz",
            ClientMessage::RevealClue { .. } => "reveal_clue",
            ClientMessage::EnableBuzzer {} => "enable_buzzer",
            ClientMessage::JudgeAnswer { .. } => "judge_answer",
            ClientMessage::NextClue {} => "next_clue",
            ClientMessage::ResetGame {} => "reset_game",
            ClientMessage::AdjustScore { .. } => "adjust_score",
            ClientMessage::StartRound { .. } => "start_round",
            ClientMessage::RevealDailyDouble {} => "reveal_daily_double",
            ClientMessage::SubmitWager { .. } => "submit_wager",
            ClientMessage::ShowDdClue {} => "show_dd_clue",
            ClientMessage::SubmitDdAnswer { .. } => "submit_dd_answer",
            ClientMessage::JudgeDdAnswer { .. } => "judge_dd_answer",
            ClientMessage::StartFinalJeopardy {} => "start_final_jeopardy",
            ClientMessage::SubmitFjWager { .. } => "submit_fj_wager",
            ClientMessage::RevealFjClue {} => "reveal_fj_clue",
            ClientMessage::StartFjTimer {} => "start_fj_timer",
            ClientMessage::SubmitFjAnswer { .. } => "submit_fj_answer",
            ClientMessage::JudgeFjAnswer { .. } => "judge_fj_answer",
            ClientMessage::EndGame {} => "end_game",
            ClientMessage::AbandonGame {} => "abandon_game",
        }
    }

    /// Messages only the host is permitted to send. The Session Gateway
    /// checks this before dispatch; a non-host sender gets a per-client
    /// error rather than the handler silently no-oping.
    pub fn requires_host(&self) -> bool {
        matches!(
            self,
            ClientMessage::RevealClue { .. }
                | ClientMessage::EnableBuzzer {}
                | ClientMessage::JudgeAnswer { .. }
                | ClientMessage::NextClue {}
                | ClientMessage::ResetGame {}
                | ClientMessage::AdjustScore { .. }
                | ClientMessage::StartRound { .. }
                | ClientMessage::RevealDailyDouble {}
                | ClientMessage::ShowDdClue {}
                | ClientMessage::JudgeDdAnswer { .. }
                | ClientMessage::StartFinalJeopardy {}
                | ClientMessage::RevealFjClue {}
                | ClientMessage::StartFjTimer {}
                | ClientMessage::JudgeFjAnswer { .. }
                | ClientMessage::EndGame {}
                | ClientMessage::AbandonGame {}
        )
    }

    /// Messages that name a specific seat as their actor (as opposed to
    /// host-only or broadcast-only messages), used to verify the sending
    /// connection is actually that seat before dispatch.
    pub fn requires_seat(&self) -> Option<Seat> {
        match self {
            ClientMessage::Buzz { player_number, .. }
            | ClientMessage::SubmitWager { player_number, .. }
            | ClientMessage::SubmitDdAnswer { player_number, .. }
            | ClientMessage::SubmitFjWager { player_number, .. }
            | ClientMessage::SubmitFjAnswer { player_number, .. } => Some(*player_number),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn buzz_deserializes_with_optional_unlock_token() {
        let json = r#"{"type":"buzz","player_number":2,"timestamp":1000000,"unlock_token":"abc123"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Buzz {
                player_number,
                timestamp,
                unlock_token,
            } => {
                assert_eq!(player_number, 2);
                assert_eq!(timestamp, Some(1_000_000));
                assert_eq!(unlock_token, Some("abc123".to_string()));
            }
            other => panic!("expected Buzz, got {other:?}"),
        }
    }

    #[test]
    fn buzz_without_unlock_token_defaults_to_none() {
        let json = r#"{"type":"buzz","player_number":1,"timestamp":500}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.message_type(), "buzz");
        match msg {
            ClientMessage::Buzz { unlock_token, .. } => assert!(unlock_token.is_none()),
            other => panic!("expected Buzz, got {other:?}"),
        }
    }

    #[test]
    fn reveal_clue_round_trips() {
        let msg = ClientMessage::RevealClue { clue_id: 42 };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"reveal_clue\""));
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn start_round_carries_round_enum() {
        let json = r#"{"type":"start_round","round":"double"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, ClientMessage::StartRound { round: Round::Double });
    }

    #[test]
    fn unknown_type_fails_to_deserialize() {
        let json = r#"{"type":"shuffle_board"}"#;
        let result: Result<ClientMessage, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn host_only_messages_are_flagged() {
        assert!(ClientMessage::ResetGame {}.requires_host());
        assert!(ClientMessage::EndGame {}.requires_host());
        assert!(!ClientMessage::Buzz {
            player_number: 1,
            timestamp: None,
            unlock_token: None
        }
        .requires_host());
    }

    #[test]
    fn seat_scoped_messages_report_the_seat() {
        let msg = ClientMessage::SubmitWager {
            player_number: 3,
            wager: 500,
        };
        assert_eq!(msg.requires_seat(), Some(3));
        assert_eq!(ClientMessage::NextClue {}.requires_seat(), None);
    }

    #[test]
    fn judge_answer_carries_value_and_correctness() {
        let json = r#"{"type":"judge_answer","player_number":1,"correct":false,"value":200}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::JudgeAnswer {
                player_number: 1,
                correct: false,
                value: 200
            }
        );
    }
}
