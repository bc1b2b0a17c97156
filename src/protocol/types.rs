//! Shared domain types for the game coordinator protocol.
//!
//! These types describe the board (episode/category/clue), the live state of
//! a single game session, and the handful of small value types (round,
//! status, buzzer/wager sub-states) that both client and server messages
//! reference.
//!
//! Numeric ids that cross the wire are serialized as JSON strings via
//! `serde_with`'s `DisplayFromStr`, matching how large integers are carried
//! in this protocol family to avoid precision loss in JavaScript clients.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Which of the three rounds a game is currently playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "round", rename_all = "snake_case")]
pub enum Round {
    Single,
    Double,
    Final,
}

impl Round {
    /// The per-round cap used when validating Daily Double wagers.
    pub fn daily_double_cap(self) -> i64 {
        match self {
            Round::Single => 1000,
            Round::Double => 2000,
            Round::Final => 2000,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Round::Single => "single",
            Round::Double => "double",
            Round::Final => "final",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle status of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "game_status", rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    Active,
    Paused,
    Completed,
    Abandoned,
}

impl GameStatus {
    /// Sessions in these states reject every mutating command except
    /// idempotent `end_game`/`abandon_game`.
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::Completed | GameStatus::Abandoned)
    }
}

/// A contestant's seat number. Valid range is 1..=6, enforced where seats
/// are assigned rather than in this newtype itself (so it stays a plain
/// `Copy` integer for map keys and wire round-tripping).
pub type Seat = u32;

/// A single clue belonging to a category.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clue {
    #[serde_as(as = "DisplayFromStr")]
    pub id: i64,
    pub position: u8,
    pub value: i64,
    pub question: String,
    pub answer: String,
    /// Catalog-level hint only. Per SPEC_FULL.md §9 / §4.3, the session's
    /// `daily_doubles` set is authoritative at runtime; this flag must
    /// never be consulted once a game is in progress.
    pub is_daily_double: bool,
}

/// An ordered set of clues under one heading.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde_as(as = "DisplayFromStr")]
    pub id: i64,
    pub name: String,
    pub round: Round,
    pub position: u8,
    pub clues: Vec<Clue>,
}

/// A complete episode: its categories, grouped implicitly by round via
/// each category's `round` field.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    #[serde_as(as = "DisplayFromStr")]
    pub id: i64,
    pub season: u32,
    pub episode_number: u32,
    pub categories: Vec<Category>,
}

impl Episode {
    pub fn categories_for(&self, round: Round) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(move |c| c.round == round)
    }

    pub fn find_clue(&self, clue_id: i64) -> Option<(&Category, &Clue)> {
        self.categories
            .iter()
            .find_map(|cat| cat.clues.iter().find(|cl| cl.id == clue_id).map(|cl| (cat, cl)))
    }
}

/// State of the shared buzzer for the clue currently in play.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuzzerState {
    pub locked: bool,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub unlock_token: Option<i64>,
    pub count: u32,
    pub winner: Option<Seat>,
    /// Seats that buzzed this window, in arrival order.
    pub order: Vec<Seat>,
    /// Per-seat server timestamp (microseconds) of their buzz attempt.
    pub timestamps: HashMap<Seat, i64>,
}

impl BuzzerState {
    /// Clear everything but leave `attempted_players` (tracked separately
    /// on `LiveGameState`) untouched — used by the clear-for-retry path.
    /// Leaves `locked = false`: the caller immediately mints a fresh
    /// unlock token and re-enables the buzzer for the remaining seats.
    pub fn clear_for_retry(&mut self) {
        self.locked = false;
        self.unlock_token = None;
        self.count = 0;
        self.winner = None;
        self.order.clear();
        self.timestamps.clear();
    }

    /// Full reset performed on `reveal_clue`/`next_clue`: locked until the
    /// host explicitly re-enables it.
    pub fn reset(&mut self) {
        self.clear_for_retry();
        self.locked = true;
    }
}

/// Stage of an in-progress Daily Double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DdStage {
    Detected,
    Revealed,
    Wagering,
    Answering,
    Judged,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyDoubleState {
    pub stage: DdStage,
    pub player_number: Seat,
    pub wager: Option<i64>,
    pub answer: Option<String>,
}

/// Stage of an in-progress Final Jeopardy round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FjStage {
    CategoryShown,
    ClueRevealed,
    TimerRunning,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalJeopardyState {
    pub stage: FjStage,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub clue_id: Option<i64>,
    pub category: Option<String>,
    pub wagers: HashMap<Seat, i64>,
    pub answers: HashMap<Seat, String>,
    pub judgments: HashMap<Seat, bool>,
}

impl Default for FinalJeopardyState {
    fn default() -> Self {
        Self {
            stage: FjStage::CategoryShown,
            clue_id: None,
            category: None,
            wagers: HashMap::new(),
            answers: HashMap::new(),
            judgments: HashMap::new(),
        }
    }
}

/// The full ephemeral state of a single game, as materialized in the
/// Ephemeral State Store.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveGameState {
    #[serde_as(as = "DisplayFromStr")]
    pub episode_id: i64,
    pub status: GameStatus,
    pub current_round: Round,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub current_clue: Option<i64>,
    pub current_player: Option<Seat>,
    #[serde_as(as = "HashSet<DisplayFromStr>")]
    pub revealed_clues: HashSet<i64>,
    #[serde_as(as = "HashSet<DisplayFromStr>")]
    pub daily_doubles: HashSet<i64>,
    pub buzzer: BuzzerState,
    pub attempted_players: HashSet<Seat>,
    pub cooldowns: HashMap<Seat, f64>,
    pub dd_state: Option<DailyDoubleState>,
    pub fj_state: Option<FinalJeopardyState>,
    pub scores: HashMap<Seat, i64>,
}

impl LiveGameState {
    pub fn new(episode_id: i64) -> Self {
        Self {
            episode_id,
            status: GameStatus::Waiting,
            current_round: Round::Single,
            current_clue: None,
            current_player: None,
            revealed_clues: HashSet::new(),
            daily_doubles: HashSet::new(),
            buzzer: BuzzerState::default(),
            attempted_players: HashSet::new(),
            cooldowns: HashMap::new(),
            dd_state: None,
            fj_state: None,
            scores: HashMap::new(),
        }
    }
}

/// A participant's public identity within a game, as broadcast alongside
/// scores (keys of the surrounding map are always seat numbers).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub seat: Seat,
    #[serde_as(as = "DisplayFromStr")]
    pub player_id: i64,
    pub name: String,
}

/// One row of a ranked leaderboard, produced by the Durable Store's
/// `ranked_scores` query. Ties share a rank; the next distinct score's
/// rank skips the tied count (standard competition ranking).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedScore {
    pub rank: u32,
    pub seat: Seat,
    pub name: String,
    pub score: i64,
}

/// Taxonomy of error conditions the coordinator can report to a client,
/// either as a per-client `error` frame or as the reason a REST call
/// returned 400/404. See SPEC_FULL.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    GameNotFound,
    EpisodeNotFound,
    ClueNotFound,
    SeatNotFound,
    GameAlreadyCompleted,
    GameAlreadyAbandoned,
    GameNotActive,
    InvalidRound,
    InvalidClue,
    NotDailyDoubleWagerer,
    WagerTooLow,
    WagerTooHigh,
    NotYourTurn,
    UnknownMessageType,
    InvalidRequest,
    InternalError,
}

impl ErrorCode {
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::GameNotFound => "Game not found",
            ErrorCode::EpisodeNotFound => "Episode not found",
            ErrorCode::ClueNotFound => "Clue not found in this episode",
            ErrorCode::SeatNotFound => "No participant in that seat",
            ErrorCode::GameAlreadyCompleted => "Game has already completed",
            ErrorCode::GameAlreadyAbandoned => "Game has already been abandoned",
            ErrorCode::GameNotActive => "Game is not active",
            ErrorCode::InvalidRound => "Invalid round",
            ErrorCode::InvalidClue => "Clue is not valid for the current round",
            ErrorCode::NotDailyDoubleWagerer => "You are not the Daily Double wagerer",
            ErrorCode::WagerTooLow => "Wager must be at least $5",
            ErrorCode::WagerTooHigh => "Wager exceeds the allowed maximum",
            ErrorCode::NotYourTurn => "It is not your turn",
            ErrorCode::UnknownMessageType => "Unknown message type",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InternalError => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_caps_match_single_and_double() {
        assert_eq!(Round::Single.daily_double_cap(), 1000);
        assert_eq!(Round::Double.daily_double_cap(), 2000);
    }

    #[test]
    fn game_status_terminal_states() {
        assert!(GameStatus::Completed.is_terminal());
        assert!(GameStatus::Abandoned.is_terminal());
        assert!(!GameStatus::Active.is_terminal());
        assert!(!GameStatus::Waiting.is_terminal());
    }

    #[test]
    fn clue_ids_serialize_as_strings() {
        let clue = Clue {
            id: 42,
            position: 0,
            value: 200,
            question: "question".into(),
            answer: "answer".into(),
            is_daily_double: false,
        };
        let json = serde_json::to_string(&clue).unwrap();
        assert!(json.contains("\"id\":\"42\""));
    }

    #[test]
    fn episode_find_clue_locates_nested_clue() {
        let episode = Episode {
            id: 1,
            season: 10,
            episode_number: 42,
            categories: vec![Category {
                id: 1,
                name: "History".into(),
                round: Round::Single,
                position: 0,
                clues: vec![Clue {
                    id: 99,
                    position: 0,
                    value: 200,
                    question: "q".into(),
                    answer: "a".into(),
                    is_daily_double: false,
                }],
            }],
        };
        let (cat, clue) = episode.find_clue(99).expect("clue should be found");
        assert_eq!(cat.name, "History");
        assert_eq!(clue.value, 200);
        assert!(episode.find_clue(1000).is_none());
    }

    #[test]
    fn live_game_state_starts_empty() {
        let state = LiveGameState::new(7);
        assert_eq!(state.status, GameStatus::Waiting);
        assert_eq!(state.current_round, Round::Single);
        assert!(state.revealed_clues.is_empty());
        assert!(state.current_player.is_none());
    }

    #[test]
    fn buzzer_clear_for_retry_unlocks_and_clears() {
        let mut buzzer = BuzzerState {
            locked: false,
            unlock_token: Some(12345),
            count: 1,
            winner: Some(2),
            order: vec![2],
            timestamps: HashMap::from([(2, 1_000_000)]),
        };
        buzzer.clear_for_retry();
        assert!(!buzzer.locked);
        assert!(buzzer.unlock_token.is_none());
        assert_eq!(buzzer.count, 0);
        assert!(buzzer.winner.is_none());
        assert!(buzzer.order.is_empty());
    }

    #[test]
    fn buzzer_reset_clears_and_relocks() {
        let mut buzzer = BuzzerState {
            locked: false,
            unlock_token: Some(12345),
            count: 1,
            winner: Some(2),
            order: vec![2],
            timestamps: HashMap::from([(2, 1_000_000)]),
        };
        buzzer.reset();
        assert!(buzzer.locked);
        assert!(buzzer.unlock_token.is_none());
    }

    #[test]
    fn error_code_messages_are_stable() {
        assert_eq!(ErrorCode::WagerTooLow.message(), "Wager must be at least $5");
        assert_eq!(ErrorCode::GameNotFound.to_string(), "Game not found");
    }
}
