//! Typed errors for each component boundary.
//!
//! Every fallible operation in this crate returns one of these enums rather
//! than a boxed/opaque error, so the Session Gateway can convert a handler
//! failure into the right wire-level response (a per-client `error` frame,
//! a `buzz_result` rejection, or a close code) with a single exhaustive
//! match instead of string sniffing.

use thiserror::Error;

use crate::protocol::types::{ErrorCode, Seat};

/// Errors from the read-only episode catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("episode {0} not found")]
    EpisodeNotFound(i64),
    #[error("clue {0} not found in episode")]
    ClueNotFound(i64),
}

/// Errors from the ephemeral and durable stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("game {0} not found")]
    GameNotFound(String),
    #[error("seat {0} has no participant")]
    SeatNotFound(Seat),
    #[error("durable store operation failed: {0}")]
    Persistence(String),
}

/// Errors raised by the round state machine while handling a client
/// command. These map directly onto SPEC_FULL.md §7's taxonomy.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("game has already completed")]
    AlreadyCompleted,
    #[error("game has already been abandoned")]
    AlreadyAbandoned,
    #[error("game is not active")]
    NotActive,
    #[error("clue {clue_id} is not valid for the current round")]
    InvalidClue { clue_id: i64 },
    #[error("seat {seat} is not the Daily Double wagerer")]
    NotDailyDoubleWagerer { seat: Seat },
    #[error("wager ${wager} is below the ${minimum} minimum")]
    WagerTooLow { wager: i64, minimum: i64 },
    #[error("wager ${wager} exceeds the ${maximum} maximum")]
    WagerTooHigh { wager: i64, maximum: i64 },
    #[error("seat {0} already attempted this clue")]
    AlreadyAttempted(Seat),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl GameError {
    /// The wire-level `ErrorCode` for this failure, carrying the same
    /// canonical message the client error taxonomy (SPEC_FULL.md §7) uses
    /// regardless of the internal `Display` text's extra detail.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            GameError::AlreadyCompleted => ErrorCode::GameAlreadyCompleted,
            GameError::AlreadyAbandoned => ErrorCode::GameAlreadyAbandoned,
            GameError::NotActive => ErrorCode::GameNotActive,
            GameError::InvalidClue { .. } => ErrorCode::InvalidClue,
            GameError::NotDailyDoubleWagerer { .. } => ErrorCode::NotDailyDoubleWagerer,
            GameError::WagerTooLow { .. } => ErrorCode::WagerTooLow,
            GameError::WagerTooHigh { .. } => ErrorCode::WagerTooHigh,
            GameError::AlreadyAttempted(_) => ErrorCode::InvalidRequest,
            GameError::Store(inner) => match inner {
                StoreError::GameNotFound(_) => ErrorCode::GameNotFound,
                StoreError::SeatNotFound(_) => ErrorCode::SeatNotFound,
                StoreError::Persistence(_) => ErrorCode::InternalError,
            },
            GameError::Catalog(inner) => match inner {
                CatalogError::EpisodeNotFound(_) => ErrorCode::EpisodeNotFound,
                CatalogError::ClueNotFound(_) => ErrorCode::ClueNotFound,
            },
        }
    }
}

/// Errors at the Session Gateway boundary — the outermost layer, which
/// converts everything below into a wire-level response.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unknown message type")]
    UnknownMessageType,
    #[error("sender is not the host")]
    NotHost,
    #[error("sender does not occupy seat {0}")]
    WrongSeat(Seat),
    #[error(transparent)]
    Game(#[from] GameError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wager_too_low_maps_to_the_scenario_s3_literal_message() {
        let err = GameError::WagerTooLow { wager: 4, minimum: 5 };
        assert_eq!(err.error_code().message(), "Wager must be at least $5");
    }

    #[test]
    fn already_completed_maps_to_its_error_code() {
        assert_eq!(GameError::AlreadyCompleted.error_code(), ErrorCode::GameAlreadyCompleted);
    }
}
