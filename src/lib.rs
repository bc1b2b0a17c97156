//! Jeopardy Game Coordinator Library
//!
//! This crate implements the coordinator for a live, multi-participant
//! Jeopardy-style trivia game: a per-room state machine that arbitrates the
//! shared buzzer, tracks scores, advances the three-round game, and fans out
//! authoritative state to every connected client. It includes:
//!
//! - A WebSocket protocol (message envelopes, client/server message types)
//! - The read-only episode catalog
//! - An ephemeral state store and an atomic buzzer arbitrator
//! - The round state machine (normal play, Daily Double, Final Jeopardy)
//! - A durable store for participant scores and audit events
//! - The session gateway that ties a WebSocket connection to a game room
//!
//! # Usage
//!
//! ```rust
//! use jeopardy_coordinator::protocol::{ClientMessage, ServerMessage, Envelope};
//!
//! // Parse an incoming client message
//! let json = r#"{"type":"buzz","player_number":2,"timestamp":1000000}"#;
//! let msg: ClientMessage = serde_json::from_str(json).unwrap();
//!
//! // Create a server response
//! let response = ServerMessage::BuzzResult {
//!     accepted: true,
//!     position: 1,
//!     winner: Some(2),
//!     cooldown: false,
//!     cooldown_remaining: 0.0,
//!     server_timestamp_us: 1_000_000,
//! };
//!
//! // Optionally wrap in envelope for reliable delivery
//! let envelope = Envelope::new(42, response);
//! ```

pub mod audit;
pub mod buzzer;
pub mod catalog;
pub mod config;
pub mod error;
pub mod game;
pub mod gateway;
pub mod player;
pub mod protocol;
pub mod store;

// Re-export commonly used items at crate root for convenience
pub use error::{CatalogError, GameError, GatewayError, StoreError};
pub use protocol::{
    ClientMessage, Clue, Category, DailyDoubleState, DdStage, Envelope, Episode, ErrorCode,
    FinalJeopardyState, FjStage, GameStatus, LiveGameState, MaybeEnveloped, RankedScore, Round,
    Seat, ServerMessage,
};
