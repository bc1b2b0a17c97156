//! Player identity and seat-context types.
//!
//! These types are the single source of truth for a connected player's
//! identity and which seat (if any) they currently occupy.

use crate::protocol::types::Seat;

/// Core player identity - the immutable parts that identify a player.
///
/// This is embedded in all player-related structs to avoid field duplication.
/// Contains the fields that are constant for a player's session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PlayerIdentity {
    /// Database user ID
    pub user_id: i64,
    /// Display name
    pub username: String,
    /// Avatar URL if available
    pub avatar_url: Option<String>,
}

impl PlayerIdentity {
    /// Create a new player identity.
    #[must_use]
    pub fn new(user_id: i64, username: impl Into<String>, avatar_url: Option<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            avatar_url,
        }
    }
}

/// Player context for a connected session.
///
/// This is the single source of truth for a player's identity and current
/// seat. It's created on WebSocket connect and updated as the player joins
/// or leaves a game, or is reassigned a seat on reconnect.
///
/// Contains both identity (immutable for session) and session state (mutable).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlayerContext {
    /// Core identity (immutable for session)
    pub identity: PlayerIdentity,
    /// Whether player has host privileges for the game they're in
    pub is_host: bool,

    // === Session state (mutable) ===
    /// Current game ID if connected to a game
    pub game_id: Option<String>,
    /// Seat number (1..=6) if occupying a contestant seat; absent for the
    /// host and for spectators.
    pub seat: Option<Seat>,
}

impl PlayerContext {
    /// Create a new context for a freshly connected player.
    #[must_use]
    pub fn new(user_id: i64, username: impl Into<String>, avatar_url: Option<String>, is_host: bool) -> Self {
        Self {
            identity: PlayerIdentity::new(user_id, username, avatar_url),
            is_host,
            game_id: None,
            seat: None,
        }
    }

    /// Create context from an existing identity.
    #[must_use]
    pub fn from_identity(identity: PlayerIdentity, is_host: bool) -> Self {
        Self {
            identity,
            is_host,
            game_id: None,
            seat: None,
        }
    }

    // === Convenience accessors ===

    /// Get user ID.
    #[must_use]
    pub fn user_id(&self) -> i64 {
        self.identity.user_id
    }

    /// Get username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.identity.username
    }

    /// Get avatar URL.
    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.identity.avatar_url.as_deref()
    }

    // === State checks ===

    /// Check if player is connected to a game at all (host, contestant, or spectator).
    #[must_use]
    pub fn in_game(&self) -> bool {
        self.game_id.is_some()
    }

    /// Check if player occupies a contestant seat (as opposed to spectating
    /// or hosting).
    #[must_use]
    pub fn is_seated(&self) -> bool {
        self.seat.is_some()
    }

    // === State mutations ===

    /// Update game membership and seat assignment together, since a seat
    /// is only meaningful within the game it was assigned in.
    pub fn set_game(&mut self, game_id: Option<String>, seat: Option<Seat>) {
        self.game_id = game_id;
        self.seat = seat;
    }
}
