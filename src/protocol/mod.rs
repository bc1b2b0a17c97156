//! Protocol module for the game coordinator's session transport.
//!
//! This module defines all message types exchanged between connected
//! clients (host, contestants, spectators) and the coordinator over a
//! single bidirectional WebSocket connection per client.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           Protocol Layer                             │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  envelope.rs     - Message wrapper with seq/ack/timestamp           │
//! │  types.rs        - Shared data types (Episode, LiveGameState, ...)  │
//! │  client_messages - Client → Server message definitions              │
//! │  server_messages - Server → Client message definitions              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Message Flow
//!
//! ```text
//! Host                                   Server                    Contestants
//!   │                                       │                           │
//!   │──── reveal_clue ─────────────────────▶│                           │
//!   │                                       │──── clue_revealed ───────▶│
//!   │──── enable_buzzer ───────────────────▶│                           │
//!   │                                       │──── buzzer_enabled ──────▶│
//!   │                                       │◀─── buzz ─────────────────│
//!   │                                       │──── buzz_result ─────────▶│
//!   │──── judge_answer ────────────────────▶│                           │
//!   │                                       │──── answer_judged ───────▶│
//! ```
//!
//! # Envelope Format (Optional)
//!
//! Messages can be sent raw or wrapped in an envelope:
//!
//! ```json
//! // Raw
//! {"type": "next_clue"}
//!
//! // With envelope
//! {"seq": 42, "ack": 41, "ts": 1701234567890, "payload": {"type": "next_clue"}}
//! ```

pub mod client_messages;
pub mod envelope;
pub mod server_messages;
pub mod types;

// Re-export main types for convenient access
pub use client_messages::ClientMessage;
pub use envelope::{Envelope, MaybeEnveloped};
pub use server_messages::ServerMessage;
pub use types::*;

// ============================================================================
// Protocol Constants
// ============================================================================

/// Recommended heartbeat interval (client should send one this often).
pub const HEARTBEAT_INTERVAL_MS: u32 = 30_000;

/// Heartbeat timeout (server closes connection if no heartbeat received).
pub const HEARTBEAT_TIMEOUT_MS: u32 = 45_000;

/// Grace period for reconnection before a session's seat is released.
pub const RECONNECT_GRACE_MS: u32 = 60_000;

/// Maximum message size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KB

/// Protocol version for compatibility checks.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Close code sent when a client connects to a game id the Durable Store
/// has no record of.
pub const CLOSE_GAME_NOT_FOUND: u16 = 4004;

// ============================================================================
// Envelope helpers
// ============================================================================

/// Parses a raw frame, accepting either the legacy unwrapped shape or an
/// envelope. Returns the payload plus the sequence/ack pair if the frame
/// was enveloped.
pub mod framing {
    use super::*;

    pub fn parse_client_message(
        json: &str,
    ) -> Result<(ClientMessage, Option<u64>, Option<u64>), serde_json::Error> {
        let enveloped: MaybeEnveloped<ClientMessage> = serde_json::from_str(json)?;
        match enveloped {
            MaybeEnveloped::Enveloped(env) => Ok((env.payload, Some(env.seq), env.ack)),
            MaybeEnveloped::Raw(msg) => Ok((msg, None, None)),
        }
    }

    pub fn serialize_server_message(
        msg: &ServerMessage,
        seq: Option<u64>,
        ack: Option<u64>,
    ) -> Result<String, serde_json::Error> {
        match seq {
            Some(seq) => {
                let envelope = match ack {
                    Some(ack) => Envelope::with_ack(seq, ack, msg),
                    None => Envelope::new(seq, msg),
                };
                serde_json::to_string(&envelope)
            }
            None => serde_json::to_string(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_raw_next_clue() {
        let json = r#"{"type":"next_clue"}"#;
        let (msg, seq, ack) = framing::parse_client_message(json).unwrap();
        assert!(matches!(msg, ClientMessage::NextClue {}));
        assert!(seq.is_none());
        assert!(ack.is_none());
    }

    #[test]
    fn parse_enveloped_buzz() {
        let json = r#"{"seq":42,"ack":41,"ts":12345,"payload":{"type":"buzz","player_number":1,"timestamp":500}}"#;
        let (msg, seq, ack) = framing::parse_client_message(json).unwrap();
        assert!(matches!(msg, ClientMessage::Buzz { player_number: 1, .. }));
        assert_eq!(seq, Some(42));
        assert_eq!(ack, Some(41));
    }

    #[test]
    fn serialize_without_envelope() {
        let msg = ServerMessage::GameAbandoned {};
        let json = framing::serialize_server_message(&msg, None, None).unwrap();
        assert!(!json.contains("seq"));
        assert!(json.contains("game_abandoned"));
    }

    #[test]
    fn serialize_with_envelope() {
        let msg = ServerMessage::GameAbandoned {};
        let json = framing::serialize_server_message(&msg, Some(1), Some(0)).unwrap();
        assert!(json.contains(r#""seq":1"#));
        assert!(json.contains(r#""ack":0"#));
        assert!(json.contains("payload"));
    }

    #[test]
    fn constants_are_consistent() {
        assert_eq!(HEARTBEAT_INTERVAL_MS, 30_000);
        assert!(HEARTBEAT_TIMEOUT_MS > HEARTBEAT_INTERVAL_MS);
        assert!(RECONNECT_GRACE_MS > HEARTBEAT_TIMEOUT_MS);
        assert_eq!(CLOSE_GAME_NOT_FOUND, 4004);
    }
}
