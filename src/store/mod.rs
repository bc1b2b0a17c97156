//! Storage layer: the Ephemeral State Store and the Durable Store.
//!
//! These are kept as two separate modules because they have entirely
//! different consistency and performance characteristics (see
//! SPEC_FULL.md §2/§4.1/§4.5): the ephemeral store is an in-process,
//! low-latency structure the Buzzer Arbitrator depends on for atomic
//! transactions, while the durable store is a Postgres-backed system of
//! record that may block and is never touched from inside an ephemeral
//! transaction.

pub mod durable;
pub mod ephemeral;

pub use durable::{AuditEventRow, ClueRevealRow, DurableStore, GameRow, InMemoryDurableStore, ParticipantRow, PgDurableStore};
pub use ephemeral::EphemeralStore;
