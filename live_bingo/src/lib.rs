//! Multi-tenant live bingo session engine.
//!
//! Each tenant (a cashier or moderator account) runs independent bingo
//! rounds: cards are selected from an immutable catalog, numbers are called
//! manually, from a forced sequence, or at random, and cards are checked
//! against a win pattern. Sessions may be covertly rigged so a chosen card
//! completes its pattern on a randomized call index, and a progressive
//! per-tenant jackpot is funded from each session's pot and settled through
//! an append-only ledger.
//!
//! Layering:
//!
//! - [`game`] is the pure domain core: entities, the session state machine,
//!   pattern matching, rigging, and call selection.
//! - [`jackpot`] holds the jackpot record, ledger, and future winner
//!   configurations.
//! - [`store`] abstracts persistence behind repository traits, with a
//!   PostgreSQL implementation and an in-memory one for tests.
//! - [`engine`] orchestrates: the [`engine::SessionService`] wires domain
//!   mutations to persistence, per-session call serialization, auditing,
//!   scheduling, and realtime fan-out.
//! - [`realtime`] fans events out to display boards per tenant.

pub mod engine;
pub mod game;
pub mod jackpot;
pub mod realtime;
pub mod store;

pub use engine::{BingoCheck, CreateSession, SessionService};
pub use game::{GameError, GameResult, GameSession};
pub use jackpot::JackpotManager;
pub use realtime::{RealtimeDispatcher, RealtimeEvent};
