//! Bingo game engine: entities, pattern matching, rigging, and calling.
//!
//! This module holds the pure domain core. Persistence, serialization of
//! concurrent access, and realtime fan-out live in [`crate::store`],
//! [`crate::engine`], and [`crate::realtime`].

pub mod calling;
pub mod constants;
pub mod entities;
pub mod errors;
pub mod patterns;
pub mod rigging;
pub mod session;

pub use calling::{CallAuditRecord, CallOutcome};
pub use entities::{
    Card, CardGrid, CardId, CallSource, Economics, GameSession, GameStatus, JackpotDraw,
    MarkedGrid, Pattern, PatternChoice, SessionId, TenantId, Winner,
};
pub use errors::{CallRejection, GameError, GameResult};
pub use patterns::MatchOutcome;
pub use rigging::{Rig, SequenceRigger};
pub use session::NewSession;
