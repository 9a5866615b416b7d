//! Domain error taxonomy for the session engine.
//!
//! Domain rejections are always typed and returned to the caller; only
//! infrastructure failures (`Storage`) should be mapped to 5xx semantics by
//! the API layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{CardId, GameStatus, SessionId};
use crate::store::StoreError;

/// Errors produced by session, call, and pattern operations.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("number {0} is outside 1..=75")]
    NumberOutOfRange(u8),

    #[error("unknown pattern {0:?}")]
    UnknownPattern(String),

    #[error("malformed card grid: {0}")]
    MalformedGrid(String),

    #[error("invalid economics: {0}")]
    InvalidEconomics(String),

    #[error("{0}")]
    Validation(String),

    #[error("session is {status}, operation requires {required}")]
    InvalidState {
        status: GameStatus,
        required: &'static str,
    },

    /// The number was already called. When raised from the forced queue the
    /// queue has already advanced past it, so an immediate retry succeeds.
    #[error("number {number} was already called")]
    AlreadyCalled {
        number: u8,
        remaining_forced: Vec<u8>,
    },

    #[error("number {number} is not in the forced sequence")]
    NotInForcedSequence {
        number: u8,
        remaining_forced: Vec<u8>,
    },

    /// Transient: another call for this session is in flight; retry after it
    /// resolves.
    #[error("a call is already in progress for session {0}")]
    CallInProgress(SessionId),

    #[error("no callable numbers remain")]
    Exhausted,

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("card {0} not found")]
    CardNotFound(CardId),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl GameError {
    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CallInProgress(_) | Self::AlreadyCalled { .. } | Self::Storage(_)
        )
    }

    /// Wire tag for audit records and API payloads.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NumberOutOfRange(_) => "number_out_of_range",
            Self::UnknownPattern(_) => "unknown_pattern",
            Self::MalformedGrid(_) => "malformed_grid",
            Self::InvalidEconomics(_) => "invalid_economics",
            Self::Validation(_) => "validation",
            Self::InvalidState { .. } => "invalid_state",
            Self::AlreadyCalled { .. } => "already_called",
            Self::NotInForcedSequence { .. } => "not_in_forced_sequence",
            Self::CallInProgress(_) => "call_in_progress",
            Self::Exhausted => "exhausted",
            Self::SessionNotFound(_) => "session_not_found",
            Self::CardNotFound(_) => "card_not_found",
            Self::Storage(_) => "storage",
        }
    }
}

/// Result alias for session engine operations.
pub type GameResult<T> = Result<T, GameError>;

/// Serializable snapshot of a rejected call, handed back to operators so
/// they can react to forced-sequence conflicts.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CallRejection {
    pub tag: String,
    pub message: String,
    pub remaining_forced: Vec<u8>,
}

impl From<&GameError> for CallRejection {
    fn from(err: &GameError) -> Self {
        let remaining_forced = match err {
            GameError::AlreadyCalled {
                remaining_forced, ..
            }
            | GameError::NotInForcedSequence {
                remaining_forced, ..
            } => remaining_forced.clone(),
            _ => Vec::new(),
        };
        Self {
            tag: err.tag().to_string(),
            message: err.to_string(),
            remaining_forced,
        }
    }
}
