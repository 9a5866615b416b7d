//! Per-session call serialization.
//!
//! A call that loses the race gets an immediate [`GameError::CallInProgress`]
//! instead of queueing behind the winner.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::game::entities::SessionId;
use crate::game::errors::{GameError, GameResult};

/// Tracks which sessions currently have a call in flight.
#[derive(Clone, Default)]
pub struct CallGuard {
    busy: Arc<Mutex<HashSet<SessionId>>>,
}

impl CallGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the session for one call. The permit releases the claim when
    /// dropped, including on early returns and panics.
    pub fn try_acquire(&self, session_id: SessionId) -> GameResult<CallPermit> {
        let mut busy = self
            .busy
            .lock()
            .map_err(|_| GameError::CallInProgress(session_id))?;
        if !busy.insert(session_id) {
            return Err(GameError::CallInProgress(session_id));
        }
        Ok(CallPermit {
            busy: Arc::clone(&self.busy),
            session_id,
        })
    }
}

/// RAII claim on a session's call slot.
pub struct CallPermit {
    busy: Arc<Mutex<HashSet<SessionId>>>,
    session_id: SessionId,
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if let Ok(mut busy) = self.busy.lock() {
            busy.remove(&self.session_id);
        }
    }
}
