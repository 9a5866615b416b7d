//! Tenant-scoped realtime event fan-out.
//!
//! Each tenant gets its own broadcast channel so a noisy hall never leaks
//! events into another hall's subscribers. Publishing with no subscribers
//! is a no-op, not an error.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::game::entities::{
    CallSource, CardId, GameStatus, Pattern, SessionId, TenantId,
};

const CHANNEL_CAPACITY: usize = 256;

/// Events pushed to display boards and operator consoles.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    NumberCalled {
        session_id: SessionId,
        session_number: i64,
        number: u8,
        source: CallSource,
        called_numbers: Vec<u8>,
    },
    SessionStatusChanged {
        session_id: SessionId,
        session_number: i64,
        status: GameStatus,
    },
    WinnerDeclared {
        session_id: SessionId,
        session_number: i64,
        card_id: CardId,
        prize: Decimal,
        pattern: Pattern,
    },
    JackpotAwarded {
        session_id: SessionId,
        session_number: i64,
        card_id: CardId,
        amount: Decimal,
        message: String,
    },
}

/// Per-tenant broadcast hub.
#[derive(Clone, Default)]
pub struct RealtimeDispatcher {
    channels: Arc<Mutex<HashMap<TenantId, broadcast::Sender<RealtimeEvent>>>>,
}

impl RealtimeDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, tenant_id: TenantId) -> broadcast::Sender<RealtimeEvent> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(tenant_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Subscribe to a tenant's event stream.
    pub fn subscribe(&self, tenant_id: TenantId) -> broadcast::Receiver<RealtimeEvent> {
        self.sender(tenant_id).subscribe()
    }

    /// Publish an event to every subscriber of the tenant.
    pub fn publish(&self, tenant_id: TenantId, event: RealtimeEvent) {
        // send only fails when nobody is listening, which is fine.
        let _ = self.sender(tenant_id).send(event);
    }
}
