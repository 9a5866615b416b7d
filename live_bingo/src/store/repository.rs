//! Repository trait definitions for testability and dependency injection.
//!
//! Mutating jackpot operations are deliberately coarse: a record update and
//! its ledger entry travel through one method call so every implementation
//! can apply them as a single atomic unit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::StoreResult;
use crate::game::calling::CallAuditRecord;
use crate::game::entities::{Card, CardId, GameSession, SessionId, TenantId};
use crate::jackpot::models::{FutureWinnerConfig, JackpotLedgerEntry, JackpotRecord};

/// Game session persistence.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Allocate the next per-tenant session number via an atomic
    /// increment-and-read. Never derived from the max of existing rows.
    async fn next_session_number(&self, tenant_id: TenantId) -> StoreResult<i64>;

    async fn insert_session(&self, session: &GameSession) -> StoreResult<()>;

    async fn update_session(&self, session: &GameSession) -> StoreResult<()>;

    async fn get_session(&self, id: SessionId) -> StoreResult<Option<GameSession>>;

    async fn get_session_by_number(
        &self,
        tenant_id: TenantId,
        session_number: i64,
    ) -> StoreResult<Option<GameSession>>;

    async fn list_sessions(&self, tenant_id: TenantId) -> StoreResult<Vec<GameSession>>;
}

/// Read-only card catalog.
#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn get_card(&self, id: CardId) -> StoreResult<Option<Card>>;

    /// Fetch a batch of cards; missing ids are simply absent from the result.
    async fn get_cards(&self, ids: &[CardId]) -> StoreResult<Vec<Card>>;
}

/// Jackpot record, append-only ledger, and future winner configurations.
#[async_trait]
pub trait JackpotRepository: Send + Sync {
    async fn get_record(&self, tenant_id: TenantId) -> StoreResult<Option<JackpotRecord>>;

    /// Persist the record and, when given, its ledger entry atomically.
    /// A failure leaves the balance unchanged and writes no partial entry.
    async fn save_record_with_entry(
        &self,
        record: &JackpotRecord,
        entry: Option<&JackpotLedgerEntry>,
    ) -> StoreResult<()>;

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<JackpotLedgerEntry>>;

    async fn list_entries(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> StoreResult<Vec<JackpotLedgerEntry>>;

    /// Rewrite a ledger entry and the reversed-and-reapplied record together.
    async fn update_entry_with_record(
        &self,
        entry: &JackpotLedgerEntry,
        record: &JackpotRecord,
    ) -> StoreResult<()>;

    /// Delete a ledger entry and persist the record with its delta reversed.
    async fn delete_entry_with_record(
        &self,
        entry_id: Uuid,
        record: &JackpotRecord,
    ) -> StoreResult<()>;

    async fn insert_future_config(&self, config: &FutureWinnerConfig) -> StoreResult<()>;

    /// Consume the unused future winner config for a session number, marking
    /// it used so it can never apply twice.
    async fn take_future_config(
        &self,
        tenant_id: TenantId,
        session_number: i64,
    ) -> StoreResult<Option<FutureWinnerConfig>>;
}

/// Append-only call audit log with time-based retention.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append_audit(&self, record: &CallAuditRecord) -> StoreResult<()>;

    async fn list_audits_for_session(
        &self,
        session_id: SessionId,
    ) -> StoreResult<Vec<CallAuditRecord>>;

    /// Purge audit rows older than the cutoff; returns how many were removed.
    async fn purge_audits_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}
