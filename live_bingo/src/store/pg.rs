//! PostgreSQL implementations of the repository traits.
//!
//! Session bodies, grids, and sequences are stored as JSON text next to the
//! columns that need indexing; money columns are `NUMERIC`. Every coarse
//! mutation runs inside a single transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use uuid::Uuid;

use super::repository::{
    AuditRepository, CardRepository, JackpotRepository, SessionRepository,
};
use super::{StoreError, StoreResult};
use crate::game::calling::CallAuditRecord;
use crate::game::entities::{Card, CardGrid, CardId, GameSession, SessionId, TenantId};
use crate::jackpot::models::{FutureWinnerConfig, JackpotLedgerEntry, JackpotRecord};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn write_record(
        tx: &mut Transaction<'_, Postgres>,
        record: &JackpotRecord,
    ) -> StoreResult<()> {
        let last_award = serde_json::to_string(&record.last_award)?;
        sqlx::query(
            "INSERT INTO jackpot_records (tenant_id, amount, base_amount, enabled, updated_at, last_award)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (tenant_id)
             DO UPDATE SET amount = EXCLUDED.amount,
                           base_amount = EXCLUDED.base_amount,
                           enabled = EXCLUDED.enabled,
                           updated_at = EXCLUDED.updated_at,
                           last_award = EXCLUDED.last_award",
        )
        .bind(record.tenant_id)
        .bind(record.amount)
        .bind(record.base_amount)
        .bind(record.enabled)
        .bind(record.updated_at)
        .bind(last_award)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn row_to_session(row: &sqlx::postgres::PgRow) -> StoreResult<GameSession> {
    let data: String = row.get("data");
    Ok(serde_json::from_str(&data)?)
}

fn row_to_entry(row: &sqlx::postgres::PgRow) -> JackpotLedgerEntry {
    JackpotLedgerEntry {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        delta: row.get("delta"),
        reason: row.get("reason"),
        session_number: row.get("session_number"),
        is_award: row.get("is_award"),
        winner_card_id: row.get("winner_card_id"),
        triggered_by_cashier: row.get("triggered_by_cashier"),
        created_at: row.get("created_at"),
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> StoreResult<JackpotRecord> {
    let last_award: String = row.get("last_award");
    Ok(JackpotRecord {
        tenant_id: row.get("tenant_id"),
        amount: row.get("amount"),
        base_amount: row.get("base_amount"),
        enabled: row.get("enabled"),
        updated_at: row.get("updated_at"),
        last_award: serde_json::from_str(&last_award)?,
    })
}

#[async_trait]
impl SessionRepository for PgStore {
    async fn next_session_number(&self, tenant_id: TenantId) -> StoreResult<i64> {
        let row = sqlx::query(
            "INSERT INTO session_counters (tenant_id, n) VALUES ($1, 1)
             ON CONFLICT (tenant_id) DO UPDATE SET n = session_counters.n + 1
             RETURNING n",
        )
        .bind(tenant_id)
        .fetch_one(self.pool.as_ref())
        .await?;
        Ok(row.get("n"))
    }

    async fn insert_session(&self, session: &GameSession) -> StoreResult<()> {
        let data = serde_json::to_string(session)?;
        sqlx::query(
            "INSERT INTO game_sessions (id, tenant_id, session_number, status, data, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(session.id)
        .bind(session.tenant_id)
        .bind(session.session_number)
        .bind(session.status.to_string())
        .bind(data)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn update_session(&self, session: &GameSession) -> StoreResult<()> {
        let data = serde_json::to_string(session)?;
        let result = sqlx::query(
            "UPDATE game_sessions SET status = $2, data = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(session.id)
        .bind(session.status.to_string())
        .bind(data)
        .bind(session.updated_at)
        .execute(self.pool.as_ref())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "session {} vanished during update",
                session.id
            )));
        }
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> StoreResult<Option<GameSession>> {
        let row = sqlx::query("SELECT data FROM game_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.as_ref().map(row_to_session).transpose()
    }

    async fn get_session_by_number(
        &self,
        tenant_id: TenantId,
        session_number: i64,
    ) -> StoreResult<Option<GameSession>> {
        let row = sqlx::query(
            "SELECT data FROM game_sessions WHERE tenant_id = $1 AND session_number = $2",
        )
        .bind(tenant_id)
        .bind(session_number)
        .fetch_optional(self.pool.as_ref())
        .await?;
        row.as_ref().map(row_to_session).transpose()
    }

    async fn list_sessions(&self, tenant_id: TenantId) -> StoreResult<Vec<GameSession>> {
        let rows = sqlx::query(
            "SELECT data FROM game_sessions WHERE tenant_id = $1 ORDER BY session_number ASC",
        )
        .bind(tenant_id)
        .fetch_all(self.pool.as_ref())
        .await?;
        rows.iter().map(row_to_session).collect()
    }
}

#[async_trait]
impl CardRepository for PgStore {
    async fn get_card(&self, id: CardId) -> StoreResult<Option<Card>> {
        let row = sqlx::query("SELECT id, grid FROM cards WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.map(|row| {
            let grid: String = row.get("grid");
            Ok(Card {
                id: row.get("id"),
                grid: serde_json::from_str::<CardGrid>(&grid)?,
            })
        })
        .transpose()
    }

    async fn get_cards(&self, ids: &[CardId]) -> StoreResult<Vec<Card>> {
        let rows = sqlx::query("SELECT id, grid FROM cards WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(self.pool.as_ref())
            .await?;
        rows.into_iter()
            .map(|row| {
                let grid: String = row.get("grid");
                Ok(Card {
                    id: row.get("id"),
                    grid: serde_json::from_str::<CardGrid>(&grid)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl JackpotRepository for PgStore {
    async fn get_record(&self, tenant_id: TenantId) -> StoreResult<Option<JackpotRecord>> {
        let row = sqlx::query(
            "SELECT tenant_id, amount, base_amount, enabled, updated_at, last_award
             FROM jackpot_records WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(self.pool.as_ref())
        .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn save_record_with_entry(
        &self,
        record: &JackpotRecord,
        entry: Option<&JackpotLedgerEntry>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::write_record(&mut tx, record).await?;
        if let Some(entry) = entry {
            sqlx::query(
                "INSERT INTO jackpot_ledger_entries
                 (id, tenant_id, delta, reason, session_number, is_award, winner_card_id, triggered_by_cashier, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(entry.id)
            .bind(entry.tenant_id)
            .bind(entry.delta)
            .bind(&entry.reason)
            .bind(entry.session_number)
            .bind(entry.is_award)
            .bind(entry.winner_card_id)
            .bind(entry.triggered_by_cashier)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<JackpotLedgerEntry>> {
        let row = sqlx::query(
            "SELECT id, tenant_id, delta, reason, session_number, is_award, winner_card_id, triggered_by_cashier, created_at
             FROM jackpot_ledger_entries WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row.as_ref().map(row_to_entry))
    }

    async fn list_entries(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> StoreResult<Vec<JackpotLedgerEntry>> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, delta, reason, session_number, is_award, winner_card_id, triggered_by_cashier, created_at
             FROM jackpot_ledger_entries
             WHERE tenant_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(tenant_id)
        .bind(limit as i64)
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(rows.iter().map(row_to_entry).collect())
    }

    async fn update_entry_with_record(
        &self,
        entry: &JackpotLedgerEntry,
        record: &JackpotRecord,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE jackpot_ledger_entries
             SET delta = $2, reason = $3, winner_card_id = $4
             WHERE id = $1",
        )
        .bind(entry.id)
        .bind(entry.delta)
        .bind(&entry.reason)
        .bind(entry.winner_card_id)
        .execute(&mut *tx)
        .await?;
        Self::write_record(&mut tx, record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_entry_with_record(
        &self,
        entry_id: Uuid,
        record: &JackpotRecord,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM jackpot_ledger_entries WHERE id = $1")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;
        Self::write_record(&mut tx, record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_future_config(&self, config: &FutureWinnerConfig) -> StoreResult<()> {
        let pattern = serde_json::to_string(&config.pattern)?;
        let required = serde_json::to_string(&config.required_numbers)?;
        let sequence = serde_json::to_string(&config.forced_call_sequence)?;
        sqlx::query(
            "INSERT INTO future_winner_configs
             (tenant_id, session_number, card_id, pattern, required_numbers, forced_call_sequence,
              jackpot_amount, jackpot_message, used, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(config.tenant_id)
        .bind(config.session_number)
        .bind(config.card_id)
        .bind(pattern)
        .bind(required)
        .bind(sequence)
        .bind(config.jackpot_amount)
        .bind(&config.jackpot_message)
        .bind(config.used)
        .bind(config.created_at)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn take_future_config(
        &self,
        tenant_id: TenantId,
        session_number: i64,
    ) -> StoreResult<Option<FutureWinnerConfig>> {
        let row = sqlx::query(
            "UPDATE future_winner_configs SET used = TRUE
             WHERE tenant_id = $1 AND session_number = $2 AND used = FALSE
             RETURNING tenant_id, session_number, card_id, pattern, required_numbers,
                       forced_call_sequence, jackpot_amount, jackpot_message, used, created_at",
        )
        .bind(tenant_id)
        .bind(session_number)
        .fetch_optional(self.pool.as_ref())
        .await?;
        row.map(|row| {
            let pattern: String = row.get("pattern");
            let required: String = row.get("required_numbers");
            let sequence: String = row.get("forced_call_sequence");
            Ok(FutureWinnerConfig {
                tenant_id: row.get("tenant_id"),
                session_number: row.get("session_number"),
                card_id: row.get("card_id"),
                pattern: serde_json::from_str(&pattern)?,
                required_numbers: serde_json::from_str(&required)?,
                forced_call_sequence: serde_json::from_str(&sequence)?,
                jackpot_amount: row.get::<Option<Decimal>, _>("jackpot_amount"),
                jackpot_message: row.get("jackpot_message"),
                used: row.get("used"),
                created_at: row.get("created_at"),
            })
        })
        .transpose()
    }
}

#[async_trait]
impl AuditRepository for PgStore {
    async fn append_audit(&self, record: &CallAuditRecord) -> StoreResult<()> {
        let forced = serde_json::to_string(&record.forced_remaining)?;
        let called = serde_json::to_string(&record.called_numbers)?;
        sqlx::query(
            "INSERT INTO call_audits
             (id, session_id, tenant_id, operator, number, source, outcome, forced_remaining, called_numbers, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(record.id)
        .bind(record.session_id)
        .bind(record.tenant_id)
        .bind(&record.operator)
        .bind(record.number.map(i16::from))
        .bind(record.source.map(|s| s.to_string()))
        .bind(&record.outcome)
        .bind(forced)
        .bind(called)
        .bind(record.created_at)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn list_audits_for_session(
        &self,
        session_id: SessionId,
    ) -> StoreResult<Vec<CallAuditRecord>> {
        let rows = sqlx::query(
            "SELECT id, session_id, tenant_id, operator, number, source, outcome, forced_remaining, called_numbers, created_at
             FROM call_audits WHERE session_id = $1 ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(self.pool.as_ref())
        .await?;
        rows.into_iter()
            .map(|row| {
                let forced: String = row.get("forced_remaining");
                let called: String = row.get("called_numbers");
                let source: Option<String> = row.get("source");
                Ok(CallAuditRecord {
                    id: row.get("id"),
                    session_id: row.get("session_id"),
                    tenant_id: row.get("tenant_id"),
                    operator: row.get("operator"),
                    number: row.get::<Option<i16>, _>("number").map(|n| n as u8),
                    source: source
                        .map(|s| serde_json::from_str(&format!("\"{s}\"")))
                        .transpose()?,
                    outcome: row.get("outcome"),
                    forced_remaining: serde_json::from_str(&forced)?,
                    called_numbers: serde_json::from_str(&called)?,
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    async fn purge_audits_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM call_audits WHERE created_at < $1")
            .bind(cutoff)
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected())
    }
}
