//! Jackpot ledger manager.
//!
//! Every balance change travels through here as an atomic
//! record-plus-ledger-entry write; no caller may read-then-write the
//! balance outside this boundary.

use chrono::Utc;
use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::errors::{JackpotError, JackpotResult};
use super::models::{
    AwardInfo, AwardTarget, FutureWinnerConfig, JackpotLedgerEntry, JackpotRecord,
};
use crate::game::entities::{CardId, TenantId};
use crate::store::JackpotRepository;

/// Jackpot ledger over a repository.
#[derive(Clone)]
pub struct JackpotManager {
    repo: Arc<dyn JackpotRepository>,
}

impl JackpotManager {
    #[must_use]
    pub fn new(repo: Arc<dyn JackpotRepository>) -> Self {
        Self { repo }
    }

    /// Current record for a tenant.
    pub async fn get(&self, tenant_id: TenantId) -> JackpotResult<JackpotRecord> {
        self.repo
            .get_record(tenant_id)
            .await?
            .ok_or(JackpotError::RecordNotFound(tenant_id))
    }

    async fn get_or_new(&self, tenant_id: TenantId) -> JackpotResult<JackpotRecord> {
        Ok(self
            .repo
            .get_record(tenant_id)
            .await?
            .unwrap_or_else(|| JackpotRecord::new(tenant_id)))
    }

    /// Administrative ceiling reset: sets both the balance and the base
    /// amount, logging the signed delta versus the previous balance.
    pub async fn set_amount(
        &self,
        tenant_id: TenantId,
        amount: Decimal,
    ) -> JackpotResult<JackpotRecord> {
        if amount < Decimal::ZERO {
            return Err(JackpotError::InvalidAmount(amount));
        }
        let mut record = self.get_or_new(tenant_id).await?;
        let delta = amount - record.amount;
        record.amount = amount;
        record.base_amount = amount;
        record.updated_at = Utc::now();

        let entry = self.entry(
            tenant_id,
            delta,
            "jackpot amount set by moderator".to_string(),
            None,
            false,
            None,
            false,
        );
        self.repo.save_record_with_entry(&record, Some(&entry)).await?;
        info!("jackpot for tenant {tenant_id} set to {amount}");
        Ok(record)
    }

    /// Additive contribution from a session's pot, flagged cashier-triggered
    /// so it can never be corrected or deleted.
    pub async fn contribute(
        &self,
        tenant_id: TenantId,
        amount: Decimal,
        session_number: i64,
    ) -> JackpotResult<JackpotRecord> {
        if amount <= Decimal::ZERO {
            return Err(JackpotError::InvalidAmount(amount));
        }
        let mut record = self.get_or_new(tenant_id).await?;
        record.amount += amount;
        record.updated_at = Utc::now();

        let entry = self.entry(
            tenant_id,
            amount,
            format!("contribution from session {session_number}"),
            Some(session_number),
            false,
            None,
            true,
        );
        self.repo.save_record_with_entry(&record, Some(&entry)).await?;
        Ok(record)
    }

    pub async fn toggle(
        &self,
        tenant_id: TenantId,
        enabled: bool,
    ) -> JackpotResult<JackpotRecord> {
        let mut record = self.get_or_new(tenant_id).await?;
        record.enabled = enabled;
        record.updated_at = Utc::now();
        self.repo.save_record_with_entry(&record, None).await?;
        Ok(record)
    }

    /// Award a draw. For an existing session the draw debits the live
    /// balance atomically with its ledger entry; for a future session the
    /// award is parked as a [`FutureWinnerConfig`] and the balance is left
    /// alone until that session actually plays out.
    pub async fn award(
        &self,
        tenant_id: TenantId,
        card_id: CardId,
        draw_amount: Decimal,
        message: String,
        target: AwardTarget,
    ) -> JackpotResult<JackpotRecord> {
        if draw_amount <= Decimal::ZERO {
            return Err(JackpotError::InvalidAmount(draw_amount));
        }
        let mut record = self.get(tenant_id).await?;
        if !record.enabled {
            return Err(JackpotError::Disabled(tenant_id));
        }
        if draw_amount > record.base_amount {
            return Err(JackpotError::ConstraintViolation {
                draw: draw_amount,
                limit: record.base_amount,
                kind: "ceiling",
            });
        }

        match target {
            AwardTarget::Existing { session_number } => {
                if draw_amount > record.amount {
                    return Err(JackpotError::ConstraintViolation {
                        draw: draw_amount,
                        limit: record.amount,
                        kind: "balance",
                    });
                }
                record.amount -= draw_amount;
                record.updated_at = Utc::now();
                record.last_award = Some(AwardInfo {
                    card_id,
                    message: message.clone(),
                    amount: draw_amount,
                    awarded_at: Utc::now(),
                });

                let entry = self.entry(
                    tenant_id,
                    -draw_amount,
                    message,
                    Some(session_number),
                    true,
                    Some(card_id),
                    false,
                );
                self.repo.save_record_with_entry(&record, Some(&entry)).await?;
                info!(
                    "jackpot award of {draw_amount} to card {card_id} in session {session_number}"
                );
            }
            AwardTarget::Future(config) => {
                self.repo.insert_future_config(&config).await?;
                info!(
                    "jackpot award of {draw_amount} parked for future session {}",
                    config.session_number
                );
            }
        }
        Ok(record)
    }

    /// Moderator correction: reverse the prior delta and apply the new one
    /// transactionally. Cashier-triggered entries are immutable.
    pub async fn correct_log_entry(
        &self,
        entry_id: Uuid,
        new_amount: Decimal,
        new_winner: Option<CardId>,
        new_message: String,
    ) -> JackpotResult<JackpotRecord> {
        if new_amount <= Decimal::ZERO {
            return Err(JackpotError::InvalidAmount(new_amount));
        }
        let mut entry = self
            .repo
            .get_entry(entry_id)
            .await?
            .ok_or(JackpotError::EntryNotFound(entry_id))?;
        if entry.triggered_by_cashier {
            return Err(JackpotError::CashierEntryImmutable(entry_id));
        }

        let mut record = self.get(entry.tenant_id).await?;
        let new_delta = if entry.is_award {
            -new_amount
        } else {
            new_amount
        };
        let corrected = record.amount - entry.delta + new_delta;
        if corrected < Decimal::ZERO {
            return Err(JackpotError::ConstraintViolation {
                draw: new_amount,
                limit: record.amount,
                kind: "balance",
            });
        }
        record.amount = corrected;
        record.updated_at = Utc::now();

        entry.delta = new_delta;
        entry.winner_card_id = new_winner;
        entry.reason = new_message;

        self.repo.update_entry_with_record(&entry, &record).await?;
        info!("jackpot log entry {entry_id} corrected");
        Ok(record)
    }

    /// Delete a ledger entry, reversing its delta on the record. Forbidden
    /// for cashier-triggered entries.
    pub async fn delete_log_entry(&self, entry_id: Uuid) -> JackpotResult<JackpotRecord> {
        let entry = self
            .repo
            .get_entry(entry_id)
            .await?
            .ok_or(JackpotError::EntryNotFound(entry_id))?;
        if entry.triggered_by_cashier {
            return Err(JackpotError::CashierEntryImmutable(entry_id));
        }

        let mut record = self.get(entry.tenant_id).await?;
        let reversed = record.amount - entry.delta;
        if reversed < Decimal::ZERO {
            return Err(JackpotError::ConstraintViolation {
                draw: entry.delta,
                limit: record.amount,
                kind: "balance",
            });
        }
        record.amount = reversed;
        record.updated_at = Utc::now();

        self.repo.delete_entry_with_record(entry_id, &record).await?;
        info!("jackpot log entry {entry_id} deleted");
        Ok(record)
    }

    pub async fn list_entries(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> JackpotResult<Vec<JackpotLedgerEntry>> {
        Ok(self.repo.list_entries(tenant_id, limit).await?)
    }

    /// Consume the future winner config for a newly allocated session
    /// number, if one was pre-registered.
    pub async fn take_future_config(
        &self,
        tenant_id: TenantId,
        session_number: i64,
    ) -> JackpotResult<Option<FutureWinnerConfig>> {
        Ok(self.repo.take_future_config(tenant_id, session_number).await?)
    }

    #[allow(clippy::too_many_arguments)]
    fn entry(
        &self,
        tenant_id: TenantId,
        delta: Decimal,
        reason: String,
        session_number: Option<i64>,
        is_award: bool,
        winner_card_id: Option<CardId>,
        triggered_by_cashier: bool,
    ) -> JackpotLedgerEntry {
        JackpotLedgerEntry {
            id: Uuid::new_v4(),
            tenant_id,
            delta,
            reason,
            session_number,
            is_award,
            winner_card_id,
            triggered_by_cashier,
            created_at: Utc::now(),
        }
    }
}
