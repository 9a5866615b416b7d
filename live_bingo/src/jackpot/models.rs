//! Jackpot data models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::entities::{CardId, TenantId};

/// Per-tenant jackpot balance snapshot. Created lazily on the first
/// contribution or administrative update and kept forever.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct JackpotRecord {
    pub tenant_id: TenantId,
    /// Current balance; never negative.
    pub amount: Decimal,
    /// Ceiling set by the last administrative reset; awards may not exceed it.
    pub base_amount: Decimal,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
    pub last_award: Option<AwardInfo>,
}

impl JackpotRecord {
    #[must_use]
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            amount: Decimal::ZERO,
            base_amount: Decimal::ZERO,
            enabled: true,
            updated_at: Utc::now(),
            last_award: None,
        }
    }
}

/// Metadata of the most recent award.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AwardInfo {
    pub card_id: CardId,
    pub message: String,
    pub amount: Decimal,
    pub awarded_at: DateTime<Utc>,
}

/// Append-only ledger row. Immutable once written, except through explicit
/// moderator correction, which also reverses the prior delta on the record.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct JackpotLedgerEntry {
    pub id: Uuid,
    pub tenant_id: TenantId,
    /// Signed balance change this entry applied.
    pub delta: Decimal,
    pub reason: String,
    pub session_number: Option<i64>,
    pub is_award: bool,
    pub winner_card_id: Option<CardId>,
    /// Entries written automatically by cashier workflows (contributions on
    /// session creation) may never be corrected or deleted.
    pub triggered_by_cashier: bool,
    pub created_at: DateTime<Utc>,
}

/// A rig pre-registered for a session number that does not exist yet,
/// consumed exactly once when the matching session is created.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FutureWinnerConfig {
    pub tenant_id: TenantId,
    pub session_number: i64,
    pub card_id: CardId,
    /// Pattern the rig was built for; applied as the session's forced
    /// pattern when the session is declared `all`.
    pub pattern: Option<crate::game::entities::Pattern>,
    pub required_numbers: Vec<u8>,
    pub forced_call_sequence: Vec<u8>,
    pub jackpot_amount: Option<Decimal>,
    pub jackpot_message: Option<String>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// Where an award lands: debit the live balance of an existing session, or
/// pre-register a rig for a session that is not created yet.
#[derive(Clone, Debug)]
pub enum AwardTarget {
    Existing { session_number: i64 },
    Future(FutureWinnerConfig),
}
