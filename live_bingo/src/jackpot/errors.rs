//! Jackpot error types.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::game::entities::TenantId;
use crate::store::StoreError;

/// Jackpot ledger errors.
#[derive(Debug, Error)]
pub enum JackpotError {
    /// Draw would exceed the ceiling or the live balance; ledger untouched.
    #[error("draw {draw} exceeds jackpot {kind} {limit}")]
    ConstraintViolation {
        draw: Decimal,
        limit: Decimal,
        kind: &'static str,
    },

    #[error("jackpot is disabled for tenant {0}")]
    Disabled(TenantId),

    #[error("no jackpot record for tenant {0}")]
    RecordNotFound(TenantId),

    #[error("ledger entry {0} not found")]
    EntryNotFound(Uuid),

    /// Cashier-triggered entries may never be corrected or deleted.
    #[error("ledger entry {0} was triggered by a cashier and is immutable")]
    CashierEntryImmutable(Uuid),

    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Result alias for jackpot operations.
pub type JackpotResult<T> = Result<T, JackpotError>;
