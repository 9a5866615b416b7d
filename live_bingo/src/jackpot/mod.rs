//! Progressive jackpot: record, append-only ledger, and future winner
//! configurations.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{JackpotError, JackpotResult};
pub use manager::JackpotManager;
pub use models::{
    AwardInfo, AwardTarget, FutureWinnerConfig, JackpotLedgerEntry, JackpotRecord,
};
