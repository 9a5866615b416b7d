//! Fixed parameters of the bingo domain.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Grid dimension, rows and columns.
pub const GRID_SIZE: usize = 5;

/// The FREE cell position, always the center of the grid.
pub const FREE_CELL: (usize, usize) = (2, 2);

/// Highest callable number; the domain is `1..=75`.
pub const BINGO_MAX_NUMBER: u8 = 75;

/// Share of the total pot contributed to the tenant jackpot when enabled.
pub const JACKPOT_CONTRIBUTION_PERCENT: Decimal = dec!(10);

/// Inclusive range the rigger draws the guaranteed win call index from.
/// The original deployment used two overlapping ranges (10-15 and 20-25);
/// a single range keeps rigged rounds short and is clamped up when a card
/// needs more numbers than the drawn index allows.
pub const DEFAULT_WIN_INDEX_RANGE: (usize, usize) = (10, 15);

/// Days a call audit or jackpot ledger entry is retained before purge.
pub const DEFAULT_AUDIT_RETENTION_DAYS: i64 = 90;
