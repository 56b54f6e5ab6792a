use sqlx::FromRow;

/// Present iff transfers for `treasury_id` in `[from_timestamp, to_timestamp)`
/// are not yet known to be complete.
#[derive(Debug, Clone, FromRow, PartialEq, Eq, PartialOrd, Ord)]
pub struct TransferSnapshot {
    pub treasury_id: String,
    pub from_timestamp: i64,
    pub to_timestamp: i64,
}

/// Present iff the price of `token_id` at `timestamp` is missing.
#[derive(Debug, Clone, FromRow, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriceSnapshot {
    pub token_id: String,
    pub timestamp: i64,
}
