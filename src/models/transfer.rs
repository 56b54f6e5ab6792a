use bigdecimal::BigDecimal;
use sqlx::FromRow;

/// A single ERC-20 transfer involving a tracked treasury. `id` is the
/// content hash described in spec §9 and `collectors::hashing`; it makes
/// re-ingestion of the same on-chain event a no-op.
#[derive(Debug, Clone, FromRow)]
pub struct Transfer {
    pub id: String,
    pub timestamp: i64,
    pub block_number: i64,
    pub token_id: String,
    pub from_address: String,
    pub to_address: String,
    pub value: BigDecimal,
}

/// A transfer as returned by the block-explorer API, before the identity
/// fields (`block_hash`, `tx_hash`, `log_index`) used only for hashing are
/// stripped.
#[derive(Debug, Clone)]
pub struct RawTransfer {
    pub block_hash: String,
    pub tx_hash: String,
    pub log_index: String,
    pub timestamp: String,
    pub block_number: i64,
    pub token_id: String,
    pub from_address: String,
    pub to_address: String,
    pub value: String,
}
