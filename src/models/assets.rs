use bigdecimal::BigDecimal;
use sqlx::FromRow;

/// A fully-derived row of the Risk Engine's daily output for one protocol.
/// Re-running the engine on unchanged inputs reproduces the same values
/// modulo floating rounding in `car` (spec §3, §8).
#[derive(Debug, Clone, FromRow)]
pub struct Assets {
    pub protocol_id: String,
    pub timestamp: i64,
    pub cet1: BigDecimal,
    pub credit_rwa: BigDecimal,
    pub market_rwa: BigDecimal,
    pub operational_rwa: BigDecimal,
    pub rwa: BigDecimal,
    pub car: f64,
}
