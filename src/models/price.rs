use bigdecimal::BigDecimal;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Price {
    pub token_id: String,
    pub timestamp: i64,
    pub value: BigDecimal,
}

/// A single price point as returned by the price-oracle API, before
/// re-mapping its (possibly snapped) timestamp onto the daily grid.
#[derive(Debug, Clone)]
pub struct RawPricePoint {
    pub timestamp: i64,
    pub price: f64,
}
