use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Token {
    pub id: String,
    pub protocol_id: String,
    pub symbol: String,
    pub itin: String,
    pub decimals: i32,
    pub itc_eep: Option<String>,
    pub underlying: Option<String>,
}

impl Token {
    pub fn category(&self) -> Option<super::category::Category> {
        self.itc_eep
            .as_deref()
            .and_then(super::category::Category::from_itc_eep)
    }

    pub fn is_cash(&self) -> bool {
        self.category() == Some(super::category::Category::Cash)
    }

    /// `10^decimals`, used to convert raw integer transfer values into
    /// token-denominated floats (spec §4.7.1).
    pub fn scale(&self) -> f64 {
        10f64.powi(self.decimals)
    }
}
