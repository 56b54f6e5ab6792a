use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single historical hack event against a protocol, used by the
/// operational-risk Internal Loss Multiplier (spec §4.7.5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HackEvent {
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Protocol {
    pub id: String,
    pub rating: String,
    pub addresses: Vec<String>,
    pub hacks: sqlx::types::Json<Vec<HackEvent>>,
}

impl Protocol {
    /// Basel-style risk weight for counterparty credit exposure (spec
    /// §4.7.3). Unrated / unrecognised ratings fall back to the punitive
    /// default, per §7's "missing rating maps to the default risk weight".
    pub fn ccr_weight(&self) -> f64 {
        match self.rating.as_str() {
            "AAA" | "AA" => 0.2,
            "A" => 0.5,
            "BBB" => 0.75,
            "BB" => 1.0,
            _ => 1.5,
        }
    }

    /// Default-risk weight used in the market-RWA DRC/RRAO term (§4.7.4).
    pub fn market_drc_weight(&self) -> f64 {
        match self.rating.as_str() {
            "AAA" => 0.005,
            "AA" => 0.02,
            "A" => 0.03,
            "BBB" => 0.06,
            "BB" => 0.15,
            "B" => 0.30,
            _ => 0.50,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Treasury {
    pub id: String,
    pub protocol_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol(rating: &str) -> Protocol {
        Protocol {
            id: "p".into(),
            rating: rating.into(),
            addresses: vec![],
            hacks: sqlx::types::Json(vec![]),
        }
    }

    #[test]
    fn ccr_weight_by_rating() {
        assert_eq!(protocol("AAA").ccr_weight(), 0.2);
        assert_eq!(protocol("AA").ccr_weight(), 0.2);
        assert_eq!(protocol("A").ccr_weight(), 0.5);
        assert_eq!(protocol("BBB").ccr_weight(), 0.75);
        assert_eq!(protocol("BB").ccr_weight(), 1.0);
        assert_eq!(protocol("B").ccr_weight(), 1.5);
        assert_eq!(protocol("unrated").ccr_weight(), 1.5);
    }

    #[test]
    fn market_drc_weight_by_rating() {
        assert_eq!(protocol("AAA").market_drc_weight(), 0.005);
        assert_eq!(protocol("B").market_drc_weight(), 0.30);
        assert_eq!(protocol("?").market_drc_weight(), 0.50);
    }
}
