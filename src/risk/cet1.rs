use crate::models::{Category, Token};
use crate::risk::balance::Balances;
use crate::risk::series::{sum_series, DailySeries};

/// CET1 = cash balance (already USD-denominated) + own-issued equity,
/// USD-valued (spec §4.7.2).
pub fn calculate_cet1(tokens: &[Token], protocol_id: &str, balances: &Balances) -> DailySeries {
    let cash_series: Vec<&DailySeries> = tokens
        .iter()
        .filter(|t| t.category() == Some(Category::Cash))
        .filter_map(|t| balances.raw.get(&t.id))
        .collect();
    let cash_balance = sum_series(cash_series.into_iter());

    let share_series: Vec<&DailySeries> = tokens
        .iter()
        .filter(|t| t.category() == Some(Category::Equity) && t.protocol_id == protocol_id)
        .filter_map(|t| balances.usd.get(&t.id))
        .collect();
    let share_balance = sum_series(share_series.into_iter());

    cash_balance.add(&share_balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    fn token(id: &str, protocol_id: &str, itc_eep: &str) -> Token {
        Token {
            id: id.to_string(),
            protocol_id: protocol_id.to_string(),
            symbol: id.to_uppercase(),
            itin: "ITIN".to_string(),
            decimals: 18,
            itc_eep: Some(itc_eep.to_string()),
            underlying: None,
        }
    }

    fn series(points: &[(i64, f64)]) -> DailySeries {
        DailySeries::from_map(points.iter().copied().collect::<BTreeMap<_, _>>())
    }

    #[test]
    fn cash_and_own_equity_are_summed_but_foreign_equity_is_excluded() {
        let cash = token("usdc", "aave", "EEP21PP01USD");
        let own_equity = token("aave-share", "aave", "EEP22G");
        let foreign_equity = token("comp-share", "compound", "EEP22G");
        let tokens = vec![cash.clone(), own_equity.clone(), foreign_equity.clone()];

        let mut raw = HashMap::new();
        raw.insert(cash.id.clone(), series(&[(0, 100.0)]));
        let mut usd = HashMap::new();
        usd.insert(own_equity.id.clone(), series(&[(0, 50.0)]));
        usd.insert(foreign_equity.id.clone(), series(&[(0, 9_999.0)]));

        let balances = Balances { days: vec![0], raw, usd, prices: HashMap::new() };

        let cet1 = calculate_cet1(&tokens, "aave", &balances);
        assert_eq!(cet1.get(0), Some(150.0));
    }
}
