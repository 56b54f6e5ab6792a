use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use crate::models::{Price, Token, Transfer};
use crate::planner::grid::INTERVAL;
use crate::risk::series::{day_bucket, DailySeries};

/// Every day from `start` to `end_exclusive`, grid-aligned.
pub fn daily_range(start: i64, end_exclusive: i64) -> Vec<i64> {
    let mut days = Vec::new();
    let mut day = start;
    while day < end_exclusive {
        days.push(day);
        day += INTERVAL;
    }
    days
}

/// Per-token daily balance (§4.7.1): net signed flow grouped by day,
/// cumulative sum, clamp-forward for spuriously negative balances caused
/// by missing pre-history.
pub fn token_balance(transfers: &[Transfer], treasuries: &HashSet<String>, scale: f64) -> DailySeries {
    let mut daily_flow: BTreeMap<i64, f64> = BTreeMap::new();

    for tx in transfers {
        let from_is_treasury = treasuries.contains(&tx.from_address);
        let to_is_treasury = treasuries.contains(&tx.to_address);
        if from_is_treasury && to_is_treasury {
            continue;
        }

        let raw: f64 = tx.value.to_string().parse().unwrap_or(0.0);
        let signed = if from_is_treasury { -raw / scale } else { raw / scale };

        *daily_flow.entry(day_bucket(tx.timestamp)).or_insert(0.0) += signed;
    }

    let series = DailySeries::from_map(daily_flow);
    let cumulative = series.cumsum();

    if cumulative.0.values().any(|&v| v < 0.0) {
        warn!("negative balance detected before clamp-forward correction");
    }

    cumulative.clamp_forward()
}

/// Daily USD price series for a token: group prices by day, take the
/// last observation in each day (already the case since one row per
/// exact grid timestamp), forward-fill gaps.
pub fn usd_price_series(prices: &[Price], days: &[i64]) -> DailySeries {
    let mut by_day: BTreeMap<i64, f64> = BTreeMap::new();
    for p in prices {
        let value: f64 = p.value.to_string().parse().unwrap_or(0.0);
        by_day.insert(day_bucket(p.timestamp), value);
    }
    DailySeries::from_map(by_day).reindex_forward_fill(days)
}

/// Raw (token-unit) and USD-valued balance matrices for every token
/// touching a protocol's treasuries, reindexed onto a shared daily grid
/// running from the earliest observed day through yesterday (§4.7.1).
pub struct Balances {
    pub days: Vec<i64>,
    pub raw: HashMap<String, DailySeries>,
    pub usd: HashMap<String, DailySeries>,
    /// Daily USD price series per non-cash token, reindexed onto `days`
    /// (the `V_t` used by the market-RWA sensitivities in §4.7.4).
    pub prices: HashMap<String, DailySeries>,
}

pub fn build_balances(
    tokens: &[Token],
    transfers_by_token: &HashMap<String, Vec<Transfer>>,
    prices_by_token: &HashMap<String, Vec<Price>>,
    treasuries: &HashSet<String>,
    yesterday_exclusive_end: i64,
) -> Balances {
    let mut raw_unreindexed = HashMap::new();
    for token in tokens {
        let transfers = transfers_by_token.get(&token.id).map(Vec::as_slice).unwrap_or(&[]);
        let balance = token_balance(transfers, treasuries, token.scale());
        if !balance.is_empty() {
            raw_unreindexed.insert(token.id.clone(), balance);
        }
    }

    let earliest = raw_unreindexed
        .values()
        .filter_map(|s| s.first_day())
        .min();

    let Some(earliest) = earliest else {
        return Balances {
            days: Vec::new(),
            raw: HashMap::new(),
            usd: HashMap::new(),
            prices: HashMap::new(),
        };
    };

    let days = daily_range(earliest, yesterday_exclusive_end);

    let mut raw = HashMap::new();
    for (token_id, series) in &raw_unreindexed {
        raw.insert(token_id.clone(), series.reindex_fill_zero(&days));
    }

    let mut usd = HashMap::new();
    let mut prices = HashMap::new();
    for token in tokens {
        let Some(balance) = raw.get(&token.id) else { continue };
        if token.is_cash() {
            usd.insert(token.id.clone(), balance.clone());
            continue;
        }
        let raw_prices = prices_by_token.get(&token.id).map(Vec::as_slice).unwrap_or(&[]);
        let mut price_series = usd_price_series(raw_prices, &days);
        if price_series.is_empty() {
            warn!(token = %token.id, "no price history available, USD balance defaulting to 0");
        }
        price_series = price_series.reindex_fill_zero(&days);
        usd.insert(token.id.clone(), balance.mul(&price_series));
        prices.insert(token.id.clone(), price_series);
    }

    Balances { days, raw, usd, prices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn transfer(ts: i64, from: &str, to: &str, value: &str) -> Transfer {
        Transfer {
            id: format!("{ts}-{from}-{to}"),
            timestamp: ts,
            block_number: 1,
            token_id: "tok".to_string(),
            from_address: from.to_string(),
            to_address: to.to_string(),
            value: BigDecimal::from_str(value).unwrap(),
        }
    }

    #[test]
    fn internal_transfers_between_treasuries_are_skipped() {
        let treasuries: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        let transfers = vec![transfer(INTERVAL, "a", "b", "100")];
        let balance = token_balance(&transfers, &treasuries, 1.0);
        assert!(balance.is_empty());
    }

    #[test]
    fn inflow_and_outflow_net_correctly() {
        let treasuries: HashSet<String> = ["a".to_string()].into_iter().collect();
        let transfers = vec![
            transfer(INTERVAL, "outsider", "a", "100"),
            transfer(INTERVAL, "a", "outsider", "40"),
        ];
        let balance = token_balance(&transfers, &treasuries, 1.0);
        assert_eq!(balance.get(day_bucket(INTERVAL)), Some(60.0));
    }
}
