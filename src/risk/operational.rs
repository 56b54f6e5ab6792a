use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{HackEvent, Token, Transfer};
use crate::risk::balance::Balances;
use crate::risk::series::{day_bucket, DailySeries};

const WINDOW: usize = 365;
const BI_THRESHOLD_1: f64 = 1_000_000_000.0;
const BI_THRESHOLD_2: f64 = 30_000_000_000.0;

enum TxCategory {
    FeeIncome,
    FeeExpense,
    OperatingIncome,
    OperatingExpense,
}

fn classify(from: &str, to: &str, treasuries: &HashSet<String>, protocol_addresses: &HashSet<String>) -> Option<TxCategory> {
    let from_treasury = treasuries.contains(from);
    let to_treasury = treasuries.contains(to);

    if from_treasury && to_treasury {
        return None;
    }
    if from_treasury {
        return Some(if protocol_addresses.contains(to) {
            TxCategory::FeeExpense
        } else {
            TxCategory::OperatingExpense
        });
    }
    if to_treasury {
        return Some(if protocol_addresses.contains(from) {
            TxCategory::FeeIncome
        } else {
            TxCategory::OperatingIncome
        });
    }
    None
}

/// Services Component: `max(rolling-365 fee_income, rolling-365
/// fee_expense) + max(rolling-365 operating_income, rolling-365
/// operating_expense)` (spec §4.7.5).
fn calculate_sc(
    tokens: &[Token],
    transfers_by_token: &HashMap<String, Vec<Transfer>>,
    treasuries: &HashSet<String>,
    protocol_addresses: &HashSet<String>,
    balances: &Balances,
) -> DailySeries {
    let mut fee_income = BTreeMap::new();
    let mut fee_expense = BTreeMap::new();
    let mut operating_income = BTreeMap::new();
    let mut operating_expense = BTreeMap::new();

    for token in tokens {
        let transfers = transfers_by_token.get(&token.id).map(Vec::as_slice).unwrap_or(&[]);
        if transfers.is_empty() {
            continue;
        }

        let mut by_category: HashMap<(i64, u8), f64> = HashMap::new();
        for tx in transfers {
            let Some(category) = classify(&tx.from_address, &tx.to_address, treasuries, protocol_addresses) else {
                continue;
            };
            let raw: f64 = tx.value.to_string().parse().unwrap_or(0.0);
            let value = raw / token.scale();
            let day = day_bucket(tx.timestamp);
            let slot = match category {
                TxCategory::FeeIncome => 0,
                TxCategory::FeeExpense => 1,
                TxCategory::OperatingIncome => 2,
                TxCategory::OperatingExpense => 3,
            };
            *by_category.entry((day, slot)).or_insert(0.0) += value;
        }

        let price_at = |day: i64| -> f64 {
            if token.is_cash() {
                1.0
            } else {
                balances.prices.get(&token.id).and_then(|s| s.get(day)).unwrap_or(0.0)
            }
        };

        for (&(day, slot), &value) in &by_category {
            let usd_value = value * price_at(day);
            let target = match slot {
                0 => &mut fee_income,
                1 => &mut fee_expense,
                2 => &mut operating_income,
                _ => &mut operating_expense,
            };
            *target.entry(day).or_insert(0.0) += usd_value;
        }
    }

    let fee_income = DailySeries::from_map(fee_income).rolling_sum(WINDOW, 1, false);
    let fee_expense = DailySeries::from_map(fee_expense).rolling_sum(WINDOW, 1, false);
    let operating_income = DailySeries::from_map(operating_income).rolling_sum(WINDOW, 1, false);
    let operating_expense = DailySeries::from_map(operating_expense).rolling_sum(WINDOW, 1, false);

    let sc_fee = elementwise_max(&fee_income, &fee_expense);
    let sc_operating = elementwise_max(&operating_income, &operating_expense);
    sc_fee.add(&sc_operating)
}

fn elementwise_max(a: &DailySeries, b: &DailySeries) -> DailySeries {
    let mut days: Vec<i64> = a.0.keys().chain(b.0.keys()).copied().collect();
    days.sort_unstable();
    days.dedup();

    let mut out = BTreeMap::new();
    for day in days {
        let value = match (a.get(day), b.get(day)) {
            (Some(x), Some(y)) => x.max(y),
            (Some(x), None) => x,
            (None, Some(y)) => y,
            (None, None) => continue,
        };
        out.insert(day, value);
    }
    DailySeries::from_map(out)
}

/// Financial Component: `|rolling-365 sum of balance[t].shift(1) *
/// price[t].diff()|` over non-cash tokens (spec §4.7.5).
fn calculate_fc(tokens: &[Token], balances: &Balances) -> DailySeries {
    let mut pnl = DailySeries::new();
    for token in tokens {
        if token.is_cash() {
            continue;
        }
        let Some(balance) = balances.raw.get(&token.id) else { continue };
        let Some(prices) = balances.prices.get(&token.id) else { continue };
        let contribution = balance.shift(1).mul(&prices.diff());
        pnl = pnl.add(&contribution);
    }
    pnl.rolling_sum(WINDOW, 1, false).abs()
}

fn split_buckets(bi: f64) -> (f64, f64, f64) {
    let b1 = bi.min(BI_THRESHOLD_1);
    let b2 = (bi.clamp(BI_THRESHOLD_1, BI_THRESHOLD_2)) - BI_THRESHOLD_1;
    let b3 = (bi - BI_THRESHOLD_2).max(0.0);
    (b1, b2, b3)
}

fn internal_loss_multiplier(hacks: &[HackEvent], days: &[i64]) -> DailySeries {
    let mut by_day: BTreeMap<i64, f64> = days.iter().map(|&d| (d, 0.0)).collect();
    for hack in hacks {
        let ts = hack
            .date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        if let Some(entry) = by_day.get_mut(&day_bucket(ts)) {
            *entry += hack.amount;
        }
    }

    DailySeries::from_map(by_day).rolling_sum(WINDOW, WINDOW, false)
}

/// Operational-risk RWA: `12.5 * BIC * ILM` (spec §4.7.5).
pub fn calculate_operational_rwa(
    tokens: &[Token],
    transfers_by_token: &HashMap<String, Vec<Transfer>>,
    treasuries: &HashSet<String>,
    protocol_addresses: &HashSet<String>,
    hacks: &[HackEvent],
    balances: &Balances,
) -> DailySeries {
    let sc = calculate_sc(tokens, transfers_by_token, treasuries, protocol_addresses, balances);
    let fc = calculate_fc(tokens, balances);
    let bi = sc.add(&fc);

    let mut bic = DailySeries::new();
    for (&day, &value) in &bi.0 {
        let (b1, b2, b3) = split_buckets(value);
        bic.0.insert(day, 0.12 * b1 + 0.15 * b2 + 0.18 * b3);
    }

    if hacks.is_empty() {
        return bic.scale(12.5);
    }

    let days: Vec<i64> = bic.0.keys().copied().collect();
    let yearly_loss = internal_loss_multiplier(hacks, &days);

    let mut orc = DailySeries::new();
    for (&day, &bic_value) in &bic.0 {
        let Some(yearly) = yearly_loss.get(day) else { continue };
        let lc = 15.0 * yearly;
        let ilm = (std::f64::consts::E - 1.0 + (lc / bic_value).powf(0.8)).ln();
        if ilm.is_finite() {
            orc.0.insert(day, bic_value * ilm);
        }
    }

    orc.scale(12.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_skips_treasury_to_treasury_transfers() {
        let treasuries: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        let protocol_addresses = HashSet::new();
        assert!(classify("a", "b", &treasuries, &protocol_addresses).is_none());
    }

    #[test]
    fn classify_outflow_to_protocol_address_is_fee_expense() {
        let treasuries: HashSet<String> = ["a".to_string()].into_iter().collect();
        let protocol_addresses: HashSet<String> = ["fee-collector".to_string()].into_iter().collect();
        assert!(matches!(
            classify("a", "fee-collector", &treasuries, &protocol_addresses),
            Some(TxCategory::FeeExpense)
        ));
    }

    #[test]
    fn classify_outflow_to_unrelated_address_is_operating_expense() {
        let treasuries: HashSet<String> = ["a".to_string()].into_iter().collect();
        let protocol_addresses = HashSet::new();
        assert!(matches!(
            classify("a", "someone-else", &treasuries, &protocol_addresses),
            Some(TxCategory::OperatingExpense)
        ));
    }

    #[test]
    fn split_buckets_partitions_by_threshold() {
        let (b1, b2, b3) = split_buckets(35_000_000_000.0);
        assert_eq!(b1, BI_THRESHOLD_1);
        assert_eq!(b2, BI_THRESHOLD_2 - BI_THRESHOLD_1);
        assert_eq!(b3, 5_000_000_000.0);
    }

    #[test]
    fn split_buckets_below_first_threshold_has_no_upper_buckets() {
        let (b1, b2, b3) = split_buckets(500_000_000.0);
        assert_eq!(b1, 500_000_000.0);
        assert_eq!(b2, 0.0);
        assert_eq!(b3, 0.0);
    }
}
