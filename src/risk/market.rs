use std::collections::HashMap;

use crate::models::{Category, Protocol, Token};
use crate::risk::balance::Balances;
use crate::risk::series::DailySeries;

const ROLLING_WINDOW: usize = 365;
const VOL_WINDOW: usize = 3;

/// `(weight, rho, gamma)` scenario triples from §4.7.4.
const SCENARIOS: [(f64, f64, f64); 3] = [
    (0.7, 0.075, 0.15),
    (0.7, 0.09375, 0.1875),
    (0.7, 0.05625, 0.1125),
];

struct TokenSensitivities {
    category: Category,
    delta: DailySeries,
    vega: DailySeries,
}

fn per_token_sensitivities(token: &Token, tokens_by_id: &HashMap<String, Token>, balances: &Balances) -> Option<TokenSensitivities> {
    let underlying_id = token.underlying.as_ref()?;
    let underlying = tokens_by_id.get(underlying_id)?;
    let category = underlying.category()?;

    let v_t = balances.prices.get(&token.id)?;
    let s_u = balances.prices.get(underlying_id)?;
    let raw_balance = balances.raw.get(&token.id)?;
    let q_t = raw_balance.div(v_t);

    let v_t_diff = v_t.diff();
    let s_u_diff = s_u.diff();
    let delta = v_t_diff.div(&s_u_diff).rolling_median(ROLLING_WINDOW, 1).mul(&q_t);

    let log_s_u = s_u.map(f64::ln);
    let log_s_u_diff_sq = log_s_u.diff().map(|v| v.powi(2));
    let sigma_u = log_s_u_diff_sq.rolling_sum(VOL_WINDOW, 1, true).map(f64::sqrt);

    let sigma_u_diff = sigma_u.diff();
    let vega = v_t_diff
        .div(&sigma_u_diff)
        .rolling_median(ROLLING_WINDOW, 1)
        .mul(&sigma_u)
        .mul(&q_t);

    Some(TokenSensitivities { category, delta, vega })
}

fn bucket_aggregate(day: i64, members: &[&TokenSensitivities], weight: f64, rho: f64, pick: impl Fn(&TokenSensitivities) -> &DailySeries) -> (f64, f64) {
    let values: Vec<f64> = members
        .iter()
        .filter_map(|m| pick(m).get(day))
        .map(|v| weight * v)
        .collect();

    let sum_sq: f64 = values.iter().map(|d| d.powi(2)).sum();
    let sum_all: f64 = values.iter().sum();
    let cross: f64 = sum_all.powi(2) - sum_sq;
    let bucket_value = (sum_sq + rho * cross).max(0.0).sqrt();
    (bucket_value, sum_all)
}

/// Aggregated market-risk sensitivities (the `sqrt(delta_net) +
/// sqrt(vega_net)` scenario value, maxed over the three scenarios) plus
/// the default-risk / RRAO term, combined into `market_rwa` (spec
/// §4.7.4).
pub fn calculate_market_rwa(
    tokens: &[Token],
    tokens_by_id: &HashMap<String, Token>,
    protocols_by_id: &HashMap<String, Protocol>,
    balances: &Balances,
) -> DailySeries {
    let non_cash: Vec<&Token> = tokens
        .iter()
        .filter(|t| t.category() != Some(Category::Cash))
        .collect();

    let sensitivities: Vec<TokenSensitivities> = non_cash
        .iter()
        .filter_map(|t| per_token_sensitivities(t, tokens_by_id, balances))
        .collect();

    let mut by_bucket: HashMap<Category, Vec<&TokenSensitivities>> = HashMap::new();
    for s in &sensitivities {
        by_bucket.entry(s.category).or_default().push(s);
    }

    let mut best_scenario = DailySeries::new();
    for &(weight, rho, gamma) in &SCENARIOS {
        let mut scenario = DailySeries::new();
        for &day in &balances.days {
            let mut bucket_deltas = Vec::new();
            let mut bucket_vegas = Vec::new();
            for members in by_bucket.values() {
                let (delta_k, delta_s) = bucket_aggregate(day, members, weight, rho, |m| &m.delta);
                let (vega_k, vega_s) = bucket_aggregate(day, members, weight, rho, |m| &m.vega);
                bucket_deltas.push((delta_k, delta_s));
                bucket_vegas.push((vega_k, vega_s));
            }

            let delta_net = net_across_buckets(&bucket_deltas, gamma);
            let vega_net = net_across_buckets(&bucket_vegas, gamma);
            let value = delta_net.max(0.0).sqrt() + vega_net.max(0.0).sqrt();
            scenario.0.insert(day, value);
        }

        if best_scenario.is_empty() {
            best_scenario = scenario;
        } else {
            best_scenario = elementwise_max(&best_scenario, &scenario);
        }
    }

    let drc_rrao = calculate_drc_rrao(&non_cash, protocols_by_id, balances);

    best_scenario.add(&drc_rrao).scale(12.5)
}

fn net_across_buckets(buckets: &[(f64, f64)], gamma: f64) -> f64 {
    let sum_sq: f64 = buckets.iter().map(|&(k, _)| k.powi(2)).sum();
    let sum_s: f64 = buckets.iter().map(|&(_, s)| s).sum();
    let cross: f64 = buckets.iter().map(|&(_, s)| s.powi(2)).sum::<f64>();
    sum_sq + gamma * (sum_s.powi(2) - cross)
}

fn elementwise_max(a: &DailySeries, b: &DailySeries) -> DailySeries {
    let mut days: Vec<i64> = a.0.keys().chain(b.0.keys()).copied().collect();
    days.sort_unstable();
    days.dedup();

    let mut out = std::collections::BTreeMap::new();
    for day in days {
        let av = a.get(day);
        let bv = b.get(day);
        let value = match (av, bv) {
            (Some(x), Some(y)) => x.max(y),
            (Some(x), None) => x,
            (None, Some(y)) => y,
            (None, None) => continue,
        };
        out.insert(day, value);
    }
    DailySeries::from_map(out)
}

/// Default-risk component plus Risk-Reducing Add-On: `weight + 0.001`
/// applied to the USD exposure of each non-cash token, summed (spec
/// §4.7.4).
fn calculate_drc_rrao(non_cash: &[&Token], protocols_by_id: &HashMap<String, Protocol>, balances: &Balances) -> DailySeries {
    let mut out = DailySeries::new();
    for token in non_cash {
        let Some(exposure) = balances.usd.get(&token.id) else { continue };
        let Some(owner) = protocols_by_id.get(&token.protocol_id) else { continue };
        let weight = owner.market_drc_weight() + 0.001;
        out = out.add(&exposure.scale(weight));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensitivity(day: i64, value: f64) -> TokenSensitivities {
        TokenSensitivities {
            category: Category::Equity,
            delta: DailySeries::from_map([(day, value)].into_iter().collect()),
            vega: DailySeries::new(),
        }
    }

    #[test]
    fn bucket_aggregate_with_full_rho_equals_sum_of_members_squared() {
        let a = sensitivity(0, 3.0);
        let b = sensitivity(0, 4.0);
        let members = [&a, &b];
        let (value, sum_all) = bucket_aggregate(0, &members, 1.0, 1.0, |m| &m.delta);
        assert_eq!(sum_all, 7.0);
        assert_eq!(value, 7.0);
    }

    #[test]
    fn bucket_aggregate_with_zero_rho_is_plain_quadrature() {
        let a = sensitivity(0, 3.0);
        let b = sensitivity(0, 4.0);
        let members = [&a, &b];
        let (value, _) = bucket_aggregate(0, &members, 1.0, 0.0, |m| &m.delta);
        assert_eq!(value, 5.0);
    }

    #[test]
    fn net_across_buckets_with_zero_gamma_ignores_cross_terms() {
        let buckets = [(3.0, 3.0), (4.0, 4.0)];
        assert_eq!(net_across_buckets(&buckets, 0.0), 25.0);
    }

    #[test]
    fn net_across_buckets_with_full_gamma_matches_sum_of_sums_squared() {
        let buckets = [(3.0, 3.0), (4.0, 4.0)];
        assert_eq!(net_across_buckets(&buckets, 1.0), 49.0);
    }
}
