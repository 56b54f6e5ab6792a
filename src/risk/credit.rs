use std::collections::HashMap;

use crate::models::{Category, Protocol, Token};
use crate::risk::balance::Balances;
use crate::risk::series::DailySeries;

struct EntityParams {
    sf: f64,
    rho: f64,
}

fn entity_params(tokens_by_id: &HashMap<String, Token>, entity: Option<&str>) -> EntityParams {
    let is_index = entity
        .and_then(|e| tokens_by_id.get(e))
        .and_then(Token::category)
        == Some(Category::Index);

    if is_index {
        EntityParams { sf: 0.2, rho: 0.8 }
    } else {
        EntityParams { sf: 0.32, rho: 0.5 }
    }
}

/// Counterparty-credit-risk RWA (spec §4.7.3). Non-cash tokens are
/// partitioned by their owning protocol (the counterparty); within each
/// counterparty, tokens are further grouped by `underlying` into
/// "entities" for the addon calculation.
pub fn calculate_credit_rwa(
    tokens: &[Token],
    tokens_by_id: &HashMap<String, Token>,
    protocols_by_id: &HashMap<String, Protocol>,
    balances: &Balances,
) -> DailySeries {
    let non_cash: Vec<&Token> = tokens
        .iter()
        .filter(|t| t.category() != Some(Category::Cash))
        .filter(|t| balances.usd.contains_key(&t.id))
        .collect();

    let mut by_counterparty: HashMap<String, Vec<&Token>> = HashMap::new();
    for token in non_cash {
        by_counterparty.entry(token.protocol_id.clone()).or_default().push(token);
    }

    let mut ccr_rwa = DailySeries::new();

    for (counterparty_id, group) in &by_counterparty {
        let Some(counterparty) = protocols_by_id.get(counterparty_id) else {
            continue;
        };
        let weight = counterparty.ccr_weight();

        let mut by_entity: HashMap<Option<String>, Vec<&Token>> = HashMap::new();
        for token in group {
            by_entity.entry(token.underlying.clone()).or_default().push(token);
        }

        for &day in &balances.days {
            let v: f64 = group
                .iter()
                .filter_map(|t| balances.usd.get(&t.id).and_then(|s| s.get(day)))
                .sum();

            let mut addon_sum = 0.0;
            let mut addon_sq = 0.0;
            for (entity, members) in &by_entity {
                let params = entity_params(tokens_by_id, entity.as_deref());
                if entity.is_none() || members.len() == 1 {
                    for token in members {
                        let Some(exposure) = balances.usd.get(&token.id).and_then(|s| s.get(day)) else {
                            continue;
                        };
                        let addon_x = params.sf * exposure;
                        addon_sum += params.rho * addon_x;
                        addon_sq += (1.0 - params.rho.powi(2)) * addon_x.powi(2);
                    }
                } else {
                    let group_sum: f64 = members
                        .iter()
                        .filter_map(|t| balances.usd.get(&t.id).and_then(|s| s.get(day)))
                        .sum();
                    let a = params.sf * group_sum;
                    addon_sum += params.rho * a;
                    addon_sq += (1.0 - params.rho.powi(2)) * a.powi(2);
                }
            }

            let addon = (addon_sum.powi(2) + addon_sq).sqrt();
            let mut multiplier = if addon == 0.0 {
                0.0
            } else {
                (0.05 + 0.95 * (v / (2.0 * 0.95 * addon)).exp()).min(1.0)
            };
            if multiplier.is_nan() {
                multiplier = 0.0;
            }

            let pfe = multiplier * addon;
            let ead = 1.4 * (v + pfe);
            let contribution = weight * ead;

            ccr_rwa.0.entry(day).and_modify(|e| *e += contribution).or_insert(contribution);
        }
    }

    ccr_rwa
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_entity_uses_higher_scaling_factors() {
        let mut tokens_by_id = HashMap::new();
        tokens_by_id.insert(
            "idx".to_string(),
            Token {
                id: "idx".to_string(),
                protocol_id: "p".to_string(),
                symbol: "IDX".to_string(),
                itin: "ITIN".to_string(),
                decimals: 18,
                itc_eep: Some("EEP23FD".to_string()),
                underlying: None,
            },
        );
        let params = entity_params(&tokens_by_id, Some("idx"));
        assert_eq!(params.sf, 0.2);
        assert_eq!(params.rho, 0.8);
    }

    #[test]
    fn unknown_entity_uses_default_scaling_factors() {
        let tokens_by_id = HashMap::new();
        let params = entity_params(&tokens_by_id, None);
        assert_eq!(params.sf, 0.32);
        assert_eq!(params.rho, 0.5);
    }
}
