use std::collections::{HashMap, HashSet};

use bigdecimal::BigDecimal;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use sqlx::PgPool;
use tracing::{error, info};

use crate::db::{assets_queries, price_queries, protocol_queries, token_queries, transfer_queries, treasury_queries};
use crate::errors::AppError;
use crate::models::{Assets, Protocol, Token};
use crate::risk::balance::build_balances;
use crate::risk::series::day_bucket;
use crate::risk::{cet1, credit, market, operational};

const MAX_CONCURRENT_PROTOCOLS: usize = 8;

/// Run the full Basel-III pipeline (daily balance → CET1 → CCR/Market/
/// Operational RWA → CAR) for every protocol with at least one treasury,
/// up to `MAX_CONCURRENT_PROTOCOLS` in parallel (spec §4.7).
pub async fn calculate_car(pool: &PgPool) -> Result<(), AppError> {
    info!("starting daily risk calculation");

    let protocols = protocol_queries::fetch_with_treasuries(pool).await?;
    let all_protocols = protocol_queries::fetch_all(pool).await?;
    let all_tokens = token_queries::fetch_all(pool).await?;

    let protocols_by_id: HashMap<String, Protocol> =
        all_protocols.into_iter().map(|p| (p.id.clone(), p)).collect();
    let tokens_by_id: HashMap<String, Token> =
        all_tokens.iter().cloned().map(|t| (t.id.clone(), t)).collect();

    stream::iter(protocols)
        .for_each_concurrent(MAX_CONCURRENT_PROTOCOLS, |protocol| {
            let all_tokens = all_tokens.clone();
            let tokens_by_id = &tokens_by_id;
            let protocols_by_id = &protocols_by_id;
            async move {
                if let Err(e) = calculate_protocol(pool, &protocol, &all_tokens, tokens_by_id, protocols_by_id).await {
                    error!(protocol = %protocol.id, error = %e, "risk calculation failed for protocol");
                }
            }
        })
        .await;

    info!("daily risk calculation complete");
    Ok(())
}

async fn calculate_protocol(
    pool: &PgPool,
    protocol: &Protocol,
    all_tokens: &[Token],
    tokens_by_id: &HashMap<String, Token>,
    protocols_by_id: &HashMap<String, Protocol>,
) -> Result<(), AppError> {
    let treasuries: HashSet<String> = treasury_queries::fetch_for_protocol(pool, &protocol.id)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    if treasuries.is_empty() {
        return Ok(());
    }
    let treasury_list: Vec<String> = treasuries.iter().cloned().collect();

    let mut transfers_by_token = HashMap::new();
    let mut prices_by_token = HashMap::new();
    for token in all_tokens {
        let transfers =
            transfer_queries::fetch_for_token_and_treasuries(pool, &token.id, &treasury_list).await?;
        if !transfers.is_empty() {
            transfers_by_token.insert(token.id.clone(), transfers);
        }
        let prices = price_queries::fetch_for_token(pool, &token.id).await?;
        if !prices.is_empty() {
            prices_by_token.insert(token.id.clone(), prices);
        }
    }

    if transfers_by_token.is_empty() {
        return Ok(());
    }

    let yesterday_exclusive_end = day_bucket(Utc::now().timestamp());
    let balances = build_balances(
        all_tokens,
        &transfers_by_token,
        &prices_by_token,
        &treasuries,
        yesterday_exclusive_end,
    );
    if balances.days.is_empty() {
        return Ok(());
    }

    let cet1_series = cet1::calculate_cet1(all_tokens, &protocol.id, &balances);
    let credit_rwa = credit::calculate_credit_rwa(all_tokens, tokens_by_id, protocols_by_id, &balances);
    let market_rwa = market::calculate_market_rwa(all_tokens, tokens_by_id, protocols_by_id, &balances);
    let protocol_addresses: HashSet<String> = protocol.addresses.iter().cloned().collect();
    let operational_rwa = operational::calculate_operational_rwa(
        all_tokens,
        &transfers_by_token,
        &treasuries,
        &protocol_addresses,
        &protocol.hacks.0,
        &balances,
    );

    let mut rows = Vec::new();
    for &day in &balances.days {
        let credit_value = credit_rwa.get(day);
        let market_value = market_rwa.get(day);
        let operational_value = operational_rwa.get(day);
        if let Some(row) = build_row(&protocol.id, day, cet1_series.get(day), credit_value, market_value, operational_value) {
            rows.push(row);
        }
    }

    if !rows.is_empty() {
        assets_queries::upsert_many(pool, &rows).await?;
    }

    Ok(())
}

/// Combine one day's CET1 and (possibly partial) RWA components into a
/// persistable row, per spec §4.7.6. Missing RWA components default to
/// zero unless all three are missing; the day is dropped entirely if
/// `cet1` is missing, the resulting `rwa` is zero or non-finite, or
/// `car` ends up non-finite (see DESIGN.md's row-inclusion resolution).
fn build_row(
    protocol_id: &str,
    day: i64,
    cet1_value: Option<f64>,
    credit_value: Option<f64>,
    market_value: Option<f64>,
    operational_value: Option<f64>,
) -> Option<Assets> {
    let cet1_value = cet1_value?;
    if credit_value.is_none() && market_value.is_none() && operational_value.is_none() {
        return None;
    }

    let credit_value = credit_value.unwrap_or(0.0);
    let market_value = market_value.unwrap_or(0.0);
    let operational_value = operational_value.unwrap_or(0.0);
    let rwa = credit_value + market_value + operational_value;

    if rwa == 0.0 || !rwa.is_finite() || !cet1_value.is_finite() {
        return None;
    }
    let car = cet1_value / rwa;
    if !car.is_finite() {
        return None;
    }

    let (Ok(cet1_bd), Ok(credit_bd), Ok(market_bd), Ok(operational_bd), Ok(rwa_bd)) = (
        BigDecimal::try_from(cet1_value),
        BigDecimal::try_from(credit_value),
        BigDecimal::try_from(market_value),
        BigDecimal::try_from(operational_value),
        BigDecimal::try_from(rwa),
    ) else {
        return None;
    };

    Some(Assets {
        protocol_id: protocol_id.to_string(),
        timestamp: day,
        cet1: cet1_bd,
        credit_rwa: credit_bd,
        market_rwa: market_bd,
        operational_rwa: operational_bd,
        rwa: rwa_bd,
        car,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rwa_is_the_sum_of_all_three_components() {
        let row = build_row("aave", 0, Some(100.0), Some(10.0), Some(20.0), Some(30.0)).unwrap();
        assert_eq!(row.rwa, BigDecimal::try_from(60.0).unwrap());
        assert_eq!(row.car, 100.0 / 60.0);
    }

    #[test]
    fn missing_operational_component_defaults_to_zero() {
        let row = build_row("aave", 0, Some(100.0), Some(10.0), Some(20.0), None).unwrap();
        assert_eq!(row.rwa, BigDecimal::try_from(30.0).unwrap());
    }

    #[test]
    fn all_rwa_components_missing_drops_the_day() {
        assert!(build_row("aave", 0, Some(100.0), None, None, None).is_none());
    }

    #[test]
    fn missing_cet1_drops_the_day() {
        assert!(build_row("aave", 0, None, Some(10.0), None, None).is_none());
    }

    #[test]
    fn zero_total_rwa_drops_the_day() {
        assert!(build_row("aave", 0, Some(100.0), Some(0.0), Some(0.0), Some(0.0)).is_none());
    }
}
