use std::collections::HashMap;

use bigdecimal::BigDecimal;
use sqlx::PgPool;
use tracing::{error, info};

use crate::db::{price_queries, price_snapshot_queries};
use crate::errors::AppError;
use crate::external::PriceOracleClient;
use crate::models::{Price, PriceSnapshot};
use crate::planner::grid::INTERVAL;

const PAGE_SIZE: i64 = 50;
const MAX_PAGES: i64 = 8;
const CHAIN_PREFIX: &str = "ethereum";

/// Drain the price-snapshot backlog up to `MAX_PAGES` pages concurrently
/// (spec §4.6). A no-op if the backlog is empty.
pub async fn collect_prices(pool: &PgPool, oracle: &dyn PriceOracleClient) -> Result<(), AppError> {
    let rows = price_snapshot_queries::count(pool).await?;
    if rows == 0 {
        return Ok(());
    }

    let pages = ((rows + PAGE_SIZE - 1) / PAGE_SIZE).min(MAX_PAGES);
    let mut handles = Vec::with_capacity(pages as usize);
    for page in 0..pages {
        handles.push(collect_page(pool, oracle, page));
    }
    futures::future::join_all(handles).await;
    Ok(())
}

async fn collect_page(pool: &PgPool, oracle: &dyn PriceOracleClient, page: i64) {
    if let Err(e) = collect_page_inner(pool, oracle, page).await {
        error!(page, error = %e, "skipping price snapshot page due to error");
    }
}

async fn collect_page_inner(
    pool: &PgPool,
    oracle: &dyn PriceOracleClient,
    page: i64,
) -> Result<(), AppError> {
    let snapshots = price_snapshot_queries::fetch_page(pool, page * PAGE_SIZE, PAGE_SIZE).await?;
    if snapshots.is_empty() {
        return Ok(());
    }

    info!(page, count = snapshots.len(), "collecting prices for snapshot page");

    let mut query: HashMap<String, Vec<i64>> = HashMap::new();
    for s in &snapshots {
        query
            .entry(format!("{CHAIN_PREFIX}:{}", s.token_id))
            .or_default()
            .push(s.timestamp);
    }

    let min_requested: HashMap<&str, i64> = query
        .iter()
        .filter_map(|(coin, timestamps)| {
            timestamps.iter().min().map(|&min_ts| (coin.as_str(), min_ts))
        })
        .collect();

    let result = match oracle.batch_historical(&query).await {
        Ok(result) => result,
        Err(e) => {
            error!(page, error = %e, "skipping price snapshot page due to connection error");
            return Ok(());
        }
    };

    let prices: Vec<Price> = result
        .into_iter()
        .filter_map(|(coin, points)| {
            let min_requested = min_requested.get(coin.as_str()).copied();
            let token_id = coin.strip_prefix(&format!("{CHAIN_PREFIX}:"))?.to_string();
            Some((token_id, points, min_requested))
        })
        .flat_map(|(token_id, points, min_requested)| {
            points.into_iter().filter_map(move |p| {
                let mut t_grid = p.timestamp.div_euclid(INTERVAL) * INTERVAL;
                if let Some(min_requested) = min_requested {
                    t_grid = t_grid.max(min_requested);
                }
                BigDecimal::try_from(p.price)
                    .ok()
                    .map(|value| Price {
                        token_id: token_id.clone(),
                        timestamp: t_grid,
                        value,
                    })
            })
        })
        .collect();

    if !prices.is_empty() {
        price_queries::upsert_many(pool, &prices).await?;
    }

    price_snapshot_queries::delete_many(pool, &snapshots).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_is_bounded_by_max_pages() {
        let pages = ((1_000_i64 + PAGE_SIZE - 1) / PAGE_SIZE).min(MAX_PAGES);
        assert_eq!(pages, MAX_PAGES);
    }
}
