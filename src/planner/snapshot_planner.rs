use std::path::Path;

use sqlx::PgPool;
use tracing::{debug, info};

use crate::catalog;
use crate::db::{price_queries, price_snapshot_queries, token_queries, transfer_queries, transfer_snapshot_queries, treasury_queries};
use crate::errors::AppError;
use crate::models::{PriceSnapshot, TransferSnapshot};
use crate::planner::grid::grid_now;

/// Pending rows are flushed in batches this large, matching the
/// original's `OFFSET = 100_000` (spec §4.4).
const BATCH_SIZE: usize = 100_000;

async fn flush_transfer_batch(
    pool: &PgPool,
    batch: &mut Vec<TransferSnapshot>,
) -> Result<(), AppError> {
    if batch.is_empty() {
        return Ok(());
    }
    transfer_snapshot_queries::insert_many(pool, batch).await?;
    batch.clear();
    Ok(())
}

async fn flush_price_batch(
    pool: &PgPool,
    batch: &mut Vec<PriceSnapshot>,
) -> Result<(), AppError> {
    if batch.is_empty() {
        return Ok(());
    }
    price_snapshot_queries::insert_many(pool, batch).await?;
    batch.clear();
    Ok(())
}

/// First run: enqueue one wide `TransferSnapshot` spanning the whole grid
/// per treasury, and a `PriceSnapshot` for every `(token, t)` with
/// `t` in `grid[1..]` (spec §4.4).
pub async fn initialize_snapshots(pool: &PgPool, catalog_dir: &Path) -> Result<(), AppError> {
    info!("initializing snapshots from catalog");
    catalog::load_protocols(pool, catalog_dir).await?;
    catalog::load_tokens(pool, catalog_dir).await?;

    let timestamps = grid_now();
    let (Some(&first), Some(&last)) = (timestamps.first(), timestamps.last()) else {
        debug!("grid is empty, nothing to initialize");
        return Ok(());
    };

    let treasuries = treasury_queries::fetch_all(pool).await?;
    let wide_snapshots: Vec<TransferSnapshot> = treasuries
        .into_iter()
        .map(|t| TransferSnapshot {
            treasury_id: t.id,
            from_timestamp: first,
            to_timestamp: last,
        })
        .collect();
    transfer_snapshot_queries::insert_many(pool, &wide_snapshots).await?;

    let tokens = token_queries::fetch_all(pool).await?;
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    for &t in &timestamps[1..] {
        for token in &tokens {
            batch.push(PriceSnapshot {
                token_id: token.id.clone(),
                timestamp: t,
            });
            if batch.len() >= BATCH_SIZE {
                flush_price_batch(pool, &mut batch).await?;
            }
        }
    }
    flush_price_batch(pool, &mut batch).await?;

    info!("initializing snapshots complete");
    Ok(())
}

/// Daily run: reload the catalog, then for each consecutive grid pair and
/// treasury, enqueue a `TransferSnapshot` iff no transfer touches that
/// treasury in `[from, to)`; for each `t` in `grid[1..]` and token, enqueue
/// a `PriceSnapshot` iff no price exists at exactly `t` (spec §4.4).
pub async fn update_snapshots(pool: &PgPool, catalog_dir: &Path) -> Result<(), AppError> {
    info!("updating snapshots from catalog");
    catalog::load_protocols(pool, catalog_dir).await?;
    catalog::load_tokens(pool, catalog_dir).await?;

    let timestamps = grid_now();
    if timestamps.len() < 2 {
        debug!("grid too small to check, nothing to update");
        return Ok(());
    }

    let treasuries = treasury_queries::fetch_all(pool).await?;
    let mut transfer_batch = Vec::with_capacity(BATCH_SIZE);
    for window in timestamps.windows(2) {
        let (from_timestamp, to_timestamp) = (window[0], window[1]);
        for treasury in &treasuries {
            let exists =
                transfer_queries::exists_in_window(pool, &treasury.id, from_timestamp, to_timestamp)
                    .await?;
            if !exists {
                transfer_batch.push(TransferSnapshot {
                    treasury_id: treasury.id.clone(),
                    from_timestamp,
                    to_timestamp,
                });
                if transfer_batch.len() >= BATCH_SIZE {
                    flush_transfer_batch(pool, &mut transfer_batch).await?;
                }
            }
        }
    }
    flush_transfer_batch(pool, &mut transfer_batch).await?;

    let tokens = token_queries::fetch_all(pool).await?;
    let mut price_batch = Vec::with_capacity(BATCH_SIZE);
    for &t in &timestamps[1..] {
        for token in &tokens {
            if !price_queries::exists_at(pool, &token.id, t).await? {
                price_batch.push(PriceSnapshot {
                    token_id: token.id.clone(),
                    timestamp: t,
                });
                if price_batch.len() >= BATCH_SIZE {
                    flush_price_batch(pool, &mut price_batch).await?;
                }
            }
        }
    }
    flush_price_batch(pool, &mut price_batch).await?;

    info!("updating snapshots complete");
    Ok(())
}
