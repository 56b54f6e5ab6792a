use std::collections::HashSet;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use sqlx::PgPool;
use tracing::{debug, error, info};

use crate::collectors::hashing::transfer_id;
use crate::db::{token_queries, transfer_queries, transfer_snapshot_queries};
use crate::errors::AppError;
use crate::external::BlockExplorerClient;
use crate::models::{Transfer, TransferSnapshot};

const PAGE_SIZE: u32 = 10_000;

/// Claim one snapshot and fully drain it (spec §4.5). A no-op if the
/// backlog is empty — callers schedule this repeatedly and cheaply.
pub async fn collect_transfers(
    pool: &PgPool,
    explorer: &dyn BlockExplorerClient,
) -> Result<(), AppError> {
    let Some(snapshot) = transfer_snapshot_queries::claim_smallest(pool).await? else {
        return Ok(());
    };

    info!(
        treasury = %snapshot.treasury_id,
        from = snapshot.from_timestamp,
        to = snapshot.to_timestamp,
        "collecting transfers for snapshot"
    );

    if let Err(e) = drain_snapshot(pool, explorer, &snapshot).await {
        error!(
            treasury = %snapshot.treasury_id,
            from = snapshot.from_timestamp,
            to = snapshot.to_timestamp,
            error = %e,
            "skipping snapshot due to connection error"
        );
        transfer_snapshot_queries::reinsert(pool, &snapshot).await?;
    }

    Ok(())
}

async fn drain_snapshot(
    pool: &PgPool,
    explorer: &dyn BlockExplorerClient,
    snapshot: &TransferSnapshot,
) -> Result<(), AppError> {
    let known_tokens: HashSet<String> = token_queries::fetch_all(pool)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    let mut from_block = explorer.block_at(snapshot.from_timestamp).await?;
    let to_block = explorer.block_at(snapshot.to_timestamp).await?;

    loop {
        let page = explorer
            .token_transfers(&snapshot.treasury_id, from_block, to_block, PAGE_SIZE)
            .await?;
        let is_last_page = (page.len() as u32) < PAGE_SIZE;

        if !is_last_page {
            from_block = page
                .last()
                .map(|tx| tx.block_number)
                .unwrap_or(from_block);
        }

        let transfers: Vec<Transfer> = page
            .into_iter()
            .filter(|tx| known_tokens.contains(&tx.token_id))
            .map(|tx| {
                let id = transfer_id(&tx);
                let timestamp = tx
                    .timestamp
                    .parse::<i64>()
                    .map_err(|e| AppError::Connection(format!("bad timestamp {}: {e}", tx.timestamp)))?;
                let value = BigDecimal::from_str(&tx.value)
                    .map_err(|e| AppError::Connection(format!("bad value {}: {e}", tx.value)))?;
                Ok::<_, AppError>(Transfer {
                    id,
                    timestamp,
                    block_number: tx.block_number,
                    token_id: tx.token_id,
                    from_address: tx.from_address,
                    to_address: tx.to_address,
                    value,
                })
            })
            .collect::<Result<_, _>>()?;

        if !transfers.is_empty() {
            debug!(count = transfers.len(), "upserting transfers");
            transfer_queries::upsert_many(pool, &transfers).await?;
        }

        if is_last_page {
            break;
        }
    }

    Ok(())
}
