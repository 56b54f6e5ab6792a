use sqlx::PgPool;

use crate::models::Transfer;

/// Upsert a batch of transfers, conflict-do-nothing on `id` (spec §4.5
/// step 5 — the content hash makes re-ingestion a no-op, satisfying the
/// idempotence property in §8).
pub async fn upsert_many(pool: &PgPool, transfers: &[Transfer]) -> Result<(), sqlx::Error> {
    if transfers.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    for t in transfers {
        sqlx::query!(
            r#"
            INSERT INTO transfers (id, timestamp, block_number, token_id, from_address, to_address, value)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
            t.id,
            t.timestamp,
            t.block_number,
            t.token_id,
            t.from_address,
            t.to_address,
            t.value
        )
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Transfers for `token_id` touching any of `treasuries`, deterministically
/// ordered (spec §4.1's ordering guarantee, relied on by test suites).
pub async fn fetch_for_token_and_treasuries(
    pool: &PgPool,
    token_id: &str,
    treasuries: &[String],
) -> Result<Vec<Transfer>, sqlx::Error> {
    sqlx::query_as::<_, Transfer>(
        r#"
        SELECT id, timestamp, block_number, token_id, from_address, to_address, value
        FROM transfers
        WHERE token_id = $1 AND (from_address = ANY($2) OR to_address = ANY($2))
        ORDER BY timestamp ASC, id ASC
        "#,
    )
    .bind(token_id)
    .bind(treasuries)
    .fetch_all(pool)
    .await
}

/// True iff any transfer touching `treasury_id` falls in `[from, to)` —
/// used by `update_snapshots` to decide whether a window is complete.
pub async fn exists_in_window(
    pool: &PgPool,
    treasury_id: &str,
    from_timestamp: i64,
    to_timestamp: i64,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query!(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM transfers
            WHERE timestamp >= $1 AND timestamp < $2
              AND (from_address = $3 OR to_address = $3)
        ) AS "exists!"
        "#,
        from_timestamp,
        to_timestamp,
        treasury_id
    )
    .fetch_one(pool)
    .await?;

    Ok(row.exists)
}
