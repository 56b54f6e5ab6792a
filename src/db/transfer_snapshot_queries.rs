use sqlx::PgPool;

use crate::models::TransferSnapshot;

/// Batch-insert pending transfer snapshots, conflict-do-nothing on the
/// composite key (spec §4.4).
pub async fn insert_many(
    pool: &PgPool,
    snapshots: &[TransferSnapshot],
) -> Result<(), sqlx::Error> {
    if snapshots.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    for s in snapshots {
        sqlx::query!(
            r#"
            INSERT INTO transfer_snapshots (treasury_id, from_timestamp, to_timestamp)
            VALUES ($1, $2, $3)
            ON CONFLICT (treasury_id, from_timestamp, to_timestamp) DO NOTHING
            "#,
            s.treasury_id,
            s.from_timestamp,
            s.to_timestamp
        )
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query!(r#"SELECT COUNT(*) AS "count!" FROM transfer_snapshots"#)
        .fetch_one(pool)
        .await?;
    Ok(row.count)
}

/// Atomically claim the lexicographically smallest snapshot, ordered by
/// `(treasury_id, from_timestamp, to_timestamp)` as required by spec
/// §4.5 — this delete is the collector's serialisation point under
/// concurrent workers.
pub async fn claim_smallest(
    pool: &PgPool,
) -> Result<Option<TransferSnapshot>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let claimed = sqlx::query_as::<_, TransferSnapshot>(
        r#"
        DELETE FROM transfer_snapshots
        WHERE (treasury_id, from_timestamp, to_timestamp) = (
            SELECT treasury_id, from_timestamp, to_timestamp
            FROM transfer_snapshots
            ORDER BY treasury_id, from_timestamp, to_timestamp
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING treasury_id, from_timestamp, to_timestamp
        "#,
    )
    .fetch_optional(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(claimed)
}

/// Re-insert a snapshot that failed after being claimed, abstracting the
/// original's "make transient and add" (spec §4.5 failure semantics, §9).
pub async fn reinsert(pool: &PgPool, snapshot: &TransferSnapshot) -> Result<(), sqlx::Error> {
    sqlx::query!(
        r#"
        INSERT INTO transfer_snapshots (treasury_id, from_timestamp, to_timestamp)
        VALUES ($1, $2, $3)
        ON CONFLICT (treasury_id, from_timestamp, to_timestamp) DO NOTHING
        "#,
        snapshot.treasury_id,
        snapshot.from_timestamp,
        snapshot.to_timestamp
    )
    .execute(pool)
    .await?;

    Ok(())
}
