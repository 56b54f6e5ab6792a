use sqlx::PgPool;

use crate::models::PriceSnapshot;

pub async fn insert_many(pool: &PgPool, snapshots: &[PriceSnapshot]) -> Result<(), sqlx::Error> {
    if snapshots.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    for s in snapshots {
        sqlx::query!(
            r#"
            INSERT INTO price_snapshots (token_id, timestamp)
            VALUES ($1, $2)
            ON CONFLICT (token_id, timestamp) DO NOTHING
            "#,
            s.token_id,
            s.timestamp
        )
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query!(r#"SELECT COUNT(*) AS "count!" FROM price_snapshots"#)
        .fetch_one(pool)
        .await?;
    Ok(row.count)
}

/// One page of the `(token_id, timestamp)`-ordered backlog, addressed by
/// `(offset, limit)` so distinct pages never overlap (spec §4.6's ordering
/// invariant).
pub async fn fetch_page(
    pool: &PgPool,
    offset: i64,
    limit: i64,
) -> Result<Vec<PriceSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, PriceSnapshot>(
        r#"
        SELECT token_id, timestamp FROM price_snapshots
        ORDER BY token_id, timestamp
        OFFSET $1 LIMIT $2
        "#,
    )
    .bind(offset)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Delete exactly the given snapshots — the page worker's success signal
/// (spec §4.6 step 4).
pub async fn delete_many(pool: &PgPool, snapshots: &[PriceSnapshot]) -> Result<(), sqlx::Error> {
    if snapshots.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    for s in snapshots {
        sqlx::query!(
            "DELETE FROM price_snapshots WHERE token_id = $1 AND timestamp = $2",
            s.token_id,
            s.timestamp
        )
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
