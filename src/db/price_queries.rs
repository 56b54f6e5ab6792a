use sqlx::PgPool;

use crate::models::Price;

/// Upsert a batch of prices, conflict-do-nothing on `(token_id, timestamp)`
/// (spec §4.6 step 3).
pub async fn upsert_many(pool: &PgPool, prices: &[Price]) -> Result<(), sqlx::Error> {
    if prices.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    for p in prices {
        sqlx::query!(
            r#"
            INSERT INTO prices (token_id, timestamp, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (token_id, timestamp) DO NOTHING
            "#,
            p.token_id,
            p.timestamp,
            p.value
        )
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Ordered by timestamp ascending, per spec §4.1's read contract.
pub async fn fetch_for_token(pool: &PgPool, token_id: &str) -> Result<Vec<Price>, sqlx::Error> {
    sqlx::query_as::<_, Price>(
        "SELECT token_id, timestamp, value FROM prices WHERE token_id = $1 ORDER BY timestamp ASC",
    )
    .bind(token_id)
    .fetch_all(pool)
    .await
}

pub async fn exists_at(pool: &PgPool, token_id: &str, timestamp: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query!(
        r#"SELECT EXISTS(SELECT 1 FROM prices WHERE token_id = $1 AND timestamp = $2) AS "exists!""#,
        token_id,
        timestamp
    )
    .fetch_one(pool)
    .await?;

    Ok(row.exists)
}
