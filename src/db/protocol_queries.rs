use sqlx::PgPool;

use crate::models::Protocol;

/// Upsert a protocol's rating, combined addresses, and hacks. Idempotent —
/// called by the catalog loader on every pass (spec §4.3).
pub async fn upsert(
    pool: &PgPool,
    id: &str,
    rating: &str,
    addresses: &[String],
    hacks: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query!(
        r#"
        INSERT INTO protocols (id, rating, addresses, hacks)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE
        SET rating = EXCLUDED.rating,
            addresses = EXCLUDED.addresses,
            hacks = EXCLUDED.hacks
        "#,
        id,
        rating,
        addresses,
        hacks
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_by_id(pool: &PgPool, id: &str) -> Result<Option<Protocol>, sqlx::Error> {
    sqlx::query_as::<_, Protocol>(
        "SELECT id, rating, addresses, hacks FROM protocols WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Protocols with at least one treasury — the only ones the Risk Engine
/// and the daily snapshot pass care about (spec §4.1, §8 scenario 1).
pub async fn fetch_with_treasuries(pool: &PgPool) -> Result<Vec<Protocol>, sqlx::Error> {
    sqlx::query_as::<_, Protocol>(
        r#"
        SELECT DISTINCT p.id, p.rating, p.addresses, p.hacks
        FROM protocols p
        INNER JOIN treasuries t ON t.protocol_id = p.id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Protocol>, sqlx::Error> {
    sqlx::query_as::<_, Protocol>("SELECT id, rating, addresses, hacks FROM protocols")
        .fetch_all(pool)
        .await
}
