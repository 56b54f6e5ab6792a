use sqlx::PgPool;

use crate::models::Treasury;

/// Upsert a treasury address. If the address already belongs to a
/// different protocol, its `protocol_id` is updated (spec §8 scenario 5).
pub async fn upsert(pool: &PgPool, id: &str, protocol_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query!(
        r#"
        INSERT INTO treasuries (id, protocol_id)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET protocol_id = EXCLUDED.protocol_id
        "#,
        id,
        protocol_id
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Treasury>, sqlx::Error> {
    sqlx::query_as::<_, Treasury>("SELECT id, protocol_id FROM treasuries")
        .fetch_all(pool)
        .await
}

pub async fn fetch_for_protocol(
    pool: &PgPool,
    protocol_id: &str,
) -> Result<Vec<Treasury>, sqlx::Error> {
    sqlx::query_as::<_, Treasury>("SELECT id, protocol_id FROM treasuries WHERE protocol_id = $1")
        .bind(protocol_id)
        .fetch_all(pool)
        .await
}
