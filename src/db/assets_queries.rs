use sqlx::PgPool;

use crate::models::Assets;

/// Upsert one day's computed risk row, keyed on `(protocol_id, timestamp)`
/// (spec §4.7.6).
pub async fn upsert(pool: &PgPool, row: &Assets) -> Result<(), sqlx::Error> {
    sqlx::query!(
        r#"
        INSERT INTO assets (protocol_id, timestamp, cet1, credit_rwa, market_rwa, operational_rwa, rwa, car)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (protocol_id, timestamp) DO UPDATE
        SET cet1 = EXCLUDED.cet1,
            credit_rwa = EXCLUDED.credit_rwa,
            market_rwa = EXCLUDED.market_rwa,
            operational_rwa = EXCLUDED.operational_rwa,
            rwa = EXCLUDED.rwa,
            car = EXCLUDED.car
        "#,
        row.protocol_id,
        row.timestamp,
        row.cet1,
        row.credit_rwa,
        row.market_rwa,
        row.operational_rwa,
        row.rwa,
        row.car
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn upsert_many(pool: &PgPool, rows: &[Assets]) -> Result<(), sqlx::Error> {
    for row in rows {
        upsert(pool, row).await?;
    }
    Ok(())
}

pub async fn fetch_for_protocol(pool: &PgPool, protocol_id: &str) -> Result<Vec<Assets>, sqlx::Error> {
    sqlx::query_as::<_, Assets>(
        r#"
        SELECT protocol_id, timestamp, cet1, credit_rwa, market_rwa, operational_rwa, rwa, car
        FROM assets
        WHERE protocol_id = $1
        ORDER BY timestamp ASC
        "#,
    )
    .bind(protocol_id)
    .fetch_all(pool)
    .await
}
