use sqlx::PgPool;

use crate::models::Token;

#[allow(clippy::too_many_arguments)]
pub async fn upsert(
    pool: &PgPool,
    id: &str,
    protocol_id: &str,
    symbol: &str,
    itin: &str,
    decimals: i32,
    itc_eep: Option<&str>,
    underlying: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query!(
        r#"
        INSERT INTO tokens (id, protocol_id, symbol, itin, decimals, itc_eep, underlying)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE
        SET protocol_id = EXCLUDED.protocol_id,
            symbol = EXCLUDED.symbol,
            itin = EXCLUDED.itin,
            decimals = EXCLUDED.decimals,
            itc_eep = EXCLUDED.itc_eep,
            underlying = EXCLUDED.underlying
        "#,
        id,
        protocol_id,
        symbol,
        itin,
        decimals,
        itc_eep,
        underlying
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Token>, sqlx::Error> {
    sqlx::query_as::<_, Token>(
        "SELECT id, protocol_id, symbol, itin, decimals, itc_eep, underlying FROM tokens",
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_for_protocol(pool: &PgPool, protocol_id: &str) -> Result<Vec<Token>, sqlx::Error> {
    sqlx::query_as::<_, Token>(
        "SELECT id, protocol_id, symbol, itin, decimals, itc_eep, underlying FROM tokens WHERE protocol_id = $1",
    )
    .bind(protocol_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_by_itc_eep_codes(
    pool: &PgPool,
    codes: &[&str],
) -> Result<Vec<Token>, sqlx::Error> {
    sqlx::query_as::<_, Token>(
        "SELECT id, protocol_id, symbol, itin, decimals, itc_eep, underlying FROM tokens WHERE itc_eep = ANY($1)",
    )
    .bind(codes)
    .fetch_all(pool)
    .await
}
