//! Delivery settings queries

use anyhow::Result;
use sqlx::PgPool;

/// Stored conversion factor `from -> to`, if one was configured
pub async fn get_conversion_factor(pool: &PgPool, from_uom: &str, to_uom: &str) -> Result<Option<f64>> {
    let factor: Option<(f64,)> = sqlx::query_as(
        r#"
        SELECT value FROM uom_conversion_factors
        WHERE lower(from_uom) = lower($1) AND lower(to_uom) = lower($2)
        "#
    )
    .bind(from_uom)
    .bind(to_uom)
    .fetch_optional(pool)
    .await?;

    Ok(factor.map(|(value,)| value))
}
