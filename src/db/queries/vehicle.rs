//! Vehicle database queries

use anyhow::Result;
use sqlx::PgConnection;

/// Record the odometer reading at the end of a trip
pub async fn set_last_odometer(conn: &mut PgConnection, vehicle: &str, odometer: f64) -> Result<()> {
    sqlx::query("UPDATE vehicles SET last_odometer = $2 WHERE name = $1")
        .bind(vehicle)
        .bind(odometer)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
