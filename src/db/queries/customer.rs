//! Customer, address and delivery window lookups

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveTime;
use sqlx::{PgConnection, PgPool};

use crate::services::delivery_window::StoredWindow;
use crate::types::WindowDocumentType;

/// Delivery window stored on a customer, `None` if the customer is unknown
pub async fn get_delivery_window(pool: &PgPool, customer: &str) -> Result<Option<StoredWindow>> {
    let window = sqlx::query_as::<_, (Option<NaiveTime>, Option<NaiveTime>)>(
        "SELECT delivery_start_time, delivery_end_time FROM customers WHERE name = $1"
    )
    .bind(customer)
    .fetch_optional(pool)
    .await?;

    Ok(window)
}

/// Delivery window stored on a transaction document, `None` if it does not exist
pub async fn get_document_delivery_window(
    pool: &PgPool,
    doctype: WindowDocumentType,
    name: &str,
) -> Result<Option<StoredWindow>> {
    let sql = match doctype {
        WindowDocumentType::DeliveryNote => {
            "SELECT delivery_start_time, delivery_end_time FROM delivery_notes WHERE name = $1"
        }
        WindowDocumentType::SalesInvoice => {
            "SELECT delivery_start_time, delivery_end_time FROM sales_invoices WHERE name = $1"
        }
    };

    let window = sqlx::query_as::<_, (Option<NaiveTime>, Option<NaiveTime>)>(sql)
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(window)
}

/// Display strings of address records by id
pub async fn address_displays(conn: &mut PgConnection, addresses: &[String]) -> Result<HashMap<String, String>> {
    if addresses.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT name, display FROM addresses WHERE name = ANY($1)"
    )
    .bind(addresses)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().collect())
}
