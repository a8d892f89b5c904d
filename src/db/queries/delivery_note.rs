//! Delivery note and sales invoice queries

use std::collections::HashMap;

use anyhow::Result;
use sqlx::PgConnection;

use crate::types::{
    DeliveryNoteStatus, DeliveryNoteStatusChange, DeliveryNoteUpdate, DueDateUpdate, InvoiceStatus,
};

/// Push trip driver metadata (or clear it on cancel) to delivery notes
pub async fn apply_note_updates(conn: &mut PgConnection, updates: &[DeliveryNoteUpdate]) -> Result<()> {
    for update in updates {
        sqlx::query(
            r#"
            UPDATE delivery_notes SET
                driver = $2,
                driver_name = $3,
                vehicle_no = $4,
                lr_no = $5,
                lr_date = $6,
                estimated_arrival = $7,
                delivered = CASE WHEN $8 THEN FALSE ELSE delivered END,
                status = CASE WHEN $8 THEN $9 ELSE status END
            WHERE name = $1
            "#
        )
        .bind(&update.delivery_note)
        .bind(&update.driver)
        .bind(&update.driver_name)
        .bind(&update.vehicle_no)
        .bind(&update.lr_no)
        .bind(update.lr_date)
        .bind(update.estimated_arrival)
        .bind(update.reset_delivery)
        .bind(DeliveryNoteStatus::ToDeliver)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Write delivery note status / delivered flag changes
pub async fn apply_status_changes(conn: &mut PgConnection, changes: &[DeliveryNoteStatusChange]) -> Result<()> {
    for change in changes {
        sqlx::query(
            r#"
            UPDATE delivery_notes SET
                status = COALESCE($2, status),
                delivered = COALESCE($3, delivered)
            WHERE name = $1
            "#
        )
        .bind(&change.delivery_note)
        .bind(change.status)
        .bind(change.delivered)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// The one sales invoice each delivery note is billed on, where known
pub async fn note_invoices(conn: &mut PgConnection, delivery_notes: &[String]) -> Result<HashMap<String, String>> {
    if delivery_notes.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT name, against_sales_invoice
        FROM delivery_notes
        WHERE name = ANY($1) AND against_sales_invoice IS NOT NULL
        "#
    )
    .bind(delivery_notes)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Payment status of the given invoices
pub async fn invoice_statuses(conn: &mut PgConnection, sales_invoices: &[String]) -> Result<HashMap<String, InvoiceStatus>> {
    if sales_invoices.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT name, status FROM sales_invoices WHERE name = ANY($1)"
    )
    .bind(sales_invoices)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, status)| (name, InvoiceStatus::from_str(&status)))
        .collect())
}

/// Push out invoice due dates; invoices without payment terms keep theirs
pub async fn push_due_dates(conn: &mut PgConnection, updates: &[DueDateUpdate]) -> Result<()> {
    for update in updates {
        sqlx::query(
            r#"
            UPDATE sales_invoices SET due_date = $2
            WHERE name = $1 AND payment_terms_template IS NOT NULL
            "#
        )
        .bind(&update.sales_invoice)
        .bind(update.due_date)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
