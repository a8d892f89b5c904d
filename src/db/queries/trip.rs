//! Delivery trip database queries

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::types::{DeliveryStop, DocStatus, Trip, TripStatus};

/// Trip header row (stops are loaded separately)
#[derive(Debug, Clone, sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    name: String,
    company: String,
    driver: Option<String>,
    driver_name: Option<String>,
    driver_address: Option<String>,
    vehicle: Option<String>,
    departure_time: NaiveDateTime,
    odometer_start_value: Option<f64>,
    odometer_start_time: Option<NaiveDateTime>,
    odometer_end_value: Option<f64>,
    odometer_end_time: Option<NaiveDateTime>,
    actual_distance_travelled: Option<f64>,
    status: TripStatus,
    docstatus: DocStatus,
    total_distance: Option<f64>,
    uom: Option<String>,
    package_total: f64,
    map_embed: Option<String>,
    email_notification_sent: bool,
}

impl TripRow {
    fn into_trip(self, delivery_stops: Vec<DeliveryStop>) -> Trip {
        Trip {
            id: self.id,
            name: self.name,
            company: self.company,
            driver: self.driver,
            driver_name: self.driver_name,
            driver_address: self.driver_address,
            vehicle: self.vehicle,
            departure_time: self.departure_time,
            odometer_start_value: self.odometer_start_value,
            odometer_start_time: self.odometer_start_time,
            odometer_end_value: self.odometer_end_value,
            odometer_end_time: self.odometer_end_time,
            actual_distance_travelled: self.actual_distance_travelled,
            status: self.status,
            docstatus: self.docstatus,
            delivery_stops,
            total_distance: self.total_distance,
            uom: self.uom,
            package_total: self.package_total,
            map_embed: self.map_embed,
            email_notification_sent: self.email_notification_sent,
        }
    }
}

const TRIP_COLUMNS: &str = r#"
    id, name, company, driver, driver_name, driver_address, vehicle,
    departure_time, odometer_start_value, odometer_start_time,
    odometer_end_value, odometer_end_time, actual_distance_travelled,
    status, docstatus, total_distance, uom, package_total, map_embed,
    email_notification_sent
"#;

async fn fetch_trip(conn: &mut PgConnection, trip_id: Uuid, for_update: bool) -> Result<Option<Trip>> {
    let query = format!(
        "SELECT {} FROM delivery_trips WHERE id = $1{}",
        TRIP_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );

    let row = sqlx::query_as::<_, TripRow>(&query)
        .bind(trip_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let stops = sqlx::query_as::<_, DeliveryStop>(
        r#"
        SELECT
            id, idx, customer, address, customer_address, contact,
            delivery_note, sales_invoice, lat, lng, distance, uom,
            estimated_arrival, delivery_start_time, delivery_end_time,
            visited, lock, paid_amount, grand_total
        FROM delivery_stops
        WHERE trip_id = $1
        ORDER BY idx
        "#
    )
    .bind(trip_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(row.into_trip(stops)))
}

/// Get a trip with its stops
pub async fn get_trip(pool: &PgPool, trip_id: Uuid) -> Result<Option<Trip>> {
    let mut conn = pool.acquire().await?;
    fetch_trip(&mut conn, trip_id, false).await
}

/// Get a trip and hold its row lock until the transaction ends
pub async fn lock_trip(conn: &mut PgConnection, trip_id: Uuid) -> Result<Option<Trip>> {
    fetch_trip(conn, trip_id, true).await
}

/// Insert or update a trip and replace its stops
pub async fn save_trip(conn: &mut PgConnection, trip: &Trip) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO delivery_trips (
            id, name, company, driver, driver_name, driver_address, vehicle,
            departure_time, odometer_start_value, odometer_start_time,
            odometer_end_value, odometer_end_time, actual_distance_travelled,
            status, docstatus, total_distance, uom, package_total, map_embed,
            email_notification_sent, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, NOW(), NOW())
        ON CONFLICT (id) DO UPDATE SET
            name = $2,
            company = $3,
            driver = $4,
            driver_name = $5,
            driver_address = $6,
            vehicle = $7,
            departure_time = $8,
            odometer_start_value = $9,
            odometer_start_time = $10,
            odometer_end_value = $11,
            odometer_end_time = $12,
            actual_distance_travelled = $13,
            status = $14,
            docstatus = $15,
            total_distance = $16,
            uom = $17,
            package_total = $18,
            map_embed = $19,
            email_notification_sent = $20,
            updated_at = NOW()
        "#
    )
    .bind(trip.id)
    .bind(&trip.name)
    .bind(&trip.company)
    .bind(&trip.driver)
    .bind(&trip.driver_name)
    .bind(&trip.driver_address)
    .bind(&trip.vehicle)
    .bind(trip.departure_time)
    .bind(trip.odometer_start_value)
    .bind(trip.odometer_start_time)
    .bind(trip.odometer_end_value)
    .bind(trip.odometer_end_time)
    .bind(trip.actual_distance_travelled)
    .bind(trip.status)
    .bind(trip.docstatus)
    .bind(trip.total_distance)
    .bind(&trip.uom)
    .bind(trip.package_total)
    .bind(&trip.map_embed)
    .bind(trip.email_notification_sent)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("failed to save trip {}", trip.name))?;

    sqlx::query("DELETE FROM delivery_stops WHERE trip_id = $1")
        .bind(trip.id)
        .execute(&mut *conn)
        .await?;

    for stop in &trip.delivery_stops {
        sqlx::query(
            r#"
            INSERT INTO delivery_stops (
                id, trip_id, idx, customer, address, customer_address, contact,
                delivery_note, sales_invoice, lat, lng, distance, uom,
                estimated_arrival, delivery_start_time, delivery_end_time,
                visited, lock, paid_amount, grand_total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20)
            "#
        )
        .bind(stop.id)
        .bind(trip.id)
        .bind(stop.idx)
        .bind(&stop.customer)
        .bind(&stop.address)
        .bind(&stop.customer_address)
        .bind(&stop.contact)
        .bind(&stop.delivery_note)
        .bind(&stop.sales_invoice)
        .bind(stop.lat)
        .bind(stop.lng)
        .bind(stop.distance)
        .bind(&stop.uom)
        .bind(stop.estimated_arrival)
        .bind(stop.delivery_start_time)
        .bind(stop.delivery_end_time)
        .bind(stop.visited)
        .bind(stop.lock)
        .bind(stop.paid_amount)
        .bind(stop.grand_total)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("failed to save stop {} of trip {}", stop.idx, trip.name))?;
    }

    Ok(())
}

/// Names of trips (not cancelled) that already reference one of `delivery_notes`
pub async fn find_trips_for_delivery_notes(pool: &PgPool, delivery_notes: &[String]) -> Result<Vec<String>> {
    if delivery_notes.is_empty() {
        return Ok(vec![]);
    }

    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT t.name
        FROM delivery_trips t
        JOIN delivery_stops s ON s.trip_id = t.id
        WHERE t.docstatus < 2 AND s.delivery_note = ANY($1)
        ORDER BY t.name
        "#
    )
    .bind(delivery_notes)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Submitted trips with a stop billed on `sales_invoice`
pub async fn submitted_trips_for_invoice(conn: &mut PgConnection, sales_invoice: &str) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT s.trip_id
        FROM delivery_stops s
        JOIN delivery_trips t ON t.id = s.trip_id
        WHERE s.sales_invoice = $1 AND t.docstatus = 1
        "#
    )
    .bind(sales_invoice)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}
