//! Driver timesheet queries

use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::types::{DocStatus, TimeLog, Timesheet};

#[derive(Debug, sqlx::FromRow)]
struct TimesheetRow {
    id: Uuid,
    trip_id: Uuid,
    company: String,
    employee: Option<String>,
    docstatus: DocStatus,
}

/// The trip's draft timesheet, if one is open
pub async fn get_open_timesheet(conn: &mut PgConnection, trip_id: Uuid) -> Result<Option<Timesheet>> {
    let row = sqlx::query_as::<_, TimesheetRow>(
        r#"
        SELECT id, trip_id, company, employee, docstatus
        FROM timesheets
        WHERE trip_id = $1 AND docstatus = 0
        ORDER BY created_at
        LIMIT 1
        "#
    )
    .bind(trip_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let logs: Vec<(Option<String>, Option<NaiveDateTime>, Option<NaiveDateTime>)> = sqlx::query_as(
        "SELECT activity_type, from_time, to_time FROM time_logs WHERE timesheet_id = $1 ORDER BY idx"
    )
    .bind(row.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(Timesheet {
        id: row.id,
        trip_id: row.trip_id,
        company: row.company,
        employee: row.employee,
        docstatus: row.docstatus,
        time_logs: logs
            .into_iter()
            .map(|(activity_type, from_time, to_time)| TimeLog {
                activity_type,
                from_time,
                to_time,
            })
            .collect(),
    }))
}

/// Insert or update a timesheet and replace its time logs
pub async fn save_timesheet(conn: &mut PgConnection, timesheet: &Timesheet) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO timesheets (id, trip_id, company, employee, docstatus, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        ON CONFLICT (id) DO UPDATE SET
            employee = $4,
            docstatus = $5
        "#
    )
    .bind(timesheet.id)
    .bind(timesheet.trip_id)
    .bind(&timesheet.company)
    .bind(&timesheet.employee)
    .bind(timesheet.docstatus)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM time_logs WHERE timesheet_id = $1")
        .bind(timesheet.id)
        .execute(&mut *conn)
        .await?;

    for (i, log) in timesheet.time_logs.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO time_logs (timesheet_id, idx, activity_type, from_time, to_time)
            VALUES ($1, $2, $3, $4, $5)
            "#
        )
        .bind(timesheet.id)
        .bind(i as i32 + 1)
        .bind(&log.activity_type)
        .bind(log.from_time)
        .bind(log.to_time)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Employee record behind a driver
pub async fn driver_employee(conn: &mut PgConnection, driver: &str) -> Result<Option<String>> {
    let employee: Option<(Option<String>,)> = sqlx::query_as("SELECT employee FROM drivers WHERE name = $1")
        .bind(driver)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(employee.and_then(|(e,)| e))
}
