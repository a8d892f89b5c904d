//! Driver actions on a running trip.
//!
//! Each active driving stretch is one open time log on the trip's draft
//! timesheet. `end` closes the last log and submits the timesheet.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::error::{PlanningError, PlanningResult};
use crate::services::status::derive_status;
use crate::types::{DocStatus, DriverAction, TimeLog, Timesheet, Trip, TripStatus};

/// Context of a driver action
#[derive(Debug, Clone)]
pub struct ActionContext<'a> {
    pub now: NaiveDateTime,
    pub odometer_value: Option<f64>,
    /// Employee behind the trip's driver
    pub employee: Option<String>,
    pub activity_type: Option<&'a str>,
}

fn last_log_of<'t>(timesheet: &'t mut Option<Timesheet>, activity_type: Option<&str>) -> Option<&'t mut TimeLog> {
    timesheet
        .as_mut()?
        .time_logs
        .last_mut()
        .filter(|log| log.activity_type.as_deref() == activity_type)
}

/// Apply `action` to the trip and its open timesheet.
///
/// Returns the timesheet to save, if any.
pub fn apply_driver_action(
    trip: &mut Trip,
    mut timesheet: Option<Timesheet>,
    action: DriverAction,
    ctx: &ActionContext<'_>,
) -> PlanningResult<Option<Timesheet>> {
    if !trip.is_submitted() {
        return Err(PlanningError::InvalidTransition {
            action: action.as_str().to_string(),
            state: trip.docstatus.as_str().to_string(),
        });
    }

    match action {
        DriverAction::Start => {
            if trip.odometer_start_time.is_some() {
                return Err(PlanningError::InvalidTransition {
                    action: action.as_str().to_string(),
                    state: trip.status.as_str().to_string(),
                });
            }

            timesheet = Some(Timesheet {
                id: Uuid::new_v4(),
                trip_id: trip.id,
                company: trip.company.clone(),
                employee: ctx.employee.clone(),
                docstatus: DocStatus::Draft,
                time_logs: vec![TimeLog::open(ctx.activity_type.map(str::to_string), ctx.now)],
            });

            trip.status = TripStatus::InTransit;
            trip.odometer_start_value = ctx.odometer_value;
            trip.odometer_start_time = Some(ctx.now);
        }
        DriverAction::Pause => {
            if let Some(log) = last_log_of(&mut timesheet, ctx.activity_type) {
                if log.from_time.is_some() && log.to_time.is_none() {
                    log.to_time = Some(ctx.now);
                }
            }
            trip.status = TripStatus::Paused;
        }
        DriverAction::Continue => {
            let closed = last_log_of(&mut timesheet, ctx.activity_type)
                .is_some_and(|log| log.from_time.is_some() && log.to_time.is_some());
            if closed {
                if let Some(sheet) = timesheet.as_mut() {
                    sheet
                        .time_logs
                        .push(TimeLog::open(ctx.activity_type.map(str::to_string), ctx.now));
                }
            }
            trip.status = TripStatus::InTransit;
        }
        DriverAction::End => {
            let end_value = ctx
                .odometer_value
                .ok_or_else(|| PlanningError::MissingOdometer(action.as_str().to_string()))?;
            let start_value = trip
                .odometer_start_value
                .ok_or_else(|| PlanningError::MissingOdometer("start".to_string()))?;

            let closed = match last_log_of(&mut timesheet, ctx.activity_type) {
                Some(log) => {
                    log.to_time = Some(ctx.now);
                    true
                }
                None => false,
            };
            if closed {
                if let Some(sheet) = timesheet.as_mut() {
                    sheet.docstatus = DocStatus::Submitted;
                }
            }

            trip.status = TripStatus::Completed;
            trip.odometer_end_value = Some(end_value);
            trip.odometer_end_time = Some(ctx.now);
            trip.actual_distance_travelled = Some(end_value - start_value);
        }
    }

    trip.status = derive_status(trip);
    Ok(timesheet)
}
