//! Driver time tracking types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DocStatus;

/// Driver action on a running trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverAction {
    Start,
    Pause,
    Continue,
    End,
}

impl DriverAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            DriverAction::Start => "start",
            DriverAction::Pause => "pause",
            DriverAction::Continue => "continue",
            DriverAction::End => "end",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "start" => Some(DriverAction::Start),
            "pause" => Some(DriverAction::Pause),
            "continue" => Some(DriverAction::Continue),
            "end" => Some(DriverAction::End),
            _ => None,
        }
    }
}

/// One driving segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLog {
    pub activity_type: Option<String>,
    pub from_time: Option<NaiveDateTime>,
    pub to_time: Option<NaiveDateTime>,
}

impl TimeLog {
    pub fn open(activity_type: Option<String>, from_time: NaiveDateTime) -> Self {
        Self {
            activity_type,
            from_time: Some(from_time),
            to_time: None,
        }
    }
}

/// Time tracking record bound to a trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timesheet {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub company: String,
    pub employee: Option<String>,
    pub docstatus: DocStatus,
    pub time_logs: Vec<TimeLog>,
}

/// `trip.timesheet` request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetActionRequest {
    pub trip_id: Uuid,
    /// One of start / pause / continue / end
    pub action: String,
    pub odometer_value: Option<f64>,
}
