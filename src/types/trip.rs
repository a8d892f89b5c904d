//! Delivery trip types

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Document lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum DocStatus {
    #[default]
    Draft = 0,
    Submitted = 1,
    Cancelled = 2,
}

impl DocStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            DocStatus::Draft => "draft",
            DocStatus::Submitted => "submitted",
            DocStatus::Cancelled => "cancelled",
        }
    }
}

/// Trip status
///
/// Labels are stored and sent verbatim ("In Transit", not "in_transit").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trip_status")]
pub enum TripStatus {
    #[default]
    Draft,
    Scheduled,
    #[serde(rename = "In Transit")]
    #[sqlx(rename = "In Transit")]
    InTransit,
    Paused,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            TripStatus::Draft => "Draft",
            TripStatus::Scheduled => "Scheduled",
            TripStatus::InTransit => "In Transit",
            TripStatus::Paused => "Paused",
            TripStatus::Completed => "Completed",
            TripStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery trip (one driver/vehicle run over an ordered set of stops)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub name: String,
    pub company: String,
    pub driver: Option<String>,
    pub driver_name: Option<String>,
    /// Display string of the driver's home address (route depot)
    pub driver_address: Option<String>,
    pub vehicle: Option<String>,
    pub departure_time: NaiveDateTime,
    pub odometer_start_value: Option<f64>,
    pub odometer_start_time: Option<NaiveDateTime>,
    pub odometer_end_value: Option<f64>,
    pub odometer_end_time: Option<NaiveDateTime>,
    pub actual_distance_travelled: Option<f64>,
    /// Assigned by the worker; ignored on save
    #[serde(default)]
    pub status: TripStatus,
    #[serde(default)]
    pub docstatus: DocStatus,
    #[serde(default)]
    pub delivery_stops: Vec<DeliveryStop>,
    pub total_distance: Option<f64>,
    /// Display distance unit of `total_distance`
    pub uom: Option<String>,
    #[serde(default)]
    pub package_total: f64,
    pub map_embed: Option<String>,
    #[serde(default)]
    pub email_notification_sent: bool,
}

impl Trip {
    pub fn is_submitted(&self) -> bool {
        self.docstatus == DocStatus::Submitted
    }

    /// Renumber stop positions 1..N in current vector order
    pub fn renumber_stops(&mut self) {
        for (i, stop) in self.delivery_stops.iter_mut().enumerate() {
            stop.idx = i as i32 + 1;
        }
    }

    /// Distinct delivery notes in stop order
    pub fn delivery_notes(&self) -> Vec<&str> {
        let mut notes: Vec<&str> = Vec::new();
        for stop in &self.delivery_stops {
            if let Some(note) = stop.delivery_note.as_deref() {
                if !notes.contains(&note) {
                    notes.push(note);
                }
            }
        }
        notes
    }
}

/// A customer visit within a trip
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStop {
    pub id: Uuid,
    /// 1-based position within the trip
    pub idx: i32,
    pub customer: Option<String>,
    /// Address record id
    pub address: Option<String>,
    /// Formatted address display (may contain `<br>` markup)
    pub customer_address: Option<String>,
    pub contact: Option<String>,
    pub delivery_note: Option<String>,
    pub sales_invoice: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Distance from previous stop in `uom`
    pub distance: Option<f64>,
    pub uom: Option<String>,
    pub estimated_arrival: Option<NaiveDateTime>,
    pub delivery_start_time: Option<NaiveTime>,
    pub delivery_end_time: Option<NaiveTime>,
    #[serde(default)]
    pub visited: bool,
    /// Pins this stop as a route segment boundary during optimization
    #[serde(default)]
    pub lock: bool,
    #[serde(default)]
    pub paid_amount: f64,
    #[serde(default)]
    pub grand_total: f64,
}

impl DeliveryStop {
    pub fn new(idx: i32, customer_address: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            idx,
            customer: None,
            address: None,
            customer_address: Some(customer_address.into()),
            contact: None,
            delivery_note: None,
            sales_invoice: None,
            lat: None,
            lng: None,
            distance: None,
            uom: None,
            estimated_arrival: None,
            delivery_start_time: None,
            delivery_end_time: None,
            visited: false,
            lock: false,
            paid_amount: 0.0,
            grand_total: 0.0,
        }
    }

    /// Clear route-derived fields (distance, ETA, coordinates unchanged)
    pub fn clear_estimate(&mut self) {
        self.distance = None;
        self.estimated_arrival = None;
    }
}

/// Request to run route planning for a trip
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRouteRequest {
    pub trip_id: Uuid,
    /// Falls back to the configured default when omitted
    pub optimize: Option<bool>,
}

/// A leg the directions provider could not route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegFailure {
    pub leg_index: usize,
    /// 1-based positions of the stops left without an estimate
    pub stop_indices: Vec<i32>,
    pub message: String,
}

/// Result of route planning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRouteResponse {
    pub trip: Trip,
    pub failed_legs: Vec<LegFailure>,
}

/// Request carrying only a trip id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripIdRequest {
    pub trip_id: Uuid,
}

/// Stop reference used by the delivery note uniqueness check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopNoteRef {
    pub delivery_note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDeliveryNotesRequest {
    pub delivery_stops: Vec<StopNoteRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDeliveryNotesResponse {
    /// Names of trips (not cancelled) already referencing one of the notes
    pub existing_trips: Vec<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    pub fn departure() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    pub fn stop(idx: i32, address: &str) -> DeliveryStop {
        DeliveryStop::new(idx, address)
    }

    pub fn locked(idx: i32, address: &str) -> DeliveryStop {
        let mut s = DeliveryStop::new(idx, address);
        s.lock = true;
        s
    }

    pub fn trip(stops: Vec<DeliveryStop>) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            name: "DT-00001".to_string(),
            company: "Acme Distribution".to_string(),
            driver: Some("DRV-0001".to_string()),
            driver_name: Some("Jan Novak".to_string()),
            driver_address: Some("1 Depot Rd<br>Springfield<br>IL".to_string()),
            vehicle: Some("KA-01-1234".to_string()),
            departure_time: departure(),
            odometer_start_value: None,
            odometer_start_time: None,
            odometer_end_value: None,
            odometer_end_time: None,
            actual_distance_travelled: None,
            status: TripStatus::Draft,
            docstatus: DocStatus::Draft,
            delivery_stops: stops,
            total_distance: None,
            uom: None,
            package_total: 0.0,
            map_embed: None,
            email_notification_sent: false,
        }
    }
}
