//! Trip status reconciliation and lifecycle side effects.
//!
//! Trip status is derived from the document state, the odometer start and
//! the visited flags of the stops. The lifecycle hooks here return the writes
//! a transition implies for linked delivery notes, invoices and vehicles;
//! handlers apply them in the same transaction as the trip itself.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::defaults::PAYMENT_DUE_DAYS;
use crate::error::{PlanningError, PlanningResult};
use crate::services::map_embed::build_map_embed;
use crate::types::{
    DeliveryNoteStatus, DeliveryNoteStatusChange, DeliveryNoteUpdate, DocStatus, DueDateUpdate,
    InvoiceStatus, StopNoteRef, Trip, TripStatus,
};

/// Status implied by the trip's current state.
///
/// Once a submitted trip has started (odometer start recorded): all stops
/// visited -> Completed; a manual Paused stays Paused; Completed is never
/// downgraded; otherwise In Transit.
pub fn derive_status(trip: &Trip) -> TripStatus {
    let base = match trip.docstatus {
        DocStatus::Draft => TripStatus::Draft,
        DocStatus::Submitted => TripStatus::Scheduled,
        DocStatus::Cancelled => TripStatus::Cancelled,
    };

    if trip.docstatus != DocStatus::Submitted || trip.odometer_start_time.is_none() {
        return base;
    }

    if trip.delivery_stops.iter().all(|s| s.visited) {
        TripStatus::Completed
    } else if trip.status == TripStatus::Paused {
        TripStatus::Paused
    } else if trip.status == TripStatus::Completed {
        TripStatus::Completed
    } else {
        TripStatus::InTransit
    }
}

/// Recompute derived trip fields before a save
pub fn refresh(trip: &mut Trip) {
    trip.package_total = trip.delivery_stops.iter().map(|s| s.grand_total).sum();
    trip.status = derive_status(trip);
}

/// Linked records consulted when a trip is saved
#[derive(Debug, Clone, Default)]
pub struct LinkedRecords {
    /// Address id -> display string
    pub address_displays: HashMap<String, String>,
    /// Delivery note -> the one sales invoice billed against it
    pub note_invoices: HashMap<String, String>,
}

/// Save-time validation.
///
/// Fills missing stop addresses from their address record, links each
/// delivery note's invoice, recomputes totals and status and regenerates
/// the map embed when `map_key` is given.
pub fn validate(trip: &mut Trip, linked: &LinkedRecords, map_key: Option<&str>) {
    for stop in trip.delivery_stops.iter_mut() {
        if stop.customer_address.as_deref().map_or(true, |a| a.trim().is_empty()) {
            if let Some(display) = stop.address.as_ref().and_then(|id| linked.address_displays.get(id)) {
                stop.customer_address = Some(display.clone());
            }
        }

        if let Some(invoice) = stop.delivery_note.as_ref().and_then(|n| linked.note_invoices.get(n)) {
            stop.sales_invoice = Some(invoice.clone());
        }
    }

    refresh(trip);

    if map_key.is_some() {
        trip.map_embed = build_map_embed(trip, map_key);
    }
}

/// Draft -> Submitted; returns the driver metadata to push to delivery notes
pub fn submit(trip: &mut Trip) -> PlanningResult<Vec<DeliveryNoteUpdate>> {
    if trip.docstatus != DocStatus::Draft {
        return Err(PlanningError::InvalidTransition {
            action: "submit".to_string(),
            state: trip.docstatus.as_str().to_string(),
        });
    }

    trip.docstatus = DocStatus::Submitted;
    refresh(trip);
    Ok(delivery_note_updates(trip, false))
}

/// Submitted -> Cancelled; returns updates clearing driver metadata
pub fn cancel(trip: &mut Trip) -> PlanningResult<Vec<DeliveryNoteUpdate>> {
    if trip.docstatus != DocStatus::Submitted {
        return Err(PlanningError::InvalidTransition {
            action: "cancel".to_string(),
            state: trip.docstatus.as_str().to_string(),
        });
    }

    trip.docstatus = DocStatus::Cancelled;
    refresh(trip);
    Ok(delivery_note_updates(trip, true))
}

/// One update per distinct delivery note; `clear` empties the driver fields
/// and resets delivery. Estimated arrival is always pushed.
pub fn delivery_note_updates(trip: &Trip, clear: bool) -> Vec<DeliveryNoteUpdate> {
    let mut updates: Vec<DeliveryNoteUpdate> = Vec::new();

    for stop in &trip.delivery_stops {
        let Some(note) = stop.delivery_note.as_deref() else {
            continue;
        };
        if updates.iter().any(|u| u.delivery_note == note) {
            continue;
        }

        let keep = |value: Option<String>| if clear { None } else { value };
        updates.push(DeliveryNoteUpdate {
            delivery_note: note.to_string(),
            driver: keep(trip.driver.clone()),
            driver_name: keep(trip.driver_name.clone()),
            vehicle_no: keep(trip.vehicle.clone()),
            lr_no: keep(Some(trip.name.clone())),
            lr_date: if clear { None } else { Some(trip.departure_time) },
            estimated_arrival: stop.estimated_arrival,
            reset_delivery: clear,
        });
    }

    updates
}

/// Writes implied by saving a submitted trip
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AfterSubmitEffects {
    pub note_changes: Vec<DeliveryNoteStatusChange>,
    pub due_dates: Vec<DueDateUpdate>,
    /// (vehicle, last odometer value)
    pub vehicle_odometer: Option<(String, f64)>,
}

/// Linked-document effects of saving a submitted trip.
///
/// `invoice_status` resolves the payment status of a stop's sales invoice.
pub fn after_submit_effects<F>(trip: &Trip, invoice_status: F, today: NaiveDate) -> AfterSubmitEffects
where
    F: Fn(&str) -> Option<InvoiceStatus>,
{
    let mut effects = AfterSubmitEffects::default();

    for stop in &trip.delivery_stops {
        if let Some(note) = stop.delivery_note.as_deref() {
            let change = if stop.visited {
                let status = stop
                    .sales_invoice
                    .as_deref()
                    .and_then(&invoice_status)
                    .and_then(|s| match s {
                        InvoiceStatus::Unpaid => Some(DeliveryNoteStatus::Delivered),
                        InvoiceStatus::Paid => Some(DeliveryNoteStatus::Completed),
                        InvoiceStatus::Other => None,
                    });
                DeliveryNoteStatusChange {
                    delivery_note: note.to_string(),
                    status,
                    delivered: Some(true),
                }
            } else {
                let status = if trip.status == TripStatus::InTransit {
                    DeliveryNoteStatus::InTransit
                } else {
                    DeliveryNoteStatus::ToDeliver
                };
                DeliveryNoteStatusChange {
                    delivery_note: note.to_string(),
                    status: Some(status),
                    delivered: None,
                }
            };
            effects.note_changes.push(change);
        }

        if let Some(invoice) = stop.sales_invoice.as_deref() {
            let underpaid = (stop.paid_amount - stop.grand_total).abs() > f64::EPSILON;
            if stop.visited && underpaid {
                effects.due_dates.push(DueDateUpdate {
                    sales_invoice: invoice.to_string(),
                    due_date: today + Duration::days(PAYMENT_DUE_DAYS),
                });
            }
        }
    }

    if trip.actual_distance_travelled.is_some_and(|d| d != 0.0) {
        if let (Some(vehicle), Some(odometer)) = (trip.vehicle.as_ref(), trip.odometer_end_value) {
            effects.vehicle_odometer = Some((vehicle.clone(), odometer));
        }
    }

    effects
}

/// Mark stops billed on `sales_invoice` visited and paid.
///
/// Returns the delivery note completions to write; the trip status is
/// recomputed afterwards.
pub fn record_stop_payment(
    trip: &mut Trip,
    sales_invoice: &str,
    payment_amount: f64,
) -> Vec<DeliveryNoteStatusChange> {
    let mut changes = Vec::new();
    if !trip.is_submitted() {
        return changes;
    }

    for stop in trip.delivery_stops.iter_mut() {
        if stop.sales_invoice.as_deref() != Some(sales_invoice) {
            continue;
        }
        stop.paid_amount = payment_amount;
        stop.visited = true;
        if let Some(note) = stop.delivery_note.as_deref() {
            changes.push(DeliveryNoteStatusChange {
                delivery_note: note.to_string(),
                status: Some(DeliveryNoteStatus::Completed),
                delivered: None,
            });
        }
    }

    refresh(trip);
    changes
}

/// Distinct delivery notes referenced by a stop list
pub fn referenced_delivery_notes(stops: &[StopNoteRef]) -> Vec<String> {
    let mut notes: Vec<String> = Vec::new();
    for note in stops.iter().filter_map(|s| s.delivery_note.as_deref()) {
        if !note.is_empty() && !notes.iter().any(|n| n == note) {
            notes.push(note.to_string());
        }
    }
    notes
}
