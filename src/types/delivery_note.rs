//! Linked document types (delivery notes, sales invoices)
//!
//! Only the fields the trip worker reads or writes are modelled.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Delivery note status label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "delivery_note_status")]
pub enum DeliveryNoteStatus {
    #[serde(rename = "To Deliver")]
    #[sqlx(rename = "To Deliver")]
    ToDeliver,
    #[serde(rename = "In Transit")]
    #[sqlx(rename = "In Transit")]
    InTransit,
    Delivered,
    Completed,
}

impl DeliveryNoteStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            DeliveryNoteStatus::ToDeliver => "To Deliver",
            DeliveryNoteStatus::InTransit => "In Transit",
            DeliveryNoteStatus::Delivered => "Delivered",
            DeliveryNoteStatus::Completed => "Completed",
        }
    }
}

/// Sales invoice payment status as far as delivery is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Other,
}

impl InvoiceStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "Unpaid" => InvoiceStatus::Unpaid,
            "Paid" => InvoiceStatus::Paid,
            _ => InvoiceStatus::Other,
        }
    }
}

/// Trip metadata pushed to a delivery note on submit / cancel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryNoteUpdate {
    pub delivery_note: String,
    pub driver: Option<String>,
    pub driver_name: Option<String>,
    pub vehicle_no: Option<String>,
    /// Transport reference (trip name)
    pub lr_no: Option<String>,
    pub lr_date: Option<NaiveDateTime>,
    pub estimated_arrival: Option<NaiveDateTime>,
    /// Set only on cancel
    pub reset_delivery: bool,
}

/// A status write against one delivery note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryNoteStatusChange {
    pub delivery_note: String,
    pub status: Option<DeliveryNoteStatus>,
    /// `Some(true)` marks the note delivered
    pub delivered: Option<bool>,
}

/// Payment captured at a stop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPaymentRequest {
    pub sales_invoice: String,
    pub payment_amount: f64,
}

/// Trips touched by a stop payment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPaymentResponse {
    pub updated_trips: Vec<String>,
}

/// Invoice whose due date must be pushed out after a partial payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueDateUpdate {
    pub sales_invoice: String,
    pub due_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_status_labels() {
        assert_eq!(DeliveryNoteStatus::ToDeliver.as_str(), "To Deliver");
        let json = serde_json::to_string(&DeliveryNoteStatus::Completed).unwrap();
        assert_eq!(json, "\"Completed\"");
    }

    #[test]
    fn test_invoice_status_from_str() {
        assert_eq!(InvoiceStatus::from_str("Paid"), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::from_str("Unpaid"), InvoiceStatus::Unpaid);
        assert_eq!(InvoiceStatus::from_str("Overdue"), InvoiceStatus::Other);
    }
}
