//! Delivery settings types

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    default_delivery_end, default_delivery_start, DEFAULT_ACTIVITY_TYPE, DEFAULT_DISTANCE_UNIT,
    DEFAULT_STOP_DELAY_MINUTES,
};

/// Site-wide delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySettings {
    /// Fixed dwell time added after every stop
    pub stop_delay_minutes: i64,
    /// Display unit for distances ("Kilometer", "Mile", ...)
    pub default_distance_unit: String,
    /// Used when a route request does not say
    pub optimize_default: bool,
    /// Activity type of driver time logs
    pub default_activity_type: Option<String>,
    pub delivery_start_time: NaiveTime,
    pub delivery_end_time: NaiveTime,
    /// Generate a map embed on every trip save
    pub maps_enabled: bool,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            stop_delay_minutes: DEFAULT_STOP_DELAY_MINUTES,
            default_distance_unit: DEFAULT_DISTANCE_UNIT.to_string(),
            optimize_default: false,
            default_activity_type: Some(DEFAULT_ACTIVITY_TYPE.to_string()),
            delivery_start_time: default_delivery_start(),
            delivery_end_time: default_delivery_end(),
            maps_enabled: false,
        }
    }
}

/// Transaction document types that carry their own delivery window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowDocumentType {
    #[serde(rename = "Delivery Note")]
    DeliveryNote,
    #[serde(rename = "Sales Invoice")]
    SalesInvoice,
}

/// Reference to a transaction document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub doctype: WindowDocumentType,
    pub name: String,
}

/// Delivery window lookup request
///
/// The document's window wins over the customer's.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryWindowRequest {
    #[serde(default)]
    pub document: Option<DocumentRef>,
    #[serde(default)]
    pub customer: Option<String>,
}

/// Delivery window for a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryWindow {
    pub delivery_start_time: NaiveTime,
    pub delivery_end_time: NaiveTime,
    /// True if the global defaults were used
    pub default_window: bool,
}
