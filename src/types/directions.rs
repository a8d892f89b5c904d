//! Directions provider request/response types

use serde::{Deserialize, Serialize};

/// One routing call: origin -> waypoints -> destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionsRequest {
    pub origin: String,
    pub destination: String,
    pub waypoints: Vec<String>,
    pub optimize_waypoints: bool,
}

impl DirectionsRequest {
    /// Build from an address sequence (origin, waypoints.., destination)
    pub fn from_addresses(addresses: &[String], optimize_waypoints: bool) -> Option<Self> {
        if addresses.len() < 2 {
            return None;
        }
        Some(Self {
            origin: addresses[0].clone(),
            destination: addresses[addresses.len() - 1].clone(),
            waypoints: addresses[1..addresses.len() - 1].to_vec(),
            optimize_waypoints,
        })
    }
}

/// A provider value with its unit-less numeric component
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderValue {
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// One origin->stop hop within a route ("leg" in provider terms)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsLeg {
    /// Meters
    #[serde(default)]
    pub distance: ProviderValue,
    /// Seconds
    #[serde(default)]
    pub duration: ProviderValue,
    pub end_location: Option<LatLng>,
}

impl DirectionsLeg {
    pub fn new(distance_m: f64, duration_s: f64) -> Self {
        Self {
            distance: ProviderValue { value: distance_m },
            duration: ProviderValue { value: duration_s },
            end_location: None,
        }
    }

    pub fn with_end_location(mut self, lat: f64, lng: f64) -> Self {
        self.end_location = Some(LatLng { lat, lng });
        self
    }
}

/// Directions for one request, legs already in travel order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRoute {
    pub legs: Vec<DirectionsLeg>,
    /// Permutation of waypoint indices; present only when optimizing
    #[serde(default)]
    pub waypoint_order: Vec<usize>,
}

impl DirectionsRoute {
    /// Total distance of all legs in meters
    pub fn total_distance_m(&self) -> f64 {
        self.legs.iter().map(|l| l.distance.value).sum()
    }
}
