//! Directions service for route legs
//!
//! Uses a Google-compatible directions API in production, mock for tests.

mod google;

pub use google::{GoogleDirectionsClient, GoogleDirectionsConfig, DEFAULT_DIRECTIONS_BASE_URL};

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{PlanningError, PlanningResult};
use crate::types::{DirectionsLeg, DirectionsRequest, DirectionsRoute};

/// Directions service trait for abstraction (Google, mock, etc.)
#[async_trait]
pub trait DirectionsService: Send + Sync {
    /// Route origin -> waypoints -> destination.
    ///
    /// `Ok(None)` means the provider found no route. Transport and provider
    /// errors are returned as `PlanningError::Directions`.
    async fn directions(&self, request: &DirectionsRequest) -> PlanningResult<Option<DirectionsRoute>>;

    /// Get service name for logging
    fn name(&self) -> &str;
}

/// Scripted mock response
#[derive(Debug, Clone)]
pub enum MockReply {
    Route(DirectionsRoute),
    NoRoute,
    Fail(String),
}

/// Mock directions service for tests
///
/// Replies are consumed in order; once the script runs out every request gets
/// a uniform route of `leg_distance_m` / `leg_duration_s` per hop in the
/// original waypoint order.
pub struct MockDirectionsService {
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<DirectionsRequest>>,
    leg_distance_m: f64,
    leg_duration_s: f64,
}

impl Default for MockDirectionsService {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            leg_distance_m: 1000.0,
            leg_duration_s: 600.0,
        }
    }
}

impl MockDirectionsService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uniform_legs(leg_distance_m: f64, leg_duration_s: f64) -> Self {
        Self {
            leg_distance_m,
            leg_duration_s,
            ..Default::default()
        }
    }

    pub fn with_script(replies: Vec<MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<DirectionsRequest> {
        self.requests.lock().clone()
    }

    fn uniform_route(&self, request: &DirectionsRequest) -> DirectionsRoute {
        let hops = request.waypoints.len() + 1;
        DirectionsRoute {
            legs: (0..hops)
                .map(|_| DirectionsLeg::new(self.leg_distance_m, self.leg_duration_s))
                .collect(),
            waypoint_order: if request.optimize_waypoints {
                (0..request.waypoints.len()).collect()
            } else {
                vec![]
            },
        }
    }
}

#[async_trait]
impl DirectionsService for MockDirectionsService {
    async fn directions(&self, request: &DirectionsRequest) -> PlanningResult<Option<DirectionsRoute>> {
        self.requests.lock().push(request.clone());

        let reply = self.script.lock().pop_front();
        match reply {
            Some(MockReply::Route(route)) => Ok(Some(route)),
            Some(MockReply::NoRoute) => Ok(None),
            Some(MockReply::Fail(message)) => Err(PlanningError::Directions(message)),
            None => Ok(Some(self.uniform_route(request))),
        }
    }

    fn name(&self) -> &str {
        "MockDirections"
    }
}

/// Create the directions service from configuration.
///
/// A missing API key is a precondition error: route planning cannot start.
pub fn create_directions_service(
    api_key: Option<&str>,
    base_url: &str,
    timeout_seconds: u64,
) -> PlanningResult<Box<dyn DirectionsService>> {
    match api_key {
        Some(key) if !key.trim().is_empty() => {
            let config = GoogleDirectionsConfig {
                api_key: key.to_string(),
                base_url: base_url.to_string(),
                timeout_seconds,
            };
            Ok(Box::new(GoogleDirectionsClient::new(config)?))
        }
        _ => Err(PlanningError::MissingApiKey),
    }
}
