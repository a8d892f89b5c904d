//! Google Directions API client
//!
//! API documentation:
//! https://developers.google.com/maps/documentation/directions/get-directions

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::DirectionsService;
use crate::error::{PlanningError, PlanningResult};
use crate::types::{DirectionsLeg, DirectionsRequest, DirectionsRoute};

pub const DEFAULT_DIRECTIONS_BASE_URL: &str = "https://maps.googleapis.com";

/// Directions client configuration
#[derive(Debug, Clone)]
pub struct GoogleDirectionsConfig {
    pub api_key: String,
    /// Base URL of the provider (e.g., "https://maps.googleapis.com")
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl GoogleDirectionsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_DIRECTIONS_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Google-compatible directions client
pub struct GoogleDirectionsClient {
    client: Client,
    config: GoogleDirectionsConfig,
}

impl GoogleDirectionsClient {
    pub fn new(config: GoogleDirectionsConfig) -> PlanningResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PlanningError::Directions(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the request URL (API key included)
    pub fn build_url(&self, request: &DirectionsRequest) -> String {
        let mut url = format!(
            "{}/maps/api/directions/json?origin={}&destination={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&request.origin),
            urlencoding::encode(&request.destination),
        );

        if !request.waypoints.is_empty() {
            let mut waypoints: Vec<String> = Vec::with_capacity(request.waypoints.len() + 1);
            if request.optimize_waypoints {
                waypoints.push("optimize:true".to_string());
            }
            waypoints.extend(request.waypoints.iter().cloned());
            url.push_str("&waypoints=");
            url.push_str(&urlencoding::encode(&waypoints.join("|")));
        }

        url.push_str("&key=");
        url.push_str(&urlencoding::encode(&self.config.api_key));
        url
    }
}

#[async_trait]
impl DirectionsService for GoogleDirectionsClient {
    async fn directions(&self, request: &DirectionsRequest) -> PlanningResult<Option<DirectionsRoute>> {
        let url = self.build_url(request);

        debug!(
            "Requesting directions for {} waypoints (optimize: {})",
            request.waypoints.len(),
            request.optimize_waypoints
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PlanningError::Directions(format!("failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PlanningError::Directions(format!(
                "provider returned HTTP {}: {}",
                status, body
            )));
        }

        let body: DirectionsResponse = response
            .json()
            .await
            .map_err(|e| PlanningError::Directions(format!("failed to parse response: {}", e)))?;

        body.into_route(request.optimize_waypoints)
    }

    fn name(&self) -> &str {
        "GoogleDirections"
    }
}

// Provider API types

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<ProviderRoute>,
}

#[derive(Debug, Deserialize)]
struct ProviderRoute {
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
    #[serde(default)]
    waypoint_order: Vec<usize>,
}

impl DirectionsResponse {
    fn into_route(self, optimize_waypoints: bool) -> PlanningResult<Option<DirectionsRoute>> {
        match self.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" | "NOT_FOUND" => {
                warn!("Directions provider found no route ({})", self.status);
                return Ok(None);
            }
            other => {
                let message = match self.error_message {
                    Some(detail) => format!("{}: {}", other, detail),
                    None => other.to_string(),
                };
                return Err(PlanningError::Directions(message));
            }
        }

        // Only the first (preferred) route is used
        let Some(route) = self.routes.into_iter().next() else {
            return Ok(None);
        };

        let route = DirectionsRoute {
            legs: route.legs,
            waypoint_order: if optimize_waypoints { route.waypoint_order } else { vec![] },
        };
        debug!("Directions: {} legs, {} m", route.legs.len(), route.total_distance_m());
        Ok(Some(route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleDirectionsClient {
        GoogleDirectionsClient::new(GoogleDirectionsConfig::new("secret key")).unwrap()
    }

    fn request(waypoints: &[&str], optimize: bool) -> DirectionsRequest {
        DirectionsRequest {
            origin: "1 Depot Rd, Springfield".to_string(),
            destination: "1 Depot Rd, Springfield".to_string(),
            waypoints: waypoints.iter().map(|s| s.to_string()).collect(),
            optimize_waypoints: optimize,
        }
    }

    #[test]
    fn test_config_default_base_url() {
        let config = GoogleDirectionsConfig::new("k");
        assert_eq!(config.base_url, "https://maps.googleapis.com");
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_build_url_encodes_addresses_and_key() {
        let url = client().build_url(&request(&[], false));
        assert_eq!(
            url,
            "https://maps.googleapis.com/maps/api/directions/json\
             ?origin=1%20Depot%20Rd%2C%20Springfield\
             &destination=1%20Depot%20Rd%2C%20Springfield\
             &key=secret%20key"
        );
    }

    #[test]
    fn test_build_url_optimize_prefix() {
        let url = client().build_url(&request(&["A", "B"], true));
        assert!(url.contains("&waypoints=optimize%3Atrue%7CA%7CB&"), "{}", url);

        let url = client().build_url(&request(&["A", "B"], false));
        assert!(url.contains("&waypoints=A%7CB&"), "{}", url);
    }

    #[test]
    fn test_response_ok_takes_first_route() {
        let json = r#"{
            "status": "OK",
            "routes": [{
                "legs": [
                    {"distance": {"value": 1000}, "duration": {"value": 100}, "end_location": {"lat": 1.0, "lng": 2.0}},
                    {"distance": {"value": 2000}, "duration": {"value": 200}, "end_location": {"lat": 3.0, "lng": 4.0}}
                ],
                "waypoint_order": [0]
            }, {"legs": []}]
        }"#;
        let response: DirectionsResponse = serde_json::from_str(json).unwrap();
        let route = response.into_route(true).unwrap().unwrap();
        assert_eq!(route.legs.len(), 2);
        assert_eq!(route.waypoint_order, vec![0]);
    }

    #[test]
    fn test_response_drops_order_when_not_optimizing() {
        let json = r#"{"status": "OK", "routes": [{"legs": [], "waypoint_order": [1, 0]}]}"#;
        let response: DirectionsResponse = serde_json::from_str(json).unwrap();
        let route = response.into_route(false).unwrap().unwrap();
        assert!(route.waypoint_order.is_empty());
    }

    #[test]
    fn test_response_zero_results_is_no_route() {
        let response: DirectionsResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "routes": []}"#).unwrap();
        assert!(response.into_route(false).unwrap().is_none());
    }

    #[test]
    fn test_response_error_status_fails() {
        let response: DirectionsResponse = serde_json::from_str(
            r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#,
        )
        .unwrap();
        let err = response.into_route(false).unwrap_err();
        assert!(matches!(err, PlanningError::Directions(ref m) if m.starts_with("REQUEST_DENIED")));
    }

    #[tokio::test]
    #[ignore = "Requires a directions API key"]
    async fn test_google_directions_integration() {
        let key = std::env::var("DIRECTIONS_API_KEY").unwrap();
        let client = GoogleDirectionsClient::new(GoogleDirectionsConfig::new(key)).unwrap();
        let request = DirectionsRequest {
            origin: "Prague".to_string(),
            destination: "Prague".to_string(),
            waypoints: vec!["Brno".to_string(), "Olomouc".to_string()],
            optimize_waypoints: true,
        };

        let route = client.directions(&request).await.unwrap().unwrap();
        assert_eq!(route.legs.len(), 3);
        assert_eq!(route.waypoint_order.len(), 2);
    }
}
