//! Map embed URL for a trip's planned route

use crate::services::segments::form_route_list;
use crate::types::Trip;

const EMBED_BASE_URL: &str = "https://www.google.com/maps/embed/v1/directions";

/// Embed URL of the non-optimised route (depot -> stops in order -> depot).
///
/// `None` when there is nothing to show: no key, no driver address, no stops,
/// or a stop without an address.
pub fn build_map_embed(trip: &Trip, api_key: Option<&str>) -> Option<String> {
    let key = api_key.filter(|k| !k.trim().is_empty())?;
    if trip.delivery_stops.is_empty() {
        return None;
    }

    let route_list = form_route_list(&trip.delivery_stops, trip.driver_address.as_deref(), false).ok()?;
    let addresses = &route_list.first()?.addresses;
    let (origin, rest) = addresses.split_first()?;
    let (destination, waypoints) = rest.split_last()?;

    let mut url = format!(
        "{}?key={}&origin={}&destination={}",
        EMBED_BASE_URL,
        urlencoding::encode(key),
        urlencoding::encode(origin),
        urlencoding::encode(destination),
    );
    if !waypoints.is_empty() {
        url.push_str("&waypoints=");
        url.push_str(&urlencoding::encode(&waypoints.join("|")));
    }

    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::trip::fixtures::{locked, stop, trip};

    #[test]
    fn test_embed_url_lists_stops_in_order() {
        let t = trip(vec![stop(1, "A St"), locked(2, "B St"), stop(3, "C St")]);
        let url = build_map_embed(&t, Some("k3y")).unwrap();

        assert_eq!(
            url,
            "https://www.google.com/maps/embed/v1/directions?key=k3y\
             &origin=1%20Depot%20Rd%2C%20Springfield%2C%20IL\
             &destination=1%20Depot%20Rd%2C%20Springfield%2C%20IL\
             &waypoints=A%20St%7CB%20St%7CC%20St"
        );
    }

    #[test]
    fn test_embed_requires_key_and_driver_address() {
        let mut t = trip(vec![stop(1, "A")]);
        assert!(build_map_embed(&t, None).is_none());
        assert!(build_map_embed(&t, Some("  ")).is_none());

        t.driver_address = None;
        assert!(build_map_embed(&t, Some("k")).is_none());
    }

    #[test]
    fn test_embed_empty_trip() {
        let t = trip(vec![]);
        assert!(build_map_embed(&t, Some("k")).is_none());
    }

    #[test]
    fn test_embed_skips_trip_with_missing_stop_address() {
        let mut s = stop(1, "A");
        s.customer_address = None;
        assert!(build_map_embed(&trip(vec![s]), Some("k")).is_none());
    }
}
