//! Arrival and distance estimation for one route leg.
//!
//! Walks the provider legs of a routed segment in travel order (already the
//! optimized order, if any) and annotates each stop with its distance from the
//! previous stop, coordinates and estimated arrival. The departure cursor
//! advances by each hop's duration plus the fixed stop delay.

use chrono::{Duration, NaiveDateTime};

use crate::error::{PlanningError, PlanningResult};
use crate::services::segments::Segment;
use crate::types::{DeliveryStop, DirectionsLeg};

/// Estimation parameters
#[derive(Debug, Clone)]
pub struct EstimateSettings {
    /// Dwell time after every stop
    pub stop_delay: Duration,
    /// Provider meters -> display unit
    pub conversion_factor: f64,
    pub distance_unit: String,
}

/// Outcome of estimating one leg
#[derive(Debug, Clone, PartialEq)]
pub struct LegEstimate {
    /// Cursor after the last stop of the segment (delay included)
    pub next_departure: NaiveDateTime,
    /// All provider legs including the depot return, in meters
    pub total_distance_m: f64,
}

fn seconds(value: f64) -> Duration {
    Duration::seconds(value.max(0.0).round() as i64)
}

/// Annotate the stops of `segment` from the provider legs.
///
/// When the leg returns to the depot its final provider leg is the trip home
/// and is not assigned to a stop; it still counts towards the total distance.
pub fn estimate_leg(
    stops: &mut [DeliveryStop],
    segment: &Segment,
    legs: &[DirectionsLeg],
    returns_to_depot: bool,
    departure: NaiveDateTime,
    settings: &EstimateSettings,
) -> PlanningResult<LegEstimate> {
    let stop_legs = if returns_to_depot {
        &legs[..legs.len().saturating_sub(1)]
    } else {
        legs
    };

    if stop_legs.len() != segment.len || segment.end() > stops.len() {
        return Err(PlanningError::LegStopMismatch {
            legs: stop_legs.len(),
            stops: segment.len,
        });
    }

    let mut cursor = departure;
    for (stop, leg) in stops[segment.range()].iter_mut().zip(stop_legs) {
        if let Some(location) = leg.end_location {
            stop.lat = Some(location.lat);
            stop.lng = Some(location.lng);
        }
        stop.uom = Some(settings.distance_unit.clone());
        stop.distance = Some(leg.distance.value * settings.conversion_factor);

        let arrival = cursor + seconds(leg.duration.value);
        stop.estimated_arrival = Some(arrival);
        cursor = arrival + settings.stop_delay;
    }

    Ok(LegEstimate {
        next_departure: cursor,
        total_distance_m: legs.iter().map(|l| l.distance.value).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::trip::fixtures::{departure, locked, stop};

    fn km_settings(delay_minutes: i64) -> EstimateSettings {
        EstimateSettings {
            stop_delay: Duration::minutes(delay_minutes),
            conversion_factor: 0.001,
            distance_unit: "Kilometer".to_string(),
        }
    }

    #[test]
    fn test_estimate_leg_assigns_distance_and_eta() {
        let mut stops = vec![stop(1, "A"), stop(2, "B")];
        let segment = Segment { start: 0, len: 2, closes_on_lock: false };
        let legs = vec![
            DirectionsLeg::new(1500.0, 600.0).with_end_location(50.0, 14.0),
            DirectionsLeg::new(2500.0, 1200.0).with_end_location(50.1, 14.1),
            DirectionsLeg::new(4000.0, 900.0),
        ];

        let estimate = estimate_leg(&mut stops, &segment, &legs, true, departure(), &km_settings(5)).unwrap();

        assert_eq!(stops[0].distance, Some(1.5));
        assert_eq!(stops[0].uom.as_deref(), Some("Kilometer"));
        assert_eq!(stops[0].lat, Some(50.0));
        assert_eq!(stops[0].estimated_arrival, Some(departure() + Duration::seconds(600)));
        // 600s + 5min delay + 1200s
        assert_eq!(
            stops[1].estimated_arrival,
            Some(departure() + Duration::seconds(600 + 300 + 1200))
        );
        assert_eq!(stops[1].distance, Some(2.5));
        assert_eq!(estimate.total_distance_m, 8000.0);
        assert_eq!(estimate.next_departure, departure() + Duration::seconds(600 + 300 + 1200 + 300));
    }

    #[test]
    fn test_estimate_leg_closing_on_lock_uses_every_leg() {
        let mut stops = vec![stop(1, "A"), locked(2, "L"), stop(3, "C")];
        let segment = Segment { start: 0, len: 2, closes_on_lock: true };
        let legs = vec![DirectionsLeg::new(100.0, 60.0), DirectionsLeg::new(200.0, 60.0)];

        estimate_leg(&mut stops, &segment, &legs, false, departure(), &km_settings(0)).unwrap();

        assert!(stops[1].estimated_arrival.is_some());
        assert!(stops[2].estimated_arrival.is_none());
    }

    #[test]
    fn test_estimate_leg_etas_non_decreasing() {
        let mut stops: Vec<_> = (1..=5).map(|i| stop(i, "X")).collect();
        let segment = Segment { start: 0, len: 5, closes_on_lock: false };
        let legs: Vec<_> = [0.0, 30.0, 0.0, 3600.0, 15.0, 120.0]
            .iter()
            .map(|&d| DirectionsLeg::new(10.0, d))
            .collect();

        estimate_leg(&mut stops, &segment, &legs, true, departure(), &km_settings(0)).unwrap();

        let etas: Vec<_> = stops.iter().map(|s| s.estimated_arrival.unwrap()).collect();
        assert!(etas.windows(2).all(|w| w[0] <= w[1]), "{:?}", etas);
    }

    #[test]
    fn test_estimate_leg_count_mismatch_fails() {
        let mut stops = vec![stop(1, "A"), stop(2, "B")];
        let segment = Segment { start: 0, len: 2, closes_on_lock: false };
        let legs = vec![DirectionsLeg::new(1.0, 1.0), DirectionsLeg::new(1.0, 1.0)];

        let err = estimate_leg(&mut stops, &segment, &legs, true, departure(), &km_settings(0)).unwrap_err();
        assert!(matches!(err, PlanningError::LegStopMismatch { legs: 1, stops: 2 }));
        assert!(stops.iter().all(|s| s.estimated_arrival.is_none()));
    }
}
