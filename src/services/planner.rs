//! Route planning for a delivery trip.
//!
//! `plan_route` is the `process_route` operation without persistence: it
//! segments the trip around locks, asks the directions provider for every
//! leg, applies the returned waypoint order and annotates stops with distance
//! and arrival estimates. It works on a copy of the trip and returns it; the
//! caller saves the result in one transaction.
//!
//! A leg the provider cannot route is recorded in `failed_legs`, its stops
//! lose their previous estimate and planning carries on with the next leg.
//! Contract violations in provider data (a waypoint order or leg count that
//! does not fit the segment) abort the whole plan.

use tracing::{debug, info, warn};

use crate::error::PlanningResult;
use crate::services::arrival::{estimate_leg, EstimateSettings};
use crate::services::reorder::rearrange_stops;
use crate::services::routing::DirectionsService;
use crate::services::segments::{form_route_list, RouteLeg};
use crate::types::{DeliveryStop, DirectionsRequest, LegFailure, Trip};

/// Planned trip plus the legs that could not be routed
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub trip: Trip,
    pub failed_legs: Vec<LegFailure>,
}

fn leg_failure(trip: &mut Trip, leg_index: usize, leg: &RouteLeg, message: String) -> LegFailure {
    let stops = &mut trip.delivery_stops[leg.segment.range()];
    for stop in stops.iter_mut() {
        stop.clear_estimate();
    }
    LegFailure {
        leg_index,
        stop_indices: stops.iter().map(|s| s.idx).collect(),
        message,
    }
}

/// Estimate arrival times for every stop, optimizing the order first if asked.
pub async fn plan_route(
    trip: &Trip,
    optimize: bool,
    directions: &dyn DirectionsService,
    settings: &EstimateSettings,
) -> PlanningResult<RoutePlan> {
    let route_list = form_route_list(&trip.delivery_stops, trip.driver_address.as_deref(), optimize)?;

    info!(
        "Planning trip {} with {} stops in {} legs via {} (optimize: {})",
        trip.name,
        trip.delivery_stops.len(),
        route_list.len(),
        directions.name(),
        optimize
    );

    let mut planned = trip.clone();
    let mut failed_legs = Vec::new();
    let mut departure = trip.departure_time;
    let mut total_distance_m = 0.0;

    for (leg_index, leg) in route_list.iter().enumerate() {
        let Some(request) = DirectionsRequest::from_addresses(&leg.addresses, optimize) else {
            continue;
        };

        let route = match directions.directions(&request).await {
            Ok(Some(route)) => route,
            Ok(None) => {
                warn!("No directions for leg {} of trip {}", leg_index, trip.name);
                failed_legs.push(leg_failure(&mut planned, leg_index, leg, "no route found".to_string()));
                continue;
            }
            Err(e) => {
                warn!("Directions failed for leg {} of trip {}: {}", leg_index, trip.name, e);
                failed_legs.push(leg_failure(&mut planned, leg_index, leg, e.to_string()));
                continue;
            }
        };

        if optimize && !route.waypoint_order.is_empty() {
            debug!("Leg {} waypoint order: {:?}", leg_index, route.waypoint_order);
            rearrange_stops(&mut planned.delivery_stops, &route.waypoint_order, &leg.segment)?;
        }

        let estimate = estimate_leg(
            &mut planned.delivery_stops,
            &leg.segment,
            &route.legs,
            leg.returns_to_depot,
            departure,
            settings,
        )?;

        departure = estimate.next_departure;
        total_distance_m += estimate.total_distance_m;
    }

    if !route_list.is_empty() {
        planned.total_distance = Some(total_distance_m * settings.conversion_factor);
        planned.uom = Some(settings.distance_unit.clone());
    }

    Ok(RoutePlan {
        trip: planned,
        failed_legs,
    })
}

/// Copy route outputs of `planned` onto the freshly locked `current` trip.
///
/// Only stop order, distance, unit, arrival estimate and coordinates plus the
/// trip total move over; everything else keeps the locked row's values.
/// Stops added since planning go last without an estimate, stops removed
/// since planning stay removed.
pub fn apply_plan(current: &mut Trip, planned: &Trip) {
    let mut remaining: Vec<DeliveryStop> = std::mem::take(&mut current.delivery_stops);
    let mut ordered = Vec::with_capacity(remaining.len());

    for planned_stop in &planned.delivery_stops {
        let Some(pos) = remaining.iter().position(|s| s.id == planned_stop.id) else {
            continue;
        };
        let mut stop = remaining.remove(pos);
        stop.distance = planned_stop.distance;
        stop.uom = planned_stop.uom.clone();
        stop.estimated_arrival = planned_stop.estimated_arrival;
        stop.lat = planned_stop.lat;
        stop.lng = planned_stop.lng;
        ordered.push(stop);
    }

    if !remaining.is_empty() {
        debug!("Trip {}: {} stops added while planning", current.name, remaining.len());
    }
    ordered.extend(remaining);

    current.delivery_stops = ordered;
    current.renumber_stops();
    current.total_distance = planned.total_distance;
    current.uom = planned.uom.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::error::PlanningError;
    use crate::services::routing::{MockDirectionsService, MockReply};
    use crate::types::trip::fixtures::{departure, locked, stop, trip};
    use crate::types::{DirectionsLeg, DirectionsRoute};

    fn settings(delay_minutes: i64) -> EstimateSettings {
        EstimateSettings {
            stop_delay: Duration::minutes(delay_minutes),
            conversion_factor: 0.001,
            distance_unit: "Kilometer".to_string(),
        }
    }

    fn route(legs: &[(f64, f64)], order: Vec<usize>) -> MockReply {
        MockReply::Route(DirectionsRoute {
            legs: legs.iter().map(|&(d, t)| DirectionsLeg::new(d, t)).collect(),
            waypoint_order: order,
        })
    }

    fn names(trip: &Trip) -> Vec<String> {
        trip.delivery_stops.iter().map(|s| s.customer_address.clone().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_plan_two_legs_totals_and_etas() {
        // [A, L*] | [B] -> legs: depot->A, A->L | L->B, B->depot
        let trip = trip(vec![stop(1, "A"), locked(2, "L"), stop(3, "B")]);
        let service = MockDirectionsService::with_script(vec![
            route(&[(1000.0, 600.0), (2000.0, 1200.0)], vec![0]),
            route(&[(3000.0, 900.0), (4000.0, 300.0)], vec![0]),
        ]);

        let plan = plan_route(&trip, true, &service, &settings(10)).await.unwrap();
        let stops = &plan.trip.delivery_stops;

        assert!(plan.failed_legs.is_empty());
        assert_eq!(plan.trip.total_distance, Some(10.0));
        assert_eq!(plan.trip.uom.as_deref(), Some("Kilometer"));

        let delay = Duration::minutes(10);
        let a = departure() + Duration::seconds(600);
        let l = a + delay + Duration::seconds(1200);
        let b = l + delay + Duration::seconds(900);
        assert_eq!(stops[0].estimated_arrival, Some(a));
        assert_eq!(stops[1].estimated_arrival, Some(l));
        assert_eq!(stops[2].estimated_arrival, Some(b));
        assert_eq!(stops[2].distance, Some(3.0));
    }

    #[tokio::test]
    async fn test_plan_requests_follow_segments() {
        let trip = trip(vec![stop(1, "A"), locked(2, "L"), stop(3, "B"), stop(4, "C")]);
        let service = MockDirectionsService::new();

        plan_route(&trip, true, &service, &settings(0)).await.unwrap();

        let requests = service.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].waypoints, vec!["A".to_string()]);
        assert_eq!(requests[0].destination, "L");
        assert_eq!(requests[1].origin, "L");
        assert_eq!(requests[1].waypoints, vec!["B".to_string(), "C".to_string()]);
        assert!(requests.iter().all(|r| r.optimize_waypoints));
    }

    #[tokio::test]
    async fn test_plan_applies_waypoint_order_per_segment() {
        let trip = trip(vec![stop(1, "A"), stop(2, "B"), locked(3, "L"), stop(4, "C"), stop(5, "D")]);
        let service = MockDirectionsService::with_script(vec![
            route(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)], vec![1, 0]),
            route(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)], vec![1, 0]),
        ]);

        let plan = plan_route(&trip, true, &service, &settings(0)).await.unwrap();

        assert_eq!(names(&plan.trip), vec!["B", "A", "L", "D", "C"]);
        let idx: Vec<i32> = plan.trip.delivery_stops.iter().map(|s| s.idx).collect();
        assert_eq!(idx, vec![1, 2, 3, 4, 5]);
        // input trip untouched
        assert_eq!(names(&trip), vec!["A", "B", "L", "C", "D"]);
    }

    #[tokio::test]
    async fn test_plan_without_optimize_ignores_locks_and_order() {
        let trip = trip(vec![stop(1, "A"), locked(2, "L"), stop(3, "B")]);
        let service = MockDirectionsService::with_script(vec![route(
            &[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0), (1.0, 1.0)],
            vec![2, 1, 0],
        )]);

        let plan = plan_route(&trip, false, &service, &settings(0)).await.unwrap();

        assert_eq!(service.requests().len(), 1);
        assert_eq!(names(&plan.trip), vec!["A", "L", "B"]);
        assert!(plan.trip.delivery_stops.iter().all(|s| s.estimated_arrival.is_some()));
    }

    #[tokio::test]
    async fn test_plan_failed_leg_is_skipped() {
        let mut first = stop(1, "A");
        first.estimated_arrival = Some(departure());
        first.distance = Some(9.0);
        let trip = trip(vec![first, locked(2, "L"), stop(3, "B")]);
        let service = MockDirectionsService::with_script(vec![
            MockReply::Fail("OVER_QUERY_LIMIT".to_string()),
            route(&[(3000.0, 900.0), (4000.0, 300.0)], vec![0]),
        ]);

        let plan = plan_route(&trip, true, &service, &settings(0)).await.unwrap();
        let stops = &plan.trip.delivery_stops;

        assert_eq!(plan.failed_legs.len(), 1);
        assert_eq!(plan.failed_legs[0].leg_index, 0);
        assert_eq!(plan.failed_legs[0].stop_indices, vec![1, 2]);
        assert!(plan.failed_legs[0].message.contains("OVER_QUERY_LIMIT"));

        assert!(stops[0].estimated_arrival.is_none());
        assert!(stops[0].distance.is_none());
        assert!(stops[1].estimated_arrival.is_none());
        // cursor does not advance over the failed leg
        assert_eq!(stops[2].estimated_arrival, Some(departure() + Duration::seconds(900)));
        assert_eq!(plan.trip.total_distance, Some(7.0));
    }

    #[tokio::test]
    async fn test_plan_no_route_is_recorded() {
        let trip = trip(vec![stop(1, "A")]);
        let service = MockDirectionsService::with_script(vec![MockReply::NoRoute]);

        let plan = plan_route(&trip, false, &service, &settings(0)).await.unwrap();

        assert_eq!(plan.failed_legs.len(), 1);
        assert_eq!(plan.trip.total_distance, Some(0.0));
    }

    #[tokio::test]
    async fn test_plan_missing_driver_address_makes_no_calls() {
        let mut trip = trip(vec![stop(1, "A")]);
        trip.driver_address = None;
        let service = MockDirectionsService::new();

        let err = plan_route(&trip, true, &service, &settings(0)).await.unwrap_err();

        assert!(matches!(err, PlanningError::MissingDriverAddress));
        assert!(service.requests().is_empty());
    }

    #[tokio::test]
    async fn test_plan_bad_waypoint_order_aborts() {
        let trip = trip(vec![stop(1, "A"), stop(2, "B")]);
        let service = MockDirectionsService::with_script(vec![route(
            &[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)],
            vec![0, 1, 2],
        )]);

        let err = plan_route(&trip, true, &service, &settings(0)).await.unwrap_err();
        assert!(matches!(err, PlanningError::WaypointOrderMismatch { expected: 2, got: 3 }));
    }

    #[tokio::test]
    async fn test_plan_empty_trip_leaves_totals() {
        let trip = trip(vec![]);
        let service = MockDirectionsService::new();

        let plan = plan_route(&trip, true, &service, &settings(0)).await.unwrap();

        assert!(service.requests().is_empty());
        assert!(plan.trip.total_distance.is_none());
    }

    #[tokio::test]
    async fn test_apply_plan_keeps_concurrent_stop_changes() {
        let original = trip(vec![stop(1, "A"), stop(2, "B")]);
        let service = MockDirectionsService::with_script(vec![route(
            &[(1000.0, 60.0), (2000.0, 120.0), (3000.0, 180.0)],
            vec![1, 0],
        )]);
        let plan = plan_route(&original, true, &service, &settings(0)).await.unwrap();

        // a payment lands on stop A while the provider is being called
        let mut current = original.clone();
        current.delivery_stops[0].visited = true;
        current.delivery_stops[0].paid_amount = 50.0;

        apply_plan(&mut current, &plan.trip);

        assert_eq!(names(&current), vec!["B", "A"]);
        let a = &current.delivery_stops[1];
        assert!(a.visited);
        assert_eq!(a.paid_amount, 50.0);
        assert_eq!(a.idx, 2);
        assert_eq!(a.estimated_arrival, plan.trip.delivery_stops[1].estimated_arrival);
        assert_eq!(a.distance, Some(2.0));
        assert_eq!(current.total_distance, Some(6.0));
        assert_eq!(current.uom.as_deref(), Some("Kilometer"));
    }

    #[test]
    fn test_apply_plan_handles_stops_added_and_removed() {
        let original = trip(vec![stop(1, "A"), stop(2, "B")]);
        let mut planned = original.clone();
        planned.delivery_stops.reverse();
        for s in planned.delivery_stops.iter_mut() {
            s.estimated_arrival = Some(departure());
        }

        let mut current = original.clone();
        current.delivery_stops.remove(0);
        current.delivery_stops.push(stop(3, "C"));

        apply_plan(&mut current, &planned);

        assert_eq!(names(&current), vec!["B", "C"]);
        let idx: Vec<i32> = current.delivery_stops.iter().map(|s| s.idx).collect();
        assert_eq!(idx, vec![1, 2]);
        assert!(current.delivery_stops[0].estimated_arrival.is_some());
        assert!(current.delivery_stops[1].estimated_arrival.is_none());
    }
}
