//! Route segmentation around locked stops.
//!
//! A trip is sent to the directions provider as one or more route legs. Without
//! optimization there is a single depot -> stops -> depot leg. With
//! optimization every locked stop closes a leg and opens the next one, so the
//! provider can only reorder the stops between two locks.
//!
//! Each leg carries a [`Segment`]: the contiguous run of trip stops whose
//! arrival it estimates. The segment is the only index arithmetic the planner
//! needs; reordering and estimation both work through it.

use crate::error::{PlanningError, PlanningResult};
use crate::services::address::sanitize_address;
use crate::types::DeliveryStop;

/// Contiguous run of trip stops covered by one route leg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// 0-based index of the first stop of the run
    pub start: usize,
    /// Number of stops in the run
    pub len: usize,
    /// The run ends on a locked stop which is the leg's destination
    pub closes_on_lock: bool,
}

impl Segment {
    /// Stops the provider may reorder (everything but a closing lock)
    pub fn waypoint_count(&self) -> usize {
        if self.closes_on_lock {
            self.len.saturating_sub(1)
        } else {
            self.len
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }

    pub fn waypoint_range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.waypoint_count()
    }
}

/// One routing request worth of sanitized addresses
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLeg {
    /// Origin, waypoints, destination
    pub addresses: Vec<String>,
    pub segment: Segment,
    /// Destination is the depot, so the last provider leg is the trip home
    pub returns_to_depot: bool,
}

/// Build the ordered route legs of a trip.
///
/// Fails before any provider call if the depot or a stop address is missing.
pub fn form_route_list(
    stops: &[DeliveryStop],
    driver_address: Option<&str>,
    optimize: bool,
) -> PlanningResult<Vec<RouteLeg>> {
    let home = sanitize_address(driver_address).ok_or(PlanningError::MissingDriverAddress)?;

    let mut route_list = Vec::new();
    let mut leg = vec![home.clone()];
    let mut seg_start = 0usize;

    for (i, stop) in stops.iter().enumerate() {
        let address = sanitize_address(stop.customer_address.as_deref())
            .ok_or(PlanningError::MissingStopAddress { idx: stop.idx })?;
        leg.push(address.clone());

        if optimize && stop.lock {
            route_list.push(RouteLeg {
                addresses: std::mem::replace(&mut leg, vec![address]),
                segment: Segment {
                    start: seg_start,
                    len: i + 1 - seg_start,
                    closes_on_lock: true,
                },
                returns_to_depot: false,
            });
            seg_start = i + 1;
        }
    }

    // A lock on the final stop leaves nothing to route back from
    if leg.len() > 1 {
        leg.push(home);
        route_list.push(RouteLeg {
            addresses: leg,
            segment: Segment {
                start: seg_start,
                len: stops.len() - seg_start,
                closes_on_lock: false,
            },
            returns_to_depot: true,
        });
    }

    Ok(route_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::trip::fixtures::{locked, stop};

    const DEPOT: &str = "1 Depot Rd<br>Springfield<br>IL<br>62704";
    const HOME: &str = "1 Depot Rd, Springfield, IL";

    fn addresses(leg: &RouteLeg) -> Vec<&str> {
        leg.addresses.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_missing_driver_address_fails() {
        let stops = vec![stop(1, "A")];
        let err = form_route_list(&stops, None, false).unwrap_err();
        assert!(matches!(err, PlanningError::MissingDriverAddress));

        let err = form_route_list(&stops, Some("  "), false).unwrap_err();
        assert!(matches!(err, PlanningError::MissingDriverAddress));
    }

    #[test]
    fn test_missing_stop_address_fails() {
        let mut blank = stop(2, "B");
        blank.customer_address = None;
        let err = form_route_list(&[stop(1, "A"), blank], Some(DEPOT), false).unwrap_err();
        assert!(matches!(err, PlanningError::MissingStopAddress { idx: 2 }));
    }

    #[test]
    fn test_no_stops_no_legs() {
        let legs = form_route_list(&[], Some(DEPOT), true).unwrap();
        assert!(legs.is_empty());
    }

    #[test]
    fn test_unoptimized_single_leg_ignores_locks() {
        let stops = vec![stop(1, "A"), locked(2, "B"), stop(3, "C")];
        let legs = form_route_list(&stops, Some(DEPOT), false).unwrap();

        assert_eq!(legs.len(), 1);
        assert_eq!(addresses(&legs[0]), vec![HOME, "A", "B", "C", HOME]);
        assert_eq!(legs[0].addresses.len(), stops.len() + 2);
        assert_eq!(legs[0].segment, Segment { start: 0, len: 3, closes_on_lock: false });
        assert!(legs[0].returns_to_depot);
    }

    #[test]
    fn test_optimized_without_locks_is_single_leg() {
        let stops = vec![stop(1, "A"), stop(2, "B")];
        let legs = form_route_list(&stops, Some(DEPOT), true).unwrap();
        assert_eq!(legs.len(), 1);
        assert_eq!(addresses(&legs[0]), vec![HOME, "A", "B", HOME]);
    }

    #[test]
    fn test_single_lock_splits_into_two_legs() {
        for k in 1..4usize {
            let stops: Vec<_> = (1..=4)
                .map(|i| {
                    let name = format!("S{}", i);
                    if i == k { locked(i as i32, &name) } else { stop(i as i32, &name) }
                })
                .collect();

            let legs = form_route_list(&stops, Some(DEPOT), true).unwrap();
            assert_eq!(legs.len(), 2, "lock at {}", k);

            let lock_address = format!("S{}", k);
            assert_eq!(legs[0].addresses.last(), Some(&lock_address));
            assert_eq!(legs[1].addresses.first(), Some(&lock_address));
            assert_eq!(legs[0].addresses[0], HOME);
            assert_eq!(legs[1].addresses.last().map(String::as_str), Some(HOME));

            assert_eq!(legs[0].segment, Segment { start: 0, len: k, closes_on_lock: true });
            assert_eq!(legs[1].segment, Segment { start: k, len: 4 - k, closes_on_lock: false });
        }
    }

    #[test]
    fn test_lock_on_last_stop_skips_depot_return() {
        let stops = vec![stop(1, "A"), stop(2, "B"), locked(3, "C")];
        let legs = form_route_list(&stops, Some(DEPOT), true).unwrap();

        assert_eq!(legs.len(), 1);
        assert_eq!(addresses(&legs[0]), vec![HOME, "A", "B", "C"]);
        assert!(!legs[0].returns_to_depot);
        assert_eq!(legs[0].segment.waypoint_count(), 2);
    }

    #[test]
    fn test_consecutive_locks() {
        let stops = vec![locked(1, "A"), locked(2, "B"), stop(3, "C")];
        let legs = form_route_list(&stops, Some(DEPOT), true).unwrap();

        assert_eq!(legs.len(), 3);
        assert_eq!(addresses(&legs[0]), vec![HOME, "A"]);
        assert_eq!(addresses(&legs[1]), vec!["A", "B"]);
        assert_eq!(addresses(&legs[2]), vec!["B", "C", HOME]);
        assert_eq!(legs[1].segment, Segment { start: 1, len: 1, closes_on_lock: true });
        assert_eq!(legs[1].segment.waypoint_count(), 0);
    }

    #[test]
    fn test_segments_cover_all_stops_contiguously() {
        let stops = vec![stop(1, "A"), locked(2, "B"), stop(3, "C"), stop(4, "D"), locked(5, "E"), stop(6, "F")];
        let legs = form_route_list(&stops, Some(DEPOT), true).unwrap();

        let mut next = 0;
        for leg in &legs {
            assert_eq!(leg.segment.start, next);
            next = leg.segment.end();
        }
        assert_eq!(next, stops.len());
    }

    #[test]
    fn test_addresses_are_sanitized() {
        let stops = vec![stop(1, "9 Elm St<br>Floor 2<br>Capital City<br>IL")];
        let legs = form_route_list(&stops, Some(DEPOT), false).unwrap();
        assert_eq!(legs[0].addresses[1], "9 Elm St, Floor 2, Capital City");
    }
}
