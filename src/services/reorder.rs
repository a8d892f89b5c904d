//! Apply a provider waypoint order to one route segment

use crate::error::{PlanningError, PlanningResult};
use crate::services::segments::Segment;
use crate::types::DeliveryStop;

/// Reorder the waypoint stops of `segment` in place.
///
/// `optimized_order[new] = old`, both 0-based within the segment's waypoints.
/// Reordered stops are renumbered `segment.start + new + 1`. A closing lock
/// and every stop outside the segment keep their place and position.
pub fn rearrange_stops(
    stops: &mut [DeliveryStop],
    optimized_order: &[usize],
    segment: &Segment,
) -> PlanningResult<()> {
    let expected = segment.waypoint_count();
    if optimized_order.len() != expected {
        return Err(PlanningError::WaypointOrderMismatch {
            expected,
            got: optimized_order.len(),
        });
    }
    if segment.end() > stops.len() {
        return Err(PlanningError::LegStopMismatch {
            legs: segment.len,
            stops: stops.len().saturating_sub(segment.start),
        });
    }

    let mut seen = vec![false; expected];
    for &old in optimized_order {
        if old >= expected || seen[old] {
            return Err(PlanningError::InvalidWaypointOrder(optimized_order.to_vec()));
        }
        seen[old] = true;
    }

    let window = &mut stops[segment.waypoint_range()];
    let reordered: Vec<DeliveryStop> = optimized_order
        .iter()
        .enumerate()
        .map(|(new, &old)| {
            let mut stop = window[old].clone();
            stop.idx = (segment.start + new + 1) as i32;
            stop
        })
        .collect();
    window.clone_from_slice(&reordered);

    Ok(())
}
