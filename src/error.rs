//! Route planning and trip lifecycle errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("cannot calculate arrival time as driver address is missing")]
    MissingDriverAddress,

    #[error("delivery stop {idx} has no customer address")]
    MissingStopAddress { idx: i32 },

    #[error("directions API key is not configured")]
    MissingApiKey,

    #[error("no conversion factor from {from} to {to}")]
    UnknownDistanceUnit { from: String, to: String },

    #[error("directions request failed: {0}")]
    Directions(String),

    #[error("waypoint order has {got} entries, segment has {expected} waypoints")]
    WaypointOrderMismatch { expected: usize, got: usize },

    #[error("waypoint order {0:?} is not a permutation")]
    InvalidWaypointOrder(Vec<usize>),

    #[error("directions returned {legs} legs for a segment of {stops} stops")]
    LegStopMismatch { legs: usize, stops: usize },

    #[error("cannot {action} a trip in state {state}")]
    InvalidTransition { action: String, state: String },

    #[error("unknown driver action: {0}")]
    UnknownAction(String),

    #[error("odometer value is required to {0} a trip")]
    MissingOdometer(String),

    #[error("trip not found: {0}")]
    NotFound(String),
}

impl PlanningError {
    /// Stable code sent in NATS error responses
    pub fn code(&self) -> &'static str {
        match self {
            PlanningError::MissingDriverAddress => "MISSING_DRIVER_ADDRESS",
            PlanningError::MissingStopAddress { .. } => "MISSING_STOP_ADDRESS",
            PlanningError::MissingApiKey => "MISSING_API_KEY",
            PlanningError::UnknownDistanceUnit { .. } => "UNKNOWN_DISTANCE_UNIT",
            PlanningError::Directions(_) => "DIRECTIONS_ERROR",
            PlanningError::WaypointOrderMismatch { .. } => "WAYPOINT_ORDER_MISMATCH",
            PlanningError::InvalidWaypointOrder(_) => "INVALID_WAYPOINT_ORDER",
            PlanningError::LegStopMismatch { .. } => "LEG_STOP_MISMATCH",
            PlanningError::InvalidTransition { .. } => "INVALID_TRANSITION",
            PlanningError::UnknownAction(_) => "UNKNOWN_ACTION",
            PlanningError::MissingOdometer(_) => "MISSING_ODOMETER",
            PlanningError::NotFound(_) => "NOT_FOUND",
        }
    }
}

pub type PlanningResult<T> = std::result::Result<T, PlanningError>;

/// Failure of a trip operation as reported by a message handler
#[derive(Debug, Error)]
pub enum TripError {
    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl TripError {
    pub fn code(&self) -> &'static str {
        match self {
            TripError::Planning(e) => e.code(),
            TripError::Database(_) => "DATABASE_ERROR",
        }
    }
}
