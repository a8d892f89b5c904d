//! Business logic services

pub mod address;
pub mod arrival;
pub mod delivery_window;
pub mod map_embed;
pub mod planner;
pub mod reorder;
pub mod routing;
pub mod segments;
pub mod status;
pub mod timesheet;
pub mod units;
