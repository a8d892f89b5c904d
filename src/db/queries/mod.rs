//! Database queries

pub mod customer;
pub mod delivery_note;
pub mod settings;
pub mod timesheet;
pub mod trip;
pub mod vehicle;
