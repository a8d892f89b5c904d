//! Type definitions

pub mod delivery_note;
pub mod directions;
pub mod messages;
pub mod settings;
pub mod timesheet;
pub mod trip;

pub use delivery_note::*;
pub use directions::*;
pub use messages::*;
pub use settings::*;
pub use timesheet::*;
pub use trip::*;
