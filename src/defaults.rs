use chrono::NaiveTime;

pub const DEFAULT_STOP_DELAY_MINUTES: i64 = 0;

/// Directions providers report meters
pub const PROVIDER_DISTANCE_UNIT: &str = "Meter";

pub const DEFAULT_DISTANCE_UNIT: &str = PROVIDER_DISTANCE_UNIT;

pub const DEFAULT_ACTIVITY_TYPE: &str = "Delivery";

/// Address blocks kept when sending an address to the provider
pub const MAX_ADDRESS_BLOCKS: usize = 3;

/// Due date push-out after a partial payment at delivery
pub const PAYMENT_DUE_DAYS: i64 = 7;

pub fn default_delivery_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("valid static default delivery start")
}

pub fn default_delivery_end() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).expect("valid static default delivery end")
}
