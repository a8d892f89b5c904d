//! Delivery window lookup

use chrono::NaiveTime;

use crate::types::{DeliverySettings, DeliveryWindow};

/// Start and end as stored on a record; either may be unset
pub type StoredWindow = (Option<NaiveTime>, Option<NaiveTime>);

/// First complete window of document then customer, otherwise the site-wide default.
pub fn resolve_delivery_window(
    document: Option<StoredWindow>,
    customer: Option<StoredWindow>,
    settings: &DeliverySettings,
) -> DeliveryWindow {
    let stored = [document, customer].into_iter().flatten().find_map(|window| match window {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    });

    match stored {
        Some((delivery_start_time, delivery_end_time)) => DeliveryWindow {
            delivery_start_time,
            delivery_end_time,
            default_window: false,
        },
        None => DeliveryWindow {
            delivery_start_time: settings.delivery_start_time,
            delivery_end_time: settings.delivery_end_time,
            default_window: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_document_window_wins_over_customer() {
        let window = resolve_delivery_window(
            Some((Some(t(13, 0)), Some(t(15, 0)))),
            Some((Some(t(7, 30)), Some(t(11, 0)))),
            &DeliverySettings::default(),
        );
        assert_eq!(window.delivery_start_time, t(13, 0));
        assert_eq!(window.delivery_end_time, t(15, 0));
        assert!(!window.default_window);
    }

    #[test]
    fn test_incomplete_document_falls_back_to_customer() {
        let window = resolve_delivery_window(
            Some((Some(t(13, 0)), None)),
            Some((Some(t(7, 30)), Some(t(11, 0)))),
            &DeliverySettings::default(),
        );
        assert_eq!(window.delivery_start_time, t(7, 30));
        assert_eq!(window.delivery_end_time, t(11, 0));
        assert!(!window.default_window);
    }

    #[test]
    fn test_customer_window_without_document() {
        let window = resolve_delivery_window(None, Some((Some(t(7, 30)), Some(t(11, 0)))), &DeliverySettings::default());
        assert_eq!(window.delivery_start_time, t(7, 30));
        assert!(!window.default_window);
    }

    #[test]
    fn test_half_windows_fall_back_to_default() {
        let settings = DeliverySettings::default();
        let window = resolve_delivery_window(Some((None, Some(t(12, 0)))), Some((Some(t(7, 30)), None)), &settings);
        assert_eq!(window.delivery_start_time, t(9, 0));
        assert_eq!(window.delivery_end_time, t(17, 0));
        assert!(window.default_window);
    }

    #[test]
    fn test_nothing_given_uses_default() {
        let window = resolve_delivery_window(None, None, &DeliverySettings::default());
        assert!(window.default_window);
    }
}
