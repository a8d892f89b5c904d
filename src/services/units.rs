//! Distance unit conversion factors

use crate::error::{PlanningError, PlanningResult};

/// Built-in factors from meters
const FROM_METER: &[(&str, f64)] = &[
    ("Meter", 1.0),
    ("Kilometer", 0.001),
    ("Mile", 0.000621371),
    ("Foot", 3.28084),
    ("Yard", 1.09361),
];

/// Built-in multiplicative factor `from -> to`, if known
pub fn builtin_conversion_factor(from: &str, to: &str) -> Option<f64> {
    if from.eq_ignore_ascii_case(to) {
        return Some(1.0);
    }

    let lookup = |unit: &str| {
        FROM_METER
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(unit))
            .map(|(_, factor)| *factor)
    };

    let from_meter = lookup(from)?;
    let to_meter = lookup(to)?;
    Some(to_meter / from_meter)
}

/// Resolve a conversion factor: stored override first, then the built-in table
pub fn resolve_conversion_factor(
    stored: Option<f64>,
    from: &str,
    to: &str,
) -> PlanningResult<f64> {
    stored
        .or_else(|| builtin_conversion_factor(from, to))
        .ok_or_else(|| PlanningError::UnknownDistanceUnit {
            from: from.to_string(),
            to: to.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_unit_is_identity() {
        assert_eq!(builtin_conversion_factor("Meter", "Meter"), Some(1.0));
        assert_eq!(builtin_conversion_factor("Furlong", "furlong"), Some(1.0));
    }

    #[test]
    fn test_meter_to_kilometer() {
        assert_eq!(builtin_conversion_factor("Meter", "Kilometer"), Some(0.001));
    }

    #[test]
    fn test_kilometer_to_meter() {
        let factor = builtin_conversion_factor("Kilometer", "Meter").unwrap();
        assert!((factor - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_stored_factor_wins() {
        assert_eq!(resolve_conversion_factor(Some(0.5), "Meter", "Kilometer").unwrap(), 0.5);
    }

    #[test]
    fn test_unknown_unit_fails() {
        let err = resolve_conversion_factor(None, "Meter", "Parsec").unwrap_err();
        assert!(matches!(err, PlanningError::UnknownDistanceUnit { .. }));
    }
}
