//! Static unit tables for measure leaves.
//!
//! A unit is a display descriptor: selecting one never rescales the stored
//! number. The `factor` is carried as declared for each table.

use std::f64::consts::PI;

/// Display unit of a measure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub id: &'static str,
    pub abbreviations: &'static [&'static str],
    pub factor: f64,
    pub default: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Unit {
    pub const fn new(id: &'static str, abbreviations: &'static [&'static str], factor: f64) -> Self {
        Self {
            id,
            abbreviations,
            factor,
            default: None,
            min: None,
            max: None,
        }
    }

    /// True if `key` names this unit by id or abbreviation (case-insensitive).
    pub fn matches(&self, key: &str) -> bool {
        let key = key.trim();
        self.id.eq_ignore_ascii_case(key)
            || self
                .abbreviations
                .iter()
                .any(|abbr| abbr.eq_ignore_ascii_case(key))
    }
}

pub const ANGLE_UNITS: &[Unit] = &[
    Unit::new("degrees", &["deg", "°"], 1.0),
    Unit::new("radians", &["rad"], PI / 180.0),
];

/// Shared by distance and size.
pub const LENGTH_UNITS: &[Unit] = &[
    Unit::new("meters", &["m"], 1.0),
    Unit::new("centimeters", &["cm"], 0.01),
    Unit::new("millimeters", &["mm"], 0.001),
    Unit::new("kilometers", &["km"], 1000.0),
];

pub const TIME_UNITS: &[Unit] = &[
    Unit::new("seconds", &["s", "sec"], 1.0),
    Unit::new("minutes", &["min"], 1.0 / 60.0),
    Unit::new("hours", &["h", "hr"], 1.0 / 3600.0),
    Unit::new("milliseconds", &["ms"], 1000.0),
];

/// Position of the unit named `key` in `units`.
pub fn find_unit(units: &[Unit], key: &str) -> Option<usize> {
    units.iter().position(|unit| unit.matches(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_abbreviation_when_finding_unit_then_returns_index() {
        assert_eq!(find_unit(ANGLE_UNITS, "rad"), Some(1));
        assert_eq!(find_unit(LENGTH_UNITS, "KM"), Some(3));
        assert_eq!(find_unit(TIME_UNITS, "milliseconds"), Some(3));
        assert_eq!(find_unit(TIME_UNITS, "fortnight"), None);
    }

    #[test]
    fn given_radian_unit_then_factor_is_pi_over_180() {
        assert!((ANGLE_UNITS[1].factor - PI / 180.0).abs() < f64::EPSILON);
    }
}
