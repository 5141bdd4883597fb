//! # Unit Conversion
//!
//! Mass and volume subunits used by ingredient stock and recipes.
//!
//! ```text
//! Mass (base: mg)          Volume (base: ml)        Count
//! ──────────────────       ──────────────────       ─────────
//! kg = 1 000 000 mg        l  = 1 000 ml            unidade
//! g  =     1 000 mg        ml =     1 ml
//! mg =         1 mg
//! ```
//!
//! Conversions only happen inside a dimension. Anything else is
//! `CoreError::IncompatibleUnits`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

/// Physical dimension of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Mass,
    Volume,
    Count,
}

/// Stock / recipe unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Kg,
    G,
    Mg,
    L,
    Ml,
    Unidade,
}

impl Unit {
    /// All units, in the order the UI lists them.
    pub const ALL: [Unit; 6] = [Unit::Kg, Unit::G, Unit::Mg, Unit::L, Unit::Ml, Unit::Unidade];

    pub const fn dimension(&self) -> Dimension {
        match self {
            Unit::Kg | Unit::G | Unit::Mg => Dimension::Mass,
            Unit::L | Unit::Ml => Dimension::Volume,
            Unit::Unidade => Dimension::Count,
        }
    }

    /// Factor relative to the dimension's base unit (mg or ml).
    const fn factor(&self) -> f64 {
        match self {
            Unit::Kg => 1_000_000.0,
            Unit::G => 1_000.0,
            Unit::Mg => 1.0,
            Unit::L => 1_000.0,
            Unit::Ml => 1.0,
            Unit::Unidade => 1.0,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Unit::Kg => "kg",
            Unit::G => "g",
            Unit::Mg => "mg",
            Unit::L => "l",
            Unit::Ml => "ml",
            Unit::Unidade => "unidade",
        }
    }

    /// Short label for receipts and stock screens.
    pub const fn label(&self) -> &'static str {
        match self {
            Unit::Unidade => "un",
            other => other.as_str(),
        }
    }

    /// Units a value in this unit can be converted to.
    pub fn compatible_units(&self) -> Vec<Unit> {
        Unit::ALL
            .into_iter()
            .filter(|u| u.dimension() == self.dimension())
            .collect()
    }

    /// The next larger unit of the same dimension, if any.
    const fn larger(&self) -> Option<Unit> {
        match self {
            Unit::Mg => Some(Unit::G),
            Unit::G => Some(Unit::Kg),
            Unit::Ml => Some(Unit::L),
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kg" => Ok(Unit::Kg),
            "g" => Ok(Unit::G),
            "mg" => Ok(Unit::Mg),
            "l" => Ok(Unit::L),
            "ml" => Ok(Unit::Ml),
            "unidade" | "un" | "und" => Ok(Unit::Unidade),
            other => Err(ValidationError::InvalidFormat {
                field: "unidade".to_string(),
                reason: format!("unidade desconhecida '{}'", other),
            }),
        }
    }
}

/// Converts `value` expressed in `from` into `to`.
///
/// ## Example
/// ```rust
/// use varanda_core::units::{convert_value, Unit};
///
/// assert_eq!(convert_value(1.5, Unit::Kg, Unit::G).unwrap(), 1500.0);
/// assert!(convert_value(1.0, Unit::Unidade, Unit::G).is_err());
/// ```
pub fn convert_value(value: f64, from: Unit, to: Unit) -> CoreResult<f64> {
    if from == to {
        return Ok(value);
    }
    if from.dimension() != to.dimension() || from.dimension() == Dimension::Count {
        return Err(CoreError::IncompatibleUnits {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(value * from.factor() / to.factor())
}

/// Formats a quantity for display, promoting to the larger subunit at 1000.
///
/// ## Example
/// ```rust
/// use varanda_core::units::{format_quantity, Unit};
///
/// assert_eq!(format_quantity(1500.0, Unit::G), "1,5 kg");
/// assert_eq!(format_quantity(250.0, Unit::G), "250 g");
/// assert_eq!(format_quantity(3.0, Unit::Unidade), "3 un");
/// ```
pub fn format_quantity(value: f64, unit: Unit) -> String {
    let mut value = value;
    let mut unit = unit;
    while let Some(larger) = unit.larger() {
        if value.abs() < 1000.0 {
            break;
        }
        value /= 1000.0;
        unit = larger;
    }
    format!("{} {}", format_decimal(value), unit.label())
}

/// Renders a number with up to three decimals, comma separated, zeros trimmed.
pub fn format_decimal(value: f64) -> String {
    let rendered = format!("{:.3}", value);
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    let trimmed = if trimmed == "-0" { "0" } else { trimmed };
    trimmed.replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_mass_and_volume_conversion() {
        assert_eq!(convert_value(2.0, Unit::Kg, Unit::G).unwrap(), 2000.0);
        assert_eq!(convert_value(500.0, Unit::Ml, Unit::L).unwrap(), 0.5);
        assert_eq!(convert_value(1.0, Unit::G, Unit::Mg).unwrap(), 1000.0);
    }

    #[test]
    fn test_round_trip_within_dimension() {
        let pairs = [
            (Unit::Kg, Unit::Mg),
            (Unit::G, Unit::Kg),
            (Unit::Mg, Unit::G),
            (Unit::L, Unit::Ml),
        ];
        for (a, b) in pairs {
            let x = 123.456;
            let there = convert_value(x, a, b).unwrap();
            let back = convert_value(there, b, a).unwrap();
            assert!(close(back, x), "{a} -> {b} -> {a}: {back}");
        }
    }

    #[test]
    fn test_cross_dimension_is_rejected() {
        let err = convert_value(1.0, Unit::Kg, Unit::L).unwrap_err();
        assert!(matches!(err, CoreError::IncompatibleUnits { .. }));
        assert!(convert_value(1.0, Unit::Unidade, Unit::Ml).is_err());
        assert!(convert_value(1.0, Unit::G, Unit::Unidade).is_err());
    }

    #[test]
    fn test_unidade_identity() {
        assert_eq!(convert_value(4.0, Unit::Unidade, Unit::Unidade).unwrap(), 4.0);
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(2500.0, Unit::Ml), "2,5 l");
        assert_eq!(format_quantity(1_500_000.0, Unit::Mg), "1,5 kg");
        assert_eq!(format_quantity(0.25, Unit::Kg), "0,25 kg");
        assert_eq!(format_quantity(999.0, Unit::G), "999 g");
    }

    #[test]
    fn test_parse_unit() {
        assert_eq!("KG".parse::<Unit>().unwrap(), Unit::Kg);
        assert_eq!("un".parse::<Unit>().unwrap(), Unit::Unidade);
        assert!("xícara".parse::<Unit>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Unit::Unidade).unwrap(), "\"unidade\"");
        assert_eq!(serde_json::from_str::<Unit>("\"ml\"").unwrap(), Unit::Ml);
    }
}
