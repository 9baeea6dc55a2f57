//! # Unit Types
//!
//! Metric unit wrappers, bill units, the net/gross [`Quantity`] pair and the
//! lenient numeric parsing used by every row type.
//!
//! ## Metric Units
//!
//! All geometry is SI: metres, square metres, cubic metres, kilograms and
//! litres. Bar spacings are entered in millimetres and converted with
//! [`Millimeters`] before use.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::units::{CubicMeters, Liters, Meters, Millimeters, Quantity};
//!
//! let spacing: Meters = Millimeters(150.0).into();
//! assert!((spacing.0 - 0.15).abs() < 1e-12);
//!
//! let water: CubicMeters = Liters(2500.0).into();
//! assert!((water.0 - 2.5).abs() < 1e-12);
//!
//! let cement = Quantity::with_wastage(19.5, 0.05);
//! assert!((cement.gross - 20.475).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

// ============================================================================
// Length Units
// ============================================================================

/// Length in metres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

/// Length in millimetres (bar diameters and spacings)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f64);

impl From<Millimeters> for Meters {
    fn from(mm: Millimeters) -> Self {
        Meters(mm.0 / 1000.0)
    }
}

impl From<Meters> for Millimeters {
    fn from(m: Meters) -> Self {
        Millimeters(m.0 * 1000.0)
    }
}

// ============================================================================
// Area and Volume Units
// ============================================================================

/// Area in square metres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SquareMeters(pub f64);

/// Volume in cubic metres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CubicMeters(pub f64);

/// Liquid volume in litres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Liters(pub f64);

impl From<Liters> for CubicMeters {
    fn from(l: Liters) -> Self {
        CubicMeters(l.0 / 1000.0)
    }
}

impl From<CubicMeters> for Liters {
    fn from(m3: CubicMeters) -> Self {
        Liters(m3.0 * 1000.0)
    }
}

// ============================================================================
// Mass Units
// ============================================================================

/// Mass in kilograms
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kilograms(pub f64);

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Create from raw f64 value
            pub fn new(value: f64) -> Self {
                Self(value)
            }
        }
    };
}

impl_arithmetic!(Meters);
impl_arithmetic!(Millimeters);
impl_arithmetic!(SquareMeters);
impl_arithmetic!(CubicMeters);
impl_arithmetic!(Liters);
impl_arithmetic!(Kilograms);

// ============================================================================
// Bill Units and Rounding
// ============================================================================

/// Unit a material line is measured and priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    CubicMeter,
    SquareMeter,
    Meter,
    Kilogram,
    /// 50 kg cement bag
    Bag,
    Piece,
    Liter,
    /// Lump sum
    Item,
}

impl Unit {
    /// Symbol used on bills
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::CubicMeter => "m³",
            Unit::SquareMeter => "m²",
            Unit::Meter => "m",
            Unit::Kilogram => "kg",
            Unit::Bag => "bags",
            Unit::Piece => "pcs",
            Unit::Liter => "L",
            Unit::Item => "item",
        }
    }

    /// Rounding rule applied when this unit is shown on a bill
    pub fn rounding(&self) -> RoundingRule {
        RoundingRule::for_unit(*self)
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// How a quantity is presented on a bill.
///
/// Results and totals always carry exact fractional quantities; the rule is
/// only applied when a quantity is turned into a bill line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingRule {
    /// Keep the fraction, shown to two decimals
    Fractional,
    /// Round up to whole purchasable units
    WholeUnits,
}

impl RoundingRule {
    /// Bags and pieces are bought whole; everything else stays fractional.
    pub fn for_unit(unit: Unit) -> Self {
        match unit {
            Unit::Bag | Unit::Piece => RoundingRule::WholeUnits,
            Unit::CubicMeter
            | Unit::SquareMeter
            | Unit::Meter
            | Unit::Kilogram
            | Unit::Liter
            | Unit::Item => RoundingRule::Fractional,
        }
    }

    /// Apply the rule to a quantity.
    pub fn apply(&self, quantity: f64) -> f64 {
        let quantity = finite_non_negative(quantity);
        match self {
            RoundingRule::Fractional => (quantity * 100.0).round() / 100.0,
            // tolerance keeps 20.000000001 from becoming 21
            RoundingRule::WholeUnits => (quantity - 1e-9).ceil().max(0.0),
        }
    }
}

// ============================================================================
// Net / Gross Quantity
// ============================================================================

/// A material quantity before and after wastage.
///
/// `gross` is always `net * (1 + wastage_fraction)` with no rounding.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quantity {
    /// Ideal quantity derived from geometry
    pub net: f64,
    /// Quantity including wastage
    pub gross: f64,
}

impl Quantity {
    /// Build a quantity from its net value and a wastage fraction (0.05 = 5 %).
    pub fn with_wastage(net: f64, wastage_fraction: f64) -> Self {
        let net = finite_non_negative(net);
        let wastage = finite_non_negative(wastage_fraction);
        Quantity {
            net,
            gross: net * (1.0 + wastage),
        }
    }

    /// A quantity with no wastage
    pub fn exact(net: f64) -> Self {
        Quantity::with_wastage(net, 0.0)
    }

    pub fn zero() -> Self {
        Quantity::default()
    }

    pub fn is_zero(&self) -> bool {
        self.net == 0.0 && self.gross == 0.0
    }
}

impl Add for Quantity {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Quantity {
            net: self.net + rhs.net,
            gross: self.gross + rhs.gross,
        }
    }
}

/// Replace NaN, infinities and negatives with zero.
pub fn finite_non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Use `value` when it is a positive finite number, otherwise `fallback`.
pub fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

/// Same as [`positive_or`] for optional inputs.
pub fn positive_opt_or(value: Option<f64>, fallback: f64) -> f64 {
    value.map_or(fallback, |v| positive_or(v, fallback))
}

// ============================================================================
// Lenient Numeric Input
// ============================================================================

/// Serde helpers for numeric fields that arrive as numbers, numeric strings,
/// nulls or garbage.
///
/// Rows are typed in by people; a blank or non-numeric field must contribute
/// zero rather than fail the whole document.
///
/// ```rust
/// use serde::Deserialize;
/// use boq_core::units::lenient;
///
/// #[derive(Deserialize)]
/// struct Row {
///     #[serde(default, deserialize_with = "lenient::number")]
///     length: f64,
/// }
///
/// let row: Row = serde_json::from_str(r#"{"length": "4.5"}"#).unwrap();
/// assert_eq!(row.length, 4.5);
/// let row: Row = serde_json::from_str(r#"{"length": "abc"}"#).unwrap();
/// assert_eq!(row.length, 0.0);
/// ```
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Interpret a JSON value as a finite number.
    pub fn number_from_value(value: &Value) -> Option<f64> {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
        };
        parsed.filter(|v| v.is_finite())
    }

    /// Numeric field; anything unusable becomes 0.
    pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(number_from_value(&value).unwrap_or(0.0))
    }

    /// Optional numeric field; anything unusable becomes `None`.
    pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(number_from_value(&value))
    }

    /// Repetition count; unusable values mean "one", fractions are floored.
    pub fn count<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(number_from_value(&value).map_or(1.0, |v| v.max(0.0).floor()))
    }

    /// Default for count fields
    pub fn one() -> f64 {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mm_to_meters() {
        let m: Meters = Millimeters(200.0).into();
        assert!((m.0 - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_liters_to_cubic_meters() {
        let m3: CubicMeters = Liters(1500.0).into();
        assert!((m3.0 - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_arithmetic() {
        let a = SquareMeters(10.0);
        let b = SquareMeters(4.0);
        assert_eq!((a + b).0, 14.0);
        assert_eq!((a - b).0, 6.0);
        assert_eq!((a * 2.0).0, 20.0);
        assert_eq!((a / 2.0).0, 5.0);
    }

    #[test]
    fn test_quantity_wastage() {
        let q = Quantity::with_wastage(100.0, 0.05);
        assert_eq!(q.net, 100.0);
        assert!((q.gross - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_quantity_sanitizes() {
        assert!(Quantity::with_wastage(f64::NAN, 0.05).is_zero());
        assert!(Quantity::with_wastage(-3.0, 0.05).is_zero());
        let q = Quantity::with_wastage(2.0, f64::INFINITY);
        assert_eq!(q.gross, 2.0);
    }

    #[test]
    fn test_rounding_rules() {
        assert_eq!(Unit::Bag.rounding(), RoundingRule::WholeUnits);
        assert_eq!(Unit::CubicMeter.rounding(), RoundingRule::Fractional);
        assert_eq!(RoundingRule::WholeUnits.apply(20.475), 21.0);
        assert_eq!(RoundingRule::WholeUnits.apply(20.0000000001), 20.0);
        assert_eq!(RoundingRule::Fractional.apply(3.14159), 3.14);
        assert_eq!(RoundingRule::Fractional.apply(f64::NAN), 0.0);
    }

    #[test]
    fn test_lenient_values() {
        use serde_json::json;
        assert_eq!(lenient::number_from_value(&json!(2.5)), Some(2.5));
        assert_eq!(lenient::number_from_value(&json!(" 7 ")), Some(7.0));
        assert_eq!(lenient::number_from_value(&json!("NaN")), None);
        assert_eq!(lenient::number_from_value(&json!(null)), None);
        assert_eq!(lenient::number_from_value(&json!(true)), None);
    }

    #[test]
    fn test_lenient_count() {
        #[derive(serde::Deserialize)]
        struct Row {
            #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
            count: f64,
        }
        let missing: Row = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.count, 1.0);
        let garbage: Row = serde_json::from_str(r#"{"count": "x"}"#).unwrap();
        assert_eq!(garbage.count, 1.0);
        let zero: Row = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert_eq!(zero.count, 0.0);
        let frac: Row = serde_json::from_str(r#"{"count": "2.7"}"#).unwrap();
        assert_eq!(frac.count, 2.0);
    }

    #[test]
    fn test_serialization() {
        let m = Meters(12.5);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "12.5");
        let unit = serde_json::to_string(&Unit::CubicMeter).unwrap();
        assert_eq!(unit, "\"cubic_meter\"");
    }
}
