//! Concrete and mortar mixes.
//!
//! Mixes are volumetric (cement : sand : stone). The dry volume of
//! constituents needed for a cubic metre of placed concrete is larger than a
//! cubic metre because the voids fill in; the concrete dry-volume factor is a
//! QS setting, the mortar factor is fixed at 1.3.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Bulk density of cement (kg/m³)
pub const CEMENT_DENSITY_KG_M3: f64 = 1440.0;
/// Bulk density of sand (kg/m³)
pub const SAND_DENSITY_KG_M3: f64 = 1600.0;
/// Bulk density of ballast (kg/m³)
pub const STONE_DENSITY_KG_M3: f64 = 1500.0;
/// Mass of one cement bag (kg)
pub const CEMENT_BAG_KG: f64 = 50.0;
/// Loose volume of one cement bag (m³)
pub const CEMENT_BAG_VOLUME_M3: f64 = 0.035;
/// Dry-volume factor for mortar and plaster
pub const MORTAR_DRY_VOLUME_FACTOR: f64 = 1.3;

/// Named mixes offered by default, keyed by their ratio label.
pub static STANDARD_MIXES: Lazy<BTreeMap<&'static str, MixRatio>> = Lazy::new(|| {
    BTreeMap::from([
        ("1:1.5:3", MixRatio::new(1.0, 1.5, 3.0)),
        ("1:2:4", MixRatio::new(1.0, 2.0, 4.0)),
        ("1:3:6", MixRatio::new(1.0, 3.0, 6.0)),
        ("1:4:8", MixRatio::new(1.0, 4.0, 8.0)),
    ])
});

/// Volumetric concrete mix (cement : sand : stone).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixRatio {
    pub cement: f64,
    pub sand: f64,
    pub stone: f64,
}

impl Default for MixRatio {
    fn default() -> Self {
        MixRatio::new(1.0, 2.0, 4.0)
    }
}

impl MixRatio {
    pub const fn new(cement: f64, sand: f64, stone: f64) -> Self {
        MixRatio {
            cement,
            sand,
            stone,
        }
    }

    /// Parse `"1:2:4"` style text. Every part must be a positive number.
    ///
    /// ```rust
    /// use boq_core::materials::MixRatio;
    ///
    /// assert_eq!(MixRatio::parse("1:1.5:3"), Some(MixRatio::new(1.0, 1.5, 3.0)));
    /// assert_eq!(MixRatio::parse(" 1 : 2 : 4 "), Some(MixRatio::new(1.0, 2.0, 4.0)));
    /// assert_eq!(MixRatio::parse("C25"), None);
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let parts = parse_parts(text)?;
        match parts.as_slice() {
            [cement, sand, stone] => Some(MixRatio::new(*cement, *sand, *stone)),
            _ => None,
        }
    }

    pub fn total_parts(&self) -> f64 {
        self.cement + self.sand + self.stone
    }

    /// Ratio label, e.g. "1:2:4"
    pub fn label(&self) -> String {
        format!(
            "{}:{}:{}",
            trim_number(self.cement),
            trim_number(self.sand),
            trim_number(self.stone)
        )
    }

    /// Split a placed volume into constituent quantities.
    pub fn split(&self, volume_m3: f64, dry_volume_factor: f64) -> MixSplit {
        let total = self.total_parts();
        if total <= 0.0 || volume_m3 <= 0.0 {
            return MixSplit::default();
        }
        let dry = volume_m3 * dry_volume_factor;
        let cement_m3 = self.cement / total * dry;
        let sand_m3 = self.sand / total * dry;
        let stone_m3 = self.stone / total * dry;
        MixSplit {
            cement_bags: cement_m3 / CEMENT_BAG_VOLUME_M3,
            cement_kg: cement_m3 * CEMENT_DENSITY_KG_M3,
            sand_m3,
            sand_kg: sand_m3 * SAND_DENSITY_KG_M3,
            stone_m3,
            stone_kg: stone_m3 * STONE_DENSITY_KG_M3,
        }
    }
}

impl std::fmt::Display for MixRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Mortar mix (cement : sand).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MortarRatio {
    pub cement: f64,
    pub sand: f64,
}

impl Default for MortarRatio {
    fn default() -> Self {
        MortarRatio {
            cement: 1.0,
            sand: 4.0,
        }
    }
}

impl MortarRatio {
    /// Parse `"1:4"` style text. Both parts must be positive.
    pub fn parse(text: &str) -> Option<Self> {
        let parts = parse_parts(text)?;
        match parts.as_slice() {
            [cement, sand] => Some(MortarRatio {
                cement: *cement,
                sand: *sand,
            }),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        format!("{}:{}", trim_number(self.cement), trim_number(self.sand))
    }

    /// Split a wet mortar volume into cement and sand.
    pub fn split(&self, mortar_m3: f64) -> MixSplit {
        let total = self.cement + self.sand;
        if total <= 0.0 || mortar_m3 <= 0.0 {
            return MixSplit::default();
        }
        let dry = mortar_m3 * MORTAR_DRY_VOLUME_FACTOR;
        let cement_m3 = self.cement / total * dry;
        let sand_m3 = self.sand / total * dry;
        MixSplit {
            cement_bags: cement_m3 / CEMENT_BAG_VOLUME_M3,
            cement_kg: cement_m3 * CEMENT_DENSITY_KG_M3,
            sand_m3,
            sand_kg: sand_m3 * SAND_DENSITY_KG_M3,
            stone_m3: 0.0,
            stone_kg: 0.0,
        }
    }
}

/// Net constituent quantities of a mix.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MixSplit {
    pub cement_bags: f64,
    pub cement_kg: f64,
    pub sand_m3: f64,
    pub sand_kg: f64,
    pub stone_m3: f64,
    pub stone_kg: f64,
}

impl std::ops::Add for MixSplit {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        MixSplit {
            cement_bags: self.cement_bags + rhs.cement_bags,
            cement_kg: self.cement_kg + rhs.cement_kg,
            sand_m3: self.sand_m3 + rhs.sand_m3,
            sand_kg: self.sand_kg + rhs.sand_kg,
            stone_m3: self.stone_m3 + rhs.stone_m3,
            stone_kg: self.stone_kg + rhs.stone_kg,
        }
    }
}

fn parse_parts(text: &str) -> Option<Vec<f64>> {
    let parts = text
        .split(':')
        .map(|p| p.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0))
        .collect::<Option<Vec<f64>>>()?;
    Some(parts)
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_mixes_parse_to_themselves() {
        for (label, mix) in STANDARD_MIXES.iter() {
            assert_eq!(MixRatio::parse(label), Some(*mix));
            assert_eq!(&mix.label(), label);
        }
    }

    #[test]
    fn test_rejects_non_positive_parts() {
        assert_eq!(MixRatio::parse("1:0:4"), None);
        assert_eq!(MixRatio::parse("1:-2:4"), None);
        assert_eq!(MixRatio::parse("1:2"), None);
        assert_eq!(MortarRatio::parse("1:2:4"), None);
    }

    #[test]
    fn test_split_124_with_dry_factor() {
        // 1 m³ of 1:2:4 at 1.54 dry factor -> 0.22 m³ cement -> 6.29 bags
        let split = MixRatio::default().split(1.0, 1.54);
        assert!((split.cement_bags - 0.22 / 0.035).abs() < 1e-9);
        assert!((split.sand_m3 - 0.44).abs() < 1e-9);
        assert!((split.stone_m3 - 0.88).abs() < 1e-9);
        assert!((split.cement_kg - 0.22 * 1440.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_zero_volume() {
        assert_eq!(MixRatio::default().split(0.0, 1.54), MixSplit::default());
        assert_eq!(MortarRatio::default().split(-1.0), MixSplit::default());
    }

    #[test]
    fn test_mortar_split() {
        let split = MortarRatio::default().split(1.0);
        // 1.3 m³ dry, one fifth cement
        assert!((split.cement_bags - 0.26 / 0.035).abs() < 1e-9);
        assert!((split.sand_m3 - 1.04).abs() < 1e-9);
    }
}
