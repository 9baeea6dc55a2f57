//! # Site Water
//!
//! Water for a concrete pour or a batch of mortar, split into its parts:
//!
//! - **hydration**: cement mass × water-cement ratio
//! - **aggregate adjustment**: free moisture carried in by the sand and
//!   stone, less what dry aggregate absorbs
//! - **mixing**: hydration less the adjustment, never negative
//! - **curing**: exposed surface × daily rate × curing days
//! - **other**: a per-volume allowance for cleaning and tools
//!
//! Net water is mixing + curing + other. One litre of water weighs one
//! kilogram, so masses and litres are used interchangeably.

use serde::{Deserialize, Serialize};

use super::{Component, MaterialLine};
use crate::materials::concrete_mix::MixSplit;
use crate::materials::{MaterialKind, MaterialRef};
use crate::settings::{QsSettings, WastageCategory, WaterSettings};
use crate::units::{finite_non_negative, CubicMeters, Liters, Unit};

/// Water requirement in litres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WaterBreakdown {
    pub hydration_l: f64,
    /// Free moisture minus absorption; negative when the aggregate is dry
    pub aggregate_adjustment_l: f64,
    pub mixing_l: f64,
    pub curing_l: f64,
    pub other_l: f64,
    pub net_l: f64,
}

impl WaterBreakdown {
    fn from_parts(hydration: f64, adjustment: f64, curing: f64, other: f64) -> Self {
        let mixing = (hydration - adjustment).max(0.0);
        let curing = finite_non_negative(curing);
        let other = finite_non_negative(other);
        WaterBreakdown {
            hydration_l: hydration,
            aggregate_adjustment_l: adjustment,
            mixing_l: mixing,
            curing_l: curing,
            other_l: other,
            net_l: mixing + curing + other,
        }
    }
}

impl std::ops::Add for WaterBreakdown {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        WaterBreakdown {
            hydration_l: self.hydration_l + rhs.hydration_l,
            aggregate_adjustment_l: self.aggregate_adjustment_l + rhs.aggregate_adjustment_l,
            mixing_l: self.mixing_l + rhs.mixing_l,
            curing_l: self.curing_l + rhs.curing_l,
            other_l: self.other_l + rhs.other_l,
            net_l: self.net_l + rhs.net_l,
        }
    }
}

fn percent(value: f64) -> f64 {
    finite_non_negative(value) / 100.0
}

/// Water for a concrete pour.
pub fn concrete_water(
    split: &MixSplit,
    volume_m3: f64,
    surface_area_m2: f64,
    water_cement_ratio: f64,
    settings: &WaterSettings,
) -> WaterBreakdown {
    if volume_m3 <= 0.0 {
        return WaterBreakdown::default();
    }
    let hydration = split.cement_kg * finite_non_negative(water_cement_ratio);
    let aggregate_kg = split.sand_kg + split.stone_kg;
    let adjustment = split.sand_kg * percent(settings.sand_moisture_percent)
        + split.stone_kg * percent(settings.aggregate_moisture_percent)
        - aggregate_kg * percent(settings.aggregate_absorption_percent);
    let curing = surface_area_m2
        * finite_non_negative(settings.curing_rate_l_per_m2_day)
        * finite_non_negative(settings.curing_days);
    let other = volume_m3 * finite_non_negative(settings.other_allowance_l_per_m3);
    WaterBreakdown::from_parts(hydration, adjustment, curing, other)
}

/// Water for mortar or plaster. Mortar is not cured.
pub fn mortar_water(split: &MixSplit, mortar_m3: f64, settings: &WaterSettings) -> WaterBreakdown {
    if mortar_m3 <= 0.0 {
        return WaterBreakdown::default();
    }
    let hydration = split.cement_kg * finite_non_negative(settings.water_cement_ratio);
    let adjustment = split.sand_kg * percent(settings.sand_moisture_percent);
    let other = mortar_m3 * finite_non_negative(settings.other_allowance_l_per_m3);
    WaterBreakdown::from_parts(hydration, adjustment, 0.0, other)
}

/// Bill line for water, priced per cubic metre.
///
/// The line is kept for the record but not charged when the client
/// supplies water.
pub fn water_line(water: &WaterBreakdown, settings: &QsSettings) -> MaterialLine {
    let volume: CubicMeters = Liters(water.net_l).into();
    let line = MaterialLine::new(
        MaterialRef::new(MaterialKind::Water),
        Unit::CubicMeter,
        Component::Water,
        volume.value(),
        settings.wastage_fraction(WastageCategory::Water),
    );
    if settings.water.client_provides_water {
        line.non_billable()
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{MixRatio, MortarRatio};

    #[test]
    fn test_concrete_water_parts() {
        let settings = WaterSettings::default();
        let split = MixRatio::default().split(1.0, 1.54);
        let water = concrete_water(&split, 1.0, 10.0, 0.5, &settings);

        let hydration = split.cement_kg * 0.5;
        let adjustment = (split.sand_kg + split.stone_kg) * (0.04 - 0.015);
        assert!((water.hydration_l - hydration).abs() < 1e-9);
        assert!((water.aggregate_adjustment_l - adjustment).abs() < 1e-9);
        assert!((water.mixing_l - (hydration - adjustment).max(0.0)).abs() < 1e-9);
        assert!((water.curing_l - 10.0 * 5.0 * 3.0).abs() < 1e-9);
        assert!((water.other_l - 5.0).abs() < 1e-9);
        assert!(
            (water.net_l - (water.mixing_l + water.curing_l + water.other_l)).abs() < 1e-9
        );
    }

    #[test]
    fn test_wet_aggregate_never_negative() {
        let settings = WaterSettings {
            sand_moisture_percent: 50.0,
            aggregate_moisture_percent: 50.0,
            aggregate_absorption_percent: 0.0,
            ..WaterSettings::default()
        };
        let split = MixRatio::default().split(1.0, 1.54);
        let water = concrete_water(&split, 1.0, 0.0, 0.5, &settings);
        assert_eq!(water.mixing_l, 0.0);
        assert!(water.net_l >= 0.0);
    }

    #[test]
    fn test_zero_volume_needs_no_water() {
        let split = MixSplit::default();
        let water = concrete_water(&split, 0.0, 12.0, 0.5, &WaterSettings::default());
        assert_eq!(water, WaterBreakdown::default());
    }

    #[test]
    fn test_mortar_water() {
        let settings = WaterSettings::default();
        let split = MortarRatio::default().split(0.5);
        let water = mortar_water(&split, 0.5, &settings);
        assert_eq!(water.curing_l, 0.0);
        assert!((water.other_l - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_client_supplied_water_is_not_billed() {
        let mut settings = QsSettings::default();
        let water = WaterBreakdown {
            net_l: 2000.0,
            ..WaterBreakdown::default()
        };
        let line = water_line(&water, &settings);
        assert!(!line.billable);
        assert!((line.net - 2.0).abs() < 1e-12);

        settings.water.client_provides_water = false;
        assert!(water_line(&water, &settings).billable);
    }
}
