//! # QS Settings
//!
//! Quantity-surveyor parameters read by every calculator: wastage per
//! material category, mix ratios, water allowances, masonry extras,
//! reinforcement rules and the financial modes used by the quote summary.
//!
//! Settings are plain serde data. Older quote documents store them as one
//! flat camelCase object (`wastageConcrete`, `cementWaterRatio`, `DPCWidth`,
//! ...); [`resolve_settings`] accepts both layouts and never fails.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::settings::{resolve_settings, WastageCategory};
//! use serde_json::json;
//!
//! let resolved = resolve_settings(&json!({
//!     "wastageConcrete": "7",
//!     "water": { "client_provides_water": false },
//! }));
//! assert!(resolved.issues.is_empty());
//! assert_eq!(resolved.value.wastage_fraction(WastageCategory::Concrete), 0.07);
//! assert!(!resolved.value.water.client_provides_water);
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::materials::{MixRatio, MortarRatio, RebarSize};
use crate::units::lenient;

// ============================================================================
// Wastage
// ============================================================================

/// Material category a wastage percentage applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WastageCategory {
    Concrete,
    Reinforcement,
    Masonry,
    Roofing,
    Finishes,
    Electricals,
    Plumbing,
    Water,
}

impl WastageCategory {
    pub const ALL: [WastageCategory; 8] = [
        WastageCategory::Concrete,
        WastageCategory::Reinforcement,
        WastageCategory::Masonry,
        WastageCategory::Roofing,
        WastageCategory::Finishes,
        WastageCategory::Electricals,
        WastageCategory::Plumbing,
        WastageCategory::Water,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            WastageCategory::Concrete => "Concrete",
            WastageCategory::Reinforcement => "Reinforcement",
            WastageCategory::Masonry => "Masonry",
            WastageCategory::Roofing => "Roofing",
            WastageCategory::Finishes => "Finishes",
            WastageCategory::Electricals => "Electricals",
            WastageCategory::Plumbing => "Plumbing",
            WastageCategory::Water => "Water",
        }
    }
}

/// Wastage allowances in percent (5.0 = 5 %).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WastagePercentages {
    pub concrete: f64,
    pub reinforcement: f64,
    pub masonry: f64,
    pub roofing: f64,
    pub finishes: f64,
    pub electricals: f64,
    pub plumbing: f64,
    pub water: f64,
}

impl Default for WastagePercentages {
    fn default() -> Self {
        WastagePercentages {
            concrete: 5.0,
            reinforcement: 4.0,
            masonry: 3.0,
            roofing: 7.0,
            finishes: 8.0,
            electricals: 2.0,
            plumbing: 3.0,
            water: 5.0,
        }
    }
}

impl WastagePercentages {
    pub fn get(&self, category: WastageCategory) -> f64 {
        match category {
            WastageCategory::Concrete => self.concrete,
            WastageCategory::Reinforcement => self.reinforcement,
            WastageCategory::Masonry => self.masonry,
            WastageCategory::Roofing => self.roofing,
            WastageCategory::Finishes => self.finishes,
            WastageCategory::Electricals => self.electricals,
            WastageCategory::Plumbing => self.plumbing,
            WastageCategory::Water => self.water,
        }
    }

    fn get_mut(&mut self, category: WastageCategory) -> &mut f64 {
        match category {
            WastageCategory::Concrete => &mut self.concrete,
            WastageCategory::Reinforcement => &mut self.reinforcement,
            WastageCategory::Masonry => &mut self.masonry,
            WastageCategory::Roofing => &mut self.roofing,
            WastageCategory::Finishes => &mut self.finishes,
            WastageCategory::Electricals => &mut self.electricals,
            WastageCategory::Plumbing => &mut self.plumbing,
            WastageCategory::Water => &mut self.water,
        }
    }
}

// ============================================================================
// Setting Groups
// ============================================================================

/// Concrete mix defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcreteSettings {
    /// Mix used when a row names none (e.g. "1:2:4")
    pub default_mix: String,
    /// Dry volume of constituents per m³ of placed concrete
    pub dry_volume_factor: f64,
}

impl Default for ConcreteSettings {
    fn default() -> Self {
        ConcreteSettings {
            default_mix: "1:2:4".to_string(),
            dry_volume_factor: 1.54,
        }
    }
}

impl ConcreteSettings {
    pub fn mix(&self) -> MixRatio {
        MixRatio::parse(&self.default_mix).unwrap_or_default()
    }
}

/// Site water allowances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterSettings {
    /// Water is supplied by the client and not priced
    pub client_provides_water: bool,
    pub water_cement_ratio: f64,
    pub sand_moisture_percent: f64,
    pub aggregate_moisture_percent: f64,
    pub aggregate_absorption_percent: f64,
    pub curing_rate_l_per_m2_day: f64,
    pub curing_days: f64,
    /// General site use per m³ placed
    pub other_allowance_l_per_m3: f64,
}

impl Default for WaterSettings {
    fn default() -> Self {
        WaterSettings {
            client_provides_water: true,
            water_cement_ratio: 0.5,
            sand_moisture_percent: 4.0,
            aggregate_moisture_percent: 4.0,
            aggregate_absorption_percent: 1.5,
            curing_rate_l_per_m2_day: 5.0,
            curing_days: 3.0,
            other_allowance_l_per_m3: 5.0,
        }
    }
}

/// Walling mortar and the professional extras added to masonry rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasonrySettings {
    /// Bed and perpend joint thickness (m)
    pub joint_thickness: f64,
    pub mortar_ratio: String,
    pub plaster_thickness: f64,

    pub lintels: bool,
    pub bed_joint_reinforcement: bool,
    pub dpc: bool,
    pub scaffolding: bool,
    pub movement_joints: bool,
    pub waste_removal: bool,

    pub lintel_depth: f64,
    pub lintel_width: f64,
    /// Courses between bed-joint reinforcement runs
    pub bed_joint_courses: f64,
    /// Spacing of vertical bars along the wall (m)
    pub vertical_bar_spacing: f64,
    pub dpc_width: f64,
    pub movement_joint_spacing: f64,
    /// Hire per 100 m² of wall per day
    pub scaffolding_daily_rate: f64,
    pub scaffolding_days: f64,
    /// Disposal cost per m³
    pub waste_removal_rate: f64,

    pub lintel_bar: RebarSize,
    pub vertical_bar: RebarSize,
    pub bed_joint_bar: RebarSize,
}

impl Default for MasonrySettings {
    fn default() -> Self {
        MasonrySettings {
            joint_thickness: 0.01,
            mortar_ratio: "1:4".to_string(),
            plaster_thickness: 0.015,
            lintels: true,
            bed_joint_reinforcement: false,
            dpc: true,
            scaffolding: true,
            movement_joints: false,
            waste_removal: true,
            lintel_depth: 0.15,
            lintel_width: 0.2,
            bed_joint_courses: 3.0,
            vertical_bar_spacing: 1.2,
            dpc_width: 0.225,
            movement_joint_spacing: 6.0,
            scaffolding_daily_rate: 150.0,
            scaffolding_days: 7.0,
            waste_removal_rate: 800.0,
            lintel_bar: RebarSize::Y12,
            vertical_bar: RebarSize::Y12,
            bed_joint_bar: RebarSize::Y8,
        }
    }
}

impl MasonrySettings {
    pub fn mortar(&self) -> MortarRatio {
        MortarRatio::parse(&self.mortar_ratio).unwrap_or_default()
    }
}

/// Reinforcement detailing rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebarSettings {
    /// Stock bar length (m)
    pub standard_bar_length: f64,
    /// Lap length as a multiple of bar diameter
    pub lap_factor: f64,
    /// Development length as a multiple of bar diameter
    pub development_factor: f64,
    /// Binding wire as percent of bar weight
    pub binding_wire_percent: f64,

    pub slab_cover: f64,
    pub beam_cover: f64,
    pub column_cover: f64,
    pub foundation_cover: f64,

    pub mesh_wastage_percent: f64,
    pub mesh_lap: f64,

    pub min_bar_spacing_mm: f64,
    pub max_bar_spacing_mm: f64,
    pub min_slab_cover_mm: f64,
    pub min_beam_cover_mm: f64,
    pub min_column_cover_mm: f64,
    pub min_foundation_cover_mm: f64,

    pub beam_main_ratio: f64,
    pub beam_distribution_ratio: f64,
    pub column_ratio: f64,

    pub min_slab_bars: f64,
    pub min_beam_main_bars: f64,
    pub min_beam_distribution_bars: f64,
    pub min_column_bars: f64,
    pub min_strip_footing_bars: f64,
    pub min_retaining_wall_bars: f64,
}

impl Default for RebarSettings {
    fn default() -> Self {
        RebarSettings {
            standard_bar_length: 12.0,
            lap_factor: 50.0,
            development_factor: 40.0,
            binding_wire_percent: 0.8,
            slab_cover: 0.02,
            beam_cover: 0.025,
            column_cover: 0.025,
            foundation_cover: 0.04,
            mesh_wastage_percent: 5.0,
            mesh_lap: 0.3,
            min_bar_spacing_mm: 25.0,
            max_bar_spacing_mm: 300.0,
            min_slab_cover_mm: 20.0,
            min_beam_cover_mm: 25.0,
            min_column_cover_mm: 25.0,
            min_foundation_cover_mm: 40.0,
            beam_main_ratio: 0.01,
            beam_distribution_ratio: 0.005,
            column_ratio: 0.02,
            min_slab_bars: 1.0,
            min_beam_main_bars: 2.0,
            min_beam_distribution_bars: 2.0,
            min_column_bars: 4.0,
            min_strip_footing_bars: 4.0,
            min_retaining_wall_bars: 4.0,
        }
    }
}

/// Whether a quote add-on is a percentage or a fixed sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinancialMode {
    #[default]
    #[serde(alias = "percent")]
    Percentage,
    #[serde(alias = "cash")]
    Fixed,
}

/// Labour, overhead, contingency, profit and permit rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FinancialSettings {
    pub labour_mode: FinancialMode,
    pub overhead_mode: FinancialMode,
    pub contingency_mode: FinancialMode,
    pub profit_mode: FinancialMode,
    pub permit_mode: FinancialMode,

    pub labour_percent: f64,
    pub overhead_percent: f64,
    pub contingency_percent: f64,
    pub profit_percent: f64,
    /// Permit sum used in percentage mode
    pub permit_cost: f64,

    pub labour_fixed: f64,
    pub overhead_fixed: f64,
    pub contingency_fixed: f64,
    pub profit_fixed: f64,
    pub permit_cost_fixed: f64,
}

// ============================================================================
// QsSettings
// ============================================================================

/// Per-quote QS settings record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QsSettings {
    pub wastage: WastagePercentages,
    pub concrete: ConcreteSettings,
    pub water: WaterSettings,
    pub masonry: MasonrySettings,
    pub rebar: RebarSettings,
    pub financial: FinancialSettings,
}

impl QsSettings {
    /// Wastage as a fraction (5 % -> 0.05).
    pub fn wastage_fraction(&self, category: WastageCategory) -> f64 {
        percent_fraction(self.wastage.get(category))
    }

    /// Mesh wastage fraction, separate from bar wastage.
    pub fn mesh_wastage_fraction(&self) -> f64 {
        percent_fraction(self.rebar.mesh_wastage_percent)
    }

    /// Human-readable problems with out-of-range values.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for category in WastageCategory::ALL {
            let value = self.wastage.get(category);
            if !(0.0..=100.0).contains(&value) {
                issues.push(format!(
                    "{} wastage must be between 0 and 100% (got {})",
                    category.display_name(),
                    value
                ));
            }
        }
        if MixRatio::parse(&self.concrete.default_mix).is_none() {
            issues.push(format!(
                "Concrete mix '{}' is not a valid ratio, using 1:2:4",
                self.concrete.default_mix
            ));
        }
        if !is_positive(self.concrete.dry_volume_factor) {
            issues.push("Dry volume factor must be positive".to_string());
        }
        let ratio = self.water.water_cement_ratio;
        if !(ratio > 0.0 && ratio <= 2.0) {
            issues.push(format!(
                "Water-cement ratio must be in (0, 2] (got {})",
                ratio
            ));
        }
        if !is_positive(self.masonry.joint_thickness) {
            issues.push("Mortar joint thickness must be positive".to_string());
        }
        if MortarRatio::parse(&self.masonry.mortar_ratio).is_none() {
            issues.push(format!(
                "Mortar ratio '{}' is not a valid ratio, using 1:4",
                self.masonry.mortar_ratio
            ));
        }
        for (name, value) in self.non_negative_fields() {
            if !(value.is_finite() && value >= 0.0) {
                issues.push(format!("{} must not be negative (got {})", name, value));
            }
        }
        for (name, value) in self.positive_fields() {
            if !is_positive(value) {
                issues.push(format!("{} must be positive (got {})", name, value));
            }
        }
        issues
    }

    /// Copy with every out-of-range value clamped or reset to its default.
    pub fn sanitized(&self) -> QsSettings {
        let defaults = QsSettings::default();
        let mut out = self.clone();

        for category in WastageCategory::ALL {
            let slot = out.wastage.get_mut(category);
            *slot = if slot.is_finite() {
                slot.clamp(0.0, 100.0)
            } else {
                defaults.wastage.get(category)
            };
        }
        if MixRatio::parse(&out.concrete.default_mix).is_none() {
            out.concrete.default_mix = defaults.concrete.default_mix.clone();
        }
        if !is_positive(out.concrete.dry_volume_factor) {
            out.concrete.dry_volume_factor = defaults.concrete.dry_volume_factor;
        }
        let ratio = out.water.water_cement_ratio;
        if !(ratio > 0.0 && ratio <= 2.0) {
            out.water.water_cement_ratio = defaults.water.water_cement_ratio;
        }
        if !is_positive(out.masonry.joint_thickness) {
            out.masonry.joint_thickness = defaults.masonry.joint_thickness;
        }
        if MortarRatio::parse(&out.masonry.mortar_ratio).is_none() {
            out.masonry.mortar_ratio = defaults.masonry.mortar_ratio.clone();
        }

        let w = &mut out.water;
        for slot in [
            &mut w.sand_moisture_percent,
            &mut w.aggregate_moisture_percent,
            &mut w.aggregate_absorption_percent,
            &mut w.curing_rate_l_per_m2_day,
            &mut w.curing_days,
            &mut w.other_allowance_l_per_m3,
        ] {
            *slot = non_negative(*slot);
        }
        let r = &mut out.rebar;
        for slot in [
            &mut r.binding_wire_percent,
            &mut r.slab_cover,
            &mut r.beam_cover,
            &mut r.column_cover,
            &mut r.foundation_cover,
            &mut r.mesh_wastage_percent,
            &mut r.mesh_lap,
        ] {
            *slot = non_negative(*slot);
        }
        let m = &mut out.masonry;
        for slot in [
            &mut m.plaster_thickness,
            &mut m.lintel_depth,
            &mut m.lintel_width,
            &mut m.dpc_width,
            &mut m.scaffolding_daily_rate,
            &mut m.scaffolding_days,
            &mut m.waste_removal_rate,
        ] {
            *slot = non_negative(*slot);
        }
        let d = &defaults;
        let pairs: [(&mut f64, f64); 6] = [
            (&mut out.rebar.standard_bar_length, d.rebar.standard_bar_length),
            (&mut out.rebar.lap_factor, d.rebar.lap_factor),
            (&mut out.rebar.development_factor, d.rebar.development_factor),
            (&mut out.masonry.bed_joint_courses, d.masonry.bed_joint_courses),
            (
                &mut out.masonry.vertical_bar_spacing,
                d.masonry.vertical_bar_spacing,
            ),
            (
                &mut out.masonry.movement_joint_spacing,
                d.masonry.movement_joint_spacing,
            ),
        ];
        for (slot, fallback) in pairs {
            if !is_positive(*slot) {
                *slot = fallback;
            }
        }
        out
    }

    fn non_negative_fields(&self) -> [(&'static str, f64); 13] {
        [
            ("Sand moisture", self.water.sand_moisture_percent),
            ("Aggregate moisture", self.water.aggregate_moisture_percent),
            ("Aggregate absorption", self.water.aggregate_absorption_percent),
            ("Curing water rate", self.water.curing_rate_l_per_m2_day),
            ("Curing days", self.water.curing_days),
            ("Other site water", self.water.other_allowance_l_per_m3),
            ("Binding wire", self.rebar.binding_wire_percent),
            ("Slab cover", self.rebar.slab_cover),
            ("Beam cover", self.rebar.beam_cover),
            ("Column cover", self.rebar.column_cover),
            ("Foundation cover", self.rebar.foundation_cover),
            ("Mesh lap", self.rebar.mesh_lap),
            ("DPC width", self.masonry.dpc_width),
        ]
    }

    fn positive_fields(&self) -> [(&'static str, f64); 6] {
        [
            ("Standard bar length", self.rebar.standard_bar_length),
            ("Lap factor", self.rebar.lap_factor),
            ("Development factor", self.rebar.development_factor),
            ("Bed joint reinforcement courses", self.masonry.bed_joint_courses),
            ("Vertical bar spacing", self.masonry.vertical_bar_spacing),
            ("Movement joint spacing", self.masonry.movement_joint_spacing),
        ]
    }
}

fn percent_fraction(percent: f64) -> f64 {
    if percent.is_finite() {
        percent.clamp(0.0, 100.0) / 100.0
    } else {
        0.0
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// A value together with the issues found while producing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolved<T> {
    pub value: T,
    pub issues: Vec<String>,
}

const GROUPS: [&str; 6] = ["wastage", "concrete", "water", "masonry", "rebar", "financial"];

/// Flat camelCase keys stored by older quote documents.
static LEGACY_KEYS: Lazy<HashMap<&'static str, (&'static str, &'static str)>> = Lazy::new(|| {
    HashMap::from([
        ("wastageConcrete", ("wastage", "concrete")),
        ("wastageReinforcement", ("wastage", "reinforcement")),
        ("wastageMasonry", ("wastage", "masonry")),
        ("wastageRoofing", ("wastage", "roofing")),
        ("wastageFinishes", ("wastage", "finishes")),
        ("wastageElectricals", ("wastage", "electricals")),
        ("wastagePlumbing", ("wastage", "plumbing")),
        ("wastageWater", ("wastage", "water")),
        ("concreteMixRatio", ("concrete", "default_mix")),
        ("clientProvidesWater", ("water", "client_provides_water")),
        ("cementWaterRatio", ("water", "water_cement_ratio")),
        ("sandMoistureContentPercent", ("water", "sand_moisture_percent")),
        ("aggregateMoistureContentPercent", ("water", "aggregate_moisture_percent")),
        ("aggregateAbsorptionPercent", ("water", "aggregate_absorption_percent")),
        ("curingWaterRateLM2PerDay", ("water", "curing_rate_l_per_m2_day")),
        ("curingDays", ("water", "curing_days")),
        ("otherSiteWaterAllowanceLM3", ("water", "other_allowance_l_per_m3")),
        ("mortarJointThicknessM", ("masonry", "joint_thickness")),
        ("mortar_ratio", ("masonry", "mortar_ratio")),
        ("includesLintels", ("masonry", "lintels")),
        ("includesReinforcement", ("masonry", "bed_joint_reinforcement")),
        ("includesDPC", ("masonry", "dpc")),
        ("includesScaffolding", ("masonry", "scaffolding")),
        ("includesMovementJoints", ("masonry", "movement_joints")),
        ("includesWasteRemoval", ("masonry", "waste_removal")),
        ("lintelDepth", ("masonry", "lintel_depth")),
        ("lintelWidth", ("masonry", "lintel_width")),
        ("reinforcementSpacing", ("masonry", "bed_joint_courses")),
        ("verticalReinforcementSpacing", ("masonry", "vertical_bar_spacing")),
        ("DPCWidth", ("masonry", "dpc_width")),
        ("movementJointSpacing", ("masonry", "movement_joint_spacing")),
        ("scaffoldingDailyRate", ("masonry", "scaffolding_daily_rate")),
        ("wasteRemovalRate", ("masonry", "waste_removal_rate")),
        ("lintelRebarSize", ("masonry", "lintel_bar")),
        ("verticalRebarSize", ("masonry", "vertical_bar")),
        ("bedJointRebarSize", ("masonry", "bed_joint_bar")),
        ("standardBarLength", ("rebar", "standard_bar_length")),
        ("lapLengthFactor", ("rebar", "lap_factor")),
        ("developmentLengthFactor", ("rebar", "development_factor")),
        ("bindingWirePercent", ("rebar", "binding_wire_percent")),
        ("slabCover", ("rebar", "slab_cover")),
        ("beamCover", ("rebar", "beam_cover")),
        ("columnCover", ("rebar", "column_cover")),
        ("foundationCover", ("rebar", "foundation_cover")),
        ("meshWastagePercent", ("rebar", "mesh_wastage_percent")),
        ("standardMeshLap", ("rebar", "mesh_lap")),
        ("labor_percentages", ("financial", "labour_percent")),
        ("overhead_percentages", ("financial", "overhead_percent")),
        ("contingency_percentages", ("financial", "contingency_percent")),
        ("profit_percentages", ("financial", "profit_percent")),
        ("permit_cost", ("financial", "permit_cost")),
        ("labour_fixed", ("financial", "labour_fixed")),
        ("overhead_fixed", ("financial", "overhead_fixed")),
        ("contingency_fixed", ("financial", "contingency_fixed")),
        ("profit_fixed", ("financial", "profit_fixed")),
        ("permit_cost_fixed", ("financial", "permit_cost_fixed")),
    ])
});

/// Keys of the legacy `financialModes` object.
const LEGACY_MODES: [(&str, &str); 5] = [
    ("labour", "labour_mode"),
    ("overhead", "overhead_mode"),
    ("contingency", "contingency_mode"),
    ("profit", "profit_mode"),
    ("permit_cost", "permit_mode"),
];

/// Keys older documents carry that are superseded by another key.
const SUPERSEDED_KEYS: [&str; 1] = ["concreteWaterCementRatio"];

/// Deep-merge a partial settings document over the defaults.
///
/// Accepts the nested snake_case layout and the legacy flat camelCase keys.
/// Numbers may arrive as numeric strings. Unknown keys and values that
/// cannot be applied are reported and skipped; the result is always a
/// complete, sanitized record.
pub fn resolve_settings(raw: &Value) -> Resolved<QsSettings> {
    let mut issues = Vec::new();
    let defaults = QsSettings::default();

    let input = match raw {
        Value::Object(map) => map,
        Value::Null => {
            return Resolved {
                value: defaults,
                issues,
            }
        }
        other => {
            issues.push(format!(
                "Settings must be an object, got {}; using defaults",
                json_kind(other)
            ));
            return Resolved {
                value: defaults,
                issues,
            };
        }
    };

    let mut merged = match serde_json::to_value(&defaults) {
        Ok(value) => value,
        Err(e) => {
            issues.push(format!("Settings defaults could not be encoded: {}", e));
            return Resolved {
                value: defaults,
                issues,
            };
        }
    };

    for (key, value) in input {
        if GROUPS.contains(&key.as_str()) {
            match value {
                Value::Object(fields) => {
                    for (field, incoming) in fields {
                        apply_field(&mut merged, key, field, incoming, &mut issues);
                    }
                }
                other => issues.push(format!(
                    "Settings group '{}' must be an object, got {}",
                    key,
                    json_kind(other)
                )),
            }
        } else if key == "financialModes" {
            apply_legacy_modes(&mut merged, value, &mut issues);
        } else if let Some((group, field)) = LEGACY_KEYS.get(key.as_str()) {
            apply_field(&mut merged, group, field, value, &mut issues);
        } else if SUPERSEDED_KEYS.contains(&key.as_str()) {
            continue;
        } else {
            issues.push(format!("Unknown setting '{}' ignored", key));
        }
    }

    let value = match serde_json::from_value::<QsSettings>(merged) {
        Ok(settings) => settings,
        Err(e) => {
            issues.push(format!("Settings could not be applied ({}); using defaults", e));
            defaults
        }
    };
    issues.extend(value.validate());

    Resolved {
        value: value.sanitized(),
        issues,
    }
}

fn apply_legacy_modes(merged: &mut Value, value: &Value, issues: &mut Vec<String>) {
    let Value::Object(modes) = value else {
        issues.push("financialModes must be an object".to_string());
        return;
    };
    for (key, incoming) in modes {
        match LEGACY_MODES.iter().find(|(legacy, _)| *legacy == key.as_str()) {
            Some((_, field)) => apply_field(merged, "financial", field, incoming, issues),
            None => issues.push(format!("Unknown financial mode '{}' ignored", key)),
        }
    }
}

fn apply_field(
    merged: &mut Value,
    group: &str,
    field: &str,
    incoming: &Value,
    issues: &mut Vec<String>,
) {
    let Some(current) = merged.get(group).and_then(|g| g.get(field)) else {
        issues.push(format!("Unknown setting '{}.{}' ignored", group, field));
        return;
    };

    let Some(coerced) = coerce_like(current, incoming) else {
        issues.push(format!(
            "Setting '{}.{}' has unusable value {}; keeping default",
            group, field, incoming
        ));
        return;
    };

    let previous = current.clone();
    if let Some(slot) = merged.get_mut(group).and_then(|g| g.get_mut(field)) {
        *slot = coerced;
    }
    // enum-valued fields (bar sizes, modes) only fail on full decode
    if serde_json::from_value::<QsSettings>(merged.clone()).is_err() {
        if let Some(slot) = merged.get_mut(group).and_then(|g| g.get_mut(field)) {
            *slot = previous;
        }
        issues.push(format!(
            "Setting '{}.{}' has unusable value {}; keeping default",
            group, field, incoming
        ));
    }
}

/// Convert `incoming` to the JSON kind of `current`.
fn coerce_like(current: &Value, incoming: &Value) -> Option<Value> {
    match current {
        Value::Number(_) => lenient::number_from_value(incoming)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        Value::Bool(_) => match incoming {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            Value::Number(n) => n.as_f64().map(|v| Value::Bool(v != 0.0)),
            _ => None,
        },
        Value::String(_) => match incoming {
            Value::String(s) => Some(Value::String(s.trim().to_string())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            _ => None,
        },
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let s = QsSettings::default();
        assert_eq!(s.wastage_fraction(WastageCategory::Concrete), 0.05);
        assert_eq!(s.wastage_fraction(WastageCategory::Reinforcement), 0.04);
        assert_eq!(s.wastage_fraction(WastageCategory::Finishes), 0.08);
        assert!(s.water.client_provides_water);
        assert_eq!(s.masonry.bed_joint_bar, RebarSize::Y8);
        assert_eq!(s.concrete.mix(), MixRatio::new(1.0, 2.0, 4.0));
        assert!(s.validate().is_empty());
    }

    #[test]
    fn test_resolve_legacy_flat_keys() {
        let resolved = resolve_settings(&json!({
            "wastageConcrete": 10,
            "cementWaterRatio": "0.45",
            "curingDays": "7",
            "DPCWidth": 0.3,
            "includesMovementJoints": true,
            "lintelRebarSize": "Y16",
            "financialModes": { "labour": "fixed", "profit": "percentage" },
            "labour_fixed": 25000,
        }));
        assert!(resolved.issues.is_empty(), "{:?}", resolved.issues);
        let s = resolved.value;
        assert_eq!(s.wastage.concrete, 10.0);
        assert_eq!(s.water.water_cement_ratio, 0.45);
        assert_eq!(s.water.curing_days, 7.0);
        assert_eq!(s.masonry.dpc_width, 0.3);
        assert!(s.masonry.movement_joints);
        assert_eq!(s.masonry.lintel_bar, RebarSize::Y16);
        assert_eq!(s.financial.labour_mode, FinancialMode::Fixed);
        assert_eq!(s.financial.labour_fixed, 25000.0);
    }

    #[test]
    fn test_resolve_nested_layout() {
        let resolved = resolve_settings(&json!({
            "rebar": { "lap_factor": 45, "slab_cover": "0.025" },
            "concrete": { "default_mix": "1:3:6" },
        }));
        assert!(resolved.issues.is_empty());
        assert_eq!(resolved.value.rebar.lap_factor, 45.0);
        assert_eq!(resolved.value.rebar.slab_cover, 0.025);
        assert_eq!(resolved.value.concrete.mix(), MixRatio::new(1.0, 3.0, 6.0));
    }

    #[test]
    fn test_unusable_values_fall_back() {
        let resolved = resolve_settings(&json!({
            "wastageMasonry": "lots",
            "lintelRebarSize": "Y14",
            "mysteryKey": 1,
        }));
        assert_eq!(resolved.issues.len(), 3, "{:?}", resolved.issues);
        assert_eq!(resolved.value.wastage.masonry, 3.0);
        assert_eq!(resolved.value.masonry.lintel_bar, RebarSize::Y12);
    }

    #[test]
    fn test_out_of_range_is_sanitized() {
        let resolved = resolve_settings(&json!({
            "wastageConcrete": 150,
            "cementWaterRatio": 0,
            "mortarJointThicknessM": -0.01,
        }));
        assert_eq!(resolved.issues.len(), 3, "{:?}", resolved.issues);
        assert_eq!(resolved.value.wastage.concrete, 100.0);
        assert_eq!(resolved.value.water.water_cement_ratio, 0.5);
        assert_eq!(resolved.value.masonry.joint_thickness, 0.01);
    }

    #[test]
    fn test_non_object_input() {
        let resolved = resolve_settings(&json!([1, 2]));
        assert_eq!(resolved.value, QsSettings::default());
        assert_eq!(resolved.issues.len(), 1);
        assert!(resolve_settings(&Value::Null).issues.is_empty());
    }

    #[test]
    fn test_superseded_key_is_silent() {
        let resolved = resolve_settings(&json!({ "concreteWaterCementRatio": 0.6 }));
        assert!(resolved.issues.is_empty());
        assert_eq!(resolved.value.water.water_cement_ratio, 0.5);
    }

    #[test]
    fn test_settings_roundtrip() {
        let settings = QsSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: QsSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
