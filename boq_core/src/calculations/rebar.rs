//! # Reinforcement Calculation
//!
//! Bar schedules for reinforced concrete elements, or welded mesh for flat
//! elements.
//!
//! ## Bar Sets per Element
//!
//! | Element | Bars |
//! |---------|------|
//! | Slab, foundation | main + distribution, per layer |
//! | Strip footing | longitudinal main + transverse distribution |
//! | Beam | bottom main + top + stirrups |
//! | Column | main + ties |
//! | Retaining wall | stem vertical/horizontal, base main/distribution, heel and toe |
//! | Tank | wall vertical/horizontal, base, optional cover slab |
//!
//! ## Detailing Rules
//!
//! - development length = factor × d
//! - lap length = factor × d
//! - hook = max(75 mm, 10d)
//! - bars longer than the stock length are spliced with laps
//! - beam and column bar counts follow the minimum steel ratio
//!
//! ## Example
//!
//! ```rust
//! use boq_core::calculations::rebar::{self, RebarElement, RebarRow};
//! use boq_core::settings::QsSettings;
//!
//! let row = RebarRow::new("Ground slab", RebarElement::Slab).with_dimensions(5.0, 4.0, 0.15);
//! let result = rebar::calculate(&row, &QsSettings::default());
//!
//! assert_eq!(result.bar_sets.len(), 2);
//! assert!(result.total_weight_kg > 0.0);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::mesh::{self, MeshOptions, MeshResult};
use super::{ceil_count, keep_non_empty, Component, MaterialLine};
use crate::elements::BuildingCategory;
use crate::materials::{MaterialKind, MaterialRef, RebarSize};
use crate::settings::{QsSettings, RebarSettings, WastageCategory};
use crate::units::{finite_non_negative, lenient, Unit};

/// Smallest spacing used when dividing a span (m)
const MIN_SPACING_M: f64 = 0.001;
/// Shortest hook allowed (m)
const MIN_HOOK_M: f64 = 0.075;

// ============================================================================
// Elements and Modes
// ============================================================================

/// Element a reinforcement row details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RebarElement {
    #[default]
    Slab,
    Beam,
    Column,
    Foundation,
    StripFooting,
    RetainingWall,
    Tank,
}

impl RebarElement {
    pub const ALL: [RebarElement; 7] = [
        RebarElement::Slab,
        RebarElement::Beam,
        RebarElement::Column,
        RebarElement::Foundation,
        RebarElement::StripFooting,
        RebarElement::RetainingWall,
        RebarElement::Tank,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            RebarElement::Slab => "Slab",
            RebarElement::Beam => "Beam",
            RebarElement::Column => "Column",
            RebarElement::Foundation => "Foundation",
            RebarElement::StripFooting => "Strip footing",
            RebarElement::RetainingWall => "Retaining wall",
            RebarElement::Tank => "Tank",
        }
    }

    pub fn default_category(&self) -> BuildingCategory {
        match self {
            RebarElement::Slab | RebarElement::Beam | RebarElement::Column => {
                BuildingCategory::Superstructure
            }
            RebarElement::Foundation
            | RebarElement::StripFooting
            | RebarElement::RetainingWall
            | RebarElement::Tank => BuildingCategory::Substructure,
        }
    }

    /// Flat elements that can take fabric mesh
    pub fn supports_mesh(&self) -> bool {
        matches!(
            self,
            RebarElement::Slab | RebarElement::Foundation | RebarElement::StripFooting
        )
    }

    /// Concrete cover from the settings (m)
    fn cover(&self, settings: &RebarSettings) -> f64 {
        match self {
            RebarElement::Slab => settings.slab_cover,
            RebarElement::Beam => settings.beam_cover,
            RebarElement::Column => settings.column_cover,
            RebarElement::Foundation
            | RebarElement::StripFooting
            | RebarElement::RetainingWall
            | RebarElement::Tank => settings.foundation_cover,
        }
    }

    /// Minimum cover for compliance checks (mm)
    fn min_cover_mm(&self, settings: &RebarSettings) -> f64 {
        match self {
            RebarElement::Slab => settings.min_slab_cover_mm,
            RebarElement::Beam => settings.min_beam_cover_mm,
            RebarElement::Column => settings.min_column_cover_mm,
            RebarElement::Foundation
            | RebarElement::StripFooting
            | RebarElement::RetainingWall
            | RebarElement::Tank => settings.min_foundation_cover_mm,
        }
    }
}

impl std::fmt::Display for RebarElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Individual bars or welded fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReinforcementMode {
    #[default]
    IndividualBars,
    Mesh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TankType {
    #[default]
    Septic,
    Underground,
    Overhead,
    Water,
    Circular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TankShape {
    #[default]
    Rectangular,
    Circular,
}

/// A bar size at a centre-to-centre spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarSpec {
    pub size: RebarSize,
    pub spacing_mm: f64,
}

impl BarSpec {
    pub const fn new(size: RebarSize, spacing_mm: f64) -> Self {
        BarSpec { size, spacing_mm }
    }

    fn spacing_m(&self) -> f64 {
        (self.spacing_mm / 1000.0).max(MIN_SPACING_M)
    }
}

/// Default bar arrangement for a tank type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankDefaults {
    pub wall_vertical: BarSpec,
    pub wall_horizontal: BarSpec,
    pub base_main: BarSpec,
    pub base_distribution: BarSpec,
    pub cover_main: BarSpec,
    pub cover_distribution: BarSpec,
}

impl TankType {
    pub fn defaults(&self) -> TankDefaults {
        use RebarSize::*;
        let light = TankDefaults {
            wall_vertical: BarSpec::new(Y12, 150.0),
            wall_horizontal: BarSpec::new(Y10, 200.0),
            base_main: BarSpec::new(Y12, 150.0),
            base_distribution: BarSpec::new(Y10, 200.0),
            cover_main: BarSpec::new(Y10, 200.0),
            cover_distribution: BarSpec::new(Y8, 250.0),
        };
        match self {
            TankType::Septic | TankType::Overhead | TankType::Water | TankType::Circular => light,
            TankType::Underground => TankDefaults {
                wall_vertical: BarSpec::new(Y16, 150.0),
                wall_horizontal: BarSpec::new(Y12, 150.0),
                base_main: BarSpec::new(Y16, 150.0),
                base_distribution: BarSpec::new(Y12, 150.0),
                cover_main: BarSpec::new(Y12, 200.0),
                cover_distribution: BarSpec::new(Y10, 200.0),
            },
        }
    }
}

// ============================================================================
// Row Detail
// ============================================================================

/// Bar choices for slabs, foundations, footings, beams and columns.
///
/// Absent fields take the element's defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BarLayout {
    pub main_bar: Option<RebarSize>,
    /// Same as the main bar when absent
    pub distribution_bar: Option<RebarSize>,
    /// Stirrups in beams, ties in columns
    pub stirrup_bar: Option<RebarSize>,
    #[serde(deserialize_with = "lenient::optional_number")]
    pub main_spacing_mm: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    pub distribution_spacing_mm: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    pub stirrup_spacing_mm: Option<f64>,
    /// Beam and column bar counts; derived from the steel ratio when absent
    #[serde(deserialize_with = "lenient::optional_number")]
    pub main_bar_count: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    pub distribution_bar_count: Option<f64>,
    /// Slab and foundation mats (1 to 4)
    #[serde(deserialize_with = "lenient::optional_number")]
    pub layers: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetainingWallBars {
    pub stem_vertical: BarSpec,
    pub stem_horizontal: BarSpec,
    pub base_main: BarSpec,
    pub base_distribution: BarSpec,
    pub base_thickness: f64,
    /// Cantilever walls carry heel and toe bars
    pub cantilever: bool,
    pub heel_length: f64,
    pub toe_length: f64,
}

impl Default for RetainingWallBars {
    fn default() -> Self {
        RetainingWallBars {
            stem_vertical: BarSpec::new(RebarSize::Y12, 150.0),
            stem_horizontal: BarSpec::new(RebarSize::Y10, 200.0),
            base_main: BarSpec::new(RebarSize::Y12, 150.0),
            base_distribution: BarSpec::new(RebarSize::Y10, 200.0),
            base_thickness: 0.4,
            cantilever: true,
            heel_length: 0.5,
            toe_length: 0.5,
        }
    }
}

/// Tank walls, base and cover; absent bar specs come from [`TankType::defaults`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TankBars {
    pub tank_type: TankType,
    pub shape: TankShape,
    pub wall_thickness: f64,
    pub base_thickness: f64,
    pub include_cover: bool,
    pub wall_vertical: Option<BarSpec>,
    pub wall_horizontal: Option<BarSpec>,
    pub base_main: Option<BarSpec>,
    pub base_distribution: Option<BarSpec>,
    pub cover_main: Option<BarSpec>,
    pub cover_distribution: Option<BarSpec>,
}

impl Default for TankBars {
    fn default() -> Self {
        TankBars {
            tank_type: TankType::Septic,
            shape: TankShape::Rectangular,
            wall_thickness: 0.2,
            base_thickness: 0.2,
            include_cover: true,
            wall_vertical: None,
            wall_horizontal: None,
            base_main: None,
            base_distribution: None,
            cover_main: None,
            cover_distribution: None,
        }
    }
}

/// Element-specific reinforcement detail.
///
/// ## JSON Example
///
/// ```json
/// { "kind": "tank", "tank_type": "underground", "shape": "rectangular" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RebarDetail {
    #[default]
    None,
    Bars(BarLayout),
    RetainingWall(RetainingWallBars),
    Tank(TankBars),
}

impl RebarDetail {
    pub fn applies_to(&self, element: RebarElement) -> bool {
        match self {
            RebarDetail::None => true,
            RebarDetail::Bars(_) => !matches!(
                element,
                RebarElement::RetainingWall | RebarElement::Tank
            ),
            RebarDetail::RetainingWall(_) => element == RebarElement::RetainingWall,
            RebarDetail::Tank(_) => element == RebarElement::Tank,
        }
    }
}

// ============================================================================
// Reinforcement Row
// ============================================================================

/// One reinforcement row entered by the user.
///
/// Length, width and depth are the element's overall dimensions; columns
/// use `height` for their storey height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebarRow {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub element: RebarElement,
    #[serde(default)]
    pub category: Option<BuildingCategory>,

    #[serde(default, deserialize_with = "lenient::number")]
    pub length: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub width: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub depth: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub height: f64,
    #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
    pub count: f64,

    #[serde(default)]
    pub mode: ReinforcementMode,
    /// Cover override (m)
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub cover: Option<f64>,
    #[serde(default)]
    pub detail: RebarDetail,
    #[serde(default)]
    pub mesh: Option<MeshOptions>,
}

impl RebarRow {
    pub fn new(name: impl Into<String>, element: RebarElement) -> Self {
        RebarRow {
            id: Uuid::new_v4(),
            name: name.into(),
            element,
            category: None,
            length: 0.0,
            width: 0.0,
            depth: 0.0,
            height: 0.0,
            count: 1.0,
            mode: ReinforcementMode::IndividualBars,
            cover: None,
            detail: RebarDetail::None,
            mesh: None,
        }
    }

    /// Builder: set length, width and depth in metres
    pub fn with_dimensions(mut self, length: f64, width: f64, depth: f64) -> Self {
        self.length = length;
        self.width = width;
        self.depth = depth;
        self
    }

    pub fn category(&self) -> BuildingCategory {
        self.category
            .unwrap_or_else(|| self.element.default_category())
    }

    /// Whether the row will be laid out as mesh
    pub fn uses_mesh(&self) -> bool {
        self.mode == ReinforcementMode::Mesh && self.element.supports_mesh()
    }

    /// Revert mesh on elements that cannot take it, drop stale detail and
    /// keep tanks in the substructure.
    pub fn normalize(&mut self) {
        if self.mode == ReinforcementMode::Mesh && !self.element.supports_mesh() {
            self.mode = ReinforcementMode::IndividualBars;
        }
        if self.mode == ReinforcementMode::IndividualBars {
            self.mesh = None;
        }
        if !self.detail.applies_to(self.element) {
            self.detail = RebarDetail::None;
        }
        if self.element == RebarElement::Tank {
            self.category = Some(BuildingCategory::Substructure);
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// One line of the bar schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSet {
    pub name: String,
    pub size: RebarSize,
    /// Bars including repetitions
    pub count: f64,
    /// Length of one bar as ordered (m); spliced runs are whole stock bars
    pub length_m: f64,
    pub total_length_m: f64,
    pub weight_kg: f64,
}

impl BarSet {
    fn new(name: &str, size: RebarSize, bars: f64, length_m: f64, repetitions: f64) -> Self {
        let count = finite_non_negative(bars) * repetitions;
        let length_m = finite_non_negative(length_m);
        let total_length_m = count * length_m;
        BarSet {
            name: name.to_string(),
            size,
            count,
            length_m,
            total_length_m,
            weight_kg: total_length_m * size.kg_per_m(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebarResult {
    pub row_id: Uuid,
    pub name: String,
    pub element: RebarElement,
    pub category: BuildingCategory,
    pub mode: ReinforcementMode,
    pub bar_sets: Vec<BarSet>,
    /// Net steel weight before wastage
    pub total_weight_kg: f64,
    pub binding_wire_kg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshResult>,
    pub lines: Vec<MaterialLine>,
    pub issues: Vec<String>,
}

impl RebarResult {
    /// Net weight per bar size, smallest size first
    pub fn weight_by_size(&self) -> BTreeMap<RebarSize, f64> {
        let mut weights = BTreeMap::new();
        for set in &self.bar_sets {
            *weights.entry(set.size).or_insert(0.0) += set.weight_kg;
        }
        weights
    }
}

// ============================================================================
// Detailing Helpers
// ============================================================================

pub fn development_length(size: RebarSize, settings: &RebarSettings) -> f64 {
    finite_non_negative(settings.development_factor) * size.diameter_m()
}

pub fn lap_length(size: RebarSize, settings: &RebarSettings) -> f64 {
    finite_non_negative(settings.lap_factor) * size.diameter_m()
}

pub fn hook_length(size: RebarSize) -> f64 {
    (10.0 * size.diameter_m()).max(MIN_HOOK_M)
}

/// Stock bars needed for one run of `required` metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplicedRun {
    pub bars: f64,
    pub total_length_m: f64,
}

/// Splice a run from stock lengths, losing one lap at each joint.
pub fn spliced_run(required: f64, size: RebarSize, settings: &RebarSettings) -> SplicedRun {
    let stock = finite_non_negative(settings.standard_bar_length);
    if required <= 0.0 {
        return SplicedRun {
            bars: 0.0,
            total_length_m: 0.0,
        };
    }
    if stock <= 0.0 || required <= stock {
        return SplicedRun {
            bars: 1.0,
            total_length_m: required.max(stock),
        };
    }
    let effective = stock - lap_length(size, settings);
    if effective <= 0.0 {
        return SplicedRun {
            bars: 1.0,
            total_length_m: required,
        };
    }
    let bars = ceil_count(required / effective);
    SplicedRun {
        bars,
        total_length_m: bars * stock,
    }
}

/// Bars needed to give `ratio` of the section area in steel.
///
/// A count given by the user wins; otherwise never fewer than `minimum`.
pub fn bars_by_ratio(
    section_m2: f64,
    ratio: f64,
    size: RebarSize,
    minimum: f64,
    given: Option<f64>,
) -> f64 {
    if let Some(count) = given.filter(|c| c.is_finite() && *c > 0.0) {
        return count.floor();
    }
    let required_mm2 = finite_non_negative(section_m2) * finite_non_negative(ratio) * 1e6;
    ceil_count(required_mm2 / size.area_mm2()).max(finite_non_negative(minimum))
}

/// Bars at `spacing` across `span`, counting both ends.
fn spaced(span: f64, spacing: f64) -> f64 {
    if span <= 0.0 {
        return 0.0;
    }
    ceil_count(span / spacing.max(MIN_SPACING_M)) + 1.0
}

/// Closed link around a `width` × `depth` section inside `cover`.
fn link_length(width: f64, depth: f64, cover: f64, size: RebarSize) -> f64 {
    let inner = (width - 2.0 * cover).max(0.0) + (depth - 2.0 * cover).max(0.0);
    (2.0 * inner + 2.0 * hook_length(size) - 2.0 * size.diameter_m()).max(0.0)
}

// ============================================================================
// Calculation
// ============================================================================

/// Calculate bars (or mesh), binding wire and bill lines for one row.
pub fn calculate(row: &RebarRow, settings: &QsSettings) -> RebarResult {
    let rebar = &settings.rebar;
    let mut issues = Vec::new();
    let count = finite_non_negative(row.count);

    let mut result = RebarResult {
        row_id: row.id,
        name: row.name.clone(),
        element: row.element,
        category: row.category(),
        mode: row.mode,
        bar_sets: Vec::new(),
        total_weight_kg: 0.0,
        binding_wire_kg: 0.0,
        mesh: None,
        lines: Vec::new(),
        issues: Vec::new(),
    };

    if row.mode == ReinforcementMode::Mesh && !row.element.supports_mesh() {
        result.mode = ReinforcementMode::IndividualBars;
    }

    let length = required_dimension("Length", row.length, &mut issues);
    let width = required_dimension("Width", row.width, &mut issues);
    let depth = if row.uses_mesh() {
        finite_non_negative(row.depth)
    } else {
        required_dimension("Depth", row.depth, &mut issues)
    };
    let column_height = if row.element == RebarElement::Column {
        let height = if row.height > 0.0 { row.height } else { row.length };
        required_dimension("Height", height, &mut issues)
    } else {
        0.0
    };
    let geometry_ok = length > 0.0
        && width > 0.0
        && (depth > 0.0 || row.uses_mesh())
        && (row.element != RebarElement::Column || column_height > 0.0);

    if row.uses_mesh() {
        let options = row.mesh.unwrap_or_default();
        let mesh = mesh::calculate(
            if geometry_ok { length } else { 0.0 },
            width,
            count,
            &options,
            settings,
        );
        issues.extend(mesh.issues.iter().cloned());
        result.total_weight_kg = mesh.net_weight_kg;
        result.lines = keep_non_empty(vec![mesh::mesh_line(&mesh, settings)]);
        result.mesh = Some(mesh);
        result.issues = issues;
        return result;
    }

    if geometry_ok {
        let cover = row
            .cover
            .filter(|c| c.is_finite() && *c >= 0.0)
            .unwrap_or_else(|| row.element.cover(rebar));
        let dims = Dims {
            length,
            width,
            depth,
            height: column_height,
            count,
            cover,
        };
        result.bar_sets = match (row.element, row.detail) {
            (RebarElement::RetainingWall, RebarDetail::RetainingWall(bars)) => {
                retaining_wall(&dims, &bars, rebar)
            }
            (RebarElement::RetainingWall, _) => {
                retaining_wall(&dims, &RetainingWallBars::default(), rebar)
            }
            (RebarElement::Tank, RebarDetail::Tank(bars)) => tank(&dims, &bars, rebar),
            (RebarElement::Tank, _) => tank(&dims, &TankBars::default(), rebar),
            (element, detail) => {
                let layout = match detail {
                    RebarDetail::Bars(layout) => layout,
                    _ => BarLayout::default(),
                };
                bar_layout(element, &dims, &layout, rebar, &mut issues)
            }
        };
        compliance(row, &dims, rebar, &mut issues);
    }

    result.total_weight_kg = result.bar_sets.iter().map(|s| s.weight_kg).sum();
    result.binding_wire_kg =
        result.total_weight_kg * finite_non_negative(rebar.binding_wire_percent) / 100.0;

    let wastage = settings.wastage_fraction(WastageCategory::Reinforcement);
    let mut lines: Vec<MaterialLine> = result
        .weight_by_size()
        .into_iter()
        .map(|(size, weight)| {
            MaterialLine::new(
                MaterialRef::new(MaterialKind::Rebar).with_variant(size.display_name()),
                Unit::Kilogram,
                Component::Reinforcement,
                weight,
                wastage,
            )
        })
        .collect();
    lines.push(MaterialLine::new(
        MaterialRef::new(MaterialKind::BindingWire),
        Unit::Kilogram,
        Component::Reinforcement,
        result.binding_wire_kg,
        wastage,
    ));
    result.lines = keep_non_empty(lines);
    result.issues = issues;
    result
}

fn required_dimension(name: &str, value: f64, issues: &mut Vec<String>) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        issues.push(format!("{} must be > 0", name));
        0.0
    }
}

struct Dims {
    length: f64,
    width: f64,
    depth: f64,
    height: f64,
    count: f64,
    cover: f64,
}

fn spacing_or(value: Option<f64>, fallback_mm: f64, message: &str, issues: &mut Vec<String>) -> f64 {
    match value {
        Some(mm) if mm.is_finite() && mm > 0.0 => mm / 1000.0,
        Some(_) => {
            issues.push(message.to_string());
            fallback_mm / 1000.0
        }
        None => fallback_mm / 1000.0,
    }
}

const MAIN_SPACING_ISSUE: &str = "Main bar spacing must be a positive number (mm)";
const DISTRIBUTION_SPACING_ISSUE: &str = "Distribution bar spacing must be a positive number (mm)";
const STIRRUP_SPACING_ISSUE: &str = "Stirrup spacing must be positive (mm)";

fn bar_layout(
    element: RebarElement,
    dims: &Dims,
    layout: &BarLayout,
    settings: &RebarSettings,
    issues: &mut Vec<String>,
) -> Vec<BarSet> {
    let main = layout.main_bar.unwrap_or_default();
    let distribution = layout.distribution_bar.unwrap_or(main);
    let link = layout.stirrup_bar.unwrap_or(RebarSize::Y8);
    let n = dims.count;

    match element {
        RebarElement::Slab | RebarElement::Foundation => {
            let layers = match layout.layers {
                Some(l) if (1.0..=4.0).contains(&l) => l.floor(),
                Some(l) => {
                    issues.push("Slab layers must be between 1 and 4".to_string());
                    l.clamp(1.0, 4.0).floor()
                }
                None => 1.0,
            };
            let main_spacing = spacing_or(layout.main_spacing_mm, 200.0, MAIN_SPACING_ISSUE, issues);
            let dist_spacing = spacing_or(
                layout.distribution_spacing_mm,
                200.0,
                DISTRIBUTION_SPACING_ISSUE,
                issues,
            );
            let min_bars = finite_non_negative(settings.min_slab_bars);
            let main_count = spaced(dims.length, main_spacing).max(min_bars);
            let dist_count = spaced(dims.width, dist_spacing).max(min_bars);
            vec![
                BarSet::new(
                    "Main bars",
                    main,
                    main_count * layers,
                    dims.width + 2.0 * development_length(main, settings),
                    n,
                ),
                BarSet::new(
                    "Distribution bars",
                    distribution,
                    dist_count * layers,
                    dims.length + 2.0 * development_length(distribution, settings),
                    n,
                ),
            ]
        }
        RebarElement::StripFooting => {
            let main_spacing = spacing_or(layout.main_spacing_mm, 150.0, MAIN_SPACING_ISSUE, issues);
            let dist_spacing = spacing_or(
                layout.distribution_spacing_mm,
                200.0,
                DISTRIBUTION_SPACING_ISSUE,
                issues,
            );
            let min_bars = finite_non_negative(settings.min_strip_footing_bars);
            vec![
                BarSet::new(
                    "Longitudinal bars",
                    main,
                    spaced(dims.width, main_spacing).max(min_bars),
                    dims.length + 2.0 * development_length(main, settings),
                    n,
                ),
                BarSet::new(
                    "Transverse bars",
                    distribution,
                    spaced(dims.length, dist_spacing).max(min_bars),
                    dims.width + 2.0 * development_length(distribution, settings),
                    n,
                ),
            ]
        }
        RebarElement::Beam => {
            let section = dims.width * dims.depth;
            let clear = (dims.length - 2.0 * dims.cover).max(0.0);
            let bottom = bars_by_ratio(
                section,
                settings.beam_main_ratio,
                main,
                settings.min_beam_main_bars,
                layout.main_bar_count,
            );
            let top = bars_by_ratio(
                section,
                settings.beam_distribution_ratio,
                distribution,
                settings.min_beam_distribution_bars,
                layout.distribution_bar_count,
            );
            let bottom_run =
                spliced_run(clear + 2.0 * development_length(main, settings), main, settings);
            let top_run = spliced_run(
                clear + 2.0 * development_length(distribution, settings),
                distribution,
                settings,
            );
            let stirrup_spacing =
                spacing_or(layout.stirrup_spacing_mm, 200.0, STIRRUP_SPACING_ISSUE, issues);
            let stirrups = (clear / stirrup_spacing).floor().max(0.0) + 1.0;
            vec![
                BarSet::new("Bottom bars", main, bottom, bottom_run.total_length_m, n),
                BarSet::new("Top bars", distribution, top, top_run.total_length_m, n),
                BarSet::new(
                    "Stirrups",
                    link,
                    stirrups.max(2.0),
                    link_length(dims.width, dims.depth, dims.cover, link),
                    n,
                ),
            ]
        }
        RebarElement::Column => {
            let section = dims.width * dims.depth;
            let clear = (dims.height - 2.0 * dims.cover).max(0.0);
            let bars = bars_by_ratio(
                section,
                settings.column_ratio,
                main,
                settings.min_column_bars,
                layout.main_bar_count,
            );
            let run = spliced_run(clear + 2.0 * development_length(main, settings), main, settings);
            let tie_spacing =
                spacing_or(layout.stirrup_spacing_mm, 250.0, STIRRUP_SPACING_ISSUE, issues);
            let ties = (clear / tie_spacing).floor().max(0.0) + 1.0;
            vec![
                BarSet::new("Main bars", main, bars, run.total_length_m, n),
                BarSet::new(
                    "Ties",
                    link,
                    ties.max(2.0),
                    link_length(dims.width, dims.depth, dims.cover, link),
                    n,
                ),
            ]
        }
        RebarElement::RetainingWall | RebarElement::Tank => Vec::new(),
    }
}

/// Stem and base bars; `depth` is the wall height and `width` the base width.
fn retaining_wall(dims: &Dims, bars: &RetainingWallBars, settings: &RebarSettings) -> Vec<BarSet> {
    let n = dims.count;
    let length = dims.length;
    let base_width = dims.width;
    let min_bars = finite_non_negative(settings.min_retaining_wall_bars);
    let stem_height = (dims.depth - finite_non_negative(bars.base_thickness)).max(0.0);

    let dev = |spec: &BarSpec| development_length(spec.size, settings);
    let base_main_length = length + 2.0 * dev(&bars.base_main);
    let base_dist_length = base_width + 2.0 * dev(&bars.base_distribution);

    let mut sets = vec![
        BarSet::new(
            "Stem vertical bars",
            bars.stem_vertical.size,
            spaced(length, bars.stem_vertical.spacing_m()).max(min_bars),
            stem_height + dev(&bars.stem_vertical),
            n,
        ),
        BarSet::new(
            "Stem horizontal bars",
            bars.stem_horizontal.size,
            spaced(stem_height, bars.stem_horizontal.spacing_m()).max(2.0),
            length + 2.0 * dev(&bars.stem_horizontal),
            n,
        ),
        BarSet::new(
            "Base main bars",
            bars.base_main.size,
            spaced(base_width, bars.base_main.spacing_m()).max(min_bars),
            base_main_length,
            n,
        ),
        BarSet::new(
            "Base distribution bars",
            bars.base_distribution.size,
            spaced(length, bars.base_distribution.spacing_m()).max(min_bars),
            base_dist_length,
            n,
        ),
    ];

    if bars.cantilever {
        for (name, projection) in [("Heel", bars.heel_length), ("Toe", bars.toe_length)] {
            if !(projection > 0.0) {
                continue;
            }
            sets.push(BarSet::new(
                &format!("{} main bars", name),
                bars.base_main.size,
                spaced(projection, bars.base_main.spacing_m()).max(min_bars),
                base_main_length,
                n,
            ));
            sets.push(BarSet::new(
                &format!("{} distribution bars", name),
                bars.base_distribution.size,
                spaced(length, bars.base_distribution.spacing_m()).max(min_bars),
                base_dist_length,
                n,
            ));
        }
    }
    sets
}

/// Wall, base and cover bars; `depth` is the tank height and `length` the
/// diameter of a circular tank.
fn tank(dims: &Dims, bars: &TankBars, settings: &RebarSettings) -> Vec<BarSet> {
    let n = dims.count;
    let defaults = bars.tank_type.defaults();
    let wall_vertical = bars.wall_vertical.unwrap_or(defaults.wall_vertical);
    let wall_horizontal = bars.wall_horizontal.unwrap_or(defaults.wall_horizontal);
    let base_main = bars.base_main.unwrap_or(defaults.base_main);
    let base_distribution = bars.base_distribution.unwrap_or(defaults.base_distribution);

    let dev = |spec: &BarSpec| development_length(spec.size, settings);
    let wall_height = (dims.depth - finite_non_negative(bars.base_thickness)).max(0.0);
    let horizontal_rows = spaced(wall_height, wall_horizontal.spacing_m());

    let mut sets = Vec::new();
    match bars.shape {
        TankShape::Rectangular => {
            let thickness = finite_non_negative(bars.wall_thickness);
            let long_wall = (dims.length - 2.0 * thickness).max(0.0);
            let short_wall = (dims.width - 2.0 * thickness).max(0.0);
            let vertical = 2.0
                * (spaced(long_wall, wall_vertical.spacing_m())
                    + spaced(short_wall, wall_vertical.spacing_m()));
            sets.push(BarSet::new(
                "Wall vertical bars",
                wall_vertical.size,
                vertical,
                wall_height + 2.0 * dev(&wall_vertical),
                n,
            ));
            sets.push(BarSet::new(
                "Long wall horizontal bars",
                wall_horizontal.size,
                2.0 * horizontal_rows,
                long_wall + 2.0 * dev(&wall_horizontal),
                n,
            ));
            sets.push(BarSet::new(
                "Short wall horizontal bars",
                wall_horizontal.size,
                2.0 * horizontal_rows,
                short_wall + 2.0 * dev(&wall_horizontal),
                n,
            ));
        }
        TankShape::Circular => {
            let circumference = std::f64::consts::PI * dims.length;
            sets.push(BarSet::new(
                "Wall vertical bars",
                wall_vertical.size,
                ceil_count(circumference / wall_vertical.spacing_m()),
                wall_height + 2.0 * dev(&wall_vertical),
                n,
            ));
            sets.push(BarSet::new(
                "Wall hoops",
                wall_horizontal.size,
                horizontal_rows,
                circumference + 2.0 * dev(&wall_horizontal),
                n,
            ));
        }
    }

    sets.push(BarSet::new(
        "Base main bars",
        base_main.size,
        spaced(dims.width, base_main.spacing_m()),
        dims.length + 2.0 * dev(&base_main),
        n,
    ));
    sets.push(BarSet::new(
        "Base distribution bars",
        base_distribution.size,
        spaced(dims.length, base_distribution.spacing_m()),
        dims.width + 2.0 * dev(&base_distribution),
        n,
    ));

    if bars.include_cover {
        let cover_main = bars.cover_main.unwrap_or(defaults.cover_main);
        let cover_distribution = bars.cover_distribution.unwrap_or(defaults.cover_distribution);
        sets.push(BarSet::new(
            "Cover main bars",
            cover_main.size,
            spaced(dims.width, cover_main.spacing_m()),
            dims.length + 2.0 * dev(&cover_main),
            n,
        ));
        sets.push(BarSet::new(
            "Cover distribution bars",
            cover_distribution.size,
            spaced(dims.length, cover_distribution.spacing_m()),
            dims.width + 2.0 * dev(&cover_distribution),
            n,
        ));
    }
    sets
}

/// Spacing, cover and anchorage warnings. These never change quantities.
fn compliance(row: &RebarRow, dims: &Dims, settings: &RebarSettings, issues: &mut Vec<String>) {
    let cover_mm = dims.cover * 1000.0;
    let min_cover = row.element.min_cover_mm(settings);
    if cover_mm < min_cover {
        issues.push(format!(
            "Cover of {:.0} mm is below the {:.0} mm minimum for a {}",
            cover_mm,
            min_cover,
            row.element.display_name().to_lowercase()
        ));
    }

    let RebarDetail::Bars(layout) = row.detail else {
        return;
    };
    if let Some(spacing) = layout.main_spacing_mm.filter(|s| *s > 0.0) {
        if spacing < settings.min_bar_spacing_mm {
            issues.push(format!(
                "Main bar spacing of {:.0} mm is below the {:.0} mm minimum",
                spacing, settings.min_bar_spacing_mm
            ));
        } else if spacing > settings.max_bar_spacing_mm {
            issues.push(format!(
                "Main bar spacing of {:.0} mm exceeds the {:.0} mm maximum",
                spacing, settings.max_bar_spacing_mm
            ));
        }
    }

    let main = layout.main_bar.unwrap_or_default();
    let smallest = dims.length.min(dims.width).min(dims.depth);
    if development_length(main, settings) > smallest / 2.0 {
        issues.push(format!(
            "Development length of {} bars is more than half the smallest dimension",
            main
        ));
    }
}
