//! # Quantity Calculations
//!
//! Every row type follows the same pattern:
//!
//! - a row struct (JSON-serializable, lenient numeric fields)
//! - a `*Result` struct carrying [`MaterialLine`]s and human-readable issues
//! - `calculate(row, settings) -> *Result`, pure and total
//!
//! Calculators never fail. Bad geometry is reported as an issue and
//! contributes zero; prices are applied later by
//! [`crate::pricing::costing`].
//!
//! ## Available Calculations
//!
//! - [`concrete`] - concrete pours, with [`underground`] tanks and pits
//! - [`masonry`] - walling, mortar, plaster, openings and extras
//! - [`rebar`] - individual bars, with [`mesh`] for fabric sheets
//! - [`electrical`] - cables, outlets, lighting and boards
//! - [`finishes`] - floor, wall and ceiling finishes
//! - [`roofing`] - roof covering, timbers and rainwater goods
//! - [`plumbing`] - pipework and sanitary fittings
//! - [`water`] - mixing, curing and site water shared by the above

pub mod concrete;
pub mod electrical;
pub mod finishes;
pub mod masonry;
pub mod mesh;
pub mod plumbing;
pub mod rebar;
pub mod roofing;
pub mod underground;
pub mod water;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::elements::{BuildingCategory, ConcreteRow};
use crate::materials::MaterialRef;
use crate::settings::QsSettings;
use crate::units::{finite_non_negative, Quantity, Unit};

pub use concrete::ConcreteResult;
pub use electrical::{ElectricalResult, ElectricalSystem};
pub use finishes::{FinishElement, FinishResult};
pub use masonry::{MasonryResult, MasonryRoom};
pub use plumbing::{PlumbingResult, PlumbingSystem};
pub use rebar::{RebarResult, RebarRow};
pub use roofing::{RoofStructure, RoofingResult};

// ============================================================================
// Material Lines
// ============================================================================

/// Work a material line belongs to, used to group bill items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Concrete,
    Formwork,
    Walling,
    Mortar,
    Plaster,
    Lintel,
    Reinforcement,
    Opening,
    Waterproofing,
    AddOn,
    Water,
    Electrical,
    Finish,
    Roofing,
    Plumbing,
    Sundry,
}

/// One material a row consumes.
///
/// `gross` is always `net * (1 + wastage_fraction)`.
///
/// ## JSON Example
///
/// ```json
/// {
///   "material": { "kind": "cement" },
///   "unit": "bag",
///   "component": "concrete",
///   "net": 19.5,
///   "gross": 20.475,
///   "wastage_fraction": 0.05,
///   "billable": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub material: MaterialRef,
    pub unit: Unit,
    pub component: Component,
    pub net: f64,
    pub gross: f64,
    pub wastage_fraction: f64,
    /// Rate that replaces the price book (scaffolding, explicit door prices)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_rate: Option<f64>,
    /// Non-billable lines are quantified but cost nothing
    #[serde(default = "default_billable")]
    pub billable: bool,
}

fn default_billable() -> bool {
    true
}

impl MaterialLine {
    pub fn new(
        material: MaterialRef,
        unit: Unit,
        component: Component,
        net: f64,
        wastage_fraction: f64,
    ) -> Self {
        let wastage_fraction = finite_non_negative(wastage_fraction);
        let quantity = Quantity::with_wastage(net, wastage_fraction);
        MaterialLine {
            material,
            unit,
            component,
            net: quantity.net,
            gross: quantity.gross,
            wastage_fraction,
            fixed_rate: None,
            billable: true,
        }
    }

    /// A line with no wastage
    pub fn exact(material: MaterialRef, unit: Unit, component: Component, net: f64) -> Self {
        MaterialLine::new(material, unit, component, net, 0.0)
    }

    /// Builder: price this line at `rate` instead of the price book
    pub fn at_rate(mut self, rate: f64) -> Self {
        self.fixed_rate = Some(finite_non_negative(rate));
        self
    }

    /// Builder: quantify but do not charge
    pub fn non_billable(mut self) -> Self {
        self.billable = false;
        self
    }

    pub fn quantity(&self) -> Quantity {
        Quantity {
            net: self.net,
            gross: self.gross,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.net <= 0.0
    }
}

/// Drop lines with no quantity.
pub(crate) fn keep_non_empty(mut lines: Vec<MaterialLine>) -> Vec<MaterialLine> {
    lines.retain(|line| !line.is_empty());
    lines
}

/// Whole number of pieces needed to cover `value`, ignoring float noise.
pub(crate) fn ceil_count(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        (value - 1e-9).ceil()
    } else {
        0.0
    }
}

/// Report a negative or non-finite field and return the value to use.
pub(crate) fn checked_dimension(name: &str, value: f64, issues: &mut Vec<String>) -> f64 {
    if !value.is_finite() {
        issues.push(format!("{} must be a number", name));
        return 0.0;
    }
    if value < 0.0 {
        issues.push(format!("{} must not be negative", name));
        return 0.0;
    }
    value
}

/// Like [`checked_dimension`], but zero is reported too.
pub(crate) fn positive_dimension(name: &str, value: f64, issues: &mut Vec<String>) -> f64 {
    if !value.is_finite() {
        issues.push(format!("{} must be a number", name));
        return 0.0;
    }
    if value <= 0.0 {
        issues.push(format!("{} must be > 0", name));
        return 0.0;
    }
    value
}

// ============================================================================
// Trades
// ============================================================================

/// Trade a row belongs to, used for per-trade totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trade {
    Concrete,
    Masonry,
    Reinforcement,
    Electrical,
    Finishes,
    Roofing,
    Plumbing,
}

impl Trade {
    pub fn display_name(&self) -> &'static str {
        match self {
            Trade::Concrete => "Concrete",
            Trade::Masonry => "Masonry",
            Trade::Reinforcement => "Reinforcement",
            Trade::Electrical => "Electrical",
            Trade::Finishes => "Finishes",
            Trade::Roofing => "Roofing",
            Trade::Plumbing => "Plumbing",
        }
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Calculation Items
// ============================================================================

/// Enum wrapper for every row type.
///
/// Stores heterogeneous rows in one collection while keeping each row's
/// fields typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalculationItem {
    Concrete(ConcreteRow),
    Masonry(MasonryRoom),
    Rebar(RebarRow),
    Electrical(ElectricalSystem),
    Finish(FinishElement),
    Roofing(RoofStructure),
    Plumbing(PlumbingSystem),
}

impl CalculationItem {
    pub fn id(&self) -> Uuid {
        match self {
            CalculationItem::Concrete(r) => r.id,
            CalculationItem::Masonry(r) => r.id,
            CalculationItem::Rebar(r) => r.id,
            CalculationItem::Electrical(r) => r.id,
            CalculationItem::Finish(r) => r.id,
            CalculationItem::Roofing(r) => r.id,
            CalculationItem::Plumbing(r) => r.id,
        }
    }

    /// User-provided name of the row
    pub fn label(&self) -> &str {
        match self {
            CalculationItem::Concrete(r) => &r.name,
            CalculationItem::Masonry(r) => &r.name,
            CalculationItem::Rebar(r) => &r.name,
            CalculationItem::Electrical(r) => &r.name,
            CalculationItem::Finish(r) => &r.name,
            CalculationItem::Roofing(r) => &r.name,
            CalculationItem::Plumbing(r) => &r.name,
        }
    }

    pub fn calc_type(&self) -> &'static str {
        match self {
            CalculationItem::Concrete(_) => "Concrete",
            CalculationItem::Masonry(_) => "Masonry",
            CalculationItem::Rebar(_) => "Rebar",
            CalculationItem::Electrical(_) => "Electrical",
            CalculationItem::Finish(_) => "Finish",
            CalculationItem::Roofing(_) => "Roofing",
            CalculationItem::Plumbing(_) => "Plumbing",
        }
    }

    pub fn trade(&self) -> Trade {
        match self {
            CalculationItem::Concrete(_) => Trade::Concrete,
            CalculationItem::Masonry(_) => Trade::Masonry,
            CalculationItem::Rebar(_) => Trade::Reinforcement,
            CalculationItem::Electrical(_) => Trade::Electrical,
            CalculationItem::Finish(_) => Trade::Finishes,
            CalculationItem::Roofing(_) => Trade::Roofing,
            CalculationItem::Plumbing(_) => Trade::Plumbing,
        }
    }

    /// Clear stale detail and correct unsupported modes.
    pub fn normalize(&mut self) {
        match self {
            CalculationItem::Concrete(r) => r.normalize(),
            CalculationItem::Rebar(r) => r.normalize(),
            CalculationItem::Masonry(_)
            | CalculationItem::Electrical(_)
            | CalculationItem::Finish(_)
            | CalculationItem::Roofing(_)
            | CalculationItem::Plumbing(_) => {}
        }
    }

    pub fn calculate(&self, settings: &QsSettings) -> ItemResult {
        match self {
            CalculationItem::Concrete(r) => ItemResult::Concrete(concrete::calculate(r, settings)),
            CalculationItem::Masonry(r) => ItemResult::Masonry(masonry::calculate(r, settings)),
            CalculationItem::Rebar(r) => ItemResult::Rebar(rebar::calculate(r, settings)),
            CalculationItem::Electrical(r) => {
                ItemResult::Electrical(electrical::calculate(r, settings))
            }
            CalculationItem::Finish(r) => ItemResult::Finish(finishes::calculate(r, settings)),
            CalculationItem::Roofing(r) => ItemResult::Roofing(roofing::calculate(r, settings)),
            CalculationItem::Plumbing(r) => ItemResult::Plumbing(plumbing::calculate(r, settings)),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Result of calculating one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ItemResult {
    Concrete(ConcreteResult),
    Masonry(MasonryResult),
    Rebar(RebarResult),
    Electrical(ElectricalResult),
    Finish(FinishResult),
    Roofing(RoofingResult),
    Plumbing(PlumbingResult),
}

impl ItemResult {
    pub fn row_id(&self) -> Uuid {
        match self {
            ItemResult::Concrete(r) => r.row_id,
            ItemResult::Masonry(r) => r.row_id,
            ItemResult::Rebar(r) => r.row_id,
            ItemResult::Electrical(r) => r.row_id,
            ItemResult::Finish(r) => r.row_id,
            ItemResult::Roofing(r) => r.row_id,
            ItemResult::Plumbing(r) => r.row_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ItemResult::Concrete(r) => &r.name,
            ItemResult::Masonry(r) => &r.name,
            ItemResult::Rebar(r) => &r.name,
            ItemResult::Electrical(r) => &r.name,
            ItemResult::Finish(r) => &r.name,
            ItemResult::Roofing(r) => &r.name,
            ItemResult::Plumbing(r) => &r.name,
        }
    }

    pub fn lines(&self) -> &[MaterialLine] {
        match self {
            ItemResult::Concrete(r) => &r.lines,
            ItemResult::Masonry(r) => &r.lines,
            ItemResult::Rebar(r) => &r.lines,
            ItemResult::Electrical(r) => &r.lines,
            ItemResult::Finish(r) => &r.lines,
            ItemResult::Roofing(r) => &r.lines,
            ItemResult::Plumbing(r) => &r.lines,
        }
    }

    pub fn issues(&self) -> &[String] {
        match self {
            ItemResult::Concrete(r) => &r.issues,
            ItemResult::Masonry(r) => &r.issues,
            ItemResult::Rebar(r) => &r.issues,
            ItemResult::Electrical(r) => &r.issues,
            ItemResult::Finish(r) => &r.issues,
            ItemResult::Roofing(r) => &r.issues,
            ItemResult::Plumbing(r) => &r.issues,
        }
    }

    pub fn trade(&self) -> Trade {
        match self {
            ItemResult::Concrete(_) => Trade::Concrete,
            ItemResult::Masonry(_) => Trade::Masonry,
            ItemResult::Rebar(_) => Trade::Reinforcement,
            ItemResult::Electrical(_) => Trade::Electrical,
            ItemResult::Finish(_) => Trade::Finishes,
            ItemResult::Roofing(_) => Trade::Roofing,
            ItemResult::Plumbing(_) => Trade::Plumbing,
        }
    }

    pub fn category(&self) -> BuildingCategory {
        match self {
            ItemResult::Concrete(r) => r.category,
            ItemResult::Rebar(r) => r.category,
            ItemResult::Masonry(_)
            | ItemResult::Electrical(_)
            | ItemResult::Finish(_)
            | ItemResult::Roofing(_)
            | ItemResult::Plumbing(_) => BuildingCategory::Superstructure,
        }
    }

    /// Headline quantity of the row and its unit (concrete m³, wall m², ...)
    pub fn primary_quantity(&self) -> (f64, Unit) {
        match self {
            ItemResult::Concrete(r) => (r.volume_m3, Unit::CubicMeter),
            ItemResult::Masonry(r) => (r.net_wall_area_m2, Unit::SquareMeter),
            ItemResult::Rebar(r) => (r.total_weight_kg, Unit::Kilogram),
            ItemResult::Electrical(r) => (r.cable_length_m, Unit::Meter),
            ItemResult::Finish(r) => (r.quantity, r.unit),
            ItemResult::Roofing(r) => (r.roof_area_m2, Unit::SquareMeter),
            ItemResult::Plumbing(r) => (r.pipe_length_m, Unit::Meter),
        }
    }
}
