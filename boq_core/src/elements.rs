//! # Concrete Elements
//!
//! Element types a concrete row can describe, the building category each
//! one is billed under, and the per-element detail variants.
//!
//! A row carries exactly one [`ElementDetail`]. Changing the element type
//! through [`ConcreteRow::set_element_type`] replaces a detail that no longer
//! applies, so a soak pit never keeps septic tank fields around.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "name": "Septic tank",
//!   "element": "septic-tank",
//!   "detail": {
//!     "kind": "septic_tank",
//!     "capacity": 9,
//!     "depth": 1.5,
//!     "cover": "slab",
//!     "baffles": true
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::materials::{BlockDimensions, BlockType};
use crate::units::lenient;

// ============================================================================
// Element Types and Categories
// ============================================================================

/// Bill category a row is grouped under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum BuildingCategory {
    Substructure,
    #[default]
    Superstructure,
    ExternalWorks,
}

impl BuildingCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            BuildingCategory::Substructure => "Substructure",
            BuildingCategory::Superstructure => "Superstructure",
            BuildingCategory::ExternalWorks => "External Works",
        }
    }
}

impl std::fmt::Display for BuildingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Concrete element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ElementType {
    #[default]
    Slab,
    Beam,
    RingBeam,
    Column,
    Foundation,
    StripFooting,
    RaftFoundation,
    PileCap,
    Staircase,
    Ramp,
    RetainingWall,
    SepticTank,
    UndergroundTank,
    WaterTank,
    SoakPit,
    Soakaway,
    Culvert,
    SwimmingPool,
    Paving,
    Kerb,
    DrainageChannel,
    Manhole,
    InspectionChamber,
}

impl ElementType {
    pub const ALL: [ElementType; 23] = [
        ElementType::Slab,
        ElementType::Beam,
        ElementType::RingBeam,
        ElementType::Column,
        ElementType::Foundation,
        ElementType::StripFooting,
        ElementType::RaftFoundation,
        ElementType::PileCap,
        ElementType::Staircase,
        ElementType::Ramp,
        ElementType::RetainingWall,
        ElementType::SepticTank,
        ElementType::UndergroundTank,
        ElementType::WaterTank,
        ElementType::SoakPit,
        ElementType::Soakaway,
        ElementType::Culvert,
        ElementType::SwimmingPool,
        ElementType::Paving,
        ElementType::Kerb,
        ElementType::DrainageChannel,
        ElementType::Manhole,
        ElementType::InspectionChamber,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ElementType::Slab => "Slab",
            ElementType::Beam => "Beam",
            ElementType::RingBeam => "Ring Beam",
            ElementType::Column => "Column",
            ElementType::Foundation => "Foundation",
            ElementType::StripFooting => "Strip Footing",
            ElementType::RaftFoundation => "Raft Foundation",
            ElementType::PileCap => "Pile Cap",
            ElementType::Staircase => "Staircase",
            ElementType::Ramp => "Ramp",
            ElementType::RetainingWall => "Retaining Wall",
            ElementType::SepticTank => "Septic Tank",
            ElementType::UndergroundTank => "Underground Tank",
            ElementType::WaterTank => "Water Tank",
            ElementType::SoakPit => "Soak Pit",
            ElementType::Soakaway => "Soakaway",
            ElementType::Culvert => "Culvert",
            ElementType::SwimmingPool => "Swimming Pool",
            ElementType::Paving => "Paving",
            ElementType::Kerb => "Kerb",
            ElementType::DrainageChannel => "Drainage Channel",
            ElementType::Manhole => "Manhole",
            ElementType::InspectionChamber => "Inspection Chamber",
        }
    }

    /// Category used when the row does not name one.
    pub fn default_category(&self) -> BuildingCategory {
        match self {
            ElementType::Slab
            | ElementType::Beam
            | ElementType::RingBeam
            | ElementType::Column
            | ElementType::Staircase
            | ElementType::Ramp => BuildingCategory::Superstructure,
            ElementType::Paving
            | ElementType::Kerb
            | ElementType::DrainageChannel
            | ElementType::Culvert => BuildingCategory::ExternalWorks,
            _ => BuildingCategory::Substructure,
        }
    }

    /// Buried tanks and pits, always billed as substructure.
    pub fn is_underground(&self) -> bool {
        matches!(
            self,
            ElementType::SepticTank
                | ElementType::UndergroundTank
                | ElementType::WaterTank
                | ElementType::SoakPit
                | ElementType::Soakaway
        )
    }

    /// Elements that may take a concrete blinding or hardcore bed.
    pub fn takes_beds(&self) -> bool {
        matches!(
            self,
            ElementType::Foundation | ElementType::StripFooting | ElementType::RaftFoundation
        )
    }

    /// Elements that may carry block walling on top.
    pub fn takes_walling(&self) -> bool {
        matches!(self, ElementType::Foundation | ElementType::RetainingWall)
    }

    /// Elements that may be built as a stepped foundation.
    pub fn can_step(&self) -> bool {
        matches!(
            self,
            ElementType::Foundation | ElementType::StripFooting | ElementType::PileCap
        )
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Detail Variants
// ============================================================================

/// One step of a stepped foundation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FoundationStep {
    #[serde(default, deserialize_with = "lenient::number")]
    pub length: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub width: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub depth: f64,
    /// Set-back from the step below; informational
    #[serde(default, deserialize_with = "lenient::number")]
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StaircaseDetail {
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub riser_height: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub tread_width: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub steps: Option<f64>,
}

/// Cover over a tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoverType {
    #[default]
    Slab,
    Precast,
    None,
}

/// Soak pit lining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LiningType {
    Brick,
    #[default]
    Concrete,
    Precast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SepticTankDetail {
    /// Liquid capacity (m³)
    #[serde(default, deserialize_with = "lenient::number")]
    pub capacity: f64,
    #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
    pub chambers: f64,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub wall_thickness: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub base_thickness: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub depth: Option<f64>,
    #[serde(default)]
    pub cover: CoverType,
    #[serde(default)]
    pub baffles: bool,
    #[serde(default)]
    pub manhole: bool,
    #[serde(default)]
    pub manhole_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UndergroundTankDetail {
    #[serde(default, deserialize_with = "lenient::number")]
    pub capacity: f64,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub wall_thickness: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub base_thickness: Option<f64>,
    #[serde(default)]
    pub cover: CoverType,
    #[serde(default)]
    pub manhole: bool,
    #[serde(default)]
    pub manhole_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SoakPitDetail {
    #[serde(default, deserialize_with = "lenient::number")]
    pub diameter: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub depth: f64,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub wall_thickness: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub base_thickness: Option<f64>,
    #[serde(default)]
    pub lining: LiningType,
    #[serde(default)]
    pub gravel: bool,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub gravel_depth: Option<f64>,
    #[serde(default)]
    pub geotextile: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SoakawayDetail {
    #[serde(default, deserialize_with = "lenient::number")]
    pub length: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub width: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub depth: f64,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub wall_thickness: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub base_thickness: Option<f64>,
    #[serde(default)]
    pub gravel: bool,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub gravel_depth: Option<f64>,
    #[serde(default)]
    pub perforated_pipes: bool,
}

/// Cantilever retaining wall geometry. Row length is the wall run, row
/// height the overall height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RetainingWallDetail {
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub stem_thickness: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub base_width: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub base_thickness: Option<f64>,
}

/// Element-specific detail. Exactly one variant is meaningful per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementDetail {
    #[default]
    None,
    SteppedFoundation {
        #[serde(default)]
        steps: Vec<FoundationStep>,
    },
    Staircase(StaircaseDetail),
    SepticTank(SepticTankDetail),
    UndergroundTank(UndergroundTankDetail),
    SoakPit(SoakPitDetail),
    Soakaway(SoakawayDetail),
    RetainingWall(RetainingWallDetail),
}

impl ElementDetail {
    /// Whether this detail is meaningful for `element`.
    pub fn applies_to(&self, element: ElementType) -> bool {
        match self {
            ElementDetail::None => true,
            ElementDetail::SteppedFoundation { .. } => element.can_step(),
            ElementDetail::Staircase(_) => element == ElementType::Staircase,
            ElementDetail::SepticTank(_) => element == ElementType::SepticTank,
            ElementDetail::UndergroundTank(_) => matches!(
                element,
                ElementType::UndergroundTank | ElementType::WaterTank
            ),
            ElementDetail::SoakPit(_) => element == ElementType::SoakPit,
            ElementDetail::Soakaway(_) => element == ElementType::Soakaway,
            ElementDetail::RetainingWall(_) => element == ElementType::RetainingWall,
        }
    }

    /// Fresh detail for a newly selected element type.
    pub fn default_for(element: ElementType) -> Self {
        match element {
            ElementType::Staircase => ElementDetail::Staircase(StaircaseDetail::default()),
            ElementType::SepticTank => ElementDetail::SepticTank(SepticTankDetail {
                chambers: 1.0,
                ..SepticTankDetail::default()
            }),
            ElementType::UndergroundTank | ElementType::WaterTank => {
                ElementDetail::UndergroundTank(UndergroundTankDetail::default())
            }
            ElementType::SoakPit => ElementDetail::SoakPit(SoakPitDetail::default()),
            ElementType::Soakaway => ElementDetail::Soakaway(SoakawayDetail::default()),
            _ => ElementDetail::None,
        }
    }

    pub fn is_stepped(&self) -> bool {
        matches!(self, ElementDetail::SteppedFoundation { steps } if !steps.is_empty())
    }
}

// ============================================================================
// Row Add-ons
// ============================================================================

/// Blinding and hardcore beds under a foundation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Beds {
    /// Concrete blinding depth (m), added to the concrete volume
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub concrete_depth: Option<f64>,
    /// Hardcore depth (m), its own line
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub hardcore_depth: Option<f64>,
}

/// Block walling built on a foundation or retaining wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FoundationWalling {
    #[serde(default)]
    pub block_type: BlockType,
    #[serde(default)]
    pub custom_block: Option<BlockDimensions>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub thickness: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub height: f64,
}

impl FoundationWalling {
    pub fn block(&self) -> BlockDimensions {
        match (self.block_type, self.custom_block) {
            (BlockType::Custom, Some(custom)) if custom.is_valid() => custom,
            (block_type, _) => block_type.dimensions().unwrap_or_default(),
        }
    }
}

/// Waterproofing membrane family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MembraneType {
    #[default]
    Bituminous,
    Crystalline,
    Membrane,
}

impl MembraneType {
    pub fn display_name(&self) -> &'static str {
        match self {
            MembraneType::Bituminous => "Bituminous",
            MembraneType::Crystalline => "Crystalline",
            MembraneType::Membrane => "Membrane",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Waterproofing {
    #[serde(default)]
    pub dpc: bool,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub dpc_width: Option<f64>,
    #[serde(default)]
    pub polythene: bool,
    /// Membrane over the exposed surface, if any
    #[serde(default)]
    pub membrane: Option<MembraneType>,
}

// ============================================================================
// Concrete Row
// ============================================================================

/// One concrete pour entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteRow {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub element: ElementType,
    /// Overrides the element's default category
    #[serde(default)]
    pub category: Option<BuildingCategory>,

    #[serde(default, deserialize_with = "lenient::number")]
    pub length: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub width: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub height: f64,
    #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
    pub count: f64,

    /// Mix ratio text; the settings default when absent
    #[serde(default)]
    pub mix: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub water_cement_ratio: Option<f64>,

    #[serde(default)]
    pub detail: ElementDetail,
    #[serde(default)]
    pub beds: Option<Beds>,
    #[serde(default)]
    pub foundation_walling: Option<FoundationWalling>,
    #[serde(default)]
    pub waterproofing: Option<Waterproofing>,
}

impl ConcreteRow {
    pub fn new(name: impl Into<String>, element: ElementType) -> Self {
        ConcreteRow {
            id: Uuid::new_v4(),
            name: name.into(),
            element,
            category: None,
            length: 0.0,
            width: 0.0,
            height: 0.0,
            count: 1.0,
            mix: None,
            water_cement_ratio: None,
            detail: ElementDetail::default_for(element),
            beds: None,
            foundation_walling: None,
            waterproofing: None,
        }
    }

    /// Builder: set length, width and height in metres
    pub fn with_dimensions(mut self, length: f64, width: f64, height: f64) -> Self {
        self.length = length;
        self.width = width;
        self.height = height;
        self
    }

    pub fn category(&self) -> BuildingCategory {
        self.category
            .unwrap_or_else(|| self.element.default_category())
    }

    /// Switch element type, dropping every sub-object that no longer applies.
    pub fn set_element_type(&mut self, element: ElementType) {
        self.element = element;
        if !self.detail.applies_to(element) {
            self.detail = ElementDetail::default_for(element);
        }
        self.normalize();
    }

    /// Clear stale sub-objects and force buried elements to substructure.
    pub fn normalize(&mut self) {
        if !self.detail.applies_to(self.element) {
            self.detail = ElementDetail::default_for(self.element);
        }
        if !self.element.takes_beds() {
            self.beds = None;
        }
        if !self.element.takes_walling() {
            self.foundation_walling = None;
        }
        if self.element.is_underground() {
            self.category = Some(BuildingCategory::Substructure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switching_type_resets_detail() {
        let mut row = ConcreteRow::new("Tank", ElementType::SepticTank);
        assert!(matches!(row.detail, ElementDetail::SepticTank(_)));

        row.set_element_type(ElementType::SoakPit);
        assert!(matches!(row.detail, ElementDetail::SoakPit(_)));

        row.set_element_type(ElementType::Slab);
        assert_eq!(row.detail, ElementDetail::None);
    }

    #[test]
    fn test_switching_keeps_applicable_detail() {
        let mut row = ConcreteRow::new("Tank", ElementType::UndergroundTank);
        if let ElementDetail::UndergroundTank(ref mut d) = row.detail {
            d.capacity = 10.0;
        }
        row.set_element_type(ElementType::WaterTank);
        match &row.detail {
            ElementDetail::UndergroundTank(d) => assert_eq!(d.capacity, 10.0),
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_switching_clears_beds_and_walling() {
        let mut row = ConcreteRow::new("Base", ElementType::Foundation);
        row.beds = Some(Beds {
            concrete_depth: Some(0.05),
            hardcore_depth: None,
        });
        row.foundation_walling = Some(FoundationWalling::default());
        row.set_element_type(ElementType::Column);
        assert!(row.beds.is_none());
        assert!(row.foundation_walling.is_none());
    }

    #[test]
    fn test_underground_forced_to_substructure() {
        let mut row = ConcreteRow::new("Pit", ElementType::SoakPit);
        row.category = Some(BuildingCategory::Superstructure);
        row.normalize();
        assert_eq!(row.category(), BuildingCategory::Substructure);
    }

    #[test]
    fn test_lenient_row_deserialization() {
        let row: ConcreteRow = serde_json::from_str(
            r#"{"name":"Slab","element":"slab","length":"5","width":4,"height":"abc"}"#,
        )
        .unwrap();
        assert_eq!(row.length, 5.0);
        assert_eq!(row.width, 4.0);
        assert_eq!(row.height, 0.0);
        assert_eq!(row.count, 1.0);
        assert_eq!(row.detail, ElementDetail::None);
    }

    #[test]
    fn test_tagged_detail_deserialization() {
        let row: ConcreteRow = serde_json::from_str(
            r#"{"element":"foundation","detail":{"kind":"stepped_foundation",
                "steps":[{"length":"2","width":1,"depth":0.3}]}}"#,
        )
        .unwrap();
        assert!(row.detail.is_stepped());
    }
}
