//! # Roofing
//!
//! A roof structure is measured on plan, then sloped by its pitch:
//!
//! roof area = plan area / cos(pitch)
//!
//! The plan area is the row's `area` when given, otherwise the footprint
//! grown by the eaves overhang on every side, (L + 2o) × (W + 2o). Flat
//! roofs ignore the pitch.
//!
//! Covering, underlayment and insulation are laid over the sloped area.
//! Timber members are measured by volume (section × length × quantity);
//! gutters, fascia, flashings and the other accessories are taken as
//! measured on the row. Everything carries the roofing wastage allowance.
//!
//! A roof with no plan area contributes nothing.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::calculations::roofing::{self, RoofStructure, RoofType};
//! use boq_core::settings::QsSettings;
//!
//! let mut roof = RoofStructure::new("Main roof", RoofType::Gable);
//! roof.length = 10.0;
//! roof.width = 8.0;
//! roof.pitch = 30.0;
//! let result = roofing::calculate(&roof, &QsSettings::default());
//! assert!((result.roof_area_m2 - 80.0 / 30f64.to_radians().cos()).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{keep_non_empty, Component, MaterialLine};
use crate::materials::{MaterialKind, MaterialRef};
use crate::settings::{QsSettings, WastageCategory};
use crate::units::{finite_non_negative, lenient, Unit};

/// Steepest pitch accepted (degrees)
pub const MAX_PITCH_DEGREES: f64 = 75.0;
/// Timber a roof would use at an average 50 mm over its plan (m³ per m²)
pub const NOMINAL_TIMBER_DEPTH_M: f64 = 0.05;

// ============================================================================
// Input Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RoofType {
    #[default]
    Pitched,
    Flat,
    Gable,
    Hip,
    Mansard,
    Butterfly,
    Skillion,
}

impl RoofType {
    pub fn display_name(&self) -> &'static str {
        match self {
            RoofType::Pitched => "Pitched",
            RoofType::Flat => "Flat",
            RoofType::Gable => "Gable",
            RoofType::Hip => "Hip",
            RoofType::Mansard => "Mansard",
            RoofType::Butterfly => "Butterfly",
            RoofType::Skillion => "Skillion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RoofMaterial {
    ConcreteTiles,
    ClayTiles,
    #[default]
    MetalSheets,
    BoxProfile,
    Thatch,
    Slate,
    AsphaltShingles,
    GreenRoof,
    Membrane,
}

impl RoofMaterial {
    pub fn display_name(&self) -> &'static str {
        match self {
            RoofMaterial::ConcreteTiles => "Concrete tiles",
            RoofMaterial::ClayTiles => "Clay tiles",
            RoofMaterial::MetalSheets => "Metal sheets",
            RoofMaterial::BoxProfile => "Box profile",
            RoofMaterial::Thatch => "Thatch",
            RoofMaterial::Slate => "Slate",
            RoofMaterial::AsphaltShingles => "Asphalt shingles",
            RoofMaterial::GreenRoof => "Green roof",
            RoofMaterial::Membrane => "Membrane",
        }
    }
}

/// Sawn section, width × depth in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimberSize {
    #[serde(rename = "50x25")]
    S50x25,
    #[serde(rename = "50x50")]
    S50x50,
    #[serde(rename = "75x50")]
    S75x50,
    #[default]
    #[serde(rename = "100x50")]
    S100x50,
    #[serde(rename = "100x75")]
    S100x75,
    #[serde(rename = "150x50")]
    S150x50,
    #[serde(rename = "200x50")]
    S200x50,
}

impl TimberSize {
    /// Section in millimetres
    pub fn mm(&self) -> (f64, f64) {
        match self {
            TimberSize::S50x25 => (50.0, 25.0),
            TimberSize::S50x50 => (50.0, 50.0),
            TimberSize::S75x50 => (75.0, 50.0),
            TimberSize::S100x50 => (100.0, 50.0),
            TimberSize::S100x75 => (100.0, 75.0),
            TimberSize::S150x50 => (150.0, 50.0),
            TimberSize::S200x50 => (200.0, 50.0),
        }
    }

    /// Cross-section area (m²)
    pub fn section_m2(&self) -> f64 {
        let (w, d) = self.mm();
        w / 1000.0 * d / 1000.0
    }

    pub fn label(&self) -> String {
        let (w, d) = self.mm();
        format!("{}x{}", w, d)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnderlaymentType {
    #[serde(rename = "felt-30")]
    Felt30,
    #[serde(rename = "felt-40")]
    Felt40,
    Synthetic,
    Rubberized,
    Breathable,
}

impl UnderlaymentType {
    pub fn display_name(&self) -> &'static str {
        match self {
            UnderlaymentType::Felt30 => "Felt 30",
            UnderlaymentType::Felt40 => "Felt 40",
            UnderlaymentType::Synthetic => "Synthetic",
            UnderlaymentType::Rubberized => "Rubberized",
            UnderlaymentType::Breathable => "Breathable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsulationType {
    GlassWool,
    RockWool,
    Eps,
    Xps,
    Polyurethane,
    ReflectiveFoil,
}

impl InsulationType {
    pub fn display_name(&self) -> &'static str {
        match self {
            InsulationType::GlassWool => "Glass wool",
            InsulationType::RockWool => "Rock wool",
            InsulationType::Eps => "EPS",
            InsulationType::Xps => "XPS",
            InsulationType::Polyurethane => "Polyurethane",
            InsulationType::ReflectiveFoil => "Reflective foil",
        }
    }
}

/// Material of a gutter, downpipe, flashing, fascia or soffit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AccessoryMaterial {
    #[default]
    #[serde(rename = "PVC", alias = "pvc")]
    Pvc,
    #[serde(rename = "Galvanized Steel", alias = "galvanized-steel")]
    GalvanizedSteel,
    #[serde(rename = "Aluminum", alias = "aluminum")]
    Aluminum,
    #[serde(rename = "Copper", alias = "copper")]
    Copper,
    #[serde(rename = "Painted Wood", alias = "painted-wood")]
    PaintedWood,
    #[serde(rename = "Composite", alias = "composite")]
    Composite,
    #[serde(rename = "Concrete", alias = "concrete")]
    Concrete,
}

impl AccessoryMaterial {
    pub fn display_name(&self) -> &'static str {
        match self {
            AccessoryMaterial::Pvc => "PVC",
            AccessoryMaterial::GalvanizedSteel => "Galvanized Steel",
            AccessoryMaterial::Aluminum => "Aluminum",
            AccessoryMaterial::Copper => "Copper",
            AccessoryMaterial::PaintedWood => "Painted Wood",
            AccessoryMaterial::Composite => "Composite",
            AccessoryMaterial::Concrete => "Concrete",
        }
    }
}

/// Timber members of one kind and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofTimber {
    /// Member, e.g. "rafter", "purlin", "wall plate"
    #[serde(rename = "type", default)]
    pub member: String,
    #[serde(default)]
    pub size: TimberSize,
    /// Centres (mm); informational
    #[serde(default, deserialize_with = "lenient::number")]
    pub spacing: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub length: f64,
    #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
    pub quantity: f64,
    #[serde(default)]
    pub treatment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoofInsulation {
    #[serde(rename = "type")]
    pub kind: InsulationType,
    /// Thickness (mm)
    #[serde(default, deserialize_with = "lenient::number")]
    pub thickness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoofCovering {
    pub underlayment: Option<UnderlaymentType>,
    pub insulation: Option<RoofInsulation>,
}

/// Lengths in metres; downpipes in pieces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoofAccessories {
    #[serde(deserialize_with = "lenient::number")]
    pub gutters: f64,
    pub gutter_type: AccessoryMaterial,
    #[serde(deserialize_with = "lenient::number")]
    pub downpipes: f64,
    pub downpipe_type: AccessoryMaterial,
    #[serde(deserialize_with = "lenient::number")]
    pub flashings: f64,
    pub flashing_type: AccessoryMaterial,
    #[serde(deserialize_with = "lenient::number")]
    pub fascia: f64,
    pub fascia_type: AccessoryMaterial,
    #[serde(deserialize_with = "lenient::number")]
    pub soffit: f64,
    pub soffit_type: AccessoryMaterial,
    /// Ridge capping; the roof's ridge length when absent
    #[serde(deserialize_with = "lenient::optional_number")]
    pub ridge_caps: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    pub valley_trays: Option<f64>,
}

/// One roof on the quote.
///
/// ## JSON Example
///
/// ```json
/// {
///   "name": "Main roof",
///   "roof_type": "hip",
///   "material": "concrete-tiles",
///   "length": 12, "width": 9, "pitch": 25, "eaves_overhang": 0.6,
///   "covering": { "underlayment": "felt-30" },
///   "timbers": [{ "type": "rafter", "size": "100x50", "length": 5.5, "quantity": 24 }],
///   "accessories": { "gutters": 42, "gutter_type": "PVC", "downpipes": 4 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofStructure {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roof_type: RoofType,
    #[serde(default)]
    pub material: RoofMaterial,
    /// Plan area (m²); measured from the footprint when zero
    #[serde(default, deserialize_with = "lenient::number")]
    pub area: f64,
    /// Degrees from horizontal
    #[serde(default, deserialize_with = "lenient::number")]
    pub pitch: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub length: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub width: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub eaves_overhang: f64,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub ridge_length: Option<f64>,
    #[serde(default)]
    pub covering: RoofCovering,
    #[serde(default)]
    pub timbers: Vec<RoofTimber>,
    #[serde(default)]
    pub accessories: Option<RoofAccessories>,
}

impl RoofStructure {
    pub fn new(name: impl Into<String>, roof_type: RoofType) -> Self {
        RoofStructure {
            id: Uuid::new_v4(),
            name: name.into(),
            roof_type,
            material: RoofMaterial::default(),
            area: 0.0,
            pitch: 0.0,
            length: 0.0,
            width: 0.0,
            eaves_overhang: 0.0,
            ridge_length: None,
            covering: RoofCovering::default(),
            timbers: Vec::new(),
            accessories: None,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofingResult {
    pub row_id: Uuid,
    pub name: String,
    pub roof_type: RoofType,
    pub material: RoofMaterial,
    pub plan_area_m2: f64,
    /// 1 / cos(pitch); 1 for flat roofs
    pub pitch_factor: f64,
    pub roof_area_m2: f64,
    pub timber_volume_m3: f64,
    /// Timber against a nominal 50 mm over the plan, capped at 100 %
    pub timber_utilization: f64,
    pub lines: Vec<MaterialLine>,
    pub issues: Vec<String>,
}

// ============================================================================
// Calculation
// ============================================================================

pub fn calculate(roof: &RoofStructure, settings: &QsSettings) -> RoofingResult {
    let wastage = settings.wastage_fraction(WastageCategory::Roofing);
    let mut issues = Vec::new();

    let plan_area = plan_area(roof);
    if plan_area <= 0.0 {
        issues.push("Roof area must be > 0 (give an area or a length and width)".to_string());
    }
    let pitch_factor = pitch_factor(roof, &mut issues);
    let roof_area = plan_area * pitch_factor;

    let mut lines = Vec::new();
    let mut timber_volume = 0.0;
    if plan_area > 0.0 {
        lines.push(MaterialLine::new(
            MaterialRef::new(MaterialKind::RoofCovering).with_variant(roof.material.display_name()),
            Unit::SquareMeter,
            Component::Roofing,
            roof_area,
            wastage,
        ));
        if let Some(underlayment) = roof.covering.underlayment {
            lines.push(MaterialLine::new(
                MaterialRef::new(MaterialKind::Underlayment)
                    .with_variant(underlayment.display_name()),
                Unit::SquareMeter,
                Component::Roofing,
                roof_area,
                wastage,
            ));
        }
        if let Some(insulation) = roof.covering.insulation {
            lines.push(MaterialLine::new(
                MaterialRef::new(MaterialKind::Insulation)
                    .with_variant(insulation.kind.display_name())
                    .with_grade(format!("{} mm", finite_non_negative(insulation.thickness))),
                Unit::SquareMeter,
                Component::Roofing,
                roof_area,
                wastage,
            ));
        }

        for timber in &roof.timbers {
            let volume = timber_volume_m3(timber);
            timber_volume += volume;
            lines.push(MaterialLine::new(
                MaterialRef::new(MaterialKind::Timber).with_variant(timber.size.label()),
                Unit::CubicMeter,
                Component::Roofing,
                volume,
                wastage,
            ));
        }

        if let Some(accessories) = &roof.accessories {
            lines.extend(accessory_lines(accessories, roof.ridge_length, wastage));
        }
    }

    let nominal = plan_area * NOMINAL_TIMBER_DEPTH_M;
    let timber_utilization = if nominal > 0.0 {
        (timber_volume / nominal * 100.0).min(100.0)
    } else {
        100.0
    };

    RoofingResult {
        row_id: roof.id,
        name: roof.name.clone(),
        roof_type: roof.roof_type,
        material: roof.material,
        plan_area_m2: plan_area,
        pitch_factor,
        roof_area_m2: roof_area,
        timber_volume_m3: timber_volume,
        timber_utilization,
        lines: keep_non_empty(lines),
        issues,
    }
}

/// Plan area: the given area, or the footprint plus overhang all round.
pub fn plan_area(roof: &RoofStructure) -> f64 {
    let area = finite_non_negative(roof.area);
    if area > 0.0 {
        return area;
    }
    let length = finite_non_negative(roof.length);
    let width = finite_non_negative(roof.width);
    if length <= 0.0 || width <= 0.0 {
        return 0.0;
    }
    let overhang = finite_non_negative(roof.eaves_overhang);
    (length + 2.0 * overhang) * (width + 2.0 * overhang)
}

fn pitch_factor(roof: &RoofStructure, issues: &mut Vec<String>) -> f64 {
    if roof.roof_type == RoofType::Flat {
        return 1.0;
    }
    let pitch = roof.pitch;
    if !(pitch.is_finite() && (0.0..=MAX_PITCH_DEGREES).contains(&pitch)) {
        issues.push(format!(
            "Pitch must be between 0 and {} degrees; measured as flat",
            MAX_PITCH_DEGREES
        ));
        return 1.0;
    }
    1.0 / pitch.to_radians().cos()
}

/// Section × length × quantity (m³)
pub fn timber_volume_m3(timber: &RoofTimber) -> f64 {
    timber.size.section_m2() * finite_non_negative(timber.length) * finite_non_negative(timber.quantity)
}

fn accessory_lines(
    accessories: &RoofAccessories,
    ridge_length: Option<f64>,
    wastage: f64,
) -> Vec<MaterialLine> {
    let line = |kind: MaterialKind, material: AccessoryMaterial, unit: Unit, quantity: f64| {
        MaterialLine::new(
            MaterialRef::new(kind).with_variant(material.display_name()),
            unit,
            Component::Roofing,
            finite_non_negative(quantity),
            wastage,
        )
    };
    let ridge = accessories.ridge_caps.or(ridge_length).unwrap_or(0.0);
    vec![
        line(MaterialKind::Gutters, accessories.gutter_type, Unit::Meter, accessories.gutters),
        line(MaterialKind::Downpipes, accessories.downpipe_type, Unit::Piece, accessories.downpipes),
        line(MaterialKind::Flashings, accessories.flashing_type, Unit::Meter, accessories.flashings),
        line(MaterialKind::Fascia, accessories.fascia_type, Unit::Meter, accessories.fascia),
        line(MaterialKind::Soffit, accessories.soffit_type, Unit::Meter, accessories.soffit),
        line(MaterialKind::RidgeCaps, AccessoryMaterial::Concrete, Unit::Meter, ridge),
        line(
            MaterialKind::ValleyTrays,
            AccessoryMaterial::GalvanizedSteel,
            Unit::Meter,
            accessories.valley_trays.unwrap_or(0.0),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn gable() -> RoofStructure {
        let mut roof = RoofStructure::new("Main roof", RoofType::Gable);
        roof.length = 10.0;
        roof.width = 8.0;
        roof.eaves_overhang = 0.5;
        roof.pitch = 30.0;
        roof.material = RoofMaterial::ConcreteTiles;
        roof.covering.underlayment = Some(UnderlaymentType::Felt30);
        roof.timbers.push(RoofTimber {
            member: "rafter".to_string(),
            size: TimberSize::S100x50,
            spacing: 600.0,
            length: 5.0,
            quantity: 20.0,
            treatment: String::new(),
        });
        roof
    }

    fn find(result: &RoofingResult, kind: MaterialKind) -> Option<&MaterialLine> {
        result.lines.iter().find(|l| l.material.kind == kind)
    }

    #[test]
    fn test_pitched_area_from_footprint() {
        let result = calculate(&gable(), &QsSettings::default());
        // 11 x 9 on plan
        assert!(approx(result.plan_area_m2, 99.0));
        assert!(approx(result.pitch_factor, 1.0 / 30f64.to_radians().cos()));
        assert!(approx(result.roof_area_m2, 99.0 * result.pitch_factor));
        assert!(result.issues.is_empty());

        let covering = find(&result, MaterialKind::RoofCovering).unwrap();
        assert_eq!(covering.material.variant.as_deref(), Some("Concrete tiles"));
        assert!(approx(covering.net, result.roof_area_m2));
        assert!(approx(covering.wastage_fraction, 0.07));
        assert!(find(&result, MaterialKind::Underlayment).is_some());
        assert!(find(&result, MaterialKind::Insulation).is_none());
    }

    #[test]
    fn test_given_area_wins_and_flat_ignores_pitch() {
        let mut roof = gable();
        roof.roof_type = RoofType::Flat;
        roof.area = 120.0;
        let result = calculate(&roof, &QsSettings::default());
        assert_eq!(result.pitch_factor, 1.0);
        assert!(approx(result.roof_area_m2, 120.0));
    }

    #[test]
    fn test_timber_volume() {
        let result = calculate(&gable(), &QsSettings::default());
        // 0.1 x 0.05 x 5 m x 20
        assert!(approx(result.timber_volume_m3, 0.5));
        let timber = find(&result, MaterialKind::Timber).unwrap();
        assert_eq!(timber.material.variant.as_deref(), Some("100x50"));
        assert_eq!(timber.unit, Unit::CubicMeter);
        assert!(approx(timber.gross, 0.5 * 1.07));
        // 0.5 m³ against 99 m² x 0.05
        assert!(approx(result.timber_utilization, 0.5 / 4.95 * 100.0));
    }

    #[test]
    fn test_accessories() {
        let mut roof = gable();
        roof.ridge_length = Some(11.0);
        roof.accessories = Some(RoofAccessories {
            gutters: 40.0,
            gutter_type: AccessoryMaterial::GalvanizedSteel,
            downpipes: 4.0,
            fascia: 40.0,
            ..RoofAccessories::default()
        });
        let result = calculate(&roof, &QsSettings::default());

        let gutters = find(&result, MaterialKind::Gutters).unwrap();
        assert_eq!(gutters.material.label(), "Gutters Galvanized Steel");
        assert_eq!(gutters.unit, Unit::Meter);
        assert_eq!(find(&result, MaterialKind::Downpipes).unwrap().unit, Unit::Piece);
        assert!(approx(find(&result, MaterialKind::RidgeCaps).unwrap().net, 11.0));
        assert!(find(&result, MaterialKind::Flashings).is_none());
        assert!(find(&result, MaterialKind::ValleyTrays).is_none());
    }

    #[test]
    fn test_bad_pitch_measured_flat() {
        let mut roof = gable();
        roof.pitch = 89.0;
        let result = calculate(&roof, &QsSettings::default());
        assert_eq!(result.pitch_factor, 1.0);
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn test_no_plan_area_contributes_nothing() {
        let mut roof = gable();
        roof.width = 0.0;
        roof.accessories = Some(RoofAccessories {
            gutters: 40.0,
            ..RoofAccessories::default()
        });
        let result = calculate(&roof, &QsSettings::default());
        assert!(result.lines.is_empty());
        assert_eq!(result.roof_area_m2, 0.0);
        assert_eq!(result.timber_volume_m3, 0.0);
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn test_lenient_json() {
        let json = r#"{
            "name": "Store roof",
            "roof_type": "skillion",
            "material": "box-profile",
            "area": "36",
            "pitch": "10",
            "covering": { "insulation": { "type": "glass-wool", "thickness": 50 } },
            "timbers": [{ "type": "purlin", "size": "50x50", "length": 6 }],
            "accessories": { "gutters": "12", "gutter_type": "Aluminum" }
        }"#;
        let roof: RoofStructure = serde_json::from_str(json).unwrap();
        assert_eq!(roof.area, 36.0);
        assert_eq!(roof.timbers[0].quantity, 1.0);
        assert_eq!(roof.timbers[0].size, TimberSize::S50x50);

        let result = calculate(&roof, &QsSettings::default());
        let insulation = find(&result, MaterialKind::Insulation).unwrap();
        assert_eq!(insulation.material.label(), "Roof insulation Glass wool 50 mm");
        assert_eq!(
            find(&result, MaterialKind::Gutters).unwrap().material.variant.as_deref(),
            Some("Aluminum")
        );
    }
}
