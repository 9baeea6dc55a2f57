//! Plumbing installation takeoff.
//!
//! A plumbing system lists pipe sections by material and diameter and the
//! sanitary fittings they serve. Pipes are billed by the metre and fittings
//! by the piece, both with the plumbing wastage allowance.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{keep_non_empty, Component, MaterialLine};
use crate::materials::{MaterialKind, MaterialRef};
use crate::settings::{QsSettings, WastageCategory};
use crate::units::{finite_non_negative, lenient, Unit};

/// Pipe allowance per fitting when comparing against the installed length (m)
pub const DESIGN_PIPE_PER_FIXTURE_M: f64 = 15.0;

// ============================================================================
// Input Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PlumbingSystemType {
    #[default]
    WaterSupply,
    Drainage,
    Sewage,
    Rainwater,
    HotWater,
    FireFighting,
    GasPiping,
    Irrigation,
}

impl PlumbingSystemType {
    pub fn display_name(&self) -> &'static str {
        match self {
            PlumbingSystemType::WaterSupply => "Water supply",
            PlumbingSystemType::Drainage => "Drainage",
            PlumbingSystemType::Sewage => "Sewage",
            PlumbingSystemType::Rainwater => "Rainwater",
            PlumbingSystemType::HotWater => "Hot water",
            PlumbingSystemType::FireFighting => "Fire fighting",
            PlumbingSystemType::GasPiping => "Gas piping",
            PlumbingSystemType::Irrigation => "Irrigation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PipeMaterial {
    #[default]
    #[serde(rename = "pvc-u")]
    PvcU,
    #[serde(rename = "pvc-c")]
    PvcC,
    Copper,
    Pex,
    GalvanizedSteel,
    Hdpe,
    Ppr,
    CastIron,
    VitrifiedClay,
}

impl PipeMaterial {
    pub fn display_name(&self) -> &'static str {
        match self {
            PipeMaterial::PvcU => "PVC-u",
            PipeMaterial::PvcC => "PVC-c",
            PipeMaterial::Copper => "Copper",
            PipeMaterial::Pex => "PEX",
            PipeMaterial::GalvanizedSteel => "Galvanized steel",
            PipeMaterial::Hdpe => "HDPE",
            PipeMaterial::Ppr => "PPR",
            PipeMaterial::CastIron => "Cast iron",
            PipeMaterial::VitrifiedClay => "Vitrified clay",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixtureType {
    WaterCloset,
    Urinal,
    Lavatory,
    KitchenSink,
    Shower,
    Bathtub,
    Bidet,
    FloorDrain,
    Cleanout,
    HoseBib,
}

impl FixtureType {
    pub fn display_name(&self) -> &'static str {
        match self {
            FixtureType::WaterCloset => "Water closet",
            FixtureType::Urinal => "Urinal",
            FixtureType::Lavatory => "Lavatory",
            FixtureType::KitchenSink => "Kitchen sink",
            FixtureType::Shower => "Shower",
            FixtureType::Bathtub => "Bathtub",
            FixtureType::Bidet => "Bidet",
            FixtureType::FloorDrain => "Floor drain",
            FixtureType::Cleanout => "Cleanout",
            FixtureType::HoseBib => "Hose bib",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FixtureQuality {
    #[default]
    Standard,
    Premium,
    Luxury,
}

impl FixtureQuality {
    /// Grade key in the price tables
    pub fn grade(&self) -> &'static str {
        match self {
            FixtureQuality::Standard => "standard",
            FixtureQuality::Premium => "premium",
            FixtureQuality::Luxury => "luxury",
        }
    }
}

/// Pipe of one material and diameter run `quantity` times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeSection {
    #[serde(default)]
    pub material: PipeMaterial,
    /// Nominal diameter (mm)
    #[serde(default, deserialize_with = "lenient::number")]
    pub diameter: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub length: f64,
    #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
    pub quantity: f64,
    /// Pressure class (bar); informational
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub pressure_rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FixtureConnections {
    pub water_supply: bool,
    pub drainage: bool,
    pub vent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlumbingFixture {
    #[serde(rename = "type")]
    pub fixture_type: FixtureType,
    #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
    pub count: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub quality: FixtureQuality,
    /// Litres per use; informational
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub water_consumption: Option<f64>,
    #[serde(default)]
    pub connections: FixtureConnections,
}

/// One plumbing system on the quote.
///
/// ## JSON Example
///
/// ```json
/// {
///   "name": "Cold water",
///   "system_type": "water-supply",
///   "pipes": [{ "material": "ppr", "diameter": 20, "length": 35, "quantity": 2 }],
///   "fixtures": [{ "type": "water-closet", "count": 3, "quality": "premium" }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlumbingSystem {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub system_type: PlumbingSystemType,
    #[serde(default)]
    pub pipes: Vec<PipeSection>,
    #[serde(default)]
    pub fixtures: Vec<PlumbingFixture>,
}

impl PlumbingSystem {
    pub fn new(name: impl Into<String>, system_type: PlumbingSystemType) -> Self {
        PlumbingSystem {
            id: Uuid::new_v4(),
            name: name.into(),
            system_type,
            pipes: Vec::new(),
            fixtures: Vec::new(),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlumbingResult {
    pub row_id: Uuid,
    pub name: String,
    pub system_type: PlumbingSystemType,
    pub pipe_length_m: f64,
    pub fixture_count: f64,
    /// Installed pipe against the per-fitting allowance, capped at 150 %
    pub material_utilization: f64,
    pub lines: Vec<MaterialLine>,
    pub issues: Vec<String>,
}

// ============================================================================
// Calculation
// ============================================================================

pub fn calculate(system: &PlumbingSystem, settings: &QsSettings) -> PlumbingResult {
    let wastage = settings.wastage_fraction(WastageCategory::Plumbing);
    let mut issues = Vec::new();
    let mut lines = Vec::new();

    let mut pipe_length = 0.0;
    for pipe in &system.pipes {
        let metres = finite_non_negative(pipe.length) * finite_non_negative(pipe.quantity);
        if metres <= 0.0 {
            continue;
        }
        if !(pipe.diameter.is_finite() && pipe.diameter > 0.0) {
            issues.push(format!(
                "{} pipe diameter must be > 0",
                pipe.material.display_name()
            ));
            continue;
        }
        pipe_length += metres;
        lines.push(MaterialLine::new(
            MaterialRef::new(MaterialKind::Pipes)
                .with_variant(pipe.material.display_name())
                .with_grade(format!("{} mm", pipe.diameter)),
            Unit::Meter,
            Component::Plumbing,
            metres,
            wastage,
        ));
    }

    let mut fixture_count = 0.0;
    for fixture in &system.fixtures {
        let count = finite_non_negative(fixture.count);
        fixture_count += count;
        lines.push(MaterialLine::new(
            MaterialRef::new(MaterialKind::SanitaryFittings)
                .with_variant(fixture.fixture_type.display_name())
                .with_grade(fixture.quality.grade()),
            Unit::Piece,
            Component::Plumbing,
            count,
            wastage,
        ));
    }

    let design_length = system.fixtures.len() as f64 * DESIGN_PIPE_PER_FIXTURE_M;
    let material_utilization = if design_length > 0.0 {
        (pipe_length / design_length * 100.0).min(150.0)
    } else {
        100.0
    };

    PlumbingResult {
        row_id: system.id,
        name: system.name.clone(),
        system_type: system.system_type,
        pipe_length_m: pipe_length,
        fixture_count,
        material_utilization,
        lines: keep_non_empty(lines),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn cold_water() -> PlumbingSystem {
        let mut system = PlumbingSystem::new("Cold water", PlumbingSystemType::WaterSupply);
        system.pipes.push(PipeSection {
            material: PipeMaterial::Ppr,
            diameter: 20.0,
            length: 35.0,
            quantity: 2.0,
            pressure_rating: Some(16.0),
        });
        system.fixtures.push(PlumbingFixture {
            fixture_type: FixtureType::WaterCloset,
            count: 3.0,
            location: "Bathrooms".to_string(),
            quality: FixtureQuality::Premium,
            water_consumption: None,
            connections: FixtureConnections::default(),
        });
        system
    }

    #[test]
    fn test_pipe_and_fixture_lines() {
        let result = calculate(&cold_water(), &QsSettings::default());
        assert!(result.issues.is_empty());
        assert!(approx(result.pipe_length_m, 70.0));
        assert!(approx(result.fixture_count, 3.0));
        assert_eq!(result.lines.len(), 2);

        let pipe = &result.lines[0];
        assert_eq!(pipe.material.label(), "Pipes PPR 20 mm");
        assert_eq!(pipe.unit, Unit::Meter);
        assert_eq!(pipe.component, Component::Plumbing);
        assert!(approx(pipe.gross, 70.0 * 1.03));

        let fitting = &result.lines[1];
        assert_eq!(fitting.material.label(), "Sanitary fittings Water closet premium");
        assert_eq!(fitting.unit, Unit::Piece);
        assert!(approx(fitting.net, 3.0));
    }

    #[test]
    fn test_utilization() {
        let result = calculate(&cold_water(), &QsSettings::default());
        // 70 m against one fitting entry at 15 m
        assert!(approx(result.material_utilization, 150.0));

        let mut system = cold_water();
        system.pipes[0].length = 3.0;
        let result = calculate(&system, &QsSettings::default());
        assert!(approx(result.material_utilization, 40.0));

        let empty = PlumbingSystem::new("Empty", PlumbingSystemType::Drainage);
        assert_eq!(calculate(&empty, &QsSettings::default()).material_utilization, 100.0);
    }

    #[test]
    fn test_pipe_without_diameter_is_reported() {
        let mut system = cold_water();
        system.pipes[0].diameter = 0.0;
        let result = calculate(&system, &QsSettings::default());
        assert_eq!(result.pipe_length_m, 0.0);
        assert_eq!(result.issues, vec!["PPR pipe diameter must be > 0".to_string()]);
        assert!(result.lines.iter().all(|l| l.material.kind != MaterialKind::Pipes));
    }

    #[test]
    fn test_lenient_json() {
        let json = r#"{
            "name": "Soil stack",
            "system_type": "drainage",
            "pipes": [{ "material": "pvc-u", "diameter": "110", "length": "12" }],
            "fixtures": [{ "type": "floor-drain", "count": "2.7" }]
        }"#;
        let system: PlumbingSystem = serde_json::from_str(json).unwrap();
        assert_eq!(system.pipes[0].quantity, 1.0);
        assert_eq!(system.fixtures[0].count, 2.0);
        assert_eq!(system.fixtures[0].quality, FixtureQuality::Standard);

        let result = calculate(&system, &QsSettings::default());
        assert_eq!(result.lines[0].material.label(), "Pipes PVC-u 110 mm");
        assert_eq!(result.lines[1].material.label(), "Sanitary fittings Floor drain standard");
    }
}
