//! Electrical installation takeoff.
//!
//! An electrical system lists cable runs, outlets, light fittings and
//! distribution boards. Each becomes a priced line; the system also reports
//! its connected load and a few efficiency figures used on the quote.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{keep_non_empty, Component, MaterialLine};
use crate::materials::{MaterialKind, MaterialRef};
use crate::settings::{QsSettings, WastageCategory};
use crate::units::{finite_non_negative, lenient, Unit};

/// Cable allowance per point when comparing against the installed length (m)
pub const DESIGN_CABLE_PER_POINT_M: f64 = 20.0;
/// Average run per point for quick estimates (m)
pub const ESTIMATE_CABLE_PER_POINT_M: f64 = 18.0;
/// Diversity applied to socket outlets
pub const OUTLET_DIVERSITY: f64 = 0.7;
/// Fittings at or below this wattage count as efficient (W)
pub const EFFICIENT_FITTING_WATTS: f64 = 20.0;

// ============================================================================
// Input Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SystemType {
    #[default]
    Lighting,
    Power,
    Data,
    Security,
    Cctv,
    FireAlarm,
    AccessControl,
    AvSystems,
    EmergencyLighting,
    RenewableEnergy,
}

impl SystemType {
    pub fn display_name(&self) -> &'static str {
        match self {
            SystemType::Lighting => "Lighting",
            SystemType::Power => "Power",
            SystemType::Data => "Data",
            SystemType::Security => "Security",
            SystemType::Cctv => "CCTV",
            SystemType::FireAlarm => "Fire alarm",
            SystemType::AccessControl => "Access control",
            SystemType::AvSystems => "AV systems",
            SystemType::EmergencyLighting => "Emergency lighting",
            SystemType::RenewableEnergy => "Renewable energy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    #[default]
    Switch,
    Dimmer,
    Sensor,
    Smart,
}

impl ControlType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ControlType::Switch => "Switch",
            ControlType::Dimmer => "Dimmer",
            ControlType::Sensor => "Sensor",
            ControlType::Smart => "Smart",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoardType {
    #[default]
    Main,
    Sub,
}

/// A cable type and size run `quantity` times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableRun {
    /// Cable type as priced, e.g. "NYM-J", "SWA"
    #[serde(rename = "type", default)]
    pub cable_type: String,
    /// Conductor size (mm²)
    #[serde(default, deserialize_with = "lenient::number")]
    pub size: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub length: f64,
    #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlet {
    /// Outlet type as priced, e.g. "power-socket"
    #[serde(rename = "type", default)]
    pub outlet_type: String,
    #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
    pub count: f64,
    /// Rating (A)
    #[serde(default, deserialize_with = "lenient::number")]
    pub rating: f64,
    #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
    pub gang: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingFixture {
    #[serde(rename = "type", default)]
    pub fixture_type: String,
    #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
    pub count: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub wattage: f64,
    #[serde(default)]
    pub control: ControlType,
    #[serde(default)]
    pub emergency: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionBoard {
    #[serde(rename = "type", default)]
    pub board_type: BoardType,
    #[serde(default, deserialize_with = "lenient::number")]
    pub circuits: f64,
}

fn default_voltage() -> f64 {
    230.0
}

/// One electrical system on the quote.
///
/// ## JSON Example
///
/// ```json
/// {
///   "name": "Ground floor power",
///   "system_type": "power",
///   "voltage": 230,
///   "cables": [{ "type": "NYM-J", "size": 2.5, "length": 40, "quantity": 3 }],
///   "outlets": [{ "type": "power-socket", "count": 12, "rating": 13 }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricalSystem {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub system_type: SystemType,
    #[serde(default = "default_voltage", deserialize_with = "lenient::number")]
    pub voltage: f64,
    #[serde(default)]
    pub cables: Vec<CableRun>,
    #[serde(default)]
    pub outlets: Vec<Outlet>,
    #[serde(default)]
    pub lighting: Vec<LightingFixture>,
    #[serde(default)]
    pub distribution_boards: Vec<DistributionBoard>,
}

impl ElectricalSystem {
    pub fn new(name: impl Into<String>, system_type: SystemType) -> Self {
        ElectricalSystem {
            id: Uuid::new_v4(),
            name: name.into(),
            system_type,
            voltage: default_voltage(),
            cables: Vec::new(),
            outlets: Vec::new(),
            lighting: Vec::new(),
            distribution_boards: Vec::new(),
        }
    }

    /// Outlets plus light fittings
    pub fn point_count(&self) -> f64 {
        self.outlets.iter().map(|o| finite_non_negative(o.count)).sum::<f64>()
            + self
                .lighting
                .iter()
                .map(|l| finite_non_negative(l.count))
                .sum::<f64>()
    }
}

// ============================================================================
// Results
// ============================================================================

/// Percent figures, each 0 to 100 except cable utilisation (capped at 150).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyMetrics {
    pub cable_utilization: f64,
    pub circuit_efficiency: f64,
    pub energy_efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricalResult {
    pub row_id: Uuid,
    pub name: String,
    pub system_type: SystemType,
    pub cable_length_m: f64,
    pub outlet_count: f64,
    pub fitting_count: f64,
    pub power_load_kw: f64,
    pub efficiency: EfficiencyMetrics,
    pub lines: Vec<MaterialLine>,
    pub issues: Vec<String>,
}

// ============================================================================
// Calculation
// ============================================================================

pub fn calculate(system: &ElectricalSystem, settings: &QsSettings) -> ElectricalResult {
    let wastage = settings.wastage_fraction(WastageCategory::Electricals);
    let mut issues = Vec::new();
    let mut lines = Vec::new();

    for cable in &system.cables {
        let metres = finite_non_negative(cable.length) * finite_non_negative(cable.quantity);
        if cable.cable_type.trim().is_empty() && metres > 0.0 {
            issues.push("Cable run has no cable type".to_string());
        }
        lines.push(MaterialLine::new(
            MaterialRef::new(MaterialKind::Cable)
                .with_variant(cable.cable_type.trim())
                .with_grade(format!("{} mm²", finite_non_negative(cable.size))),
            Unit::Meter,
            Component::Electrical,
            metres,
            wastage,
        ));
    }

    for outlet in &system.outlets {
        lines.push(MaterialLine::new(
            MaterialRef::new(MaterialKind::Outlets)
                .with_variant(outlet.outlet_type.trim())
                .with_grade(format!("{} A", finite_non_negative(outlet.rating))),
            Unit::Piece,
            Component::Electrical,
            finite_non_negative(outlet.count),
            wastage,
        ));
    }

    for fixture in &system.lighting {
        lines.push(MaterialLine::new(
            MaterialRef::new(MaterialKind::Lighting)
                .with_variant(fixture.fixture_type.trim())
                .with_grade(format!(
                    "{}W - {}",
                    finite_non_negative(fixture.wattage),
                    fixture.control.display_name()
                )),
            Unit::Piece,
            Component::Electrical,
            finite_non_negative(fixture.count),
            wastage,
        ));
    }

    for board in &system.distribution_boards {
        let variant = match board.board_type {
            BoardType::Main => "main-db",
            BoardType::Sub => "sub-db",
        };
        lines.push(MaterialLine::exact(
            MaterialRef::new(MaterialKind::DistributionBoard)
                .with_variant(variant)
                .with_grade(format!("{}-way", finite_non_negative(board.circuits))),
            Unit::Piece,
            Component::Electrical,
            1.0,
        ));
    }

    ElectricalResult {
        row_id: system.id,
        name: system.name.clone(),
        system_type: system.system_type,
        cable_length_m: cable_length(system),
        outlet_count: system.outlets.iter().map(|o| finite_non_negative(o.count)).sum(),
        fitting_count: system.lighting.iter().map(|l| finite_non_negative(l.count)).sum(),
        power_load_kw: power_load_kw(system),
        efficiency: efficiency(system),
        lines: keep_non_empty(lines),
        issues,
    }
}

/// Installed cable, Σ length × quantity (m)
pub fn cable_length(system: &ElectricalSystem) -> f64 {
    system
        .cables
        .iter()
        .map(|c| finite_non_negative(c.length) * finite_non_negative(c.quantity))
        .sum()
}

/// Connected load: lighting at full wattage, outlets at 70 % diversity.
pub fn power_load_kw(system: &ElectricalSystem) -> f64 {
    let lighting: f64 = system
        .lighting
        .iter()
        .map(|l| finite_non_negative(l.wattage) * finite_non_negative(l.count) / 1000.0)
        .sum();
    let voltage = finite_non_negative(system.voltage);
    let outlets: f64 = system
        .outlets
        .iter()
        .map(|o| finite_non_negative(o.rating) * finite_non_negative(o.count) * voltage / 1000.0)
        .sum();
    lighting + outlets * OUTLET_DIVERSITY
}

pub fn efficiency(system: &ElectricalSystem) -> EfficiencyMetrics {
    // entries, not counts
    let entries = (system.outlets.len() + system.lighting.len()) as f64;

    let design_length = entries * DESIGN_CABLE_PER_POINT_M;
    let cable_utilization = if design_length > 0.0 {
        cable_length(system) / design_length * 100.0
    } else {
        100.0
    };

    let circuits: f64 = system
        .distribution_boards
        .iter()
        .map(|b| finite_non_negative(b.circuits))
        .sum();
    let circuit_efficiency = if circuits > 0.0 {
        entries / circuits * 100.0
    } else {
        100.0
    };

    let energy_efficiency = if system.lighting.is_empty() {
        100.0
    } else {
        let efficient = system
            .lighting
            .iter()
            .filter(|l| l.wattage <= EFFICIENT_FITTING_WATTS)
            .count();
        efficient as f64 / system.lighting.len() as f64 * 100.0
    };

    EfficiencyMetrics {
        cable_utilization: cable_utilization.min(150.0),
        circuit_efficiency: circuit_efficiency.min(100.0),
        energy_efficiency,
    }
}

/// Rough cable length for a system before runs are measured.
pub fn estimate_cable_length(system: &ElectricalSystem) -> f64 {
    system.point_count() * ESTIMATE_CABLE_PER_POINT_M
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> ElectricalSystem {
        let mut system = ElectricalSystem::new("Ground floor", SystemType::Power);
        system.cables.push(CableRun {
            cable_type: "NYM-J".to_string(),
            size: 2.5,
            length: 40.0,
            quantity: 3.0,
        });
        system.outlets.push(Outlet {
            outlet_type: "power-socket".to_string(),
            count: 10.0,
            rating: 13.0,
            gang: 2.0,
        });
        system.lighting.push(LightingFixture {
            fixture_type: "led-downlight".to_string(),
            count: 8.0,
            wattage: 12.0,
            control: ControlType::Dimmer,
            emergency: false,
        });
        system.lighting.push(LightingFixture {
            fixture_type: "floodlight".to_string(),
            count: 2.0,
            wattage: 50.0,
            control: ControlType::Sensor,
            emergency: false,
        });
        system.distribution_boards.push(DistributionBoard {
            board_type: BoardType::Main,
            circuits: 12.0,
        });
        system
    }

    #[test]
    fn test_lines_and_grades() {
        let result = calculate(&system(), &QsSettings::default());
        let grades: Vec<&str> = result
            .lines
            .iter()
            .filter_map(|l| l.material.grade.as_deref())
            .collect();
        assert_eq!(grades, vec!["2.5 mm²", "13 A", "12W - Dimmer", "50W - Sensor", "12-way"]);

        let cable = &result.lines[0];
        assert_eq!(cable.unit, Unit::Meter);
        assert!((cable.net - 120.0).abs() < 1e-9);
        assert!((cable.gross - 120.0 * 1.02).abs() < 1e-9);
        assert_eq!(result.cable_length_m, 120.0);
    }

    #[test]
    fn test_power_load() {
        // lighting 96 + 100 W, outlets 10 × 13 A × 230 V at 70 %
        let expected = 0.196 + 29.9 * 0.7;
        assert!((power_load_kw(&system()) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_efficiency_metrics() {
        let metrics = efficiency(&system());
        // 120 m against 3 entries × 20 m
        assert_eq!(metrics.cable_utilization, 150.0);
        assert_eq!(metrics.circuit_efficiency, 25.0);
        assert_eq!(metrics.energy_efficiency, 50.0);
    }

    #[test]
    fn test_empty_system() {
        let system = ElectricalSystem::new("Empty", SystemType::Data);
        let result = calculate(&system, &QsSettings::default());
        assert!(result.lines.is_empty());
        assert_eq!(result.power_load_kw, 0.0);
        assert_eq!(result.efficiency.cable_utilization, 100.0);
        assert_eq!(estimate_cable_length(&system), 0.0);
    }

    #[test]
    fn test_cable_estimate() {
        assert_eq!(estimate_cable_length(&system()), 20.0 * 18.0);
    }

    #[test]
    fn test_lenient_json() {
        let json = r#"{
            "name": "Lights",
            "cables": [{ "type": "PVC/PVC", "size": "1.5", "length": "25" }],
            "lighting": [{ "type": "halogen", "count": "4", "wattage": 35, "control": "smart" }]
        }"#;
        let system: ElectricalSystem = serde_json::from_str(json).unwrap();
        assert_eq!(system.voltage, 230.0);
        assert_eq!(system.cables[0].quantity, 1.0);
        assert_eq!(system.lighting[0].count, 4.0);
        assert_eq!(system.lighting[0].control, ControlType::Smart);
    }
}
