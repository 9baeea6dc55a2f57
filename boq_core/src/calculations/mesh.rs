//! Welded fabric mesh layout.
//!
//! Sheets are laid with a lap on every joint, so each sheet covers
//! (sheet length − lap) × (sheet width − lap) of new ground:
//!
//! sheets = ⌈L / (sL − lap)⌉ × ⌈W / (sW − lap)⌉
//!
//! Steel is weighed on the net area (L × W × kg/m²); laps and offcuts are
//! covered by the mesh wastage allowance. A layout that cannot be laid
//! (bad sheet, or a lap as large as the sheet) weighs nothing.

use serde::{Deserialize, Serialize};

use super::{ceil_count, Component, MaterialLine};
use crate::materials::{MaterialKind, MaterialRef, MeshGrade, MeshSheet};
use crate::settings::QsSettings;
use crate::units::{finite_non_negative, lenient, Unit};

/// Mesh choices on a reinforcement row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MeshOptions {
    pub grade: MeshGrade,
    pub sheet: MeshSheet,
    /// Lap between sheets (m); the settings lap when absent
    #[serde(deserialize_with = "lenient::optional_number")]
    pub lap: Option<f64>,
}

/// Sheet layout and steel weight for one mesh row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshResult {
    pub grade: MeshGrade,
    pub sheet: MeshSheet,
    pub lap: f64,
    pub sheets_along_length: f64,
    pub sheets_along_width: f64,
    /// All sheets including repetitions
    pub sheet_count: f64,
    pub lap_area_m2: f64,
    pub net_area_m2: f64,
    pub net_weight_kg: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Lay out mesh sheets over `count` panels of `length` × `width`.
pub fn calculate(
    length: f64,
    width: f64,
    count: f64,
    options: &MeshOptions,
    settings: &QsSettings,
) -> MeshResult {
    let mut issues = Vec::new();
    let sheet = options.sheet;
    let lap = options.lap.unwrap_or(settings.rebar.mesh_lap);

    if !(sheet.width > 0.0) {
        issues.push("Sheet width must be > 0".to_string());
    }
    if !(sheet.length > 0.0) {
        issues.push("Sheet length must be > 0".to_string());
    }
    if !(lap >= 0.0) {
        issues.push("Lap length must be >= 0".to_string());
    }
    let layout_ok = issues.is_empty() && lap < sheet.width.min(sheet.length);
    if issues.is_empty() && !layout_ok {
        issues.push("Lap length must be smaller than the sheet".to_string());
    }

    let length = finite_non_negative(length);
    let width = finite_non_negative(width);
    let count = finite_non_negative(count);
    let net_area = length * width * count;

    let (along_length, along_width, lap_area) = if layout_ok && net_area > 0.0 {
        let along_length = ceil_count(length / (sheet.length - lap));
        let along_width = ceil_count(width / (sheet.width - lap));
        let lap_area =
            ((along_length - 1.0) * width * lap + (along_width - 1.0) * length * lap) * count;
        (along_length, along_width, lap_area)
    } else {
        (0.0, 0.0, 0.0)
    };

    MeshResult {
        grade: options.grade,
        sheet,
        lap: finite_non_negative(lap),
        sheets_along_length: along_length,
        sheets_along_width: along_width,
        sheet_count: along_length * along_width * count,
        lap_area_m2: lap_area,
        net_area_m2: net_area,
        net_weight_kg: if layout_ok {
            net_area * options.grade.kg_per_m2()
        } else {
            0.0
        },
        issues,
    }
}

/// Bill line for the mesh steel, weighed in kilograms.
pub fn mesh_line(result: &MeshResult, settings: &QsSettings) -> MaterialLine {
    MaterialLine::new(
        MaterialRef::new(MaterialKind::Mesh)
            .with_variant(result.grade.display_name())
            .with_grade(result.sheet.label()),
        Unit::Kilogram,
        Component::Reinforcement,
        result.net_weight_kg,
        settings.mesh_wastage_fraction(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_layout() {
        let settings = QsSettings::default();
        let result = calculate(10.0, 5.0, 1.0, &MeshOptions::default(), &settings);

        // 10 / 4.5 -> 3 sheets, 5 / 2.1 -> 3 sheets
        assert_eq!(result.sheets_along_length, 3.0);
        assert_eq!(result.sheets_along_width, 3.0);
        assert_eq!(result.sheet_count, 9.0);
        assert!((result.lap_area_m2 - (2.0 * 5.0 * 0.3 + 2.0 * 10.0 * 0.3)).abs() < 1e-9);
        assert!((result.net_weight_kg - 50.0 * 2.22).abs() < 1e-9);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_repetitions_scale_everything() {
        let settings = QsSettings::default();
        let one = calculate(6.0, 4.0, 1.0, &MeshOptions::default(), &settings);
        let three = calculate(6.0, 4.0, 3.0, &MeshOptions::default(), &settings);
        assert_eq!(three.sheet_count, one.sheet_count * 3.0);
        assert!((three.net_weight_kg - one.net_weight_kg * 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_sheet_reports_issues() {
        let settings = QsSettings::default();
        let options = MeshOptions {
            sheet: MeshSheet {
                width: 0.0,
                length: 4.8,
            },
            lap: Some(-0.1),
            ..MeshOptions::default()
        };
        let result = calculate(6.0, 4.0, 1.0, &options, &settings);
        assert!(result.issues.contains(&"Sheet width must be > 0".to_string()));
        assert!(result.issues.contains(&"Lap length must be >= 0".to_string()));
        assert_eq!(result.sheet_count, 0.0);
        assert_eq!(result.net_weight_kg, 0.0);
    }

    #[test]
    fn test_lap_as_wide_as_sheet() {
        let options = MeshOptions {
            lap: Some(2.4),
            ..MeshOptions::default()
        };
        let settings = QsSettings::default();
        let result = calculate(6.0, 4.0, 1.0, &options, &settings);
        assert_eq!(result.sheet_count, 0.0);
        assert_eq!(result.net_weight_kg, 0.0);
        assert!(mesh_line(&result, &settings).is_empty());
        assert_eq!(
            result.issues,
            vec!["Lap length must be smaller than the sheet".to_string()]
        );
    }

    #[test]
    fn test_mesh_line_uses_mesh_wastage() {
        let settings = QsSettings::default();
        let result = calculate(10.0, 5.0, 1.0, &MeshOptions::default(), &settings);
        let line = mesh_line(&result, &settings);
        assert_eq!(line.material.variant.as_deref(), Some("A142"));
        assert!((line.gross - line.net * 1.05).abs() < 1e-9);
    }
}
