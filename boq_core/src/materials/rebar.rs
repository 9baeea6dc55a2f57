//! Reinforcement Reference Data
//!
//! High-yield deformed bar sizes (Y8 to Y25), welded fabric mesh grades and
//! the standard mesh sheet sizes sold on site.
//!
//! ## Unit Weights
//!
//! Bar mass per metre follows d²/162 (d in mm), tabulated to three
//! significant figures the way suppliers quote them.

use serde::{Deserialize, Serialize};

/// High-yield bar size designation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum RebarSize {
    Y8,
    Y10,
    #[default]
    Y12,
    Y16,
    Y20,
    Y25,
}

impl RebarSize {
    /// All sizes, smallest first
    pub const ALL: [RebarSize; 6] = [
        RebarSize::Y8,
        RebarSize::Y10,
        RebarSize::Y12,
        RebarSize::Y16,
        RebarSize::Y20,
        RebarSize::Y25,
    ];

    /// Nominal diameter in millimetres
    pub fn diameter_mm(&self) -> f64 {
        match self {
            RebarSize::Y8 => 8.0,
            RebarSize::Y10 => 10.0,
            RebarSize::Y12 => 12.0,
            RebarSize::Y16 => 16.0,
            RebarSize::Y20 => 20.0,
            RebarSize::Y25 => 25.0,
        }
    }

    /// Nominal diameter in metres
    pub fn diameter_m(&self) -> f64 {
        self.diameter_mm() / 1000.0
    }

    /// Mass per metre run (kg/m)
    pub fn kg_per_m(&self) -> f64 {
        match self {
            RebarSize::Y8 => 0.395,
            RebarSize::Y10 => 0.617,
            RebarSize::Y12 => 0.888,
            RebarSize::Y16 => 1.58,
            RebarSize::Y20 => 2.47,
            RebarSize::Y25 => 3.85,
        }
    }

    /// Cross-sectional area (mm²)
    pub fn area_mm2(&self) -> f64 {
        match self {
            RebarSize::Y8 => 50.27,
            RebarSize::Y10 => 78.54,
            RebarSize::Y12 => 113.1,
            RebarSize::Y16 => 201.06,
            RebarSize::Y20 => 314.16,
            RebarSize::Y25 => 490.87,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RebarSize::Y8 => "Y8",
            RebarSize::Y10 => "Y10",
            RebarSize::Y12 => "Y12",
            RebarSize::Y16 => "Y16",
            RebarSize::Y20 => "Y20",
            RebarSize::Y25 => "Y25",
        }
    }

    /// Parse "Y12", "y12" or "12". Unknown text yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix('Y')
            .or_else(|| trimmed.strip_prefix('y'))
            .unwrap_or(trimmed);
        RebarSize::ALL
            .into_iter()
            .find(|size| size.display_name()[1..] == *digits)
    }
}

impl std::fmt::Display for RebarSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Welded fabric mesh grade.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum MeshGrade {
    #[default]
    A142,
    A193,
    A252,
    A393,
    C283,
    C385,
}

impl MeshGrade {
    pub const ALL: [MeshGrade; 6] = [
        MeshGrade::A142,
        MeshGrade::A193,
        MeshGrade::A252,
        MeshGrade::A393,
        MeshGrade::C283,
        MeshGrade::C385,
    ];

    /// Mass per square metre of sheet (kg/m²)
    pub fn kg_per_m2(&self) -> f64 {
        match self {
            MeshGrade::A142 => 2.22,
            MeshGrade::A193 => 3.02,
            MeshGrade::A252 => 3.95,
            MeshGrade::A393 => 6.16,
            MeshGrade::C283 => 4.34,
            MeshGrade::C385 => 6.0,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MeshGrade::A142 => "A142",
            MeshGrade::A193 => "A193",
            MeshGrade::A252 => "A252",
            MeshGrade::A393 => "A393",
            MeshGrade::C283 => "C283",
            MeshGrade::C385 => "C385",
        }
    }
}

impl std::fmt::Display for MeshGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Mesh sheet size in metres (width × length).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshSheet {
    pub width: f64,
    pub length: f64,
}

impl Default for MeshSheet {
    fn default() -> Self {
        MeshSheet::STANDARD[0]
    }
}

impl MeshSheet {
    /// Sheet sizes stocked by suppliers
    pub const STANDARD: [MeshSheet; 5] = [
        MeshSheet {
            width: 2.4,
            length: 4.8,
        },
        MeshSheet {
            width: 2.4,
            length: 6.0,
        },
        MeshSheet {
            width: 2.4,
            length: 7.2,
        },
        MeshSheet {
            width: 3.0,
            length: 6.0,
        },
        MeshSheet {
            width: 3.6,
            length: 6.0,
        },
    ];

    pub fn area(&self) -> f64 {
        self.width * self.length
    }

    /// Label such as "2.4 x 4.8 m"
    pub fn label(&self) -> String {
        format!("{} x {} m", self.width, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_weight_matches_d2_over_162() {
        for size in RebarSize::ALL {
            let d = size.diameter_mm();
            let expected = d * d / 162.0;
            assert!(
                (size.kg_per_m() - expected).abs() / expected < 0.01,
                "{} off by more than 1%",
                size
            );
        }
    }

    #[test]
    fn test_parse_sizes() {
        assert_eq!(RebarSize::parse("Y16"), Some(RebarSize::Y16));
        assert_eq!(RebarSize::parse("y8"), Some(RebarSize::Y8));
        assert_eq!(RebarSize::parse("20"), Some(RebarSize::Y20));
        assert_eq!(RebarSize::parse("Y14"), None);
        assert_eq!(RebarSize::parse(""), None);
    }

    #[test]
    fn test_mesh_grades() {
        assert_eq!(MeshGrade::default().kg_per_m2(), 2.22);
        assert_eq!(MeshGrade::A393.kg_per_m2(), 6.16);
        assert_eq!(MeshSheet::default().area(), 2.4 * 4.8);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&RebarSize::Y12).unwrap();
        assert_eq!(json, "\"Y12\"");
        let grade: MeshGrade = serde_json::from_str("\"C283\"").unwrap();
        assert_eq!(grade, MeshGrade::C283);
    }
}
