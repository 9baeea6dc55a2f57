//! Finishes takeoff: flooring, ceilings, wall finishes, paint, glazing and
//! joinery, each measured directly in m², m or pieces.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{keep_non_empty, Component, MaterialLine};
use crate::materials::{MaterialKind, MaterialRef};
use crate::settings::{QsSettings, WastageCategory};
use crate::units::{finite_non_negative, lenient, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FinishCategory {
    #[default]
    Flooring,
    Ceiling,
    WallFinishes,
    Paint,
    Glazing,
    Joinery,
}

impl FinishCategory {
    pub const ALL: [FinishCategory; 6] = [
        FinishCategory::Flooring,
        FinishCategory::Ceiling,
        FinishCategory::WallFinishes,
        FinishCategory::Paint,
        FinishCategory::Glazing,
        FinishCategory::Joinery,
    ];

    /// Price table holding this category's materials
    pub fn price_name(&self) -> &'static str {
        match self {
            FinishCategory::Flooring => "flooring",
            FinishCategory::Ceiling => "ceiling",
            FinishCategory::WallFinishes => "wall-finishes",
            FinishCategory::Paint => "paint",
            FinishCategory::Glazing => "glazing",
            FinishCategory::Joinery => "joinery",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FinishCategory::Flooring => "Flooring",
            FinishCategory::Ceiling => "Ceiling",
            FinishCategory::WallFinishes => "Wall finishes",
            FinishCategory::Paint => "Paint",
            FinishCategory::Glazing => "Glazing",
            FinishCategory::Joinery => "Joinery",
        }
    }
}

impl std::fmt::Display for FinishCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Measurement unit of a finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FinishUnit {
    #[default]
    #[serde(rename = "m²", alias = "m2", alias = "sqm")]
    SquareMeter,
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "pcs")]
    Pieces,
}

impl From<FinishUnit> for Unit {
    fn from(unit: FinishUnit) -> Self {
        match unit {
            FinishUnit::SquareMeter => Unit::SquareMeter,
            FinishUnit::Meter => Unit::Meter,
            FinishUnit::Pieces => Unit::Piece,
        }
    }
}

/// One finish item.
///
/// The measured quantity is `quantity` when given, otherwise `area`,
/// otherwise `length × width`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishElement {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: FinishCategory,
    /// Material as named in the category's price table, e.g. "Ceramic tiles"
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub unit: FinishUnit,
    #[serde(default, deserialize_with = "lenient::number")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub area: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub length: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub width: f64,
    #[serde(default)]
    pub location: Option<String>,
}

impl FinishElement {
    pub fn new(
        category: FinishCategory,
        material: impl Into<String>,
        unit: FinishUnit,
        quantity: f64,
    ) -> Self {
        let material = material.into();
        FinishElement {
            id: Uuid::new_v4(),
            name: material.clone(),
            category,
            material,
            unit,
            quantity,
            area: 0.0,
            length: 0.0,
            width: 0.0,
            location: None,
        }
    }

    pub fn measured_quantity(&self) -> f64 {
        [self.quantity, self.area]
            .into_iter()
            .map(finite_non_negative)
            .find(|q| *q > 0.0)
            .unwrap_or_else(|| finite_non_negative(self.length) * finite_non_negative(self.width))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishResult {
    pub row_id: Uuid,
    pub name: String,
    pub category: FinishCategory,
    pub material: String,
    pub quantity: f64,
    pub unit: Unit,
    pub lines: Vec<MaterialLine>,
    pub issues: Vec<String>,
}

pub fn calculate(finish: &FinishElement, settings: &QsSettings) -> FinishResult {
    let mut issues = Vec::new();
    let quantity = finish.measured_quantity();
    let material = finish.material.trim();
    if material.is_empty() {
        issues.push(format!("{} item has no material", finish.category));
    }
    if quantity <= 0.0 {
        issues.push(format!("{} quantity must be > 0", finish.category));
    }

    let unit = Unit::from(finish.unit);
    let line = MaterialLine::new(
        MaterialRef::new(MaterialKind::Finish)
            .with_variant(finish.category.price_name())
            .with_grade(material),
        unit,
        Component::Finish,
        quantity,
        settings.wastage_fraction(WastageCategory::Finishes),
    );

    let name = if finish.name.trim().is_empty() {
        material.to_string()
    } else {
        finish.name.clone()
    };

    FinishResult {
        row_id: finish.id,
        name,
        category: finish.category,
        material: material.to_string(),
        quantity,
        unit,
        lines: keep_non_empty(vec![line]),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_line() {
        let finish = FinishElement::new(
            FinishCategory::Flooring,
            "Ceramic tiles",
            FinishUnit::SquareMeter,
            40.0,
        );
        let result = calculate(&finish, &QsSettings::default());
        assert_eq!(result.quantity, 40.0);
        assert_eq!(result.unit, Unit::SquareMeter);

        let line = &result.lines[0];
        assert_eq!(line.material.price_name(), "flooring");
        assert_eq!(line.material.grade.as_deref(), Some("Ceramic tiles"));
        assert!((line.gross - 40.0 * 1.08).abs() < 1e-9);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_quantity_from_dimensions() {
        let mut finish = FinishElement::new(FinishCategory::Ceiling, "Gypsum", FinishUnit::SquareMeter, 0.0);
        finish.length = 5.0;
        finish.width = 4.0;
        assert_eq!(finish.measured_quantity(), 20.0);

        finish.area = 18.0;
        assert_eq!(finish.measured_quantity(), 18.0);
    }

    #[test]
    fn test_empty_finish_reports() {
        let finish = FinishElement::new(FinishCategory::Paint, "", FinishUnit::SquareMeter, 0.0);
        let result = calculate(&finish, &QsSettings::default());
        assert!(result.lines.is_empty());
        assert_eq!(result.issues.len(), 2);
    }

    #[test]
    fn test_unit_json() {
        let json = r#"{ "category": "joinery", "material": "Skirting", "unit": "m", "quantity": "36" }"#;
        let finish: FinishElement = serde_json::from_str(json).unwrap();
        assert_eq!(finish.category, FinishCategory::Joinery);
        assert_eq!(finish.unit, FinishUnit::Meter);
        assert_eq!(finish.quantity, 36.0);
        assert_eq!(Unit::from(FinishUnit::Pieces), Unit::Piece);
    }
}
