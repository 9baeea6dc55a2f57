//! # Totals
//!
//! Sums costed rows into per-material, per-trade and per-category totals.
//!
//! Totals are always rebuilt from scratch. Aggregation is a plain sum, so
//! the totals of any partition of the rows [`combine`](Totals::combine) to
//! the totals of the whole set, up to float rounding.
//!
//! Materials whose total cost is zero (unpriced or non-billable) are left
//! out of the material list rather than shown as zero-value lines.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::calculations::CalculationItem;
//! use boq_core::totals::aggregate;
//!
//! let rows: Vec<CalculationItem> = Vec::new();
//! let totals = aggregate(&rows, &[]);
//! assert_eq!(totals.grand_total, 0.0);
//! assert!(totals.materials.is_empty());
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculations::{CalculationItem, ItemResult, Trade};
use crate::elements::BuildingCategory;
use crate::materials::MaterialRef;
use crate::pricing::CostedItem;
use crate::units::Unit;

/// Total of one material in one unit across all rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTotal {
    pub material: MaterialRef,
    pub unit: Unit,
    pub net: f64,
    pub gross: f64,
    pub cost: f64,
}

impl MaterialTotal {
    fn key(&self) -> (MaterialRef, Unit) {
        (self.material.clone(), self.unit)
    }
}

/// Headline quantities shown beside the money totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlineQuantities {
    pub concrete_m3: f64,
    pub wall_area_m2: f64,
    pub reinforcement_kg: f64,
    pub cable_m: f64,
    pub finishes_m2: f64,
    pub roof_area_m2: f64,
    pub pipe_m: f64,
}

impl HeadlineQuantities {
    fn add(&mut self, other: &HeadlineQuantities) {
        self.concrete_m3 += other.concrete_m3;
        self.wall_area_m2 += other.wall_area_m2;
        self.reinforcement_kg += other.reinforcement_kg;
        self.cable_m += other.cable_m;
        self.finishes_m2 += other.finishes_m2;
        self.roof_area_m2 += other.roof_area_m2;
        self.pipe_m += other.pipe_m;
    }

    fn of(result: &ItemResult) -> Self {
        let mut q = HeadlineQuantities::default();
        match result {
            ItemResult::Concrete(r) => q.concrete_m3 = r.volume_m3,
            ItemResult::Masonry(r) => q.wall_area_m2 = r.net_wall_area_m2,
            ItemResult::Rebar(r) => q.reinforcement_kg = r.total_weight_kg,
            ItemResult::Electrical(r) => q.cable_m = r.cable_length_m,
            ItemResult::Finish(r) if r.unit == Unit::SquareMeter => q.finishes_m2 = r.quantity,
            ItemResult::Finish(_) => {}
            ItemResult::Roofing(r) => q.roof_area_m2 = r.roof_area_m2,
            ItemResult::Plumbing(r) => q.pipe_m = r.pipe_length_m,
        }
        q
    }
}

/// Aggregated totals for a set of rows.
///
/// ## JSON Example
///
/// ```json
/// {
///   "materials": [
///     { "material": { "kind": "cement" }, "unit": "bag", "net": 40.0, "gross": 42.0, "cost": 33600.0 }
///   ],
///   "by_trade": { "concrete": 33600.0 },
///   "by_category": { "substructure": 33600.0 },
///   "quantities": { "concrete_m3": 6.0, "wall_area_m2": 0.0, "reinforcement_kg": 0.0, "cable_m": 0.0, "finishes_m2": 0.0, "roof_area_m2": 0.0, "pipe_m": 0.0 },
///   "grand_total": 33600.0,
///   "row_count": 1
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Totals {
    /// Sorted by material then unit
    pub materials: Vec<MaterialTotal>,
    pub by_trade: BTreeMap<Trade, f64>,
    pub by_category: BTreeMap<BuildingCategory, f64>,
    pub quantities: HeadlineQuantities,
    pub grand_total: f64,
    pub row_count: usize,
}

impl Totals {
    /// Sum two sets of totals, as if their rows had been aggregated together.
    pub fn combine(&self, other: &Totals) -> Totals {
        let mut materials: BTreeMap<(MaterialRef, Unit), MaterialTotal> = BTreeMap::new();
        for total in self.materials.iter().chain(&other.materials) {
            materials
                .entry(total.key())
                .and_modify(|t| {
                    t.net += total.net;
                    t.gross += total.gross;
                    t.cost += total.cost;
                })
                .or_insert_with(|| total.clone());
        }

        let mut by_trade = self.by_trade.clone();
        for (trade, cost) in &other.by_trade {
            *by_trade.entry(*trade).or_insert(0.0) += cost;
        }
        let mut by_category = self.by_category.clone();
        for (category, cost) in &other.by_category {
            *by_category.entry(*category).or_insert(0.0) += cost;
        }

        let mut quantities = self.quantities;
        quantities.add(&other.quantities);

        Totals {
            materials: materials.into_values().collect(),
            by_trade,
            by_category,
            quantities,
            grand_total: self.grand_total + other.grand_total,
            row_count: self.row_count + other.row_count,
        }
    }

    pub fn material(&self, material: &MaterialRef, unit: Unit) -> Option<&MaterialTotal> {
        self.materials
            .iter()
            .find(|t| &t.material == material && t.unit == unit)
    }

    pub fn trade_total(&self, trade: Trade) -> f64 {
        self.by_trade.get(&trade).copied().unwrap_or(0.0)
    }

    pub fn category_total(&self, category: BuildingCategory) -> f64 {
        self.by_category.get(&category).copied().unwrap_or(0.0)
    }
}

/// Aggregate the costed results of `rows`.
///
/// Results whose row is not in `rows` (deleted rows, stale results) are
/// ignored.
pub fn aggregate(rows: &[CalculationItem], costed: &[CostedItem]) -> Totals {
    let live: BTreeSet<Uuid> = rows.iter().map(|r| r.id()).collect();

    let mut materials: BTreeMap<(MaterialRef, Unit), MaterialTotal> = BTreeMap::new();
    let mut by_trade: BTreeMap<Trade, f64> = BTreeMap::new();
    let mut by_category: BTreeMap<BuildingCategory, f64> = BTreeMap::new();
    let mut quantities = HeadlineQuantities::default();
    let mut grand_total = 0.0;
    let mut row_count = 0;

    for item in costed.iter().filter(|c| live.contains(&c.row_id())) {
        row_count += 1;
        for costed_line in &item.lines {
            let line = &costed_line.line;
            let total = materials
                .entry((line.material.clone(), line.unit))
                .or_insert_with(|| MaterialTotal {
                    material: line.material.clone(),
                    unit: line.unit,
                    net: 0.0,
                    gross: 0.0,
                    cost: 0.0,
                });
            total.net += line.net;
            total.gross += line.gross;
            total.cost += costed_line.cost;
        }

        *by_trade.entry(item.result.trade()).or_insert(0.0) += item.total_cost;
        *by_category.entry(item.result.category()).or_insert(0.0) += item.total_cost;
        quantities.add(&HeadlineQuantities::of(&item.result));
        grand_total += item.total_cost;
    }

    Totals {
        materials: materials.into_values().filter(|t| t.cost > 0.0).collect(),
        by_trade,
        by_category,
        quantities,
        grand_total,
        row_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::finishes::{FinishCategory, FinishElement, FinishUnit};
    use crate::calculations::plumbing::{PipeMaterial, PipeSection, PlumbingSystem, PlumbingSystemType};
    use crate::calculations::roofing::{RoofStructure, RoofType};
    use crate::materials::MaterialKind;
    use crate::pricing::{cost_item, MaterialPrice, PriceBook, PriceInputs, PriceVariant};
    use crate::settings::QsSettings;

    fn book() -> PriceBook {
        let inputs = PriceInputs {
            base_prices: vec![
                MaterialPrice::structured(
                    "flooring",
                    "flooring",
                    "m²",
                    vec![PriceVariant::new("Ceramic tiles", 1000.0)],
                ),
                MaterialPrice::structured(
                    "paint",
                    "paint",
                    "m²",
                    vec![PriceVariant::new("Emulsion", 300.0)],
                ),
                MaterialPrice::structured(
                    "roof covering",
                    "roof covering",
                    "m²",
                    vec![PriceVariant::new("Metal sheets", 900.0)],
                ),
                MaterialPrice::structured("pipes", "pipes", "m", vec![PriceVariant::new("PPR", 250.0)]),
            ],
            ..PriceInputs::default()
        };
        PriceBook::resolve("Nairobi", "u1", &inputs).unwrap()
    }

    fn finish(category: FinishCategory, material: &str, qty: f64) -> CalculationItem {
        CalculationItem::Finish(FinishElement::new(category, material, FinishUnit::SquareMeter, qty))
    }

    fn cost_all(rows: &[CalculationItem]) -> Vec<CostedItem> {
        let settings = QsSettings::default();
        let book = book();
        rows.iter()
            .map(|r| cost_item(&r.calculate(&settings), &book))
            .collect()
    }

    #[test]
    fn test_aggregate_sums_rows() {
        let rows = vec![
            finish(FinishCategory::Flooring, "Ceramic tiles", 10.0),
            finish(FinishCategory::Flooring, "Ceramic tiles", 5.0),
            finish(FinishCategory::Paint, "Emulsion", 40.0),
        ];
        let totals = aggregate(&rows, &cost_all(&rows));

        assert_eq!(totals.row_count, 3);
        assert_eq!(totals.materials.len(), 2);
        let tiles = MaterialRef::new(MaterialKind::Finish)
            .with_variant("flooring")
            .with_grade("Ceramic tiles");
        let tiles = totals.material(&tiles, Unit::SquareMeter).unwrap();
        assert!((tiles.net - 15.0).abs() < 1e-9);
        assert!((tiles.cost - 15.0 * 1.08 * 1000.0).abs() < 1e-6);

        let expected = (15.0 * 1000.0 + 40.0 * 300.0) * 1.08;
        assert!((totals.grand_total - expected).abs() < 1e-6);
        assert!((totals.trade_total(Trade::Finishes) - expected).abs() < 1e-6);
        assert!((totals.quantities.finishes_m2 - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_roofing_and_plumbing_totals() {
        let mut roof = RoofStructure::new("Roof", RoofType::Flat);
        roof.area = 50.0;
        let mut cold_water = PlumbingSystem::new("Cold water", PlumbingSystemType::WaterSupply);
        cold_water.pipes.push(PipeSection {
            material: PipeMaterial::Ppr,
            diameter: 20.0,
            length: 30.0,
            quantity: 1.0,
            pressure_rating: None,
        });
        let rows = vec![CalculationItem::Roofing(roof), CalculationItem::Plumbing(cold_water)];
        let totals = aggregate(&rows, &cost_all(&rows));

        assert!((totals.quantities.roof_area_m2 - 50.0).abs() < 1e-9);
        assert!((totals.quantities.pipe_m - 30.0).abs() < 1e-9);
        assert!((totals.trade_total(Trade::Roofing) - 50.0 * 1.07 * 900.0).abs() < 1e-6);
        assert!((totals.trade_total(Trade::Plumbing) - 30.0 * 1.03 * 250.0).abs() < 1e-6);
        assert_eq!(totals.materials.len(), 2);
    }

    #[test]
    fn test_stale_results_ignored() {
        let rows = vec![finish(FinishCategory::Flooring, "Ceramic tiles", 10.0)];
        let mut costed = cost_all(&rows);
        let removed = vec![finish(FinishCategory::Paint, "Emulsion", 40.0)];
        costed.extend(cost_all(&removed));

        let totals = aggregate(&rows, &costed);
        assert_eq!(totals.row_count, 1);
        assert_eq!(totals.materials.len(), 1);
    }

    #[test]
    fn test_zero_cost_materials_omitted() {
        let rows = vec![finish(FinishCategory::Ceiling, "Gypsum", 12.0)];
        let totals = aggregate(&rows, &cost_all(&rows));
        assert!(totals.materials.is_empty());
        assert_eq!(totals.grand_total, 0.0);
        assert_eq!(totals.quantities.finishes_m2, 12.0);
    }

    #[test]
    fn test_partition_combines_to_whole() {
        let rows = vec![
            finish(FinishCategory::Flooring, "Ceramic tiles", 10.0),
            finish(FinishCategory::Paint, "Emulsion", 40.0),
            finish(FinishCategory::Flooring, "Ceramic tiles", 7.5),
        ];
        let costed = cost_all(&rows);
        let whole = aggregate(&rows, &costed);
        let left = aggregate(&rows[..1], &costed);
        let right = aggregate(&rows[1..], &costed);
        let combined = left.combine(&right);

        assert_eq!(combined.row_count, whole.row_count);
        assert_eq!(combined.materials.len(), whole.materials.len());
        assert!((combined.grand_total - whole.grand_total).abs() < 1e-6);
        for (a, b) in combined.materials.iter().zip(&whole.materials) {
            assert_eq!(a.material, b.material);
            assert!((a.gross - b.gross).abs() < 1e-9);
            assert!((a.cost - b.cost).abs() < 1e-6);
        }
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let rows = vec![
            finish(FinishCategory::Paint, "Emulsion", 40.0),
            finish(FinishCategory::Flooring, "Ceramic tiles", 10.0),
        ];
        let costed = cost_all(&rows);
        assert_eq!(aggregate(&rows, &costed), aggregate(&rows, &costed));
    }
}
