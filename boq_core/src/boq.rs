//! # Bill of Quantities
//!
//! Maps costed rows and totals onto bill sections.
//!
//! Every section starts with a header item carrying no amount; every other
//! item has `amount = quantity × rate`. A quote may carry a curated bill, in
//! which case it is normalised and returned as is. Otherwise the bill is
//! synthesised:
//!
//! | Bill | Built from |
//! |------|------------|
//! | Preliminaries | services, equipment, transport, permits |
//! | Substructure / Superstructure | concrete rows by category, masonry walling, roofing |
//! | Steel reinforcement | bar, mesh and binding wire totals |
//! | Internal finishes | wall plaster and finish rows |
//! | Doors and windows | masonry openings |
//! | Electrical and mechanical services | electrical and plumbing rows, mechanical sum |
//! | External works | external concrete rows, external works sums |
//!
//! Sections left holding only their header are dropped and the remaining
//! bills are numbered in order.
//!
//! Bill quantities follow the unit's [`RoundingRule`](crate::units::RoundingRule):
//! bags and pieces are shown whole, everything else to two decimals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculations::concrete::ConcreteResult;
use crate::calculations::masonry::{MasonryResult, PlasterOption};
use crate::calculations::{Component, ItemResult};
use crate::elements::BuildingCategory;
use crate::materials::{MaterialKind, MaterialRef};
use crate::pricing::{CostedItem, CostedLine};
use crate::totals::Totals;
use crate::units::{lenient, Unit};

/// Unit shown on lump-sum items
pub const SUM_UNIT: &str = "Sum";

/// `"{prefix}-{nnn}"`, e.g. `SUB-007`.
pub fn generate_item_number(prefix: &str, index: usize) -> String {
    format!("{}-{:03}", prefix, index)
}

// ============================================================================
// Bill Types
// ============================================================================

/// One line of a bill: a header or a priced item.
///
/// ## JSON Example
///
/// ```json
/// {
///   "item_no": "SUB-001",
///   "description": "Vibrated concrete (1:2:4) to foundation - Footings",
///   "unit": "m³",
///   "quantity": 6.0,
///   "rate": 14250.0,
///   "amount": 85500.0,
///   "category": "substructure",
///   "element": "Foundation",
///   "is_header": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoqItem {
    #[serde(alias = "itemNo")]
    pub item_no: String,
    pub description: String,
    pub unit: String,
    #[serde(deserialize_with = "lenient::number")]
    pub quantity: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub rate: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub amount: f64,
    pub category: String,
    pub element: String,
    #[serde(alias = "isHeader")]
    pub is_header: bool,
    #[serde(alias = "rowId", skip_serializing_if = "Option::is_none")]
    pub row_id: Option<Uuid>,
}

impl BoqItem {
    pub fn header(description: impl Into<String>, category: impl Into<String>) -> Self {
        BoqItem {
            description: description.into(),
            category: category.into(),
            element: "Header".to_string(),
            is_header: true,
            ..BoqItem::default()
        }
    }

    pub fn priced(
        description: impl Into<String>,
        unit: impl Into<String>,
        quantity: f64,
        rate: f64,
        category: impl Into<String>,
        element: impl Into<String>,
    ) -> Self {
        BoqItem {
            description: description.into(),
            unit: unit.into(),
            quantity,
            rate,
            amount: quantity * rate,
            category: category.into(),
            element: element.into(),
            ..BoqItem::default()
        }
    }

    /// Headers carry no amount; everything else is quantity × rate.
    pub fn normalized(mut self) -> Self {
        self.amount = if self.is_header {
            0.0
        } else {
            self.quantity * self.rate
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoqSection {
    pub title: String,
    pub items: Vec<BoqItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<f64>,
}

impl BoqSection {
    /// Sum of the priced items
    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .filter(|i| !i.is_header)
            .map(|i| i.amount)
            .sum()
    }

    pub fn is_header_only(&self) -> bool {
        self.items.iter().all(|i| i.is_header)
    }

    pub fn priced_items(&self) -> impl Iterator<Item = &BoqItem> {
        self.items.iter().filter(|i| !i.is_header)
    }
}

/// Flat export of one costed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoqLineItem {
    pub row_id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}

// ============================================================================
// Quote Context
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceItem {
    pub name: String,
    #[serde(deserialize_with = "lenient::number")]
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentItem {
    pub name: String,
    #[serde(alias = "desc")]
    pub description: String,
    pub usage_unit: String,
    #[serde(deserialize_with = "lenient::number")]
    pub usage_quantity: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub rate_per_unit: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub total_cost: f64,
}

/// Quote-level data the bill needs beyond the calculated rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoqContext {
    /// Bill curated outside the engine; replaces synthesis when non-empty
    #[serde(alias = "boq_data")]
    pub curated: Vec<BoqSection>,
    pub services: Vec<ServiceItem>,
    pub equipment: Vec<EquipmentItem>,
    #[serde(deserialize_with = "lenient::number")]
    pub transport_costs: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub equipment_costs: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub additional_services_cost: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub permit_cost: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub mechanical_cost: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub external_works_cost: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub landscaping_cost: f64,
}

// ============================================================================
// Bills
// ============================================================================

/// The synthesised bills, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bill {
    Preliminaries,
    Substructure,
    Superstructure,
    Reinforcement,
    Finishes,
    Openings,
    Services,
    ExternalWorks,
}

impl Bill {
    pub const ALL: [Bill; 8] = [
        Bill::Preliminaries,
        Bill::Substructure,
        Bill::Superstructure,
        Bill::Reinforcement,
        Bill::Finishes,
        Bill::Openings,
        Bill::Services,
        Bill::ExternalWorks,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Bill::Preliminaries => "PRELIMINARIES AND GENERAL ITEMS",
            Bill::Substructure => "SUBSTRUCTURE",
            Bill::Superstructure => "SUPERSTRUCTURE",
            Bill::Reinforcement => "STEEL REINFORCEMENT",
            Bill::Finishes => "INTERNAL FINISHES",
            Bill::Openings => "DOORS AND WINDOWS",
            Bill::Services => "ELECTRICAL AND MECHANICAL SERVICES",
            Bill::ExternalWorks => "EXTERNAL WORKS",
        }
    }

    /// Category written on every item of the bill
    pub fn category(&self) -> &'static str {
        match self {
            Bill::Preliminaries => "preliminaries",
            Bill::Substructure => "substructure",
            Bill::Superstructure => "superstructure",
            Bill::Reinforcement => "reinforcement",
            Bill::Finishes => "finishes",
            Bill::Openings => "openings",
            Bill::Services => "services",
            Bill::ExternalWorks => "external",
        }
    }

    pub fn item_prefix(&self) -> &'static str {
        match self {
            Bill::Preliminaries => "PRE",
            Bill::Substructure => "SUB",
            Bill::Superstructure => "SUP",
            Bill::Reinforcement => "STL",
            Bill::Finishes => "FIN",
            Bill::Openings => "DW",
            Bill::Services => "EMS",
            Bill::ExternalWorks => "EXT",
        }
    }
}

/// Items of one bill under construction.
struct BillBuilder {
    bill: Bill,
    items: Vec<BoqItem>,
}

impl BillBuilder {
    fn new(bill: Bill) -> Self {
        BillBuilder {
            bill,
            items: Vec::new(),
        }
    }

    /// A measured item at the displayed quantity, with the rate taken from
    /// that quantity so the amount equals `cost`. Unpriced or empty
    /// quantities are skipped.
    fn measured(
        &mut self,
        description: String,
        unit: Unit,
        quantity: f64,
        cost: f64,
        element: &str,
        row_id: Option<Uuid>,
    ) {
        if !(quantity > 0.0 && cost > 0.0) {
            return;
        }
        let shown = match unit.rounding().apply(quantity) {
            rounded if rounded > 0.0 => rounded,
            // too small to show at two decimals
            _ => quantity,
        };
        let mut item = BoqItem::priced(
            description,
            unit.symbol(),
            shown,
            cost / shown,
            self.bill.category(),
            element,
        );
        item.row_id = row_id;
        self.items.push(item);
    }

    fn lump_sum(&mut self, description: impl Into<String>, amount: f64, element: &str) {
        if amount > 0.0 {
            self.items.push(BoqItem::priced(
                description,
                SUM_UNIT,
                1.0,
                amount,
                self.bill.category(),
                element,
            ));
        }
    }

    fn groups(&mut self, groups: LineGroups, element: &str) {
        for ((material, unit), group) in groups.0 {
            self.measured(
                describe(&material),
                unit,
                group.quantity,
                group.cost,
                element,
                None,
            );
        }
    }

    /// `None` when only the header would remain.
    fn finish(self, number: usize) -> Option<BoqSection> {
        if self.items.is_empty() {
            return None;
        }
        let prefix = self.bill.item_prefix();
        let mut items = vec![BoqItem::header(self.bill.title(), self.bill.category())];
        items.extend(self.items.into_iter().enumerate().map(|(i, mut item)| {
            item.item_no = generate_item_number(prefix, i + 1);
            item
        }));
        let mut section = BoqSection {
            title: format!("BILL NO. {}: {}", number, self.bill.title()),
            items,
            summary: None,
        };
        section.summary = Some(section.total());
        Some(section)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Group {
    quantity: f64,
    cost: f64,
}

impl Group {
    fn add(&mut self, quantity: f64, cost: f64) {
        self.quantity += quantity;
        self.cost += cost;
    }
}

/// Costed lines merged by material and unit.
#[derive(Default)]
struct LineGroups(BTreeMap<(MaterialRef, Unit), Group>);

impl LineGroups {
    fn add(&mut self, line: &CostedLine) {
        self.0
            .entry((line.line.material.clone(), line.line.unit))
            .or_default()
            .add(line.line.gross, line.cost);
    }
}

fn is_steel(material: &MaterialRef) -> bool {
    matches!(
        material.kind,
        MaterialKind::Rebar | MaterialKind::Mesh | MaterialKind::BindingWire
    )
}

fn describe(material: &MaterialRef) -> String {
    match (material.kind, material.variant.as_deref(), material.grade.as_deref()) {
        (MaterialKind::Finish, Some(category), Some(name)) => format!("{} ({})", name, category),
        _ => material.label(),
    }
}

fn cost_of(item: &CostedItem, components: &[Component]) -> f64 {
    item.lines
        .iter()
        .filter(|l| !is_steel(&l.line.material) && components.contains(&l.line.component))
        .map(|l| l.cost)
        .sum()
}

// ============================================================================
// Mapping
// ============================================================================

/// Builders for every bill, in bill order.
struct Bills {
    preliminaries: BillBuilder,
    substructure: BillBuilder,
    superstructure: BillBuilder,
    reinforcement: BillBuilder,
    finishes: BillBuilder,
    openings: BillBuilder,
    services: BillBuilder,
    external_works: BillBuilder,
}

impl Bills {
    fn new() -> Self {
        Bills {
            preliminaries: BillBuilder::new(Bill::Preliminaries),
            substructure: BillBuilder::new(Bill::Substructure),
            superstructure: BillBuilder::new(Bill::Superstructure),
            reinforcement: BillBuilder::new(Bill::Reinforcement),
            finishes: BillBuilder::new(Bill::Finishes),
            openings: BillBuilder::new(Bill::Openings),
            services: BillBuilder::new(Bill::Services),
            external_works: BillBuilder::new(Bill::ExternalWorks),
        }
    }

    fn for_category(&mut self, category: BuildingCategory) -> &mut BillBuilder {
        match category {
            BuildingCategory::Substructure => &mut self.substructure,
            BuildingCategory::Superstructure => &mut self.superstructure,
            BuildingCategory::ExternalWorks => &mut self.external_works,
        }
    }

    /// Number the non-empty bills and drop the rest.
    fn finish(self) -> Vec<BoqSection> {
        [
            self.preliminaries,
            self.substructure,
            self.superstructure,
            self.reinforcement,
            self.finishes,
            self.openings,
            self.services,
            self.external_works,
        ]
        .into_iter()
        .filter(|b| !b.items.is_empty())
        .enumerate()
        .filter_map(|(i, b)| b.finish(i + 1))
        .collect()
    }
}

/// Build the bill for a quote.
pub fn to_boq(totals: &Totals, costed: &[CostedItem], context: &BoqContext) -> Vec<BoqSection> {
    if !context.curated.is_empty() {
        return normalize_curated(&context.curated);
    }

    let mut bills = Bills::new();
    preliminaries(&mut bills.preliminaries, context);

    let mut masonry = MasonryGroups::default();
    let mut finishes = LineGroups::default();
    let mut electrical = LineGroups::default();
    let mut roofing = LineGroups::default();
    let mut plumbing = LineGroups::default();

    for item in costed {
        match &item.result {
            ItemResult::Concrete(result) => {
                concrete_items(bills.for_category(result.category), item, result)
            }
            ItemResult::Masonry(result) => masonry.add(item, result),
            ItemResult::Finish(_) => item.lines.iter().for_each(|l| finishes.add(l)),
            ItemResult::Electrical(_) => item.lines.iter().for_each(|l| electrical.add(l)),
            ItemResult::Roofing(_) => item.lines.iter().for_each(|l| roofing.add(l)),
            ItemResult::Plumbing(_) => item.lines.iter().for_each(|l| plumbing.add(l)),
            // bars and mesh are billed from the totals
            ItemResult::Rebar(_) => {}
        }
    }

    masonry.bill(&mut bills.superstructure, &mut bills.finishes, &mut bills.openings);
    bills.superstructure.groups(roofing, "Roofing");
    bills.finishes.groups(finishes, "Finishes");

    for total in totals.materials.iter().filter(|t| is_steel(&t.material)) {
        bills.reinforcement.measured(
            total.material.label(),
            total.unit,
            total.gross,
            total.cost,
            "Reinforcement",
            None,
        );
    }

    bills.services.groups(electrical, "Electrical");
    bills.services.groups(plumbing, "Plumbing");
    bills.services.lump_sum(
        "Mechanical works and installations",
        context.mechanical_cost,
        "Mechanical",
    );

    bills
        .external_works
        .lump_sum("External works", context.external_works_cost, "External Works");
    bills
        .external_works
        .lump_sum("Landscaping works", context.landscaping_cost, "Landscaping");

    bills.finish()
}

/// Curated bills: titles filled in, a header first, amounts re-derived.
pub fn normalize_curated(sections: &[BoqSection]) -> Vec<BoqSection> {
    sections
        .iter()
        .enumerate()
        .map(|(i, section)| {
            let title = if section.title.trim().is_empty() {
                format!("BILL NO. {}", i + 1)
            } else {
                section.title.clone()
            };
            let mut items: Vec<BoqItem> =
                section.items.iter().cloned().map(BoqItem::normalized).collect();
            if !items.first().is_some_and(|i| i.is_header) {
                items.insert(0, BoqItem::header(title.clone(), ""));
            }
            let mut normalized = BoqSection {
                title,
                items,
                summary: None,
            };
            normalized.summary = Some(normalized.total());
            normalized
        })
        .collect()
}

fn preliminaries(bill: &mut BillBuilder, context: &BoqContext) {
    for service in &context.services {
        bill.lump_sum(service.name.clone(), service.price, "Service");
    }
    for equipment in context.equipment.iter().filter(|e| e.total_cost > 0.0) {
        let description = if equipment.description.trim().is_empty() {
            equipment.name.clone()
        } else {
            format!("{} - {}", equipment.name, equipment.description)
        };
        if equipment.usage_quantity > 0.0 && equipment.rate_per_unit > 0.0 {
            bill.items.push(BoqItem::priced(
                description,
                equipment.usage_unit.clone(),
                equipment.usage_quantity,
                equipment.rate_per_unit,
                bill.bill.category(),
                "Equipment",
            ));
        } else {
            bill.lump_sum(description, equipment.total_cost, "Equipment");
        }
    }
    bill.lump_sum("Transport of materials and personnel", context.transport_costs, "Transport");
    bill.lump_sum("Plant and equipment", context.equipment_costs, "Equipment");
    bill.lump_sum("Additional services", context.additional_services_cost, "Services");
    bill.lump_sum("Permits and approvals", context.permit_cost, "Permits");
}

fn concrete_items(bill: &mut BillBuilder, item: &CostedItem, result: &ConcreteResult) {
    let element = result.element.display_name();
    let row_id = Some(result.row_id);
    let label = if result.name.trim().is_empty() {
        element.to_string()
    } else {
        result.name.clone()
    };

    bill.measured(
        format!("Vibrated concrete ({}) to {} - {}", result.mix, element.to_lowercase(), label),
        Unit::CubicMeter,
        result.volume_m3,
        cost_of(item, &[Component::Concrete, Component::Water]),
        element,
        row_id,
    );
    bill.measured(
        format!("Formwork to {} - {}", element.to_lowercase(), label),
        Unit::SquareMeter,
        result.formwork_m2,
        cost_of(item, &[Component::Formwork]),
        element,
        row_id,
    );
    bill.lump_sum(
        format!("Foundation walling - {}", label),
        cost_of(item, &[Component::Walling, Component::Mortar]),
        element,
    );

    let mut rest = LineGroups::default();
    item.lines
        .iter()
        .filter(|l| {
            !is_steel(&l.line.material)
                && !matches!(
                    l.line.component,
                    Component::Concrete
                        | Component::Water
                        | Component::Formwork
                        | Component::Walling
                        | Component::Mortar
                )
        })
        .for_each(|l| rest.add(l));
    bill.groups(rest, element);
}

/// Masonry rows merged across rooms.
#[derive(Default)]
struct MasonryGroups {
    walling: BTreeMap<String, Group>,
    plaster: BTreeMap<String, Group>,
    lintels: Group,
    openings: LineGroups,
    other: LineGroups,
}

impl MasonryGroups {
    fn add(&mut self, item: &CostedItem, result: &MasonryResult) {
        self.walling
            .entry(result.block_type.display_name().to_string())
            .or_default()
            .add(
                result.net_wall_area_m2,
                cost_of(item, &[Component::Walling, Component::Mortar, Component::Water]),
            );
        if result.plaster != PlasterOption::None {
            self.plaster
                .entry(result.plaster.display_name().to_string())
                .or_default()
                .add(result.plaster_area_m2, cost_of(item, &[Component::Plaster]));
        }
        self.lintels
            .add(result.lintel_length_m, cost_of(item, &[Component::Lintel]));

        for line in item.lines.iter().filter(|l| !is_steel(&l.line.material)) {
            match line.line.component {
                Component::Opening => self.openings.add(line),
                Component::Walling
                | Component::Mortar
                | Component::Water
                | Component::Plaster
                | Component::Lintel => {}
                _ => self.other.add(line),
            }
        }
    }

    fn bill(self, walls: &mut BillBuilder, finishes: &mut BillBuilder, openings: &mut BillBuilder) {
        for (block, group) in self.walling {
            walls.measured(
                format!("{} walling", block),
                Unit::SquareMeter,
                group.quantity,
                group.cost,
                "Masonry",
                None,
            );
        }
        walls.measured(
            "Reinforced concrete lintels over openings".to_string(),
            Unit::Meter,
            self.lintels.quantity,
            self.lintels.cost,
            "Lintels",
            None,
        );
        walls.groups(self.other, "Masonry");

        for (sides, group) in self.plaster {
            finishes.measured(
                format!("Internal wall plaster ({})", sides.to_lowercase()),
                Unit::SquareMeter,
                group.quantity,
                group.cost,
                "Plaster",
                None,
            );
        }
        openings.groups(self.openings, "Openings");
    }
}

// ============================================================================
// Exports
// ============================================================================

/// One line per costed row: primary quantity, unit rate and total.
pub fn line_items(costed: &[CostedItem]) -> Vec<BoqLineItem> {
    costed
        .iter()
        .map(|item| BoqLineItem {
            row_id: item.row_id(),
            name: item.result.name().to_string(),
            quantity: item.result.primary_quantity().0,
            unit_price: item.unit_rate,
            total_price: item.total_cost,
        })
        .collect()
}

/// A bill line merged across sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedItem {
    pub item_no: String,
    pub description: String,
    pub unit: String,
    pub category: String,
    pub quantity: f64,
    pub rate: f64,
    pub amount: f64,
    /// Number of bill items merged into this one
    pub sources: usize,
}

/// `A`, `B`, ..., `Z`, `AA`, `AB`, ...
pub fn letter_number(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Merge priced items with the same description, unit and category.
///
/// Quantities and amounts are summed and the rate re-derived. Items keep
/// the order in which they first appear.
pub fn consolidate(sections: &[BoqSection]) -> Vec<ConsolidatedItem> {
    let mut merged: Vec<ConsolidatedItem> = Vec::new();
    let mut index: BTreeMap<(String, String, String), usize> = BTreeMap::new();

    for item in sections.iter().flat_map(|s| s.priced_items()) {
        let key = (
            item.description.trim().to_lowercase(),
            item.unit.trim().to_lowercase(),
            item.category.trim().to_lowercase(),
        );
        match index.get(&key) {
            Some(&i) => {
                let entry = &mut merged[i];
                entry.quantity += item.quantity;
                entry.amount += item.amount;
                entry.sources += 1;
            }
            None => {
                index.insert(key, merged.len());
                merged.push(ConsolidatedItem {
                    item_no: String::new(),
                    description: item.description.clone(),
                    unit: item.unit.clone(),
                    category: item.category.clone(),
                    quantity: item.quantity,
                    rate: 0.0,
                    amount: item.amount,
                    sources: 1,
                });
            }
        }
    }

    for (i, item) in merged.iter_mut().enumerate() {
        item.item_no = letter_number(i);
        item.rate = if item.quantity > 0.0 {
            item.amount / item.quantity
        } else {
            0.0
        };
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::finishes::{FinishCategory, FinishElement, FinishUnit};
    use crate::calculations::plumbing::{
        FixtureConnections, FixtureQuality, FixtureType, PlumbingFixture, PlumbingSystem,
        PlumbingSystemType,
    };
    use crate::calculations::roofing::{RoofStructure, RoofType};
    use crate::calculations::CalculationItem;
    use crate::elements::{ConcreteRow, ElementType};
    use crate::pricing::{cost_item, MaterialPrice, PriceBook, PriceInputs, PriceVariant};
    use crate::settings::QsSettings;
    use crate::totals::aggregate;

    fn book() -> PriceBook {
        let inputs = PriceInputs {
            base_prices: vec![
                MaterialPrice::scalar("cement", "Cement", "bag", 800.0),
                MaterialPrice::scalar("sand", "Sand", "m³", 2500.0),
                MaterialPrice::scalar("ballast", "Ballast", "m³", 3000.0),
                MaterialPrice::scalar("formwork", "Formwork", "m²", 600.0),
                MaterialPrice::structured(
                    "flooring",
                    "flooring",
                    "m²",
                    vec![PriceVariant::new("Ceramic tiles", 1500.0)],
                ),
                MaterialPrice::structured(
                    "roof covering",
                    "roof covering",
                    "m²",
                    vec![PriceVariant::new("Metal sheets", 900.0)],
                ),
                MaterialPrice::structured(
                    "fixtures",
                    "fixtures",
                    "pcs",
                    vec![PriceVariant::new("Water closet", 12000.0)],
                ),
            ],
            ..PriceInputs::default()
        };
        PriceBook::resolve("Nairobi", "u1", &inputs).unwrap()
    }

    fn bill(rows: &[CalculationItem], context: &BoqContext) -> Vec<BoqSection> {
        let settings = QsSettings::default();
        let book = book();
        let costed: Vec<CostedItem> = rows
            .iter()
            .map(|r| cost_item(&r.calculate(&settings), &book))
            .collect();
        let totals = aggregate(rows, &costed);
        to_boq(&totals, &costed, context)
    }

    #[test]
    fn test_item_number() {
        assert_eq!(generate_item_number("SUB", 7), "SUB-007");
        assert_eq!(generate_item_number("PRE", 123), "PRE-123");
    }

    #[test]
    fn test_letter_number() {
        assert_eq!(letter_number(0), "A");
        assert_eq!(letter_number(25), "Z");
        assert_eq!(letter_number(26), "AA");
        assert_eq!(letter_number(27), "AB");
    }

    #[test]
    fn test_empty_quote_has_no_sections() {
        let sections = bill(&[], &BoqContext::default());
        assert!(sections.is_empty());
    }

    #[test]
    fn test_preliminaries_from_context() {
        let context = BoqContext {
            services: vec![
                ServiceItem {
                    name: "Site survey".to_string(),
                    price: 15000.0,
                },
                ServiceItem {
                    name: "Unpriced".to_string(),
                    price: 0.0,
                },
            ],
            permit_cost: 20000.0,
            ..BoqContext::default()
        };
        let sections = bill(&[], &context);
        assert_eq!(sections.len(), 1);

        let prelims = &sections[0];
        assert_eq!(prelims.title, "BILL NO. 1: PRELIMINARIES AND GENERAL ITEMS");
        assert!(prelims.items[0].is_header);
        assert_eq!(prelims.items[0].amount, 0.0);
        assert_eq!(prelims.items.len(), 3);
        assert_eq!(prelims.items[1].item_no, "PRE-001");
        assert_eq!(prelims.items[2].description, "Permits and approvals");
        assert_eq!(prelims.total(), 35000.0);
        assert_eq!(prelims.summary, Some(35000.0));
    }

    #[test]
    fn test_concrete_row_in_its_category() {
        let slab = ConcreteRow::new("Ground slab", ElementType::Slab).with_dimensions(5.0, 4.0, 0.15);
        let sections = bill(&[CalculationItem::Concrete(slab)], &BoqContext::default());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "BILL NO. 1: SUPERSTRUCTURE");

        let concrete = &sections[0].items[1];
        assert_eq!(concrete.unit, "m³");
        assert!((concrete.quantity - 3.0).abs() < 1e-9);
        assert!(concrete.rate > 0.0);
        assert!((concrete.amount - concrete.quantity * concrete.rate).abs() < 1e-6);
        for item in sections[0].priced_items() {
            assert!((item.amount - item.quantity * item.rate).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rate_follows_displayed_quantity() {
        let mut doors = BillBuilder::new(Bill::Openings);
        doors.measured("Steel doors".to_string(), Unit::Piece, 1.5, 15000.0, "Openings", None);
        doors.measured("Grout".to_string(), Unit::CubicMeter, 0.004, 20.0, "Openings", None);
        assert_eq!(doors.items[0].quantity, 2.0);
        assert!((doors.items[0].rate - 7500.0).abs() < 1e-9);
        assert!((doors.items[0].amount - 15000.0).abs() < 1e-9);
        assert!((doors.items[1].quantity - 0.004).abs() < 1e-12);
        assert!((doors.items[1].amount - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_bill_total_matches_costed_total() {
        // 3.075 m³ of concrete is shown to two decimals
        let slab = ConcreteRow::new("Slab", ElementType::Slab).with_dimensions(5.0, 4.1, 0.15);
        let rows = vec![CalculationItem::Concrete(slab)];
        let settings = QsSettings::default();
        let book = book();
        let costed: Vec<CostedItem> = rows
            .iter()
            .map(|r| cost_item(&r.calculate(&settings), &book))
            .collect();
        let totals = aggregate(&rows, &costed);
        let sections = to_boq(&totals, &costed, &BoqContext::default());

        let billed: f64 = sections.iter().map(|s| s.total()).sum();
        assert!(totals.grand_total > 0.0);
        assert!((billed - totals.grand_total).abs() < 1e-6);
        let concrete = &sections[0].items[1];
        assert!(((concrete.quantity * 100.0).round() - concrete.quantity * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_roofing_and_plumbing_placement() {
        let mut roof = RoofStructure::new("Main roof", RoofType::Flat);
        roof.area = 40.0;
        let mut toilets = PlumbingSystem::new("Toilets", PlumbingSystemType::Drainage);
        toilets.fixtures.push(PlumbingFixture {
            fixture_type: FixtureType::WaterCloset,
            count: 2.0,
            location: String::new(),
            quality: FixtureQuality::Standard,
            water_consumption: None,
            connections: FixtureConnections::default(),
        });
        let rows = vec![CalculationItem::Plumbing(toilets), CalculationItem::Roofing(roof)];
        let sections = bill(&rows, &BoqContext::default());
        assert_eq!(sections.len(), 2);

        assert_eq!(sections[0].title, "BILL NO. 1: SUPERSTRUCTURE");
        let covering = &sections[0].items[1];
        assert_eq!(covering.description, "Roof covering Metal sheets");
        assert_eq!(covering.element, "Roofing");
        assert!((covering.quantity - 42.8).abs() < 1e-9);

        assert_eq!(sections[1].title, "BILL NO. 2: ELECTRICAL AND MECHANICAL SERVICES");
        let closets = &sections[1].items[1];
        assert_eq!(closets.element, "Plumbing");
        assert_eq!(closets.unit, "pcs");
        // 2 x 1.03 shown whole
        assert_eq!(closets.quantity, 3.0);
        assert!((closets.amount - 2.0 * 1.03 * 12000.0).abs() < 1e-6);
    }

    #[test]
    fn test_unpriced_rows_leave_no_section() {
        // no price for gypsum ceilings
        let ceiling = FinishElement::new(FinishCategory::Ceiling, "Gypsum", FinishUnit::SquareMeter, 30.0);
        let sections = bill(&[CalculationItem::Finish(ceiling)], &BoqContext::default());
        assert!(sections.is_empty());
    }

    #[test]
    fn test_finishes_merge_across_rows() {
        let rows = vec![
            CalculationItem::Finish(FinishElement::new(
                FinishCategory::Flooring,
                "Ceramic tiles",
                FinishUnit::SquareMeter,
                10.0,
            )),
            CalculationItem::Finish(FinishElement::new(
                FinishCategory::Flooring,
                "Ceramic tiles",
                FinishUnit::SquareMeter,
                15.0,
            )),
        ];
        let sections = bill(&rows, &BoqContext::default());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "BILL NO. 1: INTERNAL FINISHES");
        assert_eq!(sections[0].items.len(), 2);

        let tiles = &sections[0].items[1];
        assert_eq!(tiles.description, "Ceramic tiles (flooring)");
        assert!((tiles.quantity - 27.0).abs() < 1e-9);
        assert!((tiles.rate - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_curated_bill_normalized() {
        let json = r#"[
            {
                "title": "",
                "items": [
                    { "description": "Walling", "unit": "m²", "quantity": "10", "rate": 1200, "amount": 5 },
                    { "description": "Note", "isHeader": true, "amount": 99 }
                ]
            }
        ]"#;
        let curated: Vec<BoqSection> = serde_json::from_str(json).unwrap();
        let context = BoqContext {
            curated,
            ..BoqContext::default()
        };
        let slab = ConcreteRow::new("Slab", ElementType::Slab).with_dimensions(5.0, 4.0, 0.15);
        let sections = bill(&[CalculationItem::Concrete(slab)], &context);

        assert_eq!(sections.len(), 1);
        let section = &sections[0];
        assert_eq!(section.title, "BILL NO. 1");
        assert!(section.items[0].is_header);
        assert_eq!(section.items[1].amount, 12000.0);
        assert_eq!(section.items[2].amount, 0.0);
        assert_eq!(section.total(), 12000.0);
    }

    #[test]
    fn test_consolidate_merges_across_sections() {
        let section = |title: &str, qty: f64| BoqSection {
            title: title.to_string(),
            items: vec![
                BoqItem::header(title, "x"),
                BoqItem::priced("Cement", "bags", qty, 800.0, "materials", "Cement"),
                BoqItem::priced("Sand", "m³", 1.0, 2500.0, "materials", "Sand"),
            ],
            summary: None,
        };
        let merged = consolidate(&[section("ONE", 10.0), section("TWO", 5.0)]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].item_no, "A");
        assert_eq!(merged[0].description, "Cement");
        assert_eq!(merged[0].quantity, 15.0);
        assert_eq!(merged[0].amount, 12000.0);
        assert_eq!(merged[0].rate, 800.0);
        assert_eq!(merged[0].sources, 2);
        assert_eq!(merged[1].item_no, "B");
    }

    #[test]
    fn test_line_items_per_row() {
        let finish = FinishElement::new(FinishCategory::Flooring, "Ceramic tiles", FinishUnit::SquareMeter, 20.0);
        let id = finish.id;
        let result = CalculationItem::Finish(finish).calculate(&QsSettings::default());
        let items = line_items(&[cost_item(&result, &book())]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].row_id, id);
        assert_eq!(items[0].quantity, 20.0);
        assert!((items[0].total_price - 20.0 * 1.08 * 1500.0).abs() < 1e-6);
    }
}
