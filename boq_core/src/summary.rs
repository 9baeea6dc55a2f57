//! # Quote Summary
//!
//! The financial roll-up printed under a bill: materials, preliminaries,
//! subcontractors, labour, overheads, contingency and profit.
//!
//! ```text
//! labour      = round(materials × labour %)            | fixed
//! subtotal    = materials + labour + subcontractors + preliminaries   (full contract)
//!             = labour + subcontractors + preliminaries               (labour only)
//! overhead    = round(subtotal × overhead %)            | fixed
//! contingency = round(subtotal × contingency %)         | fixed
//! profit      = round((materials + subcontractors) × profit %) | fixed
//! total       = round(subtotal + overhead + contingency + profit)
//! ```
//!
//! Permits are billed in the preliminaries, so the permit figure is
//! reported but not added to the total a second time.

use serde::{Deserialize, Serialize};

use crate::boq::{BoqSection, Bill};
use crate::quote::QuoteSnapshot;
use crate::settings::{FinancialMode, FinancialSettings};
use crate::units::lenient;

/// Whether the contractor supplies materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    #[default]
    FullContract,
    #[serde(alias = "labor_only")]
    LabourOnly,
}

impl ContractType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ContractType::FullContract => "Full contract",
            ContractType::LabourOnly => "Labour only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPlan {
    #[default]
    #[serde(alias = "Daily")]
    Daily,
    #[serde(alias = "Full")]
    Full,
}

/// A subcontractor paid per day or as a lump sum.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Subcontractor {
    pub name: String,
    #[serde(alias = "subcontractor_payment_plan")]
    pub payment_plan: PaymentPlan,
    /// Day rate
    #[serde(deserialize_with = "lenient::number")]
    pub price: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub days: f64,
    /// Lump sum for full payment
    #[serde(deserialize_with = "lenient::number")]
    pub total: f64,
}

impl Subcontractor {
    pub fn cost(&self) -> f64 {
        let cost = match self.payment_plan {
            PaymentPlan::Daily => self.price * self.days,
            PaymentPlan::Full => self.total,
        };
        if cost.is_finite() && cost > 0.0 {
            cost
        } else {
            0.0
        }
    }
}

/// Financial roll-up of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteSummary {
    pub contract_type: ContractType,
    pub materials: f64,
    pub preliminaries: f64,
    pub equipment: f64,
    pub services: f64,
    pub subcontractors: f64,
    pub labour: f64,
    pub subtotal: f64,
    pub overhead: f64,
    pub contingency: f64,
    pub profit: f64,
    pub permit: f64,
    pub total: f64,
}

fn is_preliminaries(section: &BoqSection) -> bool {
    let category = Bill::Preliminaries.category();
    section.title.to_uppercase().contains("PRELIMINARIES")
        || section
            .items
            .first()
            .is_some_and(|i| i.is_header && i.category == category)
}

/// `percent` of `base`, rounded to whole currency, or the fixed amount.
fn charge(mode: FinancialMode, percent: f64, base: f64, fixed: f64) -> f64 {
    match mode {
        FinancialMode::Percentage => (base * percent / 100.0).round(),
        FinancialMode::Fixed => fixed,
    }
}

/// Summarise the bill of a quote.
pub fn summarize(sections: &[BoqSection], snapshot: &QuoteSnapshot) -> QuoteSummary {
    let (prelim_sections, work_sections): (Vec<&BoqSection>, Vec<&BoqSection>) =
        sections.iter().partition(|s| is_preliminaries(s));
    let materials: f64 = work_sections.iter().map(|s| s.total()).sum();
    let preliminaries: f64 = prelim_sections.iter().map(|s| s.total()).sum();

    let context = &snapshot.context;
    let equipment = context.equipment.iter().map(|e| e.total_cost).sum();
    let services = context.services.iter().map(|s| s.price).sum();
    let subcontractors: f64 = snapshot.subcontractors.iter().map(|s| s.cost()).sum();

    roll_up(
        &snapshot.settings.financial,
        snapshot.contract_type,
        Inputs {
            materials,
            preliminaries,
            equipment,
            services,
            subcontractors,
        },
    )
}

struct Inputs {
    materials: f64,
    preliminaries: f64,
    equipment: f64,
    services: f64,
    subcontractors: f64,
}

fn roll_up(fin: &FinancialSettings, contract_type: ContractType, inputs: Inputs) -> QuoteSummary {
    let Inputs {
        materials,
        preliminaries,
        equipment,
        services,
        subcontractors,
    } = inputs;

    let labour = charge(fin.labour_mode, fin.labour_percent, materials, fin.labour_fixed);
    let subtotal = match contract_type {
        ContractType::FullContract => materials + labour + subcontractors + preliminaries,
        ContractType::LabourOnly => labour + subcontractors + preliminaries,
    };
    let overhead = charge(fin.overhead_mode, fin.overhead_percent, subtotal, fin.overhead_fixed);
    let contingency = charge(
        fin.contingency_mode,
        fin.contingency_percent,
        subtotal,
        fin.contingency_fixed,
    );
    let profit = charge(
        fin.profit_mode,
        fin.profit_percent,
        materials + subcontractors,
        fin.profit_fixed,
    );
    let permit = match fin.permit_mode {
        FinancialMode::Percentage => fin.permit_cost,
        FinancialMode::Fixed => fin.permit_cost_fixed,
    };

    QuoteSummary {
        contract_type,
        materials,
        preliminaries,
        equipment,
        services,
        subcontractors,
        labour,
        subtotal,
        overhead,
        contingency,
        profit,
        permit,
        total: (subtotal + overhead + contingency + profit).round(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boq::BoqItem;

    fn section(title: &str, category: &str, amounts: &[f64]) -> BoqSection {
        let mut items = vec![BoqItem::header(title, category)];
        items.extend(
            amounts
                .iter()
                .map(|a| BoqItem::priced("item", "Sum", 1.0, *a, category, "x")),
        );
        BoqSection {
            title: title.to_string(),
            items,
            summary: None,
        }
    }

    fn snapshot() -> QuoteSnapshot {
        let mut snapshot = QuoteSnapshot::new("House", "Client", "Nairobi");
        let fin = &mut snapshot.settings.financial;
        fin.labour_percent = 20.0;
        fin.overhead_percent = 10.0;
        fin.contingency_percent = 5.0;
        fin.profit_percent = 10.0;
        snapshot
    }

    #[test]
    fn test_subcontractor_cost() {
        let daily = Subcontractor {
            name: "Plumber".to_string(),
            payment_plan: PaymentPlan::Daily,
            price: 2500.0,
            days: 4.0,
            total: 0.0,
        };
        assert_eq!(daily.cost(), 10000.0);

        let full = Subcontractor {
            payment_plan: PaymentPlan::Full,
            total: 45000.0,
            ..daily
        };
        assert_eq!(full.cost(), 45000.0);
    }

    #[test]
    fn test_full_contract_summary() {
        let sections = vec![
            section("BILL NO. 1: PRELIMINARIES AND GENERAL ITEMS", "preliminaries", &[10000.0]),
            section("BILL NO. 2: SUBSTRUCTURE", "substructure", &[60000.0, 40000.0]),
        ];
        let mut snapshot = snapshot();
        snapshot.subcontractors.push(Subcontractor {
            name: "Electrician".to_string(),
            payment_plan: PaymentPlan::Full,
            total: 20000.0,
            ..Subcontractor::default()
        });

        let summary = summarize(&sections, &snapshot);
        assert_eq!(summary.materials, 100000.0);
        assert_eq!(summary.preliminaries, 10000.0);
        assert_eq!(summary.subcontractors, 20000.0);
        assert_eq!(summary.labour, 20000.0);
        assert_eq!(summary.subtotal, 150000.0);
        assert_eq!(summary.overhead, 15000.0);
        assert_eq!(summary.contingency, 7500.0);
        assert_eq!(summary.profit, 12000.0);
        assert_eq!(summary.total, 184500.0);
    }

    #[test]
    fn test_labour_only_excludes_materials() {
        let sections = vec![section("BILL NO. 1: SUPERSTRUCTURE", "superstructure", &[100000.0])];
        let mut snapshot = snapshot();
        snapshot.contract_type = ContractType::LabourOnly;

        let summary = summarize(&sections, &snapshot);
        assert_eq!(summary.labour, 20000.0);
        assert_eq!(summary.subtotal, 20000.0);
    }

    #[test]
    fn test_fixed_amounts() {
        let sections = vec![section("BILL NO. 1: SUPERSTRUCTURE", "superstructure", &[1000.0])];
        let mut snapshot = snapshot();
        let fin = &mut snapshot.settings.financial;
        fin.labour_mode = FinancialMode::Fixed;
        fin.labour_fixed = 5000.0;
        fin.profit_mode = FinancialMode::Fixed;
        fin.profit_fixed = 750.0;

        let summary = summarize(&sections, &snapshot);
        assert_eq!(summary.labour, 5000.0);
        assert_eq!(summary.profit, 750.0);
    }

    #[test]
    fn test_percentages_round_to_whole_units() {
        let sections = vec![section("BILL NO. 1: SUPERSTRUCTURE", "superstructure", &[333.0])];
        let summary = summarize(&sections, &snapshot());
        // 20 % of 333 = 66.6
        assert_eq!(summary.labour, 67.0);
    }
}
