//! Costing of calculated rows against a [`PriceBook`].
//!
//! Each line costs `gross × rate`, where the rate is the line's fixed rate
//! when it has one and the book price otherwise. A line with no price costs
//! zero and is listed in `missing_prices`.

use serde::{Deserialize, Serialize};

use super::PriceBook;
use crate::calculations::{ItemResult, MaterialLine};
use crate::materials::MaterialRef;

/// A material line with its price applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostedLine {
    pub line: MaterialLine,
    /// Rate used; 0 when unpriced or non-billable
    pub unit_price: f64,
    /// Whether a rate was found
    pub priced: bool,
    pub cost: f64,
}

/// A row result with every line costed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostedItem {
    pub result: ItemResult,
    pub lines: Vec<CostedLine>,
    pub total_cost: f64,
    /// Cost per unit of the row's primary quantity
    pub unit_rate: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_prices: Vec<MaterialRef>,
}

impl CostedItem {
    pub fn row_id(&self) -> uuid::Uuid {
        self.result.row_id()
    }
}

pub fn cost_line(line: &MaterialLine, book: &PriceBook) -> CostedLine {
    if !line.billable {
        return CostedLine {
            line: line.clone(),
            unit_price: 0.0,
            priced: true,
            cost: 0.0,
        };
    }
    let rate = line.fixed_rate.or_else(|| book.unit_price(&line.material));
    let unit_price = rate.filter(|r| r.is_finite() && *r >= 0.0).unwrap_or(0.0);
    CostedLine {
        line: line.clone(),
        unit_price,
        priced: rate.is_some(),
        cost: line.gross * unit_price,
    }
}

/// Cost every line of `result`.
pub fn cost_item(result: &ItemResult, book: &PriceBook) -> CostedItem {
    let lines: Vec<CostedLine> = result
        .lines()
        .iter()
        .map(|line| cost_line(line, book))
        .collect();

    let total_cost: f64 = lines.iter().map(|l| l.cost).sum();

    let mut missing_prices: Vec<MaterialRef> = Vec::new();
    for costed in lines.iter().filter(|l| !l.priced) {
        if !missing_prices.contains(&costed.line.material) {
            missing_prices.push(costed.line.material.clone());
        }
    }

    let (primary, _) = result.primary_quantity();
    let unit_rate = if primary > 0.0 { total_cost / primary } else { 0.0 };

    CostedItem {
        result: result.clone(),
        lines,
        total_cost,
        unit_rate,
        missing_prices,
    }
}
