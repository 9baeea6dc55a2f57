//! # Recompute Pipeline
//!
//! Runs a quote through every stage:
//!
//! ```text
//! rows ──normalize──> calculate ──> cost (PriceBook) ──> aggregate ──> bill ──> summary
//! ```
//!
//! [`evaluate`] is pure: the same snapshot and price book always give the
//! same outputs. [`recompute`] adds the steps that produce a new snapshot:
//! correcting rows that hold an unsupported mode, resolving the price book
//! for the quote's region and owner, and storing the outputs through the
//! reducer.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::calculations::CalculationItem;
//! use boq_core::calculations::finishes::{FinishCategory, FinishElement, FinishUnit};
//! use boq_core::engine::recompute;
//! use boq_core::pricing::{MaterialPrice, PriceInputs, PriceVariant};
//! use boq_core::quote::{reduce, QuoteAction, QuoteSnapshot};
//!
//! let tiles = FinishElement::new(FinishCategory::Flooring, "Ceramic tiles", FinishUnit::SquareMeter, 10.0);
//! let quote = reduce(
//!     &QuoteSnapshot::new("Flat", "Client", "Nairobi"),
//!     QuoteAction::AddRow(CalculationItem::Finish(tiles)),
//! );
//! let prices = PriceInputs {
//!     base_prices: vec![MaterialPrice::structured(
//!         "flooring",
//!         "flooring",
//!         "m²",
//!         vec![PriceVariant::new("Ceramic tiles", 1000.0)],
//!     )],
//!     ..PriceInputs::default()
//! };
//!
//! let quote = recompute(&quote, &prices).unwrap();
//! assert!((quote.computed.totals.grand_total - 10800.0).abs() < 1e-6);
//! ```

use std::collections::BTreeMap;

use tracing::debug;

use crate::boq::{line_items, to_boq};
use crate::calculations::CalculationItem;
use crate::errors::CalcResult;
use crate::materials::MaterialRef;
use crate::pricing::{cost_item, CostedItem, PriceBook, PriceInputs};
use crate::quote::{reduce, ComputedOutputs, QuoteAction, QuoteSnapshot};
use crate::summary::summarize;
use crate::totals::aggregate;

/// Rows with stale detail cleared and unsupported modes corrected.
pub fn normalize_rows(rows: &[CalculationItem]) -> Vec<CalculationItem> {
    rows.iter()
        .cloned()
        .map(|mut row| {
            row.normalize();
            row
        })
        .collect()
}

/// Calculate and cost every row of `snapshot`, then aggregate and bill.
pub fn evaluate(snapshot: &QuoteSnapshot, book: &PriceBook) -> ComputedOutputs {
    let settings = snapshot.settings.sanitized();

    let results: Vec<CostedItem> = snapshot
        .rows
        .iter()
        .map(|row| cost_item(&row.calculate(&settings), book))
        .collect();

    let totals = aggregate(&snapshot.rows, &results);
    let boq = to_boq(&totals, &results, &snapshot.context);
    let summary = summarize(&boq, snapshot);

    let mut issues = BTreeMap::new();
    let mut missing_prices: Vec<MaterialRef> = Vec::new();
    for item in &results {
        if !item.result.issues().is_empty() {
            issues.insert(item.row_id(), item.result.issues().to_vec());
        }
        for material in &item.missing_prices {
            if !missing_prices.contains(material) {
                missing_prices.push(material.clone());
            }
        }
    }

    debug!(
        rows = results.len(),
        sections = boq.len(),
        grand_total = totals.grand_total,
        "evaluated quote"
    );

    ComputedOutputs {
        line_items: line_items(&results),
        results,
        totals,
        boq,
        summary,
        issues,
        missing_prices,
    }
}

/// Produce the next snapshot with fresh outputs.
///
/// Fails only when a price override for the quote's owner is malformed.
pub fn recompute(snapshot: &QuoteSnapshot, prices: &PriceInputs) -> CalcResult<QuoteSnapshot> {
    let rows = normalize_rows(&snapshot.rows);
    let next = if rows != snapshot.rows {
        debug!("normalized rows before recompute");
        reduce(snapshot, QuoteAction::ReplaceRows(rows))
    } else {
        snapshot.clone()
    };

    let book = PriceBook::resolve(&next.region, &next.meta.user_id, prices)?;
    let computed = evaluate(&next, &book);
    Ok(reduce(&next, QuoteAction::SetComputed(computed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::finishes::{FinishCategory, FinishElement, FinishUnit};
    use crate::calculations::rebar::{ReinforcementMode, RebarElement, RebarRow};
    use crate::errors::CalcError;
    use crate::pricing::{MaterialPrice, PriceVariant, UserPriceOverride};

    fn prices() -> PriceInputs {
        PriceInputs {
            base_prices: vec![
                MaterialPrice::structured(
                    "flooring",
                    "flooring",
                    "m²",
                    vec![PriceVariant::new("Ceramic tiles", 1000.0)],
                ),
                MaterialPrice::structured(
                    "rebar",
                    "Rebar",
                    "kg",
                    vec![PriceVariant::new("Y12", 150.0), PriceVariant::new("Y10", 155.0)],
                ),
            ],
            ..PriceInputs::default()
        }
    }

    fn quote_with(rows: Vec<CalculationItem>) -> QuoteSnapshot {
        reduce(
            &QuoteSnapshot::new("Q", "C", "Nairobi"),
            QuoteAction::ReplaceRows(rows),
        )
    }

    #[test]
    fn test_recompute_fills_outputs() {
        let tiles = FinishElement::new(FinishCategory::Flooring, "Ceramic tiles", FinishUnit::SquareMeter, 10.0);
        let quote = recompute(&quote_with(vec![CalculationItem::Finish(tiles)]), &prices()).unwrap();

        let computed = &quote.computed;
        assert_eq!(computed.results.len(), 1);
        assert_eq!(computed.line_items.len(), 1);
        assert_eq!(computed.boq.len(), 1);
        assert!((computed.totals.grand_total - 10800.0).abs() < 1e-6);
        assert!((computed.summary.materials - 10800.0).abs() < 1e-6);
        assert!(computed.missing_prices.is_empty());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let tiles = FinishElement::new(FinishCategory::Flooring, "Ceramic tiles", FinishUnit::SquareMeter, 10.0);
        let quote = quote_with(vec![CalculationItem::Finish(tiles)]);
        let once = recompute(&quote, &prices()).unwrap();
        let twice = recompute(&once, &prices()).unwrap();
        assert_eq!(once.computed, twice.computed);
        assert_eq!(once.rows, twice.rows);
    }

    #[test]
    fn test_mesh_beam_reverted_to_bars() {
        let mut beam = RebarRow::new("Beam", RebarElement::Beam).with_dimensions(4.0, 0.23, 0.45);
        beam.mode = ReinforcementMode::Mesh;
        let id = beam.id;

        let quote = recompute(&quote_with(vec![CalculationItem::Rebar(beam)]), &prices()).unwrap();
        match quote.row(&id) {
            Some(CalculationItem::Rebar(row)) => {
                assert_eq!(row.mode, ReinforcementMode::IndividualBars);
                assert!(row.mesh.is_none());
            }
            other => panic!("unexpected row {:?}", other),
        }
        match &quote.computed.results[0].result {
            crate::calculations::ItemResult::Rebar(r) => {
                assert!(r.mesh.is_none());
                assert!(r.total_weight_kg > 0.0);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_missing_prices_collected() {
        let paint = FinishElement::new(FinishCategory::Paint, "Emulsion", FinishUnit::SquareMeter, 30.0);
        let quote = recompute(&quote_with(vec![CalculationItem::Finish(paint)]), &prices()).unwrap();
        assert_eq!(quote.computed.missing_prices.len(), 1);
        assert_eq!(quote.computed.totals.grand_total, 0.0);
        assert!(quote.computed.boq.is_empty());
    }

    #[test]
    fn test_issues_keyed_by_row() {
        let empty = FinishElement::new(FinishCategory::Paint, "", FinishUnit::SquareMeter, 0.0);
        let id = empty.id;
        let quote = recompute(&quote_with(vec![CalculationItem::Finish(empty)]), &prices()).unwrap();
        assert_eq!(quote.computed.issues[&id].len(), 2);
    }

    #[test]
    fn test_malformed_override_fails() {
        let mut quote = quote_with(Vec::new());
        quote.meta.user_id = "u1".to_string();
        let mut inputs = prices();
        inputs.overrides.push(UserPriceOverride {
            user_id: "u1".to_string(),
            region: "Nairobi".to_string(),
            material_id: "rebar".to_string(),
            price: None,
            variants: Vec::new(),
        });
        let err = recompute(&quote, &inputs).unwrap_err();
        assert!(matches!(err, CalcError::InvalidOverride { .. }));
    }
}
