//! # Quote Snapshot
//!
//! The `QuoteSnapshot` is the root document for one quote: metadata,
//! settings, rows, bill context and the last computed outputs. Quotes
//! serialize to `.boq` files as human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! QuoteSnapshot
//! ├── meta: QuoteMetadata (version, title, client, timestamps)
//! ├── region, settings: QsSettings
//! ├── rows: Vec<CalculationItem> (bill order)
//! ├── context: BoqContext, subcontractors, contract_type
//! └── computed: ComputedOutputs (results, totals, bill, summary)
//! ```
//!
//! Snapshots are never edited in place by the engine. Every change goes
//! through [`reduce`], which returns the next snapshot.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::calculations::CalculationItem;
//! use boq_core::calculations::finishes::{FinishCategory, FinishElement, FinishUnit};
//! use boq_core::quote::{reduce, QuoteAction, QuoteSnapshot};
//!
//! let quote = QuoteSnapshot::new("Bungalow", "Jane Client", "Nairobi");
//! let tiles = FinishElement::new(FinishCategory::Flooring, "Ceramic tiles", FinishUnit::SquareMeter, 40.0);
//!
//! let next = reduce(&quote, QuoteAction::AddRow(CalculationItem::Finish(tiles)));
//! assert_eq!(quote.rows.len(), 0);
//! assert_eq!(next.rows.len(), 1);
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::boq::{BoqContext, BoqLineItem, BoqSection};
use crate::calculations::CalculationItem;
use crate::materials::MaterialRef;
use crate::pricing::CostedItem;
use crate::settings::QsSettings;
use crate::summary::{ContractType, QuoteSummary, Subcontractor};
use crate::totals::Totals;

/// Current schema version for .boq files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Quote metadata stored in the file header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    pub title: String,

    pub client: String,

    /// Owner of the quote; scopes price overrides
    #[serde(default)]
    pub user_id: String,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

/// Everything derived from the rows, settings and prices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedOutputs {
    pub results: Vec<CostedItem>,
    pub totals: Totals,
    pub boq: Vec<BoqSection>,
    pub line_items: Vec<BoqLineItem>,
    pub summary: QuoteSummary,
    /// Issues per row, for rows that have any
    pub issues: BTreeMap<Uuid, Vec<String>>,
    /// Materials with no price, in first-seen order
    pub missing_prices: Vec<MaterialRef>,
}

/// Root quote document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub meta: QuoteMetadata,

    /// Pricing region, e.g. "Nairobi"
    pub region: String,

    #[serde(default)]
    pub settings: QsSettings,

    /// Rows in bill order
    #[serde(default)]
    pub rows: Vec<CalculationItem>,

    #[serde(default)]
    pub context: BoqContext,

    #[serde(default)]
    pub subcontractors: Vec<Subcontractor>,

    #[serde(default)]
    pub contract_type: ContractType,

    #[serde(default)]
    pub computed: ComputedOutputs,
}

impl QuoteSnapshot {
    /// Create a new empty quote.
    pub fn new(title: impl Into<String>, client: impl Into<String>, region: impl Into<String>) -> Self {
        let now = Utc::now();
        QuoteSnapshot {
            meta: QuoteMetadata {
                version: SCHEMA_VERSION.to_string(),
                title: title.into(),
                client: client.into(),
                user_id: String::new(),
                created: now,
                modified: now,
            },
            region: region.into(),
            settings: QsSettings::default(),
            rows: Vec::new(),
            context: BoqContext::default(),
            subcontractors: Vec::new(),
            contract_type: ContractType::default(),
            computed: ComputedOutputs::default(),
        }
    }

    pub fn row(&self, id: &Uuid) -> Option<&CalculationItem> {
        self.rows.iter().find(|r| &r.id() == id)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }
}

impl Default for QuoteSnapshot {
    fn default() -> Self {
        QuoteSnapshot::new("", "", "")
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// A change to a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum QuoteAction {
    /// Append a row, or replace the row with the same id
    AddRow(CalculationItem),
    /// Replace the row with the same id; ignored when there is none
    UpdateRow(CalculationItem),
    RemoveRow(Uuid),
    ReplaceRows(Vec<CalculationItem>),
    SetSettings(QsSettings),
    SetRegion(String),
    SetContext(BoqContext),
    SetSubcontractors(Vec<Subcontractor>),
    SetContractType(ContractType),
    /// Store recomputed outputs; does not count as a user edit
    SetComputed(ComputedOutputs),
}

/// Apply `action` to `snapshot`, returning the next snapshot.
///
/// The input snapshot is left untouched. Every action except
/// [`QuoteAction::SetComputed`] bumps the modified timestamp.
pub fn reduce(snapshot: &QuoteSnapshot, action: QuoteAction) -> QuoteSnapshot {
    let mut next = snapshot.clone();
    let edited = match action {
        QuoteAction::AddRow(row) => {
            match next.rows.iter_mut().find(|r| r.id() == row.id()) {
                Some(existing) => *existing = row,
                None => next.rows.push(row),
            }
            true
        }
        QuoteAction::UpdateRow(row) => match next.rows.iter_mut().find(|r| r.id() == row.id()) {
            Some(existing) => {
                *existing = row;
                true
            }
            None => {
                debug!(row = %row.id(), "ignoring update for unknown row");
                false
            }
        },
        QuoteAction::RemoveRow(id) => {
            let before = next.rows.len();
            next.rows.retain(|r| r.id() != id);
            next.rows.len() != before
        }
        QuoteAction::ReplaceRows(rows) => {
            next.rows = rows;
            true
        }
        QuoteAction::SetSettings(settings) => {
            next.settings = settings;
            true
        }
        QuoteAction::SetRegion(region) => {
            next.region = region;
            true
        }
        QuoteAction::SetContext(context) => {
            next.context = context;
            true
        }
        QuoteAction::SetSubcontractors(subcontractors) => {
            next.subcontractors = subcontractors;
            true
        }
        QuoteAction::SetContractType(contract_type) => {
            next.contract_type = contract_type;
            true
        }
        QuoteAction::SetComputed(computed) => {
            next.computed = computed;
            false
        }
    };
    if edited {
        next.touch();
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::finishes::{FinishCategory, FinishElement, FinishUnit};

    fn tiles(qty: f64) -> FinishElement {
        FinishElement::new(FinishCategory::Flooring, "Ceramic tiles", FinishUnit::SquareMeter, qty)
    }

    #[test]
    fn test_new_quote() {
        let quote = QuoteSnapshot::new("Bungalow", "Client Co", "Mombasa");
        assert_eq!(quote.meta.version, SCHEMA_VERSION);
        assert_eq!(quote.meta.title, "Bungalow");
        assert_eq!(quote.region, "Mombasa");
        assert!(quote.rows.is_empty());
    }

    #[test]
    fn test_reduce_leaves_input_untouched() {
        let quote = QuoteSnapshot::new("Q", "C", "Nairobi");
        let next = reduce(&quote, QuoteAction::AddRow(CalculationItem::Finish(tiles(10.0))));
        assert!(quote.rows.is_empty());
        assert_eq!(next.row_count(), 1);
        assert!(next.meta.modified >= quote.meta.modified);
    }

    #[test]
    fn test_add_update_remove() {
        let row = tiles(10.0);
        let id = row.id;
        let quote = reduce(&QuoteSnapshot::default(), QuoteAction::AddRow(CalculationItem::Finish(row.clone())));

        let mut bigger = row;
        bigger.quantity = 25.0;
        let quote = reduce(&quote, QuoteAction::UpdateRow(CalculationItem::Finish(bigger)));
        assert_eq!(quote.row_count(), 1);
        match quote.row(&id) {
            Some(CalculationItem::Finish(f)) => assert_eq!(f.quantity, 25.0),
            other => panic!("unexpected row {:?}", other),
        }

        let quote = reduce(&quote, QuoteAction::RemoveRow(id));
        assert!(quote.row(&id).is_none());
    }

    #[test]
    fn test_update_unknown_row_is_ignored() {
        let quote = QuoteSnapshot::default();
        let next = reduce(&quote, QuoteAction::UpdateRow(CalculationItem::Finish(tiles(5.0))));
        assert_eq!(next, quote);
    }

    #[test]
    fn test_set_computed_keeps_modified() {
        let quote = QuoteSnapshot::default();
        let next = reduce(&quote, QuoteAction::SetComputed(ComputedOutputs::default()));
        assert_eq!(next.meta.modified, quote.meta.modified);
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let quote = reduce(
            &QuoteSnapshot::new("Q", "C", "Nairobi"),
            QuoteAction::AddRow(CalculationItem::Finish(tiles(12.0))),
        );
        let json = serde_json::to_string_pretty(&quote).unwrap();
        let back: QuoteSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rows, quote.rows);
        assert_eq!(back.meta.version, SCHEMA_VERSION);
    }

    #[test]
    fn test_action_json() {
        let json = r#"{ "action": "set_region", "payload": "Kisumu" }"#;
        let action: QuoteAction = serde_json::from_str(json).unwrap();
        assert_eq!(action, QuoteAction::SetRegion("Kisumu".to_string()));
    }
}
