//! # boq_core - Quantity Takeoff and Costing Engine
//!
//! `boq_core` turns the rows of a construction quote (concrete elements,
//! masonry rooms, reinforcement, roofs, electrical and plumbing systems and
//! finishes) into material quantities, prices them for a region, and maps the result onto
//! a Bill of Quantities. All inputs and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Pure calculators**: the same row and settings always give the same lines
//! - **JSON-First**: all types implement Serialize/Deserialize
//! - **Issues, not errors**: bad dimensions and missing prices are reported
//!   alongside results; only malformed overrides and file I/O fail
//! - **Immutable snapshots**: quotes change through [`quote::reduce`]
//!
//! ## Quick Start
//!
//! ```rust
//! use boq_core::calculations::CalculationItem;
//! use boq_core::calculations::finishes::{FinishCategory, FinishElement, FinishUnit};
//! use boq_core::{recompute, reduce, PriceInputs, QuoteAction, QuoteSnapshot};
//!
//! let quote = QuoteSnapshot::new("Bungalow", "Jane Client", "Nairobi");
//! let paint = FinishElement::new(FinishCategory::Paint, "Emulsion", FinishUnit::SquareMeter, 120.0);
//! let quote = reduce(&quote, QuoteAction::AddRow(CalculationItem::Finish(paint)));
//!
//! let quote = recompute(&quote, &PriceInputs::default()).unwrap();
//! // No price table loaded, so the paint is reported as unpriced
//! assert_eq!(quote.computed.missing_prices.len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`settings`] - QS settings, defaults and legacy key resolution
//! - [`calculations`] - Row types and the quantity calculators
//! - [`materials`] - Material identities, mixes, block and bar tables
//! - [`pricing`] - Price resolution and costing of material lines
//! - [`totals`] - Aggregation across rows
//! - [`boq`] - Bill of Quantities mapping and consolidation
//! - [`summary`] - Financial roll-up of a bill
//! - [`quote`] - Quote snapshot and reducer
//! - [`engine`] - The recompute pipeline
//! - [`persist`] - Debounced snapshot writes
//! - [`file_io`] - Quote files with atomic saves and locking

pub mod boq;
pub mod calculations;
pub mod elements;
pub mod engine;
pub mod errors;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_io;
pub mod materials;
pub mod persist;
pub mod pricing;
pub mod quote;
pub mod settings;
pub mod summary;
pub mod totals;
pub mod units;

pub use boq::{BoqContext, BoqItem, BoqSection};
pub use calculations::{CalculationItem, ItemResult, MaterialLine};
pub use engine::{evaluate, recompute};
pub use errors::{CalcError, CalcResult};
#[cfg(not(target_arch = "wasm32"))]
pub use file_io::{load_quote, save_quote, FileLock};
pub use pricing::{PriceBook, PriceInputs};
pub use quote::{reduce, QuoteAction, QuoteSnapshot};
pub use settings::{resolve_settings, QsSettings};
pub use totals::Totals;
