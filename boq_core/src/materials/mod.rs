//! # Materials
//!
//! Reference data for the calculators and the identity of every priced
//! material.
//!
//! ## Submodules
//!
//! - [`concrete_mix`] - Volumetric mix ratios, densities and cement bag constants
//! - [`rebar`] - Bar sizes, mesh grades and standard mesh sheets
//! - [`masonry_units`] - Block and brick dimensions
//!
//! ## Material Identity
//!
//! A [`MaterialRef`] names what a line consumes and how it is priced: a
//! [`MaterialKind`] plus an optional variant (bar size, block type, cable type)
//! and grade (cable size, outlet rating, door size).
//!
//! ```rust
//! use boq_core::materials::{MaterialKind, MaterialRef};
//!
//! let y12 = MaterialRef::new(MaterialKind::Rebar).with_variant("Y12");
//! assert_eq!(y12.label(), "Reinforcement bars Y12");
//! assert_eq!(y12.price_name(), "rebar");
//! ```

pub mod concrete_mix;
pub mod masonry_units;
pub mod rebar;

pub use concrete_mix::{MixRatio, MortarRatio};
pub use masonry_units::{BlockDimensions, BlockType};
pub use rebar::{MeshGrade, MeshSheet, RebarSize};

use serde::{Deserialize, Serialize};

/// Every material or priced service a calculator can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaterialKind {
    Cement,
    Sand,
    Ballast,
    Water,
    Formwork,
    /// Hardcore / aggregate bed under foundations
    Hardcore,
    Gravel,
    Dpc,
    Polythene,
    Waterproofing,
    Geotextile,
    Baffle,
    ManholeCover,
    PerforatedPipe,
    Blocks,
    Rebar,
    BindingWire,
    Mesh,
    Sealant,
    Scaffolding,
    WasteRemoval,
    Doors,
    Windows,
    Cable,
    Outlets,
    Lighting,
    DistributionBoard,
    /// Finish material; the finish category is the variant
    Finish,
    /// Sawn roof timber; the section size is the variant
    Timber,
    RoofCovering,
    Underlayment,
    Insulation,
    Gutters,
    Downpipes,
    Flashings,
    Fascia,
    Soffit,
    RidgeCaps,
    ValleyTrays,
    Pipes,
    SanitaryFittings,
}

impl MaterialKind {
    /// Name used to find the material in price tables (case-insensitive).
    pub fn price_name(&self) -> &'static str {
        match self {
            MaterialKind::Cement => "cement",
            MaterialKind::Sand => "sand",
            MaterialKind::Ballast => "ballast",
            MaterialKind::Water => "water",
            MaterialKind::Formwork => "formwork",
            MaterialKind::Hardcore => "aggregate",
            MaterialKind::Gravel => "gravel",
            MaterialKind::Dpc => "dpc",
            MaterialKind::Polythene => "polythene",
            MaterialKind::Waterproofing => "waterproofing",
            MaterialKind::Geotextile => "geotextile",
            MaterialKind::Baffle => "baffle",
            MaterialKind::ManholeCover => "manhole cover",
            MaterialKind::PerforatedPipe => "perforated pipe",
            MaterialKind::Blocks => "blocks",
            MaterialKind::Rebar => "rebar",
            MaterialKind::BindingWire => "binding wire",
            MaterialKind::Mesh => "mesh",
            MaterialKind::Sealant => "sealant",
            MaterialKind::Scaffolding => "scaffolding",
            MaterialKind::WasteRemoval => "waste removal",
            MaterialKind::Doors => "doors",
            MaterialKind::Windows => "windows",
            MaterialKind::Cable => "cable",
            MaterialKind::Outlets => "outlets",
            MaterialKind::Lighting => "lighting",
            MaterialKind::DistributionBoard => "distribution-board",
            MaterialKind::Finish => "finishes",
            MaterialKind::Timber => "timber",
            MaterialKind::RoofCovering => "roof covering",
            MaterialKind::Underlayment => "underlayment",
            MaterialKind::Insulation => "insulation",
            MaterialKind::Gutters => "gutters",
            MaterialKind::Downpipes => "downpipes",
            MaterialKind::Flashings => "flashings",
            MaterialKind::Fascia => "fascia",
            MaterialKind::Soffit => "soffit",
            MaterialKind::RidgeCaps => "ridge caps",
            MaterialKind::ValleyTrays => "valley trays",
            MaterialKind::Pipes => "pipes",
            MaterialKind::SanitaryFittings => "fixtures",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            MaterialKind::Cement => "Cement",
            MaterialKind::Sand => "Sand",
            MaterialKind::Ballast => "Ballast",
            MaterialKind::Water => "Water",
            MaterialKind::Formwork => "Formwork",
            MaterialKind::Hardcore => "Hardcore bed",
            MaterialKind::Gravel => "Gravel fill",
            MaterialKind::Dpc => "Damp proof course",
            MaterialKind::Polythene => "Polythene sheeting",
            MaterialKind::Waterproofing => "Waterproofing",
            MaterialKind::Geotextile => "Geotextile",
            MaterialKind::Baffle => "Baffle wall",
            MaterialKind::ManholeCover => "Manhole cover",
            MaterialKind::PerforatedPipe => "Perforated pipe",
            MaterialKind::Blocks => "Blocks",
            MaterialKind::Rebar => "Reinforcement bars",
            MaterialKind::BindingWire => "Binding wire",
            MaterialKind::Mesh => "Mesh reinforcement",
            MaterialKind::Sealant => "Joint sealant",
            MaterialKind::Scaffolding => "Scaffolding",
            MaterialKind::WasteRemoval => "Waste removal",
            MaterialKind::Doors => "Doors",
            MaterialKind::Windows => "Windows",
            MaterialKind::Cable => "Cable",
            MaterialKind::Outlets => "Outlets",
            MaterialKind::Lighting => "Lighting",
            MaterialKind::DistributionBoard => "Distribution board",
            MaterialKind::Finish => "Finishes",
            MaterialKind::Timber => "Roof timber",
            MaterialKind::RoofCovering => "Roof covering",
            MaterialKind::Underlayment => "Roofing underlayment",
            MaterialKind::Insulation => "Roof insulation",
            MaterialKind::Gutters => "Gutters",
            MaterialKind::Downpipes => "Downpipes",
            MaterialKind::Flashings => "Flashings",
            MaterialKind::Fascia => "Fascia board",
            MaterialKind::Soffit => "Soffit",
            MaterialKind::RidgeCaps => "Ridge capping",
            MaterialKind::ValleyTrays => "Valley trays",
            MaterialKind::Pipes => "Pipes",
            MaterialKind::SanitaryFittings => "Sanitary fittings",
        }
    }
}

impl std::fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Identity of a priced material: kind, optional variant and grade.
///
/// ## JSON Example
///
/// ```json
/// { "kind": "cable", "variant": "NYM-J", "grade": "2.5 mm²" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialRef {
    pub kind: MaterialKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

impl MaterialRef {
    pub fn new(kind: MaterialKind) -> Self {
        MaterialRef {
            kind,
            variant: None,
            grade: None,
        }
    }

    /// Builder: set the variant (bar size, block type, cable type, ...)
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Builder: set the grade (cable size, rating, door size, ...)
    pub fn with_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = Some(grade.into());
        self
    }

    /// Name looked up in the price tables.
    ///
    /// Finishes are priced per category, so their variant is the table name.
    pub fn price_name(&self) -> &str {
        match (self.kind, self.variant.as_deref()) {
            (MaterialKind::Finish, Some(category)) => category,
            _ => self.kind.price_name(),
        }
    }

    /// Variant to select inside a structured price, if any.
    pub fn price_variant(&self) -> Option<&str> {
        match self.kind {
            MaterialKind::Finish => None,
            _ => self.variant.as_deref(),
        }
    }

    /// Description used on bills and totals
    pub fn label(&self) -> String {
        let mut label = self.kind.display_name().to_string();
        for part in [self.variant.as_deref(), self.grade.as_deref()]
            .into_iter()
            .flatten()
        {
            label.push(' ');
            label.push_str(part);
        }
        label
    }
}

impl std::fmt::Display for MaterialRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
