//! # Price Resolution
//!
//! Turns base price tables, regional multipliers and per-user overrides into
//! the effective price of each material for one region.
//!
//! ## Rules
//!
//! 1. A material missing from the base table has no price; its cost is zero.
//! 2. A user override for (material, region) replaces the whole price,
//!    scalar and variants alike. Nothing is merged from the base entry.
//! 3. Otherwise every price leaf of the base entry is multiplied by the
//!    region's multiplier (1 when the region is unknown).
//!
//! A price may be a single scalar, a list of variants (bar sizes, block
//! types), or variants carrying a grade → price table (door sizes, cable
//! sizes). Variant attributes such as diameter are descriptive and never
//! scaled.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::pricing::{resolve_price, MaterialPrice, RegionalMultiplier};
//!
//! let base = vec![MaterialPrice::scalar("cement", "Cement", "bag", 750.0)];
//! let multipliers = vec![RegionalMultiplier::new("Mombasa", 1.2)];
//!
//! let price = resolve_price("cement", "Mombasa", &[], &base, &multipliers)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(price.price, Some(900.0));
//! ```
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "id": "rebar",
//!   "name": "Rebar",
//!   "unit": "kg",
//!   "variants": [
//!     { "name": "Y12", "price": 140, "attributes": { "diameter_mm": 12 } },
//!     { "name": "Y16", "price": 138 }
//!   ]
//! }
//! ```

pub mod costing;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{CalcError, CalcResult};
use crate::materials::MaterialRef;
use crate::units::lenient;

pub use costing::{cost_item, CostedItem, CostedLine};

/// Grade key used when no grade matches
pub const DEFAULT_GRADE: &str = "default";

// ============================================================================
// Price Data
// ============================================================================

/// One variant of a structured price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceVariant {
    /// Bar size, block type, cable type, door style, ...
    pub name: String,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub price: Option<f64>,
    /// Grade → price (door sizes, cable sizes)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prices: BTreeMap<String, f64>,
    /// Descriptive data; never treated as a price
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl PriceVariant {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        PriceVariant {
            name: name.into(),
            price: Some(price),
            prices: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder: add a grade price
    pub fn with_grade_price(mut self, grade: impl Into<String>, price: f64) -> Self {
        self.prices.insert(grade.into(), price);
        self
    }

    /// Price for `grade`: exact match, then partial match, then the default
    /// grade. Matching ignores case.
    pub fn grade_price(&self, grade: &str) -> Option<f64> {
        let wanted = grade.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        let lowered = || self.prices.iter().map(|(k, v)| (k.trim().to_lowercase(), *v));
        lowered()
            .find(|(k, _)| *k == wanted)
            .or_else(|| {
                lowered().find(|(k, _)| !k.is_empty() && (k.contains(&wanted) || wanted.contains(k)))
            })
            .map(|(_, v)| v)
            .or_else(|| self.grade_default())
    }

    fn grade_default(&self) -> Option<f64> {
        self.prices
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(DEFAULT_GRADE))
            .map(|(_, v)| *v)
    }

    fn scaled(&self, multiplier: f64) -> Self {
        PriceVariant {
            name: self.name.clone(),
            price: self.price.map(|p| p * multiplier),
            prices: self
                .prices
                .iter()
                .map(|(grade, price)| (grade.clone(), price * multiplier))
                .collect(),
            attributes: self.attributes.clone(),
        }
    }

    fn leaves(&self) -> impl Iterator<Item = f64> + '_ {
        self.price.into_iter().chain(self.prices.values().copied())
    }
}

/// A material in the base price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialPrice {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<PriceVariant>,
}

impl MaterialPrice {
    pub fn scalar(id: impl Into<String>, name: impl Into<String>, unit: impl Into<String>, price: f64) -> Self {
        MaterialPrice {
            id: id.into(),
            name: name.into(),
            unit: Some(unit.into()),
            category: None,
            price: Some(price),
            variants: Vec::new(),
        }
    }

    pub fn structured(
        id: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        variants: Vec<PriceVariant>,
    ) -> Self {
        MaterialPrice {
            id: id.into(),
            name: name.into(),
            unit: Some(unit.into()),
            category: None,
            price: None,
            variants,
        }
    }
}

/// A user's replacement price for one material in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPriceOverride {
    pub user_id: String,
    pub region: String,
    pub material_id: String,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<PriceVariant>,
}

impl UserPriceOverride {
    /// Reject overrides that cannot be applied.
    pub fn validate(&self) -> CalcResult<()> {
        let fail = |reason: &str| {
            Err(CalcError::invalid_override(
                self.material_id.clone(),
                self.region.clone(),
                reason,
            ))
        };
        if self.price.is_none() && self.variants.is_empty() {
            return fail("override has neither a price nor variants");
        }
        if self.price.is_some_and(|p| !is_valid_price(p)) {
            return fail("price must be a non-negative number");
        }
        for variant in &self.variants {
            if variant.name.trim().is_empty() {
                return fail("variant has no name");
            }
            if variant.leaves().any(|p| !is_valid_price(p)) {
                return fail("variant prices must be non-negative numbers");
            }
        }
        Ok(())
    }
}

fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price >= 0.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalMultiplier {
    pub region: String,
    #[serde(deserialize_with = "lenient::number")]
    pub multiplier: f64,
}

impl RegionalMultiplier {
    pub fn new(region: impl Into<String>, multiplier: f64) -> Self {
        RegionalMultiplier {
            region: region.into(),
            multiplier,
        }
    }
}

/// Where an effective price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Base,
    Override,
}

/// Price of one material after overrides and multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectivePrice {
    pub material_id: String,
    pub name: String,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub variants: Vec<PriceVariant>,
    pub source: PriceSource,
    /// Multiplier applied (1 for overrides)
    pub multiplier: f64,
}

impl EffectivePrice {
    /// Variant by name, ignoring case
    pub fn variant(&self, name: &str) -> Option<&PriceVariant> {
        let name = name.trim();
        self.variants
            .iter()
            .find(|v| v.name.trim().eq_ignore_ascii_case(name))
    }

    /// Variant by name, then by partial name
    fn variant_matching(&self, name: &str) -> Option<&PriceVariant> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.variant(name).or_else(|| {
            self.variants
                .iter()
                .find(|v| v.name.to_lowercase().contains(&wanted))
        })
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Effective price of `material_id` in `region`.
///
/// `overrides` should already be scoped to the user; the first override
/// matching material and region wins.
pub fn resolve_price(
    material_id: &str,
    region: &str,
    overrides: &[UserPriceOverride],
    base_prices: &[MaterialPrice],
    multipliers: &[RegionalMultiplier],
) -> CalcResult<Option<EffectivePrice>> {
    let Some(base) = base_prices.iter().find(|m| m.id == material_id) else {
        return Ok(None);
    };

    if let Some(user) = overrides
        .iter()
        .find(|o| o.material_id == material_id && same_region(&o.region, region))
    {
        user.validate()?;
        debug!(material = material_id, region, "using user price override");
        return Ok(Some(EffectivePrice {
            material_id: base.id.clone(),
            name: base.name.clone(),
            unit: base.unit.clone(),
            category: base.category.clone(),
            price: user.price,
            variants: user.variants.clone(),
            source: PriceSource::Override,
            multiplier: 1.0,
        }));
    }

    let multiplier = regional_multiplier(region, multipliers);
    Ok(Some(EffectivePrice {
        material_id: base.id.clone(),
        name: base.name.clone(),
        unit: base.unit.clone(),
        category: base.category.clone(),
        price: base.price.map(|p| p * multiplier),
        variants: base.variants.iter().map(|v| v.scaled(multiplier)).collect(),
        source: PriceSource::Base,
        multiplier,
    }))
}

fn same_region(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Multiplier for `region`; 1 when unknown or unusable.
pub fn regional_multiplier(region: &str, multipliers: &[RegionalMultiplier]) -> f64 {
    match multipliers.iter().find(|m| same_region(&m.region, region)) {
        Some(m) if m.multiplier.is_finite() && m.multiplier > 0.0 => m.multiplier,
        Some(m) => {
            warn!(
                region,
                multiplier = m.multiplier,
                "ignoring unusable regional multiplier"
            );
            1.0
        }
        None => 1.0,
    }
}

// ============================================================================
// Price Book
// ============================================================================

/// Everything needed to price a quote, as loaded by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceInputs {
    pub base_prices: Vec<MaterialPrice>,
    pub overrides: Vec<UserPriceOverride>,
    pub multipliers: Vec<RegionalMultiplier>,
}

/// Effective prices for one region and user, looked up by material name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBook {
    pub region: String,
    prices: BTreeMap<String, EffectivePrice>,
}

impl PriceBook {
    /// Resolve every base material for `region`, applying `user_id`'s overrides.
    pub fn resolve(region: &str, user_id: &str, inputs: &PriceInputs) -> CalcResult<Self> {
        let overrides: Vec<UserPriceOverride> = inputs
            .overrides
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();

        let mut prices = BTreeMap::new();
        for base in &inputs.base_prices {
            if let Some(price) =
                resolve_price(&base.id, region, &overrides, &inputs.base_prices, &inputs.multipliers)?
            {
                prices.insert(key(&price.name), price);
            }
        }
        debug!(region, materials = prices.len(), "resolved price book");
        Ok(PriceBook {
            region: region.to_string(),
            prices,
        })
    }

    pub fn get(&self, name: &str) -> Option<&EffectivePrice> {
        self.prices.get(&key(name))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectivePrice> {
        self.prices.values()
    }

    /// Unit price for a material line, or `None` when nothing matches.
    ///
    /// With a variant: the variant's grade price, then the variant price,
    /// then the material's scalar price. Without one, the grade selects a
    /// variant by name (exact, then partial) before falling back to the
    /// scalar price.
    pub fn unit_price(&self, material: &MaterialRef) -> Option<f64> {
        let entry = self.get(material.price_name())?;
        let grade = material.grade.as_deref();
        match material.price_variant() {
            Some(name) => entry
                .variant(name)
                .and_then(|v| grade.and_then(|g| v.grade_price(g)).or(v.price))
                .or(entry.price),
            None => grade
                .and_then(|g| entry.variant_matching(g))
                .and_then(|v| v.price.or_else(|| v.grade_default()))
                .or(entry.price),
        }
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::MaterialKind;

    fn rebar() -> MaterialPrice {
        let mut y12 = PriceVariant::new("Y12", 140.0);
        y12.attributes.insert("diameter_mm".to_string(), Value::from(12));
        MaterialPrice::structured("rebar", "Rebar", "kg", vec![y12, PriceVariant::new("Y16", 138.0)])
    }

    fn doors() -> MaterialPrice {
        let panel = PriceVariant {
            name: "Panel".to_string(),
            price: None,
            prices: BTreeMap::from([
                ("0.9 x 2.1 m".to_string(), 12000.0),
                ("default".to_string(), 10000.0),
            ]),
            attributes: BTreeMap::new(),
        };
        MaterialPrice::structured("doors", "Doors", "pcs", vec![panel])
    }

    fn base() -> Vec<MaterialPrice> {
        vec![
            MaterialPrice::scalar("cement", "Cement", "bag", 750.0),
            rebar(),
            doors(),
        ]
    }

    #[test]
    fn test_unknown_material() {
        let price = resolve_price("glass", "Nairobi", &[], &base(), &[]).unwrap();
        assert!(price.is_none());
    }

    #[test]
    fn test_unknown_region_uses_base() {
        let price = resolve_price("cement", "Kisumu", &[], &base(), &[]).unwrap().unwrap();
        assert_eq!(price.price, Some(750.0));
        assert_eq!(price.multiplier, 1.0);
        assert_eq!(price.source, PriceSource::Base);
    }

    #[test]
    fn test_multiplier_scales_every_leaf() {
        let multipliers = vec![RegionalMultiplier::new("Mombasa", 1.5)];
        let rebar = resolve_price("rebar", "mombasa", &[], &base(), &multipliers)
            .unwrap()
            .unwrap();
        assert_eq!(rebar.variants[0].price, Some(210.0));
        assert_eq!(rebar.variants[1].price, Some(207.0));
        // attributes untouched
        assert_eq!(rebar.variants[0].attributes["diameter_mm"], Value::from(12));

        let doors = resolve_price("doors", "Mombasa", &[], &base(), &multipliers)
            .unwrap()
            .unwrap();
        assert_eq!(doors.variants[0].prices["0.9 x 2.1 m"], 18000.0);
        assert_eq!(doors.variants[0].prices["default"], 15000.0);
    }

    #[test]
    fn test_bad_multiplier_is_ignored() {
        let multipliers = vec![RegionalMultiplier::new("Nairobi", -2.0)];
        assert_eq!(regional_multiplier("Nairobi", &multipliers), 1.0);
        let multipliers = vec![RegionalMultiplier::new("Nairobi", f64::NAN)];
        assert_eq!(regional_multiplier("Nairobi", &multipliers), 1.0);
    }

    #[test]
    fn test_override_replaces_wholesale() {
        let overrides = vec![UserPriceOverride {
            user_id: "u1".to_string(),
            region: "Nairobi".to_string(),
            material_id: "rebar".to_string(),
            price: None,
            variants: vec![PriceVariant::new("Y12", 150.0)],
        }];
        let multipliers = vec![RegionalMultiplier::new("Nairobi", 2.0)];
        let price = resolve_price("rebar", "Nairobi", &overrides, &base(), &multipliers)
            .unwrap()
            .unwrap();
        assert_eq!(price.source, PriceSource::Override);
        // no multiplier, no Y16 merged in from the base entry
        assert_eq!(price.variants.len(), 1);
        assert_eq!(price.variants[0].price, Some(150.0));
    }

    #[test]
    fn test_override_for_other_region_is_ignored() {
        let overrides = vec![UserPriceOverride {
            user_id: "u1".to_string(),
            region: "Mombasa".to_string(),
            material_id: "cement".to_string(),
            price: Some(900.0),
            variants: Vec::new(),
        }];
        let price = resolve_price("cement", "Nairobi", &overrides, &base(), &[])
            .unwrap()
            .unwrap();
        assert_eq!(price.price, Some(750.0));
    }

    #[test]
    fn test_malformed_override_is_an_error() {
        let empty = UserPriceOverride {
            user_id: "u1".to_string(),
            region: "Nairobi".to_string(),
            material_id: "cement".to_string(),
            price: None,
            variants: Vec::new(),
        };
        let err = resolve_price("cement", "Nairobi", &[empty.clone()], &base(), &[]).unwrap_err();
        assert!(matches!(err, CalcError::InvalidOverride { .. }));

        let negative = UserPriceOverride {
            price: Some(-1.0),
            ..empty.clone()
        };
        assert!(negative.validate().is_err());

        let unnamed = UserPriceOverride {
            variants: vec![PriceVariant::new(" ", 10.0)],
            ..empty
        };
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_book_scopes_overrides_to_user() {
        let inputs = PriceInputs {
            base_prices: base(),
            overrides: vec![UserPriceOverride {
                user_id: "someone-else".to_string(),
                region: "Nairobi".to_string(),
                material_id: "cement".to_string(),
                price: Some(1.0),
                variants: Vec::new(),
            }],
            multipliers: Vec::new(),
        };
        let book = PriceBook::resolve("Nairobi", "u1", &inputs).unwrap();
        assert_eq!(book.len(), 3);
        assert_eq!(book.get("CEMENT").and_then(|p| p.price), Some(750.0));
    }

    #[test]
    fn test_unit_price_lookup() {
        let book = PriceBook::resolve("Nairobi", "u1", &PriceInputs {
            base_prices: base(),
            ..PriceInputs::default()
        })
        .unwrap();

        let cement = MaterialRef::new(MaterialKind::Cement);
        assert_eq!(book.unit_price(&cement), Some(750.0));

        let y16 = MaterialRef::new(MaterialKind::Rebar).with_variant("y16");
        assert_eq!(book.unit_price(&y16), Some(138.0));

        let exact = MaterialRef::new(MaterialKind::Doors)
            .with_variant("Panel")
            .with_grade("0.9 x 2.1 m");
        assert_eq!(book.unit_price(&exact), Some(12000.0));

        let partial = MaterialRef::new(MaterialKind::Doors)
            .with_variant("Panel")
            .with_grade("0.9 x 2.1");
        assert_eq!(book.unit_price(&partial), Some(12000.0));

        let fallback = MaterialRef::new(MaterialKind::Doors)
            .with_variant("Panel")
            .with_grade("1.2 x 2.4 m");
        assert_eq!(book.unit_price(&fallback), Some(10000.0));

        let missing = MaterialRef::new(MaterialKind::Mesh).with_variant("A142");
        assert_eq!(book.unit_price(&missing), None);
    }

    #[test]
    fn test_finish_lookup_by_material_name() {
        let flooring = MaterialPrice::structured(
            "flooring",
            "flooring",
            "m²",
            vec![PriceVariant::new("Ceramic tiles", 1800.0)],
        );
        let book = PriceBook::resolve("Nairobi", "u1", &PriceInputs {
            base_prices: vec![flooring],
            ..PriceInputs::default()
        })
        .unwrap();
        let tiles = MaterialRef::new(MaterialKind::Finish)
            .with_variant("flooring")
            .with_grade("ceramic");
        assert_eq!(book.unit_price(&tiles), Some(1800.0));
    }

    #[test]
    fn test_price_json() {
        let json = r#"{
            "id": "cable",
            "name": "Cable",
            "unit": "m",
            "variants": [{ "name": "NYM-J", "prices": { "2.5 mm²": 120 } }]
        }"#;
        let price: MaterialPrice = serde_json::from_str(json).unwrap();
        assert_eq!(price.price, None);
        assert_eq!(price.variants[0].grade_price("2.5 MM²"), Some(120.0));
    }
}
