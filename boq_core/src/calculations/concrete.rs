//! # Concrete Calculation
//!
//! Turns a [`ConcreteRow`] into concrete volume, formwork, exposed surface
//! and the cement, sand, ballast and water needed to place it.
//!
//! ## Element Geometry
//!
//! L, W, H are the row dimensions and n the count. Every volume, area and
//! formwork figure below is multiplied by n.
//!
//! | Element | Volume | Surface | Formwork |
//! |---------|--------|---------|----------|
//! | slab, raft, paving, ramp | L·W·H | L·W | L·W |
//! | beam, ring beam | L·W·H | 2LH + LW | 2LH + LW |
//! | column | L·W·H | 2(L + W)H | 2(L + W)H |
//! | foundation, strip footing, pile cap | L·W·H | L·W | 2(L + W)H |
//! | kerb | L·W·H | 2LH + LW | 2LH |
//! | retaining wall | L·W·H | 2LH | LH |
//! | culvert | walls 0.20, base 0.25, cover 0.20 | 2(L + W)H + LW | 2(L + W)H |
//! | swimming pool | walls 0.25, base 0.20 | 2(L + W)H + LW | 2(L + W)H |
//! | drainage channel | base and walls 0.15 | 2LH + LW | 2LH + LW |
//! | manhole, inspection chamber | ring 0.15, base 0.20, cover 0.10 | πdH + LW | πdH |
//!
//! Stepped foundations sum their steps; staircases use tread, riser and a
//! landing; tanks and pits are sized in [`super::underground`].
//!
//! ## Materials
//!
//! The dry volume (placed volume × dry-volume factor) is split by the mix
//! ratio. Cement goes in 50 kg bags of 0.035 m³; sand and ballast in m³.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::calculations::concrete;
//! use boq_core::elements::{ConcreteRow, ElementType};
//! use boq_core::settings::QsSettings;
//!
//! let row = ConcreteRow::new("Ground slab", ElementType::Slab).with_dimensions(5.0, 4.0, 0.15);
//! let result = concrete::calculate(&row, &QsSettings::default());
//! assert!((result.volume_m3 - 3.0).abs() < 1e-9);
//! assert!(result.issues.is_empty());
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::water::{concrete_water, mortar_water, water_line, WaterBreakdown};
use super::{
    ceil_count, checked_dimension, keep_non_empty, positive_dimension, underground, Component,
    MaterialLine,
};
use crate::elements::{
    BuildingCategory, ConcreteRow, ElementDetail, ElementType, FoundationWalling,
    RetainingWallDetail, StaircaseDetail,
};
use crate::materials::concrete_mix::MixSplit;
use crate::materials::{MaterialKind, MaterialRef, MixRatio};
use crate::settings::{QsSettings, WastageCategory};
use crate::units::{finite_non_negative, positive_opt_or, positive_or, Unit};

/// DPC strip width when the row names none (m)
pub const DEFAULT_DPC_WIDTH: f64 = 0.225;
/// Foundation walling thickness when the row names none (m)
pub const DEFAULT_WALLING_THICKNESS: f64 = 0.2;

/// Placed volume, exposed surface and formwork of one row.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConcreteGeometry {
    pub volume_m3: f64,
    pub surface_area_m2: f64,
    pub formwork_m2: f64,
}

/// Result of a concrete row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteResult {
    pub row_id: Uuid,
    pub name: String,
    pub element: ElementType,
    pub category: BuildingCategory,
    /// Mix actually used, e.g. "1:2:4"
    pub mix: String,
    /// Element concrete, excluding the blinding bed
    pub element_volume_m3: f64,
    pub bed_volume_m3: f64,
    /// Element plus blinding
    pub volume_m3: f64,
    pub surface_area_m2: f64,
    pub formwork_m2: f64,
    pub hardcore_m3: f64,
    pub walling_blocks: f64,
    pub walling_mortar_m3: f64,
    pub materials: MixSplit,
    pub water: WaterBreakdown,
    pub lines: Vec<MaterialLine>,
    pub issues: Vec<String>,
}

/// Calculate one concrete row.
pub fn calculate(row: &ConcreteRow, settings: &QsSettings) -> ConcreteResult {
    let mut issues = Vec::new();
    // Tanks, pits and stepped bases are sized from their detail
    let sized_by_detail = row.element.is_underground()
        || (row.element.can_step() && row.detail.is_stepped());
    let dimension: fn(&str, f64, &mut Vec<String>) -> f64 = if sized_by_detail {
        checked_dimension
    } else {
        positive_dimension
    };
    let length = dimension("Length", row.length, &mut issues);
    let width = dimension("Width", row.width, &mut issues);
    let height = dimension("Height", row.height, &mut issues);
    let count = finite_non_negative(row.count);
    let has_plan = length > 0.0 && width > 0.0;

    let mut lines = Vec::new();

    let (geometry, add_ons) = match underground::takeoff(row, length, width, height, count) {
        Some(takeoff) => (
            ConcreteGeometry {
                volume_m3: takeoff.volume_m3(),
                surface_area_m2: takeoff.surface_area_m2,
                formwork_m2: takeoff.formwork_m2,
            },
            takeoff.add_ons,
        ),
        None => (
            element_geometry(row.element, &row.detail, length, width, height, count),
            Vec::new(),
        ),
    };

    // Blinding and hardcore beds sit under the full plan of a plain foundation
    let mut bed_volume = 0.0;
    let mut hardcore = 0.0;
    if let Some(beds) = &row.beds {
        if row.element.takes_beds() && !row.detail.is_stepped() {
            let bed_area = length * width * count;
            bed_volume = bed_area * positive_opt_or(beds.concrete_depth, 0.0);
            hardcore = bed_area * positive_opt_or(beds.hardcore_depth, 0.0);
        }
    }
    let volume = geometry.volume_m3 + bed_volume;

    let mix = resolve_mix(row.mix.as_deref(), settings, &mut issues);
    let dry_factor = positive_or(settings.concrete.dry_volume_factor, 1.54);
    let split = mix.split(volume, dry_factor);
    let concrete_wastage = settings.wastage_fraction(WastageCategory::Concrete);

    lines.push(MaterialLine::new(
        MaterialRef::new(MaterialKind::Cement),
        Unit::Bag,
        Component::Concrete,
        split.cement_bags,
        concrete_wastage,
    ));
    lines.push(MaterialLine::new(
        MaterialRef::new(MaterialKind::Sand),
        Unit::CubicMeter,
        Component::Concrete,
        split.sand_m3,
        concrete_wastage,
    ));
    lines.push(MaterialLine::new(
        MaterialRef::new(MaterialKind::Ballast),
        Unit::CubicMeter,
        Component::Concrete,
        split.stone_m3,
        concrete_wastage,
    ));
    lines.push(MaterialLine::exact(
        MaterialRef::new(MaterialKind::Formwork),
        Unit::SquareMeter,
        Component::Formwork,
        geometry.formwork_m2,
    ));
    lines.push(MaterialLine::exact(
        MaterialRef::new(MaterialKind::Hardcore),
        Unit::CubicMeter,
        Component::AddOn,
        hardcore,
    ));

    let water_cement_ratio =
        positive_opt_or(row.water_cement_ratio, settings.water.water_cement_ratio);
    let mut water = concrete_water(
        &split,
        volume,
        geometry.surface_area_m2,
        water_cement_ratio,
        &settings.water,
    );

    let mut walling_blocks = 0.0;
    let mut walling_mortar = 0.0;
    if let Some(walling) = &row.foundation_walling {
        if row.element.takes_walling() && has_plan {
            let takeoff = foundation_walling(walling, length * count, settings);
            walling_blocks = takeoff.blocks;
            walling_mortar = takeoff.mortar_m3;
            let mortar = settings.masonry.mortar().split(takeoff.mortar_m3);
            water = water + mortar_water(&mortar, takeoff.mortar_m3, &settings.water);
            lines.extend(walling_lines(walling, &takeoff, &mortar, settings));
        }
    }

    if let Some(proofing) = &row.waterproofing {
        lines.push(MaterialLine::exact(
            MaterialRef::new(MaterialKind::Dpc),
            Unit::SquareMeter,
            Component::Waterproofing,
            if proofing.dpc && has_plan {
                length * positive_opt_or(proofing.dpc_width, DEFAULT_DPC_WIDTH) * count
            } else {
                0.0
            },
        ));
        lines.push(MaterialLine::exact(
            MaterialRef::new(MaterialKind::Polythene),
            Unit::SquareMeter,
            Component::Waterproofing,
            if proofing.polythene && has_plan {
                length * width * count
            } else {
                0.0
            },
        ));
        if let Some(membrane) = proofing.membrane {
            lines.push(MaterialLine::exact(
                MaterialRef::new(MaterialKind::Waterproofing)
                    .with_variant(membrane.display_name()),
                Unit::SquareMeter,
                Component::Waterproofing,
                geometry.surface_area_m2,
            ));
        }
    }

    lines.extend(add_ons);
    lines.push(water_line(&water, settings));

    ConcreteResult {
        row_id: row.id,
        name: row.name.clone(),
        element: row.element,
        category: row.category(),
        mix: mix.label(),
        element_volume_m3: geometry.volume_m3,
        bed_volume_m3: bed_volume,
        volume_m3: volume,
        surface_area_m2: geometry.surface_area_m2,
        formwork_m2: geometry.formwork_m2,
        hardcore_m3: hardcore,
        walling_blocks,
        walling_mortar_m3: walling_mortar,
        materials: split,
        water,
        lines: keep_non_empty(lines),
        issues,
    }
}

fn resolve_mix(text: Option<&str>, settings: &QsSettings, issues: &mut Vec<String>) -> MixRatio {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        None => settings.concrete.mix(),
        Some(text) => MixRatio::parse(text).unwrap_or_else(|| {
            let fallback = settings.concrete.mix();
            issues.push(format!(
                "Unknown mix ratio \"{}\", using {}",
                text,
                fallback.label()
            ));
            fallback
        }),
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Geometry of above-ground and foundation elements.
///
/// A row with zero length or width has no geometry. Stepped foundations are
/// measured from their steps instead.
pub fn element_geometry(
    element: ElementType,
    detail: &ElementDetail,
    length: f64,
    width: f64,
    height: f64,
    count: f64,
) -> ConcreteGeometry {
    if let ElementDetail::SteppedFoundation { steps } = detail {
        if element.can_step() && !steps.is_empty() {
            let mut geometry = ConcreteGeometry {
                surface_area_m2: length * width * count,
                ..ConcreteGeometry::default()
            };
            for step in steps {
                let l = finite_non_negative(step.length);
                let w = finite_non_negative(step.width);
                let d = finite_non_negative(step.depth);
                geometry.volume_m3 += l * w * d * count;
                geometry.formwork_m2 += 2.0 * (l + w) * d * count;
            }
            return geometry;
        }
    }

    if length <= 0.0 || width <= 0.0 {
        return ConcreteGeometry::default();
    }

    let (l, w, h, n) = (length, width, height, count);
    let block = l * w * h * n;
    let plan = l * w * n;
    let perimeter_faces = 2.0 * (l + w) * h * n;

    match element {
        ElementType::Slab | ElementType::RaftFoundation | ElementType::Paving | ElementType::Ramp => {
            ConcreteGeometry {
                volume_m3: block,
                surface_area_m2: plan,
                formwork_m2: plan,
            }
        }
        ElementType::Beam | ElementType::RingBeam => ConcreteGeometry {
            volume_m3: block,
            surface_area_m2: (2.0 * l * h + l * w) * n,
            formwork_m2: (2.0 * h * l + w * l) * n,
        },
        ElementType::Column => ConcreteGeometry {
            volume_m3: block,
            surface_area_m2: perimeter_faces,
            formwork_m2: perimeter_faces,
        },
        ElementType::Foundation | ElementType::StripFooting | ElementType::PileCap => {
            ConcreteGeometry {
                volume_m3: block,
                surface_area_m2: plan,
                formwork_m2: perimeter_faces,
            }
        }
        ElementType::Kerb => ConcreteGeometry {
            volume_m3: block,
            surface_area_m2: (2.0 * h * l + w * l) * n,
            formwork_m2: 2.0 * h * l * n,
        },
        ElementType::RetainingWall => match detail {
            ElementDetail::RetainingWall(wall) => cantilever_wall(wall, l, h, n),
            _ => ConcreteGeometry {
                volume_m3: block,
                surface_area_m2: 2.0 * l * h * n,
                formwork_m2: l * h * n,
            },
        },
        ElementType::Culvert => ConcreteGeometry {
            volume_m3: perimeter_faces * 0.2 + plan * 0.25 + plan * 0.2,
            surface_area_m2: perimeter_faces + plan,
            formwork_m2: perimeter_faces,
        },
        ElementType::SwimmingPool => ConcreteGeometry {
            volume_m3: perimeter_faces * 0.25 + plan * 0.2,
            surface_area_m2: perimeter_faces + plan,
            formwork_m2: perimeter_faces,
        },
        ElementType::DrainageChannel => ConcreteGeometry {
            volume_m3: plan * 0.15 + 2.0 * l * h * 0.15 * n,
            surface_area_m2: (2.0 * l * h + l * w) * n,
            formwork_m2: (2.0 * h * l + w * l) * n,
        },
        ElementType::Manhole | ElementType::InspectionChamber => {
            let diameter = (l * w).sqrt();
            let radius = diameter / 2.0;
            let ring = PI * diameter * h;
            let disc = PI * radius * radius;
            ConcreteGeometry {
                volume_m3: (ring * 0.15 + disc * 0.2 + disc * 0.1) * n,
                surface_area_m2: (ring + l * w) * n,
                formwork_m2: ring * n,
            }
        }
        ElementType::Staircase => {
            let stairs = match detail {
                ElementDetail::Staircase(stairs) => stairs.clone(),
                _ => StaircaseDetail::default(),
            };
            staircase(&stairs, l, w, h, n)
        }
        ElementType::SepticTank
        | ElementType::UndergroundTank
        | ElementType::WaterTank
        | ElementType::SoakPit
        | ElementType::Soakaway => ConcreteGeometry {
            volume_m3: block,
            surface_area_m2: perimeter_faces + plan,
            formwork_m2: perimeter_faces,
        },
    }
}

fn staircase(detail: &StaircaseDetail, length: f64, width: f64, height: f64, count: f64) -> ConcreteGeometry {
    let riser = positive_opt_or(detail.riser_height, 0.15);
    let tread = positive_opt_or(detail.tread_width, 0.3);
    let steps = match detail.steps.filter(|s| s.is_finite() && *s > 0.0) {
        Some(steps) => steps.floor(),
        None => ceil_count(height / riser),
    };
    let step_volume = tread * riser * width / 2.0;
    let landing = length * width * 0.15;
    let faces = (tread + riser) * width * steps;
    ConcreteGeometry {
        volume_m3: (step_volume * steps + landing) * count,
        surface_area_m2: faces * count,
        formwork_m2: faces * 2.0 * count,
    }
}

/// Stem on a base slab. Height is the overall wall height.
fn cantilever_wall(detail: &RetainingWallDetail, length: f64, height: f64, count: f64) -> ConcreteGeometry {
    let stem = positive_opt_or(detail.stem_thickness, 0.3);
    let base_thickness = positive_opt_or(detail.base_thickness, 0.4);
    let base_width = positive_opt_or(detail.base_width, 1.3);
    let stem_height = (height - base_thickness).max(0.0);
    ConcreteGeometry {
        volume_m3: (length * stem_height * stem + length * base_width * base_thickness) * count,
        surface_area_m2: 2.0 * length * height * count,
        formwork_m2: (2.0 * length * stem_height + 2.0 * length * base_thickness) * count,
    }
}

// ============================================================================
// Foundation Walling
// ============================================================================

/// Blocks and mortar for walling laid on a foundation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WallingTakeoff {
    pub blocks: f64,
    pub mortar_m3: f64,
}

/// Course-based take-off: whole blocks per course, whole courses, whole
/// leaves through the wall thickness.
pub fn foundation_walling(
    walling: &FoundationWalling,
    wall_length: f64,
    settings: &QsSettings,
) -> WallingTakeoff {
    let height = finite_non_negative(walling.height);
    if wall_length <= 0.0 || height <= 0.0 {
        return WallingTakeoff::default();
    }
    let block = walling.block();
    let joint = finite_non_negative(settings.masonry.joint_thickness);
    let thickness = positive_opt_or(walling.thickness, DEFAULT_WALLING_THICKNESS);

    let per_course = ceil_count(wall_length / (block.length + joint));
    let courses = ceil_count(height / (block.height + joint));
    let leaves = ceil_count(thickness / block.thickness);

    WallingTakeoff {
        blocks: per_course * courses * leaves,
        mortar_m3: wall_length * thickness * joint * courses
            + height * thickness * joint * per_course,
    }
}

fn walling_lines(
    walling: &FoundationWalling,
    takeoff: &WallingTakeoff,
    mortar: &MixSplit,
    settings: &QsSettings,
) -> Vec<MaterialLine> {
    let wastage = settings.wastage_fraction(WastageCategory::Masonry);
    vec![
        MaterialLine::new(
            MaterialRef::new(MaterialKind::Blocks).with_variant(walling.block_type.display_name()),
            Unit::Piece,
            Component::Walling,
            takeoff.blocks,
            wastage,
        ),
        MaterialLine::new(
            MaterialRef::new(MaterialKind::Cement),
            Unit::Bag,
            Component::Mortar,
            mortar.cement_bags,
            wastage,
        ),
        MaterialLine::new(
            MaterialRef::new(MaterialKind::Sand),
            Unit::CubicMeter,
            Component::Mortar,
            mortar.sand_m3,
            wastage,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Beds, FoundationStep, MembraneType, Waterproofing};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn line<'a>(result: &'a ConcreteResult, kind: MaterialKind) -> Option<&'a MaterialLine> {
        result.lines.iter().find(|l| l.material.kind == kind)
    }

    #[test]
    fn test_slab_cement_example() {
        let mut settings = QsSettings::default();
        // 1/7 of 1.5925 m³ dry per m³ -> 6.5 bags per m³
        settings.concrete.dry_volume_factor = 1.5925;
        let row = ConcreteRow::new("Slab", ElementType::Slab).with_dimensions(5.0, 4.0, 0.15);
        let result = calculate(&row, &settings);

        assert!(approx(result.volume_m3, 3.0));
        let cement = line(&result, MaterialKind::Cement).unwrap();
        assert!((cement.net - 19.5).abs() < 1e-9);
        assert!((cement.gross - 20.475).abs() < 1e-9);
        assert_eq!(cement.wastage_fraction, 0.05);
    }

    #[test]
    fn test_zero_dimension_contributes_nothing() {
        let row = ConcreteRow::new("Slab", ElementType::Slab).with_dimensions(0.0, 4.0, 0.15);
        let result = calculate(&row, &QsSettings::default());
        assert_eq!(result.volume_m3, 0.0);
        assert!(result.lines.is_empty());
        assert_eq!(result.issues, vec!["Length must be > 0".to_string()]);
    }

    #[test]
    fn test_zero_width_foundation_bills_no_add_ons() {
        let mut row = ConcreteRow::new("Base", ElementType::Foundation).with_dimensions(10.0, 0.0, 0.3);
        row.foundation_walling = Some(FoundationWalling {
            height: 1.0,
            ..FoundationWalling::default()
        });
        row.waterproofing = Some(Waterproofing {
            dpc: true,
            dpc_width: None,
            polythene: true,
            membrane: None,
        });
        let result = calculate(&row, &QsSettings::default());
        assert!(result.lines.is_empty(), "{:?}", result.lines);
        assert_eq!(result.walling_blocks, 0.0);
        assert_eq!(result.walling_mortar_m3, 0.0);
        assert_eq!(result.issues, vec!["Width must be > 0".to_string()]);
    }

    #[test]
    fn test_stepped_foundation_needs_no_plan_height() {
        let mut row = ConcreteRow::new("Base", ElementType::Foundation).with_dimensions(2.0, 1.0, 0.0);
        row.detail = ElementDetail::SteppedFoundation {
            steps: vec![FoundationStep {
                length: 2.0,
                width: 1.0,
                depth: 0.3,
                offset: 0.0,
            }],
        };
        let result = calculate(&row, &QsSettings::default());
        assert!(approx(result.volume_m3, 0.6));
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_negative_dimension_reported() {
        let row = ConcreteRow::new("Slab", ElementType::Slab).with_dimensions(5.0, -4.0, 0.15);
        let result = calculate(&row, &QsSettings::default());
        assert_eq!(result.volume_m3, 0.0);
        assert_eq!(result.issues, vec!["Width must not be negative".to_string()]);
    }

    #[test]
    fn test_beam_and_column_faces() {
        let beam = element_geometry(ElementType::Beam, &ElementDetail::None, 4.0, 0.2, 0.45, 2.0);
        assert!(approx(beam.volume_m3, 0.72));
        assert!(approx(beam.formwork_m2, (2.0 * 0.45 * 4.0 + 0.2 * 4.0) * 2.0));

        let column = element_geometry(ElementType::Column, &ElementDetail::None, 0.3, 0.3, 3.0, 1.0);
        assert!(approx(column.formwork_m2, 2.0 * 0.6 * 3.0));
    }

    #[test]
    fn test_stepped_foundation() {
        let detail = ElementDetail::SteppedFoundation {
            steps: vec![
                FoundationStep {
                    length: 2.0,
                    width: 1.0,
                    depth: 0.3,
                    offset: 0.0,
                },
                FoundationStep {
                    length: 1.5,
                    width: 0.8,
                    depth: 0.3,
                    offset: 0.25,
                },
            ],
        };
        let g = element_geometry(ElementType::Foundation, &detail, 2.0, 1.0, 0.6, 2.0);
        assert!(approx(g.volume_m3, (0.6 + 0.36) * 2.0));
        assert!(approx(g.formwork_m2, (2.0 * 3.0 * 0.3 + 2.0 * 2.3 * 0.3) * 2.0));
    }

    #[test]
    fn test_staircase_steps_from_height() {
        let g = element_geometry(
            ElementType::Staircase,
            &ElementDetail::Staircase(StaircaseDetail::default()),
            1.2,
            1.0,
            3.0,
            1.0,
        );
        // 20 steps of 0.3 x 0.15 plus a 1.2 x 1.0 landing
        let expected = 0.3 * 0.15 * 1.0 / 2.0 * 20.0 + 1.2 * 0.15;
        assert!(approx(g.volume_m3, expected));
        assert!(approx(g.formwork_m2, 0.45 * 20.0 * 2.0));
    }

    #[test]
    fn test_manhole_is_circular() {
        let g = element_geometry(ElementType::Manhole, &ElementDetail::None, 1.0, 1.0, 1.5, 1.0);
        let ring = PI * 1.0 * 1.5;
        let disc = PI * 0.25;
        assert!(approx(g.volume_m3, ring * 0.15 + disc * 0.3));
    }

    #[test]
    fn test_beds_only_under_plain_foundations() {
        let mut row = ConcreteRow::new("Base", ElementType::Foundation).with_dimensions(10.0, 0.6, 0.3);
        row.beds = Some(Beds {
            concrete_depth: Some(0.05),
            hardcore_depth: Some(0.15),
        });
        let result = calculate(&row, &QsSettings::default());
        assert!(approx(result.bed_volume_m3, 0.3));
        assert!(approx(result.volume_m3, 1.8 + 0.3));
        assert!(approx(line(&result, MaterialKind::Hardcore).unwrap().net, 0.9));

        row.element = ElementType::Slab;
        let result = calculate(&row, &QsSettings::default());
        assert_eq!(result.bed_volume_m3, 0.0);
        assert!(line(&result, MaterialKind::Hardcore).is_none());
    }

    #[test]
    fn test_foundation_walling_courses() {
        let walling = FoundationWalling {
            height: 0.6,
            ..FoundationWalling::default()
        };
        let takeoff = foundation_walling(&walling, 4.1, &QsSettings::default());
        // 10 blocks per course, 3 courses, one leaf
        assert_eq!(takeoff.blocks, 30.0);
        let expected_mortar = 4.1 * 0.2 * 0.01 * 3.0 + 0.6 * 0.2 * 0.01 * 10.0;
        assert!(approx(takeoff.mortar_m3, expected_mortar));
    }

    #[test]
    fn test_waterproofing_lines() {
        let mut row = ConcreteRow::new("Base", ElementType::Foundation).with_dimensions(10.0, 0.6, 0.3);
        row.waterproofing = Some(Waterproofing {
            dpc: true,
            dpc_width: None,
            polythene: true,
            membrane: Some(MembraneType::Crystalline),
        });
        let result = calculate(&row, &QsSettings::default());
        assert!(approx(line(&result, MaterialKind::Dpc).unwrap().net, 2.25));
        assert!(approx(line(&result, MaterialKind::Polythene).unwrap().net, 6.0));
        let membrane = line(&result, MaterialKind::Waterproofing).unwrap();
        assert_eq!(membrane.material.variant.as_deref(), Some("Crystalline"));
        assert!(approx(membrane.net, result.surface_area_m2));
        assert_eq!(membrane.wastage_fraction, 0.0);
    }

    #[test]
    fn test_unknown_mix_falls_back() {
        let mut row = ConcreteRow::new("Slab", ElementType::Slab).with_dimensions(1.0, 1.0, 1.0);
        row.mix = Some("C25/30".to_string());
        let result = calculate(&row, &QsSettings::default());
        assert_eq!(result.mix, "1:2:4");
        assert_eq!(result.issues.len(), 1);

        row.mix = Some("1:3:6".to_string());
        let result = calculate(&row, &QsSettings::default());
        assert_eq!(result.mix, "1:3:6");
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_water_line_follows_settings() {
        let row = ConcreteRow::new("Slab", ElementType::Slab).with_dimensions(5.0, 4.0, 0.15);
        let settings = QsSettings::default();
        let result = calculate(&row, &settings);
        let water = line(&result, MaterialKind::Water).unwrap();
        assert!(!water.billable);
        assert!(approx(water.net, result.water.net_l / 1000.0));
    }

    #[test]
    fn test_gross_is_net_times_wastage() {
        let mut row = ConcreteRow::new("Base", ElementType::Foundation).with_dimensions(10.0, 0.6, 0.3);
        row.foundation_walling = Some(FoundationWalling {
            height: 0.6,
            ..FoundationWalling::default()
        });
        let result = calculate(&row, &QsSettings::default());
        for l in &result.lines {
            assert!(approx(l.gross, l.net * (1.0 + l.wastage_fraction)));
        }
    }
}
