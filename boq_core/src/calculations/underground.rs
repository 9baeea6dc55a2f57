//! # Underground and Water-Retaining Elements
//!
//! Septic tanks, underground and water tanks, soak pits and soakaways. When
//! the row carries its detail the shell is sized from that detail (capacity,
//! diameter, thicknesses); without it the row's own length, width and height
//! describe a plain box or cylinder.
//!
//! ## Shell Geometry
//!
//! | Element | Walls | Base | Cover |
//! |---------|-------|------|-------|
//! | Septic tank | 2(l + w)·d·t, w = ∛(C / 2d), l = 2w | l·w·bt | l·w·0.15 (slab) |
//! | Underground tank | 4·s²·t, s = ∛C | s²·bt | s²·0.15 (slab) |
//! | Soak pit | π(r² − rᵢ²)·d | πr²·bt | πr²·0.15 unless precast |
//! | Soakaway | 2·L·d·t + 2(W − 2t)·d·t | L·W·bt | - |
//!
//! Add-ons (gravel, geotextile, baffles, manhole covers, perforated pipes)
//! are independent lines, each switched on by its own flag.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{Component, MaterialLine};
use crate::elements::{
    ConcreteRow, CoverType, ElementDetail, ElementType, LiningType, SepticTankDetail,
    SoakPitDetail, SoakawayDetail, UndergroundTankDetail,
};
use crate::materials::{MaterialKind, MaterialRef};
use crate::units::{finite_non_negative, positive_opt_or, Unit};

/// Slab cover thickness over tanks and pits (m)
pub const COVER_SLAB_THICKNESS: f64 = 0.15;
/// Manhole cover size used when the detail names none
pub const DEFAULT_MANHOLE_SIZE: &str = "600x600";

/// Concrete shell and add-ons of one underground row (all × count).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UndergroundTakeoff {
    pub wall_m3: f64,
    pub base_m3: f64,
    pub cover_m3: f64,
    pub surface_area_m2: f64,
    pub formwork_m2: f64,
    /// Gravel, geotextile, baffles, covers and pipes
    pub add_ons: Vec<MaterialLine>,
}

impl UndergroundTakeoff {
    pub fn volume_m3(&self) -> f64 {
        self.wall_m3 + self.base_m3 + self.cover_m3
    }

    fn scaled(mut self, count: f64) -> Self {
        self.wall_m3 *= count;
        self.base_m3 *= count;
        self.cover_m3 *= count;
        self.surface_area_m2 *= count;
        self.formwork_m2 *= count;
        self
    }
}

/// Shell take-off for underground elements, `None` for every other element.
///
/// `length`, `width` and `height` are the row's sanitized dimensions, used
/// only when the row has no detail.
pub fn takeoff(
    row: &ConcreteRow,
    length: f64,
    width: f64,
    height: f64,
    count: f64,
) -> Option<UndergroundTakeoff> {
    if !row.element.is_underground() {
        return None;
    }
    let stale = ElementDetail::None;
    let detail = if row.detail.applies_to(row.element) {
        &row.detail
    } else {
        &stale
    };
    let takeoff = match (detail, row.element) {
        (ElementDetail::SepticTank(detail), _) => septic_tank(detail, count),
        (ElementDetail::UndergroundTank(detail), _) => underground_tank(detail, count),
        (ElementDetail::SoakPit(detail), _) => soak_pit(detail, count),
        (ElementDetail::Soakaway(detail), _) => soakaway(detail, count),
        (_, ElementType::SoakPit) => plain_pit(length, height).scaled(count),
        (_, element) => plain_tank(element, length, width, height).scaled(count),
    };
    Some(takeoff)
}

fn septic_tank(detail: &SepticTankDetail, count: f64) -> UndergroundTakeoff {
    let capacity = finite_non_negative(detail.capacity);
    if capacity <= 0.0 {
        return UndergroundTakeoff::default();
    }
    let wall = positive_opt_or(detail.wall_thickness, 0.2);
    let base = positive_opt_or(detail.base_thickness, 0.25);
    let depth = positive_opt_or(detail.depth, 1.5);

    let width = (capacity / (2.0 * depth)).cbrt();
    let length = 2.0 * width;
    let surface = 2.0 * (length + width) * depth + length * width;

    let mut takeoff = UndergroundTakeoff {
        wall_m3: 2.0 * (length + width) * depth * wall,
        base_m3: length * width * base,
        cover_m3: cover_volume(detail.cover, length * width),
        surface_area_m2: surface,
        formwork_m2: 2.0 * (surface / 3.0),
        add_ons: Vec::new(),
    }
    .scaled(count);

    if detail.baffles {
        // one baffle between each pair of chambers
        let baffles = (detail.chambers - 1.0).max(1.0) * count;
        takeoff.add_ons.push(MaterialLine::exact(
            MaterialRef::new(MaterialKind::Baffle),
            Unit::Piece,
            Component::AddOn,
            baffles,
        ));
    }
    if detail.manhole {
        takeoff
            .add_ons
            .push(manhole_cover(detail.manhole_size.as_deref(), count));
    }
    takeoff
}

fn underground_tank(detail: &UndergroundTankDetail, count: f64) -> UndergroundTakeoff {
    let capacity = finite_non_negative(detail.capacity);
    if capacity <= 0.0 {
        return UndergroundTakeoff::default();
    }
    let wall = positive_opt_or(detail.wall_thickness, 0.2);
    let base = positive_opt_or(detail.base_thickness, 0.25);

    let side = capacity.cbrt();
    let face = side * side;
    let surface = 5.0 * face;

    let mut takeoff = UndergroundTakeoff {
        wall_m3: 4.0 * face * wall,
        base_m3: face * base,
        cover_m3: cover_volume(detail.cover, face),
        surface_area_m2: surface,
        formwork_m2: 2.0 * (surface / 3.0),
        add_ons: Vec::new(),
    }
    .scaled(count);

    if detail.manhole {
        takeoff
            .add_ons
            .push(manhole_cover(detail.manhole_size.as_deref(), count));
    }
    takeoff
}

fn soak_pit(detail: &SoakPitDetail, count: f64) -> UndergroundTakeoff {
    let diameter = finite_non_negative(detail.diameter);
    let depth = finite_non_negative(detail.depth);
    if diameter <= 0.0 || depth <= 0.0 {
        return UndergroundTakeoff::default();
    }
    let wall = positive_opt_or(detail.wall_thickness, 0.15);
    let base = positive_opt_or(detail.base_thickness, 0.2);
    let gravel_depth = positive_opt_or(detail.gravel_depth, 0.3);

    let radius = diameter / 2.0;
    let inner = (radius - wall).max(0.0);
    let plan = PI * radius * radius;
    let surface = 2.0 * PI * radius * depth + plan;

    let mut takeoff = UndergroundTakeoff {
        wall_m3: PI * (radius * radius - inner * inner) * depth,
        base_m3: plan * base,
        cover_m3: match detail.lining {
            LiningType::Precast => 0.0,
            LiningType::Brick | LiningType::Concrete => plan * COVER_SLAB_THICKNESS,
        },
        surface_area_m2: surface,
        formwork_m2: PI * diameter * depth,
        add_ons: Vec::new(),
    }
    .scaled(count);

    if detail.gravel {
        takeoff.add_ons.push(gravel(PI * inner * inner * gravel_depth * count));
    }
    if detail.geotextile {
        takeoff.add_ons.push(MaterialLine::exact(
            MaterialRef::new(MaterialKind::Geotextile),
            Unit::SquareMeter,
            Component::AddOn,
            surface * count,
        ));
    }
    takeoff
}

fn soakaway(detail: &SoakawayDetail, count: f64) -> UndergroundTakeoff {
    let length = finite_non_negative(detail.length);
    let width = finite_non_negative(detail.width);
    let depth = finite_non_negative(detail.depth);
    if length <= 0.0 || width <= 0.0 || depth <= 0.0 {
        return UndergroundTakeoff::default();
    }
    let wall = positive_opt_or(detail.wall_thickness, 0.15);
    let base = positive_opt_or(detail.base_thickness, 0.2);
    let gravel_depth = positive_opt_or(detail.gravel_depth, 0.3);

    let inner_length = (length - 2.0 * wall).max(0.0);
    let inner_width = (width - 2.0 * wall).max(0.0);
    let long_walls = 2.0 * length * depth * wall;
    let short_walls = 2.0 * inner_width * depth * wall;

    let mut takeoff = UndergroundTakeoff {
        wall_m3: long_walls + short_walls,
        base_m3: length * width * base,
        cover_m3: 0.0,
        surface_area_m2: 2.0 * (length + width) * depth + length * width,
        formwork_m2: 2.0 * (length + width) * depth,
        add_ons: Vec::new(),
    }
    .scaled(count);

    if detail.gravel {
        takeoff
            .add_ons
            .push(gravel(inner_length * inner_width * gravel_depth * count));
    }
    if detail.perforated_pipes {
        takeoff.add_ons.push(MaterialLine::exact(
            MaterialRef::new(MaterialKind::PerforatedPipe),
            Unit::Meter,
            Component::AddOn,
            length * count,
        ));
    }
    takeoff
}

/// Tank described only by the row's box dimensions.
fn plain_tank(element: ElementType, length: f64, width: f64, height: f64) -> UndergroundTakeoff {
    if length <= 0.0 || width <= 0.0 {
        return UndergroundTakeoff::default();
    }
    let walls = 2.0 * (length + width) * height;
    let plan = length * width;
    match element {
        ElementType::Soakaway => UndergroundTakeoff {
            wall_m3: plan * height,
            surface_area_m2: walls + plan,
            formwork_m2: walls,
            ..UndergroundTakeoff::default()
        },
        _ => UndergroundTakeoff {
            wall_m3: walls * 0.2,
            base_m3: plan * if element == ElementType::SepticTank { 0.25 } else { 0.15 },
            surface_area_m2: walls + plan,
            formwork_m2: walls,
            ..UndergroundTakeoff::default()
        },
    }
}

/// Soak pit described by the row: length is the diameter, height the depth.
fn plain_pit(diameter: f64, depth: f64) -> UndergroundTakeoff {
    if diameter <= 0.0 {
        return UndergroundTakeoff::default();
    }
    let radius = diameter / 2.0;
    UndergroundTakeoff {
        wall_m3: PI * radius * radius * depth,
        surface_area_m2: 2.0 * PI * radius * depth + PI * radius * radius,
        formwork_m2: PI * diameter * depth,
        ..UndergroundTakeoff::default()
    }
}

fn cover_volume(cover: CoverType, plan_area: f64) -> f64 {
    match cover {
        CoverType::Slab => plan_area * COVER_SLAB_THICKNESS,
        CoverType::Precast | CoverType::None => 0.0,
    }
}

fn gravel(volume: f64) -> MaterialLine {
    MaterialLine::exact(
        MaterialRef::new(MaterialKind::Gravel),
        Unit::CubicMeter,
        Component::AddOn,
        volume,
    )
}

fn manhole_cover(size: Option<&str>, count: f64) -> MaterialLine {
    let size = size
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_MANHOLE_SIZE);
    MaterialLine::exact(
        MaterialRef::new(MaterialKind::ManholeCover).with_grade(size),
        Unit::Piece,
        Component::AddOn,
        count,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn row_with(element: ElementType, detail: ElementDetail) -> ConcreteRow {
        let mut row = ConcreteRow::new("Tank", element);
        row.detail = detail;
        row
    }

    #[test]
    fn test_septic_tank_shell() {
        let detail = SepticTankDetail {
            capacity: 12.0,
            chambers: 2.0,
            depth: Some(1.5),
            cover: CoverType::Slab,
            baffles: true,
            manhole: true,
            ..SepticTankDetail::default()
        };
        let row = row_with(ElementType::SepticTank, ElementDetail::SepticTank(detail));
        let t = takeoff(&row, 0.0, 0.0, 0.0, 1.0).unwrap();

        // w = cbrt(12 / 3) , l = 2w
        let w = 4.0_f64.cbrt();
        let l = 2.0 * w;
        assert!(approx(t.wall_m3, 2.0 * (l + w) * 1.5 * 0.2));
        assert!(approx(t.base_m3, l * w * 0.25));
        assert!(approx(t.cover_m3, l * w * 0.15));
        assert_eq!(t.add_ons.len(), 2);
        assert_eq!(t.add_ons[0].material.kind, MaterialKind::Baffle);
        assert_eq!(t.add_ons[0].net, 1.0);
        assert_eq!(t.add_ons[1].material.grade.as_deref(), Some("600x600"));
    }

    #[test]
    fn test_underground_tank_cube() {
        let detail = UndergroundTankDetail {
            capacity: 8.0,
            cover: CoverType::None,
            ..UndergroundTankDetail::default()
        };
        let row = row_with(ElementType::WaterTank, ElementDetail::UndergroundTank(detail));
        let t = takeoff(&row, 0.0, 0.0, 0.0, 2.0).unwrap();
        // side 2 m, walls 4 * 4 * 0.2, base 4 * 0.25, twice
        assert!(approx(t.wall_m3, 6.4));
        assert!(approx(t.base_m3, 2.0));
        assert_eq!(t.cover_m3, 0.0);
        assert!(t.add_ons.is_empty());
    }

    #[test]
    fn test_soak_pit_with_add_ons() {
        let detail = SoakPitDetail {
            diameter: 2.0,
            depth: 3.0,
            lining: LiningType::Precast,
            gravel: true,
            geotextile: true,
            ..SoakPitDetail::default()
        };
        let row = row_with(ElementType::SoakPit, ElementDetail::SoakPit(detail));
        let t = takeoff(&row, 0.0, 0.0, 0.0, 1.0).unwrap();

        let inner: f64 = 1.0 - 0.15;
        assert!(approx(t.wall_m3, PI * (1.0 - inner * inner) * 3.0));
        assert_eq!(t.cover_m3, 0.0);
        assert!(approx(t.add_ons[0].net, PI * inner * inner * 0.3));
        assert_eq!(t.add_ons[1].material.kind, MaterialKind::Geotextile);
    }

    #[test]
    fn test_soakaway_walls_and_pipes() {
        let detail = SoakawayDetail {
            length: 3.0,
            width: 2.0,
            depth: 2.0,
            perforated_pipes: true,
            ..SoakawayDetail::default()
        };
        let row = row_with(ElementType::Soakaway, ElementDetail::Soakaway(detail));
        let t = takeoff(&row, 0.0, 0.0, 0.0, 1.0).unwrap();
        let expected_walls = 2.0 * 3.0 * 2.0 * 0.15 + 2.0 * 1.7 * 2.0 * 0.15;
        assert!(approx(t.wall_m3, expected_walls));
        assert!(approx(t.base_m3, 6.0 * 0.2));
        assert_eq!(t.add_ons.len(), 1);
        assert_eq!(t.add_ons[0].unit, Unit::Meter);
    }

    #[test]
    fn test_zero_capacity_is_empty() {
        let row = ConcreteRow::new("Tank", ElementType::SepticTank);
        let t = takeoff(&row, 0.0, 0.0, 0.0, 1.0).unwrap();
        assert_eq!(t.volume_m3(), 0.0);
        assert!(t.add_ons.is_empty());
    }

    #[test]
    fn test_not_underground() {
        let row = ConcreteRow::new("Slab", ElementType::Slab);
        assert!(takeoff(&row, 1.0, 1.0, 1.0, 1.0).is_none());
    }
}
