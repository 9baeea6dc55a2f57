//! # Masonry Calculation
//!
//! Walling for a rectangular room: blocks, bedding mortar, plaster, the
//! doors and windows set in the walls and the professional extras switched
//! on in the QS settings.
//!
//! ## Wall Areas
//!
//! - gross = 2(L + W) × H
//! - openings = Σ width × height × count over doors and windows
//! - net = max(0, gross − openings)
//!
//! ## Blocks and Mortar
//!
//! Each block occupies its face plus one joint in each direction, so
//! blocks = net ÷ ((bL + j)(bH + j)). The mortar is the rest of that
//! effective face times the block thickness.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::calculations::masonry::{self, MasonryRoom, Opening};
//! use boq_core::settings::QsSettings;
//!
//! let mut room = MasonryRoom::new("Bedroom", 4.0, 3.0, 3.0);
//! room.doors.push(Opening::standard("Panel", "0.9x2.1", 1.0));
//! room.windows.push(Opening::standard("Casement", "1.2 × 1.2 m", 1.0));
//!
//! let result = masonry::calculate(&room, &QsSettings::default());
//! assert!((result.net_wall_area_m2 - 38.67).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::water::{mortar_water, water_line, WaterBreakdown};
use super::{ceil_count, keep_non_empty, Component, MaterialLine};
use crate::materials::concrete_mix::MixSplit;
use crate::materials::{BlockDimensions, BlockType, MaterialKind, MaterialRef, RebarSize};
use crate::settings::{QsSettings, WastageCategory};
use crate::units::{finite_non_negative, positive_or, lenient, Unit};

/// Largest room dimension accepted (m)
pub const MAX_ROOM_DIMENSION: f64 = 100.0;
/// Lintel bearing added to each opening width (150 mm each side)
pub const LINTEL_BEARING: f64 = 0.3;
/// Bars in each lintel
pub const LINTEL_BARS: f64 = 4.0;

// ============================================================================
// Input Types
// ============================================================================

/// Plaster coverage on the room's walls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlasterOption {
    #[serde(alias = "None")]
    None,
    #[default]
    #[serde(alias = "One Side")]
    OneSide,
    #[serde(alias = "Both Sides")]
    BothSides,
}

impl PlasterOption {
    pub fn sides(&self) -> f64 {
        match self {
            PlasterOption::None => 0.0,
            PlasterOption::OneSide => 1.0,
            PlasterOption::BothSides => 2.0,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlasterOption::None => "No plaster",
            PlasterOption::OneSide => "One side",
            PlasterOption::BothSides => "Both sides",
        }
    }
}

/// Size of a door or window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "size_type", rename_all = "snake_case")]
pub enum OpeningSize {
    /// Catalogue size such as "0.9x2.1" or "0.9 × 2.1 m"
    Standard { size: String },
    Custom {
        #[serde(default, deserialize_with = "lenient::number")]
        width: f64,
        #[serde(default, deserialize_with = "lenient::number")]
        height: f64,
    },
}

impl OpeningSize {
    /// Width and height in metres, `None` when a standard size cannot be read.
    pub fn dimensions(&self) -> Option<(f64, f64)> {
        match self {
            OpeningSize::Standard { size } => parse_size(size),
            OpeningSize::Custom { width, height } => {
                Some((finite_non_negative(*width), finite_non_negative(*height)))
            }
        }
    }

    /// Grade used to price the opening
    pub fn label(&self) -> String {
        match self {
            OpeningSize::Standard { size } => size.trim().to_string(),
            OpeningSize::Custom { width, height } => format!("{}x{}", width, height),
        }
    }
}

/// Parse "0.9x2.1", "0.9 × 2.1 m" and similar into (width, height).
pub fn parse_size(text: &str) -> Option<(f64, f64)> {
    let cleaned: String = text
        .chars()
        .map(|c| if c == '×' || c == 'X' { 'x' } else { c })
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == 'x')
        .collect();
    let mut parts = cleaned.split('x').filter(|p| !p.is_empty());
    let width = parts.next()?.parse::<f64>().ok()?;
    let height = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() || !width.is_finite() || !height.is_finite() {
        return None;
    }
    Some((width, height))
}

/// A door or window in the room's walls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    /// Door or window type, e.g. "Panel", "Flush", "Casement"
    #[serde(default, rename = "type")]
    pub style: String,
    pub size: OpeningSize,
    #[serde(default = "lenient::one", deserialize_with = "lenient::count")]
    pub count: f64,
    /// Unit price entered on the row; replaces the price book
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub price: Option<f64>,
}

impl Opening {
    pub fn standard(style: impl Into<String>, size: impl Into<String>, count: f64) -> Self {
        Opening {
            style: style.into(),
            size: OpeningSize::Standard { size: size.into() },
            count,
            price: None,
        }
    }

    pub fn custom(style: impl Into<String>, width: f64, height: f64, count: f64) -> Self {
        Opening {
            style: style.into(),
            size: OpeningSize::Custom { width, height },
            count,
            price: None,
        }
    }

    fn area(&self) -> f64 {
        self.size
            .dimensions()
            .map_or(0.0, |(w, h)| w * h * finite_non_negative(self.count))
    }

    fn width(&self) -> f64 {
        self.size.dimensions().map_or(0.0, |(w, _)| w)
    }
}

/// A room whose four walls are built in blocks or bricks.
///
/// ## JSON Example
///
/// ```json
/// {
///   "name": "Bedroom 1",
///   "length": "4",
///   "width": 3,
///   "height": 3,
///   "block_type": "standard",
///   "plaster": "One Side",
///   "doors": [{ "type": "Panel", "size": { "size_type": "standard", "size": "0.9x2.1" }, "count": 1 }],
///   "windows": []
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasonryRoom {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub room_type: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub length: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub width: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub height: f64,
    #[serde(default)]
    pub block_type: BlockType,
    #[serde(default)]
    pub custom_block: Option<BlockDimensions>,
    #[serde(default)]
    pub plaster: PlasterOption,
    #[serde(default)]
    pub doors: Vec<Opening>,
    #[serde(default)]
    pub windows: Vec<Opening>,
}

impl MasonryRoom {
    pub fn new(name: impl Into<String>, length: f64, width: f64, height: f64) -> Self {
        MasonryRoom {
            id: Uuid::new_v4(),
            name: name.into(),
            room_type: String::new(),
            length,
            width,
            height,
            block_type: BlockType::default(),
            custom_block: None,
            plaster: PlasterOption::default(),
            doors: Vec::new(),
            windows: Vec::new(),
        }
    }

    fn openings(&self) -> impl Iterator<Item = (MaterialKind, &Opening)> {
        self.doors
            .iter()
            .map(|o| (MaterialKind::Doors, o))
            .chain(self.windows.iter().map(|o| (MaterialKind::Windows, o)))
    }
}

// ============================================================================
// Result
// ============================================================================

/// Result of a masonry room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasonryResult {
    pub row_id: Uuid,
    pub name: String,
    pub block_type: BlockType,
    pub plaster: PlasterOption,
    pub gross_wall_area_m2: f64,
    pub openings_area_m2: f64,
    pub net_wall_area_m2: f64,
    pub block_count: f64,
    pub mortar_m3: f64,
    pub plaster_area_m2: f64,
    pub plaster_m3: f64,
    pub lintel_length_m: f64,
    pub water: WaterBreakdown,
    pub lines: Vec<MaterialLine>,
    pub issues: Vec<String>,
}

/// Calculate one masonry room.
pub fn calculate(room: &MasonryRoom, settings: &QsSettings) -> MasonryResult {
    let mut issues = Vec::new();
    let masonry = &settings.masonry;

    let dims = [room.length, room.width, room.height];
    let valid = dims
        .iter()
        .all(|d| d.is_finite() && *d > 0.0 && *d < MAX_ROOM_DIMENSION);
    if !valid {
        issues.push(format!(
            "Room length, width and height must each be between 0 and {} m",
            MAX_ROOM_DIMENSION
        ));
    }
    let (length, width, height) = if valid {
        (room.length, room.width, room.height)
    } else {
        (0.0, 0.0, 0.0)
    };
    let perimeter = 2.0 * (length + width);
    let gross_area = perimeter * height;

    let openings_area: f64 = if valid {
        room.openings().map(|(_, o)| o.area()).sum()
    } else {
        0.0
    };
    for (kind, opening) in room.openings() {
        if opening.size.dimensions().is_none() {
            issues.push(format!(
                "{} size \"{}\" is not in the form width x height",
                kind.display_name(),
                opening.size.label()
            ));
        }
    }
    if valid && openings_area > gross_area {
        issues.push("Openings exceed the wall area".to_string());
    }
    let net_area = (gross_area - openings_area).max(0.0);

    let block = match (room.block_type, room.custom_block) {
        (BlockType::Custom, Some(custom)) if custom.is_valid() => custom,
        (BlockType::Custom, _) => {
            issues.push("Custom block dimensions must be positive".to_string());
            BlockDimensions::default()
        }
        (block_type, _) => block_type.dimensions().unwrap_or_default(),
    };
    let joint = positive_or(masonry.joint_thickness, 0.01);
    let face = block.effective_face(joint);
    let block_count = if face > 0.0 { net_area / face } else { 0.0 };
    let mortar_m3 = net_area * block.mortar_fraction(joint) * block.thickness;

    let plaster_area = net_area * room.plaster.sides();
    let plaster_m3 = plaster_area * finite_non_negative(masonry.plaster_thickness);

    let ratio = masonry.mortar();
    let mortar = ratio.split(mortar_m3);
    let plaster = ratio.split(plaster_m3);
    let water = mortar_water(&mortar, mortar_m3, &settings.water)
        + mortar_water(&plaster, plaster_m3, &settings.water);

    let wastage = settings.wastage_fraction(WastageCategory::Masonry);
    let mut lines = vec![MaterialLine::new(
        MaterialRef::new(MaterialKind::Blocks).with_variant(room.block_type.display_name()),
        Unit::Piece,
        Component::Walling,
        block_count,
        wastage,
    )];
    lines.extend(mortar_lines(&mortar, Component::Mortar, wastage));
    lines.extend(mortar_lines(&plaster, Component::Plaster, wastage));

    let mut lintel_length = 0.0;
    if valid {
        lines.extend(room.openings().map(|(kind, opening)| opening_line(kind, opening)));
        if masonry.lintels {
            lintel_length = room
                .openings()
                .map(|(_, o)| (o.width() + LINTEL_BEARING) * finite_non_negative(o.count))
                .sum();
            lines.extend(lintel_lines(lintel_length, settings));
        }
        lines.extend(extra_lines(perimeter, height, block, joint, settings));
    }

    lines.push(water_line(&water, settings));

    MasonryResult {
        row_id: room.id,
        name: room.name.clone(),
        block_type: room.block_type,
        plaster: room.plaster,
        gross_wall_area_m2: gross_area,
        openings_area_m2: openings_area,
        net_wall_area_m2: net_area,
        block_count,
        mortar_m3,
        plaster_area_m2: plaster_area,
        plaster_m3,
        lintel_length_m: lintel_length,
        water,
        lines: keep_non_empty(lines),
        issues,
    }
}

fn opening_line(kind: MaterialKind, opening: &Opening) -> MaterialLine {
    let style = match opening.style.trim() {
        "" => "Standard",
        style => style,
    };
    let line = MaterialLine::exact(
        MaterialRef::new(kind)
            .with_variant(style)
            .with_grade(opening.size.label()),
        Unit::Piece,
        Component::Opening,
        opening.count,
    );
    match opening.price {
        Some(price) if price > 0.0 => line.at_rate(price),
        _ => line,
    }
}

fn mortar_lines(split: &MixSplit, component: Component, wastage: f64) -> [MaterialLine; 2] {
    [
        MaterialLine::new(
            MaterialRef::new(MaterialKind::Cement),
            Unit::Bag,
            component,
            split.cement_bags,
            wastage,
        ),
        MaterialLine::new(
            MaterialRef::new(MaterialKind::Sand),
            Unit::CubicMeter,
            component,
            split.sand_m3,
            wastage,
        ),
    ]
}

fn bar_line(size: RebarSize, length_m: f64, component: Component, settings: &QsSettings) -> MaterialLine {
    MaterialLine::new(
        MaterialRef::new(MaterialKind::Rebar).with_variant(size.display_name()),
        Unit::Kilogram,
        component,
        length_m * size.kg_per_m(),
        settings.wastage_fraction(WastageCategory::Reinforcement),
    )
}

/// Concrete, bars and formwork for lintels of `length` metres in total.
fn lintel_lines(length: f64, settings: &QsSettings) -> Vec<MaterialLine> {
    let masonry = &settings.masonry;
    let depth = finite_non_negative(masonry.lintel_depth);
    let width = finite_non_negative(masonry.lintel_width);
    let volume = length * width * depth;
    let dry_factor = positive_or(settings.concrete.dry_volume_factor, 1.54);
    let split = settings.concrete.mix().split(volume, dry_factor);
    let wastage = settings.wastage_fraction(WastageCategory::Concrete);

    vec![
        MaterialLine::new(
            MaterialRef::new(MaterialKind::Cement),
            Unit::Bag,
            Component::Lintel,
            split.cement_bags,
            wastage,
        ),
        MaterialLine::new(
            MaterialRef::new(MaterialKind::Sand),
            Unit::CubicMeter,
            Component::Lintel,
            split.sand_m3,
            wastage,
        ),
        MaterialLine::new(
            MaterialRef::new(MaterialKind::Ballast),
            Unit::CubicMeter,
            Component::Lintel,
            split.stone_m3,
            wastage,
        ),
        bar_line(masonry.lintel_bar, LINTEL_BARS * length, Component::Lintel, settings),
        MaterialLine::exact(
            MaterialRef::new(MaterialKind::Formwork),
            Unit::SquareMeter,
            Component::Lintel,
            length * (2.0 * depth + width),
        ),
    ]
}

/// Wall reinforcement (bed-joint and vertical bars), DPC, movement joints,
/// scaffolding and waste removal, each behind its own switch.
fn extra_lines(
    perimeter: f64,
    height: f64,
    block: BlockDimensions,
    joint: f64,
    settings: &QsSettings,
) -> Vec<MaterialLine> {
    let masonry = &settings.masonry;
    let gross_area = perimeter * height;
    let mut lines = Vec::new();

    if masonry.bed_joint_reinforcement {
        let courses = ceil_count(height / (block.height + joint));
        let every = masonry.bed_joint_courses.max(1.0);
        let length = perimeter * ceil_count(courses / every);
        lines.push(bar_line(masonry.bed_joint_bar, length, Component::Reinforcement, settings));
        if masonry.vertical_bar_spacing > 0.0 {
            let bars = ceil_count(perimeter / masonry.vertical_bar_spacing);
            lines.push(bar_line(
                masonry.vertical_bar,
                bars * height,
                Component::Reinforcement,
                settings,
            ));
        }
    }
    if masonry.dpc {
        lines.push(MaterialLine::exact(
            MaterialRef::new(MaterialKind::Dpc),
            Unit::SquareMeter,
            Component::Waterproofing,
            perimeter * finite_non_negative(masonry.dpc_width),
        ));
    }
    if masonry.movement_joints && masonry.movement_joint_spacing > 0.0 {
        let joints = ceil_count(perimeter / masonry.movement_joint_spacing);
        lines.push(MaterialLine::exact(
            MaterialRef::new(MaterialKind::Sealant),
            Unit::Meter,
            Component::Sundry,
            joints * height,
        ));
    }
    if masonry.scaffolding {
        let rate = finite_non_negative(masonry.scaffolding_daily_rate)
            * finite_non_negative(masonry.scaffolding_days)
            / 100.0;
        lines.push(
            MaterialLine::exact(
                MaterialRef::new(MaterialKind::Scaffolding),
                Unit::SquareMeter,
                Component::Sundry,
                gross_area,
            )
            .at_rate(rate),
        );
    }
    if masonry.waste_removal {
        // 5 % of a 200 mm wall
        lines.push(
            MaterialLine::exact(
                MaterialRef::new(MaterialKind::WasteRemoval),
                Unit::CubicMeter,
                Component::Sundry,
                gross_area * 0.05 * 0.2,
            )
            .at_rate(masonry.waste_removal_rate),
        );
    }
    lines
}
