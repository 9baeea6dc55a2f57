//! Masonry units: concrete blocks and clay bricks.

use serde::{Deserialize, Serialize};

/// Block or brick type used for walling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// 400 × 200 × 200 mm block
    #[default]
    Standard,
    /// 400 × 200 × 100 mm partition block
    Half,
    /// 225 × 75 × 112.5 mm brick
    Brick,
    /// Dimensions entered on the row
    Custom,
}

impl BlockType {
    pub const ALL: [BlockType; 4] = [
        BlockType::Standard,
        BlockType::Half,
        BlockType::Brick,
        BlockType::Custom,
    ];

    /// Nominal dimensions, `None` for custom units.
    pub fn dimensions(&self) -> Option<BlockDimensions> {
        match self {
            BlockType::Standard => Some(BlockDimensions::new(0.4, 0.2, 0.2)),
            BlockType::Half => Some(BlockDimensions::new(0.4, 0.2, 0.1)),
            BlockType::Brick => Some(BlockDimensions::new(0.225, 0.075, 0.1125)),
            BlockType::Custom => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BlockType::Standard => "Standard Block",
            BlockType::Half => "Half Block",
            BlockType::Brick => "Brick",
            BlockType::Custom => "Custom Block",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Unit dimensions in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockDimensions {
    pub length: f64,
    pub height: f64,
    pub thickness: f64,
}

impl Default for BlockDimensions {
    fn default() -> Self {
        BlockDimensions::new(0.4, 0.2, 0.2)
    }
}

impl BlockDimensions {
    pub const fn new(length: f64, height: f64, thickness: f64) -> Self {
        BlockDimensions {
            length,
            height,
            thickness,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.length, self.height, self.thickness]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }

    /// Face area including one bed and one perpend joint.
    pub fn effective_face(&self, joint: f64) -> f64 {
        (self.length + joint) * (self.height + joint)
    }

    /// Share of the effective face taken by mortar.
    pub fn mortar_fraction(&self, joint: f64) -> f64 {
        let face = self.effective_face(joint);
        if face <= 0.0 {
            return 0.0;
        }
        (1.0 - self.length * self.height / face).max(0.0)
    }
}
