//! Motion controller seam
//!
//! The simulation never resolves collisions itself. It moves the player
//! through a [`MotionController`] and only consumes its boolean/handle
//! answers. [`KinematicBody`] is a small reference controller used by the
//! headless runner and the tests.

use glam::Vec3;

use super::state::{Block, BlockId};

/// Physics collaborator owning the player's world position
pub trait MotionController {
    fn position(&self) -> Vec3;

    /// Place the body without collision (spawn, restart)
    fn teleport(&mut self, position: Vec3);

    /// Move by `delta`, resolving against the solid blocks
    fn move_by(&mut self, delta: Vec3, blocks: &[Block]);

    fn is_grounded(&self, blocks: &[Block]) -> bool;

    /// Blocks in solid contact with the body
    fn contacts(&self, blocks: &[Block]) -> Vec<BlockId>;

    /// Blocks whose influence volume the body reaches into
    fn overlap_query(&self, blocks: &[Block]) -> Vec<BlockId>;
}

/// Contact tolerance
const SKIN: f32 = 0.05;

/// Axis-aligned box body that can stand on block tops and an optional floor
#[derive(Debug, Clone)]
pub struct KinematicBody {
    pub position: Vec3,
    pub radius: f32,
    /// Flat ground height, `None` for a bottomless corridor
    pub floor: Option<f32>,
}

impl KinematicBody {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            position,
            radius,
            floor: None,
        }
    }

    pub fn with_floor(mut self, height: f32) -> Self {
        self.floor = Some(height);
        self
    }

    fn over_footprint(&self, at: Vec3, block: &Block) -> bool {
        let h = block.solid_half_extents;
        (at.x - block.position.x).abs() < h.x + self.radius
            && (at.z - block.position.z).abs() < h.z + self.radius
    }
}

impl MotionController for KinematicBody {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn teleport(&mut self, position: Vec3) {
        self.position = position;
    }

    fn move_by(&mut self, delta: Vec3, blocks: &[Block]) {
        if !delta.is_finite() {
            return;
        }
        let r = self.radius;
        let prev = self.position;
        let mut next = prev + delta;

        for block in blocks {
            if !self.over_footprint(next, block) {
                continue;
            }
            let top = block.position.y + block.solid_half_extents.y;
            let bottom = block.position.y - block.solid_half_extents.y;
            if prev.y - r >= top - SKIN && next.y - r < top {
                next.y = top + r;
            } else if prev.y + r <= bottom + SKIN && next.y + r > bottom {
                next.y = bottom - r;
            }
        }
        if let Some(floor) = self.floor {
            if next.y - r < floor {
                next.y = floor + r;
            }
        }

        self.position = next;
    }

    fn is_grounded(&self, blocks: &[Block]) -> bool {
        let feet = self.position.y - self.radius;
        if let Some(floor) = self.floor {
            if feet <= floor + SKIN {
                return true;
            }
        }
        blocks.iter().any(|block| {
            let top = block.position.y + block.solid_half_extents.y;
            self.over_footprint(self.position, block) && (feet - top).abs() <= SKIN
        })
    }

    fn contacts(&self, blocks: &[Block]) -> Vec<BlockId> {
        let reach = self.radius + SKIN;
        blocks
            .iter()
            .filter(|block| {
                let d = (self.position - block.position).abs();
                let h = block.solid_half_extents;
                d.x <= h.x + reach && d.y <= h.y + reach && d.z <= h.z + reach
            })
            .map(|block| block.id)
            .collect()
    }

    fn overlap_query(&self, blocks: &[Block]) -> Vec<BlockId> {
        blocks
            .iter()
            .filter(|block| block.influences(self.position, self.radius))
            .map(|block| block.id)
            .collect()
    }
}
