//! Game state and core simulation types
//!
//! Everything one run needs lives in [`GameState`]; the motion controller
//! (physics collaborator) is passed alongside it to [`super::tick`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::polarity::Polarity;
use super::streaming::StreamingGenerator;
use crate::tuning::{MotionTuning, StreamingTuning, Tuning};

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Player alive and advancing
    Running,
    /// Death countdown in progress
    Dying,
    /// Countdown expired, waiting for the host to call `restart`
    AwaitingRestart,
}

/// Stable handle of a spawned block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// Stable handle of a spawned wall segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WallId(pub u32);

/// Shape of a block's influence (trigger) volume, centred on the block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InfluenceVolume {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

impl InfluenceVolume {
    /// Half-height of a box, radius of a sphere
    pub fn extent(&self) -> f32 {
        match *self {
            InfluenceVolume::Box { half_extents } => half_extents.y,
            InfluenceVolume::Sphere { radius } => radius,
        }
    }

    /// Whether `point` lies inside (or on) the volume placed at `center`
    pub fn contains(&self, center: Vec3, point: Vec3) -> bool {
        self.touches_sphere(center, point, 0.0)
    }

    /// Whether a sphere at `point` with `radius` reaches into the volume placed at `center`
    pub fn touches_sphere(&self, center: Vec3, point: Vec3, radius: f32) -> bool {
        let radius = radius.max(0.0);
        let d = point - center;
        match *self {
            InfluenceVolume::Box { half_extents } => {
                let outside = (d.abs() - half_extents).max(Vec3::ZERO);
                outside.length_squared() <= radius * radius
            }
            InfluenceVolume::Sphere { radius: r } => d.length_squared() <= (r + radius) * (r + radius),
        }
    }

    /// Box volumes reach at least over the whole block length
    pub fn stretched_to(self, length: f32) -> Self {
        match self {
            InfluenceVolume::Box { half_extents } => InfluenceVolume::Box {
                half_extents: Vec3::new(
                    half_extents.x,
                    half_extents.y,
                    half_extents.z.max(length * 0.5),
                ),
            },
            sphere => sphere,
        }
    }
}

/// A magnet block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub position: Vec3,
    pub length: f32,
    pub polarity: Polarity,
    pub volume: InfluenceVolume,
    pub gradual_rolloff: bool,
    /// Half extents of the solid body the player can stand on
    pub solid_half_extents: Vec3,
    /// Height the block animates to after spawning
    pub rest_y: f32,
    /// Hangs from a chain (top row)
    pub chained: bool,
}

impl Block {
    pub fn new(
        id: BlockId,
        position: Vec3,
        rest_y: f32,
        length: f32,
        polarity: Polarity,
        tuning: &StreamingTuning,
    ) -> Self {
        let solid = tuning.solid_half_extents;
        Self {
            id,
            position,
            length,
            polarity,
            volume: tuning.influence.stretched_to(length),
            gradual_rolloff: tuning.gradual_rolloff,
            solid_half_extents: Vec3::new(solid.x, solid.y, length * 0.5),
            rest_y,
            chained: rest_y > 0.0,
        }
    }

    pub fn trigger_extent(&self) -> f32 {
        self.volume.extent()
    }

    /// Whether a body of `radius` centred at `point` overlaps the influence volume
    pub fn influences(&self, point: Vec3, radius: f32) -> bool {
        self.volume.touches_sphere(self.position, point, radius)
    }

    /// Ease toward the rest height
    pub fn settle(&mut self, dt: f32, rate: f32) {
        if self.position.y != self.rest_y {
            self.position.y = crate::lerp(self.position.y, self.rest_y, dt * rate);
        }
    }
}

/// Which side of the corridor a wall segment lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallSide {
    Left,
    Right,
}

/// Decorative corridor wall piece
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallSegment {
    pub id: WallId,
    pub position: Vec3,
    pub side: WallSide,
    /// Lateral slot the segment slides into
    pub rest_x: f32,
}

impl WallSegment {
    /// Slide toward the lateral slot
    pub fn settle(&mut self, dt: f32, rate: f32) {
        if self.position.x != self.rest_x {
            self.position.x = crate::lerp(self.position.x, self.rest_x, dt * rate);
        }
    }
}

/// Jump availability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JumpCooldown {
    Ready,
    /// Seconds left before the next jump
    Cooling(f32),
    /// Jump used; only landing re-arms it
    Spent,
}

impl JumpCooldown {
    pub fn is_ready(self) -> bool {
        self == JumpCooldown::Ready
    }

    pub fn tick(&mut self, dt: f32) {
        if let JumpCooldown::Cooling(left) = *self {
            let left = left - dt;
            *self = if left <= 0.0 { JumpCooldown::Ready } else { JumpCooldown::Cooling(left) };
        }
    }

    /// Landing turns a spent jump into a short cooldown
    pub fn land(&mut self, cooldown: f32) {
        if *self == JumpCooldown::Spent {
            *self = if cooldown > 0.0 { JumpCooldown::Cooling(cooldown) } else { JumpCooldown::Ready };
        }
    }
}

/// The runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Mirror of the motion controller's position
    pub position: Vec3,
    /// Force-accumulated velocity, persists across ticks
    pub force_velocity: Vec3,
    /// Forward speed
    pub speed: f32,
    pub polarity: Polarity,
    pub is_grounded: bool,
    /// In solid contact with a block of the other polarity
    pub attached_to_opposing_block: bool,
    /// Furthest z reached while alive
    pub distance_travelled: f32,
    pub jump_cooldown: JumpCooldown,
    /// Seconds left before a restart is requested
    pub death_timer: Option<f32>,
    /// Blocks whose influence volume held the player last tick
    pub overlapping: Vec<BlockId>,
    /// Blocks in solid contact with the player this tick
    pub touching: Vec<BlockId>,
}

impl Player {
    pub fn new(tuning: &MotionTuning) -> Self {
        Self {
            position: tuning.spawn_position,
            force_velocity: Vec3::ZERO,
            speed: tuning.start_speed,
            polarity: Polarity::default(),
            is_grounded: false,
            attached_to_opposing_block: false,
            distance_travelled: tuning.spawn_position.z,
            jump_cooldown: JumpCooldown::Ready,
            death_timer: None,
            overlapping: Vec::new(),
            touching: Vec::new(),
        }
    }

    /// Back to the spawn state (after death)
    pub fn reset(&mut self, tuning: &MotionTuning) {
        *self = Self::new(tuning);
    }

    pub fn is_touching(&self, id: BlockId) -> bool {
        self.touching.contains(&id)
    }

    pub fn is_dying(&self) -> bool {
        self.death_timer.is_some()
    }
}

/// Who changed polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolarityTarget {
    Player,
    Block(BlockId),
}

/// Notifications for the lifecycle and presentation collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    BlockSpawned {
        id: BlockId,
        position: Vec3,
        length: f32,
        polarity: Polarity,
        chained: bool,
    },
    BlockDespawned { id: BlockId },
    WallSpawned { id: WallId, position: Vec3, side: WallSide },
    WallDespawned { id: WallId },
    PolarityChanged { target: PolarityTarget, polarity: Polarity },
    /// Player entered a block's influence volume (tether on, attract cue)
    VolumeEntered { id: BlockId },
    /// Player left a block's influence volume (tether off, repel cue)
    VolumeExited { id: BlockId },
    LaneChanged { lane: u32 },
    /// `boosted` marks the fast-fall recovery jump
    Jumped { impulse: Vec3, boosted: bool },
    /// Whole metres travelled changed (distance counter)
    DistanceChanged { metres: u32 },
    DeathStarted,
    RestartRequested,
    WorldReset,
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub tuning: Tuning,
    pub phase: GamePhase,
    pub player: Player,
    /// Streamed blocks and walls
    pub world: StreamingGenerator,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Events raised during the last tick (or since construction/restart)
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Create a new run; the seed content is spawned immediately
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        let tuning = tuning.sanitized();
        let mut events = Vec::new();
        let world = StreamingGenerator::new(seed, &tuning, &mut events);
        Self {
            seed,
            player: Player::new(&tuning.motion),
            tuning,
            phase: GamePhase::Running,
            world,
            time_ticks: 0,
            events,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.world.state.blocks
    }

    pub fn walls(&self) -> &[WallSegment] {
        &self.world.state.walls
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.world.state.blocks.iter().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_contains_boundary() {
        let volume = InfluenceVolume::Box {
            half_extents: Vec3::new(1.5, 5.0, 3.0),
        };
        assert!(volume.contains(Vec3::ZERO, Vec3::new(0.0, 5.0, 0.0)));
        assert!(volume.contains(Vec3::ZERO, Vec3::new(-1.5, -5.0, 3.0)));
        assert!(!volume.contains(Vec3::ZERO, Vec3::new(0.0, 5.01, 0.0)));
        assert_eq!(volume.extent(), 5.0);
    }

    #[test]
    fn test_box_touches_sphere_beyond_its_faces() {
        let volume = InfluenceVolume::Box {
            half_extents: Vec3::new(1.5, 5.0, 3.0),
        };
        assert!(!volume.contains(Vec3::ZERO, Vec3::new(0.0, 5.3, 0.0)));
        assert!(volume.touches_sphere(Vec3::ZERO, Vec3::new(0.0, 5.3, 0.0), 0.5));
        assert!(!volume.touches_sphere(Vec3::ZERO, Vec3::new(0.0, 5.6, 0.0), 0.5));
        // Corner: the sphere misses although its bounding box overlaps
        assert!(!volume.touches_sphere(Vec3::ZERO, Vec3::new(1.9, 5.4, 0.0), 0.5));
    }

    #[test]
    fn test_sphere_contains() {
        let volume = InfluenceVolume::Sphere { radius: 2.0 };
        let center = Vec3::new(3.0, 0.0, 10.0);
        assert!(volume.contains(center, Vec3::new(3.0, 2.0, 10.0)));
        assert!(!volume.contains(center, Vec3::new(4.5, 1.5, 10.0)));
        assert_eq!(volume.stretched_to(50.0), volume);
    }

    #[test]
    fn test_block_box_stretches_with_length() {
        let tuning = StreamingTuning::default();
        let block = Block::new(BlockId(1), Vec3::ZERO, 0.0, 10.0, Polarity::Red, &tuning);
        match block.volume {
            InfluenceVolume::Box { half_extents } => assert_eq!(half_extents.z, 5.0),
            _ => panic!("expected box volume"),
        }
        assert_eq!(block.solid_half_extents.z, 5.0);
        assert!(!block.chained);
    }

    #[test]
    fn test_block_settles_toward_rest() {
        let tuning = StreamingTuning::default();
        let mut block = Block::new(BlockId(1), Vec3::new(0.0, -12.0, 0.0), 0.0, 4.0, Polarity::Red, &tuning);
        let mut last = block.position.y;
        for _ in 0..120 {
            block.settle(1.0 / 60.0, 3.5);
            assert!(block.position.y >= last);
            assert!(block.position.y <= 0.0);
            last = block.position.y;
        }
        assert!(block.position.y > -0.1);
    }

    #[test]
    fn test_jump_cooldown_cycle() {
        let mut cooldown = JumpCooldown::Spent;
        cooldown.tick(1.0);
        assert_eq!(cooldown, JumpCooldown::Spent, "spent never counts down by itself");
        cooldown.land(0.1);
        assert_eq!(cooldown, JumpCooldown::Cooling(0.1));
        cooldown.tick(0.05);
        assert!(!cooldown.is_ready());
        cooldown.tick(0.06);
        assert!(cooldown.is_ready());
    }

    #[test]
    fn test_player_reset() {
        let tuning = MotionTuning::default();
        let mut player = Player::new(&tuning);
        player.force_velocity = Vec3::new(1.0, -4.0, 2.0);
        player.speed = 42.0;
        player.death_timer = Some(0.5);
        player.jump_cooldown = JumpCooldown::Spent;
        player.reset(&tuning);
        assert_eq!(player.force_velocity, Vec3::ZERO);
        assert_eq!(player.speed, tuning.start_speed);
        assert_eq!(player.position, tuning.spawn_position);
        assert!(player.death_timer.is_none());
        assert!(player.jump_cooldown.is_ready());
    }
}
