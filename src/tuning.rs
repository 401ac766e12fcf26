//! Game balance parameters
//!
//! Built once at startup (defaults, or a JSON file) and only read afterwards.
//! Every component borrows the slice it needs.

use std::ops::RangeInclusive;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::MIN_SPACING;
use crate::sim::state::InfluenceVolume;

/// Environment variable naming a tuning JSON file
pub const TUNING_PATH_ENV: &str = "POLARITY_RUN_TUNING";

/// Failure to load a tuning file
#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Magnet force rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceTuning {
    /// Base force of every block
    pub strength: f32,
    /// Multiplier on `dt` when scaling the base force
    pub time_scale: f32,
    /// Player speed is divided by this before capping
    pub speed_divisor: f32,
    pub speed_factor_cap: f32,
    pub speed_factor_offset: f32,
    /// Fraction of full force left at the edge of the volume
    pub rolloff_min: f32,
    /// Sign-flipped multiplier for mismatched polarities
    pub opposite_multiplier: f32,
    /// Vertical velocity above which the player counts as rising
    pub rising_threshold: f32,
    pub falling_pull_multiplier: f32,
    pub rising_pull_multiplier: f32,
    pub forward_multiplier: f32,
    /// Extra upward kick when the player is above the block
    pub escape_multiplier: f32,
}

impl Default for ForceTuning {
    fn default() -> Self {
        Self {
            strength: 10.0,
            time_scale: 10.0,
            speed_divisor: 30.0,
            speed_factor_cap: 3.0,
            speed_factor_offset: 0.25,
            rolloff_min: 0.25,
            opposite_multiplier: 15.0,
            rising_threshold: 0.1,
            falling_pull_multiplier: 10.0,
            rising_pull_multiplier: 0.55,
            forward_multiplier: 4.0,
            escape_multiplier: 2.0,
        }
    }
}

/// Player motion, jumping and death
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTuning {
    /// Vertical acceleration (negative)
    pub gravity: f32,
    /// Lateral/longitudinal velocity decay per second
    pub drag: f32,
    pub start_speed: f32,
    /// Forward speed gained per second
    pub acceleration: f32,
    pub max_speed: f32,
    pub spawn_position: Vec3,
    pub player_radius: f32,
    pub jump_impulse: Vec3,
    /// Vertical speed beyond which the jump impulse is scaled
    pub jump_fast_threshold: f32,
    pub jump_excess_scale: f32,
    /// Seconds after landing before another jump is allowed
    pub land_cooldown: f32,
    pub death_height: f32,
    pub death_fall_threshold: f32,
    /// Seconds between starting to die and requesting a restart
    pub death_delay: f32,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            gravity: -20.0,
            drag: 2.0,
            start_speed: 10.0,
            acceleration: 0.2,
            max_speed: 90.0,
            spawn_position: Vec3::new(0.0, 1.0, 0.0),
            player_radius: 0.5,
            jump_impulse: Vec3::new(0.0, 6.5, 0.75),
            jump_fast_threshold: 8.0,
            jump_excess_scale: 1.25,
            land_cooldown: 0.15,
            death_height: -10.0,
            death_fall_threshold: -10.0,
            death_delay: 1.5,
        }
    }
}

/// Lane layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneTuning {
    pub lane_width: f32,
    pub lane_count: u32,
}

impl Default for LaneTuning {
    fn default() -> Self {
        Self {
            lane_width: 3.0,
            lane_count: 3,
        }
    }
}

/// World streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingTuning {
    pub block_ahead_threshold: f32,
    pub wall_ahead_threshold: f32,
    pub cull_distance: f32,
    /// Also cull blocks behind the player (walls are always culled)
    pub cull_blocks: bool,

    // === Block rows ===
    pub first_row_z: f32,
    pub seed_rows: u32,
    pub seed_row_spacing: f32,
    /// Seconds of travel between rows at the current speed
    pub row_interval: f32,
    pub min_row_spacing: f32,
    /// Chance a lane slot in a row holds a block
    pub block_chance: f64,
    /// Chance a spawned block is red
    pub red_chance: f64,
    pub bottom_y: f32,
    pub top_y: f32,
    /// Distance outside the rest height a block spawns at
    pub spawn_offset: f32,
    pub block_settle_rate: f32,
    pub min_block_length: f32,
    pub max_block_length: f32,
    pub influence: InfluenceVolume,
    pub solid_half_extents: Vec3,
    pub gradual_rolloff: bool,

    // === Walls ===
    pub first_wall_z: f32,
    pub seed_wall_batches: u32,
    pub segments_per_batch: u32,
    pub wall_segment_length: f32,
    pub wall_x: f32,
    pub wall_layers: u32,
    pub wall_base_y: f32,
    pub wall_vertical_spacing: f32,
    pub wall_slide_distance: f32,
    pub wall_settle_rate: f32,
}

impl Default for StreamingTuning {
    fn default() -> Self {
        Self {
            block_ahead_threshold: 75.0,
            wall_ahead_threshold: 100.0,
            cull_distance: 50.0,
            cull_blocks: true,

            first_row_z: 20.75,
            seed_rows: 5,
            seed_row_spacing: 10.0,
            row_interval: 1.0,
            min_row_spacing: 4.0,
            block_chance: 0.5,
            red_chance: 0.5,
            bottom_y: 0.0,
            top_y: 18.0,
            spawn_offset: 12.0,
            block_settle_rate: 3.5,
            min_block_length: 4.0,
            max_block_length: 8.0,
            influence: InfluenceVolume::Box {
                half_extents: Vec3::new(1.5, 5.0, 3.0),
            },
            solid_half_extents: Vec3::new(1.0, 0.5, 2.0),
            gradual_rolloff: true,

            first_wall_z: -20.0,
            seed_wall_batches: 10,
            segments_per_batch: 2,
            wall_segment_length: 5.0,
            wall_x: 35.0,
            wall_layers: 2,
            wall_base_y: -6.0,
            wall_vertical_spacing: 12.0,
            wall_slide_distance: 15.0,
            wall_settle_rate: 1.5,
        }
    }
}

impl StreamingTuning {
    /// `furthest_block_z` right after the world is (re)seeded
    pub fn initial_block_z(&self) -> f32 {
        self.first_row_z + (self.seed_rows as f32 - 1.0) * self.seed_row_step()
    }

    /// `furthest_wall_z` right after the world is (re)seeded
    pub fn initial_wall_z(&self) -> f32 {
        let steps = self.seed_wall_batches * self.segments_per_batch;
        self.first_wall_z + (steps as f32 - 1.0) * self.wall_step()
    }

    /// Distance between consecutive rows for a player moving at `speed`
    pub fn row_spacing(&self, speed: f32) -> f32 {
        let floor = at_least(self.min_row_spacing, MIN_SPACING);
        let spacing = speed * self.row_interval;
        if spacing.is_finite() { spacing.max(floor) } else { floor }
    }

    pub fn seed_row_step(&self) -> f32 {
        at_least(self.seed_row_spacing, MIN_SPACING)
    }

    pub fn wall_step(&self) -> f32 {
        at_least(self.wall_segment_length, MIN_SPACING)
    }

    /// Ordered, finite range to draw block lengths from
    pub fn block_length_range(&self) -> RangeInclusive<f32> {
        let a = at_least(self.min_block_length, MIN_SPACING);
        let b = at_least(self.max_block_length, MIN_SPACING);
        if a <= b { a..=b } else { b..=a }
    }

    pub fn block_probability(&self) -> f64 {
        probability(self.block_chance)
    }

    pub fn red_probability(&self) -> f64 {
        probability(self.red_chance)
    }

    /// Cull distance behind the player, never ahead of it
    pub fn cull_behind(&self) -> f32 {
        self.cull_distance.max(0.0)
    }
}

/// Complete tuning set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub force: ForceTuning,
    pub motion: MotionTuning,
    pub lanes: LaneTuning,
    pub streaming: StreamingTuning,
}

impl Tuning {
    /// Parse tuning from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        Ok(tuning.sanitized())
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load from `POLARITY_RUN_TUNING` if set, otherwise defaults
    pub fn load_or_default() -> Self {
        match std::env::var(TUNING_PATH_ENV) {
            Ok(path) => match Self::load(&path) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path);
                    tuning
                }
                Err(e) => {
                    log::warn!("{} ({}), using default tuning", e, path);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Clamp values that would stall or break the simulation
    pub fn sanitized(mut self) -> Self {
        let s = &mut self.streaming;
        clamp_min(&mut s.min_row_spacing, MIN_SPACING, "min_row_spacing");
        clamp_min(&mut s.seed_row_spacing, MIN_SPACING, "seed_row_spacing");
        clamp_min(&mut s.wall_segment_length, MIN_SPACING, "wall_segment_length");
        if s.segments_per_batch == 0 {
            log::warn!("segments_per_batch is 0, using 1");
            s.segments_per_batch = 1;
        }
        clamp_min(&mut s.min_block_length, MIN_SPACING, "min_block_length");
        clamp_min(&mut s.max_block_length, MIN_SPACING, "max_block_length");
        if s.max_block_length < s.min_block_length {
            std::mem::swap(&mut s.min_block_length, &mut s.max_block_length);
        }
        s.block_chance = probability(s.block_chance);
        s.red_chance = probability(s.red_chance);
        clamp_min(&mut s.cull_distance, 0.0, "cull_distance");

        if self.lanes.lane_count == 0 {
            log::warn!("lane_count is 0, using 1");
            self.lanes.lane_count = 1;
        }
        clamp_min(&mut self.lanes.lane_width, MIN_SPACING, "lane_width");
        clamp_min(&mut self.motion.drag, 0.0, "drag");
        clamp_max(&mut self.motion.gravity, 0.0, "gravity");
        if self.motion.max_speed < self.motion.start_speed {
            self.motion.max_speed = self.motion.start_speed;
        }
        self
    }
}

/// Raise `value` to `min` when it is below it (or NaN)
fn clamp_min(value: &mut f32, min: f32, name: &str) {
    if value.is_nan() || *value < min {
        log::warn!("{} {} too small, clamping to {}", name, value, min);
        *value = min;
    }
}

/// Lower `value` to `max` when it is above it (or NaN)
fn clamp_max(value: &mut f32, max: f32, name: &str) {
    if value.is_nan() || *value > max {
        log::warn!("{} {} too large, clamping to {}", name, value, max);
        *value = max;
    }
}

/// `value` if finite and at least `min`, else `min`
fn at_least(value: f32, min: f32) -> f32 {
    if value.is_finite() && value >= min { value } else { min }
}

/// Chance clamped to [0, 1]; NaN means even odds
fn probability(chance: f64) -> f64 {
    if chance.is_nan() { 0.5 } else { chance.clamp(0.0, 1.0) }
}
