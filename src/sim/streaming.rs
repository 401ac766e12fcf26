//! Endless world streaming
//!
//! Two independent pipelines keyed on the player's z:
//! - block rows, spawned one per tick once the player gets within
//!   `block_ahead_threshold` of the furthest row
//! - wall batches, spawned once within `wall_ahead_threshold`
//!
//! Both sequences are kept in spawn order, which is also ascending z, so
//! culling behind the player only ever drains from the front.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::lane::LaneTracker;
use super::polarity::Polarity;
use super::state::{Block, BlockId, GameEvent, WallId, WallSegment, WallSide};
use crate::tuning::{StreamingTuning, Tuning};

/// Layout rolls before falling back to a single forced slot
const MAX_REROLLS: u32 = 64;

/// Per-pipeline streaming state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PipelineState {
    #[default]
    Empty,
    Streaming,
}

/// Live world content and high-water marks
#[derive(Debug, Clone, Default)]
pub struct StreamingState {
    pub furthest_block_z: f32,
    pub furthest_wall_z: f32,
    /// Ordered by spawn (ascending z)
    pub blocks: Vec<Block>,
    /// Ordered by spawn (ascending z)
    pub walls: Vec<WallSegment>,
    pub block_pipeline: PipelineState,
    pub wall_pipeline: PipelineState,
}

/// Lane occupancy of one block row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    /// Hanging blocks above the corridor, one flag per lane
    pub top: Vec<bool>,
    /// Blocks below the corridor, one flag per lane
    pub bottom: Vec<bool>,
}

impl RowLayout {
    /// Both sub-rows hold at least one block
    pub fn is_playable(&self) -> bool {
        self.top.iter().any(|&b| b) && self.bottom.iter().any(|&b| b)
    }
}

/// Spawns and culls blocks and walls ahead of/behind the player
#[derive(Debug, Clone)]
pub struct StreamingGenerator {
    pub state: StreamingState,
    rng: Pcg32,
    next_id: u32,
}

impl StreamingGenerator {
    /// Create a generator and seed the initial world
    pub fn new(seed: u64, tuning: &Tuning, events: &mut Vec<GameEvent>) -> Self {
        let mut generator = Self {
            state: StreamingState::default(),
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        };
        generator.reset_world(tuning, events);
        generator
    }

    fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Despawn everything and synchronously rebuild the seed content
    pub fn reset_world(&mut self, tuning: &Tuning, events: &mut Vec<GameEvent>) {
        let live_blocks = self.state.blocks.len();
        let live_walls = self.state.walls.len();
        events.extend(self.state.blocks.drain(..).map(|b| GameEvent::BlockDespawned { id: b.id }));
        events.extend(self.state.walls.drain(..).map(|w| GameEvent::WallDespawned { id: w.id }));
        self.state.block_pipeline = PipelineState::Empty;
        self.state.wall_pipeline = PipelineState::Empty;

        self.seed_blocks(tuning, events);
        self.seed_walls(tuning, events);
        events.push(GameEvent::WorldReset);

        log::info!(
            "World reset: cleared {} blocks / {} walls, seeded {} blocks / {} walls",
            live_blocks,
            live_walls,
            self.state.blocks.len(),
            self.state.walls.len()
        );
    }

    fn seed_blocks(&mut self, tuning: &Tuning, events: &mut Vec<GameEvent>) {
        let s = &tuning.streaming;
        self.state.furthest_block_z = s.first_row_z - s.seed_row_step();
        for _ in 0..s.seed_rows {
            let z = self.state.furthest_block_z + s.seed_row_step();
            let layout = self.roll_layout(LaneTracker::new(&tuning.lanes).lane_count(), s);
            self.spawn_row(z, &layout, tuning, false, events);
        }
        self.state.block_pipeline = PipelineState::Streaming;
    }

    fn seed_walls(&mut self, tuning: &Tuning, events: &mut Vec<GameEvent>) {
        let s = &tuning.streaming;
        self.state.furthest_wall_z = s.first_wall_z - s.wall_step();
        for _ in 0..s.seed_wall_batches {
            self.spawn_wall_batch(s, false, events);
        }
        self.state.wall_pipeline = PipelineState::Streaming;
    }

    /// Advance streaming for a player at `player_z` moving at `player_speed`
    pub fn tick(
        &mut self,
        player_z: f32,
        player_speed: f32,
        dt: f32,
        tuning: &Tuning,
        events: &mut Vec<GameEvent>,
    ) {
        let s = &tuning.streaming;
        if self.state.block_pipeline == PipelineState::Empty {
            self.seed_blocks(tuning, events);
        }
        if self.state.wall_pipeline == PipelineState::Empty {
            self.seed_walls(tuning, events);
        }

        if player_z >= self.state.furthest_block_z - s.block_ahead_threshold {
            let z = self.state.furthest_block_z + s.row_spacing(player_speed);
            let layout = self.roll_layout(LaneTracker::new(&tuning.lanes).lane_count(), s);
            self.spawn_row(z, &layout, tuning, true, events);
        }

        if player_z >= self.state.furthest_wall_z - s.wall_ahead_threshold {
            self.spawn_wall_batch(s, true, events);
        }

        self.cull(player_z, s, events);

        if dt.is_finite() && dt > 0.0 {
            for block in &mut self.state.blocks {
                block.settle(dt, s.block_settle_rate);
            }
            for wall in &mut self.state.walls {
                wall.settle(dt, s.wall_settle_rate);
            }
        }
    }

    /// Roll top/bottom lane masks, re-rolling each until it holds a block
    pub fn roll_layout(&mut self, lanes: u32, tuning: &StreamingTuning) -> RowLayout {
        let lanes = lanes.max(1) as usize;
        RowLayout {
            top: self.roll_mask(lanes, tuning.block_probability()),
            bottom: self.roll_mask(lanes, tuning.block_probability()),
        }
    }

    fn roll_mask(&mut self, lanes: usize, chance: f64) -> Vec<bool> {
        for _ in 0..MAX_REROLLS {
            let mask: Vec<bool> = (0..lanes).map(|_| self.rng.random_bool(chance)).collect();
            if mask.iter().any(|&b| b) {
                return mask;
            }
        }
        let mut mask = vec![false; lanes];
        mask[self.rng.random_range(0..lanes)] = true;
        mask
    }

    fn spawn_row(
        &mut self,
        z: f32,
        layout: &RowLayout,
        tuning: &Tuning,
        animate: bool,
        events: &mut Vec<GameEvent>,
    ) {
        let s = &tuning.streaming;
        let lanes = LaneTracker::new(&tuning.lanes);
        let offset = if animate { s.spawn_offset } else { 0.0 };

        let slots = layout
            .top
            .iter()
            .enumerate()
            .filter(|&(_, &present)| present)
            .map(|(lane, _)| (lane, s.top_y, s.top_y + offset))
            .chain(
                layout
                    .bottom
                    .iter()
                    .enumerate()
                    .filter(|&(_, &present)| present)
                    .map(|(lane, _)| (lane, s.bottom_y, s.bottom_y - offset)),
            )
            .collect::<Vec<_>>();

        for (lane, rest_y, spawn_y) in slots {
            let id = BlockId(self.next_entity_id());
            let length = self.rng.random_range(s.block_length_range());
            let polarity = Polarity::from_is_red(self.rng.random_bool(s.red_probability()));
            let position = Vec3::new(lanes.lane_x(lane as u32), spawn_y, z);
            let block = Block::new(id, position, rest_y, length, polarity, s);
            events.push(GameEvent::BlockSpawned {
                id,
                position,
                length,
                polarity,
                chained: block.chained,
            });
            self.state.blocks.push(block);
        }
        self.state.furthest_block_z = z;
        log::debug!("Spawned block row at z={:.2} ({} live blocks)", z, self.state.blocks.len());
    }

    fn spawn_wall_batch(&mut self, s: &StreamingTuning, animate: bool, events: &mut Vec<GameEvent>) {
        let slide = if animate { s.wall_slide_distance } else { 0.0 };
        for _ in 0..s.segments_per_batch {
            let z = self.state.furthest_wall_z + s.wall_step();
            for layer in 0..s.wall_layers {
                let y = s.wall_base_y + layer as f32 * s.wall_vertical_spacing;
                for (side, rest_x) in [(WallSide::Left, -s.wall_x), (WallSide::Right, s.wall_x)] {
                    let id = WallId(self.next_entity_id());
                    let x = rest_x + rest_x.signum() * slide;
                    let position = Vec3::new(x, y, z);
                    events.push(GameEvent::WallSpawned { id, position, side });
                    self.state.walls.push(WallSegment {
                        id,
                        position,
                        side,
                        rest_x,
                    });
                }
            }
            self.state.furthest_wall_z = z;
        }
        log::debug!(
            "Spawned wall batch up to z={:.2} ({} live walls)",
            self.state.furthest_wall_z,
            self.state.walls.len()
        );
    }

    fn cull(&mut self, player_z: f32, s: &StreamingTuning, events: &mut Vec<GameEvent>) {
        let cutoff = player_z - s.cull_behind();

        let stale = self.state.walls.partition_point(|w| w.position.z < cutoff);
        if stale > 0 {
            events.extend(self.state.walls.drain(..stale).map(|w| GameEvent::WallDespawned { id: w.id }));
            log::debug!("Culled {} walls behind z={:.2}", stale, cutoff);
        }

        if s.cull_blocks {
            let stale = self.state.blocks.partition_point(|b| b.position.z < cutoff);
            if stale > 0 {
                events.extend(
                    self.state.blocks.drain(..stale).map(|b| GameEvent::BlockDespawned { id: b.id }),
                );
                log::debug!("Culled {} blocks behind z={:.2}", stale, cutoff);
            }
        }
    }
}
