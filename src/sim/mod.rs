//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (by spawn order)
//! - No rendering, audio or platform dependencies
//!
//! Collision resolution is delegated to a [`MotionController`].

pub mod body;
pub mod force;
pub mod integrator;
pub mod lane;
pub mod polarity;
pub mod state;
pub mod streaming;
pub mod tick;

pub use body::{KinematicBody, MotionController};
pub use force::ForceField;
pub use integrator::{DeathStep, JumpOutcome, VelocityIntegrator};
pub use lane::LaneTracker;
pub use polarity::{Polarity, toggle_block, toggle_player};
pub use state::{
    Block, BlockId, GameEvent, GamePhase, GameState, InfluenceVolume, JumpCooldown, Player,
    PolarityTarget, WallId, WallSegment, WallSide,
};
pub use streaming::{PipelineState, RowLayout, StreamingGenerator, StreamingState};
pub use tick::{TickInput, restart, tick};
