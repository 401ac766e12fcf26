//! Magnet force between the player and a single block
//!
//! Same polarity pushes the player away from the block centre, different
//! polarity pulls it in (much harder). The raw force is then "massaged" per
//! axis so falling players get rescued and climbing players do not run away.

use glam::Vec3;

use super::polarity::Polarity;
use super::state::{Block, Player};
use crate::consts::EPSILON;
use crate::lerp;
use crate::tuning::ForceTuning;

/// Force evaluator for player/block pairs
#[derive(Debug, Clone, Copy)]
pub struct ForceField<'a> {
    tuning: &'a ForceTuning,
}

impl<'a> ForceField<'a> {
    pub fn new(tuning: &'a ForceTuning) -> Self {
        Self { tuning }
    }

    /// Force `block` exerts on `player` this frame.
    ///
    /// Callers only ask for blocks the motion controller reports as
    /// overlapping. Past the volume extent the rolloff saturates at
    /// `rolloff_min`. Zero when `dt` is not positive, the player sits exactly
    /// on the block centre, or the player is resting against a block of the
    /// other polarity.
    pub fn compute_force(&self, player: &Player, block: &Block, dt: f32) -> Vec3 {
        let t = self.tuning;
        if dt.is_nan() || dt <= 0.0 {
            return Vec3::ZERO;
        }
        let distance = player.position - block.position;
        let length = distance.length();
        if length < EPSILON || !length.is_finite() {
            return Vec3::ZERO;
        }

        let mut force = t.strength * (distance / length) * (t.time_scale * dt);
        force *= self.speed_factor(player.speed);

        if block.gradual_rolloff {
            force *= self.rolloff(length, block.trigger_extent());
        }

        if !Polarity::matches(block.polarity, player.polarity) {
            force = -force * t.opposite_multiplier;
        }

        let force = self.massage(force, player, block);

        if !player.is_touching(block.id) || Polarity::matches(block.polarity, player.polarity) {
            force
        } else {
            Vec3::ZERO
        }
    }

    /// Faster players get pushed and pulled harder, up to a cap
    pub fn speed_factor(&self, speed: f32) -> f32 {
        let t = self.tuning;
        1.0 + ((speed / t.speed_divisor).min(t.speed_factor_cap) - t.speed_factor_offset)
    }

    /// Full strength at the centre, `rolloff_min` at the edge of the volume
    pub fn rolloff(&self, distance: f32, extent: f32) -> f32 {
        if extent.is_nan() || extent <= EPSILON {
            return 1.0;
        }
        lerp(1.0, self.tuning.rolloff_min, distance.min(extent) / extent)
    }

    fn massage(&self, force: Vec3, player: &Player, block: &Block) -> Vec3 {
        let t = self.tuning;
        let vy = player.force_velocity.y;
        let mut y = force.y;
        let mut z = force.z;

        if force.y > 0.0 {
            if vy <= t.rising_threshold {
                y *= t.falling_pull_multiplier;
            } else {
                y *= t.rising_pull_multiplier;
            }
        }
        if force.z > 0.0 {
            z *= t.forward_multiplier;
        }
        if player.position.y > block.position.y && force.y > 0.0 {
            y *= t.escape_multiplier;
        }

        Vec3::new(force.x, y, z)
    }
}
