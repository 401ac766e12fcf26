//! Player velocity integration
//!
//! Owns everything that changes `force_velocity` apart from the magnet
//! forces themselves: gravity, grounding, drag, jumping, the forward speed
//! ramp and the fall-death countdown.

use glam::Vec3;

use super::state::{JumpCooldown, Player};
use crate::decay_toward_zero;
use crate::tuning::MotionTuning;

/// Result of a successful jump
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpOutcome {
    pub impulse: Vec3,
    /// Impulse was amplified to recover from a fast fall
    pub boosted: bool,
}

/// Death countdown transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathStep {
    Alive,
    Started,
    Counting,
    RestartRequested,
}

#[derive(Debug, Clone, Copy)]
pub struct VelocityIntegrator<'a> {
    tuning: &'a MotionTuning,
}

impl<'a> VelocityIntegrator<'a> {
    pub fn new(tuning: &'a MotionTuning) -> Self {
        Self { tuning }
    }

    /// Add an external force into the accumulated velocity
    pub fn apply_force(&self, player: &mut Player, force: Vec3) {
        if force.is_finite() {
            player.force_velocity += force;
        }
    }

    /// Advance `force_velocity` by one tick and return this tick's displacement
    pub fn integrate(&self, player: &mut Player, dt: f32) -> Vec3 {
        if !dt.is_finite() || dt <= 0.0 {
            return Vec3::ZERO;
        }
        let t = self.tuning;
        let v = &mut player.force_velocity;

        if !player.is_grounded {
            v.y += t.gravity * dt;
        } else if v.y < 0.0 {
            v.y = 0.0;
        }

        let drag = t.drag.max(0.0) * dt;
        v.x = decay_toward_zero(v.x, drag);
        v.z = decay_toward_zero(v.z, drag);

        let forward = if player.attached_to_opposing_block {
            Vec3::ZERO
        } else {
            Vec3::new(0.0, 0.0, player.speed)
        };

        (*v + forward) * dt
    }

    /// Air jump: only while airborne with the cooldown clear
    pub fn try_jump(&self, player: &mut Player) -> Option<JumpOutcome> {
        if player.is_grounded || !player.jump_cooldown.is_ready() {
            return None;
        }
        let t = self.tuning;
        let vy = player.force_velocity.y;
        let mut impulse = t.jump_impulse;
        let mut boosted = false;

        if vy < -t.jump_fast_threshold {
            impulse.y += (-t.jump_fast_threshold - vy) * t.jump_excess_scale;
            boosted = true;
        } else if vy > t.jump_fast_threshold {
            impulse.y = (impulse.y - (vy - t.jump_fast_threshold) * t.jump_excess_scale).max(0.0);
        }

        player.force_velocity += impulse;
        player.jump_cooldown = JumpCooldown::Spent;
        Some(JumpOutcome { impulse, boosted })
    }

    /// Forward speed ramps up while alive
    pub fn advance_speed(&self, player: &mut Player, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let t = self.tuning;
        player.speed = (player.speed + t.acceleration * dt).min(t.max_speed);
    }

    /// Start or advance the death countdown
    pub fn update_death(&self, player: &mut Player, dt: f32) -> DeathStep {
        let t = self.tuning;
        match player.death_timer {
            Some(left) if left <= 0.0 => DeathStep::Counting,
            Some(left) => {
                let left = left - dt.max(0.0);
                player.death_timer = Some(left);
                if left <= 0.0 {
                    DeathStep::RestartRequested
                } else {
                    DeathStep::Counting
                }
            }
            None => {
                if player.position.y < t.death_height
                    && player.force_velocity.y < t.death_fall_threshold
                {
                    player.death_timer = Some(t.death_delay.max(0.0));
                    DeathStep::Started
                } else {
                    DeathStep::Alive
                }
            }
        }
    }
}
