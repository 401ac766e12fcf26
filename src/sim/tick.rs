//! Per-frame simulation tick
//!
//! Order within a tick matters: lane correction happens before forces are
//! evaluated, and every block's force is summed before integration.

use glam::Vec3;

use super::body::MotionController;
use super::force::ForceField;
use super::integrator::{DeathStep, VelocityIntegrator};
use super::lane::LaneTracker;
use super::polarity::{Polarity, toggle_player};
use super::state::{GameEvent, GamePhase, GameState};

/// Discrete input events for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub lane_left: bool,
    pub lane_right: bool,
    pub jump: bool,
    pub toggle_polarity: bool,
    /// Demo mode - the simulation picks polarity and jumps by itself
    pub autopilot: bool,
}

/// Advance the game state by `dt` seconds.
///
/// `state.events` is cleared first and then holds everything this tick
/// raised. Non-positive or non-finite `dt` leaves the state untouched.
pub fn tick<M: MotionController>(state: &mut GameState, body: &mut M, input: &TickInput, dt: f32) {
    if !dt.is_finite() || dt <= 0.0 {
        return;
    }
    state.events.clear();

    // Frozen until the host answers the restart request
    if state.phase == GamePhase::AwaitingRestart {
        return;
    }
    state.time_ticks += 1;

    let mut input = input.clone();
    if input.autopilot {
        autopilot(state, &mut input);
    }
    let alive = state.phase == GamePhase::Running;

    if alive && input.toggle_polarity {
        toggle_player(state);
    }

    let lanes = LaneTracker::new(&state.tuning.lanes);
    let blocks = &state.world.state.blocks;

    let direction = input.lane_right as i32 - input.lane_left as i32;
    if alive && direction != 0 {
        let from = body.position();
        let to = lanes.change_lane(from, direction);
        if to != from {
            body.move_by(to - from, blocks);
            state.events.push(GameEvent::LaneChanged {
                lane: lanes.lane_index(to.x),
            });
        }
    }

    let position = body.position();
    let corrected = lanes.correct_lane(position);
    if corrected != position {
        body.move_by(corrected - position, blocks);
    }

    // Probe the motion controller
    let tuning = &state.tuning;
    let integrator = VelocityIntegrator::new(&tuning.motion);
    let player = &mut state.player;
    player.position = body.position();
    player.is_grounded = body.is_grounded(blocks);
    if player.is_grounded {
        player.jump_cooldown.land(tuning.motion.land_cooldown);
    }
    player.touching = body.contacts(blocks);

    let overlapping = body.overlap_query(blocks);
    for &id in &overlapping {
        if !player.overlapping.contains(&id) {
            state.events.push(GameEvent::VolumeEntered { id });
        }
    }
    for &id in &player.overlapping {
        if !overlapping.contains(&id) {
            state.events.push(GameEvent::VolumeExited { id });
        }
    }
    player.overlapping = overlapping;

    if alive && input.jump {
        if let Some(outcome) = integrator.try_jump(player) {
            state.events.push(GameEvent::Jumped {
                impulse: outcome.impulse,
                boosted: outcome.boosted,
            });
        }
    }

    // Forces from every block whose volume holds the player
    let field = ForceField::new(&tuning.force);
    let total: Vec3 = blocks
        .iter()
        .filter(|b| player.overlapping.contains(&b.id))
        .map(|b| field.compute_force(player, b, dt))
        .sum();
    integrator.apply_force(player, total);

    player.attached_to_opposing_block = blocks
        .iter()
        .filter(|b| player.touching.contains(&b.id))
        .any(|b| !Polarity::matches(b.polarity, player.polarity));

    let displacement = integrator.integrate(player, dt);
    body.move_by(displacement, blocks);
    player.position = body.position();

    if alive && player.position.z > player.distance_travelled {
        let before = whole_metres(player.distance_travelled);
        player.distance_travelled = player.position.z;
        let after = whole_metres(player.distance_travelled);
        if after != before {
            state.events.push(GameEvent::DistanceChanged { metres: after });
        }
    }

    match integrator.update_death(player, dt) {
        DeathStep::Started => {
            log::info!(
                "Player falling to death at z={:.1} (best {:.1})",
                player.position.z,
                player.distance_travelled
            );
            state.phase = GamePhase::Dying;
            state.events.push(GameEvent::DeathStarted);
        }
        DeathStep::RestartRequested => {
            state.phase = GamePhase::AwaitingRestart;
            state.events.push(GameEvent::RestartRequested);
        }
        DeathStep::Alive | DeathStep::Counting => {}
    }

    if state.phase == GamePhase::Running {
        integrator.advance_speed(player, dt);
    }
    player.jump_cooldown.tick(dt);

    let (z, speed) = (player.position.z, player.speed);
    state.world.tick(z, speed, dt, &state.tuning, &mut state.events);
}

/// Answer a restart request: respawn the player and rebuild the world
pub fn restart<M: MotionController>(state: &mut GameState, body: &mut M) {
    log::info!(
        "Restarting after {:.1} m ({} ticks)",
        state.player.distance_travelled,
        state.time_ticks
    );
    state.player.reset(&state.tuning.motion);
    body.teleport(state.player.position);
    state.world.reset_world(&state.tuning, &mut state.events);
    state.phase = GamePhase::Running;
}

fn whole_metres(distance: f32) -> u32 {
    distance.max(0.0) as u32
}

/// Demo player: lift when falling, avoid sticking otherwise
fn autopilot(state: &GameState, input: &mut TickInput) {
    let player = &state.player;

    let nearest = state
        .blocks()
        .iter()
        .filter(|b| player.overlapping.contains(&b.id))
        .min_by(|a, b| {
            let da = a.position.distance_squared(player.position);
            let db = b.position.distance_squared(player.position);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });

    if let Some(block) = nearest {
        let below = block.position.y < player.position.y;
        let falling = player.force_velocity.y <= 0.0;
        // Same polarity pushes away, opposite pulls in
        let wanted = if below || !falling {
            block.polarity
        } else {
            block.polarity.toggled()
        };
        if player.polarity != wanted || player.attached_to_opposing_block {
            input.toggle_polarity = true;
        }
    }

    if !player.is_grounded
        && player.force_velocity.y < -state.tuning.motion.jump_fast_threshold
        && player.jump_cooldown.is_ready()
    {
        input.jump = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::body::KinematicBody;
    use crate::sim::state::{Block, BlockId};
    use crate::tuning::Tuning;

    fn setup(seed: u64) -> (GameState, KinematicBody) {
        let state = GameState::new(seed, Tuning::default());
        let body = KinematicBody::new(state.player.position, state.tuning.motion.player_radius);
        (state, body)
    }

    /// Put a single block at `position`, replacing the streamed ones
    fn only_block(state: &mut GameState, position: glam::Vec3, polarity: Polarity) -> BlockId {
        let id = BlockId(9999);
        let block = Block::new(id, position, position.y, 4.0, polarity, &state.tuning.streaming);
        state.world.state.blocks = vec![block];
        id
    }

    #[test]
    fn test_free_fall_tick() {
        let (mut state, mut body) = setup(1);
        let start = state.player.position;
        tick(&mut state, &mut body, &TickInput::default(), 0.016);

        let gravity = state.tuning.motion.gravity;
        assert_eq!(state.player.force_velocity.x, 0.0);
        assert!((state.player.force_velocity.y - gravity * 0.016).abs() < 1e-6);
        assert_eq!(state.player.force_velocity.z, 0.0);
        let dz = state.player.position.z - start.z;
        assert!((dz - state.tuning.motion.start_speed * 0.016).abs() < 1e-5);
        assert_eq!(state.time_ticks, 1);
    }

    #[test]
    fn test_bad_dt_is_noop() {
        let (mut state, mut body) = setup(1);
        let before = state.player.clone();
        tick(&mut state, &mut body, &TickInput::default(), -1.0);
        tick(&mut state, &mut body, &TickInput::default(), 0.0);
        assert_eq!(state.player.position, before.position);
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_lane_input_and_correction() {
        let (mut state, mut body) = setup(1);
        let input = TickInput {
            lane_right: true,
            ..Default::default()
        };
        tick(&mut state, &mut body, &input, SIM_DT);
        assert_eq!(state.player.position.x, 3.0);
        assert!(state.events.contains(&GameEvent::LaneChanged { lane: 2 }));

        // Drifted body snaps back onto the lane before forces apply
        body.position.x = 2.2;
        tick(&mut state, &mut body, &TickInput::default(), SIM_DT);
        assert_eq!(state.player.position.x, 3.0);

        // Already on the outer lane: no change event
        tick(&mut state, &mut body, &input, SIM_DT);
        assert!(!state.events.iter().any(|e| matches!(e, GameEvent::LaneChanged { .. })));
    }

    #[test]
    fn test_toggle_polarity_input() {
        let (mut state, mut body) = setup(1);
        let before = state.player.polarity;
        let input = TickInput {
            toggle_polarity: true,
            ..Default::default()
        };
        tick(&mut state, &mut body, &input, SIM_DT);
        assert_eq!(state.player.polarity, before.toggled());
    }

    #[test]
    fn test_volume_enter_and_exit_events() {
        let (mut state, mut body) = setup(1);
        let id = only_block(&mut state, glam::Vec3::new(0.0, -3.0, 0.5), Polarity::Red);

        tick(&mut state, &mut body, &TickInput::default(), SIM_DT);
        assert!(state.events.contains(&GameEvent::VolumeEntered { id }));
        assert_eq!(state.player.overlapping, vec![id]);

        tick(&mut state, &mut body, &TickInput::default(), SIM_DT);
        assert!(!state.events.contains(&GameEvent::VolumeEntered { id }));

        body.teleport(glam::Vec3::new(0.0, 1.0, 30.0));
        tick(&mut state, &mut body, &TickInput::default(), SIM_DT);
        assert!(state.events.contains(&GameEvent::VolumeExited { id }));
        assert!(state.player.overlapping.is_empty());
    }

    #[test]
    fn test_same_polarity_block_below_pushes_up() {
        let (mut state, mut body) = setup(1);
        let polarity = state.player.polarity;
        only_block(&mut state, glam::Vec3::new(0.0, -3.0, 1.0), polarity);
        tick(&mut state, &mut body, &TickInput::default(), SIM_DT);
        assert!(state.player.force_velocity.y > 0.0);
    }

    #[test]
    fn test_opposite_block_sticks_and_halts_forward() {
        let (mut state, mut body) = setup(1);
        let opposite = state.player.polarity.toggled();
        only_block(&mut state, glam::Vec3::new(0.0, 0.0, 1.0), opposite);
        // Resting on top of the block
        body.teleport(glam::Vec3::new(0.0, 1.0, 1.0));
        tick(&mut state, &mut body, &TickInput::default(), SIM_DT);

        assert!(state.player.is_grounded);
        assert!(state.player.attached_to_opposing_block);
        let z = state.player.position.z;
        tick(&mut state, &mut body, &TickInput::default(), SIM_DT);
        assert!((state.player.position.z - z).abs() < 1e-5);
    }

    #[test]
    fn test_air_jump_once_until_landing() {
        let (mut state, mut body) = setup(1);
        let input = TickInput {
            jump: true,
            ..Default::default()
        };
        tick(&mut state, &mut body, &input, SIM_DT);
        assert!(state.events.iter().any(|e| matches!(e, GameEvent::Jumped { boosted: false, .. })));
        assert!(state.player.force_velocity.y > 0.0);

        tick(&mut state, &mut body, &input, SIM_DT);
        assert!(!state.events.iter().any(|e| matches!(e, GameEvent::Jumped { .. })));
    }

    #[test]
    fn test_distance_counter() {
        let (mut state, mut body) = setup(1);
        let mut changes = 0;
        for _ in 0..60 {
            tick(&mut state, &mut body, &TickInput::default(), SIM_DT);
            changes += state
                .events
                .iter()
                .filter(|e| matches!(e, GameEvent::DistanceChanged { .. }))
                .count();
        }
        assert!(state.player.distance_travelled > 9.0);
        assert_eq!(changes as u32, whole_metres(state.player.distance_travelled));
    }

    #[test]
    fn test_fall_death_and_restart() {
        let (mut state, mut body) = setup(1);
        state.world.state.blocks.clear();

        let mut started = false;
        let mut requested = false;
        for _ in 0..1200 {
            tick(&mut state, &mut body, &TickInput::default(), SIM_DT);
            started |= state.events.contains(&GameEvent::DeathStarted);
            if state.events.contains(&GameEvent::RestartRequested) {
                requested = true;
                break;
            }
        }
        assert!(started && requested);
        assert_eq!(state.phase, GamePhase::AwaitingRestart);

        // Frozen until restart
        let frozen = state.player.position;
        tick(&mut state, &mut body, &TickInput::default(), SIM_DT);
        assert_eq!(state.player.position, frozen);

        restart(&mut state, &mut body);
        assert_eq!(state.phase, GamePhase::Running);
        assert_eq!(state.player.position, state.tuning.motion.spawn_position);
        assert_eq!(body.position, state.tuning.motion.spawn_position);
        assert_eq!(state.world.state.furthest_block_z, state.tuning.streaming.initial_block_z());
        assert!(state.events.contains(&GameEvent::WorldReset));
    }

    #[test]
    fn test_inputs_ignored_while_dying() {
        let (mut state, mut body) = setup(1);
        state.phase = GamePhase::Dying;
        state.player.death_timer = Some(10.0);
        let polarity = state.player.polarity;
        let input = TickInput {
            toggle_polarity: true,
            lane_left: true,
            jump: true,
            ..Default::default()
        };
        tick(&mut state, &mut body, &input, SIM_DT);
        assert_eq!(state.player.polarity, polarity);
        assert_eq!(state.player.position.x, 0.0);
        assert!(state.player.force_velocity.y < 0.0);
    }

    #[test]
    fn test_autopilot_picks_lifting_polarity() {
        let (mut state, mut body) = setup(1);
        let block_polarity = state.player.polarity.toggled();
        only_block(&mut state, glam::Vec3::new(0.0, -3.0, 1.0), block_polarity);
        // First tick registers the overlap, second lets the autopilot react
        tick(&mut state, &mut body, &TickInput::default(), SIM_DT);
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        tick(&mut state, &mut body, &input, SIM_DT);
        assert_eq!(state.player.polarity, block_polarity);
    }

    #[test]
    fn test_determinism() {
        let (mut a, mut body_a) = setup(99999);
        let (mut b, mut body_b) = setup(99999);
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        for _ in 0..600 {
            tick(&mut a, &mut body_a, &input, SIM_DT);
            tick(&mut b, &mut body_b, &input, SIM_DT);
        }
        assert_eq!(a.time_ticks, b.time_ticks);
        assert_eq!(a.player.position, b.player.position);
        assert_eq!(a.blocks().len(), b.blocks().len());
    }
}
