//! Actor movement: input to velocity, gravity, jump timing, integration.
//!
//! These are the first five stages of an actor tick. Each is a free function
//! over [`Actor`] so it can be tested in isolation; [`PlayerSim`] calls them
//! in order before the collision pass.
//!
//! [`PlayerSim`]: crate::player::PlayerSim

use hopper_world::math::{lerp_angle, yaw_towards, Vec3};

use crate::actor::Actor;
use crate::config::{MovementConfig, ServerPhysics};
use crate::effects::Modifiers;
use crate::input::InputState;

/// Horizontal speed below which the actor keeps its current facing.
const FACING_MIN_SPEED: f64 = 0.1;

// ---------------------------------------------------------------------------
// Stage 1: target velocity
// ---------------------------------------------------------------------------

/// Desired horizontal velocity for this frame's input.
pub fn target_velocity(
    input: &InputState,
    config: &MovementConfig,
    physics: &ServerPhysics,
    modifiers: &Modifiers,
) -> Vec3 {
    let base = if input.shift {
        config.sprint_speed
    } else {
        config.walk_speed
    };
    let speed = base * physics.speed_scale * modifiers.speed;
    let mut dir = input.movement_direction();
    if modifiers.inverted {
        dir = dir * -1.0;
    }
    dir * speed
}

/// Jump force after server tuning and effects.
pub fn jump_force(config: &MovementConfig, physics: &ServerPhysics, modifiers: &Modifiers) -> f64 {
    config.jump_force * physics.jump_scale * modifiers.jump
}

// ---------------------------------------------------------------------------
// Stage 2: acceleration
// ---------------------------------------------------------------------------

/// Which acceleration curve applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traction {
    Air,
    Ice,
    Ground,
}

impl Traction {
    /// Pick the regime from grounded state and the surface's ice trait.
    pub fn of(is_grounded: bool, on_ice: bool) -> Self {
        match (is_grounded, on_ice) {
            (false, _) => Traction::Air,
            (true, true) => Traction::Ice,
            (true, false) => Traction::Ground,
        }
    }

    /// Rate (units/s²) used when steering toward a target.
    pub fn rate(self, config: &MovementConfig, has_input: bool) -> f64 {
        match (self, has_input) {
            (Traction::Air, true) => config.air_accel,
            (Traction::Air, false) => config.air_decel,
            (Traction::Ice, true) => config.ground_accel * config.ice_accel_factor,
            (Traction::Ice, false) => config.ground_decel * config.ice_decel_factor,
            (Traction::Ground, true) => config.ground_accel,
            (Traction::Ground, false) => config.ground_decel,
        }
    }
}

/// Move horizontal velocity toward `target` by at most `rate * dt`.
pub fn accelerate(actor: &mut Actor, target: Vec3, rate: f64, dt: f64) {
    let current = actor.velocity.horizontal();
    let diff = target.horizontal() - current;
    let max_step = rate * dt;
    let next = if diff.length() <= max_step {
        target.horizontal()
    } else {
        current + diff.normalize_or_zero() * max_step
    };
    actor.velocity.x = next.x;
    actor.velocity.z = next.z;
}

// ---------------------------------------------------------------------------
// Stage 3: gravity
// ---------------------------------------------------------------------------

/// Apply asymmetric gravity and clamp to terminal velocity.
///
/// Falling uses `fall_multiplier`; rising with the jump key released uses the
/// larger `low_jump_multiplier`; rising with the key held uses plain gravity.
pub fn apply_gravity(
    actor: &mut Actor,
    config: &MovementConfig,
    physics: &ServerPhysics,
    modifiers: &Modifiers,
    dt: f64,
) {
    let gravity = config.base_gravity * physics.gravity_scale() * modifiers.gravity;
    let multiplier = if actor.velocity.y < 0.0 {
        config.fall_multiplier
    } else if actor.velocity.y > 0.0 && !actor.jump_held {
        config.low_jump_multiplier
    } else {
        1.0
    };
    actor.velocity.y += gravity * multiplier * dt;
    if actor.velocity.y < config.terminal_velocity {
        actor.velocity.y = config.terminal_velocity;
    }
}

// ---------------------------------------------------------------------------
// Stage 4: coyote time and jump buffer
// ---------------------------------------------------------------------------

/// Advance the coyote and buffer timers and jump if both allow it.
///
/// `pressed` must be edge-triggered. Returns whether a jump started.
pub fn update_jump(
    actor: &mut Actor,
    pressed: bool,
    force: f64,
    config: &MovementConfig,
    dt: f64,
) -> bool {
    if actor.is_grounded {
        actor.coyote_timer = config.coyote_time;
    } else {
        actor.coyote_timer = (actor.coyote_timer - dt).max(0.0);
    }

    actor.jump_buffer_timer = (actor.jump_buffer_timer - dt).max(0.0);
    if pressed {
        actor.jump_buffer_timer = config.jump_buffer_time;
    }

    let can_jump = actor.is_grounded || actor.coyote_timer > 0.0;
    if can_jump && actor.jump_buffer_timer > 0.0 && !actor.is_jumping {
        actor.velocity.y = force;
        actor.is_jumping = true;
        actor.is_grounded = false;
        actor.coyote_timer = 0.0;
        actor.jump_buffer_timer = 0.0;
        return true;
    }
    false
}

// ---------------------------------------------------------------------------
// Stage 5: integration and facing
// ---------------------------------------------------------------------------

/// Advance position by velocity.
pub fn integrate(actor: &mut Actor, dt: f64) {
    actor.position += actor.velocity * dt;
}

/// Turn toward the direction of horizontal travel along the shorter arc.
pub fn face_velocity(actor: &mut Actor, config: &MovementConfig, dt: f64) {
    if actor.velocity.horizontal_length() < FACING_MIN_SPEED {
        return;
    }
    let target = yaw_towards(actor.velocity.x, actor.velocity.z);
    actor.rotation = lerp_angle(actor.rotation, target, (config.turn_rate * dt).min(1.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn grounded_actor() -> Actor {
        let mut actor = Actor::new(Vec3::ZERO);
        actor.is_grounded = true;
        actor
    }

    /// Run `ticks` frames of jump-timer updates with the given grounded state.
    fn idle(actor: &mut Actor, config: &MovementConfig, ticks: usize, grounded: bool, dt: f64) {
        for _ in 0..ticks {
            actor.is_grounded = grounded;
            assert!(!update_jump(actor, false, 10.0, config, dt));
        }
    }

    #[test]
    fn buffered_jump_80ms_before_landing_executes() {
        let config = MovementConfig::default();
        let dt = 0.02;
        let mut actor = Actor::new(Vec3::ZERO);
        actor.is_jumping = false;

        // t = 0: press while airborne.
        assert!(!update_jump(&mut actor, true, 10.0, &config, dt));
        // t = 20..60 ms: still falling.
        idle(&mut actor, &config, 3, false, dt);
        // t = 80 ms: landed.
        actor.is_grounded = true;
        assert!(update_jump(&mut actor, false, 10.0, &config, dt));
        assert_eq!(actor.velocity.y, 10.0);
        assert_eq!(actor.jump_buffer_timer, 0.0);
        assert_eq!(actor.coyote_timer, 0.0);
    }

    #[test]
    fn buffered_jump_150ms_before_landing_expires() {
        let config = MovementConfig::default();
        let dt = 0.025;
        let mut actor = Actor::new(Vec3::ZERO);

        assert!(!update_jump(&mut actor, true, 10.0, &config, dt));
        idle(&mut actor, &config, 5, false, dt);
        // t = 150 ms: landed, buffer already gone.
        actor.is_grounded = true;
        assert!(!update_jump(&mut actor, false, 10.0, &config, dt));
        assert_eq!(actor.velocity.y, 0.0);
    }

    #[test]
    fn coyote_jump_80ms_after_leaving_ledge_executes() {
        let config = MovementConfig::default();
        let dt = 0.02;
        let mut actor = grounded_actor();
        idle(&mut actor, &config, 1, true, dt);
        // Walked off: three airborne frames (20, 40, 60 ms).
        idle(&mut actor, &config, 3, false, dt);
        // t = 80 ms: press.
        actor.is_grounded = false;
        assert!(update_jump(&mut actor, true, 10.0, &config, dt));
    }

    #[test]
    fn coyote_jump_150ms_after_leaving_ledge_fails() {
        let config = MovementConfig::default();
        let dt = 0.025;
        let mut actor = grounded_actor();
        idle(&mut actor, &config, 1, true, dt);
        idle(&mut actor, &config, 5, false, dt);
        actor.is_grounded = false;
        assert!(!update_jump(&mut actor, true, 10.0, &config, dt));
        assert_eq!(actor.velocity.y, 0.0);
    }

    #[test]
    fn no_double_jump_while_jumping() {
        let config = MovementConfig::default();
        let mut actor = grounded_actor();
        assert!(update_jump(&mut actor, true, 10.0, &config, 0.016));
        // Coyote was zeroed and is_jumping blocks a second jump.
        assert!(!update_jump(&mut actor, true, 10.0, &config, 0.016));
    }

    #[test]
    fn buffer_decays_even_when_grounded() {
        let config = MovementConfig::default();
        let mut actor = grounded_actor();
        actor.is_jumping = true; // mid-landing frame, jump not yet cleared
        update_jump(&mut actor, true, 10.0, &config, 0.016);
        let before = actor.jump_buffer_timer;
        update_jump(&mut actor, false, 10.0, &config, 0.016);
        assert!(actor.jump_buffer_timer < before);
    }

    #[test]
    fn gravity_is_asymmetric() {
        let config = MovementConfig::default();
        let physics = ServerPhysics::default();
        let m = Modifiers::default();
        let dt = 0.01;

        let mut rising_held = Actor::new(Vec3::ZERO);
        rising_held.velocity.y = 5.0;
        rising_held.jump_held = true;
        apply_gravity(&mut rising_held, &config, &physics, &m, dt);

        let mut rising_released = Actor::new(Vec3::ZERO);
        rising_released.velocity.y = 5.0;
        apply_gravity(&mut rising_released, &config, &physics, &m, dt);

        let mut falling = Actor::new(Vec3::ZERO);
        falling.velocity.y = -5.0;
        apply_gravity(&mut falling, &config, &physics, &m, dt);

        let held_drop = 5.0 - rising_held.velocity.y;
        let released_drop = 5.0 - rising_released.velocity.y;
        let fall_drop = -5.0 - falling.velocity.y;
        assert!(fall_drop > held_drop);
        assert!(released_drop > fall_drop);
    }

    #[test]
    fn gravity_scales_with_server_value_and_clamps() {
        let config = MovementConfig::default();
        let m = Modifiers::default();
        let half = ServerPhysics {
            gravity: -4.905,
            ..Default::default()
        };
        let mut a = Actor::new(Vec3::ZERO);
        a.jump_held = true;
        apply_gravity(&mut a, &config, &half, &m, 0.1);
        assert!((a.velocity.y - config.base_gravity * 0.5 * 0.1).abs() < 1e-9);

        let mut b = Actor::new(Vec3::ZERO);
        b.velocity.y = -39.0;
        apply_gravity(&mut b, &config, &ServerPhysics::default(), &m, 1.0);
        assert_eq!(b.velocity.y, config.terminal_velocity);
    }

    #[test]
    fn ice_stops_slower_than_ground() {
        let config = MovementConfig::default();
        let dt = 1.0 / 60.0;
        let run = |traction: Traction| {
            let mut actor = grounded_actor();
            actor.velocity.x = 8.0;
            let mut distance = 0.0;
            for _ in 0..60 {
                accelerate(&mut actor, Vec3::ZERO, traction.rate(&config, false), dt);
                distance += actor.velocity.x * dt;
            }
            distance
        };
        let ground = run(Traction::Ground);
        let ice = run(Traction::Ice);
        assert!(ice > ground * 3.0, "ice {ice} vs ground {ground}");
    }

    #[test]
    fn accelerate_reaches_target_without_overshoot() {
        let mut actor = grounded_actor();
        accelerate(&mut actor, Vec3::new(1.0, 0.0, 0.0), 100.0, 1.0);
        assert_eq!(actor.velocity.x, 1.0);
        assert_eq!(actor.velocity.y, 0.0);
    }

    #[test]
    fn traction_regimes() {
        assert_eq!(Traction::of(false, true), Traction::Air);
        assert_eq!(Traction::of(true, true), Traction::Ice);
        assert_eq!(Traction::of(true, false), Traction::Ground);
        let config = MovementConfig::default();
        assert_ne!(
            Traction::Air.rate(&config, true),
            Traction::Air.rate(&config, false)
        );
    }

    #[test]
    fn facing_turns_the_short_way() {
        let config = MovementConfig::default();
        let mut actor = Actor::new(Vec3::ZERO);
        actor.rotation = PI - 0.05;
        // Travel direction with yaw just past -PI.
        actor.velocity = Vec3::new(-0.05f64.sin(), 0.0, -(0.05f64.cos()));
        face_velocity(&mut actor, &config, 1.0 / 60.0);
        // Never swings through zero.
        assert!(actor.rotation.abs() > PI - 0.2, "rotation {}", actor.rotation);
    }

    #[test]
    fn inverted_controls_flip_target() {
        let config = MovementConfig::default();
        let physics = ServerPhysics::default();
        let input = InputState {
            w: true,
            ..Default::default()
        };
        let normal = target_velocity(&input, &config, &physics, &Modifiers::default());
        let inverted = target_velocity(
            &input,
            &config,
            &physics,
            &Modifiers {
                inverted: true,
                ..Default::default()
            },
        );
        assert!((normal + inverted).length() < 1e-9);
        assert!((normal.length() - config.walk_speed).abs() < 1e-9);
    }
}
