//! Per-actor simulation context and the full actor tick.
//!
//! [`PlayerSim`] owns everything one controlled actor carries between frames
//! (physics state, jump edge detection, trigger debounce, death cooldown,
//! position-send throttle). The world is borrowed per call, so several
//! independent actors and worlds can live in one process.

use tracing::trace;

use hopper_world::entity::Entity;
use hopper_world::math::Vec3;
use hopper_world::store::World;

use crate::actor::{Actor, ActorState, Life};
use crate::behavior::TriggerCooldowns;
use crate::collision;
use crate::config::MovementConfig;
use crate::context::FrameContext;
use crate::effects::Modifiers;
use crate::events::{Outbox, SoundKind};
use crate::hazards::{self, DeathCause};
use crate::input::{InputState, JumpEdge};
use crate::movement::{self, Traction};
use crate::throttle::RateLimiter;

/// One controlled actor and its between-frame bookkeeping.
#[derive(Debug, Clone)]
pub struct PlayerSim {
    actor: Actor,
    config: MovementConfig,
    jump_edge: JumpEdge,
    cooldowns: TriggerCooldowns,
    last_death_at: Option<u64>,
    position_sends: RateLimiter,
}

impl PlayerSim {
    /// A new actor at `spawn` with the given tuning.
    pub fn new(spawn: Vec3, config: MovementConfig) -> Self {
        let position_sends = RateLimiter::new(config.position_send_interval_ms);
        Self {
            actor: Actor::new(spawn),
            config,
            jump_edge: JumpEdge::default(),
            cooldowns: TriggerCooldowns::new(),
            last_death_at: None,
            position_sends,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn actor_mut(&mut self) -> &mut Actor {
        &mut self.actor
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// The entity the actor stood on after the last collision pass.
    pub fn surface<'w>(&self, world: &'w World) -> Option<&'w Entity> {
        self.actor.standing_entity().and_then(|id| world.get(id))
    }

    /// Advance the actor by one frame.
    ///
    /// Runs input, acceleration, gravity, jump timing, integration, the
    /// collision pass, and the death checks in that order. Collectibles the
    /// actor consumed are removed from `world`. A dead actor only waits for
    /// its respawn time. Frames with a non-finite or non-positive `dt` do
    /// nothing.
    pub fn step(&mut self, world: &mut World, input: &InputState, frame: &FrameContext<'_>) -> Outbox {
        let mut outbox = Outbox::new();
        let dt = frame.dt;
        if !(dt.is_finite() && dt > 0.0) {
            trace!(dt, "skipping actor step with invalid dt");
            return outbox;
        }

        let pressed = self.jump_edge.pressed(input.space);

        if let Life::Dead { respawn_at } = self.actor.life {
            if frame.now_ms >= respawn_at {
                hazards::respawn(
                    &mut self.actor,
                    frame.respawn_point,
                    &self.config,
                    frame.now_ms,
                    &mut outbox,
                );
            }
            return outbox;
        }

        let local_boost = frame.now_ms < self.actor.speed_boost_until;
        let modifiers = Modifiers::resolve(frame.effects, frame.now_ms, local_boost);

        // Input and acceleration.
        let target = movement::target_velocity(input, &self.config, frame.physics, &modifiers);
        let on_ice = self.surface(world).is_some_and(|s| s.properties.is_ice);
        let rate = Traction::of(self.actor.is_grounded, on_ice)
            .rate(&self.config, input.has_movement());
        movement::accelerate(&mut self.actor, target, rate, dt);

        // Gravity and jumping.
        self.actor.jump_held = input.space;
        movement::apply_gravity(&mut self.actor, &self.config, frame.physics, &modifiers, dt);
        let force = movement::jump_force(&self.config, frame.physics, &modifiers);
        if movement::update_jump(&mut self.actor, pressed, force, &self.config, dt) {
            outbox.sound(SoundKind::Jump);
        }

        let previous_bottom = self.actor.position.y - self.config.actor_half_extents.y;
        movement::integrate(&mut self.actor, dt);
        movement::face_velocity(&mut self.actor, &self.config, dt);

        let report = collision::check_collisions(
            &mut self.actor,
            previous_bottom,
            world,
            &self.config,
            frame,
            &mut self.cooldowns,
            &mut outbox,
        );
        for id in &report.removals {
            world.remove_if_present(id);
        }

        let cause = if report.lethal {
            Some(DeathCause::Obstacle)
        } else {
            hazards::check_death(&self.actor, &self.config, frame)
        };
        if let Some(cause) = cause {
            hazards::die(
                &mut self.actor,
                cause,
                &mut self.last_death_at,
                &self.config,
                frame.now_ms,
                &mut outbox,
            );
        }

        outbox
    }

    /// The actor's state if a position send is due at `now_ms`.
    pub fn position_update(&mut self, now_ms: u64) -> Option<ActorState> {
        self.position_sends
            .ready(now_ms)
            .then(|| self.actor.state())
    }
}
