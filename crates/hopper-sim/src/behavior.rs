//! Collision reactions, dispatched per entity trait.
//!
//! Each reaction is a [`Behavior`] implementation registered once in a
//! static table indexed by [`BehaviorKind`]. The collision pass calls
//! [`dispatch`] for every overlapping entity; the first behavior that returns
//! [`Outcome::Handled`] ends dispatch for that pair and skips platform
//! resolution.

use std::collections::HashMap;

use tracing::debug;

use hopper_world::entity::{Entity, EntityId, EntityKind};

use crate::actor::Actor;
use crate::config::MovementConfig;
use crate::context::GamePhase;
use crate::events::{Outbox, ParticleKind, SimEvent, SoundKind};

/// What the collision pass should do after a behavior ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The pair is fully dealt with.
    Handled,
    /// Keep going: later behaviors and platform resolution still apply.
    FallThrough,
}

// ---------------------------------------------------------------------------
// Trigger debounce
// ---------------------------------------------------------------------------

/// Last activation time per trigger entity.
#[derive(Debug, Clone, Default)]
pub struct TriggerCooldowns {
    last_fired: HashMap<EntityId, u64>,
}

impl TriggerCooldowns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an activation of `id` at `now_ms` unless one happened within
    /// `cooldown_ms`. Returns whether this activation counts.
    ///
    /// Entries whose cooldown has run out are dropped on each activation, so
    /// ids of destroyed triggers do not accumulate.
    pub fn try_fire(&mut self, id: &EntityId, now_ms: u64, cooldown_ms: u64) -> bool {
        self.last_fired.retain(|_, last| now_ms.saturating_sub(*last) < cooldown_ms);
        match self.last_fired.get(id) {
            Some(&last) if now_ms.saturating_sub(last) < cooldown_ms => false,
            _ => {
                self.last_fired.insert(id.clone(), now_ms);
                true
            }
        }
    }

    /// Forget every recorded activation.
    pub fn clear(&mut self) {
        self.last_fired.clear();
    }

    /// Number of triggers still inside their cooldown window.
    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CollisionContext
// ---------------------------------------------------------------------------

/// The slice of simulation state a behavior may read and change.
pub struct CollisionContext<'a> {
    pub actor: &'a mut Actor,
    pub config: &'a MovementConfig,
    pub phase: GamePhase,
    pub now_ms: u64,
    pub dt: f64,
    pub cooldowns: &'a mut TriggerCooldowns,
    pub outbox: &'a mut Outbox,
    /// Entities to remove once the pass is over.
    pub removals: Vec<EntityId>,
    /// Set when a behavior wants the actor dead.
    pub lethal: bool,
}

impl CollisionContext<'_> {
    fn debounced(&mut self, id: &EntityId) -> bool {
        self.cooldowns
            .try_fire(id, self.now_ms, self.config.trigger_cooldown_ms)
    }
}

// ---------------------------------------------------------------------------
// Behavior trait and registry
// ---------------------------------------------------------------------------

/// One category of collision reaction.
pub trait Behavior: Sync {
    fn kind(&self) -> BehaviorKind;

    /// Whether `entity` carries the trait this behavior reacts to.
    fn applies(&self, entity: &Entity) -> bool;

    /// React to the actor overlapping `entity`.
    fn on_overlap(&self, entity: &Entity, ctx: &mut CollisionContext<'_>) -> Outcome;
}

/// Registered behaviors in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorKind {
    Collectible,
    Obstacle,
    Bounce,
    SpeedBoost,
    Wind,
    Goal,
    Trigger,
}

impl BehaviorKind {
    pub const ALL: [BehaviorKind; 7] = [
        BehaviorKind::Collectible,
        BehaviorKind::Obstacle,
        BehaviorKind::Bounce,
        BehaviorKind::SpeedBoost,
        BehaviorKind::Wind,
        BehaviorKind::Goal,
        BehaviorKind::Trigger,
    ];

    /// The registered implementation.
    pub fn behavior(self) -> &'static dyn Behavior {
        REGISTRY[self as usize]
    }
}

static REGISTRY: [&dyn Behavior; 7] = [
    &CollectibleBehavior,
    &ObstacleBehavior,
    &BounceBehavior,
    &SpeedBoostBehavior,
    &WindBehavior,
    &GoalBehavior,
    &TriggerBehavior,
];

/// Run every applicable behavior for one overlapping entity.
pub fn dispatch(entity: &Entity, ctx: &mut CollisionContext<'_>) -> Outcome {
    for kind in BehaviorKind::ALL {
        let behavior = kind.behavior();
        if behavior.applies(entity) && behavior.on_overlap(entity, ctx) == Outcome::Handled {
            return Outcome::Handled;
        }
    }
    Outcome::FallThrough
}

// ---------------------------------------------------------------------------
// Behaviors
// ---------------------------------------------------------------------------

struct CollectibleBehavior;

impl Behavior for CollectibleBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Collectible
    }

    fn applies(&self, entity: &Entity) -> bool {
        entity.kind == EntityKind::Collectible
    }

    fn on_overlap(&self, entity: &Entity, ctx: &mut CollisionContext<'_>) -> Outcome {
        if ctx.removals.contains(&entity.id) {
            return Outcome::Handled;
        }
        ctx.removals.push(entity.id.clone());
        ctx.outbox.emit(SimEvent::Collected {
            entity_id: entity.id.clone(),
        });
        ctx.outbox.particles(entity.position, ParticleKind::Sparkle);
        ctx.outbox.sound(SoundKind::Collect);
        Outcome::Handled
    }
}

struct ObstacleBehavior;

impl Behavior for ObstacleBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Obstacle
    }

    fn applies(&self, entity: &Entity) -> bool {
        entity.kind == EntityKind::Obstacle
    }

    fn on_overlap(&self, entity: &Entity, ctx: &mut CollisionContext<'_>) -> Outcome {
        if ctx.phase == GamePhase::Playing && !ctx.actor.is_invulnerable(ctx.now_ms) {
            debug!(entity = %entity.id, "obstacle contact");
            ctx.lethal = true;
        }
        Outcome::Handled
    }
}

struct BounceBehavior;

impl Behavior for BounceBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Bounce
    }

    fn applies(&self, entity: &Entity) -> bool {
        entity.properties.bounce.is_some()
    }

    fn on_overlap(&self, entity: &Entity, ctx: &mut CollisionContext<'_>) -> Outcome {
        let Some(force) = entity.properties.bounce_force() else {
            return Outcome::FallThrough;
        };
        let actor = &mut *ctx.actor;
        actor.velocity.y = force;
        actor.is_grounded = false;
        actor.is_jumping = true;
        actor.coyote_timer = 0.0;
        ctx.outbox.particles(actor.position, ParticleKind::Burst);
        ctx.outbox.sound(SoundKind::Bounce);
        Outcome::Handled
    }
}

struct SpeedBoostBehavior;

impl Behavior for SpeedBoostBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::SpeedBoost
    }

    fn applies(&self, entity: &Entity) -> bool {
        entity.properties.speed_boost.is_some()
    }

    fn on_overlap(&self, entity: &Entity, ctx: &mut CollisionContext<'_>) -> Outcome {
        let Some(duration) = entity.properties.boost_duration() else {
            return Outcome::FallThrough;
        };
        // Standing on the pad keeps extending the window; only the first
        // touch gets a sound.
        if ctx.now_ms >= ctx.actor.speed_boost_until {
            ctx.outbox.sound(SoundKind::Boost);
        }
        ctx.actor.speed_boost_until = ctx.now_ms.saturating_add(duration);
        Outcome::FallThrough
    }
}

struct WindBehavior;

impl Behavior for WindBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Wind
    }

    fn applies(&self, entity: &Entity) -> bool {
        entity.properties.wind.is_some()
    }

    fn on_overlap(&self, entity: &Entity, ctx: &mut CollisionContext<'_>) -> Outcome {
        if let Some(wind) = &entity.properties.wind {
            ctx.actor.velocity += wind.force * ctx.dt;
        }
        Outcome::FallThrough
    }
}

struct GoalBehavior;

impl Behavior for GoalBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Goal
    }

    fn applies(&self, entity: &Entity) -> bool {
        entity.properties.is_goal
    }

    fn on_overlap(&self, entity: &Entity, ctx: &mut CollisionContext<'_>) -> Outcome {
        if ctx.debounced(&entity.id) {
            ctx.outbox.emit(SimEvent::GoalReached {
                entity_id: entity.id.clone(),
            });
            ctx.outbox.particles(entity.position, ParticleKind::Sparkle);
            ctx.outbox.sound(SoundKind::Trigger);
        }
        Outcome::FallThrough
    }
}

/// Plain trigger volume: a `trigger` entity with no more specific trait.
struct TriggerBehavior;

impl Behavior for TriggerBehavior {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Trigger
    }

    fn applies(&self, entity: &Entity) -> bool {
        let p = &entity.properties;
        entity.kind == EntityKind::Trigger
            && p.bounce.is_none()
            && p.speed_boost.is_none()
            && p.wind.is_none()
            && !p.is_goal
    }

    fn on_overlap(&self, entity: &Entity, ctx: &mut CollisionContext<'_>) -> Outcome {
        if ctx.debounced(&entity.id) {
            ctx.outbox.emit(SimEvent::TriggerActivated {
                entity_id: entity.id.clone(),
            });
            ctx.outbox.sound(SoundKind::Trigger);
        }
        Outcome::FallThrough
    }
}
