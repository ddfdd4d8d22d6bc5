//! Discrete outputs of the simulation.
//!
//! [`SimEvent`]s cross the boundary to the network layer. [`Cue`]s are
//! presentation hints (particles, sounds) for the local renderer and are
//! never replicated.

use serde::{Deserialize, Serialize};

use hopper_world::entity::{Entity, EntityId};
use hopper_world::math::Vec3;

/// A state change other systems must hear about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SimEvent {
    /// The actor picked up a collectible.
    Collected {
        #[serde(rename = "entityId")]
        entity_id: EntityId,
    },
    /// The actor died at `position`.
    Died { position: Vec3 },
    /// The actor is back at the respawn point.
    Respawned,
    /// A generic trigger fired.
    TriggerActivated {
        #[serde(rename = "entityId")]
        entity_id: EntityId,
    },
    /// The actor touched a goal.
    GoalReached {
        #[serde(rename = "entityId")]
        entity_id: EntityId,
    },
    /// The actor landed on a breakable platform; the server starts its timer.
    PlatformStep {
        #[serde(rename = "entityId")]
        entity_id: EntityId,
    },
    /// A scheduled break removed an entity.
    EntityDestroyed { id: EntityId },
    /// A regeneration put an entity (with a fresh id) back.
    EntitySpawned { entity: Entity },
    /// A kinematic or chase entity moved.
    EntityMoved {
        id: EntityId,
        position: Vec3,
        rotation: f64,
    },
}

/// Local presentation hint.
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    Particles { position: Vec3, kind: ParticleKind },
    Sound(SoundKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Sparkle,
    Burst,
    Dust,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundKind {
    Collect,
    Bounce,
    Boost,
    Trigger,
    Death,
    Jump,
}

/// Collects everything one actor tick produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outbox {
    pub events: Vec<SimEvent>,
    pub cues: Vec<Cue>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the network.
    pub fn emit(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// Queue a particle burst.
    pub fn particles(&mut self, position: Vec3, kind: ParticleKind) {
        self.cues.push(Cue::Particles { position, kind });
    }

    /// Queue a sound.
    pub fn sound(&mut self, kind: SoundKind) {
        self.cues.push(Cue::Sound(kind));
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.cues.is_empty()
    }
}
